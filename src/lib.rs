//! Noor - Quran reader and adhkar/duas library
//!
//! Chapter fetching with a coalescing cache, a paginated reading session
//! that survives restarts, and classification of remembrances and
//! supplications into the collections the app shows.

pub mod error;
pub mod content;
pub mod chapters;
pub mod collation;
pub mod classifier;
pub mod catalog;
pub mod fetcher;
pub mod cache;
pub mod storage;
pub mod events;
pub mod session;
pub mod favorites;
pub mod daily;
pub mod config;
pub mod state;

pub use error::{FetchFailure, NoorError};
pub use state::AppState;
pub use config::{ContentSourceKind, NoorConfig};
pub use content::{
    Chapter, ChapterNumber, ClassifiedCollections, RawChapter, RawVerse, TextGroup, TextItem, Verse,
    MAX_CHAPTER, MIN_CHAPTER,
};
pub use classifier::{classify, ClassificationRules, UnmarkedItemPolicy};
pub use catalog::{AdhkarCatalog, Collection, Topic};
pub use chapters::{chapter_name, search_chapters, ChapterEntry};
pub use cache::ChapterCoordinator;
pub use fetcher::{ChapterSource, CommentarySource, HttpContentSource, QuranComSource};
pub use storage::{KeyValueStore, MemoryStore, SessionPersistence, SqliteStore};
pub use events::{AppEvent, EventBus, PlaybackCoordinator};
pub use session::{LoadOutcome, SessionController, SessionSnapshot, SessionStatus};
pub use favorites::{FavoriteVerse, Favorites};
