//! Application state: everything the reader needs, wired from one config

use crate::cache::ChapterCoordinator;
use crate::catalog::AdhkarCatalog;
use crate::classifier::ClassificationRules;
use crate::config::{ContentSourceKind, NoorConfig};
use crate::events::{EventBus, PlaybackCoordinator};
use crate::favorites::Favorites;
use crate::fetcher::{ChapterSource, CommentarySource, HttpContentSource, QuranComSource};
use crate::session::{SessionController, SessionOptions};
use crate::storage::{KeyValueStore, MemoryStore, SessionPersistence, SqliteStore};
use anyhow::{Context, Result};
use std::sync::Arc;

fn shared_source<S>(source: S) -> (Arc<dyn ChapterSource>, Arc<dyn CommentarySource>)
where
    S: ChapterSource + CommentarySource + 'static,
{
    let source = Arc::new(source);
    (source.clone(), source)
}

pub struct AppState {
    pub config: NoorConfig,
    pub bus: EventBus,
    pub store: Arc<dyn KeyValueStore>,
    pub coordinator: Arc<ChapterCoordinator>,
    pub session: Arc<SessionController>,
    pub catalog: Arc<AdhkarCatalog>,
    pub favorites: Favorites,
    pub playback: PlaybackCoordinator,
}

impl AppState {
    /// Build the network sources and the settings store described by `config`.
    pub fn new(config: NoorConfig) -> Result<Self> {
        let (chapters, commentary) = match config.content_source {
            ContentSourceKind::Api => shared_source(
                HttpContentSource::new(&config.api_base_url, config.fetch_timeout())
                    .context("Failed to create API client")?,
            ),
            ContentSourceKind::Upstream => shared_source(
                QuranComSource::new(&config.upstream_base_url, config.fetch_timeout())
                    .context("Failed to create upstream client")?,
            ),
        };

        // Settings are a convenience; without a writable data dir the session
        // just isn't remembered across runs.
        let store: Arc<dyn KeyValueStore> = match SqliteStore::open(config.settings_db_path()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "settings database unavailable, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_sources(config, chapters, commentary, store))
    }

    pub fn with_sources(
        config: NoorConfig,
        chapters: Arc<dyn ChapterSource>,
        commentary: Arc<dyn CommentarySource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let bus = EventBus::new();
        let coordinator = Arc::new(ChapterCoordinator::new(chapters, config.fetch_timeout()));
        let session = Arc::new(SessionController::new(
            Arc::clone(&coordinator),
            commentary,
            SessionPersistence::new(Arc::clone(&store)),
            bus.clone(),
            SessionOptions {
                verses_per_page: config.verses_per_page,
                commentary_timeout: config.commentary_timeout(),
            },
        ));

        let rules = ClassificationRules::default().with_policy(config.unmarked_policy);
        let catalog = Arc::new(match &config.adhkar_path {
            Some(path) => AdhkarCatalog::from_path(path, rules),
            None => AdhkarCatalog::embedded(rules),
        });

        Self {
            favorites: Favorites::new(Arc::clone(&store), bus.clone()),
            playback: PlaybackCoordinator::new(bus.clone()),
            config,
            bus,
            store,
            coordinator,
            session,
            catalog,
        }
    }
}
