//! Favorite verses and chapters, stored as JSON arrays in the key-value store

use crate::content::ChapterNumber;
use crate::events::{AppEvent, EventBus};
use crate::storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const FAVORITE_VERSES_KEY: &str = "favoriteVerses";
pub const FAVORITE_CHAPTERS_KEY: &str = "favoriteSurahs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteVerse {
    /// Stable verse key, `verse-{chapter}-{number}`
    pub id: String,
    pub verse_number: u32,
    pub surah_name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surah_id: Option<u16>,
}

impl FavoriteVerse {
    pub fn verse_id(chapter: ChapterNumber, verse: u32) -> String {
        format!("verse-{}-{}", chapter, verse)
    }

    /// Chapter the verse belongs to. Older entries have no `surahId` and
    /// carry the chapter in the id; anything unreadable falls back to 1.
    pub fn chapter(&self) -> ChapterNumber {
        self.surah_id
            .map(i64::from)
            .or_else(|| self.id.split('-').nth(1).and_then(|s| s.parse().ok()))
            .and_then(|n| ChapterNumber::new(n).ok())
            .unwrap_or(ChapterNumber::FIRST)
    }
}

pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
    bus: EventBus,
}

impl Favorites {
    pub fn new(store: Arc<dyn KeyValueStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "favorites read failed");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::debug!(key, error = %e, "ignoring unreadable favorites");
            Vec::new()
        })
    }

    fn write<T: Serialize>(&self, key: &str, values: &[T]) {
        let json = match serde_json::to_string(values) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "favorites serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &json) {
            tracing::warn!(key, error = %e, "favorites write failed");
        }
    }

    pub fn verses(&self) -> Vec<FavoriteVerse> {
        self.read(FAVORITE_VERSES_KEY)
    }

    pub fn is_verse_favorite(&self, id: &str) -> bool {
        self.verses().iter().any(|v| v.id == id)
    }

    /// Add or remove a verse; returns whether it is now a favorite.
    pub fn toggle_verse(&self, verse: FavoriteVerse) -> bool {
        let mut verses = self.verses();
        let before = verses.len();
        verses.retain(|v| v.id != verse.id);
        let added = verses.len() == before;
        if added {
            verses.push(verse);
        }

        self.write(FAVORITE_VERSES_KEY, &verses);
        self.bus.publish(AppEvent::FavoriteVersesChanged { count: verses.len() });
        added
    }

    pub fn chapters(&self) -> Vec<ChapterNumber> {
        // Stored as plain numbers; out-of-range entries are skipped.
        self.read::<i64>(FAVORITE_CHAPTERS_KEY)
            .into_iter()
            .filter_map(|n| ChapterNumber::new(n).ok())
            .collect()
    }

    pub fn is_chapter_favorite(&self, chapter: ChapterNumber) -> bool {
        self.chapters().contains(&chapter)
    }

    /// Newest first. Returns whether the chapter is now a favorite.
    pub fn toggle_chapter(&self, chapter: ChapterNumber) -> bool {
        let mut chapters = self.chapters();
        let added = !chapters.contains(&chapter);
        if added {
            chapters.insert(0, chapter);
        } else {
            chapters.retain(|c| *c != chapter);
        }

        self.write(FAVORITE_CHAPTERS_KEY, &chapters);
        self.bus.publish(AppEvent::FavoriteChaptersChanged { count: chapters.len() });
        added
    }
}
