//! Typed application events
//!
//! Components that need to react to each other (close the other open verse
//! menu, stop the other playing recitation, refresh favorites) subscribe to an
//! `EventBus` instead of listening on ambient global state.

use crate::content::ChapterNumber;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    ChapterLoaded { chapter: ChapterNumber, page: usize },
    PageChanged { chapter: ChapterNumber, page: usize },
    SessionCleared,
    FavoriteVersesChanged { count: usize },
    FavoriteChaptersChanged { count: usize },
    MenuOpened { verse_id: String },
    StopPlayback { verse_id: String },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish to current subscribers. No subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        tracing::trace!(?event, "publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

#[derive(Default)]
struct PlaybackState {
    open_menu: Option<String>,
    playing: Option<String>,
}

/// Tracks the one open verse menu and the one playing verse recitation.
pub struct PlaybackCoordinator {
    bus: EventBus,
    state: Mutex<PlaybackState>,
}

impl PlaybackCoordinator {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            state: Mutex::new(PlaybackState::default()),
        }
    }

    pub fn open_menu(&self, verse_id: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open_menu = Some(verse_id.to_string());
        self.bus.publish(AppEvent::MenuOpened {
            verse_id: verse_id.to_string(),
        });
    }

    /// Close the menu only if `verse_id` is the one currently open.
    pub fn close_menu(&self, verse_id: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.open_menu.as_deref() == Some(verse_id) {
            state.open_menu = None;
        }
    }

    pub fn open_menu_id(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open_menu
            .clone()
    }

    /// Mark `verse_id` as playing (or nothing, with `None`); a different verse
    /// that was playing is told to stop.
    pub fn set_playing(&self, verse_id: Option<&str>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = state.playing.take() {
            if Some(previous.as_str()) != verse_id {
                self.bus.publish(AppEvent::StopPlayback { verse_id: previous });
            }
        }
        state.playing = verse_id.map(str::to_string);
    }

    pub fn playing_id(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .playing
            .clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = PlaybackState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        EventBus::new().publish(AppEvent::SessionCleared);
    }

    #[test]
    fn test_starting_playback_stops_previous_verse() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let playback = PlaybackCoordinator::new(bus);

        playback.set_playing(Some("2:255"));
        playback.set_playing(Some("2:255"));
        assert!(rx.try_recv().is_err());

        playback.set_playing(Some("36:1"));
        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::StopPlayback { verse_id: "2:255".into() }
        );
        assert_eq!(playback.playing_id().as_deref(), Some("36:1"));

        playback.set_playing(None);
        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::StopPlayback { verse_id: "36:1".into() }
        );
        assert_eq!(playback.playing_id(), None);
    }

    #[test]
    fn test_close_menu_only_clears_matching_menu() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let playback = PlaybackCoordinator::new(bus);

        playback.open_menu("1:1");
        assert_eq!(rx.try_recv().unwrap(), AppEvent::MenuOpened { verse_id: "1:1".into() });

        playback.close_menu("1:2");
        assert_eq!(playback.open_menu_id().as_deref(), Some("1:1"));
        playback.close_menu("1:1");
        assert_eq!(playback.open_menu_id(), None);

        playback.open_menu("1:3");
        playback.reset();
        assert_eq!(playback.open_menu_id(), None);
    }
}
