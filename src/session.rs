//! Chapter reading session: selected chapter, current page, persistence
//!
//! The controller is shared (`&self` everywhere) so a UI can issue a new
//! load while an older one is still in flight. Each load carries a
//! generation number; a load that has been superseded never applies its
//! result, and a load for a different chapter aborts the older request.

use crate::cache::ChapterCoordinator;
use crate::content::{page_of_verse, Chapter, ChapterNumber, Verse};
use crate::error::NoorError;
use crate::events::{AppEvent, EventBus};
use crate::fetcher::CommentarySource;
use crate::storage::SessionPersistence;
use futures_util::future::{AbortHandle, Abortable};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DEFAULT_VERSES_PER_PAGE: usize = 12;
pub const DEFAULT_COMMENTARY_TIMEOUT: Duration = Duration::from_millis(8000);

/// Shown by callers when `load_commentary` yields nothing.
pub const COMMENTARY_FALLBACK: &str = "التفسير غير متوفر حالياً";

pub const MSG_SLOW_CONNECTION: &str = "انتهت مهلة الاتصال. تحقق من اتصالك بالإنترنت.";
pub const MSG_LOAD_FAILED: &str = "حدث خطأ أثناء تحميل السورة";
pub const MSG_OUT_OF_RANGE: &str = "رقم السورة يجب أن يكون بين 1 و114";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// How a `load_chapter` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ChapterNumber),
    Failed(NoorError),
    /// Rejected before any fetch (chapter number out of range).
    Rejected(NoorError),
    /// A newer load or an unload happened first; the result was discarded.
    Superseded,
}

/// Read-only view for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub chapter_number: Option<ChapterNumber>,
    pub chapter_name: Option<String>,
    pub current_page: usize,
    pub total_pages: usize,
    pub verses: Vec<Verse>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub verses_per_page: usize,
    pub commentary_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            verses_per_page: DEFAULT_VERSES_PER_PAGE,
            commentary_timeout: DEFAULT_COMMENTARY_TIMEOUT,
        }
    }
}

/// Map a load failure to the message shown to the reader.
pub fn user_message(error: &NoorError) -> &'static str {
    match error {
        NoorError::OutOfRange { .. } => MSG_OUT_OF_RANGE,
        e if e.is_connectivity() => MSG_SLOW_CONNECTION,
        _ => MSG_LOAD_FAILED,
    }
}

pub fn commentary_or_fallback(commentary: Option<String>) -> String {
    commentary.unwrap_or_else(|| COMMENTARY_FALLBACK.to_string())
}

fn superseded() -> NoorError {
    NoorError::Other("navigation superseded by a newer load".to_string())
}

struct InFlight {
    chapter: ChapterNumber,
    generation: u64,
    abort: AbortHandle,
}

struct SessionInner {
    status: SessionStatus,
    chapter: Option<Arc<Chapter>>,
    page: usize,
    error: Option<String>,
    generation: u64,
    in_flight: Vec<InFlight>,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            chapter: None,
            page: 1,
            error: None,
            generation: 0,
            in_flight: Vec::new(),
        }
    }
}

pub struct SessionController {
    coordinator: Arc<ChapterCoordinator>,
    commentary: Arc<dyn CommentarySource>,
    persistence: SessionPersistence,
    bus: EventBus,
    options: SessionOptions,
    inner: Mutex<SessionInner>,
}

impl SessionController {
    pub fn new(
        coordinator: Arc<ChapterCoordinator>,
        commentary: Arc<dyn CommentarySource>,
        persistence: SessionPersistence,
        bus: EventBus,
        options: SessionOptions,
    ) -> Self {
        Self {
            coordinator,
            commentary,
            persistence,
            bus,
            options: SessionOptions {
                verses_per_page: options.verses_per_page.max(1),
                ..options
            },
            inner: Mutex::new(SessionInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resume the persisted session, if there is a valid one.
    /// Returns `None` when nothing was restored (and nothing fetched).
    pub async fn restore(&self) -> Option<LoadOutcome> {
        let saved = self.persistence.load();
        let chapter = match saved.selected_chapter {
            Some(chapter) => chapter,
            None => {
                tracing::debug!("no persisted session to restore");
                return None;
            }
        };
        tracing::info!(chapter = %chapter, page = saved.current_page, "restoring session");
        Some(self.load(chapter.get() as i64, saved.current_page).await)
    }

    pub async fn load_chapter(&self, number: i64) -> LoadOutcome {
        self.load(number, 1).await
    }

    async fn load(&self, number: i64, landing_page: usize) -> LoadOutcome {
        let chapter_number = match ChapterNumber::new(number) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(number, "rejecting out-of-range chapter");
                let mut inner = self.lock();
                inner.generation += 1;
                for load in inner.in_flight.drain(..) {
                    load.abort.abort();
                }
                inner.chapter = None;
                inner.page = 1;
                inner.status = SessionStatus::Error;
                inner.error = Some(user_message(&e).to_string());
                return LoadOutcome::Rejected(e);
            }
        };

        let (generation, registration) = {
            let mut inner = self.lock();
            inner.generation += 1;
            let generation = inner.generation;

            // At most one chapter is being navigated to; loads of other
            // chapters are cancelled, loads of the same one share its fetch.
            inner.in_flight.retain(|load| {
                if load.chapter == chapter_number {
                    true
                } else {
                    tracing::debug!(chapter = %load.chapter, "cancelling stale chapter load");
                    load.abort.abort();
                    false
                }
            });

            let (abort, registration) = AbortHandle::new_pair();
            inner.in_flight.push(InFlight {
                chapter: chapter_number,
                generation,
                abort,
            });
            inner.status = SessionStatus::Loading;
            inner.error = None;
            (generation, registration)
        };

        let result = Abortable::new(self.coordinator.get_chapter(chapter_number), registration).await;

        let mut inner = self.lock();
        inner.in_flight.retain(|load| load.generation != generation);
        if inner.generation != generation {
            return LoadOutcome::Superseded;
        }

        match result {
            Err(_aborted) => LoadOutcome::Superseded,
            Ok(Ok(chapter)) => {
                let total = chapter.total_pages(self.options.verses_per_page).max(1);
                let page = landing_page.clamp(1, total);
                inner.chapter = Some(chapter);
                inner.page = page;
                inner.status = SessionStatus::Ready;
                drop(inner);

                tracing::info!(chapter = %chapter_number, page, "chapter ready");
                self.persistence.save(chapter_number, page);
                self.bus.publish(AppEvent::ChapterLoaded {
                    chapter: chapter_number,
                    page,
                });
                LoadOutcome::Loaded(chapter_number)
            }
            Ok(Err(e)) => {
                inner.chapter = None;
                inner.page = 1;
                inner.status = SessionStatus::Error;
                inner.error = Some(user_message(&e).to_string());
                tracing::warn!(chapter = %chapter_number, error = %e, "chapter load failed");
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Drop the selection and forget the persisted session.
    pub fn unload(&self) {
        {
            let mut inner = self.lock();
            inner.generation += 1;
            for load in inner.in_flight.drain(..) {
                load.abort.abort();
            }
            inner.chapter = None;
            inner.page = 1;
            inner.error = None;
            inner.status = SessionStatus::Idle;
        }
        self.persistence.clear();
        self.bus.publish(AppEvent::SessionCleared);
    }

    /// Move to `page`, clamped to the chapter. Returns whether the page changed.
    pub fn change_page(&self, page: usize) -> bool {
        let (chapter, page) = {
            let mut inner = self.lock();
            let chapter = match (&inner.status, &inner.chapter) {
                (SessionStatus::Ready, Some(chapter)) => Arc::clone(chapter),
                _ => return false,
            };
            let total = chapter.total_pages(self.options.verses_per_page).max(1);
            let page = page.clamp(1, total);
            if page == inner.page {
                return false;
            }
            inner.page = page;
            (chapter.number, page)
        };

        self.persistence.save(chapter, page);
        self.bus.publish(AppEvent::PageChanged { chapter, page });
        true
    }

    pub fn next_page(&self) -> bool {
        let (page, total) = {
            let inner = self.lock();
            (inner.page, self.total_pages_locked(&inner))
        };
        page < total && self.change_page(page + 1)
    }

    pub fn prev_page(&self) -> bool {
        let page = self.lock().page;
        page > 1 && self.change_page(page - 1)
    }

    /// Land on the page holding verse `verse` of the loaded chapter.
    pub fn go_to_verse(&self, verse: u32) -> Result<usize, NoorError> {
        let chapter = self
            .ready_chapter()
            .ok_or_else(|| NoorError::Other("no chapter loaded".to_string()))?;
        if !chapter.contains_verse(verse) {
            return Err(NoorError::OutOfRange {
                what: "verse",
                value: verse as i64,
                min: 1,
                max: chapter.verses.len() as i64,
            });
        }
        let page = page_of_verse(verse, self.options.verses_per_page);
        self.change_page(page);
        Ok(page)
    }

    /// Open verse `verse` of chapter `chapter`, loading the chapter first
    /// unless it is already the ready one. An out-of-range chapter is
    /// refused without touching the session.
    pub async fn navigate_to_verse(&self, chapter: i64, verse: u32) -> Result<usize, NoorError> {
        let number = ChapterNumber::new(chapter)?;
        let loaded = self.ready_chapter().map(|c| c.number);

        if loaded != Some(number) {
            match self.load_chapter(chapter).await {
                LoadOutcome::Loaded(_) => {}
                LoadOutcome::Failed(e) | LoadOutcome::Rejected(e) => return Err(e),
                LoadOutcome::Superseded => return Err(superseded()),
            }
            // another load may have landed in between
            if self.ready_chapter().map(|c| c.number) != Some(number) {
                return Err(superseded());
            }
        }

        self.go_to_verse(verse)
    }

    /// Load the following chapter; `None` if there is none or nothing is loaded.
    pub async fn next_chapter(&self) -> Option<LoadOutcome> {
        let next = self.ready_chapter()?.number.next()?;
        Some(self.load_chapter(next.get() as i64).await)
    }

    pub async fn prev_chapter(&self) -> Option<LoadOutcome> {
        let prev = self.ready_chapter()?.number.prev()?;
        Some(self.load_chapter(prev.get() as i64).await)
    }

    /// Commentary for one verse. Any failure yields `None`; see
    /// [`commentary_or_fallback`].
    pub async fn load_commentary(&self, chapter: i64, verse: u32) -> Option<String> {
        let chapter = match ChapterNumber::new(chapter) {
            Ok(chapter) if verse >= 1 => chapter,
            _ => {
                tracing::debug!(chapter, verse, "commentary requested for invalid verse");
                return None;
            }
        };

        let fetch = self.commentary.fetch_commentary(chapter, verse);
        match tokio::time::timeout(self.options.commentary_timeout, fetch).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(chapter = %chapter, verse, error = %e, "commentary fetch failed");
                None
            }
            Err(_) => {
                tracing::warn!(chapter = %chapter, verse, "commentary fetch timed out");
                None
            }
        }
    }

    fn ready_chapter(&self) -> Option<Arc<Chapter>> {
        let inner = self.lock();
        match inner.status {
            SessionStatus::Ready => inner.chapter.clone(),
            _ => None,
        }
    }

    fn total_pages_locked(&self, inner: &SessionInner) -> usize {
        inner
            .chapter
            .as_ref()
            .map(|c| c.total_pages(self.options.verses_per_page))
            .unwrap_or(0)
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn current_page(&self) -> usize {
        self.lock().page
    }

    pub fn total_pages(&self) -> usize {
        let inner = self.lock();
        self.total_pages_locked(&inner)
    }

    pub fn chapter(&self) -> Option<Arc<Chapter>> {
        self.lock().chapter.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Verses visible on the current page.
    pub fn current_verses(&self) -> Vec<Verse> {
        let inner = self.lock();
        inner
            .chapter
            .as_ref()
            .map(|c| c.page(inner.page, self.options.verses_per_page).to_vec())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let verses = inner
            .chapter
            .as_ref()
            .map(|c| c.page(inner.page, self.options.verses_per_page).to_vec())
            .unwrap_or_default();
        SessionSnapshot {
            status: inner.status,
            chapter_number: inner.chapter.as_ref().map(|c| c.number),
            chapter_name: inner.chapter.as_ref().map(|c| c.name.clone()),
            current_page: inner.page,
            total_pages: self.total_pages_locked(&inner),
            verses,
            error: inner.error.clone(),
        }
    }
}
