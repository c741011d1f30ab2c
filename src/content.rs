//! Content types: chapters, verses and remembrance groups

use crate::error::NoorError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_CHAPTER: u16 = 1;
pub const MAX_CHAPTER: u16 = 114;

/// Number of verses in the whole text, used by the daily verse rotation.
pub const TOTAL_VERSES: u32 = 6236;

/// A chapter number known to be in `[1, 114]`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct ChapterNumber(u16);

impl ChapterNumber {
    pub const FIRST: Self = Self(MIN_CHAPTER);
    pub const LAST: Self = Self(MAX_CHAPTER);

    pub fn new(value: i64) -> Result<Self, NoorError> {
        if value < MIN_CHAPTER as i64 || value > MAX_CHAPTER as i64 {
            return Err(NoorError::OutOfRange {
                what: "chapter",
                value,
                min: MIN_CHAPTER as i64,
                max: MAX_CHAPTER as i64,
            });
        }
        Ok(Self(value as u16))
    }

    /// Lenient parse for persisted or user-typed values.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<i64>().ok().and_then(|n| Self::new(n).ok())
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 as i64 + 1).ok()
    }

    pub fn prev(self) -> Option<Self> {
        Self::new(self.0 as i64 - 1).ok()
    }
}

impl TryFrom<i64> for ChapterNumber {
    type Error = NoorError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChapterNumber> for u16 {
    fn from(n: ChapterNumber) -> Self {
        n.0
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// 1-based position within the fetched chapter
    pub sequence_index: usize,
    pub number_in_chapter: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: ChapterNumber,
    pub name: String,
    pub total_verse_count: usize,
    pub verses: Vec<Verse>,
}

impl Chapter {
    /// Normalize a raw provider payload for the chapter that was requested.
    pub fn from_raw(requested: ChapterNumber, raw: RawChapter) -> Result<Self, NoorError> {
        let raw_verses = raw.verses.ok_or_else(|| {
            NoorError::InvalidPayload(format!("chapter {} has no verse list", requested))
        })?;

        if raw.number != requested.get() {
            return Err(NoorError::InvalidPayload(format!(
                "requested chapter {} but received {}",
                requested, raw.number
            )));
        }

        let verses: Vec<Verse> = raw_verses
            .into_iter()
            .enumerate()
            .map(|(idx, v)| Verse {
                sequence_index: idx + 1,
                number_in_chapter: v.number_in_chapter,
                text: v.text.unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            number: requested,
            name: raw.name,
            total_verse_count: verses.len(),
            verses,
        })
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        total_pages(self.verses.len(), page_size)
    }

    /// Verses on a 1-based page; empty when the page is out of range.
    pub fn page(&self, page: usize, page_size: usize) -> &[Verse] {
        if page == 0 || page_size == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(page_size);
        if start >= self.verses.len() {
            return &[];
        }
        let end = (start + page_size).min(self.verses.len());
        &self.verses[start..end]
    }

    pub fn contains_verse(&self, number_in_chapter: u32) -> bool {
        number_in_chapter >= 1 && number_in_chapter as usize <= self.verses.len()
    }
}

/// `ceil(total / page_size)`
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// 1-based page holding a 1-based verse number.
pub fn page_of_verse(verse: u32, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    (verse as usize).div_ceil(page_size).max(1)
}

/// Chapter payload as delivered by a chapter source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChapter {
    pub number: u16,
    pub name: String,
    pub verses: Option<Vec<RawVerse>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVerse {
    pub number_in_chapter: u32,
    pub text: Option<String>,
}

fn default_repeat_count() -> u32 {
    1
}

/// One recitation inside a remembrance or supplication group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    pub id: u32,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "count", default = "default_repeat_count")]
    pub repeat_count: u32,
}

/// A labelled group of recitations, e.g. "أذكار النوم".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGroup {
    pub id: u32,
    pub category: String,
    #[serde(rename = "array", default)]
    pub items: Vec<TextItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCollections {
    pub morning: Vec<TextGroup>,
    pub evening: Vec<TextGroup>,
    pub general: Vec<TextGroup>,
    pub supplications: Vec<TextGroup>,
}

impl ClassifiedCollections {
    pub fn total_items(&self) -> usize {
        total_items(&self.morning)
            + total_items(&self.evening)
            + total_items(&self.general)
            + total_items(&self.supplications)
    }
}

pub fn total_items(groups: &[TextGroup]) -> usize {
    groups.iter().map(|g| g.items.len()).sum()
}
