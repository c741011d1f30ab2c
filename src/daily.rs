//! Verse of the day
//!
//! The day of the year picks a global verse number (1..=6236), which is then
//! located inside its chapter.

use crate::content::{ChapterNumber, TOTAL_VERSES};
use chrono::{Datelike, NaiveDate};

/// Verses per chapter, in order.
pub const VERSE_COUNTS: [u16; 114] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, 123, 111, 43, 52, 99, 128, 111, 110, 98, 135,
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, 34, 30, 73, 54, 45, 83, 182, 88, 75, 85, 54, 53, 89,
    59, 37, 35, 38, 29, 18, 45, 60, 49, 62, 55, 78, 96, 29, 22, 24, 13, 14, 11, 11, 18, 12, 12, 30,
    52, 52, 44, 28, 28, 20, 56, 40, 31, 50, 40, 46, 42, 29, 19, 36, 25, 22, 17, 19, 26, 30, 20, 15,
    21, 11, 8, 8, 19, 5, 8, 8, 11, 11, 8, 3, 9, 5, 4, 7, 3, 6, 3, 5, 4, 5, 6,
];

/// `(day_of_year % 6236) + 1`, day_of_year being 1-based.
pub fn daily_verse_number(date: NaiveDate) -> u32 {
    (date.ordinal() % TOTAL_VERSES) + 1
}

/// Map a global verse number to (chapter, verse within chapter).
pub fn locate_verse(global: u32) -> Option<(ChapterNumber, u32)> {
    if global == 0 || global > TOTAL_VERSES {
        return None;
    }
    let mut remaining = global;
    for (idx, count) in VERSE_COUNTS.iter().enumerate() {
        let count = u32::from(*count);
        if remaining <= count {
            return ChapterNumber::new(idx as i64 + 1).ok().map(|ch| (ch, remaining));
        }
        remaining -= count;
    }
    None
}

pub fn verse_of_the_day(date: NaiveDate) -> Option<(ChapterNumber, u32)> {
    locate_verse(daily_verse_number(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_counts_cover_every_verse() {
        let total: u32 = VERSE_COUNTS.iter().map(|c| u32::from(*c)).sum();
        assert_eq!(total, TOTAL_VERSES);
    }

    #[test]
    fn test_daily_number_uses_ordinal() {
        assert_eq!(daily_verse_number(date(2026, 1, 1)), 2);
        assert_eq!(daily_verse_number(date(2026, 10, 16)), 290);
        assert_eq!(daily_verse_number(date(2024, 12, 31)), 367);
    }

    #[test]
    fn test_locate_verse() {
        let ch = |n| ChapterNumber::new(n).unwrap();
        assert_eq!(locate_verse(1), Some((ch(1), 1)));
        assert_eq!(locate_verse(7), Some((ch(1), 7)));
        assert_eq!(locate_verse(8), Some((ch(2), 1)));
        assert_eq!(locate_verse(TOTAL_VERSES), Some((ch(114), 6)));
        assert_eq!(locate_verse(0), None);
        assert_eq!(locate_verse(TOTAL_VERSES + 1), None);
        assert_eq!(verse_of_the_day(date(2026, 10, 16)), Some((ch(2), 283)));
    }
}
