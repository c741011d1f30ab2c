//! Chapter names and name search

use crate::collation::{folded_contains, search_key};
use crate::content::ChapterNumber;
use serde::Serialize;

pub const CHAPTER_NAMES: [&str; 114] = [
    "الفاتحة", "البقرة", "آل عمران", "النساء", "المائدة", "الأنعام", "الأعراف", "الأنفال", "التوبة", "يونس",
    "هود", "يوسف", "الرعد", "إبراهيم", "الحجر", "النحل", "الإسراء", "الكهف", "مريم", "طه",
    "الأنبياء", "الحج", "المؤمنون", "النور", "الفرقان", "الشعراء", "النمل", "القصص", "العنكبوت", "الروم",
    "لقمان", "السجدة", "الأحزاب", "سبأ", "فاطر", "يس", "الصافات", "ص", "الزمر", "غافر",
    "فصلت", "الشورى", "الزخرف", "الدخان", "الجاثية", "الأحقاف", "محمد", "الفتح", "الحجرات", "ق",
    "الذاريات", "الطور", "النجم", "القمر", "الرحمن", "الواقعة", "الحديد", "المجادلة", "الحشر", "الممتحنة",
    "الصف", "الجمعة", "المنافقون", "التغابن", "الطلاق", "التحريم", "الملك", "القلم", "الحاقة", "المعارج",
    "نوح", "الجن", "المزمل", "المدثر", "القيامة", "الإنسان", "المرسلات", "النبأ", "النازعات", "عبس",
    "التكوير", "الانفطار", "المطففين", "الانشقاق", "البروج", "الطارق", "الأعلى", "الغاشية", "الفجر", "البلد",
    "الشمس", "الليل", "الضحى", "الشرح", "التين", "العلق", "القدر", "البينة", "الزلزلة", "العاديات",
    "القارعة", "التكاثر", "العصر", "الهمزة", "الفيل", "قريش", "الماعون", "الكوثر", "الكافرون", "النصر",
    "المسد", "الإخلاص", "الفلق", "الناس",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterEntry {
    pub id: ChapterNumber,
    pub name: &'static str,
}

pub fn chapter_name(number: ChapterNumber) -> &'static str {
    CHAPTER_NAMES[usize::from(number.get()) - 1]
}

/// Chapters whose name contains `query` (folded), in chapter order. A blank
/// query finds nothing.
pub fn search_chapters(query: &str) -> Vec<ChapterEntry> {
    if search_key(query).is_empty() {
        return Vec::new();
    }
    CHAPTER_NAMES
        .iter()
        .enumerate()
        .filter(|(_, name)| folded_contains(name, query))
        .filter_map(|(idx, name)| {
            ChapterNumber::new(idx as i64 + 1)
                .ok()
                .map(|id| ChapterEntry { id, name })
        })
        .collect()
}
