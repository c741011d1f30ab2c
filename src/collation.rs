//! Arabic label collation and the folding shared by sorting and searching

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default)]
pub struct Collator;

impl Collator {
    pub fn arabic() -> Self {
        Self
    }

    /// Primary comparison on the folded sort key, raw text as the tie-break
    /// so that distinct labels never compare equal.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.sort_key(a)
            .cmp(&self.sort_key(b))
            .then_with(|| a.cmp(b))
    }

    pub fn sort_key(&self, text: &str) -> String {
        fold_arabic(text)
    }
}

/// Key for substring search: folded like the sort key, then lowercased so
/// Latin queries match regardless of case.
pub fn search_key(text: &str) -> String {
    fold_arabic(text).to_lowercase()
}

/// Whether `haystack` contains `needle` once both are folded. A blank
/// needle matches nothing.
pub fn folded_contains(haystack: &str, needle: &str) -> bool {
    let needle = search_key(needle);
    !needle.is_empty() && search_key(haystack).contains(&needle)
}

/// Base letters of Arabic Presentation Forms-B starting at U+FE80, each with
/// the number of contextual forms it occupies.
const PRESENTATION_FORMS: &[(char, u32)] = &[
    ('ء', 1),
    ('آ', 2),
    ('أ', 2),
    ('ؤ', 2),
    ('إ', 2),
    ('ئ', 4),
    ('ا', 2),
    ('ب', 4),
    ('ة', 2),
    ('ت', 4),
    ('ث', 4),
    ('ج', 4),
    ('ح', 4),
    ('خ', 4),
    ('د', 2),
    ('ذ', 2),
    ('ر', 2),
    ('ز', 2),
    ('س', 4),
    ('ش', 4),
    ('ص', 4),
    ('ض', 4),
    ('ط', 4),
    ('ظ', 4),
    ('ع', 4),
    ('غ', 4),
    ('ف', 4),
    ('ق', 4),
    ('ك', 4),
    ('ل', 4),
    ('م', 4),
    ('ن', 4),
    ('ه', 4),
    ('و', 2),
    ('ى', 2),
    ('ي', 4),
];

fn presentation_base(c: char) -> Option<char> {
    let code = c as u32;
    if !(0xFE80..0xFEF5).contains(&code) {
        return None;
    }
    let mut offset = code - 0xFE80;
    for &(base, forms) in PRESENTATION_FORMS {
        if offset < forms {
            return Some(base);
        }
        offset -= forms;
    }
    None
}

/// Fold Arabic text to its primary sort key: presentation forms to base
/// letters, harakat and tatweel dropped, hamza carriers and final forms
/// merged with their plain letters.
pub fn fold_arabic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        // Lam-alef ligatures, U+FEF5..U+FEFC
        if ('\u{FEF5}'..='\u{FEFC}').contains(&c) {
            out.push('ل');
            out.push('ا');
            continue;
        }
        let c = presentation_base(c).unwrap_or(c);
        match c {
            '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}' => {}
            'أ' | 'إ' | 'آ' | 'ٱ' => out.push('ا'),
            'ؤ' => out.push('و'),
            'ئ' | 'ى' => out.push('ي'),
            'ة' => out.push('ه'),
            _ => out.push(c),
        }
    }
    out
}
