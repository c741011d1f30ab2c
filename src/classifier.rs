//! Partitioning of remembrance/supplication groups into the four display
//! collections: morning, evening, general remembrances and supplications.

use crate::collation::Collator;
use crate::content::{ClassifiedCollections, TextGroup, TextItem};
use serde::{Deserialize, Serialize};

/// Label of the single source group that mixes morning and evening texts.
pub const MORNING_AND_EVENING_LABEL: &str = "أذكار الصباح والمساء";
pub const MORNING_LABEL: &str = "أذكار الصباح";
pub const EVENING_LABEL: &str = "أذكار المساء";

const MORNING_MARKERS: &[&str] = &[
    "أصبحنا",
    "أصبحت",
    "إذا أصبح",
    "إذا أصبحَ",
    "هذا اليوم",
    "خير هذا اليوم",
];

const EVENING_MARKERS: &[&str] = &[
    "أمسينا",
    "أمسيت",
    "إذا أمسى",
    "هذه الليلة",
    "خير هذه الليلة",
];

const REMEMBRANCE_CATEGORIES: &[&str] = &[
    "أذكار النوم",
    "أذكار الاستيقاظ من النوم",
    "الذكر قبل الوضوء",
    "الذكر بعد الفراغ من الوضوء",
    "الذكر عند الخروج من المنزل",
    "الذكر عند دخول المنزل",
    "أذكار الآذان",
    "الأذكار بعد السلام من الصلاة",
    "الذكر عقب السلام من الوتر",
    "التشهد",
    "الصلاة على النبي بعد التشهد",
    "الذكر بعد نزول المطر",
    "التسبيح والتحميد والتهليل والتكبير",
    "كفارة المجلس",
    "ما يقال في المجلس",
    "أذكار الحج والعمرة",
    "التكبير والتسبيح في سير الحج والعمرة",
    "التهليل",
    "كيف كان النبي يسبح؟",
    "أفضل الدعاء",
    "ما يقوله عند ذبح الأضحية أو العقيقة",
    "ما يعوذ به الأولاد",
    "ما يفعل من رأى الرؤيا أو الحلم",
    "ما يقول من خاف قوما",
    "ما يقول ويفعل من أذنب ذنبا",
    "ما يعصم الله به من الدجال",
    "ما يقول إذا وضع ثوبه",
    "ما يقال للكافر إذا عطس فحمد الله",
    "ما يقول الصائم إذا سابه أحد",
    "تهنئة المولود له وجوابه",
    "ﺗﻬنئة المولود له وجوابه",
    "تلقين المحتضر",
    "فضل عيادة المريض",
];

const REMEMBRANCE_PATTERNS: &[&str] = &[
    "أذكار",
    "الذكر",
    "الأذكار",
    "ما يقول",
    "ما يقال",
    "ما يفعل",
    "ما يعوذ",
    "ما يعصم",
    "فضل",
    "تهنئة",
    "ﺗﻬنئة",
    "تلقين",
    "كفارة",
    "التشهد",
    "الصلاة على النبي",
];

const SUPPLICATION_PREFIXES: &[&str] = &["دعاء", "الدعاء"];

const SUPPLICATION_MARKERS: &[&str] = &["دعاء", "القرآن", "استغفار", "توبة"];

/// What happens to an item of the mixed group that carries neither a
/// morning nor an evening marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmarkedItemPolicy {
    /// Recited both morning and evening: kept in both derived groups.
    #[default]
    Shared,
    /// Left out of both derived groups.
    Drop,
}

/// Keyword and category tables driving classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub mixed_label: String,
    pub morning_label: String,
    pub evening_label: String,
    pub morning_markers: Vec<String>,
    pub evening_markers: Vec<String>,
    pub remembrance_categories: Vec<String>,
    pub remembrance_patterns: Vec<String>,
    pub supplication_prefixes: Vec<String>,
    pub supplication_markers: Vec<String>,
    pub unmarked_policy: UnmarkedItemPolicy,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            mixed_label: MORNING_AND_EVENING_LABEL.to_string(),
            morning_label: MORNING_LABEL.to_string(),
            evening_label: EVENING_LABEL.to_string(),
            morning_markers: owned(MORNING_MARKERS),
            evening_markers: owned(EVENING_MARKERS),
            remembrance_categories: owned(REMEMBRANCE_CATEGORIES),
            remembrance_patterns: owned(REMEMBRANCE_PATTERNS),
            supplication_prefixes: owned(SUPPLICATION_PREFIXES),
            supplication_markers: owned(SUPPLICATION_MARKERS),
            unmarked_policy: UnmarkedItemPolicy::Shared,
        }
    }
}

impl ClassificationRules {
    pub fn with_policy(mut self, policy: UnmarkedItemPolicy) -> Self {
        self.unmarked_policy = policy;
        self
    }

    fn has_morning_marker(&self, text: &str) -> bool {
        self.morning_markers.iter().any(|k| text.contains(k.as_str()))
    }

    fn has_evening_marker(&self, text: &str) -> bool {
        self.evening_markers.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn is_mixed(&self, category: &str) -> bool {
        category == self.mixed_label
    }

    pub fn is_explicit_remembrance(&self, category: &str) -> bool {
        self.remembrance_categories.iter().any(|c| c == category)
            || self
                .remembrance_patterns
                .iter()
                .any(|p| category.contains(p.as_str()))
    }

    /// Remembrance wins over supplication when a label matches both.
    pub fn is_supplication(&self, category: &str) -> bool {
        let label = category.trim();
        if self.is_explicit_remembrance(label) {
            return false;
        }
        self.supplication_prefixes
            .iter()
            .any(|p| label.starts_with(p.as_str()))
            || self
                .supplication_markers
                .iter()
                .any(|m| label.contains(m.as_str()))
    }

    pub fn route(&self, category: &str) -> Route {
        if self.is_mixed(category) {
            Route::Split
        } else if self.is_supplication(category) {
            Route::Supplications
        } else if self.is_explicit_remembrance(category) {
            Route::General
        } else {
            Route::Supplications
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Split,
    General,
    Supplications,
}

/// Split the mixed group into its morning and evening halves.
fn split_mixed(group: &TextGroup, rules: &ClassificationRules) -> (Option<TextGroup>, Option<TextGroup>) {
    let mut shared: Vec<&TextItem> = Vec::new();
    let mut morning_only: Vec<&TextItem> = Vec::new();
    let mut evening_only: Vec<&TextItem> = Vec::new();

    for item in &group.items {
        let morning = rules.has_morning_marker(&item.text);
        let evening = rules.has_evening_marker(&item.text);
        match (morning, evening) {
            (true, true) => shared.push(item),
            (true, false) => morning_only.push(item),
            (false, true) => evening_only.push(item),
            (false, false) => match rules.unmarked_policy {
                UnmarkedItemPolicy::Shared => shared.push(item),
                UnmarkedItemPolicy::Drop => {}
            },
        }
    }

    let derive = |label: &str, only: &[&TextItem]| {
        let items: Vec<TextItem> = shared
            .iter()
            .chain(only.iter())
            .map(|item| (*item).clone())
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(TextGroup {
                id: group.id,
                category: label.to_string(),
                items,
            })
        }
    };

    (
        derive(&rules.morning_label, &morning_only),
        derive(&rules.evening_label, &evening_only),
    )
}

/// Deterministic, total partition of `groups` into the four collections.
pub fn classify(groups: &[TextGroup], rules: &ClassificationRules) -> ClassifiedCollections {
    let mut out = ClassifiedCollections::default();

    for group in groups {
        match rules.route(&group.category) {
            Route::Split => {
                let (morning, evening) = split_mixed(group, rules);
                out.morning.extend(morning);
                out.evening.extend(evening);
            }
            Route::General => out.general.push(group.clone()),
            Route::Supplications => out.supplications.push(group.clone()),
        }
    }

    let collator = Collator::arabic();
    // Stable sort: equal labels keep their input order.
    out.general
        .sort_by(|a, b| collator.compare(&a.category, &b.category));
    out.supplications
        .sort_by(|a, b| collator.compare(&a.category, &b.category));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, text: &str) -> TextItem {
        TextItem { id, text: text.to_string(), repeat_count: 1 }
    }

    fn group(id: u32, category: &str, texts: &[&str]) -> TextGroup {
        TextGroup {
            id,
            category: category.to_string(),
            items: texts
                .iter()
                .enumerate()
                .map(|(i, t)| item(i as u32 + 1, t))
                .collect(),
        }
    }

    fn mixed_example() -> TextGroup {
        group(
            1,
            MORNING_AND_EVENING_LABEL,
            &["أصبحنا وأصبح الملك لله", "أمسينا وأمسى الملك لله", "لا إله إلا الله وحده"],
        )
    }

    #[test]
    fn test_mixed_label_split() {
        let out = classify(&[mixed_example()], &ClassificationRules::default());

        assert_eq!(out.morning.len(), 1);
        assert_eq!(out.evening.len(), 1);
        assert_eq!(out.morning[0].category, MORNING_LABEL);
        assert_eq!(out.evening[0].category, EVENING_LABEL);

        // shared items come first, then the bucket-specific ones
        let morning_ids: Vec<u32> = out.morning[0].items.iter().map(|i| i.id).collect();
        let evening_ids: Vec<u32> = out.evening[0].items.iter().map(|i| i.id).collect();
        assert_eq!(morning_ids, vec![3, 1]);
        assert_eq!(evening_ids, vec![3, 2]);
        assert!(out.general.is_empty());
        assert!(out.supplications.is_empty());
    }

    #[test]
    fn test_items_with_both_markers_are_duplicated() {
        let g = group(
            1,
            MORNING_AND_EVENING_LABEL,
            &["اللهم إني أسألك خير هذا اليوم وخير هذه الليلة", "أصبحت أشهد"],
        );
        let out = classify(&[g], &ClassificationRules::default());
        assert_eq!(out.morning[0].items.len(), 2);
        assert_eq!(out.evening[0].items.len(), 1);
        assert_eq!(out.evening[0].items[0].id, 1);
    }

    #[test]
    fn test_drop_policy_omits_unmarked_items() {
        let rules = ClassificationRules::default().with_policy(UnmarkedItemPolicy::Drop);
        let out = classify(&[mixed_example()], &rules);

        let morning_ids: Vec<u32> = out.morning[0].items.iter().map(|i| i.id).collect();
        let evening_ids: Vec<u32> = out.evening[0].items.iter().map(|i| i.id).collect();
        assert_eq!(morning_ids, vec![1]);
        assert_eq!(evening_ids, vec![2]);
    }

    #[test]
    fn test_empty_derived_groups_are_not_emitted() {
        let g = group(1, MORNING_AND_EVENING_LABEL, &["أصبحنا على فطرة الإسلام"]);
        let rules = ClassificationRules::default().with_policy(UnmarkedItemPolicy::Drop);
        let out = classify(&[g], &rules);
        assert_eq!(out.morning.len(), 1);
        assert!(out.evening.is_empty());

        let empty = group(2, MORNING_AND_EVENING_LABEL, &[]);
        let out = classify(&[empty], &ClassificationRules::default());
        assert!(out.morning.is_empty());
        assert!(out.evening.is_empty());
    }

    #[test]
    fn test_label_routing() {
        let rules = ClassificationRules::default();
        assert_eq!(rules.route("دعاء الفرج"), Route::Supplications);
        assert_eq!(rules.route("الدعاء للميت"), Route::Supplications);
        assert_eq!(rules.route("من أدعية القرآن"), Route::Supplications);
        assert_eq!(rules.route("أذكار النوم"), Route::General);
        assert_eq!(rules.route("ما يقول عند الكرب"), Route::General);
        // matches both tables: remembrance wins
        assert_eq!(rules.route("أفضل الدعاء"), Route::General);
        assert_eq!(rules.route("فضل الدعاء"), Route::General);
        // unknown labels, including blank ones, default to supplications
        assert_eq!(rules.route("الرقية الشرعية"), Route::Supplications);
        assert_eq!(rules.route("   "), Route::Supplications);
        assert_eq!(rules.route(""), Route::Supplications);
    }

    #[test]
    fn test_general_and_supplications_are_sorted() {
        let groups = vec![
            group(1, "دعاء الكرب", &["لا إله إلا الله العظيم الحليم"]),
            group(2, "التهليل", &["لا إله إلا الله"]),
            group(3, "أذكار النوم", &["باسمك اللهم أموت وأحيا"]),
            group(4, "الاستغفار", &["أستغفر الله"]),
        ];
        let out = classify(&groups, &ClassificationRules::default());
        let general: Vec<&str> = out.general.iter().map(|g| g.category.as_str()).collect();
        let duas: Vec<&str> = out.supplications.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(general, vec!["أذكار النوم", "التهليل"]);
        assert_eq!(duas, vec!["الاستغفار", "دعاء الكرب"]);
    }

    #[test]
    fn test_morning_and_evening_keep_input_order() {
        let groups = vec![
            mixed_example(),
            group(9, MORNING_AND_EVENING_LABEL, &["أصبحت وأصبح الملك لله"]),
        ];
        let out = classify(&groups, &ClassificationRules::default());
        assert_eq!(out.morning.len(), 2);
        assert_eq!(out.morning[0].id, 1);
        assert_eq!(out.morning[1].id, 9);
    }

    #[test]
    fn test_every_item_is_accounted_for() {
        let groups = vec![
            mixed_example(),
            group(2, "أذكار النوم", &["أ", "ب"]),
            group(3, "دعاء السفر", &["ج"]),
            group(4, "", &["د", "هـ"]),
        ];
        let out = classify(&groups, &ClassificationRules::default());

        // non-mixed groups are routed whole
        assert_eq!(out.general.iter().map(|g| g.items.len()).sum::<usize>(), 2);
        assert_eq!(out.supplications.iter().map(|g| g.items.len()).sum::<usize>(), 3);

        // every mixed item lands in at least one derived group
        for original in &groups[0].items {
            let in_morning = out.morning[0].items.contains(original);
            let in_evening = out.evening[0].items.contains(original);
            assert!(in_morning || in_evening, "item {} dropped", original.id);
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let groups = vec![
            group(5, "دعاء الهم", &["اللهم إني أعوذ بك من الهم"]),
            mixed_example(),
            group(6, "التشهد", &["التحيات لله"]),
            group(7, "دعاء الاستفتاح", &["سبحانك اللهم"]),
        ];
        let rules = ClassificationRules::default();
        assert_eq!(classify(&groups, &rules), classify(&groups, &rules));
    }

    #[test]
    fn test_missing_text_is_non_matching() {
        let g = TextGroup {
            id: 1,
            category: MORNING_AND_EVENING_LABEL.to_string(),
            items: vec![TextItem { id: 1, text: String::new(), repeat_count: 1 }],
        };
        let out = classify(&[g], &ClassificationRules::default());
        assert_eq!(out.morning[0].items.len(), 1);
        assert_eq!(out.evening[0].items.len(), 1);
    }
}
