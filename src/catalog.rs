//! Remembrance/supplication dataset and its cached classification

use crate::classifier::{classify, ClassificationRules};
use crate::collation::{folded_contains, search_key, Collator};
use crate::content::{ClassifiedCollections, TextGroup};
use crate::error::NoorError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

const EMBEDDED_ADHKAR: &str = include_str!("../data/adhkar.json");
const EMBEDDED_EXTRA_DUAS: &str = include_str!("../data/extra_duas.json");

/// One of the four published collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Morning,
    Evening,
    General,
    Supplications,
}

impl FromStr for Collection {
    type Err = NoorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "sabah" => Ok(Self::Morning),
            "evening" | "masa" => Ok(Self::Evening),
            "general" => Ok(Self::General),
            "duas" | "supplications" => Ok(Self::Supplications),
            other => Err(NoorError::Other(format!("unknown collection: {}", other))),
        }
    }
}

/// Topic filters offered over the published collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Salah,
    Wudu,
    Sleep,
    /// Remembrances invoking blessings on the Prophet.
    Prophet,
    /// Supplications of the earlier prophets.
    Prophets,
    Distress,
    Istighfar,
    Quran,
    Sunnah,
}

impl FromStr for Topic {
    type Err = NoorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "salah" => Ok(Self::Salah),
            "wudu" => Ok(Self::Wudu),
            "sleep" => Ok(Self::Sleep),
            "prophet" => Ok(Self::Prophet),
            "prophets" => Ok(Self::Prophets),
            "distress" => Ok(Self::Distress),
            "istighfar" => Ok(Self::Istighfar),
            "quran" => Ok(Self::Quran),
            "sunnah" => Ok(Self::Sunnah),
            other => Err(NoorError::Other(format!("unknown topic: {}", other))),
        }
    }
}

const TOPIC_LABELS: &[(&str, Topic)] = &[
    ("الأذكار قبل الصلاة", Topic::Salah),
    ("الأذكار بعد السلام من الصلاة", Topic::Salah),
    ("التشهد", Topic::Salah),
    ("الصلاة على النبي بعد التشهد", Topic::Salah),
    ("أذكار الآذان", Topic::Salah),
    ("دعاء قبل الصلاة", Topic::Salah),
    ("دعاء أثناء الصلاة", Topic::Salah),
    ("دعاء بعد الصلاة", Topic::Salah),
    ("دعاء الاستفتاح", Topic::Salah),
    ("دعاء السجود", Topic::Salah),
    ("دعاء التشهد", Topic::Salah),
    ("الذكر قبل الوضوء", Topic::Wudu),
    ("الذكر بعد الفراغ من الوضوء", Topic::Wudu),
    ("أذكار الوضوء", Topic::Wudu),
    ("أذكار النوم", Topic::Sleep),
    ("أذكار الاستيقاظ من النوم", Topic::Sleep),
    ("الصلاة على النبي", Topic::Prophet),
    ("أذكار النبي", Topic::Prophet),
    ("أذكار مأثورة عن الرسول", Topic::Prophet),
    ("دعاء موسى عليه السلام", Topic::Prophets),
    ("دعاء زكريا عليه السلام", Topic::Prophets),
    ("دعاء إبراهيم عليه السلام", Topic::Prophets),
    ("دعاء أيوب عليه السلام", Topic::Prophets),
    ("دعاء نوح عليه السلام", Topic::Prophets),
    ("دعاء يعقوب عليه السلام", Topic::Prophets),
    ("دعاء سليمان عليه السلام", Topic::Prophets),
    ("دعاء يوسف عليه السلام", Topic::Prophets),
    ("دعاء يونس عليه السلام", Topic::Prophets),
    ("دعاء الكرب", Topic::Distress),
    ("دعاء الضيق", Topic::Distress),
    ("دعاء الفرج", Topic::Distress),
    ("دعاء الراحة النفسية", Topic::Distress),
    ("سيد الاستغفار", Topic::Istighfar),
    ("الاستغفار", Topic::Istighfar),
    ("دعاء التوبة", Topic::Istighfar),
    ("أدعية من القرآن", Topic::Quran),
    ("دعاء ربنا آتنا", Topic::Quran),
    ("الذكر عند الخروج من المنزل", Topic::Sunnah),
    ("الذكر عند دخول المنزل", Topic::Sunnah),
    ("أذكار الحج والعمرة", Topic::Sunnah),
    ("أذكار عامة", Topic::Sunnah),
    ("الأذكار اليومية", Topic::Sunnah),
    ("دعاء السفر", Topic::Sunnah),
    ("دعاء الطعام", Topic::Sunnah),
    ("دعاء النوم", Topic::Sunnah),
    ("دعاء الاستيقاظ", Topic::Sunnah),
    ("دعاء الزواج", Topic::Sunnah),
    ("دعاء دخول المنزل", Topic::Sunnah),
    ("دعاء زيارة القبور", Topic::Sunnah),
    ("دعاء المطر", Topic::Sunnah),
    ("دعاء الرزق", Topic::Sunnah),
    ("دعاء المريض", Topic::Sunnah),
    ("دعاء الاستخارة", Topic::Sunnah),
];

/// Topic a category label belongs to, compared on the folded label.
pub fn topic_of(label: &str) -> Option<Topic> {
    let key = search_key(label);
    TOPIC_LABELS
        .iter()
        .find(|(known, _)| search_key(known) == key)
        .map(|&(_, topic)| topic)
}

/// Drop groups that must never be shown: blank labels and groups with no items.
pub fn published(mut groups: Vec<TextGroup>) -> Vec<TextGroup> {
    groups.retain(|g| !g.category.trim().is_empty() && !g.items.is_empty());
    groups
}

pub fn filter_by_topic(mut groups: Vec<TextGroup>, topic: Topic) -> Vec<TextGroup> {
    groups.retain(|g| topic_of(&g.category) == Some(topic));
    groups
}

/// Groups whose label or any item text contains `query`. A blank query keeps
/// every group.
pub fn search_groups(mut groups: Vec<TextGroup>, query: &str) -> Vec<TextGroup> {
    if search_key(query).is_empty() {
        return groups;
    }
    groups.retain(|g| {
        folded_contains(&g.category, query) || g.items.iter().any(|item| folded_contains(&item.text, query))
    });
    groups
}

enum Dataset {
    Embedded,
    File(PathBuf),
    Inline(String),
}

pub struct AdhkarCatalog {
    dataset: Dataset,
    rules: ClassificationRules,
    classified: Mutex<Option<Arc<ClassifiedCollections>>>,
}

impl AdhkarCatalog {
    pub fn embedded(rules: ClassificationRules) -> Self {
        Self::with_dataset(Dataset::Embedded, rules)
    }

    pub fn from_path(path: impl Into<PathBuf>, rules: ClassificationRules) -> Self {
        Self::with_dataset(Dataset::File(path.into()), rules)
    }

    pub fn from_json(json: impl Into<String>, rules: ClassificationRules) -> Self {
        Self::with_dataset(Dataset::Inline(json.into()), rules)
    }

    fn with_dataset(dataset: Dataset, rules: ClassificationRules) -> Self {
        Self {
            dataset,
            rules,
            classified: Mutex::new(None),
        }
    }

    fn load_groups(&self) -> Result<Vec<TextGroup>, NoorError> {
        let parsed = match &self.dataset {
            Dataset::Embedded => serde_json::from_str(EMBEDDED_ADHKAR),
            Dataset::Inline(json) => serde_json::from_str(json),
            Dataset::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    NoorError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content)
            }
        };
        parsed.map_err(|e| NoorError::InvalidPayload(format!("adhkar dataset: {}", e)))
    }

    /// Classified collections, computed on first use.
    pub fn collections(&self) -> Result<Arc<ClassifiedCollections>, NoorError> {
        let mut cached = self.classified.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(collections) = cached.as_ref() {
            return Ok(Arc::clone(collections));
        }

        let groups = self.load_groups()?;
        let collections = Arc::new(classify(&groups, &self.rules));
        tracing::info!(
            groups = groups.len(),
            morning = collections.morning.len(),
            evening = collections.evening.len(),
            general = collections.general.len(),
            supplications = collections.supplications.len(),
            "classified adhkar dataset"
        );
        *cached = Some(Arc::clone(&collections));
        Ok(collections)
    }

    /// Forget the cached classification; the next access recomputes it.
    pub fn clear(&self) {
        *self.classified.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn morning(&self) -> Result<Vec<TextGroup>, NoorError> {
        Ok(self.collections()?.morning.clone())
    }

    pub fn evening(&self) -> Result<Vec<TextGroup>, NoorError> {
        Ok(self.collections()?.evening.clone())
    }

    pub fn general(&self) -> Result<Vec<TextGroup>, NoorError> {
        Ok(self.collections()?.general.clone())
    }

    pub fn supplications(&self) -> Result<Vec<TextGroup>, NoorError> {
        Ok(self.collections()?.supplications.clone())
    }

    /// Supplications plus the built-in extra duas. The published list for
    /// supplications goes through here.
    pub fn supplications_with_extras(&self) -> Result<Vec<TextGroup>, NoorError> {
        let extras: Vec<TextGroup> = serde_json::from_str(EMBEDDED_EXTRA_DUAS)
            .map_err(|e| NoorError::InvalidPayload(format!("extra duas: {}", e)))?;
        Ok(merge_by_category(self.supplications()?, extras))
    }

    /// The list a collection is published as: supplications carry the
    /// extras, and blank or empty groups are left out.
    pub fn collection(&self, collection: Collection) -> Result<Vec<TextGroup>, NoorError> {
        let groups = match collection {
            Collection::Morning => self.morning()?,
            Collection::Evening => self.evening()?,
            Collection::General => self.general()?,
            Collection::Supplications => self.supplications_with_extras()?,
        };
        Ok(published(groups))
    }

    /// Group with the given label, matched on the folded label.
    pub fn find(&self, collection: Collection, category: &str) -> Result<Option<TextGroup>, NoorError> {
        let key = search_key(category);
        Ok(self
            .collection(collection)?
            .into_iter()
            .find(|g| search_key(&g.category) == key))
    }

    pub fn search(&self, collection: Collection, query: &str) -> Result<Vec<TextGroup>, NoorError> {
        Ok(search_groups(self.collection(collection)?, query))
    }

    pub fn filter(&self, collection: Collection, topic: Topic) -> Result<Vec<TextGroup>, NoorError> {
        Ok(filter_by_topic(self.collection(collection)?, topic))
    }
}

/// Concatenate, keep one group per label (the later one), sort by label.
pub fn merge_by_category(base: Vec<TextGroup>, extras: Vec<TextGroup>) -> Vec<TextGroup> {
    let mut merged: Vec<TextGroup> = Vec::with_capacity(base.len() + extras.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for group in base.into_iter().chain(extras) {
        match index.get(&group.category) {
            Some(&pos) => merged[pos] = group,
            None => {
                index.insert(group.category.clone(), merged.len());
                merged.push(group);
            }
        }
    }

    let collator = Collator::arabic();
    merged.sort_by(|a, b| collator.compare(&a.category, &b.category));
    merged
}
