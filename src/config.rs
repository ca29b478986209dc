//! Category presets and run defaults.

use std::fmt;
use std::str::FromStr;

/// Texts sent per model request unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: usize = 100;

/// Built-in category sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryPreset {
    #[default]
    Sentiment,
    StudentExperience,
    Legal,
}

impl CategoryPreset {
    pub const ALL: [CategoryPreset; 3] = [
        CategoryPreset::Sentiment,
        CategoryPreset::StudentExperience,
        CategoryPreset::Legal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoryPreset::Sentiment => "sentiment",
            CategoryPreset::StudentExperience => "student-experience",
            CategoryPreset::Legal => "legal",
        }
    }

    pub fn categories(&self) -> Vec<String> {
        let labels: &[&str] = match self {
            CategoryPreset::Sentiment => &["إيجابي", "سلبي", "محايد"],
            CategoryPreset::StudentExperience => &[
                "رضا الطالب بالتخصص",
                "عدم الرضا عن اساتذة الجامعة",
                "المشاكل الأكاديمية",
                "الخدمات الطلابية",
                "البيئة التعليمية",
            ],
            CategoryPreset::Legal => &["الجنائي", "التجاري", "الأسري", "الإداري"],
        };
        labels.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for CategoryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CategoryPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryPreset::ALL
            .into_iter()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| {
                let names: Vec<&str> = CategoryPreset::ALL.iter().map(|p| p.name()).collect();
                format!("unknown preset '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Parses a user-supplied category list.
///
/// Categories are separated by commas (Latin or Arabic) or newlines. Entries
/// are trimmed, blanks dropped and duplicates removed keeping first occurrence.
///
/// # Examples
///
/// ```
/// use musannif::config::parse_categories;
///
/// let cats = parse_categories("إيجابي، سلبي\n, إيجابي ,محايد");
/// assert_eq!(cats, vec!["إيجابي", "سلبي", "محايد"]);
/// ```
pub fn parse_categories(input: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for item in input.split([',', '،', '\n']) {
        let item = item.trim();
        if !item.is_empty() && !categories.iter().any(|c| c == item) {
            categories.push(item.to_string());
        }
    }
    categories
}

/// Checks a batch size against `1..=MAX_BATCH_SIZE`.
pub fn validate_batch_size(size: usize) -> Result<usize, String> {
    if (1..=MAX_BATCH_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(format!(
            "batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, size
        ))
    }
}
