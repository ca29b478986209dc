//! Per-category statistics over a results table.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::output::OutputTable;

/// Words per category listed in the summary.
pub const TOP_WORDS: usize = 5;

/// Shortest token, in characters, counted as a word.
pub const MIN_WORD_LENGTH: usize = 2;

/// Arabic function words ignored when counting frequent words.
pub const STOP_WORDS: &[&str] = &[
    "في", "من", "على", "إلى", "عن", "مع", "هذا", "هذه", "تم", "فيه", "أن", "كان", "كانت",
    "لم", "لن", "ما", "هل", "قد", "لا", "إن", "كل", "بعد", "قبل", "حتى", "إذا", "كيف", "هو",
    "هي", "نحن", "هم", "هن", "أنت", "أنتم", "أنتن", "أنا", "به", "لها", "لهم", "لنا", "له",
    "منه", "منها", "منهم", "عنه", "عنها", "عنهم", "فيها", "فيهم", "بها", "بهم", "لك", "لكم",
    "لكن", "ثم", "أو", "أم", "بل", "و", "ف", "ب", "ل", "ك",
];

static ARABIC_WORD: OnceLock<Regex> = OnceLock::new();

fn arabic_word() -> &'static Regex {
    ARABIC_WORD.get_or_init(|| Regex::new(r"[\x{0600}-\x{06FF}]+").expect("arabic word regex is valid"))
}

/// Statistics for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub name: String,
    pub count: usize,
    /// Share of all rows, rounded to one decimal.
    pub percentage: f64,
    /// Mean text length in characters, rounded to one decimal.
    pub average_length: f64,
    /// Most frequent Arabic words with their counts.
    pub top_words: Vec<(String, usize)>,
}

/// Summary of a classification run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total: usize,
    /// Sorted by count descending, then name.
    pub categories: Vec<CategoryStats>,
}

impl Summary {
    pub fn from_table(table: &OutputTable) -> Self {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for row in table.rows() {
            let label = row.classification.as_str();
            match groups.iter().position(|(name, _)| *name == label) {
                Some(idx) => groups[idx].1.push(row.text.as_str()),
                None => groups.push((label, vec![row.text.as_str()])),
            }
        }

        let total = table.len();
        let mut categories: Vec<CategoryStats> = groups
            .into_iter()
            .map(|(name, texts)| {
                let count = texts.len();
                let chars: usize = texts.iter().map(|t| t.chars().count()).sum();
                CategoryStats {
                    name: name.to_string(),
                    count,
                    percentage: round1(count as f64 * 100.0 / total as f64),
                    average_length: round1(chars as f64 / count as f64),
                    top_words: top_words(&texts, TOP_WORDS),
                }
            })
            .collect();

        categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        Self { total, categories }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Classified {} texts into {} categories", self.total, self.categories.len())?;

        let width = self
            .categories
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(0);

        for cat in &self.categories {
            let pad = width - cat.name.chars().count();
            write!(
                f,
                "  {}{}  {:>5}  {:>5.1}%  avg {:>6.1} chars",
                cat.name,
                " ".repeat(pad),
                cat.count,
                cat.percentage,
                cat.average_length
            )?;
            if !cat.top_words.is_empty() {
                let words: Vec<String> = cat
                    .top_words
                    .iter()
                    .map(|(word, n)| format!("{} ({})", word, n))
                    .collect();
                write!(f, "  top: {}", words.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Most frequent Arabic words across `texts`, ties kept in first-seen order.
pub fn top_words(texts: &[&str], n: usize) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for text in texts {
        for word in arabic_word().find_iter(text).map(|m| m.as_str()) {
            if word.chars().count() < MIN_WORD_LENGTH || STOP_WORDS.contains(&word) {
                continue;
            }
            let count = counts.entry(word).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|word| (word.to_string(), counts[word]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
