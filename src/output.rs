//! Classification results and their CSV export.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

const UTF8_BOM: &str = "\u{feff}";
const RESULT_COLUMNS: [&str; 3] = ["original_text", "text", "classification"];

/// One classified input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    /// The text as read, present only when masking changed the dataset.
    pub original_text: Option<String>,
    /// The text that was sent for classification.
    pub text: String,
    pub classification: String,
}

/// Results of one run, one row per input item in input order.
///
/// Either every row carries `original_text` or none does.
///
/// Tables built from CSV input can also carry the other columns of the source
/// file, which are exported ahead of the result columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTable {
    rows: Vec<OutputRow>,
    has_original: bool,
    source_columns: Vec<String>,
    source_values: Vec<Vec<String>>,
}

impl OutputTable {
    /// Zips texts and labels into rows.
    ///
    /// `originals` is `Some` when masking changed at least one text; it must
    /// then be the same length as `texts`.
    pub(crate) fn from_parts(
        originals: Option<Vec<String>>,
        texts: Vec<String>,
        labels: Vec<String>,
    ) -> Self {
        debug_assert_eq!(texts.len(), labels.len());
        let has_original = originals.is_some();

        let rows = match originals {
            Some(originals) => originals
                .into_iter()
                .zip(texts)
                .zip(labels)
                .map(|((original, text), classification)| OutputRow {
                    original_text: Some(original),
                    text,
                    classification,
                })
                .collect(),
            None => texts
                .into_iter()
                .zip(labels)
                .map(|(text, classification)| OutputRow {
                    original_text: None,
                    text,
                    classification,
                })
                .collect(),
        };

        Self {
            rows,
            has_original,
            source_columns: Vec::new(),
            source_values: Vec::new(),
        }
    }

    /// Attaches passthrough columns from the input file.
    ///
    /// `values` holds one entry per row in row order. Missing rows and cells
    /// are exported as empty strings, surplus ones are dropped. A column whose
    /// name clashes with a result column is exported as `source_<name>`.
    pub fn with_source_columns(mut self, columns: Vec<String>, mut values: Vec<Vec<String>>) -> Self {
        values.resize(self.rows.len(), Vec::new());
        for row in &mut values {
            row.resize(columns.len(), String::new());
        }

        self.source_columns = columns
            .into_iter()
            .map(|name| {
                if RESULT_COLUMNS.contains(&name.as_str()) {
                    format!("source_{}", name)
                } else {
                    name
                }
            })
            .collect();
        self.source_values = values;
        self
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the `original_text` column is present.
    pub fn has_original(&self) -> bool {
        self.has_original
    }

    /// Names of the passthrough columns, empty unless attached.
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    /// Passthrough values of row `index`, empty when no columns are attached.
    pub fn source_values(&self, index: usize) -> &[String] {
        self.source_values
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Exported column names: passthrough columns, then the result columns.
    pub fn headers(&self) -> Vec<&str> {
        let results = if self.has_original {
            &RESULT_COLUMNS[..]
        } else {
            &RESULT_COLUMNS[1..]
        };
        self.source_columns
            .iter()
            .map(String::as_str)
            .chain(results.iter().copied())
            .collect()
    }

    /// Writes the table as CSV with a UTF-8 BOM and every field quoted.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<(), csv::Error> {
        writer.write_all(UTF8_BOM.as_bytes())?;

        let mut wtr = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(writer);

        wtr.write_record(self.headers())?;
        for (index, row) in self.rows.iter().enumerate() {
            let record = self
                .source_values(index)
                .iter()
                .map(String::as_str)
                .chain(row.original_text.as_deref())
                .chain([row.text.as_str(), row.classification.as_str()]);
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the CSV export to `path`, replacing any existing file.
    pub fn save_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}
