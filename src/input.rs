//! Reading the texts to classify from CSV or plain-text files.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while extracting texts from an input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{column}' not found in CSV file (available: {})", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Separator must not be empty")]
    EmptySeparator,

    #[error("Input contains no texts to classify")]
    Empty,
}

/// Delimiter used to split a plain-text file into items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Newline,
    Comma,
    Period,
    Semicolon,
    Custom(String),
}

impl Separator {
    pub fn as_str(&self) -> &str {
        match self {
            Separator::Newline => "\n",
            Separator::Comma => ",",
            Separator::Period => ".",
            Separator::Semicolon => ";",
            Separator::Custom(s) => s,
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Separator::Newline => write!(f, "newline"),
            Separator::Comma => write!(f, "comma"),
            Separator::Period => write!(f, "period"),
            Separator::Semicolon => write!(f, "semicolon"),
            Separator::Custom(s) => write!(f, "{:?}", s),
        }
    }
}

impl FromStr for Separator {
    type Err = InputError;

    /// Accepts the named separators (`newline`, `comma`, `period`,
    /// `semicolon`), their literal characters, `\n`, or any other non-empty
    /// string as a custom separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(InputError::EmptySeparator),
            "newline" | "\n" | "\\n" => Ok(Separator::Newline),
            "comma" | "," => Ok(Separator::Comma),
            "period" | "." => Ok(Separator::Period),
            "semicolon" | ";" => Ok(Separator::Semicolon),
            other => Ok(Separator::Custom(other.to_string())),
        }
    }
}

/// Where the texts live inside an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A named column of a CSV file with a header row.
    Csv { column: String },
    /// A plain-text file split on a separator.
    Text { separator: Separator },
}

/// Splits raw text into trimmed, non-empty items.
///
/// # Examples
///
/// ```
/// use musannif::input::{split_text, Separator};
///
/// let items = split_text("أولاً; ثانياً ;; ", &Separator::Semicolon);
/// assert_eq!(items, vec!["أولاً", "ثانياً"]);
/// ```
pub fn split_text(content: &str, separator: &Separator) -> Vec<String> {
    let sep = separator.as_str();
    if sep.is_empty() {
        let trimmed = content.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    content
        .split(sep)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Texts read from an input file, plus the other columns of CSV rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDataset {
    pub texts: Vec<String>,
    /// Headers of the CSV columns other than the text column, in file order.
    pub extra_columns: Vec<String>,
    /// Values of `extra_columns`, one entry per text. Empty for text files.
    pub extra_values: Vec<Vec<String>>,
}

/// Reads every value of `column` from CSV data with a header row.
///
/// Rows shorter than the header yield an empty string for the missing cell,
/// so the result always has one entry per data row.
pub fn read_csv_column<R: Read>(reader: R, column: &str) -> Result<Vec<String>, InputError> {
    read_csv_dataset(reader, column).map(|dataset| dataset.texts)
}

/// Reads `column` as the texts and keeps the remaining columns alongside.
pub fn read_csv_dataset<R: Read>(reader: R, column: &str) -> Result<InputDataset, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let Some(idx) = headers.iter().position(|h| h == column) else {
        return Err(InputError::MissingColumn {
            column: column.to_string(),
            available: headers,
        });
    };

    let cell = |record: &csv::StringRecord, i: usize| record.get(i).unwrap_or_default().to_string();
    let others: Vec<usize> = (0..headers.len()).filter(|&i| i != idx).collect();

    let mut dataset = InputDataset {
        extra_columns: others.iter().map(|&i| headers[i].clone()).collect(),
        ..InputDataset::default()
    };
    for record in rdr.records() {
        let record = record?;
        dataset.texts.push(cell(&record, idx));
        dataset
            .extra_values
            .push(others.iter().map(|&i| cell(&record, i)).collect());
    }
    Ok(dataset)
}

/// Loads the texts to classify from `path`.
///
/// # Errors
///
/// Returns `InputError::Empty` if the file yields no texts.
pub fn load_texts(path: &Path, source: &InputSource) -> Result<Vec<String>, InputError> {
    load_dataset(path, source).map(|dataset| dataset.texts)
}

/// Like [`load_texts`], keeping the other CSV columns of each row.
pub fn load_dataset(path: &Path, source: &InputSource) -> Result<InputDataset, InputError> {
    let read_err = |source| InputError::Read {
        path: path.to_path_buf(),
        source,
    };

    let dataset = match source {
        InputSource::Csv { column } => {
            let file = File::open(path).map_err(read_err)?;
            read_csv_dataset(file, column)?
        }
        InputSource::Text { separator } => {
            let content = std::fs::read_to_string(path).map_err(read_err)?;
            InputDataset {
                texts: split_text(content.trim_start_matches('\u{feff}'), separator),
                ..InputDataset::default()
            }
        }
    };

    if dataset.texts.is_empty() {
        return Err(InputError::Empty);
    }

    tracing::debug!(
        path = %path.display(),
        count = dataset.texts.len(),
        extra_columns = dataset.extra_columns.len(),
        "loaded input texts"
    );
    Ok(dataset)
}
