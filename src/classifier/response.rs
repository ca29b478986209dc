use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

static NUMBERED_LINE: OnceLock<Regex> = OnceLock::new();

fn numbered_line() -> &'static Regex {
    NUMBERED_LINE.get_or_init(|| {
        Regex::new(r"^([0-9]+)\.\s*(.+)$").expect("numbered line regex is valid")
    })
}

/// Ways a numbered model response can fail to line up with its batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("line {line_no} is not of the form \"<number>. <label>\": {line:?}")]
    MalformedLine { line_no: usize, line: String },

    #[error("wrong line count: expected {expected}, received {received}")]
    WrongCount { expected: usize, received: usize },

    #[error("line {line_no} is numbered {found}, expected {expected}")]
    UnexpectedNumber {
        line_no: usize,
        expected: usize,
        found: String,
    },

    #[error("line {line_no} has an empty label")]
    EmptyLabel { line_no: usize },
}

/// Parses a `"1. label"` listing into exactly `expected` labels.
///
/// Blank lines and surrounding whitespace are ignored. Every other line must
/// match `^\d+\.\s*(.+)$`, the numbers must run `1..=expected` in order, and
/// no label may be empty.
///
/// # Examples
///
/// ```
/// use musannif::classifier::parse_numbered_labels;
///
/// let labels = parse_numbered_labels("1. سلبي\n2. محايد\n", 2).unwrap();
/// assert_eq!(labels, vec!["سلبي", "محايد"]);
///
/// assert!(parse_numbered_labels("1. سلبي", 2).is_err());
/// ```
pub fn parse_numbered_labels(response: &str, expected: usize) -> Result<Vec<String>, ResponseError> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut parsed = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = numbered_line().captures(line) else {
            return Err(ResponseError::MalformedLine {
                line_no: idx + 1,
                line: line.to_string(),
            });
        };
        parsed.push((caps[1].to_string(), caps[2].trim().to_string()));
    }

    if parsed.len() != expected {
        return Err(ResponseError::WrongCount {
            expected,
            received: parsed.len(),
        });
    }

    let mut labels = Vec::with_capacity(expected);
    for (idx, (number, label)) in parsed.into_iter().enumerate() {
        let line_no = idx + 1;
        if number.parse::<usize>().ok() != Some(line_no) {
            return Err(ResponseError::UnexpectedNumber {
                line_no,
                expected: line_no,
                found: number,
            });
        }
        if label.is_empty() {
            return Err(ResponseError::EmptyLabel { line_no });
        }
        labels.push(label);
    }

    Ok(labels)
}

/// Number of non-blank lines in a response, used when reporting failures.
pub(crate) fn received_lines(response: &str) -> usize {
    response.lines().filter(|line| !line.trim().is_empty()).count()
}
