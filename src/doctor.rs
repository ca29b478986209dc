//! Health check for musannif.
//!
//! Provides the `doctor` command functionality:
//! - API key presence
//! - Gemini connectivity and available models
//! - Privacy settings file status and patterns that can never match

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::gemini::GeminiClientBuilder;
use crate::privacy::{PatternStore, Redactor};

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Health status for a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HealthStatus::Error(_))
    }
}

/// Gemini connectivity information.
#[derive(Debug)]
pub struct GeminiHealth {
    pub status: HealthStatus,
    pub base_url: String,
    pub model: String,
    pub models: Vec<String>,
}

/// Privacy settings file information.
#[derive(Debug)]
pub struct SettingsHealth {
    pub status: HealthStatus,
    pub file_path: String,
    pub pattern_count: usize,
    /// Descriptions of patterns that compile to a matcher that never matches.
    pub inactive_patterns: Vec<String>,
}

// ============================================================================
// Health Check Functions
// ============================================================================

/// Performs all health checks and prints results.
///
/// Returns true when no component reported an error.
pub fn run_health_checks(settings_path: &Path) -> Result<bool> {
    let api_key = check_api_key(std::env::var("GEMINI_API_KEY").ok().as_deref());
    let gemini = if api_key.is_error() {
        GeminiHealth {
            status: HealthStatus::Error("Skipped: no API key".to_string()),
            base_url: String::new(),
            model: String::new(),
            models: Vec::new(),
        }
    } else {
        check_gemini_health()
    };
    let settings = check_settings_health(settings_path);

    let mut out = io::stdout().lock();
    write_health_report(&mut out, &api_key, &gemini, &settings)
        .and_then(|()| out.flush())
        .context("Failed to print health report")?;

    Ok(!api_key.is_error() && !gemini.status.is_error() && !settings.status.is_error())
}

/// Checks that an API key is configured without revealing it.
pub fn check_api_key(key: Option<&str>) -> HealthStatus {
    match key.map(str::trim) {
        Some(k) if !k.is_empty() => HealthStatus::Ok,
        _ => HealthStatus::Error("GEMINI_API_KEY is not set".to_string()),
    }
}

fn check_gemini_health() -> GeminiHealth {
    let client = match GeminiClientBuilder::new().build() {
        Ok(c) => c,
        Err(e) => {
            return GeminiHealth {
                status: HealthStatus::Error(format!("Failed to build client: {}", e)),
                base_url: String::new(),
                model: String::new(),
                models: Vec::new(),
            };
        }
    };

    let base_url = client.base_url().to_string();
    let model = client.model().to_string();

    match client.list_models() {
        Ok(models) => {
            let status = if models.is_empty() {
                HealthStatus::Warning("No models support generateContent".to_string())
            } else if !models.iter().any(|m| *m == model) {
                HealthStatus::Warning(format!("Configured model '{}' not listed", model))
            } else {
                HealthStatus::Ok
            };
            GeminiHealth {
                status,
                base_url,
                model,
                models,
            }
        }
        Err(e) => GeminiHealth {
            status: HealthStatus::Error(format!("Connection failed: {}", e)),
            base_url,
            model,
            models: Vec::new(),
        },
    }
}

/// Reads the settings file and reports patterns that can never match.
pub fn check_settings_health(path: &Path) -> SettingsHealth {
    let file_path = path.display().to_string();
    let store = PatternStore::new(path);

    match store.load() {
        Ok(settings) => {
            let redactor = Redactor::new(&settings.id_patterns);
            let inactive_patterns: Vec<String> = redactor
                .matchers()
                .iter()
                .filter(|m| !m.is_active())
                .map(|m| {
                    format!(
                        "{} (starts with {}, length {})",
                        m.pattern().description(),
                        m.pattern().prefix(),
                        m.pattern().total_length()
                    )
                })
                .collect();

            let status = if !inactive_patterns.is_empty() {
                HealthStatus::Warning(format!(
                    "{} pattern(s) can never match",
                    inactive_patterns.len()
                ))
            } else if !path.exists() {
                HealthStatus::Warning("No settings file, masking is disabled".to_string())
            } else {
                HealthStatus::Ok
            };

            SettingsHealth {
                status,
                file_path,
                pattern_count: settings.len(),
                inactive_patterns,
            }
        }
        Err(e) => SettingsHealth {
            status: HealthStatus::Error(e.to_string()),
            file_path,
            pattern_count: 0,
            inactive_patterns: Vec::new(),
        },
    }
}

// ============================================================================
// Pretty Printing
// ============================================================================

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "\u{2713}",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "\u{2717}",
    }
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

fn status_text(status: &HealthStatus, ok: &str) -> String {
    match status {
        HealthStatus::Ok => ok.to_string(),
        HealthStatus::Warning(w) => w.clone(),
        HealthStatus::Error(e) => e.clone(),
    }
}

fn write_health_report<W: Write>(
    out: &mut W,
    api_key: &HealthStatus,
    gemini: &GeminiHealth,
    settings: &SettingsHealth,
) -> io::Result<()> {
    writeln!(out, "{}musannif doctor{}", BOLD, RESET)?;
    writeln!(out)?;

    writeln!(out, "{}API key{}", BOLD, RESET)?;
    writeln!(
        out,
        "  {}{}{} GEMINI_API_KEY: {}",
        status_color(api_key),
        status_symbol(api_key),
        RESET,
        status_text(api_key, "set")
    )?;
    writeln!(out)?;

    writeln!(out, "{}Gemini{}", BOLD, RESET)?;
    writeln!(
        out,
        "  {}{}{} Status: {}",
        status_color(&gemini.status),
        status_symbol(&gemini.status),
        RESET,
        status_text(&gemini.status, "Connected")
    )?;
    if !gemini.base_url.is_empty() {
        writeln!(out, "    {}URL: {}{}", DIM, gemini.base_url, RESET)?;
        writeln!(out, "    {}Model: {}{}", DIM, gemini.model, RESET)?;
    }
    if !gemini.models.is_empty() {
        let models_display = if gemini.models.len() > 3 {
            format!(
                "{}, ... ({} more)",
                gemini.models[..3].join(", "),
                gemini.models.len() - 3
            )
        } else {
            gemini.models.join(", ")
        };
        writeln!(out, "    {}Available: {}{}", DIM, models_display, RESET)?;
    }
    writeln!(out)?;

    writeln!(out, "{}Privacy settings{}", BOLD, RESET)?;
    writeln!(
        out,
        "  {}{}{} Patterns: {}",
        status_color(&settings.status),
        status_symbol(&settings.status),
        RESET,
        match &settings.status {
            HealthStatus::Error(e) => e.clone(),
            _ => settings.pattern_count.to_string(),
        }
    )?;
    writeln!(out, "    {}Path: {}{}", DIM, settings.file_path, RESET)?;
    if let HealthStatus::Warning(w) = &settings.status {
        writeln!(out, "    {}{}{}", YELLOW, w, RESET)?;
    }
    for pattern in &settings.inactive_patterns {
        writeln!(out, "    {}- {}{}", DIM, pattern, RESET)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
