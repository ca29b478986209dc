use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use musannif::classifier::{BatchClassifierBuilder, BatchProgress, ProgressObserver};
use musannif::config::{self, CategoryPreset};
use musannif::experience::{AnalysisError, ExperienceAnalysis, ExperienceAnalyzerBuilder};
use musannif::gemini::{GeminiClientBuilder, GeminiError};
use musannif::input::{self, InputError, InputSource, Separator};
use musannif::privacy::{PatternError, PatternStore, Redactor};
use musannif::report::Summary;
use musannif::utils::{ensure_parent_directory, get_settings_path};
use musannif::{ClassificationPipeline, ClassifyError, Session};

/// musannif - batch text classification with identifier masking
#[derive(Parser)]
#[command(name = "musannif")]
#[command(about = "Classify short texts with Gemini, masking identifiers before they leave the machine")]
#[command(version)]
struct Cli {
    /// Request timeout in seconds for Gemini calls
    #[arg(long, global = true, default_value_t = 60, value_name = "SECS", value_parser = parse_timeout)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Classify every text of a CSV column or separator-split text file
    Classify(ClassifyCommand),

    /// Manage identifier masking patterns
    #[command(subcommand)]
    Patterns(PatternsCommand),

    /// Analyze a single student-experience text into weighted categories
    Analyze(AnalyzeCommand),

    /// Check API key, Gemini connectivity and privacy settings
    Doctor,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum InputFormat {
    Csv,
    Txt,
}

/// Classify a file of texts
#[derive(Parser)]
struct ClassifyCommand {
    /// Input file (.csv or plain text)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Input format; detected from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// CSV column holding the texts
    #[arg(short, long, default_value = "text")]
    column: String,

    /// Separator for text files: newline, comma, period, semicolon or any custom string
    #[arg(short, long, default_value = "newline")]
    separator: Separator,

    /// Built-in category set
    #[arg(short, long, conflicts_with = "categories")]
    preset: Option<CategoryPreset>,

    /// Custom categories, comma- or newline-separated
    #[arg(long, value_name = "LIST")]
    categories: Option<String>,

    /// Texts per Gemini request (1-100)
    #[arg(short, long, default_value_t = config::DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Write results to this CSV file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Fail when the model returns a label outside the category set
    #[arg(long)]
    strict_labels: bool,

    /// Do not print the results summary
    #[arg(long)]
    no_summary: bool,
}

/// Pattern management subcommands
#[derive(Subcommand)]
enum PatternsCommand {
    /// List configured patterns
    List,
    /// Add a pattern
    Add {
        /// Leading digits of the identifier
        #[arg(long, value_name = "DIGITS")]
        start_with: String,
        /// Total number of digits
        #[arg(long)]
        length: usize,
        /// What the identifier is
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove a pattern by its number in `patterns list`
    Remove {
        #[arg(value_name = "INDEX")]
        index: usize,
    },
}

/// Analyze one text
#[derive(Parser)]
struct AnalyzeCommand {
    /// Text to analyze
    #[arg(value_name = "TEXT", required_unless_present = "file")]
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

/// Invalid command-line usage detected after parsing.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    let result = match &cli.command {
        Commands::Classify(cmd) => handle_classify(cmd, timeout),
        Commands::Patterns(cmd) => handle_patterns(cmd),
        Commands::Analyze(cmd) => handle_analyze(cmd, timeout),
        Commands::Doctor => handle_doctor(),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are fixed by changing input, settings or flags. Everything
/// else, including Gemini failures, is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<ClassifyError>() {
            return err.is_user_error();
        }
        if let Some(err) = cause.downcast_ref::<AnalysisError>() {
            return matches!(err, AnalysisError::EmptyInput);
        }
        if let Some(err) = cause.downcast_ref::<GeminiError>() {
            return matches!(err, GeminiError::MissingApiKey | GeminiError::InvalidUrl(_));
        }
        if cause.is::<InputError>() || cause.is::<PatternError>() || cause.is::<UsageError>() {
            return true;
        }
    }
    false
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    let size: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    config::validate_batch_size(size)
}

fn parse_timeout(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(_) => Err(format!("'{}' is not a number", s)),
    }
}

fn open_store() -> Result<Arc<PatternStore>> {
    let path = get_settings_path()?;
    Ok(Arc::new(PatternStore::new(path)))
}

/// Chooses the category set: custom list, preset, or the default preset.
fn resolve_categories(preset: Option<CategoryPreset>, custom: Option<&str>) -> Result<Vec<String>> {
    match custom {
        Some(list) => {
            let categories = config::parse_categories(list);
            if categories.is_empty() {
                return Err(UsageError("--categories must name at least one category".to_string()).into());
            }
            Ok(categories)
        }
        None => Ok(preset.unwrap_or_default().categories()),
    }
}

fn detect_format(path: &Path, explicit: Option<InputFormat>) -> InputFormat {
    explicit.unwrap_or_else(|| {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Txt,
        }
    })
}

/// Prints batch progress and the masking notice to stderr.
struct TerminalProgress;

impl ProgressObserver for TerminalProgress {
    fn batch_completed(&self, progress: &BatchProgress) {
        eprint!(
            "\rProcessed {}/{} texts (batch {}/{}). Remaining: {:.1}s   ",
            progress.processed,
            progress.total,
            progress.batch,
            progress.total_batches,
            progress.eta().as_secs_f64()
        );
        if progress.is_complete() {
            eprintln!();
        }
        io::stderr().flush().ok();
    }

    fn identifiers_masked(&self) {
        eprintln!("Identifiers matching your privacy patterns were masked before sending.");
    }
}

fn handle_classify(cmd: &ClassifyCommand, timeout: Duration) -> Result<()> {
    let categories = resolve_categories(cmd.preset, cmd.categories.as_deref())?;

    let source = match detect_format(&cmd.input, cmd.format) {
        InputFormat::Csv => InputSource::Csv {
            column: cmd.column.clone(),
        },
        InputFormat::Txt => InputSource::Text {
            separator: cmd.separator.clone(),
        },
    };
    let dataset = input::load_dataset(&cmd.input, &source)?;

    let client = GeminiClientBuilder::new()
        .timeout(timeout)
        .build()
        .context("Failed to configure Gemini client")?;
    let classifier = BatchClassifierBuilder::new()
        .client(Arc::new(client))
        .batch_size(cmd.batch_size)
        .validate_labels(cmd.strict_labels)
        .build()?;
    let pipeline = ClassificationPipeline::new(open_store()?, classifier);

    let mut session = Session::new();
    let table = pipeline
        .run(&mut session, &dataset.texts, &categories, &TerminalProgress)?
        .with_source_columns(dataset.extra_columns, dataset.extra_values);

    match &cmd.output {
        Some(path) => {
            ensure_parent_directory(path)?;
            table
                .save_csv(path)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            println!("Results written to {}", path.display());
            if !cmd.no_summary {
                print!("{}", Summary::from_table(&table));
            }
        }
        None => {
            table
                .write_csv(io::stdout().lock())
                .context("Failed to write results")?;
            if !cmd.no_summary {
                eprint!("{}", Summary::from_table(&table));
            }
        }
    }

    Ok(())
}

fn handle_patterns(cmd: &PatternsCommand) -> Result<()> {
    let store = open_store()?;

    match cmd {
        PatternsCommand::List => {
            let settings = store.load()?;
            if settings.is_empty() {
                println!("No patterns configured ({})", store.path().display());
                return Ok(());
            }
            for (i, pattern) in settings.id_patterns.iter().enumerate() {
                println!(
                    "{}. starts with {}, {} digits: {}",
                    i + 1,
                    pattern.prefix(),
                    pattern.total_length(),
                    pattern.description()
                );
            }
        }
        PatternsCommand::Add {
            start_with,
            length,
            description,
        } => {
            let pattern = store.add_pattern(start_with, *length, description)?;
            println!(
                "Pattern added: starts with {}, {} digits ({})",
                pattern.prefix(),
                pattern.total_length(),
                pattern.description()
            );
        }
        PatternsCommand::Remove { index } => {
            if *index == 0 {
                return Err(UsageError("pattern numbers start at 1".to_string()).into());
            }
            let removed = store.remove_pattern(index - 1)?;
            println!(
                "Pattern removed: starts with {}, {} digits",
                removed.prefix(),
                removed.total_length()
            );
        }
    }

    Ok(())
}

fn handle_analyze(cmd: &AnalyzeCommand, timeout: Duration) -> Result<()> {
    let text = match (&cmd.text, &cmd.file) {
        (_, Some(path)) => std::fs::read_to_string(path)
            .map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            })?,
        (Some(text), None) => text.clone(),
        (None, None) => return Err(UsageError("provide TEXT or --file".to_string()).into()),
    };

    let settings = open_store()?.load()?;
    let client = GeminiClientBuilder::new()
        .timeout(timeout)
        .build()
        .context("Failed to configure Gemini client")?;
    let analyzer = ExperienceAnalyzerBuilder::new()
        .client(Arc::new(client))
        .redactor(Arc::new(Redactor::new(&settings.id_patterns)))
        .build();

    let analysis = analyzer.analyze(&text)?;

    if cmd.json {
        let json = serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?;
        println!("{}", json);
    } else {
        print_analysis(&analysis);
    }

    Ok(())
}

fn print_analysis(analysis: &ExperienceAnalysis) {
    for share in &analysis.categories {
        println!("{:>5.1}%  {}", share.percentage, share.name);
        println!("        {}", share.explanation);
    }
    println!();
    println!("Analysis time: {:.2}s", analysis.analysis_time);
}

fn handle_doctor() -> Result<()> {
    let settings_path = get_settings_path()?;
    let healthy = musannif::doctor::run_health_checks(&settings_path)?;
    if !healthy {
        anyhow::bail!("health check found problems");
    }
    Ok(())
}
