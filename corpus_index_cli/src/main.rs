//! # corpus-index CLI
//!
//! Inspect term and stream literals and balance highlight events from the
//! command line.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use corpus_index::config::compile_time::highlight::MAX_CLASS_NUMBER;
use corpus_index::config::RuntimeConfig;
use corpus_index::highlight::{HighlightCombinator, Notation};
use corpus_index::logging::{self, codes, FacadeLogger, LogLevel, LoggingService};
use corpus_index::{log_error, log_info, log_success, ParseMode, Term, TokenStream};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "corpus-index",
    about = "Multi-annotation token codec and highlight balancer",
    version
)]
struct Cli {
    /// Route library events through the `log` facade (filter with RUST_LOG)
    #[arg(long, global = true)]
    log_facade: bool,

    /// Runtime preferences TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one term literal and print its fields as JSON
    Term {
        literal: String,

        /// Drop malformed offsets or payloads instead of rejecting the term
        #[arg(long)]
        lenient: bool,
    },

    /// Parse a stream literal and print every posting it emits
    Stream {
        /// Stream literal, or @FILE to read it from a file
        literal: String,

        /// Skip malformed bracket groups instead of failing
        #[arg(long)]
        skip_malformed: bool,

        /// Print postings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Balance highlight events: open:N, close:N, text:STRING
    Highlight {
        #[arg(required = true)]
        events: Vec<HighlightEvent>,

        /// Render as HTML marks instead of brackets
        #[arg(long)]
        html: bool,
    },
}

#[derive(Debug, Clone)]
enum HighlightEvent {
    Open(u32),
    Close(u32),
    Text(String),
}

impl FromStr for HighlightEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected open:N, close:N or text:STRING, got '{}'", s))?;

        let class = || -> Result<u32, String> {
            let number: u32 = value
                .parse()
                .map_err(|_| format!("class number '{}' is not a non-negative integer", value))?;
            if number > MAX_CLASS_NUMBER {
                return Err(format!(
                    "class number {} exceeds maximum {}",
                    number, MAX_CLASS_NUMBER
                ));
            }
            Ok(number)
        };

        match kind {
            "open" => Ok(HighlightEvent::Open(class()?)),
            "close" => Ok(HighlightEvent::Close(class()?)),
            "text" => Ok(HighlightEvent::Text(value.to_string())),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.log_facade {
        env_logger::init();
        let facade = Arc::new(FacadeLogger::new(LogLevel::Debug));
        logging::init_global_logging_with_service(Arc::new(LoggingService::new(
            facade,
            LogLevel::Debug,
        )))?;
    } else {
        logging::init_global_logging()?;
    }

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_toml_file(path)?,
        None => RuntimeConfig::default(),
    };

    let result = match cli.command {
        Commands::Term { literal, lenient } => {
            logging::with_document_context("term", 1, || run_term(&literal, lenient, &config))
        }
        Commands::Stream {
            literal,
            skip_malformed,
            json,
        } => {
            let document = literal.strip_prefix('@').unwrap_or("stream").to_string();
            logging::with_document_context(&document, 1, || {
                run_stream(&literal, skip_malformed, json, config)
            })
        }
        Commands::Highlight { events, html } => {
            logging::with_document_context("highlight", 1, || {
                run_highlight(&events, html, &config)
            })
        }
    };

    let summary = logging::get_processing_summary();
    if summary.total_errors + summary.total_warnings > 0 {
        if let Some(report) = logging::processing_report() {
            eprintln!("{}", report);
        }
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// `--lenient` forces lenient parsing, otherwise the configured mode applies
fn term_mode(lenient: bool, config: &RuntimeConfig) -> ParseMode {
    if lenient {
        ParseMode::Lenient
    } else {
        config.codec.parse_mode
    }
}

fn run_term(
    literal: &str,
    lenient: bool,
    config: &RuntimeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = term_mode(lenient, config);

    let term = Term::parse(literal, mode).map_err(|e| {
        if config.codec.log_rejected_terms {
            log_error!(e.error_code(), "Term literal rejected", "literal" => literal);
        }
        e
    })?;
    log_success!(codes::success::TERM_PARSED, "Term literal parsed",
        "literal" => literal,
        "mode" => format!("{:?}", mode)
    );

    let output = json!({
        "text": term.text(),
        "prefix": term.prefix(),
        "value": term.value(),
        "offsets": term.offsets().map(|(start, end)| json!({ "start": start, "end": end })),
        "payload": term.payload().map(|bytes| STANDARD.encode(bytes)),
        "literal": term.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_stream(
    literal: &str,
    skip_malformed: bool,
    as_json: bool,
    mut config: RuntimeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let literal = match literal.strip_prefix('@') {
        Some(path) => {
            log_info!("Reading stream literal from file", "path" => path);
            std::fs::read_to_string(path)?
        }
        None => literal.to_string(),
    };

    if skip_malformed {
        config.stream.skip_malformed_groups = true;
    }

    let (mut stream, skipped) = TokenStream::parse_with_config(literal.trim(), &config)?;
    for err in &skipped {
        eprintln!("skipped: [{}] {}", err.error_code(), err);
    }

    let postings = stream.postings();

    if as_json {
        let rows: Vec<_> = postings
            .iter()
            .map(|posting| {
                json!({
                    "text": posting.text,
                    "position_increment": posting.position_increment,
                    "payload": posting.payload.as_deref().map(|bytes| STANDARD.encode(bytes)),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for posting in &postings {
            let payload = posting
                .payload
                .as_deref()
                .map(|bytes| STANDARD.encode(bytes))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}\t+{}\t{}",
                posting.text, posting.position_increment, payload
            );
        }
    }

    Ok(())
}

fn run_highlight(
    events: &[HighlightEvent],
    html: bool,
    config: &RuntimeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut combinator = HighlightCombinator::with_preferences(&config.highlight);

    for event in events {
        match event {
            HighlightEvent::Open(class) => combinator.add_open(*class),
            HighlightEvent::Close(class) => combinator.add_close(*class),
            HighlightEvent::Text(text) => combinator.add_string(text.as_str()),
        };
    }
    combinator.close_all();

    let notation = if html {
        Notation::Html
    } else {
        Notation::Brackets
    };
    println!("{}", combinator.render(notation));

    if combinator.imbalance_count() > 0 {
        eprintln!("{} unmatched highlight event(s) ignored", combinator.imbalance_count());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parsing() {
        assert!(matches!(
            "open:3".parse::<HighlightEvent>(),
            Ok(HighlightEvent::Open(3))
        ));
        assert!(matches!(
            "close:0".parse::<HighlightEvent>(),
            Ok(HighlightEvent::Close(0))
        ));
        assert!(matches!(
            "text:a:b".parse::<HighlightEvent>(),
            Ok(HighlightEvent::Text(t)) if t == "a:b"
        ));
        assert!("open:-1".parse::<HighlightEvent>().is_err());
        assert!("open".parse::<HighlightEvent>().is_err());
        assert!("shut:1".parse::<HighlightEvent>().is_err());
        assert!(format!("open:{}", u64::from(MAX_CLASS_NUMBER) + 1)
            .parse::<HighlightEvent>()
            .is_err());
    }

    #[test]
    fn test_term_mode_follows_config() {
        let mut config = RuntimeConfig::default();
        config.codec.parse_mode = ParseMode::Lenient;
        assert_eq!(term_mode(false, &config), ParseMode::Lenient);

        config.codec.parse_mode = ParseMode::Strict;
        assert_eq!(term_mode(false, &config), ParseMode::Strict);
        assert_eq!(term_mode(true, &config), ParseMode::Lenient);

        assert!(run_term("a#x-1", false, &config).is_err());
        config.codec.parse_mode = ParseMode::Lenient;
        assert!(run_term("a#x-1", false, &config).is_ok());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["corpus-index", "highlight", "open:1", "text:x", "--html"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Highlight { html: true, .. }));
    }
}
