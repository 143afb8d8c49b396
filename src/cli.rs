use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    #[default]
    Normal,
    /// Per-document details and timings
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored, line-per-document report
    #[default]
    Human,
    /// Full results as JSON on stdout
    Json,
    /// Totals only
    Summary,
}

/// Derive SOA artifacts from XSD, WSDL and policy documents and link them together
#[derive(Parser, Debug, Clone)]
#[command(name = "artifact-deriver")]
#[command(version)]
pub struct Cli {
    /// Directory or single document to process
    pub path: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// File extensions to process (comma-separated, e.g. 'xsd,wsdl')
    #[arg(short = 'e', long = "extensions")]
    pub extensions: Option<String>,

    /// Map an extension to a document type, e.g. 'yaml=SwaggerDocument'
    #[arg(
        long = "type",
        value_name = "EXT=TYPE",
        value_parser = parse_key_value,
        action = clap::ArgAction::Append
    )]
    pub type_mappings: Vec<(String, String)>,

    /// Derive an extended document type with a built-in deriver, e.g. 'ServiceXml=WsdlDocument'
    #[arg(
        long = "alias",
        value_name = "TYPE=BUILTIN",
        value_parser = parse_key_value,
        action = clap::ArgAction::Append
    )]
    pub aliases: Vec<(String, String)>,

    /// Number of documents derived concurrently
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Per-document timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Stop after persisting derived artifacts, leaving references unresolved
    #[arg(long = "no-link")]
    pub no_link: bool,

    /// Skip persistence and linking once any document fails
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Show progress while deriving
    #[arg(long = "progress")]
    pub progress: bool,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only report failures
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))?;
    let (key, val) = (key.trim(), val.trim());
    if key.is_empty() || val.is_empty() {
        return Err(format!("expected KEY=VALUE, got '{}'", value));
    }
    Ok((key.to_string(), val.to_string()))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Extensions given on the command line, if any.
    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
