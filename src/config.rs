use crate::artifact::DocumentType;
use crate::cli::{Cli, OutputFormat};
use crate::engine::EngineConfig;
use crate::file_discovery::{FileDiscovery, default_type_mappings};
use crate::registry::{ConfiguredProvider, DeriverRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const ENV_PREFIX: &str = "ARTIFACT_DERIVER";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub derivation: DerivationConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
    pub derivers: DeriversConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DerivationConfig {
    /// Documents derived concurrently (defaults to the CPU count)
    pub threads: Option<usize>,
    pub fail_fast: bool,
    /// Run the link phase after persistence
    pub link: bool,
    /// Per-document timeout in seconds
    pub timeout_seconds: u64,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    /// Failures only
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub extensions: Vec<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Extension to document type name, layered over the built-in
    /// `xsd`/`wsdl`/`xml` mappings. Unknown names are extended types.
    pub type_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeriversConfig {
    /// Extended type name to the built-in document type whose deriver handles it
    pub extended: BTreeMap<String, String>,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            threads: None,
            fail_fast: false,
            link: true,
            timeout_seconds: 30,
            show_progress: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: default_type_mappings().into_keys().collect(),
            include_patterns: vec![],
            exclude_patterns: vec![],
            type_mappings: BTreeMap::new(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// First configuration file found in the working directory, then in the
    /// user configuration directory.
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "artifact-deriver.toml",
            "artifact-deriver.json",
            ".artifact-deriver.toml",
            ".artifact-deriver.json",
        ];

        let mut candidates: Vec<PathBuf> = config_names.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("artifact-deriver");
            candidates.extend(config_names.iter().map(|name| app_dir.join(name)));
        }

        for path in candidates {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "using configuration file");
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }
        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(threads) = parse_env(env, "THREADS")? {
            config.derivation.threads = Some(threads);
        }
        if let Some(fail_fast) = parse_env(env, "FAIL_FAST")? {
            config.derivation.fail_fast = fail_fast;
        }
        if let Some(link) = parse_env(env, "LINK")? {
            config.derivation.link = link;
        }
        if let Some(timeout) = parse_env(env, "TIMEOUT")? {
            config.derivation.timeout_seconds = timeout;
        }
        if let Some(verbose) = parse_env(env, "VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "QUIET")? {
            config.output.quiet = quiet;
        }

        let format_key = format!("{}_FORMAT", ENV_PREFIX);
        if let Some(format) = env.get(&format_key) {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid {} value: {}",
                        format_key, format
                    )));
                }
            };
        }

        if let Some(extensions) = env.get(&format!("{}_EXTENSIONS", ENV_PREFIX)) {
            config.files.extensions = split_list(&extensions);
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration. Only flags actually given override.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.threads.is_some() {
            config.derivation.threads = cli.threads;
        }
        if let Some(timeout) = cli.timeout {
            config.derivation.timeout_seconds = timeout;
        }
        if cli.fail_fast {
            config.derivation.fail_fast = true;
        }
        if cli.no_link {
            config.derivation.link = false;
        }
        if cli.progress {
            config.derivation.show_progress = true;
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        config
            .files
            .type_mappings
            .extend(cli.type_mappings.iter().cloned());
        config
            .derivers
            .extended
            .extend(cli.aliases.iter().cloned());

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.derivation.threads.is_some() {
            base.derivation.threads = override_config.derivation.threads;
        }
        base.derivation.fail_fast = override_config.derivation.fail_fast;
        base.derivation.link = override_config.derivation.link;
        base.derivation.timeout_seconds = override_config.derivation.timeout_seconds;
        base.derivation.show_progress = override_config.derivation.show_progress;

        base.output = override_config.output;

        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if !override_config.files.include_patterns.is_empty() {
            base.files.include_patterns = override_config.files.include_patterns;
        }
        if !override_config.files.exclude_patterns.is_empty() {
            base.files.exclude_patterns = override_config.files.exclude_patterns;
        }
        base.files
            .type_mappings
            .extend(override_config.files.type_mappings);
        base.derivers
            .extended
            .extend(override_config.derivers.extended);

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.derivation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.derivation.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }
        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        for (ext, type_name) in &config.files.type_mappings {
            if !config
                .files
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
            {
                return Err(ConfigError::Validation(format!(
                    "Type mapping for '{}' but it is not a processed extension",
                    ext
                )));
            }
            type_name
                .parse::<DocumentType>()
                .map_err(ConfigError::Validation)?;
        }

        for (extended, target) in &config.derivers.extended {
            let builtin = target
                .parse::<DocumentType>()
                .is_ok_and(|t| t.is_builtin());
            if !builtin {
                return Err(ConfigError::Validation(format!(
                    "Extended type '{}' must alias a built-in document type, got '{}'",
                    extended, target
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.derivation.threads.unwrap_or_else(num_cpus::get)
    }

    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.derivation.timeout_seconds)
    }

    pub fn engine_config(config: &Config) -> EngineConfig {
        EngineConfig {
            max_concurrent_derivations: Self::get_thread_count(config),
            derivation_timeout: Self::get_timeout_duration(config),
            fail_fast: config.derivation.fail_fast,
            link: config.derivation.link,
        }
    }

    /// Built-in mappings overlaid with configured ones, limited to the
    /// processed extensions.
    pub fn type_mappings(config: &Config) -> Result<BTreeMap<String, DocumentType>> {
        let mut mappings = default_type_mappings();
        for (ext, type_name) in &config.files.type_mappings {
            let document_type = type_name.parse().map_err(ConfigError::Validation)?;
            mappings.insert(ext.to_lowercase(), document_type);
        }
        let extensions: Vec<String> = config
            .files
            .extensions
            .iter()
            .map(|e| e.to_lowercase())
            .collect();
        mappings.retain(|ext, _| extensions.contains(ext));
        Ok(mappings)
    }

    pub fn file_discovery(config: &Config) -> crate::error::Result<FileDiscovery> {
        FileDiscovery::new()
            .with_type_mappings(Self::type_mappings(config)?)
            .with_include_patterns(&config.files.include_patterns)?
            .with_exclude_patterns(&config.files.exclude_patterns)
    }

    /// Registry with the built-in derivers plus the configured aliases.
    pub fn deriver_registry(config: &Config) -> crate::error::Result<DeriverRegistry> {
        let provider = ConfiguredProvider::from_aliases(&config.derivers.extended)?;
        Ok(DeriverRegistry::builder()
            .with_builtins()
            .with_provider(&provider)
            .build())
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl EnvProvider, suffix: &str) -> Result<Option<T>> {
    let key = format!("{}_{}", ENV_PREFIX, suffix);
    match env.get(&key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ConfigError::Environment(format!("Invalid {} value: {}", key, raw))
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
