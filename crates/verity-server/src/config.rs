//! Server configuration
//!
//! Loaded from `verity.toml`; every section is optional. Command-line flags
//! are applied on top with [`Config::apply`], then [`Config::validate`] runs
//! once before anything starts.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8787"
//!
//! [corpus]
//! source_dir = "./kb"
//! max_citations = 5
//!
//! [actions]
//! cooldown_secs = 30
//! sweep_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use verity_actions::{LedgerConfig, DEFAULT_TICKET_SUBJECT};
use verity_corpus::{CorpusConfig, Lexicon};
use verity_grounding::RefusalMessages;
use verity_session::ScriptedConfig;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "verity.toml";

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener
    pub server: ServerConfig,
    /// Knowledge base location and search limits
    pub corpus: CorpusConfig,
    /// Query stopwords and synonyms
    pub lexicon: Lexicon,
    /// Refusal texts
    pub grounding: RefusalMessages,
    /// Ledger timing and ticket defaults
    pub actions: ActionsConfig,
    /// Scripted generator pacing
    pub generator: ScriptedConfig,
    /// Log filter and format
    pub logging: LoggingConfig,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
        }
    }
}

/// `[actions]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Repeat confirmations within this many seconds are ignored
    pub cooldown_secs: u64,
    /// Pending and executed entries older than this are swept
    pub max_age_secs: u64,
    /// Seconds between sweeps
    pub sweep_interval_secs: u64,
    /// Subject attached to ticket suggestions
    pub ticket_subject: String,
}

impl ActionsConfig {
    /// Ledger timing
    #[must_use]
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            cooldown: Duration::from_secs(self.cooldown_secs),
            max_age: Duration::from_secs(self.max_age_secs),
        }
    }

    /// Sweep period
    #[inline]
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30,
            max_age_secs: 300,
            sweep_interval_secs: 60,
            ticket_subject: DEFAULT_TICKET_SUBJECT.to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--bind`
    pub bind: Option<SocketAddr>,
    /// `--corpus-dir`
    pub corpus_dir: Option<PathBuf>,
    /// `--log-level`
    pub log_level: Option<String>,
}

impl Config {
    /// Parse a TOML document
    ///
    /// # Errors
    /// `ConfigError::Parse` on invalid TOML or unknown value shapes
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a config file
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load [`DEFAULT_CONFIG_FILE`] from `dir` if present, defaults otherwise
    ///
    /// # Errors
    /// Propagates read and parse failures of an existing file
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: CliOverrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(dir) = overrides.corpus_dir {
            self.corpus.source_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject values the server cannot run with
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.corpus.max_citations == 0 {
            return Err(ConfigError::invalid("corpus.max_citations", "must be at least 1"));
        }
        if self.corpus.extensions.is_empty() {
            return Err(ConfigError::invalid("corpus.extensions", "must not be empty"));
        }
        if self.actions.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid("actions.sweep_interval_secs", "must be at least 1"));
        }
        if self.generator.min_token_delay_ms > self.generator.max_token_delay_ms {
            return Err(ConfigError::invalid(
                "generator.min_token_delay_ms",
                format!(
                    "{} exceeds max_token_delay_ms {}",
                    self.generator.min_token_delay_ms, self.generator.max_token_delay_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.generator.fallback_hallucination_rate) {
            return Err(ConfigError::invalid(
                "generator.fallback_hallucination_rate",
                "must be between 0 and 1",
            ));
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::invalid("logging.level", e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Config {
        Config::from_toml_str(text, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.server.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.corpus.max_citations, 5);
        assert_eq!(config.actions.ledger_config(), LedgerConfig::default());
        assert_eq!(config.lexicon, Lexicon::builtin());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [corpus]
            source_dir = "/srv/kb"
            extensions = ["md", "txt"]

            [grounding]
            no_support_message = "Inget stöd."

            [actions]
            cooldown_secs = 5
            ticket_subject = "Faktura"

            [logging]
            format = "json"
            "#,
        );

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.corpus.source_dir, PathBuf::from("/srv/kb"));
        assert_eq!(config.corpus.extensions, vec!["md", "txt"]);
        assert_eq!(config.corpus.max_citations, 5);
        assert_eq!(config.grounding.no_support_message, "Inget stöd.");
        assert_eq!(config.grounding.cannot_verify_message, RefusalMessages::default().cannot_verify_message);
        assert_eq!(config.actions.cooldown_secs, 5);
        assert_eq!(config.actions.max_age_secs, 300);
        assert_eq!(config.actions.ticket_subject, "Faktura");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = parse(include_str!("../../../verity.example.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_lexicon_keeps_builtin_synonyms() {
        let config = parse(
            r#"
            [lexicon]
            stopwords = ["och"]
            "#,
        );
        assert_eq!(config.lexicon.stopwords.len(), 1);
        assert_eq!(config.lexicon.synonyms, Lexicon::builtin().synonyms);
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = parse("[server]\nbind = \"0.0.0.0:9000\"\n");
        config.apply(CliOverrides {
            bind: Some("127.0.0.1:1234".parse().unwrap()),
            corpus_dir: Some(PathBuf::from("other")),
            log_level: None,
        });
        assert_eq!(config.server.bind.port(), 1234);
        assert_eq!(config.corpus.source_dir, PathBuf::from("other"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut config = Config::default();
        config.corpus.max_citations = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "corpus.max_citations", .. })
        ));

        let mut config = Config::default();
        config.actions.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.min_token_delay_ms = 100;
        config.generator.max_token_delay_ms = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "generator.min_token_delay_ms", .. })
        ));
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let err = Config::from_toml_str("[server\nbind = 1", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[corpus]\nmax_citations = 3\n").unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().corpus.max_citations, 3);
    }
}
