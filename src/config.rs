use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Selector generator tuning
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    /// Attributes tried first, in priority order
    pub preferred_attributes: Vec<String>,
    /// Longest visible text the text strategy will use
    pub max_text_length: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            preferred_attributes: ["data-testid", "data-test", "data-cy", "id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_text_length: 30,
        }
    }
}

/// Action parser tuning
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// A click must be followed after more than this delay to earn a visibility wait
    pub min_wait_delay_ms: u64,
    /// Ceiling for inserted visibility waits
    pub max_wait_timeout_ms: u64,
    /// How many following selectors a navigation step asserts on
    pub lookahead: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            min_wait_delay_ms: 100,
            max_wait_timeout_ms: 5000,
            lookahead: 3,
        }
    }
}

/// Browser and artifact settings for a recording session
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1280,
            viewport_height: 720,
            output_dir: PathBuf::from("generated"),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub selector: SelectorOptions,
    pub parser: ParserOptions,
    pub recording: RecordingOptions,
}

impl Config {
    /// Load `.env` from the working directory into the process environment,
    /// then read the config. Call before anything else reads the environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Like [`load`](Self::load) with an explicit env file
    pub fn load_from(path: &Path) -> Self {
        if let Err(e) = dotenvy::from_path(path) {
            tracing::debug!("No env file at {}: {}", path.display(), e);
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let preferred_attributes = env::var("PLAYSCRIBE_PREFERRED_ATTRIBUTES")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.selector.preferred_attributes);

        Self {
            port: env_parse("PLAYSCRIBE_PORT").unwrap_or(defaults.port),
            host: env::var("PLAYSCRIBE_HOST").unwrap_or(defaults.host),
            selector: SelectorOptions {
                preferred_attributes,
                max_text_length: env_parse("PLAYSCRIBE_MAX_TEXT_LENGTH")
                    .unwrap_or(defaults.selector.max_text_length),
            },
            parser: ParserOptions {
                min_wait_delay_ms: env_parse("PLAYSCRIBE_MIN_WAIT_DELAY_MS")
                    .unwrap_or(defaults.parser.min_wait_delay_ms),
                max_wait_timeout_ms: env_parse("PLAYSCRIBE_MAX_WAIT_TIMEOUT_MS")
                    .unwrap_or(defaults.parser.max_wait_timeout_ms),
                lookahead: defaults.parser.lookahead,
            },
            recording: RecordingOptions {
                headless: env_flag("PLAYSCRIBE_HEADLESS").unwrap_or(defaults.recording.headless),
                output_dir: env::var("PLAYSCRIBE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.recording.output_dir),
                dry_run: env_flag("PLAYSCRIBE_DRY_RUN").unwrap_or(defaults.recording.dry_run),
                ..defaults.recording
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8766,
            host: "127.0.0.1".to_string(),
            selector: SelectorOptions::default(),
            parser: ParserOptions::default(),
            recording: RecordingOptions::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
