use std::error::Error;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

use pyframe_capture::CaptureOptions;

/// Cap on captured frames. Unset or empty means no cap.
pub const MAX_FRAMES_ENV: &str = "PYFRAME_MAX_FRAMES";
/// Log filter used when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "PYFRAME_LOG";

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_frames: Option<NonZeroUsize>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frames: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_FRAMES_ENV).filter(|v| !v.trim().is_empty()) {
            let parsed = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid(MAX_FRAMES_ENV, &raw, e.to_string()))?;
            let max = NonZeroUsize::new(parsed)
                .ok_or_else(|| ConfigError::invalid(MAX_FRAMES_ENV, &raw, "must be positive"))?;
            config.max_frames = Some(max);
        }

        if let Some(filter) = lookup(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            max_frames: self.max_frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid {var}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it process-wide.
///
/// First call wins; later calls return the installed config.
pub fn init() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

pub(crate) fn capture_options() -> CaptureOptions {
    CONFIG
        .get()
        .map(Config::capture_options)
        .unwrap_or_default()
}
