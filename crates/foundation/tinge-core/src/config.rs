//! Process defaults
//!
//! Everything here can be overridden per process through `TINGE_*`
//! environment variables, or per call through the option record.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use lazy_static::lazy_static;

/// Default trace length (window length in plain mode)
pub const DEFAULT_LENGTH: usize = 12;

/// Default obfuscation alphabet
pub const DEFAULT_DICTIONARY: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Cap on concurrently scheduled cache flush timers
pub const DEFAULT_MAX_TIMERS: usize = 60;

/// Collision retries allowed after the first encode attempt
pub const DEFAULT_MAX_RETRIES: usize = 32;

lazy_static! {
    static ref PROCESS_SALT: String = uuid::Uuid::new_v4().to_string();
}

/// Salt generated once per process.
///
/// Settings carry their own salt, so a restart does not invalidate traces
/// that were issued under the previous process salt.
pub fn process_salt() -> &'static str {
    PROCESS_SALT.as_str()
}

/// Tinge configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TingeConfig {
    /// Trace length when the caller gives none
    pub length: usize,
    /// Salt when the caller gives none
    pub salt: String,
    /// Dictionary when the caller gives none
    pub dictionary: String,
    /// Base delay of a cache flush timer
    pub flush_delay: Duration,
    /// Max pending flush timers
    pub max_timers: usize,
    /// Collision retries after the first attempt
    pub max_retries: usize,
}

impl Default for TingeConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            salt: process_salt().to_string(),
            dictionary: DEFAULT_DICTIONARY.to_string(),
            flush_delay: Duration::from_secs(1),
            max_timers: DEFAULT_MAX_TIMERS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl TingeConfig {
    /// Defaults, overridden by any parseable `TINGE_*` variable
    ///
    /// ```text
    /// TINGE_LENGTH       default trace length
    /// TINGE_SALT         default salt (set it to keep one across restarts)
    /// TINGE_DICTIONARY   default dictionary
    /// TINGE_FLUSH_MS     base flush delay in milliseconds
    /// TINGE_MAX_TIMERS   pending flush timer cap
    /// TINGE_MAX_RETRIES  collision retries
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(length) = parse_var("TINGE_LENGTH") {
            config.length = length;
        }
        if let Some(salt) = non_empty_var("TINGE_SALT") {
            config.salt = salt;
        }
        if let Some(dictionary) = non_empty_var("TINGE_DICTIONARY") {
            config.dictionary = dictionary;
        }
        if let Some(millis) = parse_var::<u64>("TINGE_FLUSH_MS") {
            config.flush_delay = Duration::from_millis(millis);
        }
        if let Some(max_timers) = parse_var("TINGE_MAX_TIMERS") {
            config.max_timers = max_timers;
        }
        if let Some(max_retries) = parse_var("TINGE_MAX_RETRIES") {
            config.max_retries = max_retries;
        }

        config
    }

    pub fn with_flush_delay(mut self, flush_delay: Duration) -> Self {
        self.flush_delay = flush_delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_var(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparseable override");
            None
        }
    }
}
