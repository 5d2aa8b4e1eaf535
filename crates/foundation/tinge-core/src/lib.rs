//! # Tinge Core
//!
//! Short public traces that stand in for a secret derived from a list of factors.
//!
//! ## Core Principle
//!
//! ```text
//! FACTORS ──sha512──► SECRET ──split 2-of-N──► SAMPLE (2 shares)
//!                                                  │
//!                                         join + obfuscate
//!                                                  │
//!                                                  ▼
//!                 CODE ──random window──► TRACE (public, short)
//!                   │
//!                   └── sealed into SETTING (opaque, compressed)
//!
//! TRACE + SETTING  ──►  SECRET
//! ```
//!
//! The secret is never stored. The trace alone is a window into an obfuscated
//! pair of shares, and the setting is the only thing that can widen it back.

pub mod cache;
pub mod codec;
pub mod config;
pub mod derivation;
pub mod joiner;
pub mod protocol;
pub mod split;
pub mod window;

pub use cache::TraceCache;
pub use codec::Codec;
pub use config::{TingeConfig, DEFAULT_DICTIONARY, DEFAULT_LENGTH};
pub use derivation::{derive_secret, Secret};
pub use protocol::{
    DecodeRequest, Decoded, EncodeRequest, Encoded, Outcome, Tinge, TingeOption,
};
pub use window::{Setting, Trace, Window};

/// Result type for tinge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tinge-core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Factor not given")]
    MissingFactor,

    #[error("Invalid factor: {0}")]
    InvalidFactor(String),

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    #[error("Invalid salt: {0}")]
    InvalidSalt(String),

    #[error("Invalid dictionary: {0}")]
    InvalidDictionary(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid code: {0}")]
    InvalidCode(String),

    #[error("Hash already exists")]
    HashAlreadySet,

    #[error("Combine failed: {0}")]
    CombineFailed(String),

    #[error("Trace collided on every one of {attempts} attempts")]
    ExhaustedRetries { attempts: usize },

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
