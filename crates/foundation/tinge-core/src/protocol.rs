//! Tinge Protocol
//!
//! Single entry point. An option record carrying both `code` and `setting`
//! is decoded; anything else is encoded.
//!
//! ```text
//! ENCODE  factor ─► secret ─► split ─► sample ─► join ─► hex ─► codec ─► code
//!                                                                          │
//!                              cache ◄─ trace ◄─ window ◄──────────────────┤
//!                                                  setting ◄───────────────┘
//!
//! DECODE  trace + setting ─► open ─► window check ─► codec⁻¹ ─► separate ─► combine ─► hash
//! ```
//!
//! Nothing is written to the caller's record; results come back as a new
//! [`Outcome`], and only once every check for the path has passed.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::TraceCache;
use crate::codec::Codec;
use crate::config::TingeConfig;
use crate::derivation::{compact, derive_secret};
use crate::joiner::{join, separate};
use crate::split::{self, combine, sample, THRESHOLD};
use crate::window::{self, effective_length, Setting, Trace};
use crate::{Error, Result};

/// Encode request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeRequest {
    pub factor: Vec<String>,
    pub length: Option<usize>,
    pub salt: Option<String>,
    pub dictionary: Option<String>,
    #[serde(default)]
    pub indexed: bool,
}

impl EncodeRequest {
    pub fn new<I, S>(factor: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            factor: factor.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn dictionary(mut self, dictionary: impl Into<String>) -> Self {
        self.dictionary = Some(dictionary.into());
        self
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }
}

/// Decode request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeRequest {
    pub code: String,
    pub setting: String,
}

impl DecodeRequest {
    pub fn new(code: impl Into<String>, setting: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            setting: setting.into(),
        }
    }
}

/// Result of an encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoded {
    /// The trace
    pub code: String,
    pub setting: String,
    pub hash: String,
}

impl Encoded {
    /// The request that redeems this trace
    pub fn to_decode_request(&self) -> DecodeRequest {
        DecodeRequest::new(self.code.clone(), self.setting.clone())
    }
}

/// Result of a decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub hash: String,
}

/// Result of [`Tinge::tinge`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Encoded(Encoded),
    Decoded(Decoded),
}

impl Outcome {
    pub fn hash(&self) -> &str {
        match self {
            Self::Encoded(encoded) => &encoded.hash,
            Self::Decoded(decoded) => &decoded.hash,
        }
    }

    /// The caller's record with the output fields filled in
    pub fn merge_into(self, mut option: TingeOption) -> TingeOption {
        match self {
            Self::Encoded(encoded) => {
                option.code = Some(encoded.code);
                option.setting = Some(encoded.setting);
                option.hash = Some(encoded.hash);
            }
            Self::Decoded(decoded) => {
                option.hash = Some(decoded.hash);
            }
        }
        option
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The option record, as callers outside Rust hand it over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TingeOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl TingeOption {
    /// Type-check a loosely typed record
    ///
    /// `null` and empty strings count as absent. A `null` factor entry is
    /// kept as an empty entry, which compaction then drops.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidOption("option must be an object".into()))?;

        let factor = match present(object, "factor") {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(entry) => Ok(entry.clone()),
                        Value::Null => Ok(String::new()),
                        other => Err(Error::InvalidFactor(format!(
                            "entry {} is not a string",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(Error::InvalidFactor(format!(
                    "expected an array of strings, got {}",
                    other
                )))
            }
        };

        let length = match present(object, "length") {
            None => None,
            Some(raw) => Some(
                raw.as_u64()
                    .filter(|n| *n > 0)
                    .map(|n| n as usize)
                    .ok_or_else(|| {
                        Error::InvalidLength(format!("{} is not a positive integer", raw))
                    })?,
            ),
        };

        let indexed = match present(object, "indexed") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(Error::InvalidOption(format!(
                    "indexed must be a boolean, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            factor,
            length,
            salt: string_field(object, "salt", Error::InvalidSalt)?,
            dictionary: string_field(object, "dictionary", Error::InvalidDictionary)?,
            indexed,
            code: string_field(object, "code", Error::InvalidOption)?,
            setting: string_field(object, "setting", Error::InvalidOption)?,
            hash: string_field(object, "hash", Error::InvalidOption)?,
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn string_field(
    object: &Map<String, Value>,
    key: &str,
    invalid: fn(String) -> Error,
) -> Result<Option<String>> {
    match present(object, key) {
        None => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(invalid(format!("{} must be a string, got {}", key, other))),
    }
}

/// Issues and redeems traces
///
/// Holds the defaults, the randomness and a handle on the trace cache.
/// Several instances may share one cache.
pub struct Tinge {
    config: TingeConfig,
    cache: Arc<TraceCache>,
    rng: StdRng,
}

impl Tinge {
    /// Create with a private cache
    pub fn new(config: TingeConfig) -> Self {
        let cache = Arc::new(TraceCache::from_config(&config));
        Self::with_cache(config, cache)
    }

    /// Create on top of an existing cache
    pub fn with_cache(config: TingeConfig, cache: Arc<TraceCache>) -> Self {
        Self {
            config,
            cache,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the entropy-seeded generator with a deterministic one
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &TingeConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TraceCache> {
        &self.cache
    }

    /// Encode or decode, depending on which fields the record carries
    pub fn tinge(&mut self, option: &TingeOption) -> Result<Outcome> {
        if option.hash.as_deref().is_some_and(|hash| !hash.is_empty()) {
            return Err(Error::HashAlreadySet);
        }

        match (&option.code, &option.setting) {
            (Some(code), Some(setting)) => self
                .decode(&DecodeRequest::new(code.clone(), setting.clone()))
                .map(Outcome::Decoded),
            _ => {
                let request = EncodeRequest {
                    factor: option.factor.clone().ok_or(Error::MissingFactor)?,
                    length: option.length,
                    salt: option.salt.clone(),
                    dictionary: option.dictionary.clone(),
                    indexed: option.indexed,
                };
                self.encode(&request).map(Outcome::Encoded)
            }
        }
    }

    /// [`Tinge::tinge`] over a JSON record, returning the filled-in record
    pub fn tinge_value(&mut self, value: &Value) -> Result<Value> {
        let option = TingeOption::from_value(value)?;
        let outcome = self.tinge(&option)?;
        Ok(outcome.merge_into(option).to_value())
    }

    /// Issue a trace for a factor list
    pub fn encode(&mut self, request: &EncodeRequest) -> Result<Encoded> {
        let factor = compact(&request.factor);
        if factor.is_empty() {
            return Err(Error::MissingFactor);
        }
        if factor.len() < THRESHOLD as usize {
            return Err(Error::InvalidFactor(format!(
                "at least {} non-empty factors are needed",
                THRESHOLD
            )));
        }

        let salt = request.salt.as_deref().unwrap_or(&self.config.salt);
        let dictionary = request
            .dictionary
            .as_deref()
            .unwrap_or(&self.config.dictionary);
        let codec = Codec::new(salt, dictionary)?;

        let length = effective_length(
            request.length.unwrap_or(self.config.length),
            request.indexed,
        )?;

        let secret = derive_secret(&factor)?;

        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            let shares = split::split(&secret, factor.len(), &mut self.rng)?;
            let picked = sample(&shares, &mut self.rng)?;

            let raw = hex::encode(join(&picked));
            let code = codec.encode_hex(&raw)?;

            let span = window::addressable(code.chars().count(), request.indexed);
            let window = window::pick(span, length, &mut self.rng)?;
            let bare = window.excerpt(&code);
            let trace = if request.indexed {
                Trace::indexed(bare, window)
            } else {
                Trace::plain(bare)
            }
            .render();

            let setting = Setting {
                code,
                window,
                salt: salt.to_string(),
                dictionary: dictionary.to_string(),
            }
            .seal()?;

            if !self.cache.register(&trace) {
                tracing::debug!(attempt, "trace already in use, regenerating");
                continue;
            }

            tracing::info!(
                indexed = request.indexed,
                window = length,
                attempt,
                "trace issued"
            );

            return Ok(Encoded {
                code: trace,
                setting,
                hash: secret.as_hex().to_string(),
            });
        }

        Err(Error::ExhaustedRetries { attempts })
    }

    /// Redeem a trace against its setting
    pub fn decode(&mut self, request: &DecodeRequest) -> Result<Decoded> {
        let trace = Trace::parse(&request.code)?;
        let setting = Setting::open(&request.setting)?;

        if setting.expected_trace() != trace.bare {
            return Err(Error::InvalidCode(
                "trace does not match its setting".into(),
            ));
        }
        if let Some(bounds) = trace.bounds {
            if bounds != setting.window {
                return Err(Error::InvalidCode(
                    "embedded bounds disagree with the setting".into(),
                ));
            }
        }

        let codec = Codec::new(&setting.salt, &setting.dictionary).map_err(|e| match e {
            Error::InvalidSalt(reason) | Error::InvalidDictionary(reason) => {
                Error::InvalidSetting(reason)
            }
            other => other,
        })?;

        let raw = codec.decode_hex(&setting.code)?;
        let joined = hex::decode(&raw)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| Error::InvalidCode("code does not carry a share pair".into()))?;

        let shares = separate(&joined);
        if shares.len() != THRESHOLD as usize {
            return Err(Error::CombineFailed(format!(
                "expected {} shares, found {}",
                THRESHOLD,
                shares.len()
            )));
        }

        let secret = combine(&shares)?;

        self.cache.register(&request.code);
        tracing::info!(indexed = trace.bounds.is_some(), "trace redeemed");

        Ok(Decoded {
            hash: secret.as_hex().to_string(),
        })
    }
}

impl Default for Tinge {
    fn default() -> Self {
        Self::new(TingeConfig::default())
    }
}

impl std::fmt::Debug for Tinge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tinge")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joiner::MARKER;
    use crate::window::{unseal, Window, MAX_BOUND};
    use serde_json::json;
    use std::time::Duration;

    const BALLPEN_HASH: &str = "33cf3db606e5919b24709606eb3679889bc0ae44d937b18d7dc6d0aeca016d0477c32b3f28e2b55eecc3beebf513bd511d4a1b4426e638b22912d044ff28c92c";

    fn ballpen() -> EncodeRequest {
        EncodeRequest::new(["ballpen-item", "Ballpen Item"])
    }

    fn tinge(seed: u64) -> Tinge {
        Tinge::default().seeded(seed)
    }

    #[test]
    fn test_roundtrip() {
        let mut tinge = tinge(1);
        let encoded = tinge.encode(&ballpen()).unwrap();

        assert_eq!(encoded.code.chars().count(), 12);
        assert_eq!(encoded.hash, BALLPEN_HASH);

        let decoded = tinge.decode(&encoded.to_decode_request()).unwrap();
        assert_eq!(decoded.hash, BALLPEN_HASH);
    }

    #[test]
    fn test_indexed_example() {
        let mut tinge = tinge(2);
        let encoded = tinge.encode(&ballpen().indexed(true)).unwrap();

        // 6 window characters + 3 + 3 digits, joined by invisible markers
        let visible: String = encoded.code.chars().filter(|c| *c != MARKER).collect();
        assert_eq!(visible.chars().count(), 12);
        assert_eq!(separate(&encoded.code).len(), 3);

        assert_eq!(unseal(&encoded.setting).unwrap().len(), 5);

        let decoded = tinge.decode(&encoded.to_decode_request()).unwrap();
        assert_eq!(decoded.hash, BALLPEN_HASH);
    }

    #[test]
    fn test_indexed_needs_length_twelve() {
        let mut tinge = tinge(3);

        let short = tinge.encode(&ballpen().indexed(true).length(11));
        assert!(matches!(short, Err(Error::InvalidLength(_))));

        let encoded = tinge.encode(&ballpen().indexed(true).length(12)).unwrap();
        let bare = Trace::parse(&encoded.code).unwrap().bare;
        assert_eq!(bare.chars().count(), 6);
        assert_eq!(
            tinge.decode(&encoded.to_decode_request()).unwrap().hash,
            BALLPEN_HASH
        );
    }

    #[test]
    fn test_every_single_character_flip_is_caught() {
        let mut tinge = tinge(4);
        let encoded = tinge.encode(&ballpen()).unwrap();

        let chars: Vec<char> = encoded.code.chars().collect();
        for i in 0..chars.len() {
            let mut flipped = chars.clone();
            flipped[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            let code: String = flipped.into_iter().collect();

            let result = tinge.decode(&DecodeRequest::new(code, encoded.setting.clone()));
            assert!(matches!(result, Err(Error::InvalidCode(_))), "flip at {}", i);
        }
    }

    #[test]
    fn test_indexed_bounds_must_agree_with_setting() {
        let mut tinge = tinge(5);
        let encoded = tinge.encode(&ballpen().indexed(true)).unwrap();

        let trace = Trace::parse(&encoded.code).unwrap();
        let bounds = trace.bounds.unwrap();
        let shifted = Trace::indexed(
            trace.bare.clone(),
            Window {
                index: bounds.index + 1,
                last: bounds.last + 1,
            },
        );

        let result = tinge.decode(&DecodeRequest::new(shifted.render(), encoded.setting.clone()));
        assert!(matches!(result, Err(Error::InvalidCode(_))));

        // The bare window alone still redeems: the setting is authoritative.
        let plain = tinge
            .decode(&DecodeRequest::new(trace.bare, encoded.setting))
            .unwrap();
        assert_eq!(plain.hash, BALLPEN_HASH);
    }

    #[test]
    fn test_setting_from_another_trace_is_rejected() {
        let mut tinge = tinge(6);
        let first = tinge.encode(&ballpen()).unwrap();
        let second = tinge
            .encode(&EncodeRequest::new(["fountain-pen", "Fountain Pen"]))
            .unwrap();

        let swapped = tinge.decode(&DecodeRequest::new(first.code, second.setting));
        assert!(matches!(swapped, Err(Error::InvalidCode(_))));
    }

    #[test]
    fn test_collision_is_regenerated() {
        let cache = Arc::new(TraceCache::default());
        let mut first = Tinge::with_cache(TingeConfig::default(), cache.clone()).seeded(42);
        let mut second = Tinge::with_cache(TingeConfig::default(), cache.clone()).seeded(42);

        let a = first.encode(&ballpen()).unwrap();
        // Same seed, same factors: the first attempt reproduces `a` exactly.
        let b = second.encode(&ballpen()).unwrap();

        assert_ne!(a.code, b.code);
        assert_eq!(cache.len(), 2);
        assert_eq!(first.decode(&a.to_decode_request()).unwrap().hash, BALLPEN_HASH);
        assert_eq!(first.decode(&b.to_decode_request()).unwrap().hash, BALLPEN_HASH);
    }

    #[test]
    fn test_collision_with_another_factor_list() {
        let pen = EncodeRequest::new(["fountain-pen", "Fountain Pen"]);

        // Learn which trace seed 7 issues first for `pen`.
        let predicted = tinge(7).encode(&pen).unwrap().code;

        // Another factor list already holds that trace.
        let cache = Arc::new(TraceCache::default());
        let mut issuer = Tinge::with_cache(TingeConfig::default(), cache.clone()).seeded(8);
        let ballpen_trace = issuer.encode(&ballpen()).unwrap();
        cache.register(&predicted);

        let mut second = Tinge::with_cache(TingeConfig::default(), cache.clone()).seeded(7);
        let encoded = second.encode(&pen).unwrap();

        assert_ne!(encoded.code, predicted);
        assert_ne!(encoded.hash, BALLPEN_HASH);
        assert_eq!(second.decode(&encoded.to_decode_request()).unwrap().hash, encoded.hash);
        assert_eq!(
            second.decode(&ballpen_trace.to_decode_request()).unwrap().hash,
            BALLPEN_HASH
        );
    }

    #[test]
    fn test_collision_loop_is_bounded() {
        let config = TingeConfig::default().with_max_retries(0);
        let cache = Arc::new(TraceCache::default());
        let mut first = Tinge::with_cache(config.clone(), cache.clone()).seeded(9);
        let mut second = Tinge::with_cache(config, cache).seeded(9);

        first.encode(&ballpen()).unwrap();
        let result = second.encode(&ballpen());

        assert!(matches!(result, Err(Error::ExhaustedRetries { attempts: 1 })));
    }

    #[test]
    fn test_traces_expire_with_the_cache() {
        let config = TingeConfig::default().with_flush_delay(Duration::from_millis(20));
        let mut tinge = Tinge::new(config).seeded(10);

        let encoded = tinge.encode(&ballpen()).unwrap();
        assert!(tinge.cache().contains(&encoded.code));

        std::thread::sleep(Duration::from_millis(40));
        assert!(!tinge.cache().contains(&encoded.code));

        // Expiry only frees the trace; the pair still redeems.
        let decoded = tinge.decode(&encoded.to_decode_request()).unwrap();
        assert_eq!(decoded.hash, BALLPEN_HASH);
    }

    #[test]
    fn test_decode_is_idempotent_and_registers() {
        let mut issuer = tinge(11);
        let encoded = issuer.encode(&ballpen()).unwrap();

        let mut redeemer = tinge(12);
        let once = redeemer.decode(&encoded.to_decode_request()).unwrap();
        let twice = redeemer.decode(&encoded.to_decode_request()).unwrap();

        assert_eq!(once, twice);
        assert!(redeemer.cache().contains(&encoded.code));
    }

    #[test]
    fn test_custom_salt_and_dictionary() {
        let mut tinge = tinge(13);
        let dictionary = "0123456789abcdefghjkmnpqrstvwxyz";
        let request = ballpen().salt("pepper").dictionary(dictionary).length(16);

        let encoded = tinge.encode(&request).unwrap();
        assert_eq!(encoded.code.chars().count(), 16);
        assert!(encoded.code.chars().all(|c| dictionary.contains(c)));

        let setting = Setting::open(&encoded.setting).unwrap();
        assert_eq!(setting.salt, "pepper");
        assert_eq!(setting.dictionary, dictionary);

        assert_eq!(
            tinge.decode(&encoded.to_decode_request()).unwrap().hash,
            BALLPEN_HASH
        );
    }

    #[test]
    fn test_indexed_trace_keeps_its_length_on_long_codes() {
        // Two plain characters leave a base-2 alphabet, so codes run to thousands.
        let dictionary = "cfhistuCFHISTUab";

        for seed in 30..36 {
            let mut tinge = tinge(seed);
            let encoded = tinge
                .encode(&ballpen().dictionary(dictionary).indexed(true))
                .unwrap();

            let setting = Setting::open(&encoded.setting).unwrap();
            assert!(setting.code.chars().count() > MAX_BOUND);
            assert!(setting.window.last <= MAX_BOUND);

            let visible = encoded.code.chars().filter(|c| *c != MARKER).count();
            assert_eq!(visible, 12);
            assert_eq!(
                tinge.decode(&encoded.to_decode_request()).unwrap().hash,
                BALLPEN_HASH
            );
        }
    }

    #[test]
    fn test_factor_errors() {
        let mut tinge = tinge(14);

        let none: [&str; 0] = [];
        assert!(matches!(
            tinge.encode(&EncodeRequest::new(none)),
            Err(Error::MissingFactor)
        ));
        assert!(matches!(
            tinge.encode(&EncodeRequest::new(["", ""])),
            Err(Error::MissingFactor)
        ));
        assert!(matches!(
            tinge.encode(&EncodeRequest::new(["only-one", ""])),
            Err(Error::InvalidFactor(_))
        ));
    }

    #[test]
    fn test_bad_salt_and_dictionary() {
        let mut tinge = tinge(15);

        assert!(matches!(
            tinge.encode(&ballpen().salt("")),
            Err(Error::InvalidSalt(_))
        ));
        assert!(matches!(
            tinge.encode(&ballpen().dictionary("abc")),
            Err(Error::InvalidDictionary(_))
        ));
    }

    #[test]
    fn test_garbage_setting() {
        let mut tinge = tinge(16);

        let result = tinge.decode(&DecodeRequest::new("abcdefabcdef", "not a setting"));
        assert!(matches!(result, Err(Error::InvalidSetting(_))));
    }

    #[test]
    fn test_setting_with_control_dictionary() {
        let mut tinge = tinge(20);
        let setting = Setting {
            code: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".into(),
            window: Window { index: 0, last: 12 },
            salt: "pepper".into(),
            dictionary: "\0ABCDEFGHIJKLMNOPQRSTUVWXYZ".into(),
        };

        let request = DecodeRequest::new(setting.expected_trace(), setting.seal().unwrap());
        assert!(matches!(tinge.decode(&request), Err(Error::InvalidSetting(_))));

        let encoded = tinge.encode(&ballpen().dictionary("\0ABCDEFGHIJKLMNOPQRSTUVWXYZ"));
        assert!(matches!(encoded, Err(Error::InvalidDictionary(_))));
    }

    #[test]
    fn test_hash_already_set() {
        let mut tinge = tinge(17);
        let encoded = tinge.encode(&ballpen()).unwrap();

        let encode_option = TingeOption {
            factor: Some(vec!["a".into(), "b".into()]),
            hash: Some("present".into()),
            ..TingeOption::default()
        };
        assert!(matches!(tinge.tinge(&encode_option), Err(Error::HashAlreadySet)));

        let decode_option = TingeOption {
            code: Some(encoded.code),
            setting: Some(encoded.setting),
            hash: Some(encoded.hash),
            ..TingeOption::default()
        };
        assert!(matches!(tinge.tinge(&decode_option), Err(Error::HashAlreadySet)));
    }

    #[test]
    fn test_dispatch_needs_both_code_and_setting() {
        let mut tinge = tinge(18);
        let encoded = tinge.encode(&ballpen()).unwrap();

        // code without setting falls through to encode, which needs factors
        let option = TingeOption {
            code: Some(encoded.code),
            ..TingeOption::default()
        };
        assert!(matches!(tinge.tinge(&option), Err(Error::MissingFactor)));
    }

    #[test]
    fn test_json_record_roundtrip() {
        let mut tinge = tinge(19);

        let encoded = tinge
            .tinge_value(&json!({
                "factor": ["ballpen-item", null, "Ballpen Item"],
                "indexed": true
            }))
            .unwrap();

        assert_eq!(encoded["hash"], BALLPEN_HASH);
        assert_eq!(encoded["indexed"], true);

        let decoded = tinge
            .tinge_value(&json!({
                "code": encoded["code"],
                "setting": encoded["setting"]
            }))
            .unwrap();

        assert_eq!(decoded["hash"], BALLPEN_HASH);
        assert!(decoded.get("factor").is_none());
    }

    #[test]
    fn test_option_type_checks() {
        let check = |value: Value| TingeOption::from_value(&value);

        assert!(matches!(check(json!("factor")), Err(Error::InvalidOption(_))));
        assert!(matches!(check(json!({"factor": "a,b"})), Err(Error::InvalidFactor(_))));
        assert!(matches!(check(json!({"factor": ["a", 1]})), Err(Error::InvalidFactor(_))));
        assert!(matches!(check(json!({"length": "12"})), Err(Error::InvalidLength(_))));
        assert!(matches!(check(json!({"length": -3})), Err(Error::InvalidLength(_))));
        assert!(matches!(check(json!({"salt": 5})), Err(Error::InvalidSalt(_))));
        assert!(matches!(check(json!({"dictionary": true})), Err(Error::InvalidDictionary(_))));
        assert!(matches!(check(json!({"indexed": "yes"})), Err(Error::InvalidOption(_))));
        assert!(matches!(check(json!({"code": 7})), Err(Error::InvalidOption(_))));

        let loose = check(json!({"factor": ["a", "b"], "salt": "", "length": null})).unwrap();
        assert_eq!(loose.salt, None);
        assert_eq!(loose.length, None);
    }

    #[test]
    fn test_merge_into_keeps_inputs() {
        let option = TingeOption {
            factor: Some(vec!["a".into(), "b".into()]),
            indexed: true,
            ..TingeOption::default()
        };
        let outcome = Outcome::Encoded(Encoded {
            code: "trace".into(),
            setting: "setting".into(),
            hash: "hash".into(),
        });

        assert_eq!(outcome.hash(), "hash");

        let merged = outcome.merge_into(option);
        assert_eq!(merged.factor, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(merged.indexed);
        assert_eq!(merged.code.as_deref(), Some("trace"));
        assert_eq!(merged.hash.as_deref(), Some("hash"));
    }
}
