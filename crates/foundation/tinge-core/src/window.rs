//! Windowing & Setting Builder
//!
//! ```text
//! CODE     kX9fQ2rUwp3TzL8aYbN0vMe4...          (full obfuscated code)
//!                 [index ──── last)
//! TRACE           rUwp3TzL8aYb                  (plain)
//! TRACE           rUwp3T·007·013                (indexed, · = zero-width marker)
//!
//! SETTING  = base64(zstd(join[CODE, index, last, salt, dictionary]))
//! ```
//!
//! Positions count characters, not bytes.

use std::io::Read;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

use crate::joiner::{join, separate};
use crate::{Error, Result};

/// Characters reserved for the embedded bounds in indexed mode
pub const INDEXED_RESERVE: usize = 6;

/// Zero-padded width of each embedded bound
pub const BOUND_WIDTH: usize = 3;

/// Smallest length that leaves room for embedded bounds
pub const MIN_INDEXED_LENGTH: usize = 12;

/// Largest bound that fits in [`BOUND_WIDTH`] digits
pub const MAX_BOUND: usize = 999;

/// Cap on a decompressed setting
pub const MAX_SETTING_BYTES: u64 = 1024 * 1024;

const SETTING_FIELDS: usize = 5;
const ZSTD_LEVEL: i32 = 3;

/// Half-open character range `[index, last)` of the code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    pub last: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.last - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == self.last
    }

    /// Cut the window out of a code
    pub fn excerpt(&self, code: &str) -> String {
        code.chars().skip(self.index).take(self.len()).collect()
    }
}

/// Window length for a requested trace length
pub fn effective_length(length: usize, indexed: bool) -> Result<usize> {
    if indexed {
        if length < MIN_INDEXED_LENGTH {
            return Err(Error::InvalidLength(format!(
                "indexed mode needs a length of at least {}, got {}",
                MIN_INDEXED_LENGTH, length
            )));
        }
        return Ok(length - INDEXED_RESERVE);
    }

    if length == 0 {
        return Err(Error::InvalidLength("length must be positive".into()));
    }
    Ok(length)
}

/// Code positions a trace may draw its window from
///
/// Indexed traces embed both bounds in [`BOUND_WIDTH`] digits, so their
/// window never reaches past [`MAX_BOUND`].
pub fn addressable(code_len: usize, indexed: bool) -> usize {
    if indexed {
        code_len.min(MAX_BOUND)
    } else {
        code_len
    }
}

/// Pick a window uniformly among every position that fits
pub fn pick<R: Rng>(code_len: usize, length: usize, rng: &mut R) -> Result<Window> {
    if length == 0 || length > code_len {
        return Err(Error::InvalidLength(format!(
            "window of {} does not fit a code of {}",
            length, code_len
        )));
    }

    let index = rng.gen_range(0..=code_len - length);
    Ok(Window {
        index,
        last: index + length,
    })
}

/// Everything needed to widen a trace back to its code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub code: String,
    pub window: Window,
    pub salt: String,
    pub dictionary: String,
}

impl Setting {
    /// Compress into the opaque setting string
    pub fn seal(&self) -> Result<String> {
        let joined = join(&[
            self.code.clone(),
            self.window.index.to_string(),
            self.window.last.to_string(),
            self.salt.clone(),
            self.dictionary.clone(),
        ]);
        if joined.len() as u64 > MAX_SETTING_BYTES {
            return Err(Error::InvalidSetting(format!(
                "setting would exceed {} bytes",
                MAX_SETTING_BYTES
            )));
        }

        let compressed = zstd::encode_all(joined.as_bytes(), ZSTD_LEVEL)
            .map_err(|e| Error::InvalidSetting(format!("compression failed: {}", e)))?;

        Ok(URL_SAFE_NO_PAD.encode(compressed))
    }

    /// Reverse of [`Setting::seal`], with every field validated
    pub fn open(sealed: &str) -> Result<Self> {
        let fields = unseal(sealed)?;
        if fields.len() != SETTING_FIELDS {
            return Err(Error::InvalidSetting(format!(
                "expected {} fields, got {}",
                SETTING_FIELDS,
                fields.len()
            )));
        }

        let index = parse_bound(&fields[1])?;
        let last = parse_bound(&fields[2])?;

        let [code, salt, dictionary] = [&fields[0], &fields[3], &fields[4]];
        if code.is_empty() || salt.is_empty() || dictionary.is_empty() {
            return Err(Error::InvalidSetting(
                "code, salt and dictionary are required".into(),
            ));
        }

        if index > last || last > code.chars().count() {
            return Err(Error::InvalidIndex(format!(
                "window [{}, {}) is outside the code",
                index, last
            )));
        }

        Ok(Self {
            code: code.clone(),
            window: Window { index, last },
            salt: salt.clone(),
            dictionary: dictionary.clone(),
        })
    }

    /// The trace's bare code as this setting says it must read
    pub fn expected_trace(&self) -> String {
        self.window.excerpt(&self.code)
    }
}

/// Decompress a setting into its joined fields, without validation
pub fn unseal(sealed: &str) -> Result<Vec<String>> {
    let compressed = URL_SAFE_NO_PAD
        .decode(sealed.trim())
        .map_err(|e| Error::InvalidSetting(format!("not base64: {}", e)))?;

    let mut joined = String::new();
    let read = zstd::stream::read::Decoder::new(compressed.as_slice())
        .and_then(|decoder| {
            decoder
                .take(MAX_SETTING_BYTES + 1)
                .read_to_string(&mut joined)
        })
        .map_err(|e| Error::InvalidSetting(format!("decompression failed: {}", e)))?;

    if read as u64 > MAX_SETTING_BYTES {
        return Err(Error::InvalidSetting(format!(
            "decompresses past {} bytes",
            MAX_SETTING_BYTES
        )));
    }

    Ok(separate(&joined))
}

fn parse_bound(raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidIndex(format!("{:?} is not a number", raw)))
}

/// The public token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// Window excerpt of the code
    pub bare: String,
    /// Embedded bounds, present in indexed mode
    pub bounds: Option<Window>,
}

impl Trace {
    pub fn plain(bare: String) -> Self {
        Self { bare, bounds: None }
    }

    pub fn indexed(bare: String, window: Window) -> Self {
        Self {
            bare,
            bounds: Some(window),
        }
    }

    /// Render as the string handed to the caller
    pub fn render(&self) -> String {
        match self.bounds {
            None => self.bare.clone(),
            Some(window) => join(&[
                self.bare.clone(),
                format!("{:0width$}", window.index, width = BOUND_WIDTH),
                format!("{:0width$}", window.last, width = BOUND_WIDTH),
            ]),
        }
    }

    /// Parse a rendered trace
    ///
    /// Embedded bounds that do not parse are an integrity failure of the
    /// trace itself, so they surface as `InvalidCode`.
    pub fn parse(rendered: &str) -> Result<Self> {
        let fields = separate(rendered);

        match fields.as_slice() {
            [bare] => Ok(Self::plain(bare.clone())),
            [bare, index, last] => {
                let bound = |raw: &str| {
                    raw.parse::<usize>()
                        .map_err(|_| Error::InvalidCode(format!("embedded bound {:?} is not a number", raw)))
                };
                Ok(Self::indexed(
                    bare.clone(),
                    Window {
                        index: bound(index.as_str())?,
                        last: bound(last.as_str())?,
                    },
                ))
            }
            _ => Err(Error::InvalidCode(format!(
                "trace has {} fields",
                fields.len()
            ))),
        }
    }
}

impl std::fmt::Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joiner::MARKER;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setting() -> Setting {
        Setting {
            code: "kX9fQ2rUwp3TzL8aYbN0vMe4".into(),
            window: Window { index: 6, last: 18 },
            salt: "pepper".into(),
            dictionary: crate::config::DEFAULT_DICTIONARY.into(),
        }
    }

    #[test]
    fn test_effective_length() {
        assert_eq!(effective_length(12, false).unwrap(), 12);
        assert_eq!(effective_length(12, true).unwrap(), 6);
        assert_eq!(effective_length(20, true).unwrap(), 14);
        assert!(matches!(effective_length(11, true), Err(Error::InvalidLength(_))));
        assert!(matches!(effective_length(0, false), Err(Error::InvalidLength(_))));
    }

    #[test]
    fn test_pick_stays_inside() {
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            let window = pick(20, 12, &mut rng).unwrap();
            assert!(window.last <= 20);
            assert_eq!(window.len(), 12);
        }

        assert_eq!(pick(12, 12, &mut rng).unwrap(), Window { index: 0, last: 12 });
        assert!(pick(11, 12, &mut rng).is_err());
    }

    #[test]
    fn test_indexed_window_stays_addressable() {
        assert_eq!(addressable(2500, false), 2500);
        assert_eq!(addressable(2500, true), MAX_BOUND);
        assert_eq!(addressable(40, true), 40);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let window = pick(addressable(2500, true), 6, &mut rng).unwrap();
            let rendered = Trace::indexed("abcdef".into(), window).render();
            assert_eq!(rendered.chars().filter(|c| *c != MARKER).count(), 12);
        }
    }

    #[test]
    fn test_seal_open() {
        let original = setting();
        let sealed = original.seal().unwrap();

        assert!(sealed.is_ascii());
        assert_eq!(unseal(&sealed).unwrap().len(), 5);
        assert_eq!(Setting::open(&sealed).unwrap(), original);
        assert_eq!(original.expected_trace(), "rUwp3TzL8aYb");
    }

    #[test]
    fn test_open_garbage() {
        assert!(matches!(Setting::open("!!!"), Err(Error::InvalidSetting(_))));
        assert!(matches!(
            Setting::open(&URL_SAFE_NO_PAD.encode(b"plain")),
            Err(Error::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_oversized_setting_is_rejected() {
        let bomb = vec![b'A'; 2 * MAX_SETTING_BYTES as usize];
        let compressed = zstd::encode_all(bomb.as_slice(), ZSTD_LEVEL).unwrap();
        let sealed = URL_SAFE_NO_PAD.encode(compressed);

        assert!(sealed.len() < 1024);
        assert!(matches!(unseal(&sealed), Err(Error::InvalidSetting(_))));
    }

    fn seal_fields(fields: &[&str]) -> String {
        let compressed = zstd::encode_all(join(fields).as_bytes(), ZSTD_LEVEL).unwrap();
        URL_SAFE_NO_PAD.encode(compressed)
    }

    #[test]
    fn test_open_rejects_bad_fields() {
        let non_numeric = seal_fields(&["abcdef", "x", "3", "salt", "dict"]);
        assert!(matches!(Setting::open(&non_numeric), Err(Error::InvalidIndex(_))));

        let missing_salt = seal_fields(&["abcdef", "0", "3", "", "dict"]);
        assert!(matches!(Setting::open(&missing_salt), Err(Error::InvalidSetting(_))));

        let too_few = seal_fields(&["abcdef", "0", "3"]);
        assert!(matches!(Setting::open(&too_few), Err(Error::InvalidSetting(_))));

        let outside = seal_fields(&["abcdef", "2", "9", "salt", "dict"]);
        assert!(matches!(Setting::open(&outside), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn test_trace_render_parse() {
        let plain = Trace::plain("rUwp3TzL8aYb".into());
        assert_eq!(plain.render(), "rUwp3TzL8aYb");
        assert_eq!(Trace::parse(&plain.render()).unwrap(), plain);

        let indexed = Trace::indexed("rUwp3T".into(), Window { index: 7, last: 13 });
        let rendered = indexed.render();

        assert_eq!(rendered, format!("rUwp3T{m}007{m}013", m = MARKER));
        assert_eq!(rendered.chars().count(), 14);
        assert_eq!(Trace::parse(&rendered).unwrap(), indexed);
    }

    #[test]
    fn test_trace_bad_bounds() {
        let rendered = format!("abc{m}0x7{m}013", m = MARKER);
        assert!(matches!(Trace::parse(&rendered), Err(Error::InvalidCode(_))));

        let two_fields = format!("abc{m}007", m = MARKER);
        assert!(matches!(Trace::parse(&two_fields), Err(Error::InvalidCode(_))));
    }
}
