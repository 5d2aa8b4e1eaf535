//! Obfuscation Codec
//!
//! Salted, reversible re-spelling of a hex string in a caller-chosen
//! alphabet. Hashids-style:
//!
//! ```text
//! hex:   "0a1b2c3d4e5f6a7b..."
//!          │ 12-digit chunks, each prefixed with '1'
//!          ▼
//! ints:  [0x10a1b2c3d4e5f, 0x16a7b..., ...]
//!          │ lottery char + per-chunk salted alphabet shuffle + separators
//!          ▼
//! code:  "kX9fQ2rUwp3..."
//! ```
//!
//! This is obfuscation, not encryption. Anyone holding the salt and the
//! dictionary can undo it.

use crate::joiner::{ESCAPE, MARKER};
use crate::{Error, Result};

/// Characters preferred as chunk separators
const SEPARATORS: &str = "cfhistuCFHISTU";

/// Max alphabet-to-separator ratio before more separators are drawn
const SEPARATOR_RATIO: f64 = 3.5;

/// Smallest usable dictionary
pub const MIN_DICTIONARY: usize = 16;

/// Hex digits per encoded integer (13 with the '1' prefix, fits in u64)
const HEX_CHUNK: usize = 12;

/// Keyed alphabet codec
#[derive(Debug, Clone)]
pub struct Codec {
    salt: Vec<char>,
    alphabet: Vec<char>,
    separators: Vec<char>,
}

impl Codec {
    /// Build a codec for one salt/dictionary pair
    pub fn new(salt: &str, dictionary: &str) -> Result<Self> {
        if salt.is_empty() {
            return Err(Error::InvalidSalt("salt must not be empty".into()));
        }

        let mut unique: Vec<char> = Vec::new();
        for c in dictionary.chars() {
            if c.is_whitespace() || c.is_control() || c == MARKER || c == ESCAPE {
                return Err(Error::InvalidDictionary(format!(
                    "character {:?} is not allowed",
                    c
                )));
            }
            if !unique.contains(&c) {
                unique.push(c);
            }
        }

        if unique.len() < MIN_DICTIONARY {
            return Err(Error::InvalidDictionary(format!(
                "need at least {} unique characters, got {}",
                MIN_DICTIONARY,
                unique.len()
            )));
        }

        let salt: Vec<char> = salt.chars().collect();

        let mut separators: Vec<char> = SEPARATORS.chars().filter(|c| unique.contains(c)).collect();
        let mut alphabet: Vec<char> = unique
            .into_iter()
            .filter(|c| !separators.contains(c))
            .collect();

        shuffle(&mut separators, &salt);

        if separators.is_empty()
            || alphabet.len() as f64 / separators.len() as f64 > SEPARATOR_RATIO
        {
            let wanted = ((alphabet.len() as f64 / SEPARATOR_RATIO).ceil() as usize).max(2);
            if wanted > separators.len() {
                let missing = wanted - separators.len();
                separators.extend(alphabet.drain(..missing));
            }
        }

        shuffle(&mut alphabet, &salt);

        Ok(Self {
            salt,
            alphabet,
            separators,
        })
    }

    /// Encode a hex string
    pub fn encode_hex(&self, hex: &str) -> Result<String> {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCode("raw value is not hex".into()));
        }

        let numbers = hex
            .as_bytes()
            .chunks(HEX_CHUNK)
            .map(|chunk| {
                let digits = std::str::from_utf8(chunk)
                    .map_err(|e| Error::InvalidCode(e.to_string()))?;
                u64::from_str_radix(&format!("1{}", digits), 16)
                    .map_err(|e| Error::InvalidCode(e.to_string()))
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok(self.encode(&numbers))
    }

    /// Decode back to the (lowercase) hex string
    pub fn decode_hex(&self, code: &str) -> Result<String> {
        let mut hex = String::new();

        for number in self.decode(code)? {
            let digits = format!("{:x}", number);
            match digits.strip_prefix('1') {
                Some(chunk) => hex.push_str(chunk),
                None => return Err(Error::InvalidCode("chunk lost its prefix".into())),
            }
        }

        Ok(hex)
    }

    fn encode(&self, numbers: &[u64]) -> String {
        let numbers_id: u64 = numbers
            .iter()
            .enumerate()
            .map(|(i, n)| n % (i as u64 + 100))
            .sum();

        let mut alphabet = self.alphabet.clone();
        let lottery = alphabet[(numbers_id % alphabet.len() as u64) as usize];

        let mut out = vec![lottery];
        for (i, &number) in numbers.iter().enumerate() {
            self.reshuffle(&mut alphabet, lottery);

            let last = hash(number, &alphabet);
            out.extend_from_slice(&last);

            if i + 1 < numbers.len() {
                let n = number % (last[0] as u64 + i as u64).max(1);
                out.push(self.separators[(n % self.separators.len() as u64) as usize]);
            }
        }

        out.into_iter().collect()
    }

    fn decode(&self, code: &str) -> Result<Vec<u64>> {
        let chars: Vec<char> = code.chars().collect();

        if let Some(stray) = chars
            .iter()
            .find(|c| !self.alphabet.contains(c) && !self.separators.contains(c))
        {
            return Err(Error::InvalidCode(format!(
                "character {:?} is outside the dictionary",
                stray
            )));
        }

        let (&lottery, rest) = chars
            .split_first()
            .ok_or_else(|| Error::InvalidCode("code is empty".into()))?;

        let mut alphabet = self.alphabet.clone();
        let mut numbers = Vec::new();

        for group in rest.split(|c| self.separators.contains(c)) {
            if group.is_empty() {
                return Err(Error::InvalidCode("empty group".into()));
            }

            self.reshuffle(&mut alphabet, lottery);

            let number = unhash(group, &alphabet)
                .ok_or_else(|| Error::InvalidCode("group does not decode".into()))?;
            numbers.push(number);
        }

        // Only codes this codec could have produced are accepted.
        if self.encode(&numbers) != code {
            return Err(Error::InvalidCode("code does not re-encode".into()));
        }

        Ok(numbers)
    }

    fn reshuffle(&self, alphabet: &mut [char], lottery: char) {
        let mut buffer = Vec::with_capacity(1 + self.salt.len() + alphabet.len());
        buffer.push(lottery);
        buffer.extend_from_slice(&self.salt);
        buffer.extend_from_slice(alphabet);
        buffer.truncate(alphabet.len());

        shuffle(alphabet, &buffer);
    }
}

/// Deterministic salt-driven shuffle
fn shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() || alphabet.len() < 2 {
        return;
    }

    let mut v = 0usize;
    let mut p = 0usize;
    for i in (1..alphabet.len()).rev() {
        v %= salt.len();
        let integer = salt[v] as usize;
        p = p.wrapping_add(integer);
        let j = integer.wrapping_add(v).wrapping_add(p) % i;
        alphabet.swap(i, j);
        v += 1;
    }
}

fn hash(mut number: u64, alphabet: &[char]) -> Vec<char> {
    let base = alphabet.len() as u64;
    let mut out = Vec::new();

    loop {
        out.push(alphabet[(number % base) as usize]);
        number /= base;
        if number == 0 {
            break;
        }
    }

    out.reverse();
    out
}

fn unhash(group: &[char], alphabet: &[char]) -> Option<u64> {
    let base = alphabet.len() as u64;

    group.iter().try_fold(0u64, |acc, c| {
        let position = alphabet.iter().position(|a| a == c)? as u64;
        acc.checked_mul(base)?.checked_add(position)
    })
}
