//! Threshold Splitter
//!
//! 2-of-N Shamir split of the secret over GF(256), via `sharks`.
//!
//! ```text
//! PAYLOAD = SECRET (64 bytes) ‖ sha512(SECRET)[..4]
//!
//! share_i = x_i ‖ P(x_i)          (hex encoded)
//!
//! any 2 shares  → PAYLOAD → tag checks out → SECRET
//! 1 share       → nothing
//! mixed splits  → tag mismatch → CombineFailed
//! ```

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha512};
use sharks::{Share, Sharks};
use zeroize::Zeroize;

use crate::derivation::{Secret, SECRET_LEN};
use crate::{Error, Result};

/// Shares needed to recover the secret
pub const THRESHOLD: u8 = 2;

/// Share ids are one byte wide
pub const MAX_SHARES: usize = 255;

const TAG_LEN: usize = 4;

fn tag(secret: &[u8]) -> [u8; TAG_LEN] {
    let digest = Sha512::digest(secret);
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&digest[..TAG_LEN]);
    out
}

/// Split a secret into `n` hex shares, any two of which recover it
pub fn split<R: Rng>(secret: &Secret, n: usize, rng: &mut R) -> Result<Vec<String>> {
    if n < THRESHOLD as usize {
        return Err(Error::InvalidFactor(format!(
            "at least {} factors are needed, got {}",
            THRESHOLD, n
        )));
    }
    if n > MAX_SHARES {
        return Err(Error::InvalidFactor(format!(
            "at most {} factors are supported, got {}",
            MAX_SHARES, n
        )));
    }

    let mut payload = secret.to_bytes();
    let check = tag(&payload);
    payload.extend_from_slice(&check);

    let dealer = Sharks(THRESHOLD).dealer_rng(&payload, rng);
    let shares = dealer
        .take(n)
        .map(|share| hex::encode(Vec::from(&share)))
        .collect();

    payload.zeroize();
    Ok(shares)
}

/// Pick the two shares carried into the public artifacts
pub fn sample<R: Rng>(shares: &[String], rng: &mut R) -> Result<Vec<String>> {
    if shares.len() < THRESHOLD as usize {
        return Err(Error::CombineFailed(format!(
            "need {} shares to sample, have {}",
            THRESHOLD,
            shares.len()
        )));
    }

    Ok(shares
        .choose_multiple(rng, THRESHOLD as usize)
        .cloned()
        .collect())
}

/// Recover the secret from at least two shares of the same split
pub fn combine<S: AsRef<str>>(shares: &[S]) -> Result<Secret> {
    if shares.len() < THRESHOLD as usize {
        return Err(Error::CombineFailed(format!(
            "need {} shares, got {}",
            THRESHOLD,
            shares.len()
        )));
    }

    let mut ids = HashSet::new();
    let mut parsed = Vec::with_capacity(shares.len());

    for share in shares {
        let bytes = hex::decode(share.as_ref())
            .map_err(|e| Error::CombineFailed(format!("share is not hex: {}", e)))?;

        if bytes.len() != 1 + SECRET_LEN + TAG_LEN {
            return Err(Error::CombineFailed(format!(
                "share has {} bytes, expected {}",
                bytes.len(),
                1 + SECRET_LEN + TAG_LEN
            )));
        }
        if !ids.insert(bytes[0]) {
            return Err(Error::CombineFailed("duplicate share id".into()));
        }

        let share = Share::try_from(bytes.as_slice())
            .map_err(|e| Error::CombineFailed(e.to_string()))?;
        parsed.push(share);
    }

    let mut payload = Sharks(THRESHOLD)
        .recover(parsed.iter())
        .map_err(|e| Error::CombineFailed(e.to_string()))?;

    let (body, check) = payload.split_at(SECRET_LEN);
    let result = if tag(body)[..] == check[..] {
        Secret::from_bytes(body)
    } else {
        Err(Error::CombineFailed("shares do not belong to one split".into()))
    };

    payload.zeroize();
    result
}
