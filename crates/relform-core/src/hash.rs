//! Stable hashing helpers for value tuples and descriptions.

use blake3::Hasher;
use serde::Serialize;

use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Hash a tuple of scalars. Values equal under `Scalar::loose_eq` hash equal:
/// integers of either width and integral floats share one encoding, so
/// `I32(1)`, `I64(1)` and `F64(1.0)` collide on purpose.
pub fn hash_scalars<'a, I>(values: I) -> Hash256
where
    I: IntoIterator<Item = &'a Scalar>,
{
    let mut hasher = Hasher::new();
    for v in values {
        hash_scalar(v, &mut hasher);
    }
    Hash256(hasher.finalize().into())
}

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BIN: u8 = 5;
const TAG_LIST: u8 = 6;

/// Integral floats inside the i64 range hash as integers.
fn float_as_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn hash_int(i: i64, hasher: &mut Hasher) {
    hasher.update(&[TAG_INT]);
    hasher.update(&i.to_le_bytes());
}

fn hash_float(f: f64, hasher: &mut Hasher) {
    match float_as_int(f) {
        Some(i) => hash_int(i, hasher),
        None => {
            hasher.update(&[TAG_FLOAT]);
            hasher.update(&f.to_bits().to_le_bytes());
        }
    }
}

fn hash_scalar(scalar: &Scalar, hasher: &mut Hasher) {
    use Scalar::*;

    match scalar {
        Null => {
            hasher.update(&[TAG_NULL]);
        }
        Bool(b) => {
            hasher.update(&[TAG_BOOL, *b as u8]);
        }
        I32(i) => hash_int(*i as i64, hasher),
        I64(i) => hash_int(*i, hasher),
        F32(f) => hash_float(*f as f64, hasher),
        F64(f) => hash_float(*f, hasher),
        Str(s) => {
            // length prefix keeps ("ab","c") apart from ("a","bc")
            hasher.update(&[TAG_STR]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Bin(b) => {
            hasher.update(&[TAG_BIN]);
            hasher.update(&(b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
        List(items) => {
            hasher.update(&[TAG_LIST]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_scalar(item, hasher);
            }
        }
    }
}
