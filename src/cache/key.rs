//! Cache key derivation.
//!
//! Every field is written length-prefixed into a SHA-256 hasher, so no two
//! distinct tuples share an encoding and the digest size is independent of the
//! input text length.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of a [`CacheKey`].
pub const KEY_LEN: usize = 32;

const SINGLE_DOMAIN: &[u8] = b"sentiment-cache/single/v1";
const BATCH_DOMAIN: &[u8] = b"sentiment-cache/batch/v1";

/// Fixed-size fingerprint of a lookup's semantic identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight bytes are plenty to tell keys apart in logs.
        let short: String = self.0[..8].iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "CacheKey({}..)", short)
    }
}

/// Builds [`CacheKey`]s for single and batch lookups.
///
/// Pure: no clock, no randomness. The optional salt namespaces keys per
/// deployment (for example when a model is swapped under the same identifier).
#[derive(Debug, Clone, Default)]
pub struct KeyBuilder {
    salt: Option<String>,
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Key for a single-text lookup.
    pub fn single_key(
        &self,
        model: &str,
        task_type: &str,
        text: &str,
        threshold: Option<f64>,
    ) -> CacheKey {
        let mut hasher = self.start(SINGLE_DOMAIN, model, task_type, threshold);
        write_field(&mut hasher, text.as_bytes());
        finish(hasher)
    }

    /// Key for an ordered batch of texts. Order is significant.
    pub fn batch_key<S: AsRef<str>>(
        &self,
        model: &str,
        task_type: &str,
        texts: &[S],
        threshold: Option<f64>,
    ) -> CacheKey {
        let mut hasher = self.start(BATCH_DOMAIN, model, task_type, threshold);
        hasher.update((texts.len() as u64).to_le_bytes());
        for text in texts {
            write_field(&mut hasher, text.as_ref().as_bytes());
        }
        finish(hasher)
    }

    fn start(&self, domain: &[u8], model: &str, task_type: &str, threshold: Option<f64>) -> Sha256 {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, domain);
        match self.salt {
            Some(ref salt) => {
                hasher.update([1u8]);
                write_field(&mut hasher, salt.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        write_field(&mut hasher, model.as_bytes());
        write_field(&mut hasher, task_type.as_bytes());
        write_threshold(&mut hasher, threshold);
        hasher
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn write_threshold(hasher: &mut Sha256, threshold: Option<f64>) {
    match threshold {
        None => hasher.update([0u8]),
        Some(t) => {
            // -0.0 == 0.0 and all NaNs are one value for keying purposes
            let canonical = if t == 0.0 {
                0.0f64
            } else if t.is_nan() {
                f64::NAN
            } else {
                t
            };
            hasher.update([1u8]);
            hasher.update(canonical.to_bits().to_le_bytes());
        }
    }
}

fn finish(hasher: Sha256) -> CacheKey {
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&hasher.finalize());
    CacheKey(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_key_is_deterministic() {
        let kb = KeyBuilder::new();
        let a = kb.single_key("vader", "sentiment", "great day", None);
        let b = KeyBuilder::new().single_key("vader", "sentiment", "great day", None);
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), KEY_LEN * 2);
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let kb = KeyBuilder::new();
        assert_ne!(
            kb.single_key("a", "sentiment", "bc", None),
            kb.single_key("ab", "sentiment", "c", None)
        );
        assert_ne!(
            kb.single_key("m", "ab", "c", None),
            kb.single_key("m", "a", "bc", None)
        );
        assert_ne!(
            kb.batch_key("m", "sentiment", &["a", "bb"], None),
            kb.batch_key("m", "sentiment", &["aa", "b"], None)
        );
        assert_ne!(
            kb.batch_key("m", "sentiment", &["ab"], None),
            kb.batch_key("m", "sentiment", &["a", "b"], None)
        );
    }

    #[test]
    fn every_identity_field_matters() {
        let kb = KeyBuilder::new();
        let base = kb.single_key("distilbert", "sentiment", "text", None);
        assert_ne!(base, kb.single_key("vader", "sentiment", "text", None));
        assert_ne!(base, kb.single_key("distilbert", "emotion", "text", None));
        assert_ne!(base, kb.single_key("distilbert", "sentiment", "text!", None));
        assert_ne!(base, kb.single_key("distilbert", "sentiment", "text", Some(0.35)));
        assert_ne!(
            kb.single_key("distilbert", "sentiment", "text", Some(0.35)),
            kb.single_key("distilbert", "sentiment", "text", Some(0.4))
        );
    }

    #[test]
    fn zero_threshold_is_not_absent_threshold() {
        let kb = KeyBuilder::new();
        assert_ne!(
            kb.single_key("m", "sentiment", "t", None),
            kb.single_key("m", "sentiment", "t", Some(0.0))
        );
        assert_eq!(
            kb.single_key("m", "sentiment", "t", Some(0.0)),
            kb.single_key("m", "sentiment", "t", Some(-0.0))
        );
    }

    #[test]
    fn batch_key_is_order_sensitive_and_stable() {
        let kb = KeyBuilder::new();
        let ab = kb.batch_key("m", "sentiment", &["a", "b"], None);
        let ba = kb.batch_key("m", "sentiment", &["b", "a"], None);
        assert_ne!(ab, ba);
        for _ in 0..10 {
            assert_eq!(ab, kb.batch_key("m", "sentiment", &["a", "b"], None));
        }
        let owned = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ab, kb.batch_key("m", "sentiment", &owned, None));
    }

    #[test]
    fn single_and_batch_of_one_differ() {
        let kb = KeyBuilder::new();
        assert_ne!(
            kb.single_key("m", "sentiment", "hello", None),
            kb.batch_key("m", "sentiment", &["hello"], None)
        );
    }

    #[test]
    fn empty_batch_has_a_key() {
        let kb = KeyBuilder::new();
        let empty: [&str; 0] = [];
        assert_ne!(
            kb.batch_key("m", "sentiment", &empty, None),
            kb.batch_key("m", "sentiment", &[""], None)
        );
    }

    #[test]
    fn salt_namespaces_keys() {
        let plain = KeyBuilder::new().single_key("m", "sentiment", "t", None);
        let salted = KeyBuilder::new()
            .with_salt("rev-2")
            .single_key("m", "sentiment", "t", None);
        assert_ne!(plain, salted);
    }

    #[test]
    fn debug_output_is_abbreviated() {
        let key = CacheKey::from_bytes([0xab; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "CacheKey(abababababababab..)");
        assert_eq!(key.to_string(), "ab".repeat(KEY_LEN));
    }
}
