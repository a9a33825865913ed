//! Base-62 id compression.

use crate::model::timer::TimerId;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encodes a millisecond timestamp as base-62, most significant digit first.
///
/// `0` encodes as `"0"` so the result is never empty.
pub fn compress_id(timestamp_ms: u64) -> String {
    if timestamp_ms == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    let mut remaining = timestamp_ms;
    while remaining > 0 {
        digits.push(BASE62_ALPHABET[(remaining % 62) as usize] as char);
        remaining /= 62;
    }
    digits.iter().rev().collect()
}

/// Decodes a base-62 id produced by [`compress_id`].
///
/// Returns `None` for empty input, foreign characters or overflow.
pub fn expand_id(value: &str) -> Option<u64> {
    if value.is_empty() {
        return None;
    }
    value.bytes().try_fold(0_u64, |acc, byte| {
        let digit = BASE62_ALPHABET.iter().position(|candidate| *candidate == byte)?;
        acc.checked_mul(62)?.checked_add(digit as u64)
    })
}

/// Issues compressed timer ids that stay unique within one process.
///
/// Two requests in the same millisecond get consecutive timestamps.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_ms: Option<u64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id for a timer created at `now_ms`.
    pub fn next_id(&mut self, now_ms: i64) -> TimerId {
        let now_ms = u64::try_from(now_ms).unwrap_or(0);
        let issued = match self.last_ms {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        self.last_ms = Some(issued);
        TimerId::new(compress_id(issued))
    }
}

#[cfg(test)]
mod tests {
    use super::{compress_id, expand_id, IdGenerator};

    #[test]
    fn compresses_known_values() {
        assert_eq!(compress_id(0), "0");
        assert_eq!(compress_id(61), "Z");
        assert_eq!(compress_id(62), "10");
        assert_eq!(compress_id(3_843), "ZZ");
        assert_eq!(compress_id(1_700_000_000_000), "tVCOKGI");
    }

    #[test]
    fn expand_reverses_compress() {
        for value in [0_u64, 1, 61, 62, 1_700_000_000_000, u64::MAX] {
            assert_eq!(expand_id(&compress_id(value)), Some(value));
        }
    }

    #[test]
    fn expand_rejects_foreign_characters() {
        assert_eq!(expand_id(""), None);
        assert_eq!(expand_id("ab-c"), None);
    }

    #[test]
    fn generator_never_repeats_within_one_millisecond() {
        let mut generator = IdGenerator::new();
        let first = generator.next_id(1_700_000_000_000);
        let second = generator.next_id(1_700_000_000_000);
        let third = generator.next_id(1_699_999_999_999);
        assert_eq!(first.as_str(), "tVCOKGI");
        assert_eq!(second.as_str(), "tVCOKGJ");
        assert_ne!(second, third);
    }
}
