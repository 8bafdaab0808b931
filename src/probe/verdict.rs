//! Compatibility verdict and its persisted encoding

/// Tri-state compatibility result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Never checked, cache miss, or cache expired.
    #[default]
    Unknown,
    /// The negotiated protocol version is in the approved set.
    Compatible,
    /// The negotiated protocol version is outside the approved set.
    Incompatible,
}

impl Verdict {
    pub fn from_compatible(compatible: bool) -> Self {
        if compatible {
            Verdict::Compatible
        } else {
            Verdict::Incompatible
        }
    }

    /// `None` while unknown, otherwise whether the environment is
    /// compatible.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Verdict::Unknown => None,
            Verdict::Compatible => Some(true),
            Verdict::Incompatible => Some(false),
        }
    }
}

/// Verdict marker plus a 13-digit millisecond timestamp. The fixed total
/// length doubles as a corruption check on decode.
const ENCODED_LEN: usize = 14;

/// One persisted observation: the verdict and when it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredVerdict {
    pub compatible: bool,
    pub observed_at_ms: i64,
}

impl StoredVerdict {
    /// Encodes as `<'y'|'n'><millis>`, e.g. `y1690000000000`.
    pub fn encode(&self) -> String {
        format!(
            "{}{}",
            if self.compatible { 'y' } else { 'n' },
            self.observed_at_ms
        )
    }

    /// Decodes a persisted record. Anything failing the length or format
    /// check reads as absent, never as an error.
    pub fn decode(raw: &str) -> Option<Self> {
        if raw.len() != ENCODED_LEN {
            return None;
        }

        let compatible = match raw.as_bytes()[0] {
            b'y' => true,
            b'n' => false,
            _ => return None,
        };

        // parse() would also accept a sign, so require digits explicitly
        let digits = &raw[1..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let observed_at_ms = digits.parse().ok()?;
        Some(Self {
            compatible,
            observed_at_ms,
        })
    }

    /// Whether the observation is still authoritative under `ttl_ms` at
    /// `now_ms`.
    pub fn is_fresh(&self, ttl_ms: i64, now_ms: i64) -> bool {
        self.observed_at_ms.saturating_add(ttl_ms) > now_ms
    }
}
