//! The three-way result of expiry extraction.
//!
//! `Unknown` and `Failed` are deliberately distinct from each other in the
//! type (so callers and tests can tell "no recognized format" from "the
//! recognized format didn't parse"), but both collapse to the same
//! caller-visible outcome: no state change, no error.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The filename suffix didn't match any known format.
    Unknown,
    /// The format was recognized but had no expiry we could recover (every
    /// candidate password failed, or the payload was malformed).
    Failed,
    /// Unix-seconds expiry, the minimum `notAfter` across whatever chain or
    /// signature set the format carries.
    Found(i64),
}

impl ExtractOutcome {
    pub fn into_expiry(self) -> Option<i64> {
        match self {
            Self::Found(t) => Some(t),
            Self::Unknown | Self::Failed => None,
        }
    }
}
