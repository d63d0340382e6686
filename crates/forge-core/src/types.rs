use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MAX_REASON_BYTES, SECS_PER_DAY};
use crate::error::ForgeError;

/// Amount in satoshis. u128 keeps compounded fees overflow-free long after
/// every band cap has been reached.
pub type Amount = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Multiplier or discount expressed in whole percent (100 = 1.00×).
pub type Percent = u64;

/// UTC day index: whole days since the Unix epoch.
pub fn day_index(at: Timestamp) -> i64 {
    at.div_euclid(SECS_PER_DAY)
}

/// Whole days from `from` to `to`; zero when `to` precedes `from`.
pub fn whole_days_between(from: Timestamp, to: Timestamp) -> u64 {
    if to <= from {
        0
    } else {
        ((to - from) / SECS_PER_DAY) as u64
    }
}

/// Clip free-form diagnostic text to `MAX_REASON_BYTES` on a char boundary.
pub fn clip_reason(reason: &str) -> String {
    if reason.len() <= MAX_REASON_BYTES {
        return reason.to_string();
    }
    let mut end = MAX_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

fn decode_32(bytes: &[u8]) -> Option<[u8; 32]> {
    <[u8; 32]>::try_from(bytes).ok()
}

// ── ParticipantId ────────────────────────────────────────────────────────────

/// 32-byte participant identifier supplied by the ledger substrate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub [u8; 32]);

impl ParticipantId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base-58 encoded string representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, ForgeError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ForgeError::InvalidParticipant(format!("{s}: {e}")))?;
        decode_32(&bytes)
            .map(Self)
            .ok_or_else(|| ForgeError::InvalidParticipant(format!("{s}: expected 32 bytes")))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b58 = self.to_b58();
        write!(f, "ParticipantId({})", &b58[..8.min(b58.len())])
    }
}

// ── PaymentRef ───────────────────────────────────────────────────────────────

/// Reference to the off-chain payment backing an admission (the BTC txid).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentRef(pub [u8; 32]);

impl PaymentRef {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ForgeError> {
        let bytes =
            hex::decode(s).map_err(|e| ForgeError::InvalidPaymentReference(format!("{s}: {e}")))?;
        decode_32(&bytes)
            .map(Self)
            .ok_or_else(|| ForgeError::InvalidPaymentReference(format!("{s}: expected 32 bytes")))
    }
}

impl fmt::Display for PaymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PaymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentRef({}…)", &self.to_hex()[..16])
    }
}

// ── AdmissionId ──────────────────────────────────────────────────────────────

/// Deterministic admission identifier:
/// BLAKE3(participant || payment_ref || submitted_at LE bytes).
///
/// Identical inputs at the identical instant derive the same id, which is
/// what makes a replayed submission collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdmissionId(pub [u8; 32]);

impl AdmissionId {
    pub fn derive(participant: &ParticipantId, payment_ref: &PaymentRef, at: Timestamp) -> Self {
        let mut h = blake3::Hasher::new();
        h.update(participant.as_bytes());
        h.update(payment_ref.as_bytes());
        h.update(&at.to_le_bytes());
        Self(*h.finalize().as_bytes())
    }

    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ForgeError> {
        let bytes =
            hex::decode(s).map_err(|e| ForgeError::InvalidAdmissionId(format!("{s}: {e}")))?;
        decode_32(&bytes)
            .map(Self)
            .ok_or_else(|| ForgeError::InvalidAdmissionId(format!("{s}: expected 32 bytes")))
    }
}

impl fmt::Display for AdmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AdmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdmissionId({}…)", &self.to_hex()[..16])
    }
}
