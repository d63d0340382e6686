use thiserror::Error;

/// Broad classification of a `ForgeError`.
///
/// Conflicts are expected under concurrent submission and are never fatal;
/// callers retry with a new payment reference, a higher offer, or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Admission,
    Unauthorized,
    Storage,
    External,
}

#[derive(Debug, Error)]
pub enum ForgeError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("early-adopter cutoff must be in the future (got {cutoff}, now {now})")]
    CutoffNotInFuture { cutoff: i64, now: i64 },

    #[error("early-adopter cutoff count must be greater than zero")]
    ZeroCutoffCount,

    #[error("early-adopter registration is permanently closed")]
    RegistrationClosed,

    #[error("fee override must be greater than zero")]
    ZeroFeeOverride,

    #[error("invalid participant id: {0}")]
    InvalidParticipant(String),

    #[error("invalid payment reference: {0}")]
    InvalidPaymentReference(String),

    #[error("invalid admission id: {0}")]
    InvalidAdmissionId(String),

    // ── Conflict errors ──────────────────────────────────────────────────────
    #[error("payment reference already consumed: {0}")]
    PaymentReferenceConsumed(String),

    #[error("admission already submitted: {0}")]
    DuplicateAdmission(String),

    #[error("admission already verified: {0}")]
    AlreadyVerified(String),

    #[error("participant already registered as early adopter: {0}")]
    AlreadyRegistered(String),

    #[error("admission was rejected by the oracle and is final: {0}")]
    AlreadyRejected(String),

    // ── Admission errors ─────────────────────────────────────────────────────
    #[error("daily admission quota exhausted: {limit} per day (day {day})")]
    DailyQuotaExhausted { limit: u32, day: i64 },

    #[error("offer below required fee: need {required} sats, offered {offered}")]
    InsufficientOffer { required: u128, offered: u128 },

    #[error("unknown admission: {0}")]
    UnknownAdmission(String),

    #[error("admission {admission} does not belong to participant {participant}")]
    ParticipantMismatch { admission: String, participant: String },

    // ── Auth errors ──────────────────────────────────────────────────────────
    #[error("caller {caller} lacks the {role} role")]
    Unauthorized { caller: String, role: &'static str },

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── External collaborators ───────────────────────────────────────────────
    #[error("reward issuance failed: {0}")]
    RewardIssuance(String),

    #[error("{0}")]
    Other(String),
}

impl ForgeError {
    pub fn kind(&self) -> ErrorKind {
        use ForgeError::*;
        match self {
            CutoffNotInFuture { .. }
            | ZeroCutoffCount
            | RegistrationClosed
            | ZeroFeeOverride
            | InvalidParticipant(_)
            | InvalidPaymentReference(_)
            | InvalidAdmissionId(_) => ErrorKind::Validation,

            PaymentReferenceConsumed(_)
            | DuplicateAdmission(_)
            | AlreadyVerified(_)
            | AlreadyRegistered(_)
            | AlreadyRejected(_) => ErrorKind::Conflict,

            DailyQuotaExhausted { .. }
            | InsufficientOffer { .. }
            | UnknownAdmission(_)
            | ParticipantMismatch { .. } => ErrorKind::Admission,

            Unauthorized { .. } => ErrorKind::Unauthorized,

            Serialization(_) | Storage(_) => ErrorKind::Storage,

            RewardIssuance(_) | Other(_) => ErrorKind::External,
        }
    }

    /// True for the conflicts that concurrent callers should expect.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_classified() {
        assert!(ForgeError::AlreadyVerified("x".into()).is_conflict());
        assert!(ForgeError::PaymentReferenceConsumed("x".into()).is_conflict());
        assert!(!ForgeError::ZeroCutoffCount.is_conflict());
        assert_eq!(
            ForgeError::InsufficientOffer { required: 2, offered: 1 }.kind(),
            ErrorKind::Admission
        );
    }
}
