use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use forge_core::error::ForgeError;
use forge_core::types::{AdmissionId, ParticipantId};
use tracing::info;

/// Outbound reward issuance. Called exactly once per successful
/// verification, before the verification is committed; an error aborts the
/// verification.
pub trait RewardIssuer: Send + Sync {
    fn issue(
        &self,
        participant: &ParticipantId,
        admission: &AdmissionId,
        total_admissions: u64,
    ) -> Result<(), ForgeError>;
}

/// Issuer that only logs. Used by the node until a minting backend is wired in.
#[derive(Debug, Default)]
pub struct LoggingIssuer;

impl RewardIssuer for LoggingIssuer {
    fn issue(
        &self,
        participant: &ParticipantId,
        admission: &AdmissionId,
        total_admissions: u64,
    ) -> Result<(), ForgeError> {
        info!(participant = %participant, admission = %admission, total_admissions, "reward issued");
        Ok(())
    }
}

/// Issuer that remembers every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingIssuer {
    issued: Mutex<Vec<(ParticipantId, AdmissionId)>>,
    failing: AtomicBool,
}

impl RecordingIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn issued(&self) -> Vec<(ParticipantId, AdmissionId)> {
        self.issued.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl RewardIssuer for RecordingIssuer {
    fn issue(
        &self,
        participant: &ParticipantId,
        admission: &AdmissionId,
        _total_admissions: u64,
    ) -> Result<(), ForgeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ForgeError::RewardIssuance("issuer unavailable".into()));
        }
        self.issued
            .lock()
            .map_err(|_| ForgeError::RewardIssuance("issuer poisoned".into()))?
            .push((*participant, *admission));
        Ok(())
    }
}
