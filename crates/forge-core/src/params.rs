use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EARLY_ADOPTER_LIMIT, DEFAULT_EARLY_ADOPTER_WINDOW_SECS,
    DEFAULT_TARGET_REFERENCE_PRICE,
};
use crate::error::ForgeError;
use crate::types::{Amount, ParticipantId, Timestamp};

fn default_target_price() -> Amount {
    DEFAULT_TARGET_REFERENCE_PRICE
}

fn default_cutoff_count() -> u64 {
    DEFAULT_EARLY_ADOPTER_LIMIT
}

/// Launch parameters for a forge deployment.
///
/// In production these come from a JSON file fixed at launch; in tests and
/// local development `ForgeParams::development` fills sensible defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForgeParams {
    /// Protocol launch time (Unix seconds). Age and time milestones count from here.
    pub launch_time: Timestamp,
    /// Reference price at which the price layer is neutral (8-decimal fixed point).
    #[serde(default = "default_target_price")]
    pub target_reference_price: Amount,
    /// Reference price known at launch, if any.
    #[serde(default)]
    pub initial_reference_price: Option<Amount>,
    /// Registration closes at this instant...
    pub early_adopter_cutoff_time: Timestamp,
    /// ...or once this many admissions have completed, whichever comes first.
    #[serde(default = "default_cutoff_count")]
    pub early_adopter_cutoff_count: u64,
    /// Base-58 identities allowed to deliver payment verifications.
    #[serde(default)]
    pub oracles: Vec<String>,
    /// Base-58 identities allowed to call administrative operations.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl ForgeParams {
    pub fn development(launch_time: Timestamp) -> Self {
        Self {
            launch_time,
            target_reference_price: DEFAULT_TARGET_REFERENCE_PRICE,
            initial_reference_price: None,
            early_adopter_cutoff_time: launch_time + DEFAULT_EARLY_ADOPTER_WINDOW_SECS,
            early_adopter_cutoff_count: DEFAULT_EARLY_ADOPTER_LIMIT,
            oracles: Vec::new(),
            admins: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ForgeError> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| ForgeError::Serialization(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Checks internal consistency. Identities must decode; the cutoff must
    /// not precede launch.
    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.early_adopter_cutoff_count == 0 {
            return Err(ForgeError::ZeroCutoffCount);
        }
        if self.early_adopter_cutoff_time <= self.launch_time {
            return Err(ForgeError::CutoffNotInFuture {
                cutoff: self.early_adopter_cutoff_time,
                now: self.launch_time,
            });
        }
        if self.target_reference_price == 0 {
            return Err(ForgeError::Other("target reference price must be positive".into()));
        }
        self.oracle_ids()?;
        self.admin_ids()?;
        Ok(())
    }

    pub fn oracle_ids(&self) -> Result<Vec<ParticipantId>, ForgeError> {
        self.oracles.iter().map(|s| ParticipantId::from_b58(s)).collect()
    }

    pub fn admin_ids(&self) -> Result<Vec<ParticipantId>, ForgeError> {
        self.admins.iter().map(|s| ParticipantId::from_b58(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_fill_optional_fields() {
        let oracle = ParticipantId([9u8; 32]).to_b58();
        let json = format!(
            r#"{{"launch_time": 1000, "early_adopter_cutoff_time": 5000, "oracles": ["{oracle}"]}}"#
        );
        let p = ForgeParams::from_json(&json).unwrap();
        assert_eq!(p.target_reference_price, DEFAULT_TARGET_REFERENCE_PRICE);
        assert_eq!(p.early_adopter_cutoff_count, DEFAULT_EARLY_ADOPTER_LIMIT);
        assert_eq!(p.oracle_ids().unwrap(), vec![ParticipantId([9u8; 32])]);
    }

    #[test]
    fn cutoff_before_launch_rejected() {
        let mut p = ForgeParams::development(1_000);
        p.early_adopter_cutoff_time = 999;
        assert!(matches!(p.validate(), Err(ForgeError::CutoffNotInFuture { .. })));
    }

    #[test]
    fn malformed_identity_rejected() {
        let mut p = ForgeParams::development(1_000);
        p.admins.push("not-base58-0OIl".into());
        assert!(matches!(p.validate(), Err(ForgeError::InvalidParticipant(_))));
    }
}
