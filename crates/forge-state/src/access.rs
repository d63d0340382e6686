use std::collections::HashSet;

use forge_core::error::ForgeError;
use forge_core::params::ForgeParams;
use forge_core::types::ParticipantId;

/// Privileged roles the coordinator checks before mutating state on a
/// caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Delivers payment verification results.
    Oracle,
    /// Operates cutoffs, backfills, overrides and inbound metrics.
    Admin,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Oracle => "oracle",
            Role::Admin => "admin",
        }
    }
}

/// Answers role membership. Administering the roles themselves happens
/// elsewhere.
pub trait AccessControl: Send + Sync {
    fn has_role(&self, caller: &ParticipantId, role: Role) -> bool;

    fn require(&self, caller: &ParticipantId, role: Role) -> Result<(), ForgeError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(ForgeError::Unauthorized { caller: caller.to_string(), role: role.name() })
        }
    }
}

/// Fixed role sets loaded from launch parameters.
#[derive(Debug, Clone, Default)]
pub struct StaticRoles {
    oracles: HashSet<ParticipantId>,
    admins: HashSet<ParticipantId>,
}

impl StaticRoles {
    pub fn new(
        oracles: impl IntoIterator<Item = ParticipantId>,
        admins: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        Self { oracles: oracles.into_iter().collect(), admins: admins.into_iter().collect() }
    }

    pub fn from_params(params: &ForgeParams) -> Result<Self, ForgeError> {
        Ok(Self::new(params.oracle_ids()?, params.admin_ids()?))
    }
}

impl AccessControl for StaticRoles {
    fn has_role(&self, caller: &ParticipantId, role: Role) -> bool {
        match role {
            Role::Oracle => self.oracles.contains(caller),
            Role::Admin => self.admins.contains(caller),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_disjoint_unless_listed_twice() {
        let oracle = ParticipantId([1; 32]);
        let admin = ParticipantId([2; 32]);
        let roles = StaticRoles::new([oracle], [admin]);
        assert!(roles.require(&oracle, Role::Oracle).is_ok());
        assert!(roles.require(&admin, Role::Admin).is_ok());
        assert!(matches!(
            roles.require(&admin, Role::Oracle),
            Err(ForgeError::Unauthorized { role: "oracle", .. })
        ));
    }

    #[test]
    fn loads_from_params() {
        let mut params = ForgeParams::development(1_000);
        params.oracles.push(ParticipantId([7; 32]).to_b58());
        let roles = StaticRoles::from_params(&params).unwrap();
        assert!(roles.has_role(&ParticipantId([7; 32]), Role::Oracle));
        assert!(!roles.has_role(&ParticipantId([7; 32]), Role::Admin));
    }
}
