//! Caller identity resolved once per session from the external session store.

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::types::DbId;

/// Who is calling: user id, display name and role set.
///
/// Immutable once a connection has been admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: DbId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl CallerIdentity {
    pub fn new(user_id: DbId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    /// `true` if at least one of this identity's roles is in `targets`.
    ///
    /// An empty `targets` slice matches nobody.
    pub fn has_any_role(&self, targets: &[Role]) -> bool {
        self.roles.iter().any(|role| targets.contains(role))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
