//! Role model shared by HTTP authorization and WebSocket broadcasts.
//!
//! Roles travel as small integers (session payloads, JWT claims, the admin
//! listing). [`ROLE_TABLE`] is the single place that maps them to names.

use serde::{Deserialize, Serialize};

/// A caller role. Serialized as its wire integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    /// Full access, including the admin surface.
    Admin,
    /// Regular team member.
    Member,
}

/// Wire integer and display name of every role.
pub const ROLE_TABLE: &[(Role, u8, &str)] = &[(Role::Admin, 0, "admin"), (Role::Member, 1, "member")];

impl Role {
    /// Wire integer of this role.
    pub fn id(self) -> u8 {
        ROLE_TABLE
            .iter()
            .find(|(role, _, _)| *role == self)
            .map(|(_, id, _)| *id)
            .unwrap_or(u8::MAX)
    }

    /// Lower-case display name.
    pub fn name(self) -> &'static str {
        ROLE_TABLE
            .iter()
            .find(|(role, _, _)| *role == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("unknown")
    }

    /// Look up a role by its wire integer.
    pub fn from_id(id: u8) -> Option<Role> {
        ROLE_TABLE
            .iter()
            .find(|(_, wire, _)| *wire == id)
            .map(|(role, _, _)| *role)
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Role::from_id(value).ok_or_else(|| format!("unknown role id {value}"))
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        role.id()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Audience of privileged notifications.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Every role.
pub const ALL_ROLES: &[Role] = &[Role::Admin, Role::Member];
