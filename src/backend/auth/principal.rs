/**
 * Principals and Roles
 *
 * A `Principal` is the authenticated identity bound to an HTTP request or a
 * realtime connection. Roles form a closed set; a principal always holds at
 * least one of them.
 */
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::UserId;

/// Role granted to a user
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_MANAGER")]
    Manager,
    #[serde(rename = "ROLE_MEMBER")]
    #[default]
    Member,
}

impl Role {
    /// Authority string stored in the database and carried in tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Manager => "ROLE_MANAGER",
            Role::Member => "ROLE_MEMBER",
        }
    }

    /// Parse an authority string
    pub fn from_authority(authority: &str) -> Option<Role> {
        match authority {
            "ROLE_ADMIN" => Some(Role::Admin),
            "ROLE_MANAGER" => Some(Role::Manager),
            "ROLE_MEMBER" => Some(Role::Member),
            _ => None,
        }
    }

    /// Resolve a role name requested at signup
    ///
    /// `"admin"` and `"manager"` select those roles; any other name is a member.
    pub fn resolve(requested: &str) -> Role {
        match requested {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            _ => Role::Member,
        }
    }

    /// Resolve the full requested set, defaulting to member when empty
    pub fn resolve_all<'a>(requested: impl IntoIterator<Item = &'a str>) -> BTreeSet<Role> {
        let mut roles: BTreeSet<Role> = requested.into_iter().map(Role::resolve).collect();
        if roles.is_empty() {
            roles.insert(Role::default());
        }
        roles
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    roles: BTreeSet<Role>,
}

impl Principal {
    /// Create a principal; an empty role set becomes `{Member}`
    pub fn new(id: UserId, username: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        let mut roles: BTreeSet<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            roles.insert(Role::default());
        }
        Self {
            id,
            username: username.into(),
            roles,
        }
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Admins and managers may see aggregate statistics
    pub fn can_view_dashboard(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Manager)
    }

    /// Authority strings, sorted
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}
