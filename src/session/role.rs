use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Role held by a participant for the lifetime of its login.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

/// How many connections may hold the admin role at the same time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdminPolicy {
    /// Every login with the admin name becomes admin. Page state is last-writer-wins.
    #[default]
    Shared,
    /// First claimant holds the lease until it disconnects; later claimants become viewers.
    Exclusive,
}

impl fmt::Display for AdminPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminPolicy::Shared => write!(f, "shared"),
            AdminPolicy::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Check whether a display name claims the reserved admin name.
pub fn claims_admin(display_name: &str, admin_name: &str) -> bool {
    display_name.trim().eq_ignore_ascii_case(admin_name.trim())
}

/// Decide the role for a login, given whether another connection already holds admin.
pub fn assign_role(
    display_name: &str,
    admin_name: &str,
    policy: AdminPolicy,
    admin_held_elsewhere: bool,
) -> Role {
    if !claims_admin(display_name, admin_name) {
        return Role::Viewer;
    }
    match policy {
        AdminPolicy::Shared => Role::Admin,
        AdminPolicy::Exclusive if admin_held_elsewhere => Role::Viewer,
        AdminPolicy::Exclusive => Role::Admin,
    }
}
