//! Static role → permission mapping.
//!
//! Permissions are fixed at compile time; there is no dynamic permission
//! storage. A route names the permission it requires and the caller's role
//! either grants it or does not.

use crate::auth::tokens::Claims;
use crate::db::Role;

/// Read access to user records other than the caller's own.
pub const PERM_USERS_READ: &str = "users:read";
/// Create, modify and delete arbitrary user records.
pub const PERM_USERS_MANAGE: &str = "users:manage";

pub const ADMIN_PERMISSIONS: &[&str] = &[PERM_USERS_READ, PERM_USERS_MANAGE];
pub const USER_PERMISSIONS: &[&str] = &[];

pub fn permissions_for(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::User => USER_PERMISSIONS,
    }
}

/// Authenticated caller identity, decoded from a verified access token and
/// injected into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            // Unknown roles get the least-privileged set
            role: claims.role.parse().unwrap_or(Role::User),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        permissions_for(self.role).contains(&permission)
    }
}
