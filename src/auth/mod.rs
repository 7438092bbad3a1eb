//! Stateless JWT authentication and role-based authorization.

pub mod middleware;
pub mod rbac;
pub mod tokens;

pub use rbac::CurrentUser;
pub use tokens::{AuthTokens, Claims, TokenError, TokenService, TokenType};
