//! Authentication and authorization

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod session;

pub use jwt::{Claims, TokenError, TokenIssuer};
pub use middleware::{route_guard, GuardDecision, RouteGuard};
pub use models::{LoginRequest, LoginResponse, Role, Status};
pub use session::{AdminSession, AuthSession, StaffSession};
