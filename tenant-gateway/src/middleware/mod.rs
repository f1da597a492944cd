pub mod guard;
pub mod tenant;

pub use guard::edge_guard_middleware;
pub use tenant::{AuthSession, Session, TenantContext};
