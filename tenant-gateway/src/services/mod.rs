pub mod directory;
pub mod identity;
pub mod rate_limit;

pub use directory::{DirectoryStore, HttpDirectoryStore};
pub use identity::{HttpIdentityProvider, IdentityProvider};
pub use rate_limit::{FixedWindowLimiter, RateLimitDecision, SweeperHandle};
