//! Whitelist arbitration and the Discord link store.
//!
//! ## Module Structure
//!
//! - `arbiter`: Login decisions (`WhitelistArbiter`)
//! - `authority`: The external authority trait
//! - `store`: Persisted link table (`LinkStore`), the default authority
//! - `codes`: In-memory link codes
//! - `template`: Kick-screen message rendering

pub mod arbiter;
pub mod authority;
pub mod codes;
pub mod store;
pub mod template;

pub use arbiter::WhitelistArbiter;
pub use authority::WhitelistAuthority;
pub use store::{Link, LinkStore};
pub use template::WhitelistTemplate;
