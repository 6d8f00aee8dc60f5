//! Domain models for the portal.

pub mod session;
pub mod setting;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
pub use setting::{RESTRICTED_ACCESS_KEY, Setting, restricted_access_enabled};
pub use user::{NewUser, User, UserChanges, UserView};
