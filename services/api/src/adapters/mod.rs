pub mod db;
pub mod identity;

pub use db::{AccountStore, DbAdapter};
pub use identity::{AuthSettings, PgIdentityAdapter};
