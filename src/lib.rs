//! Client for a data-center fabric controller: graph queries against a
//! blueprint, composite mutation payloads and throttled writes.

pub mod blueprint;
pub mod bulk;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod outcome;
pub mod payloads;
pub mod query;
pub mod session;

pub use blueprint::{list_blueprints, BlueprintHandle};
pub use config::Config;
pub use error::{ClientError, Result};
pub use outcome::Outcome;
pub use session::{RetryPolicy, Session};
