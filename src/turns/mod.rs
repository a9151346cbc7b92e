pub mod store;
pub mod types;

pub use store::TurnStore;
pub use types::{Turn, TurnId, TurnStatus, DEFAULT_TEMP_PREFIX};
