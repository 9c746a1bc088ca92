pub mod error;
pub mod store;

pub use error::JobStoreError;
pub use store::*;
