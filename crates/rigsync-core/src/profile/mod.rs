//! Profile types and storage

pub mod store;
mod types;

pub use store::{ProfileStore, StoreError, DEFAULT_PROFILE};
pub use types::Profile;
