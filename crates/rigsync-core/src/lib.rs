//! rigsync Core - Device capture engine, profiles, and revert
//!
//! This crate captures and restores the configuration state of the five
//! workstation peripherals behind named profiles on a shared directory,
//! with a one-slot backup vault for reverting a bad apply.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod device;
pub mod filter;
pub mod layout;
pub mod process;
pub mod profile;
pub mod settings;
pub mod sync;
pub mod util;
pub mod vault;

pub use device::{AdapterError, DeviceAdapter, DeviceId, ExportStatus};
pub use layout::SyncRoot;
pub use profile::{Profile, ProfileStore, StoreError};
pub use settings::AppSettings;
pub use sync::{DeviceOutcome, DeviceStatus, SyncCoordinator, SyncReport};
pub use vault::BackupVault;
