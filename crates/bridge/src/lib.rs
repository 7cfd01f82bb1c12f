//! # adb-reader Bridge Library
//!
//! This crate drives the Android Debug Bridge (`adb`) executable to inspect
//! connected devices, list their media files and move files between host and
//! device.
//!
//! ## Overview
//!
//! - **Command Runner**: one adb process per operation, output captured,
//!   bounded by a configurable deadline
//! - **Device Queries**: serials, identity properties, storage usage
//! - **File Listing**: long-format listings reconciled with exact names
//! - **Transfers**: pull and push with adb's summary line reported back
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Android                     │
//! │   devices / device / files / pull / push ...  │
//! ├───────────────────────┬───────────────────────┤
//! │   Invoker (runner)    │   listing crate       │
//! │   AdbProcess / fake   │   classify, parse,    │
//! │                       │   reconcile           │
//! └───────────┬───────────┴───────────────────────┘
//!             │
//!          adb executable
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bridge::{Android, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let adb = Android::from_config(&config);
//!
//!     for id in adb.devices()? {
//!         for file in adb.files(&id, "/sdcard/DCIM", true, true)? {
//!             println!("{} {}", file.size, file.path());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`android`]: Device operations
//! - [`runner`]: adb process invocation
//! - [`config`]: Configuration loading and defaults
//! - [`logging`]: Tracing subscriber setup
//! - [`error`]: Error types

pub mod android;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;

pub use android::Android;
pub use config::{Config, ConfigError};
pub use error::{BridgeError, Result};
pub use runner::{shell_quote, AdbProcess, CommandOutput, Invocation, Invoker};

pub use listing::{DeviceRecord, FileKind, FileRecord, ListingOptions, ReferencePolicy};
