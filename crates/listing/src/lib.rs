//! # adb-reader Listing Library
//!
//! This crate turns the text adb prints into typed records. It never runs a
//! process itself: the `bridge` crate captures output and hands it here.
//!
//! ## Overview
//!
//! - **Output Classification**: maps captured output to a closed set of
//!   outcomes (device missing, daemon down, path missing, ...)
//! - **Property Scraping**: `getprop`, `df -h` and `adb devices -l` parsers
//! - **Listing Reconciliation**: pairs `ls -go` metadata with exact names
//!   from a plain `ls`, filtering by extension and suffix allow-lists
//!
//! ## Example Usage
//!
//! ```rust
//! use listing::{reconcile, FolderNames, ListingOptions};
//!
//! let long = ".:\n-rw-rw---- 1 2048 2024-07-09 10:11 IMG?001.jpg\n";
//! let plain = FolderNames::parse(".:\nIMG 001.jpg\n");
//!
//! let records = reconcile(long, &plain, "/sdcard/DCIM", &ListingOptions::default()).unwrap();
//! assert_eq!(records[0].name, "IMG 001.jpg");
//! assert_eq!(records[0].path(), "/sdcard/DCIM/IMG 001.jpg");
//! ```
//!
//! ## Modules
//!
//! - [`output`]: Outcome classification and small output scrapers
//! - [`reconcile`]: Long-format listing reconciliation
//! - [`recognizer`]: File type allow-lists and listing options
//! - [`records`]: Device and file records
//! - [`error`]: Error types

pub mod error;
pub mod output;
pub mod recognizer;
pub mod reconcile;
pub mod records;

pub use error::{ListingError, Result};
pub use output::{classify, folder_names, Outcome, StorageUsage};
pub use recognizer::{FileTypeRecognizer, ListingOptions, ReferencePolicy};
pub use reconcile::{reconcile, FolderNames};
pub use records::{DeviceOs, DeviceRecord, DeviceType, FileKind, FileRecord};
