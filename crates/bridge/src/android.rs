//! Operations on Android devices through adb.
//!
//! [`Android`] turns each operation into one adb command line, runs it through
//! an [`Invoker`] and interprets the captured output with the `listing` crate.
//! Device failures (unknown serial, daemon down) become errors; what a missing
//! path means is decided per operation.
//!
//! ```no_run
//! use bridge::Android;
//!
//! let adb = Android::new("/opt/android-sdk/platform-tools");
//! for id in adb.devices().unwrap_or_default() {
//!     if let Ok(Some(device)) = adb.device(&id) {
//!         println!("{}", device);
//!     }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use listing::output::{self, Outcome};
use listing::records::join_device_path;
use listing::{reconcile, DeviceRecord, FileRecord, FolderNames, ListingOptions};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::runner::{shell_quote, AdbProcess, CommandOutput, Invocation, Invoker};

/// Deadline applied to shell queries unless configured otherwise.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Storage root queried by [`Android::storage`] unless configured otherwise.
pub const DEFAULT_STORAGE_ROOT: &str = "/storage/emulated";

/// Device bridge driving the adb executable.
///
/// Every operation checks that adb is available before running anything, so
/// a bridge built with a bad directory keeps failing with
/// [`BridgeError::Unavailable`] instead of panicking.
#[derive(Debug, Clone)]
pub struct Android<I: Invoker = AdbProcess> {
    invoker: I,
    options: ListingOptions,
    storage_root: String,
    command_timeout: Option<Duration>,
    transfer_timeout: Option<Duration>,
}

impl Android<AdbProcess> {
    /// Creates a bridge for the adb executable inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_invoker(AdbProcess::new(dir))
    }

    /// Creates a bridge from loaded configuration.
    ///
    /// An empty `adb_dir` is resolved from `PATH`.
    pub fn from_config(config: &Config) -> Self {
        let dir = config.resolve_adb_dir().unwrap_or_default();
        Self::new(dir)
            .with_listing_options(config.listing_options())
            .with_storage_root(config.bridge.storage_root.clone())
            .with_command_timeout(config.bridge.command_timeout())
            .with_transfer_timeout(config.bridge.transfer_timeout())
    }
}

impl<I: Invoker> Android<I> {
    /// Creates a bridge on top of any invoker.
    pub fn with_invoker(invoker: I) -> Self {
        Self {
            invoker,
            options: ListingOptions::default(),
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            transfer_timeout: None,
        }
    }

    /// Replaces the listing filters.
    pub fn with_listing_options(mut self, options: ListingOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the folder whose filesystem [`storage`](Self::storage) reports.
    pub fn with_storage_root(mut self, root: impl Into<String>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Sets the deadline for shell queries; `None` waits forever.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the deadline for push and pull; `None` waits forever.
    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// The invoker commands run through.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Listing filters in use.
    pub fn listing_options(&self) -> &ListingOptions {
        &self.options
    }

    /// Whether the adb executable is configured and present.
    pub fn is_bridge_ready(&self) -> bool {
        self.invoker.ready().is_ok()
    }

    /// Serials of USB devices adb reports in the `device` state.
    ///
    /// Unauthorized and offline devices are left out.
    pub fn devices(&self) -> Result<Vec<String>> {
        let output = self.run(None, ["devices", "-l"], self.command_timeout)?;
        let ids = output::parse_devices(&output.stdout);
        debug!("adb reports {} device(s)", ids.len());
        Ok(ids)
    }

    /// Reads identity properties of a device.
    ///
    /// `Ok(None)` when the device answers but does not report both
    /// manufacturer and model.
    pub fn device(&self, id: &str) -> Result<Option<DeviceRecord>> {
        let output = self.shell(id, "getprop".to_string())?;
        let device = output::parse_getprop(id, &output.stdout);
        if device.is_none() {
            warn!(device = id, "getprop did not report manufacturer and model");
        }
        Ok(device)
    }

    /// Returns a copy of `device` with the storage fields filled in.
    ///
    /// The record comes back unchanged when `df` prints no usable row.
    pub fn storage(&self, device: &DeviceRecord) -> Result<DeviceRecord> {
        let id = device.device_id.as_str();
        let output = self.shell(id, format!("df -h {}", shell_quote(&self.storage_root)))?;

        let mut updated = device.clone();
        match output::parse_df(&output.stdout) {
            Some(usage) => usage.apply_to(&mut updated),
            None => warn!(device = id, root = %self.storage_root, "df printed no filesystem row"),
        }
        Ok(updated)
    }

    /// Whether `path` names an existing file or folder, checked with `ls`.
    pub fn exists_file(&self, id: &str, path: &str) -> Result<bool> {
        let output = self.shell(id, format!("ls {}", shell_quote(path)))?;
        Ok(!output::ls_reports_missing(&output.combined(), path))
    }

    /// Whether `path` is a folder the shell can change into.
    pub fn exists(&self, id: &str, path: &str) -> Result<bool> {
        let output = self.shell(id, format!("cd {}", shell_quote(path)))?;
        Ok(output.outcome() != Outcome::PathNotFound)
    }

    /// Lists media files under `path`.
    ///
    /// `sort_by_time` orders newest first within each folder; `recursive`
    /// descends into sub folders. Only files passing the extension and
    /// suffix allow-lists are returned.
    pub fn files(
        &self,
        id: &str,
        path: &str,
        sort_by_time: bool,
        recursive: bool,
    ) -> Result<Vec<FileRecord>> {
        let flags = listing_flags(sort_by_time, recursive);
        let records = self.list(id, path, &flags, &self.options)?;
        info!(device = id, path, "listed {} file(s)", records.len());
        Ok(records)
    }

    /// Names of the media files directly inside `path`, in directory order.
    pub fn filenames(&self, id: &str, path: &str) -> Result<Vec<String>> {
        let records = self.list(id, path, "", &self.options.for_single_folder())?;
        Ok(records.into_iter().map(|record| record.name).collect())
    }

    /// MD5 digest of a device file.
    ///
    /// `Ok(None)` when `md5sum` printed no digest.
    pub fn md5(&self, id: &str, path: &str) -> Result<Option<String>> {
        let output = self.shell(id, format!("md5sum {}", shell_quote(path)))?;
        digest(&output, path, &[path])
    }

    /// MD5 digest of `filename` inside `folder`.
    pub fn md5_in(&self, id: &str, folder: &str, filename: &str) -> Result<Option<String>> {
        let output = self.shell(
            id,
            format!("cd {}; md5sum {}", shell_quote(folder), shell_quote(filename)),
        )?;
        digest(&output, &join_device_path(folder, filename), &[folder, filename])
    }

    /// Copies one device file to the host.
    ///
    /// Returns whether adb confirmed exactly one file pulled from `remote`.
    pub fn pull_file(&self, id: &str, remote: &str, local: impl AsRef<Path>) -> Result<bool> {
        let output = self.transfer(id, "pull", remote, &local.as_ref().to_string_lossy())?;
        let pulled = output::pull_succeeded(&output.combined(), remote);
        if !pulled {
            warn!(device = id, remote, "pull did not confirm the file");
        }
        Ok(pulled)
    }

    /// Copies a device folder to the host and returns adb's summary line.
    pub fn pull_folder(&self, id: &str, remote: &str, local: impl AsRef<Path>) -> Result<String> {
        let output = self.transfer(id, "pull", remote, &local.as_ref().to_string_lossy())?;
        Ok(output.second_to_last_line())
    }

    /// Copies a host file or folder into `remote_folder` and returns adb's
    /// summary line.
    pub fn push(&self, id: &str, local: impl AsRef<Path>, remote_folder: &str) -> Result<String> {
        let output = self.transfer(id, "push", &local.as_ref().to_string_lossy(), remote_folder)?;
        Ok(output.second_to_last_line())
    }

    /// Creates a folder and any missing parents.
    pub fn mkdir(&self, id: &str, path: &str) -> Result<()> {
        let output = self.shell(id, format!("mkdir -p {}", shell_quote(path)))?;
        let text = output.combined();
        if !text.trim().is_empty() {
            warn!(device = id, path, "mkdir: {}", text.trim());
        }
        Ok(())
    }

    /// Names of the folders directly inside `path`.
    pub fn folders(&self, id: &str, path: &str) -> Result<Vec<String>> {
        let output = self.shell(
            id,
            format!("cd {}; find . -type d -maxdepth 1", shell_quote(path)),
        )?;
        if output::reports_missing(&output.combined(), path) {
            return Err(BridgeError::PathNotFound(path.to_string()));
        }
        Ok(output::folder_names(&output.stdout))
    }

    /// Removes a device file. `rm` is silent on success, so any output
    /// counts as failure.
    pub fn delete_file(&self, id: &str, path: &str) -> Result<bool> {
        let output = self.shell(id, format!("rm {}", shell_quote(path)))?;
        let text = output.combined();
        if !text.is_empty() {
            warn!(device = id, path, "rm: {}", text.trim());
        }
        Ok(text.is_empty())
    }

    fn list(
        &self,
        id: &str,
        path: &str,
        flags: &str,
        options: &ListingOptions,
    ) -> Result<Vec<FileRecord>> {
        let dir = shell_quote(path);
        let long = self.shell(id, format!("cd {}; ls -go{}", dir, flags))?;
        if output::reports_missing(&long.combined(), path) {
            return Err(BridgeError::PathNotFound(path.to_string()));
        }

        let plain_command = if flags.is_empty() {
            format!("cd {}; ls", dir)
        } else {
            format!("cd {}; ls -{}", dir, flags)
        };
        let plain = self.shell(id, plain_command)?;
        let reference = FolderNames::parse(&plain.stdout);

        Ok(reconcile(&long.stdout, &reference, path, options)?)
    }

    fn shell(&self, id: &str, command: String) -> Result<CommandOutput> {
        self.run(Some(id), ["shell".to_string(), command], self.command_timeout)
    }

    fn transfer(&self, id: &str, verb: &str, from: &str, to: &str) -> Result<CommandOutput> {
        self.run(Some(id), [verb, from, to], self.transfer_timeout)
    }

    fn run<A, S>(
        &self,
        device: Option<&str>,
        args: A,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invoker.ready()?;

        let mut full: Vec<String> = Vec::new();
        if let Some(id) = device {
            full.push("-s".to_string());
            full.push(id.to_string());
        }
        full.extend(args.into_iter().map(Into::into));

        let output = self.invoker.invoke(&Invocation { args: full, timeout })?;
        trace!(stdout = %output.stdout, stderr = %output.stderr, "adb output");

        if let Some(err) = BridgeError::from_outcome(output.outcome(), device.unwrap_or_default()) {
            error!("{}", err);
            return Err(err);
        }
        Ok(output)
    }
}

/// `ls` flags for the requested order and depth.
fn listing_flags(sort_by_time: bool, recursive: bool) -> String {
    let mut flags = String::new();
    if sort_by_time {
        flags.push('t');
    }
    if recursive {
        flags.push('R');
    }
    flags
}

/// Digest printed by `md5sum`, or `PathNotFound` when the shell reported one
/// of `subjects` missing.
fn digest(output: &CommandOutput, path: &str, subjects: &[&str]) -> Result<Option<String>> {
    let text = output.combined();
    if subjects.iter().any(|subject| output::reports_missing(&text, subject)) {
        return Err(BridgeError::PathNotFound(path.to_string()));
    }
    Ok(output::parse_md5(&output.stdout))
}
