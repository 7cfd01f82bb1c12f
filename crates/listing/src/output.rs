//! Classification and scraping of adb's textual output.
//!
//! Every literal adb message this workspace reacts to is matched in this
//! module, so a wording change in a new adb release is fixed in one place.

use serde::{Deserialize, Serialize};

use crate::records::DeviceRecord;

/// Printed by adb when the server cannot be started.
pub const DAEMON_START_FAILED: &str = "* failed to start daemon";
/// Printed by adb when the server is unreachable.
pub const DAEMON_CONNECT_FAILED: &str = "error: cannot connect to daemon";
/// Prefix of adb's unknown-serial message (`error: device 'X' not found`).
pub const DEVICE_ERROR_PREFIX: &str = "error: device";
/// Printed when no device is attached at all.
pub const NO_DEVICES: &str = "error: no devices";
/// Shell utilities' missing path message.
pub const NO_SUCH_FILE: &str = "No such file or directory";

/// Closed set of shapes a captured adb output can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// No failure marker found.
    Success,
    /// The serial is unknown to adb or no device is attached.
    DeviceNotFound,
    /// The adb server could not be started or reached.
    DaemonUnavailable,
    /// A path argument does not exist on the device.
    PathNotFound,
    /// An `error:` line adb printed that has no dedicated variant.
    Unrecognized(String),
}

impl Outcome {
    /// Whether the output carried no failure marker.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Maps captured output to an [`Outcome`].
///
/// Daemon failures are checked first since adb prints them ahead of any
/// per-device message.
pub fn classify(text: &str) -> Outcome {
    if text.contains(DAEMON_START_FAILED) || text.contains(DAEMON_CONNECT_FAILED) {
        return Outcome::DaemonUnavailable;
    }

    let trimmed = text.trim_start();
    if trimmed.starts_with(DEVICE_ERROR_PREFIX) || trimmed.starts_with(NO_DEVICES) {
        return Outcome::DeviceNotFound;
    }

    for line in lines(text) {
        if line.starts_with("error:") && line.contains("not found") {
            return Outcome::DeviceNotFound;
        }
    }

    if text.contains(NO_SUCH_FILE) {
        return Outcome::PathNotFound;
    }

    if let Some(line) = lines(text).find(|l| l.starts_with("error:")) {
        return Outcome::Unrecognized(line.to_string());
    }

    Outcome::Success
}

/// Iterates lines with any trailing carriage return removed.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|l| l.trim_end_matches('\r'))
}

/// Extracts serials of USB devices in the `device` state from `adb devices -l`.
///
/// Devices in other states (`unauthorized`, `offline`) are skipped.
pub fn parse_devices(text: &str) -> Vec<String> {
    lines(text)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let id = fields.next()?;
            let state = fields.next()?;
            let transport = fields.next()?;
            (state == "device" && transport.starts_with("usb")).then(|| id.to_string())
        })
        .collect()
}

/// Value of a `[key]: [value]` getprop line, brackets removed.
fn getprop_value<'a>(line: &'a str, key: &str) -> Option<String> {
    let rest = line.strip_prefix('[')?.strip_prefix(key)?.strip_prefix("]:")?;
    let parts: Vec<&'a str> = line.split(": ").collect();
    if parts.len() != 2 || rest.trim().is_empty() {
        return None;
    }
    Some(parts[1].replace(['[', ']'], ""))
}

/// Builds a device record from `getprop` output.
///
/// Returns `None` unless both manufacturer and model are present.
pub fn parse_getprop(device_id: &str, text: &str) -> Option<DeviceRecord> {
    let mut manufacture = String::new();
    let mut model = String::new();
    let mut name = String::new();
    let mut iccid = String::new();
    let mut meid = String::new();

    for line in lines(text) {
        if let Some(v) = getprop_value(line, "ro.product.manufacturer") {
            manufacture = v;
        } else if let Some(v) = getprop_value(line, "ro.product.model") {
            model = v;
        } else if let Some(v) = getprop_value(line, "ro.config.marketing_name") {
            name = v.replace('_', " ");
        } else if let Some(v) = getprop_value(line, "persist.radio.sim.iccid") {
            iccid = v;
        } else if let Some(v) = getprop_value(line, "persist.radio.via_m") {
            meid = v.to_uppercase();
        }
    }

    if manufacture.is_empty() || model.is_empty() {
        return None;
    }

    let mut device = DeviceRecord::android(device_id, manufacture, model);
    device.name = name;
    device.iccid = iccid;
    device.meid = meid;
    Some(device)
}

/// Size columns of one `df -h` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUsage {
    /// `Size` column.
    pub total: String,
    /// `Avail` column.
    pub avail: String,
    /// `Use%` column.
    pub used_percent: String,
}

impl StorageUsage {
    /// Copies the sizes onto a device record.
    pub fn apply_to(&self, device: &mut DeviceRecord) {
        device.total_size = Some(self.total.clone());
        device.avail_size = Some(self.avail.clone());
        device.used_percent = Some(self.used_percent.clone());
    }
}

/// Reads the first filesystem row (starting with `/`) of `df -h`.
pub fn parse_df(text: &str) -> Option<StorageUsage> {
    lines(text).filter(|l| l.starts_with('/')).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return None;
        }
        Some(StorageUsage {
            total: fields[1].to_string(),
            avail: fields[3].to_string(),
            used_percent: fields[4].to_string(),
        })
    })
}

/// Digest printed by `md5sum`: the first token, if it looks like hex.
pub fn parse_md5(text: &str) -> Option<String> {
    let mut fields = text.split_whitespace();
    let digest = fields.next()?;
    fields.next()?;
    if digest.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(digest.to_string())
    } else {
        None
    }
}

/// Second-to-last line of the output, where adb prints its transfer summary.
///
/// Carriage-return progress updates inside that line are dropped.
pub fn second_to_last_line(text: &str) -> &str {
    let all: Vec<&str> = text.split('\n').collect();
    if all.len() < 2 {
        return "";
    }
    let line = all[all.len() - 2].trim_end_matches('\r');
    line.rsplit('\r').next().unwrap_or(line)
}

/// Whether `adb pull` reported exactly one file pulled from `remote`.
pub fn pull_succeeded(text: &str, remote: &str) -> bool {
    second_to_last_line(text).contains(&format!("{}: 1 file pulled.", remote))
}

/// Whether `ls <path>` reported the path as missing.
pub fn ls_reports_missing(text: &str, path: &str) -> bool {
    text.starts_with(&format!("ls: {}: {}", path, NO_SUCH_FILE))
}

/// Whether a shell utility reported `subject` itself as missing.
///
/// Diagnostics about other paths, such as an entry that vanished while a
/// recursive listing ran, do not count.
pub fn reports_missing(text: &str, subject: &str) -> bool {
    lines(text).any(|line| {
        line.strip_suffix(NO_SUCH_FILE)
            .and_then(|head| head.strip_suffix(": "))
            .and_then(|head| head.strip_suffix(subject))
            .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with(' '))
    })
}

/// Sub folder names from `find . -type d` output.
///
/// `./a/b` becomes `a/b`; the root `.` and anything not starting with `./`
/// (such as `find:` diagnostics) is skipped.
pub fn folder_names(text: &str) -> Vec<String> {
    lines(text)
        .filter_map(|line| line.strip_prefix("./"))
        .map(|name| name.trim_end_matches('/'))
        .filter(|name| !name.is_empty() && *name != ".")
        .map(str::to_string)
        .collect()
}
