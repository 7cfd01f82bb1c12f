//! Record types produced from adb output.
//!
//! These are plain values: the caller owns them and nothing keeps a handle
//! back to the device they were read from.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ListingError, Result};

/// Kind of device behind an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Android device reached through adb.
    Android,
    /// Placeholder for records that could not be identified.
    #[default]
    Unknown,
}

/// Identity, metadata and storage statistics of one connected device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceRecord {
    /// Device type tag.
    pub device_type: DeviceType,
    /// Identifier assigned by adb (serial number or transport name).
    pub device_id: String,
    /// Value of `ro.product.manufacturer`.
    pub manufacture: String,
    /// Value of `ro.product.model`.
    pub model: String,
    /// Marketing name; empty when the device does not report one.
    pub name: String,
    /// SIM ICCID, empty when unknown.
    pub iccid: String,
    /// Hardware MEID, upper-cased, empty when unknown.
    pub meid: String,
    /// Total size of the storage root, as printed by `df -h`.
    pub total_size: Option<String>,
    /// Available size of the storage root, as printed by `df -h`.
    pub avail_size: Option<String>,
    /// Used percentage of the storage root, e.g. `42%`.
    pub used_percent: Option<String>,
}

impl DeviceRecord {
    /// Creates a record for an Android device with the mandatory fields set.
    pub fn android(
        device_id: impl Into<String>,
        manufacture: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            device_type: DeviceType::Android,
            device_id: device_id.into(),
            manufacture: manufacture.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Returns true once the storage query has filled in any size field.
    pub fn has_storage(&self) -> bool {
        self.total_size.is_some() || self.avail_size.is_some() || self.used_percent.is_some()
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.device_id, self.manufacture, self.model)?;
        if !self.name.is_empty() {
            write!(f, " ({})", self.name)?;
        }
        if let (Some(total), Some(avail)) = (&self.total_size, &self.avail_size) {
            write!(f, " [{} free of {}", avail, total)?;
            if let Some(used) = &self.used_percent {
                write!(f, ", {} used", used)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Inferred type of a listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Audio recording.
    Audio,
    /// Extension-less derivative accepted by suffix (e.g. chat thumbnails).
    Derivative,
}

/// One file discovered under a queried device path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name, as given by the plain listing when available.
    pub name: String,
    /// Folder relative to the queried path; empty for the path itself.
    pub folder: String,
    /// Device path of the containing folder.
    pub parent: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, device local time.
    pub modified: NaiveDateTime,
    /// Inferred type.
    pub kind: FileKind,
}

impl FileRecord {
    /// Full device path of the file.
    pub fn path(&self) -> String {
        join_device_path(&self.parent, &self.name)
    }
}

/// Operating system of the device, selecting listing format details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceOs {
    /// Android toybox `ls`.
    #[default]
    Android,
}

impl DeviceOs {
    /// chrono format of the date and time columns of `ls -go`.
    pub fn timestamp_format(&self) -> &'static str {
        match self {
            DeviceOs::Android => "%Y-%m-%d %H:%M",
        }
    }

    /// Parses the joined date and time columns of a long-format line.
    pub fn parse_timestamp(&self, value: &str) -> Result<NaiveDateTime> {
        let format = self.timestamp_format();
        NaiveDateTime::parse_from_str(value, format).map_err(|_| ListingError::InvalidTimestamp {
            value: value.to_string(),
            format,
        })
    }
}

/// Joins a device path and a relative component with a single `/`.
///
/// An empty relative component returns the base unchanged.
pub fn join_device_path(base: &str, relative: &str) -> String {
    let base = if base.len() > 1 { base.trim_end_matches('/') } else { base };
    let relative = relative.trim_start_matches("./").trim_matches('/');
    if relative.is_empty() || relative == "." {
        return base.to_string();
    }
    if base.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 9)
            .unwrap()
            .and_hms_opt(10, 11, 0)
            .unwrap()
    }

    #[test]
    fn test_android_record_defaults() {
        let device = DeviceRecord::android("ABC123", "Acme", "X100");
        assert_eq!(device.device_type, DeviceType::Android);
        assert_eq!(device.name, "");
        assert!(device.total_size.is_none());
        assert!(!device.has_storage());
    }

    #[test]
    fn test_device_display() {
        let mut device = DeviceRecord::android("ABC123", "Acme", "X100");
        assert_eq!(device.to_string(), "ABC123 Acme X100");

        device.name = "Acme One".to_string();
        device.total_size = Some("110G".to_string());
        device.avail_size = Some("64G".to_string());
        device.used_percent = Some("42%".to_string());
        assert_eq!(
            device.to_string(),
            "ABC123 Acme X100 (Acme One) [64G free of 110G, 42% used]"
        );
        assert!(device.has_storage());
    }

    #[test]
    fn test_file_record_path() {
        let record = FileRecord {
            name: "IMG 001.jpg".to_string(),
            folder: "Camera".to_string(),
            parent: "/sdcard/DCIM/Camera".to_string(),
            size: 2048,
            modified: sample_time(),
            kind: FileKind::Image,
        };
        assert_eq!(record.path(), "/sdcard/DCIM/Camera/IMG 001.jpg");
    }

    #[test]
    fn test_join_device_path() {
        assert_eq!(join_device_path("/sdcard", "DCIM"), "/sdcard/DCIM");
        assert_eq!(join_device_path("/sdcard/", "DCIM/Camera"), "/sdcard/DCIM/Camera");
        assert_eq!(join_device_path("/sdcard", ""), "/sdcard");
        assert_eq!(join_device_path("/sdcard", "."), "/sdcard");
        assert_eq!(join_device_path("/sdcard", "./Pictures"), "/sdcard/Pictures");
        assert_eq!(join_device_path("", "Pictures"), "Pictures");
        assert_eq!(join_device_path("/sdcard/", ""), "/sdcard");
        assert_eq!(join_device_path("/", "DCIM"), "/DCIM");
        assert_eq!(join_device_path("/", ""), "/");
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = DeviceOs::Android.parse_timestamp("2024-07-09 10:11").unwrap();
        assert_eq!(parsed, sample_time());
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        let result = DeviceOs::Android.parse_timestamp("Jul 9 10:11");
        assert!(matches!(result, Err(ListingError::InvalidTimestamp { .. })));
    }

    #[test]
    fn test_file_kind_serializes_lowercase() {
        let json = serde_json::to_string(&FileKind::Derivative).unwrap();
        assert_eq!(json, "\"derivative\"");
    }
}
