//! File type recognition and listing filter options.

use serde::{Deserialize, Serialize};

use crate::records::{DeviceOs, FileKind};

/// Default image extensions, lower-case without the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "dng", "tif", "tiff",
];

/// Default video extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "mkv", "avi", "webm", "mts"];

/// Default audio extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "amr", "wav", "ogg", "flac", "opus"];

/// Suffixes of extension-less files worth keeping (chat room image/video thumbnails).
pub const DERIVATIVE_SUFFIXES: &[&str] = &["_backup_hd"];

/// Names that show up in `ls` output but never denote a file.
///
/// `killing...` and `successfully` come from the adb daemon restart banner.
pub const NOISE_NAMES: &[&str] = &["directory", "killing...", "successfully"];

/// Exclusions used for single-folder listings.
pub const DOT_NAMES: &[&str] = &["directory", ".", ".."];

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Classifies file names by extension against allow-lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTypeRecognizer {
    /// Image extensions.
    pub image_extensions: Vec<String>,
    /// Video extensions.
    pub video_extensions: Vec<String>,
    /// Audio extensions.
    pub audio_extensions: Vec<String>,
}

impl Default for FileTypeRecognizer {
    fn default() -> Self {
        Self {
            image_extensions: owned(IMAGE_EXTENSIONS),
            video_extensions: owned(VIDEO_EXTENSIONS),
            audio_extensions: owned(AUDIO_EXTENSIONS),
        }
    }
}

impl FileTypeRecognizer {
    /// Returns the kind for a name whose extension is allowed.
    ///
    /// Matching ignores case; a leading dot alone (`.nomedia`) is not an
    /// extension.
    pub fn recognize(&self, name: &str) -> Option<FileKind> {
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        let ext = ext.to_ascii_lowercase();
        let contains = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(&ext));

        if contains(&self.image_extensions) {
            Some(FileKind::Image)
        } else if contains(&self.video_extensions) {
            Some(FileKind::Video)
        } else if contains(&self.audio_extensions) {
            Some(FileKind::Audio)
        } else {
            None
        }
    }
}

/// What the reconciler does when the plain listing cannot name an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Fall back to the name shown by the long-format listing.
    #[default]
    Lenient,
    /// Require matching entry counts per folder, otherwise fail.
    Strict,
    /// Drop entries that have no reference name.
    DropUnmatched,
}

/// Filters and format options applied while reconciling a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOptions {
    /// Names rejected outright.
    pub excluded_names: Vec<String>,
    /// Extension allow-lists.
    pub recognizer: FileTypeRecognizer,
    /// Suffix allow-list for extension-less derivatives.
    pub allowed_suffixes: Vec<String>,
    /// Device OS, selecting the timestamp format.
    pub device_os: DeviceOs,
    /// Handling of entries the plain listing cannot name.
    pub reference_policy: ReferencePolicy,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            excluded_names: owned(NOISE_NAMES),
            recognizer: FileTypeRecognizer::default(),
            allowed_suffixes: owned(DERIVATIVE_SUFFIXES),
            device_os: DeviceOs::Android,
            reference_policy: ReferencePolicy::Lenient,
        }
    }
}

impl ListingOptions {
    /// Same options with the exclusions used for a single folder.
    pub fn for_single_folder(&self) -> Self {
        Self {
            excluded_names: owned(DOT_NAMES),
            ..self.clone()
        }
    }

    /// Whether the name is in the exclusion set.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_names.iter().any(|n| n == name)
    }

    /// Classifies a name by extension, then by suffix.
    ///
    /// `None` means the file is filtered out.
    pub fn classify(&self, name: &str) -> Option<FileKind> {
        if let Some(kind) = self.recognizer.recognize(name) {
            return Some(kind);
        }
        if self
            .allowed_suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
        {
            return Some(FileKind::Derivative);
        }
        None
    }
}
