//! Reconciliation of long-format listings with plain name listings.
//!
//! `ls -go` gives size and modification time but prints names the way the
//! device shell chooses to, which mangles some characters. Plain `ls` prints
//! the exact names in the same order, so the two are paired positionally per
//! folder: the n-th entry of a folder in the long listing takes the n-th name
//! of the same folder in the plain listing.
//!
//! Both listings use the `ls -R` section convention:
//!
//! ```text
//! .:
//! -rw-rw---- 1   2048 2024-07-09 10:11 IMG_001.jpg
//! drwxrws--x 2   4096 2024-07-01 08:00 Camera
//!
//! ./Camera:
//! -rw-rw---- 1 101204 2024-07-08 21:40 VID 002.mp4
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{ListingError, Result};
use crate::output::lines;
use crate::recognizer::{ListingOptions, ReferencePolicy};
use crate::records::{join_device_path, DeviceOs, FileRecord};

/// Mapping key of the listing root.
pub const ROOT_KEY: &str = ".";

/// Columns before the name in `ls -go`: mode, links, size, date, time.
const LEADING_COLUMNS: usize = 5;

/// Authoritative names per folder, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNames {
    folders: BTreeMap<String, Vec<String>>,
}

impl FolderNames {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses plain `ls` or `ls -R` output.
    ///
    /// Names before any section header belong to the root.
    pub fn parse(text: &str) -> Self {
        let mut names = Self::new();
        let mut folder = String::new();

        for line in lines(text) {
            if line.is_empty() {
                continue;
            }
            if let Some(header) = section_header(line) {
                folder = header;
                continue;
            }
            names
                .folders
                .entry(folder_key(&folder).to_string())
                .or_default()
                .push(line.to_string());
        }

        names
    }

    /// Appends a name to a folder (`.` or empty for the root).
    pub fn push(&mut self, folder: &str, name: impl Into<String>) {
        self.folders
            .entry(folder_key(folder).to_string())
            .or_default()
            .push(name.into());
    }

    /// Names recorded for a folder key.
    pub fn get(&self, folder: &str) -> Option<&[String]> {
        self.folders.get(folder_key(folder)).map(Vec::as_slice)
    }

    /// Number of folders in the mapping.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether the mapping holds no folder.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

fn folder_key(folder: &str) -> &str {
    if folder.is_empty() {
        ROOT_KEY
    } else {
        folder
    }
}

/// Recognises `.:` (root, returned as empty) and `./<rel>:` headers.
fn section_header(line: &str) -> Option<String> {
    if line == ".:" {
        return Some(String::new());
    }
    line.strip_prefix("./")
        .and_then(|rest| rest.strip_suffix(':'))
        .map(str::to_string)
}

/// A long-format line recognised as a directory entry.
///
/// `size` and `modified` are `None` when the columns do not parse, as for
/// device nodes whose size column holds `major, minor`.
#[derive(Debug)]
struct EntryLine<'a> {
    mode: &'a str,
    size: Option<u64>,
    modified: Option<NaiveDateTime>,
    displayed: &'a str,
}

impl EntryLine<'_> {
    fn is_regular_file(&self) -> bool {
        self.mode.starts_with('-')
    }
}

/// Lines of one folder section.
#[derive(Debug)]
struct Section<'a> {
    folder: String,
    entries: Vec<EntryLine<'a>>,
}

/// Splits off `count` whitespace separated columns and returns the remainder.
fn split_columns(line: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut columns = Vec::with_capacity(count);
    let mut rest = line.trim_start();
    while columns.len() < count {
        let end = rest.find(char::is_whitespace)?;
        columns.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if rest.is_empty() {
        None
    } else {
        Some((columns, rest))
    }
}

fn looks_like_mode(column: &str) -> bool {
    column.len() >= 10 && column.starts_with(['-', 'd', 'l', 'c', 'b', 'p', 's'])
}

/// Parses one long-format line. Any line starting with a mode column is an
/// entry, so it takes a reference name even if its other columns are odd.
fn parse_entry(line: &str, os: DeviceOs) -> Option<EntryLine<'_>> {
    let (columns, displayed) = split_columns(line, LEADING_COLUMNS)?;
    if !looks_like_mode(columns[0]) {
        return None;
    }
    Some(EntryLine {
        mode: columns[0],
        size: columns[2].parse().ok(),
        modified: os
            .parse_timestamp(&format!("{} {}", columns[3], columns[4]))
            .ok(),
        displayed,
    })
}

fn parse_sections(text: &str, os: DeviceOs) -> Vec<Section<'_>> {
    let mut sections = vec![Section {
        folder: String::new(),
        entries: Vec::new(),
    }];

    for line in lines(text) {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(folder) = section_header(line) {
            sections.push(Section {
                folder,
                entries: Vec::new(),
            });
            continue;
        }
        if let Some(entry) = parse_entry(line, os) {
            if let Some(section) = sections.last_mut() {
                section.entries.push(entry);
            }
        }
    }

    sections.retain(|s| !s.entries.is_empty());
    sections
}

/// Fails when any folder's entry count differs from its reference count.
fn verify_counts(sections: &[Section<'_>], reference: &FolderNames) -> Result<()> {
    let mut found: BTreeMap<&str, usize> = BTreeMap::new();
    for section in sections {
        *found.entry(folder_key(&section.folder)).or_default() += section.entries.len();
    }

    for (folder, count) in &found {
        let expected = reference.get(folder).map_or(0, <[String]>::len);
        if expected != *count {
            return Err(ListingError::ReconciliationMismatch {
                folder: folder.to_string(),
                expected,
                found: *count,
            });
        }
    }

    for (folder, names) in &reference.folders {
        if !found.contains_key(folder.as_str()) && !names.is_empty() {
            return Err(ListingError::ReconciliationMismatch {
                folder: folder.clone(),
                expected: names.len(),
                found: 0,
            });
        }
    }

    Ok(())
}

/// Turns a long-format listing into file records.
///
/// `base_path` is the device folder the listing was taken in; it prefixes
/// each record's parent path. Every entry line advances its folder's name
/// cursor. Non-regular entries, entries whose size or timestamp do not
/// parse, excluded names and names failing both allow-lists are then
/// skipped.
pub fn reconcile(
    long_listing: &str,
    reference: &FolderNames,
    base_path: &str,
    options: &ListingOptions,
) -> Result<Vec<FileRecord>> {
    let sections = parse_sections(long_listing, options.device_os);

    if options.reference_policy == ReferencePolicy::Strict {
        verify_counts(&sections, reference)?;
    }

    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut records = Vec::new();

    for section in &sections {
        let key = folder_key(&section.folder);
        let names = reference.get(key);
        if names.is_none() {
            warn!(folder = key, "no reference names for folder, using displayed names");
        }
        let parent = join_device_path(base_path, &section.folder);

        for entry in &section.entries {
            let cursor = cursors.entry(key).or_insert(0);
            let reference_name = names.and_then(|n| n.get(*cursor));
            *cursor += 1;

            let name = match (reference_name, options.reference_policy) {
                (Some(name), _) => name.as_str(),
                (None, ReferencePolicy::DropUnmatched) => {
                    warn!(
                        folder = key,
                        displayed = entry.displayed,
                        "dropping entry without reference name"
                    );
                    continue;
                }
                (None, _) => {
                    if names.is_some() {
                        warn!(
                            folder = key,
                            displayed = entry.displayed,
                            "reference names exhausted"
                        );
                    }
                    entry.displayed
                }
            };

            if !entry.is_regular_file() || options.is_excluded(name) {
                continue;
            }
            let Some(kind) = options.classify(name) else {
                continue;
            };
            let (Some(size), Some(modified)) = (entry.size, entry.modified) else {
                debug!(folder = key, name, "skipping entry with unreadable size or time");
                continue;
            };

            records.push(FileRecord {
                name: name.to_string(),
                folder: section.folder.clone(),
                parent: parent.clone(),
                size,
                modified,
                kind,
            });
        }
    }

    debug!(count = records.len(), base_path, "reconciled listing");
    Ok(records)
}
