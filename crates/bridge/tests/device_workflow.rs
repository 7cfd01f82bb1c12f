//! Integration tests for device operations against a scripted adb.
//!
//! These tests verify complete flows through the public API:
//! - Device discovery and identity
//! - Recursive listing reconciliation
//! - Reference policies
//! - Transfers and file management

use std::collections::HashMap;
use std::sync::Mutex;

use bridge::{
    Android, BridgeError, CommandOutput, FileKind, Invocation, Invoker, ListingOptions,
    ReferencePolicy,
};

/// adb stand-in answering full command lines from a script.
///
/// Unscripted command lines get empty output, as a silent shell command
/// would.
#[derive(Default)]
struct ScriptedAdb {
    script: HashMap<String, CommandOutput>,
    log: Mutex<Vec<String>>,
}

impl ScriptedAdb {
    fn on(mut self, command_line: &str, stdout: &str) -> Self {
        self.script
            .insert(command_line.to_string(), CommandOutput::from_stdout(stdout));
        self
    }

    fn on_error(mut self, command_line: &str, stderr: &str) -> Self {
        self.script.insert(
            command_line.to_string(),
            CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                status: Some(1),
            },
        );
        self
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Invoker for ScriptedAdb {
    fn ready(&self) -> bridge::Result<()> {
        Ok(())
    }

    fn invoke(&self, invocation: &Invocation) -> bridge::Result<CommandOutput> {
        let line = invocation.args.join(" ");
        self.log.lock().unwrap().push(line.clone());
        Ok(self.script.get(&line).cloned().unwrap_or_default())
    }
}

const DEVICES: &str = "List of devices attached\n\
    ABC123         device usb:1-1 product:foo model:X100 device:foo transport_id:1\n\
    DEF456         unauthorized usb:1-2 transport_id:2\n\
    emulator-5554  device product:sdk_gphone model:sdk transport_id:3\n\n";

const GETPROP: &str = "[ro.build.type]: [user]\n\
    [ro.config.marketing_name]: [Acme_One]\n\
    [ro.product.manufacturer]: [Acme]\n\
    [ro.product.model]: [X100]\n";

const DF: &str = "Filesystem     Size  Used Avail Use% Mounted on\n\
    /dev/fuse      110G   46G   64G  42% /storage/emulated\n";

const LONG_RECURSIVE: &str = ".:\n\
    total 16\n\
    drwxrwx--x 3   4096 2024-07-09 10:30 Camera\n\
    -rw-rw---- 1   2048 2024-07-09 10:11 IMG?001.jpg\n\
    -rw-rw---- 1     12 2024-07-09 09:00 notes.txt\n\
    \n\
    ./Camera:\n\
    total 8\n\
    -rw-rw---- 1 101204 2024-07-08 21:40 VID 002.mp4\n\
    -rw-rw---- 1    333 2024-07-08 21:41 chat_backup_hd\n";

const PLAIN_RECURSIVE: &str = ".:\n\
    Camera\n\
    IMG 001.jpg\n\
    notes.txt\n\
    \n\
    ./Camera:\n\
    VID 002.mp4\n\
    chat_backup_hd\n";

const LONG_CMD: &str = "-s ABC123 shell cd '/sdcard/DCIM'; ls -gotR";
const PLAIN_CMD: &str = "-s ABC123 shell cd '/sdcard/DCIM'; ls -tR";

fn phone() -> ScriptedAdb {
    ScriptedAdb::default()
        .on("devices -l", DEVICES)
        .on("-s ABC123 shell getprop", GETPROP)
        .on("-s ABC123 shell df -h '/storage/emulated'", DF)
        .on(LONG_CMD, LONG_RECURSIVE)
        .on(PLAIN_CMD, PLAIN_RECURSIVE)
}

// =============================================================================
// Device Discovery Tests
// =============================================================================

#[test]
fn test_discover_and_describe_device() {
    let adb = Android::with_invoker(phone());

    let ids = adb.devices().unwrap();
    assert_eq!(ids, vec!["ABC123"]);

    let device = adb.device(&ids[0]).unwrap().unwrap();
    assert_eq!(device.name, "Acme One");
    assert!(!device.has_storage());

    let device = adb.storage(&device).unwrap();
    assert_eq!(
        device.to_string(),
        "ABC123 Acme X100 (Acme One) [64G free of 110G, 42% used]"
    );
}

#[test]
fn test_unknown_serial() {
    let adb = Android::with_invoker(
        ScriptedAdb::default()
            .on_error("-s NOPE shell getprop", "error: device 'NOPE' not found\n"),
    );
    let err = adb.device("NOPE").unwrap_err();
    assert!(matches!(err, BridgeError::DeviceNotFound(ref id) if id == "NOPE"));
    assert_eq!(err.to_string(), "device not found: NOPE");
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_recursive_listing() {
    let adb = Android::with_invoker(phone());
    let records = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap();

    let paths: Vec<String> = records.iter().map(|r| r.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/sdcard/DCIM/IMG 001.jpg",
            "/sdcard/DCIM/Camera/VID 002.mp4",
            "/sdcard/DCIM/Camera/chat_backup_hd",
        ]
    );

    assert_eq!(records[0].folder, "");
    assert_eq!(records[1].folder, "Camera");
    assert_eq!(records[1].parent, "/sdcard/DCIM/Camera");
    assert_eq!(records[1].size, 101_204);
    assert_eq!(records[1].kind, FileKind::Video);
    assert_eq!(records[2].kind, FileKind::Derivative);
    assert_eq!(records[1].modified.to_string(), "2024-07-08 21:40:00");

    assert_eq!(adb.invoker().log(), vec![LONG_CMD, PLAIN_CMD]);
}

#[test]
fn test_listing_is_deterministic() {
    let adb = Android::with_invoker(phone());
    let first = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap();
    let second = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_lenient_listing_without_reference_folder() {
    let adb = Android::with_invoker(phone().on(PLAIN_CMD, ".:\nCamera\nIMG 001.jpg\nnotes.txt\n"));
    let records = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["IMG 001.jpg", "VID 002.mp4", "chat_backup_hd"]);
}

#[test]
fn test_drop_unmatched_listing() {
    let options = ListingOptions {
        reference_policy: ReferencePolicy::DropUnmatched,
        ..ListingOptions::default()
    };
    let adb = Android::with_invoker(phone().on(PLAIN_CMD, ".:\nCamera\nIMG 001.jpg\nnotes.txt\n"))
        .with_listing_options(options);
    let records = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "IMG 001.jpg");
}

#[test]
fn test_strict_listing_rejects_short_reference() {
    let options = ListingOptions {
        reference_policy: ReferencePolicy::Strict,
        ..ListingOptions::default()
    };
    let adb = Android::with_invoker(phone().on(PLAIN_CMD, ".:\nCamera\nIMG 001.jpg\nnotes.txt\n"))
        .with_listing_options(options.clone());
    let err = adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap_err();
    assert!(matches!(err, BridgeError::Listing(_)));

    let adb = Android::with_invoker(phone()).with_listing_options(options);
    assert_eq!(adb.files("ABC123", "/sdcard/DCIM", true, true).unwrap().len(), 3);
}

#[test]
fn test_listing_missing_folder() {
    let adb = Android::with_invoker(ScriptedAdb::default().on_error(
        "-s ABC123 shell cd '/sdcard/Nope'; ls -gotR",
        "/system/bin/sh: cd: /sdcard/Nope: No such file or directory\n",
    ));
    assert!(matches!(
        adb.files("ABC123", "/sdcard/Nope", true, true),
        Err(BridgeError::PathNotFound(_))
    ));
}

#[test]
fn test_path_with_single_quote() {
    let adb = Android::with_invoker(ScriptedAdb::default());
    assert!(adb.files("ABC123", "/sdcard/Bob's", false, false).unwrap().is_empty());
    assert_eq!(
        adb.invoker().log(),
        vec![
            r"-s ABC123 shell cd '/sdcard/Bob'\''s'; ls -go",
            r"-s ABC123 shell cd '/sdcard/Bob'\''s'; ls",
        ]
    );
}

// =============================================================================
// File Management Tests
// =============================================================================

#[test]
fn test_pull_then_delete() {
    let adb = Android::with_invoker(
        phone()
            .on(
                "-s ABC123 pull /sdcard/DCIM/IMG 001.jpg /tmp/out",
                "/sdcard/DCIM/IMG 001.jpg: 1 file pulled.\n",
            )
            .on_error(
                "-s ABC123 shell rm '/sdcard/DCIM/gone.jpg'",
                "rm: /sdcard/DCIM/gone.jpg: No such file or directory\n",
            ),
    );

    assert!(adb.pull_file("ABC123", "/sdcard/DCIM/IMG 001.jpg", "/tmp/out").unwrap());
    assert!(adb.delete_file("ABC123", "/sdcard/DCIM/IMG 001.jpg").unwrap());
    assert!(!adb.delete_file("ABC123", "/sdcard/DCIM/gone.jpg").unwrap());
}

#[test]
fn test_folders_and_existence() {
    let adb = Android::with_invoker(
        ScriptedAdb::default()
            .on(
                "-s ABC123 shell cd '/sdcard'; find . -type d -maxdepth 1",
                ".\n./DCIM\n./Pictures\nfind: ./Android/obb: Permission denied\n",
            )
            .on_error(
                "-s ABC123 shell cd '/sdcard/Nope'",
                "/system/bin/sh: cd: /sdcard/Nope: No such file or directory\n",
            ),
    );

    assert_eq!(adb.folders("ABC123", "/sdcard").unwrap(), vec!["DCIM", "Pictures"]);
    assert!(adb.exists("ABC123", "/sdcard").unwrap());
    assert!(!adb.exists("ABC123", "/sdcard/Nope").unwrap());
}
