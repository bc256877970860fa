// Black-box tests for the catalog (-t), raw (-r), and dump (-d) operations
// and the usage surface, driving the built binary over synthetic tapes.

mod common;

use common::{dc, label, run_in, tape_of_records};
use tempfile::TempDir;

use cdctap::simtap::TapeWriter;

/// An end-of-record-only block: six trailer bytes describing zero words.
const EMPTY_RECORD_BLOCK: [u8; 6] = [0x00, 0x40, 0x00, 0x00, 0x00, 0x00];

#[test]
fn catalog_of_labeled_tape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("labeled.tap");

    let mut w = TapeWriter::create(&path).unwrap();
    w.write_block(&label("VOL1", "SERIAL")).unwrap();
    w.write_block(&label("HDR1", "FILEID")).unwrap();
    w.write_mark().unwrap();
    w.write_block(&EMPTY_RECORD_BLOCK).unwrap();
    w.write_mark().unwrap();
    w.write_block(&label("EOF1", "FILEID")).unwrap();
    w.write_mark().unwrap();
    w.finish().unwrap(); // closing mark ends the volume

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-t"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Catalog of SERIAL"), "stdout: {:?}", stdout);
    assert!(stdout.contains("Catalog of FILEID"), "stdout: {:?}", stdout);
    assert!(stdout.contains("  --mark--"), "stdout: {:?}", stdout);
    assert!(stdout.contains("(00)"), "stdout: {:?}", stdout);
}

fn ucf_record() -> Vec<u8> {
    // Bare 7700 header (length 0) followed by the name word.
    let mut rec = vec![0u8; 20];
    rec[0] = 0o77;
    let name = dc("SAMPLE");
    rec[10..10 + name.len()].copy_from_slice(&name);
    rec
}

fn text_record(name: &str) -> Vec<u8> {
    let mut rec = vec![0u8; 20];
    let coded = dc(name);
    rec[..coded.len()].copy_from_slice(&coded);
    rec
}

#[test]
fn catalog_reports_ucf() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ucf.tap");
    tape_of_records(&path, &[ucf_record()]);

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-t", "-v"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("SAMPLE"), "stdout: {:?}", stdout);
    assert!(stdout.contains("UCF"), "stdout: {:?}", stdout);
}

#[test]
fn extract_declines_ucf() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ucf.tap");
    tape_of_records(&path, &[ucf_record()]);

    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "SAMPLE"]);
    assert_eq!(code, 2);
    assert!(
        stderr.contains("UCF/SAMPLE: not extracting"),
        "stderr: {:?}",
        stderr
    );
}

#[test]
fn dump_declines_non_pfdump_with_exit_2() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("text.tap");
    tape_of_records(&path, &[text_record("FOO")]);

    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-d", "FOO"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("Not dumping TEXT/FOO"), "stderr: {:?}", stderr);
}

#[test]
fn dump_missing_name_exits_3() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("text.tap");
    tape_of_records(&path, &[text_record("FOO")]);

    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-d", "BAR"]);
    assert_eq!(code, 3);
    assert!(stderr.contains("BAR not found"), "stderr: {:?}", stderr);
}

#[test]
fn extract_missing_name_exits_2() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("text.tap");
    tape_of_records(&path, &[text_record("FOO")]);

    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "BAR"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("BAR not found"), "stderr: {:?}", stderr);
}

#[test]
fn catalog_elides_user_library_members_without_l() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ulib.tap");

    let mut ulib = vec![0u8; 20];
    ulib[0] = 0o76; // 7600 header
    let member = text_record("MEM");
    let mut opld = vec![0u8; 20];
    opld[0] = 0o70; // 7000 directory closes the library
    let after = text_record("AFTER");
    tape_of_records(&path, &[ulib, member, opld, after]);

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-t"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("ULIB"), "stdout: {:?}", stdout);
    assert!(!stdout.contains("MEM"), "members must be elided: {:?}", stdout);
    assert!(stdout.contains("AFTER"), "stdout: {:?}", stdout);

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-t", "-l"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("MEM"), "-l must list members: {:?}", stdout);
    assert!(stdout.contains("OPLD"), "stdout: {:?}", stdout);
}

#[test]
fn raw_dump_shows_lengths_labels_and_marks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raw.tap");
    let mut w = TapeWriter::create(&path).unwrap();
    w.write_block(&label("VOL1", "SERIAL")).unwrap();
    w.write_mark().unwrap();
    w.write_block(&EMPTY_RECORD_BLOCK).unwrap();
    w.finish().unwrap();

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-r"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("   80 VOL1 SERIAL"), "stdout: {:?}", stdout);
    assert!(stdout.contains("  --mark--"), "stdout: {:?}", stdout);
    assert!(stdout.contains("    6 "), "stdout: {:?}", stdout);
}

#[test]
fn usage_errors_exit_1() {
    let dir = TempDir::new().unwrap();
    // No operation.
    let (code, _, stderr) = run_in(dir.path(), &["-f", "missing.tap"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("exactly one of"), "stderr: {:?}", stderr);
    // No tape.
    let (code, _, stderr) = run_in(dir.path(), &["-t"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("-f must be specified"), "stderr: {:?}", stderr);
    // Operands with -t.
    let (code, _, _) = run_in(dir.path(), &["-f", "x.tap", "-t", "NAME"]);
    assert_eq!(code, 1);
    // Unopenable tape.
    let (code, _, _) = run_in(dir.path(), &["-f", "missing.tap", "-t"]);
    assert_eq!(code, 1);
}

#[test]
fn truncated_container_exits_2() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trunc.tap");
    let mut img = Vec::new();
    img.extend_from_slice(&100u32.to_le_bytes());
    img.extend_from_slice(b"only a little");
    std::fs::write(&path, img).unwrap();

    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-t"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("truncated"), "stderr: {:?}", stderr);
}

#[test]
fn help_exits_0() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_in(dir.path(), &["-h"]);
    assert_eq!(code, 0);
    assert!(stderr.contains("Usage:"), "stderr: {:?}", stderr);
}
