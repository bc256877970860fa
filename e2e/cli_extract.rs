// Black-box tests for extraction (-x): MODIFY OPL decks, UPDATE PLs, and
// PFDUMP permanent-file reconstruction, including output naming and mtimes.

mod common;

use std::fs;
use std::time::{Duration, SystemTime};

use chrono::{NaiveDate, TimeZone};
use common::{dc, run_in, tape_of_records, to_words};
use tempfile::TempDir;

use cdctap::ifmt::{unpack6, unpacked_len};
use cdctap::simtap::{TapeItem, TapeReader};

/// Expected mtime for a local civil date at the given hour.
fn local_epoch(y: i32, m: u32, d: u32, h: u32) -> SystemTime {
    let dt = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap();
    let ts = chrono::Local
        .from_local_datetime(&dt)
        .earliest()
        .unwrap()
        .timestamp();
    SystemTime::UNIX_EPOCH + Duration::from_secs(ts as u64)
}

// ── MODIFY OPL ────────────────────────────────────────────────────────────────

/// One OPL deck named SAMPLE with a single active line `PRINT*,'HI'` and a
/// modification date of 80/01/02.
fn opl_record() -> Vec<u8> {
    let mut rec = Vec::new();
    // 7700 header, table length 3.
    rec.extend_from_slice(&[0o77, 0, 0, 3, 0, 0, 0, 0, 0, 0]);
    let mut name = dc("SAMPLE");
    name.resize(10, 0);
    rec.extend_from_slice(&name);
    let mut cdate = dc("80/01/01.");
    cdate.resize(10, 0);
    rec.extend_from_slice(&cdate);
    let mut mdate = dc("80/01/02.");
    mdate.resize(10, 0);
    rec.extend_from_slice(&mdate);
    // 7001 modset table: one modset (the deck itself).
    rec.extend_from_slice(&[0o70, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    // Line header: active, two compressed words, sequence 1, no history.
    rec.extend_from_slice(&[0o42, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    // "PRINT*,'HI'" then end-of-line.
    let mut text = dc("PRINT*,'HI'");
    text.extend_from_slice(&[0, 0]);
    text.resize(20, 0);
    rec.extend_from_slice(&text);
    rec
}

#[test]
fn extract_opl_deck() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("opl.tap");
    tape_of_records(&path, &[opl_record()]);

    let (code, stdout, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "SAMPLE"]);
    assert_eq!(code, 0, "stderr: {:?}", stderr);
    assert!(stdout.contains("Extracting to SAMPLE.txt"), "stdout: {:?}", stdout);

    let out = dir.path().join("SAMPLE.txt");
    assert_eq!(fs::read_to_string(&out).unwrap(), "PRINT*,'HI'\n");

    // mtime is the deck's modification date at local noon.
    let got = fs::metadata(&out).unwrap().modified().unwrap();
    assert_eq!(got, local_epoch(1980, 1, 2, 12));
}

#[test]
fn extract_opl_resolves_name_collisions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("opl.tap");
    tape_of_records(&path, &[opl_record()]);
    fs::write(dir.path().join("SAMPLE.txt"), "occupied").unwrap();

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "SAMPLE"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Extracting to SAMPLE.1.txt"), "stdout: {:?}", stdout);
    assert_eq!(
        fs::read_to_string(dir.path().join("SAMPLE.1.txt")).unwrap(),
        "PRINT*,'HI'\n"
    );
    assert_eq!(fs::read_to_string(dir.path().join("SAMPLE.txt")).unwrap(), "occupied");
}

#[test]
fn extract_opl_to_stdout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("opl.tap");
    tape_of_records(&path, &[opl_record()]);

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "-O", "SAMPLE"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "PRINT*,'HI'\n");
    assert!(!dir.path().join("SAMPLE.txt").exists());
}

// ── UPDATE sequential PL ──────────────────────────────────────────────────────

/// A UPL record with id directory [MOD1, MOD2] and two lines; only the
/// second is active, activated by id 2.
fn upl_record() -> Vec<u8> {
    let mut rec = Vec::new();
    // "CHECK" header; char 6 is not '3', so the 64-set applies.
    rec.extend_from_slice(&[0o03, 0o10, 0o05, 0o03, 0o13, 0, 0, 0, 0, 0]);
    // Word 1: two ids, no decks.
    rec.extend_from_slice(&[0, 0, 0, 0, 0, 0, 2, 0, 0, 0]);
    let mut m1 = dc("MOD1");
    m1.resize(10, 0);
    rec.extend_from_slice(&m1);
    let mut m2 = dc("MOD2");
    m2.resize(10, 0);
    rec.extend_from_slice(&m2);
    // Inactive line, one text word, sequence 1, empty history.
    rec.extend_from_slice(&[0o40, 0, 0, 1, 0, 0, 1, 0, 0, 0]);
    let mut skipped = dc("XXX");
    skipped.extend_from_slice(&[0, 0]);
    skipped.resize(10, 0);
    rec.extend_from_slice(&skipped);
    // Active line, one text word, sequence 2, activated by id 2.
    rec.extend_from_slice(&[0o60, 0, 0, 1, 0, 0, 2, 0o40, 0, 2]);
    let mut text = dc("HI");
    text.extend_from_slice(&[0, 0]);
    text.resize(10, 0);
    rec.extend_from_slice(&text);
    // Checksum word: five leading nulls end the deck.
    rec.extend_from_slice(&[0, 0, 0, 0, 0, 1, 2, 3, 4, 5]);
    rec
}

#[test]
fn extract_upl_verbose_tags_lines_with_mods() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("upl.tap");
    tape_of_records(&path, &[upl_record()]);

    // The OLDPL header carries no record name, so the record extracts as
    // "noname".
    let (code, _, stderr) = run_in(
        dir.path(),
        &["-f", path.to_str().unwrap(), "-x", "-v", "noname"],
    );
    assert_eq!(code, 0, "stderr: {:?}", stderr);

    let text = fs::read_to_string(dir.path().join("noname.txt")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "only the active line is written: {:?}", text);
    assert!(lines[0].starts_with("HI "), "line: {:?}", lines[0]);
    assert!(lines[0].ends_with("MOD2.2"), "line: {:?}", lines[0]);
    assert_eq!(lines[0].len(), 72 + "MOD2.2".len());
}

#[test]
fn extract_upl_terse_writes_bare_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("upl.tap");
    tape_of_records(&path, &[upl_record()]);

    let (code, _, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "noname"]);
    assert_eq!(code, 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("noname.txt")).unwrap(),
        "HI\n"
    );
}

// ── Text records and ASCII mode ───────────────────────────────────────────────

/// A text record: "HELLO" on the first line, then a 76-escape pair on the
/// second.
fn escaped_text_record() -> Vec<u8> {
    let mut rec = vec![0u8; 20];
    rec[..5].copy_from_slice(&dc("HELLO"));
    rec[10] = 0o76;
    rec[11] = 0o01;
    rec
}

#[test]
fn extract_text_translates_76_escapes_only_in_ascii_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("text.tap");
    tape_of_records(&path, &[escaped_text_record()]);

    let (code, _, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "HELLO"]);
    assert_eq!(code, 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("HELLO.txt")).unwrap(),
        "HELLO\n>A\n"
    );
    fs::remove_file(dir.path().join("HELLO.txt")).unwrap();

    let (code, _, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "-a", "HELLO"]);
    assert_eq!(code, 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("HELLO.txt")).unwrap(),
        "HELLO\na\n"
    );
}

// ── UPDATE random PL ──────────────────────────────────────────────────────────

/// A random OLDPL deck: the 6000 word doubles as the first line header and
/// the line text is the deck directive.
fn uplr_record() -> Vec<u8> {
    let mut rec = Vec::new();
    // Line header: active (0o20), last-history-word flag, one text word,
    // sequence 1, empty history.
    rec.extend_from_slice(&[0o60, 0, 0, 1, 0, 0, 1, 0, 0, 0]);
    // "*DECK N" then end-of-line; chars 11.. spell DECK for the identifier.
    let mut text = dc("*DECK N");
    text.extend_from_slice(&[0, 0]);
    text.resize(10, 0);
    rec.extend_from_slice(&text);
    rec
}

#[test]
fn extract_uplr_deck_directive_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("uplr.tap");
    tape_of_records(&path, &[uplr_record()]);

    // The 6000 record carries no name; it extracts as "noname".
    let (code, _, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "noname"]);
    assert_eq!(code, 0, "stderr: {:?}", stderr);
    assert_eq!(
        fs::read_to_string(dir.path().join("noname.txt")).unwrap(),
        "*DECK N\n"
    );
}

// ── PFDUMP ────────────────────────────────────────────────────────────────────

/// A PFDUMP outer record: catalog entry for FOO under SYSLIB (0377701),
/// then two data runs, the first flagged EOR and the second EOF.
fn pfdump_record(data1: &[[u8; 10]], data2: &[[u8; 10]]) -> Vec<u8> {
    let mut rec = Vec::new();
    let name = dc("FOO");

    // Catalog control word: block type 1, flag 1, length 4.
    let mut cw = [0u8; 10];
    cw[..3].copy_from_slice(&name);
    cw[7] = 0o01;
    cw[8] = 0o10;
    cw[9] = 4;
    rec.extend_from_slice(&cw);
    // Word 1: name and ui.
    let mut w1 = [0u8; 10];
    w1[..3].copy_from_slice(&name);
    w1[7] = 0o37;
    w1[8] = 0o77;
    w1[9] = 0o01;
    rec.extend_from_slice(&w1);
    // Words 2-3 unused.
    rec.extend_from_slice(&[0; 20]);
    // Word 4: modification time 1980-01-02 13:00:00.
    rec.extend_from_slice(&[0, 0, 0, 0, 10, 1, 2, 13, 0, 0]);

    // Data run 1: type 3, flag EOR.
    let mut dw = [0u8; 10];
    dw[7] = 3;
    dw[8] = 0o10 | ((data1.len() >> 6) as u8 & 0o7);
    dw[9] = (data1.len() & 0o77) as u8;
    rec.extend_from_slice(&dw);
    for w in data1 {
        rec.extend_from_slice(w);
    }

    // Data run 2: type 3, flag EOF.
    let mut dw = [0u8; 10];
    dw[7] = 3;
    dw[8] = 0o20 | ((data2.len() >> 6) as u8 & 0o7);
    dw[9] = (data2.len() & 0o77) as u8;
    rec.extend_from_slice(&dw);
    for w in data2 {
        rec.extend_from_slice(w);
    }

    rec
}

#[test]
fn extract_pfdump_rebuilds_inner_tape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pf.tap");

    let data1 = to_words(&dc("FIRST RECORD DATA WORDS HERE16"));
    let data2 = to_words(&dc("SECOND RECORD DATA05"));
    assert_eq!(data1.len(), 3);
    assert_eq!(data2.len(), 2);
    tape_of_records(&path, &[pfdump_record(&data1, &data2)]);

    let (code, stdout, stderr) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-x", "FOO"]);
    assert_eq!(code, 0, "stderr: {:?}", stderr);
    assert!(
        stdout.contains("Extracting to SYSLIB/FOO.tap"),
        "stdout: {:?}",
        stdout
    );

    // The inner image holds the two data runs as trailered blocks, EOR
    // after the first and EOF after the second, then the closing mark.
    let inner = dir.path().join("SYSLIB").join("FOO.tap");
    let mut tap = TapeReader::open(&inner).unwrap();

    let b1 = match tap.read_block().unwrap() {
        Some(TapeItem::Block(b)) => b.to_vec(),
        other => panic!("expected block, got {:?}", other),
    };
    let mut chars = vec![0u8; unpacked_len(b1.len())];
    let n = unpack6(&b1, &mut chars);
    assert_eq!(&chars[..30], data1.concat().as_slice());
    assert_eq!(chars[n - 1] & 0o17, 0, "first block ends the record, not the file");

    let b2 = match tap.read_block().unwrap() {
        Some(TapeItem::Block(b)) => b.to_vec(),
        other => panic!("expected block, got {:?}", other),
    };
    let mut chars = vec![0u8; unpacked_len(b2.len())];
    let n = unpack6(&b2, &mut chars);
    assert_eq!(&chars[..20], data2.concat().as_slice());
    assert_eq!(chars[n - 1] & 0o17, 0o17, "second block carries the EOF mark");

    assert!(matches!(tap.read_block().unwrap(), Some(TapeItem::Mark)));
    assert!(tap.read_block().unwrap().is_none());

    // mtime from the catalog entry.
    let got = fs::metadata(&inner).unwrap().modified().unwrap();
    assert_eq!(got, local_epoch(1980, 1, 2, 13));
}

#[test]
fn extract_pfdump_matches_by_owner_prefix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pf.tap");
    let data = to_words(&dc("DATA WORDS1"));
    tape_of_records(&path, &[pfdump_record(&data, &data)]);

    // Wrong owner does not match.
    let (code, _, stderr) = run_in(
        dir.path(),
        &["-f", path.to_str().unwrap(), "-x", "UTILITY/FOO"],
    );
    assert_eq!(code, 2);
    assert!(stderr.contains("UTILITY/FOO not found"), "stderr: {:?}", stderr);

    // Matching owner, octal spelling.
    let (code, _, _) = run_in(
        dir.path(),
        &["-f", path.to_str().unwrap(), "-x", "377701/F*"],
    );
    assert_eq!(code, 0);
    assert!(dir.path().join("SYSLIB").join("FOO.tap").exists());
}

#[test]
fn dump_analyzes_pfdump_structure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pf.tap");
    let data = to_words(&dc("DATA WORDS1"));
    tape_of_records(&path, &[pfdump_record(&data, &data)]);

    let (code, stdout, _) = run_in(dir.path(), &["-f", path.to_str().unwrap(), "-d", "FOO"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("catalog"), "stdout: {:?}", stdout);
    assert!(stdout.contains("data EOR"), "stdout: {:?}", stdout);
    assert!(stdout.contains("data EOF"), "stdout: {:?}", stdout);
}
