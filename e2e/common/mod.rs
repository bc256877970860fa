//! Shared helpers for the black-box CLI tests: locating the built binary
//! and assembling synthetic tape images with the library's own writer.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use cdctap::ifmt::{CdcWriter, Word};
use cdctap::simtap::TapeWriter;

/// Locates the `cdctap` binary produced by Cargo.
pub fn cdctap_bin() -> PathBuf {
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_cdctap") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("cdctap");
    p
}

/// Runs the binary with `args` in `dir`, returning (exit code, stdout,
/// stderr).
pub fn run_in(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let out = Command::new(cdctap_bin())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run cdctap");
    (
        out.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
    )
}

/// Encodes ASCII text as CDC display code (64-character set).
pub fn dc(s: &str) -> Vec<u8> {
    const MAP: &str = ":ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-*/()$= ,.#[]%\"_!&'?<>@\\^;";
    s.chars()
        .map(|c| MAP.find(c).unwrap_or_else(|| panic!("no display code for {:?}", c)) as u8)
        .collect()
}

/// Packs a flat char list into zero-padded words.
pub fn to_words(chars: &[u8]) -> Vec<Word> {
    chars
        .chunks(10)
        .map(|chunk| {
            let mut w: Word = [0; 10];
            w[..chunk.len()].copy_from_slice(chunk);
            w
        })
        .collect()
}

/// Writes one logical record (words followed by an end-of-record flush).
pub fn put_record(w: &mut CdcWriter, chars: &[u8]) {
    for word in to_words(chars) {
        w.put_word(&word).unwrap();
    }
    w.write_eor().unwrap();
}

/// Builds a tape image at `path` from a list of records.
pub fn tape_of_records(path: &Path, records: &[Vec<u8>]) {
    let mut w = CdcWriter::new(TapeWriter::create(path).unwrap());
    for rec in records {
        put_record(&mut w, rec);
    }
    w.finish().unwrap();
}

/// An 80-byte ANSI label with `id` at the front and `body` from byte 4.
pub fn label(id: &str, body: &str) -> Vec<u8> {
    let mut l = vec![b' '; 80];
    l[..id.len()].copy_from_slice(id.as_bytes());
    l[4..4 + body.len()].copy_from_slice(body.as_bytes());
    l
}
