//! Output-file utilities: exclusive-create with collision suffixes, record
//! name matching, date parsing, and modification-time propagation.
//!
//! Extracted text goes to `<name>.txt` (or stdout under `-O`); rebuilt
//! permanent files go to `<dir>/<name>.tap`. Both resolve name collisions
//! by inserting `.<N>` between the stem and the extension for N in 1..=99,
//! never overwriting an existing file.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use filetime::FileTime;

use crate::dprint;
use crate::pfdump::un_to_ui;
use crate::simtap::TapeWriter;

// ── Output file ───────────────────────────────────────────────────────────────

enum Sink {
    Stdout,
    File(BufWriter<std::fs::File>),
}

/// One extraction output: a freshly created file, or stdout under `-O`.
pub struct OutFile {
    sink: Sink,
    path: Option<PathBuf>,
}

impl OutFile {
    /// Writes one text line with an LF terminator.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout => {
                let out = io::stdout();
                let mut out = out.lock();
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")
            }
            Sink::File(f) => {
                f.write_all(line.as_bytes())?;
                f.write_all(b"\n")
            }
        }
    }

    /// Writes raw text without a terminator.
    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout => io::stdout().lock().write_all(s.as_bytes()),
            Sink::File(f) => f.write_all(s.as_bytes()),
        }
    }

    /// Closes the output, returning the created path (None for stdout).
    pub fn finish(self) -> io::Result<Option<PathBuf>> {
        match self.sink {
            Sink::Stdout => Ok(None),
            Sink::File(mut f) => {
                f.flush()?;
                Ok(self.path)
            }
        }
    }

    /// Closes the output on an error path, keeping whatever was written.
    pub fn abandon(self) {
        if let Sink::File(mut f) = self.sink {
            let _ = f.flush();
        }
    }
}

/// Opens `<name>.<sfx>` for exclusive writing, resolving collisions with
/// `<name>.<N>.<sfx>` and announcing the chosen file on stdout. Failures
/// other than a collision print their own diagnostic before returning.
pub fn out_open(to_stdout: bool, name: &str, sfx: &str) -> io::Result<OutFile> {
    if to_stdout {
        return Ok(OutFile {
            sink: Sink::Stdout,
            path: None,
        });
    }

    let mut fname = format!("{}.{}", name, sfx);
    for i in 0..100 {
        match OpenOptions::new().write(true).create_new(true).open(&fname) {
            Ok(f) => {
                println!("Extracting to {}", fname);
                return Ok(OutFile {
                    sink: Sink::File(BufWriter::new(f)),
                    path: Some(PathBuf::from(fname)),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                fname = format!("{}.{}.{}", name, i + 1, sfx);
            }
            Err(e) => {
                eprintln!("{}: {}", fname, e);
                return Err(e);
            }
        }
    }
    eprintln!("{}.{}: too many existing versions", name, sfx);
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "too many existing versions",
    ))
}

/// Creates `<stem>.tap` for an inner tape, with the same collision policy
/// and announcement as [`out_open`].
pub fn tap_create(stem: &str) -> io::Result<TapeWriter> {
    let mut fname = format!("{}.tap", stem);
    for i in 0..100 {
        match TapeWriter::create(&fname) {
            Ok(w) => {
                println!("Extracting to {}", fname);
                return Ok(w);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                fname = format!("{}.{}.tap", stem, i + 1);
            }
            Err(e) => {
                eprintln!("{}: {}", fname, e);
                return Err(e);
            }
        }
    }
    eprintln!("{}.tap: too many existing versions", stem);
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "too many existing versions",
    ))
}

// ── Name matching ─────────────────────────────────────────────────────────────

/// Matches a selection argument against a record name and owner.
///
/// `pattern` is `ui/pat` (octal), `un/pat` (user-name table lookup used
/// whenever the prefix does not parse entirely as octal), or a bare `pat`.
/// A case-insensitive exact match returns the pattern itself (callers use
/// it as the output stem); otherwise a case-folded shell wildcard match
/// returns the record name.
pub fn name_match<'a>(pattern: &'a str, name: &'a str, ui: i64) -> Option<&'a str> {
    let mut pat = pattern;
    if let Some(slash) = pattern.find('/') {
        pat = &pattern[slash + 1..];
        let prefix = &pattern[..slash];
        let octal_digits = prefix.bytes().take_while(|b| (b'0'..=b'7').contains(b)).count();
        let want_ui = if octal_digits == prefix.len() && !prefix.is_empty() {
            i64::from_str_radix(prefix, 8).unwrap_or(-1)
        } else {
            // The prefix is not pure octal: retry it as a user name.
            un_to_ui(prefix)
        };
        if ui != want_ui {
            return None;
        }
    }

    dprint!("name_match: pat={}", pat);
    if pat.eq_ignore_ascii_case(name) {
        return Some(pat);
    }
    let opts = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    match glob::Pattern::new(pat) {
        Ok(p) if p.matches_with(name, opts) => Some(name),
        _ => None,
    }
}

// ── Dates and modification times ──────────────────────────────────────────────

/// Parses a `yy/mm/dd` date (leading space tolerated, trailing text such as
/// a period ignored) with 1960 windowing: years below 60 are 20xx.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let mut rest = date.trim_start();
    let mut next_num = |sep: Option<char>| -> Option<i32> {
        if let Some(sep) = sep {
            rest = rest.strip_prefix(sep)?;
        }
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let (num, tail) = rest.split_at(digits);
        rest = tail;
        num.parse().ok()
    };

    let yy = next_num(None)?;
    let mm = next_num(Some('/'))?;
    let dd = next_num(Some('/'))?;

    let year = 1900 + if yy < 60 { yy + 100 } else { yy };
    let d = NaiveDate::from_ymd_opt(year, mm as u32, dd as u32);
    if d.is_some() {
        dprint!("parse_date: parsed {}", date);
    }
    d
}

/// Sets the modification time of `path` to the local civil time `dt`,
/// leaving the access time at "now". Warnings go to stderr; extraction is
/// never failed over a bad date.
pub fn set_mtime(path: &Path, dt: NaiveDateTime) {
    let local = match chrono::Local.from_local_datetime(&dt) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t,
        LocalResult::None => {
            eprintln!("{}: mtime invalid", path.display());
            return;
        }
    };
    let mtime = FileTime::from_unix_time(local.timestamp(), 0);
    if let Err(e) = filetime::set_file_mtime(path, mtime) {
        eprintln!("{}: set mtime: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exact_match_is_case_insensitive_and_returns_pattern() {
        assert_eq!(name_match("sample", "SAMPLE", -1), Some("sample"));
        assert_eq!(name_match("SAMPLE", "SAMPLE", 0o524), Some("SAMPLE"));
    }

    #[test]
    fn wildcard_match_returns_record_name() {
        assert_eq!(name_match("sam*", "SAMPLE", -1), Some("SAMPLE"));
        assert_eq!(name_match("S?MPLE", "SAMPLE", -1), Some("SAMPLE"));
        assert_eq!(name_match("x*", "SAMPLE", -1), None);
    }

    #[test]
    fn ui_prefix_filters_on_owner() {
        assert_eq!(name_match("524/UTIL", "UTIL", 0o524), Some("UTIL"));
        assert_eq!(name_match("524/UTIL", "UTIL", 0o525), None);
    }

    #[test]
    fn un_prefix_resolves_through_the_table() {
        assert_eq!(name_match("SYSLIB/X*", "XYZ", 0o377701), Some("XYZ"));
        assert_eq!(name_match("syslib/XYZ", "XYZ", 0o377701), Some("XYZ"));
        assert_eq!(name_match("SYSLIB/XYZ", "XYZ", 0o524), None);
    }

    #[test]
    fn unknown_un_prefix_matches_unknown_ui() {
        // A prefix that is neither octal nor in the table carries the
        // unknown sentinel and so selects records with unknown owners.
        assert_eq!(name_match("ZZZ9/FOO", "FOO", -1), Some("FOO"));
        assert_eq!(name_match("ZZZ9/FOO", "FOO", 0o524), None);
    }

    #[test]
    fn parse_date_windows_years() {
        assert_eq!(parse_date("80/01/02."), NaiveDate::from_ymd_opt(1980, 1, 2));
        assert_eq!(parse_date(" 05/12/31"), NaiveDate::from_ymd_opt(2005, 12, 31));
        assert_eq!(parse_date("garbage"), None);
        assert_eq!(parse_date("80/13/02."), None);
    }

    #[test]
    fn out_open_suffixes_on_collision() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("DECK");
        let stem = stem.to_str().unwrap();

        let a = out_open(false, stem, "txt").unwrap();
        assert_eq!(a.finish().unwrap().unwrap(), PathBuf::from(format!("{}.txt", stem)));

        let b = out_open(false, stem, "txt").unwrap();
        assert_eq!(
            b.finish().unwrap().unwrap(),
            PathBuf::from(format!("{}.1.txt", stem))
        );

        let c = out_open(false, stem, "txt").unwrap();
        assert_eq!(
            c.finish().unwrap().unwrap(),
            PathBuf::from(format!("{}.2.txt", stem))
        );
    }

    #[test]
    fn out_open_stdout_has_no_path() {
        let of = out_open(true, "ignored", "txt").unwrap();
        assert_eq!(of.finish().unwrap(), None);
    }

    #[test]
    fn set_mtime_applies_local_noon() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("stamp.txt");
        std::fs::write(&p, "x").unwrap();
        let dt = NaiveDate::from_ymd_opt(1980, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        set_mtime(&p, dt);
        let meta = std::fs::metadata(&p).unwrap();
        let got = FileTime::from_last_modification_time(&meta);
        let want = chrono::Local
            .from_local_datetime(&dt)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(got.unix_seconds(), want);
    }
}
