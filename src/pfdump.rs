//! Permanent-file dump handling: the PFDUMP and DUMPPF tape formats.
//!
//! Both formats pack one saved permanent file per catalog entry inside an
//! outer logical record. Extraction walks the control-word framing, creates
//! a subdirectory named for the owning user (the VALIDUZ table, or the
//! octal user index), and rebuilds the file as a fresh inner SIMH tape,
//! copying data words through a write-side record context and emitting
//! end-of-record / end-of-file marks where the dump recorded them.
//!
//! PFDUMP sub-records carry a 10-char control word: char 7 holds the block
//! type (label, catalog, permits, data, ...), char 8 the flag (EOR, EOF,
//! EOI, system sector) and, with char 9, the body length in words. DUMPPF
//! wraps a 7700 prefix and a 7400 catalog table around READCW-framed data
//! runs instead.

use std::fs;
use std::io::{self, Write};

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{verbose, Config};
use crate::dcode::{dump_dword, Charset, DC_ALL, DC_ALNUM, DC_NONUL};
use crate::dprint;
use crate::ifmt::{CdcReader, CdcWriter, Word};
use crate::outfile::{set_mtime, tap_create};
use crate::ExtractError;

// ── User-index table ──────────────────────────────────────────────────────────

/// VALIDUZ user-index assignments.
const VTAB: [(&str, i64); 9] = [
    ("UTILITY", 0o524),
    ("SYSLIB", 0o377701),
    ("SYSPROC", 0o377702),
    ("MULTI", 0o377703),
    ("CALLPRG", 0o377704),
    ("WRITEUP", 0o377705),
    ("CHARGE", 0o377706),
    ("LIBRARY", 0o377776),
    ("SYSTEMX", 0o377777),
];

/// Maps a user index to its canonical user name.
pub fn ui_to_un(ui: i64) -> Option<&'static str> {
    VTAB.iter().find(|&&(_, v)| v == ui).map(|&(n, _)| n)
}

/// Maps a user-name prefix (up to a `/` or the end) to a user index.
///
/// Comparison is case-insensitive and matches on the leading characters of
/// the table entries; an unknown name yields the -1 sentinel, which is also
/// the "unknown owner" value carried by records, so unknown matches unknown.
pub fn un_to_ui(un: &str) -> i64 {
    let prefix = match un.find('/') {
        Some(i) => &un[..i],
        None => un,
    };
    for (name, ui) in VTAB {
        if prefix.len() <= name.len() && name[..prefix.len()].eq_ignore_ascii_case(prefix) {
            dprint!("un_to_ui: un {} ui {:o}", un, ui);
            return ui;
        }
    }
    -1
}

/// Directory name for a catalog entry's owner: the user name when the index
/// is in the table, else the octal index.
fn owner_dir(ui: i64) -> String {
    match ui_to_un(ui) {
        Some(un) => un.to_string(),
        None => format!("{:o}", ui),
    }
}

// ── Catalog-entry formatting ──────────────────────────────────────────────────

/// Formats the PFDUMP label fields (reel, access mask, family, pack name)
/// for the identifier's "extra" line. `sp` starts at word 1 of the record.
pub fn format_pflabel(sp: &[u8], cs: &Charset) -> String {
    let fam = cs.copy_dc(&sp[50..], 7, DC_ALNUM);
    let pn = cs.copy_dc(&sp[60..], 7, DC_ALNUM);
    let reel = ((sp[17] as u32) << 12) | ((sp[18] as u32) << 6) | sp[19] as u32;
    let mask = ((sp[28] as u32 & 3) << 6) | sp[29] as u32;

    let mut out = format!("reel {} mask {:03o}", reel, mask);
    if !fam.is_empty() {
        out.push_str(" family=");
        out.push_str(&fam);
    }
    if !pn.is_empty() {
        out.push_str(" PN=");
        out.push_str(&pn);
    }
    out
}

/// Formats a catalog entry (length, category, access mode, subsystem, owner,
/// and under `-vv` the password and user control word). `sp` starts at the
/// name/ui word of the entry.
pub fn format_catentry(sp: &[u8], cs: &Charset) -> String {
    let ui = ((sp[7] as i64) << 12) | ((sp[8] as i64) << 6) | sp[9] as i64;
    let len = ((sp[10] as u32) << 18)
        | ((sp[11] as u32) << 12)
        | ((sp[12] as u32) << 6)
        | sp[13] as u32;

    let ct = match sp[40] {
        0 => "P".to_string(),
        1 => "S".to_string(),
        2 => "L".to_string(),
        n => n.to_string(),
    };
    let mode = match sp[41] {
        0 => "W".to_string(),
        1 => "R".to_string(),
        2 => "A".to_string(),
        3 => "X".to_string(),
        4 => "N".to_string(),
        5 => "M".to_string(),
        6 => "RM".to_string(),
        7 => "RA".to_string(),
        8 => "U".to_string(),
        9 => "RU".to_string(),
        n => n.to_string(),
    };
    let ss = match sp[61] {
        0 => "NUL".to_string(),
        1 => "BAS".to_string(),
        2 => "FOR".to_string(),
        3 => "FTN".to_string(),
        4 => "EXE".to_string(),
        5 => "BAT".to_string(),
        6 => "MNF".to_string(),
        7 => "SNO".to_string(),
        8 => "COB".to_string(),
        9 => "PAS".to_string(),
        10 => "ACC".to_string(),
        11 => "TRN".to_string(),
        n => n.to_string(),
    };

    let mut un = String::new();
    let mut pw = String::new();
    let mut ucw = String::new();
    if verbose() > 1 {
        if let Some(n) = ui_to_un(ui) {
            un = format!(" ({})", n);
        }
        let p = cs.copy_dc(&sp[70..], 7, DC_NONUL);
        if !p.is_empty() {
            pw = format!(" pw={}", p);
        }
        if sp.len() >= 150 && sp[140..150].iter().any(|&c| c != 0) {
            ucw = format!(" ucw={}", cs.copy_dc(&sp[140..], 10, DC_ALL));
        }
    }

    format!(
        "{:6} {:<1} {:<2} {:<3} {:6o}{}{}{}",
        len, ct, mode, ss, ui, un, pw, ucw
    )
}

// ── Structure dump (-d) ───────────────────────────────────────────────────────

const BLOCK_TYPES: [&str; 8] = [
    "label", "catalog", "permits", "data", "reelend", "catimage", "type 6", "end",
];

const BLOCK_FLAGS: [&str; 8] = [
    "", " EOR", " EOF", " EOI", " syssect", " flag 5", " flag 6", " dump",
];

/// Prints the control-word structure of a PFDUMP record, with a data dump
/// limited by verbosity (none, 8 words, 512 words per sub-record).
pub fn analyze_pfdump(out: &mut dyn Write, cd: &mut CdcReader, cs: &Charset) -> io::Result<()> {
    let lim = match verbose() {
        0 => 0usize,
        1 => 8,
        _ => 512,
    };

    while let Some(cp) = cd.get_word() {
        let cname = cs.copy_dc(&cp, 7, DC_ALNUM);
        let btype = BLOCK_TYPES[(cp[7] & 0o7) as usize];
        let flag = BLOCK_FLAGS[((cp[8] >> 3) & 0o7) as usize];
        let len = (((cp[8] & 0o7) as usize) << 6) | cp[9] as usize;

        write!(out, "{:<7} {:>3} ", cname, len)?;
        for c in cp {
            write!(out, "{:02o}", c)?;
        }
        writeln!(out, " {}{}", btype, flag)?;

        let max = len.min(lim);
        let mut i = 0;
        let mut early = false;
        while i < max {
            let mut dword = [0u8; 20];
            let Some(w) = cd.get_word() else {
                early = true;
                break;
            };
            dword[..10].copy_from_slice(&w);
            let mut nread = 1;
            if i + 1 < max {
                match cd.get_word() {
                    Some(w2) => {
                        dword[10..].copy_from_slice(&w2);
                        nread = 2;
                    }
                    None => early = true,
                }
            }

            write!(out, "            {}", dump_dword(&dword[..nread * 10], cs))?;
            if i % 8 == 0 {
                write!(out, " 0{:o}", i)?;
            }
            writeln!(out)?;

            if early {
                break;
            }
            i += nread;
        }

        if early {
            dprint!("analyze_pfdump: premature EOR");
            break;
        }

        dprint!("analyze_pfdump: skip {}", len - i);
        if !cd.skip_words(len - i) {
            break;
        }
    }
    Ok(())
}

// ── Extraction helpers ────────────────────────────────────────────────────────

/// Decodes the raw date/time word of a catalog entry (year since 1970,
/// month, day, h, m, s in chars 4..9).
fn catalog_mtime(w: &Word) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(1970 + w[4] as i32, w[5] as u32, w[6] as u32)?;
    date.and_hms_opt(w[7] as u32, w[8] as u32, w[9] as u32)
}

/// Creates `<owner>/` (tolerating an existing directory) and opens the
/// inner tape `<owner>/<name>.tap`. On failure a diagnostic has been
/// printed and the record skipped; the caller reports a suppressed error.
fn open_inner(
    cd: &mut CdcReader,
    name: &str,
    ui: i64,
) -> Result<CdcWriter, ExtractError> {
    let dir = owner_dir(ui);
    if let Err(e) = fs::create_dir(&dir) {
        if e.kind() != io::ErrorKind::AlreadyExists {
            eprintln!("{}: mkdir {}: {}", name, dir, e);
            cd.skip_record();
            return Err(ExtractError::Suppressed);
        }
    }
    match tap_create(&format!("{}/{}", dir, name)) {
        Ok(tap) => Ok(CdcWriter::new(tap)),
        Err(_) => {
            cd.skip_record();
            Err(ExtractError::Suppressed)
        }
    }
}

fn close_inner(ocd: CdcWriter, mtime: Option<NaiveDateTime>) -> io::Result<()> {
    let path = ocd.finish()?;
    if let Some(t) = mtime {
        set_mtime(&path, t);
    }
    Ok(())
}

/// Error-path teardown: close any open inner tape (flushing staged words as
/// a final record), skip to the outer end-of-record, and report `msg`.
fn bail(cd: &mut CdcReader<'_>, inner: Option<CdcWriter>, msg: &str) -> ExtractError {
    if let Some(ocd) = inner {
        let _ = ocd.finish();
    }
    cd.skip_record();
    ExtractError::decode(msg)
}

// ── PFDUMP extraction ─────────────────────────────────────────────────────────

/// Extracts the permanent file of one PFDUMP record as an inner SIMH tape.
pub fn extract_pfdump(cd: &mut CdcReader, name: &str, cfg: &Config) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    dprint!("extract_pfdump: {}", name);

    let mut inner: Option<CdcWriter> = None;
    let mut mtime: Option<NaiveDateTime> = None;
    let mut fname = name.to_string();
    let eor_msg = "EOR while extracting PFDUMP";

    while let Some(cp) = cd.get_word() {
        let btype = cp[7] & 0o7;
        let flag = (cp[8] >> 3) & 0o7;
        let mut len = (((cp[8] & 0o7) as usize) << 6) | cp[9] as usize;

        match btype {
            1 => {
                // Catalog entry: word 1 names the file and its owner.
                let Some(w1) = cd.get_word() else {
                    return Err(bail(cd, inner, eor_msg));
                };
                if let Some(ocd) = inner.take() {
                    let _ = ocd.finish();
                    let cname = cs.copy_dc(&w1, 7, DC_ALNUM);
                    eprintln!(
                        "{}: multiple PFDUMP catalog entries, found entry for {}",
                        name, cname
                    );
                    fname = cname;
                }
                let ui = ((w1[7] as i64) << 12) | ((w1[8] as i64) << 6) | w1[9] as i64;

                if !cd.skip_words(2) {
                    return Err(bail(cd, inner, eor_msg));
                }
                let Some(w4) = cd.get_word() else {
                    return Err(bail(cd, inner, eor_msg));
                };
                mtime = catalog_mtime(&w4);

                inner = Some(open_inner(cd, &fname, ui)?);
                len = len.saturating_sub(4);
            }

            3 => {
                // Data: system sectors and other high-flag subtypes are
                // skipped with the body.
                if flag <= 3 {
                    let mut write_err = None;
                    for _ in 0..len {
                        let Some(w) = cd.get_word() else {
                            return Err(bail(cd, inner, eor_msg));
                        };
                        if let Some(ocd) = inner.as_mut() {
                            if let Err(e) = ocd.put_word(&w) {
                                write_err = Some(e);
                                break;
                            }
                        }
                    }
                    if write_err.is_none() {
                        if let Some(ocd) = inner.as_mut() {
                            let r = match flag {
                                1 => ocd.write_eor(),
                                2 => ocd.write_eof(),
                                _ => Ok(()),
                            };
                            write_err = r.err();
                        }
                    }
                    if let Some(e) = write_err {
                        eprintln!("{}: {}", name, e);
                        return Err(bail(cd, inner, eor_msg));
                    }
                    continue;
                }
            }

            _ => {}
        }

        if !cd.skip_words(len) {
            break;
        }
    }

    match inner {
        None => Err(ExtractError::decode("no catalog entry in PFDUMP record")),
        Some(ocd) => {
            close_inner(ocd, mtime)
                .map_err(|e| ExtractError::decode(format!("close error: {}", e)))
        }
    }
}

// ── DUMPPF extraction ─────────────────────────────────────────────────────────

/// Extracts the permanent file of one UMinn DUMPPF record as an inner SIMH
/// tape.
pub fn extract_dumppf(cd: &mut CdcReader, name: &str, cfg: &Config) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    dprint!("extract_dumppf: {}", name);

    let eor_msg = "EOR while extracting DUMPPF";

    // 7700 prefix table: the creation date in word 2 is the mtime fallback.
    let cp = cd.get_word().ok_or_else(|| ExtractError::decode("no 7700 table"))?;
    if cp[0] != 0o77 || cp[1] != 0 {
        return Err(ExtractError::decode("no 7700 table"));
    }
    let len77 = (((cp[2] as u32) << 6) | cp[3] as u32) as usize;

    let mut date77: Option<NaiveDate> = None;
    let mut nread = 0;
    if len77 >= 2 {
        if cd.get_word().is_none() {
            return Err(ExtractError::decode("short 7700 table"));
        }
        let Some(w2) = cd.get_word() else {
            return Err(ExtractError::decode("short 7700 table"));
        };
        date77 = crate::outfile::parse_date(&cs.copy_dc(&w2, 10, DC_NONUL));
        nread = 2;
    }
    if !cd.skip_words(len77 - nread) {
        return Err(ExtractError::decode("EOR skipping over 7700 table"));
    }

    // 7400 table with the catalog entry eight words in.
    let cp = cd.get_word().ok_or_else(|| ExtractError::decode("no 7400 table"))?;
    if cp[0] != 0o74 || cp[1] != 0 {
        return Err(ExtractError::decode("no 7400 table"));
    }
    let len74 = (((cp[2] as u32) << 6) | cp[3] as u32) as usize;
    if len74 < 16 {
        cd.skip_record();
        return Err(ExtractError::decode("no catalog entry in DUMPPF record"));
    }

    if !cd.skip_words(8) {
        return Err(ExtractError::decode(eor_msg));
    }
    let w9 = cd.get_word().ok_or_else(|| ExtractError::decode(eor_msg))?;
    let ui = ((w9[7] as i64) << 12) | ((w9[8] as i64) << 6) | w9[9] as i64;
    if !cd.skip_words(2) {
        return Err(ExtractError::decode(eor_msg));
    }
    let w12 = cd.get_word().ok_or_else(|| ExtractError::decode(eor_msg))?;
    let mtime = catalog_mtime(&w12)
        .or_else(|| date77.and_then(|d| d.and_hms_opt(12, 0, 0)));

    if !cd.skip_words(len74 - 12) {
        return Err(ExtractError::decode(eor_msg));
    }

    let mut ocd = open_inner(cd, name, ui)?;

    // READCW-framed data runs.
    let mut cw = match cd.get_word() {
        Some(w) => w,
        None => return Err(bail(cd, Some(ocd), eor_msg)),
    };
    loop {
        let pru = ((cw[1] as usize) << 12) | ((cw[2] as usize) << 6) | cw[3] as usize;
        let wc = ((cw[6] as usize) << 18)
            | ((cw[7] as usize) << 12)
            | ((cw[8] as usize) << 6)
            | cw[9] as usize;
        dprint!("extract_dumppf: pru {} wc {}", pru, wc);

        // Data moves in whole PRU words of five CDC words each.
        if wc % 5 != 0 {
            return Err(bail(cd, Some(ocd), "partial PRU in DUMPPF data"));
        }
        for _ in 0..wc {
            let Some(w) = cd.get_word() else {
                return Err(bail(cd, Some(ocd), eor_msg));
            };
            if let Err(e) = ocd.put_word(&w) {
                eprintln!("{}: {}", name, e);
                return Err(bail(cd, Some(ocd), eor_msg));
            }
        }

        // A short run ends the inner record.
        if wc < pru * 5 {
            if let Err(e) = ocd.write_eor() {
                eprintln!("{}: {}", name, e);
                return Err(bail(cd, Some(ocd), eor_msg));
            }
        }

        let Some(tr) = cd.get_word() else {
            return Err(bail(cd, Some(ocd), eor_msg));
        };
        if tr[0] == 0 && tr[1] == 0o17 {
            if let Err(e) = ocd.write_eof() {
                eprintln!("{}: {}", name, e);
                return Err(bail(cd, Some(ocd), eor_msg));
            }
            break;
        }
        cw = tr;
    }

    cd.skip_record();
    close_inner(ocd, mtime).map_err(|e| ExtractError::decode(format!("close error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_table_roundtrips() {
        assert_eq!(ui_to_un(0o524), Some("UTILITY"));
        assert_eq!(ui_to_un(0o377701), Some("SYSLIB"));
        assert_eq!(ui_to_un(0o123), None);
        assert_eq!(un_to_ui("SYSLIB"), 0o377701);
        assert_eq!(un_to_ui("syslib/FOO"), 0o377701);
        assert_eq!(un_to_ui("NOSUCH"), -1);
    }

    #[test]
    fn un_prefix_matching_is_leading() {
        // Short prefixes resolve to the first table entry they lead.
        assert_eq!(un_to_ui("SYS"), 0o377701);
        assert_eq!(un_to_ui("SYSLIBX"), -1);
    }

    #[test]
    fn owner_dir_prefers_user_names() {
        assert_eq!(owner_dir(0o377701), "SYSLIB");
        assert_eq!(owner_dir(0o123), "123");
    }

    #[test]
    fn catalog_mtime_decodes_raw_bytes() {
        let mut w: Word = [0; 10];
        w[4] = 10; // 1980
        w[5] = 1;
        w[6] = 2;
        w[7] = 12;
        w[8] = 34;
        w[9] = 56;
        let t = catalog_mtime(&w).unwrap();
        assert_eq!(t.to_string(), "1980-01-02 12:34:56");
        // A zeroed word has no valid month and produces no mtime.
        assert_eq!(catalog_mtime(&[0; 10]), None);
    }

    #[test]
    fn pflabel_formatting() {
        let cs = Charset::new(false);
        let mut sp = vec![0u8; 70];
        sp[17] = 0;
        sp[18] = 0;
        sp[19] = 3; // reel 3
        sp[28] = 1;
        sp[29] = 0o27; // mask 0o127
        sp[50] = 0o06; // family "F"
        sp[60] = 0o20; // PN "P"
        let s = format_pflabel(&sp, &cs);
        assert_eq!(s, "reel 3 mask 127 family=F PN=P");
    }

    #[test]
    fn catentry_formatting_terse() {
        let cs = Charset::new(false);
        let mut sp = vec![0u8; 160];
        sp[7] = 0o37;
        sp[8] = 0o77;
        sp[9] = 0o01; // ui SYSLIB
        sp[13] = 42; // length
        sp[40] = 1; // S
        sp[41] = 6; // RM
        sp[61] = 3; // FTN
        let s = format_catentry(&sp, &cs);
        assert_eq!(s, "    42 S RM FTN 377701");
    }
}
