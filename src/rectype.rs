//! Structural identification of CDC record types.
//!
//! [`id_record`] inspects the first decoded characters of a logical record
//! (only the leading couple hundred matter) and assigns one of the closed
//! set of record kinds, extracting the record name, a date, a free-form
//! "extra" line and, for permanent-file dumps, the owner's user index.
//!
//! The checks run in a fixed order and the first match wins: explicit text
//! prefixes (`.PROC,`, the UPDATE `CHECK` header, the `YANK$$$` random-PL
//! directory), the PFDUMP family (whose records start with a repeated name
//! and a control word rather than a table header), then the typed header
//! tables (7700 prefix with UCF/ACF short-circuits, an optional LDSET
//! table, and the fixed header tags), a PP-program shape test, and finally
//! the TEXT fallback.

use std::fmt;

use crate::dcode::{is_dc_ts, Charset, DC_ALNUM, DC_NONUL, DC_NOSPC, DC_TEXT};
use crate::dprint;
use crate::pfdump::{format_catentry, format_pflabel};

/// Longest "extra" line carried in a [`RecInfo`].
pub const EXTRA_LEN: usize = 120;

// ── Record kinds ──────────────────────────────────────────────────────────────

/// The closed set of record kinds.
///
/// Ordering matters: everything after [`RecType::Eof`] is a real record with
/// a length and date worth printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecType {
    /// Zero-length record.
    Empty,
    /// Tape end-of-file marker.
    Eof,
    /// Unrecognized; treated as text.
    Text,
    /// CCL procedure.
    Proc,
    /// Arbitrary data.
    Data,
    /// 7700 table with an unrecognized body.
    T7700,
    /// MODIFY compressed compile file.
    Acf,
    /// MODIFY OPL deck.
    Opl,
    /// MODIFY OPL common deck.
    Oplc,
    /// MODIFY OPL directory.
    Opld,
    /// UPDATE compressed compile file.
    Ucf,
    /// UPDATE sequential program library.
    Upl,
    /// UPDATE random program library.
    Uplr,
    /// UPDATE random program library directory.
    Upld,
    /// PP program.
    Pp,
    /// PPU program.
    Ppu,
    /// 16-bit PP program.
    Ppl,
    /// User library.
    Ulib,
    /// Relocatable subprogram.
    Rel,
    /// Absolute program.
    Abs,
    /// Overlay.
    Ovl,
    /// Special deadstart record.
    Sdr,
    /// Fast dynamic load capsule.
    Cap,
    /// User-defined record (7500 table).
    User,
    /// UMinn DUMPPF permanent-file dump.
    Dumppf,
    /// PFDUMP label.
    Pflbl,
    /// PFDUMP file.
    Pfdump,
}

impl RecType {
    /// Catalog display name. Both PFDUMP label and file records display as
    /// `PFDUMP`; the empty record displays as `(00)`.
    pub fn name(self) -> &'static str {
        match self {
            RecType::Empty => "(00)",
            RecType::Eof => "EOF",
            RecType::Text => "TEXT",
            RecType::Proc => "PROC",
            RecType::Data => "DATA",
            RecType::T7700 => "7700",
            RecType::Acf => "ACF",
            RecType::Opl => "OPL",
            RecType::Oplc => "OPLC",
            RecType::Opld => "OPLD",
            RecType::Ucf => "UCF",
            RecType::Upl => "UPL",
            RecType::Uplr => "UPLR",
            RecType::Upld => "UPLD",
            RecType::Pp => "PP",
            RecType::Ppu => "PPU",
            RecType::Ppl => "PPL",
            RecType::Ulib => "ULIB",
            RecType::Rel => "REL",
            RecType::Abs => "ABS",
            RecType::Ovl => "OVL",
            RecType::Sdr => "SDR",
            RecType::Cap => "CAP",
            RecType::User => "USER",
            RecType::Dumppf => "DUMPPF",
            RecType::Pflbl => "PFDUMP",
            RecType::Pfdump => "PFDUMP",
        }
    }
}

impl fmt::Display for RecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Identification result: kind plus extracted name, date, free-form line,
/// and owner user index (-1 when unknown).
#[derive(Debug, Clone)]
pub struct RecInfo {
    pub rtype: RecType,
    pub name: String,
    pub date: String,
    pub extra: String,
    pub ui: i64,
}

impl RecInfo {
    fn of(rtype: RecType) -> RecInfo {
        RecInfo {
            rtype,
            name: String::new(),
            date: String::new(),
            extra: String::new(),
            ui: -1,
        }
    }

    /// The tape end-of-file pseudo-record.
    pub fn eof() -> RecInfo {
        RecInfo::of(RecType::Eof)
    }
}

// ── Display-code literals ─────────────────────────────────────────────────────

const DC_DOT_PROC: [u8; 6] = [0o57, 0o20, 0o22, 0o17, 0o03, 0o56]; // ".PROC,"
const DC_CHECK: [u8; 5] = [0o03, 0o10, 0o05, 0o03, 0o13]; // "CHECK"
const DC_YANKSSS: [u8; 7] = [0o31, 0o01, 0o16, 0o13, 0o53, 0o53, 0o53]; // "YANK$$$"
const DC_PFDUMP: [u8; 6] = [0o20, 0o06, 0o04, 0o25, 0o15, 0o20]; // "PFDUMP"
const DC_COMDECK: [u8; 7] = [0o03, 0o17, 0o15, 0o04, 0o05, 0o03, 0o13]; // "COMDECK"
const DC_DECK: [u8; 4] = [0o04, 0o05, 0o03, 0o13]; // "DECK"
const DC_YANK: [u8; 4] = [0o31, 0o01, 0o16, 0o13]; // "YANK"

fn starts_with(bp: &[u8], lit: &[u8]) -> bool {
    bp.len() >= lit.len() && &bp[..lit.len()] == lit
}

// ── Identification ────────────────────────────────────────────────────────────

/// Classifies a decoded record from its leading characters.
///
/// `bp` is the decoded first block of the record (word-aligned); the tape
/// end-of-file case is the caller's to detect (see [`RecInfo::eof`]).
pub fn id_record(bp: &[u8], cs: &Charset) -> RecInfo {
    let cnt = bp.len();
    if cnt == 0 {
        return RecInfo::of(RecType::Empty);
    }

    // CCL procedure: ".PROC," prefix.
    if starts_with(bp, &DC_DOT_PROC) {
        let mut info = RecInfo::of(RecType::Proc);
        info.name = cs.copy_dc(&bp[6..], 7.min(cnt - 6), DC_ALNUM);
        info.extra = cs.copy_dc(bp, EXTRA_LEN.min(cnt), DC_TEXT);
        return info;
    }

    // UPDATE sequential OLDPL header.
    if cnt >= 10 && starts_with(bp, &DC_CHECK) && bp[5] & 0o76 == 0 {
        return RecInfo::of(RecType::Upl);
    }

    // UPDATE random PL directory.
    if cnt >= 10
        && starts_with(bp, &DC_YANKSSS)
        && bp[7] == 0
        && bp[8] == 0
        && bp[9] == 0
    {
        return RecInfo::of(RecType::Upld);
    }

    // PFDUMP family: records led by a repeated file name and control word.
    if cnt >= 20 {
        let cw = ((bp[7] as u32) << 12) | ((bp[8] as u32) << 6) | bp[9] as u32;

        // End-of-dump sentinel.
        if bp[..7].iter().all(|&c| c == 0)
            && bp[7] == 0o07
            && bp[8] == 0o70
            && bp[9] == 0
            && cnt <= 20
        {
            return RecInfo::of(RecType::Pflbl);
        }

        // Words 0 and 1 must carry matching, valid, null-terminated names.
        let mut eos = false;
        let mut i = 0;
        while i < 7 {
            if bp[i] != bp[i + 10] || bp[i] > 36 || (eos && bp[i] != 0) {
                break;
            }
            if bp[i] == 0 {
                eos = true;
            }
            i += 1;
        }
        dprint!("id_record: cw {:06o}", cw);

        // Dump label: word 1 says PFDUMP and the control word is 01100.
        if starts_with(&bp[10..], &DC_PFDUMP)
            && bp[16] == 0
            && cnt >= 80
            && cw == 0o1100
            && i >= 6
        {
            let mut info = RecInfo::of(RecType::Pflbl);
            info.name = cs.copy_dc(bp, 7, DC_ALNUM);
            info.date = cs.copy_dc(&bp[40..], 10, DC_NONUL);
            info.extra = format_pflabel(&bp[10..], cs);
            return info;
        }

        if i == 7 && cw & 0o777000 == 0o011000 && cw & 0o777 >= 2 {
            let mut info = RecInfo::of(RecType::Pfdump);
            info.name = cs.copy_dc(bp, 7, DC_ALNUM);
            info.ui = ((bp[17] as i64) << 12) | ((bp[18] as i64) << 6) | bp[19] as i64;
            dprint!("id_record: ui {:o} cnt {}", info.ui, cnt);

            if cnt >= 50 && cw & 0o777 >= 4 {
                info.date = format!(
                    "{:02}/{:02}/{:02}.",
                    bp[44] as u32 + 70,
                    bp[45],
                    bp[46]
                );
            }
            if cnt >= 170 && cw & 0o777 >= 16 {
                info.extra = format_catentry(&bp[10..], cs);
            }
            return info;
        }
    }

    let mut info = RecInfo::of(RecType::Text);
    let mut np = bp;
    let mut hdr = ((bp[0] as u32) << 6) | bp[1] as u32;
    let mut len = ((bp[2] as u32) << 6) | bp[3] as u32;
    dprint!("id_record: hdr {:04o} len {} cnt {}", hdr, len, cnt);

    // 7700 prefix table: extract name and date, then skip over it.
    if hdr == 0o7700 && (len as usize) * 10 + 20 <= cnt {
        info.name = cs.copy_dc(&bp[10..], 7, DC_NOSPC);
        info.date = cs.copy_dc(&bp[20..], 10, DC_NONUL);

        // UPDATE compressed compile: bare 7700 header.
        if len == 0 {
            info.rtype = RecType::Ucf;
            return info;
        }

        // MODIFY compressed compile: word 1 tail bytes in use.
        if bp[17] != 0 || bp[18] != 0 || bp[19] != 0 {
            info.rtype = RecType::Acf;
            return info;
        }

        // Locate the comment field.
        if len >= 14 {
            // Old layout starts the comment in word 3; when word 3 is a
            // time stamp the newer layout applies and it starts in word 8.
            let mut sp = 30usize;
            if is_dc_ts(&bp[30..], 0o57) {
                sp = 80;
            }
            while sp < 110 {
                if is_dc_ts(&bp[sp..], 0o50) || is_dc_ts(&bp[sp..], 0o57) {
                    sp += 10;
                    continue;
                }
                let word = &bp[sp..sp + 10];
                if word.iter().all(|&c| c == 0) {
                    sp += 10;
                    continue;
                }
                if word.iter().all(|&c| c == 0o55) {
                    sp += 10;
                    continue;
                }
                break;
            }
            while sp < 150 && bp[sp] == 0o55 {
                sp += 1;
            }
            let mut extra = cs.copy_dc(&bp[sp..], EXTRA_LEN.min(150 - sp), DC_NONUL);
            let end = extra.find("COPYRIGHT").unwrap_or(extra.len());
            extra.truncate(end);
            while extra.ends_with(' ') {
                extra.pop();
            }
            info.extra = extra;
        }

        np = &bp[(len as usize) * 10 + 10..];
        hdr = ((np[0] as u32) << 6) | np[1] as u32;
        len = ((np[2] as u32) << 6) | np[3] as u32;
        dprint!("id_record: nxt {:04o} len {} cnt {}", hdr, len, np.len());
    }
    let had_7700 = !std::ptr::eq(np.as_ptr(), bp.as_ptr());

    // PP program: 3-char name, load address or digit-led name, nonzero
    // length, zeroes in the middle 12 bits.
    if np.len() >= 10
        && np[0] != 0
        && np[1] != 0
        && np[2] != 0
        && np[3] == 0
        && ((np[0] > 26 && np[0] < 37) || np[4] != 0 || np[5] != 0)
        && np[6] == 0
        && np[7] == 0
        && (np[8] != 0 || np[9] != 0)
    {
        info.rtype = RecType::Pp;
        info.name = cs.copy_dc(np, 3, DC_NOSPC);
        return info;
    }

    // LDSET table between the 7700 prefix and the program header.
    if had_7700 && hdr == 0o7000 && len != 0 && (len as usize) * 10 + 20 <= np.len() {
        np = &np[(len as usize) * 10 + 10..];
        hdr = ((np[0] as u32) << 6) | np[1] as u32;
        len = ((np[2] as u32) << 6) | np[3] as u32;
        dprint!("id_record: ldset skip, nxt {:04o} len {}", hdr, len);
    }

    match hdr {
        0o3400 => {
            info.rtype = RecType::Rel;
            return info;
        }
        0o5000 => {
            info.rtype = if had_7700 { RecType::Ovl } else { RecType::Sdr };
            return info;
        }
        0o5100 => {
            info.rtype = RecType::Abs;
            return info;
        }
        0o5200 => {
            info.rtype = RecType::Ppu;
            return info;
        }
        0o5300 => {
            // OVL unless bit 18 of the entry word is set.
            info.rtype = if np[7] & 0o40 == 0 { RecType::Ovl } else { RecType::Abs };
            return info;
        }
        0o5400 => {
            // ABS for the 00,00 overlay, OVL otherwise.
            info.rtype = if np[4] == 0 && np[5] == 0 { RecType::Abs } else { RecType::Ovl };
            return info;
        }
        0o6000 => {
            // Random OLDPL decks carry a deck directive just past word 1.
            let deck = np.len() >= 18
                && (starts_with(&np[11..], &DC_COMDECK)
                    || starts_with(&np[11..], &DC_DECK)
                    || starts_with(&np[11..], &DC_YANK));
            info.rtype = if deck { RecType::Uplr } else { RecType::Cap };
            return info;
        }
        0o6100 => {
            info.rtype = RecType::Ppl;
            return info;
        }
        0o7000 => {
            info.rtype = RecType::Opld;
            return info;
        }
        0o7001 => {
            info.rtype = RecType::Opl;
            return info;
        }
        0o7002 => {
            info.rtype = RecType::Oplc;
            return info;
        }
        0o7400 => {
            info.rtype = RecType::Dumppf;
            // Catalog entry 8 words into the 7400 table.
            if len >= 16 && np.len() >= 100 {
                info.ui = ((np[97] as i64) << 12) | ((np[98] as i64) << 6) | np[99] as i64;
                if np.len() >= 130 {
                    info.date = format!(
                        "{:02}/{:02}/{:02}.",
                        np[124] as u32 + 70,
                        np[125],
                        np[126]
                    );
                }
                if np.len() >= 170 {
                    info.extra = format_catentry(&np[90..], cs);
                }
            }
            return info;
        }
        0o7500 => {
            info.rtype = RecType::User;
            return info;
        }
        0o7600 => {
            info.rtype = RecType::Ulib;
            return info;
        }
        _ => {}
    }

    if had_7700 {
        info.rtype = RecType::T7700;
        return info;
    }

    info.rtype = RecType::Text;
    info.name = cs.copy_dc(bp, 7, DC_NOSPC);
    info.extra = cs.copy_dc(bp, EXTRA_LEN.min(cnt), DC_TEXT);
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs() -> Charset {
        Charset::new(false)
    }

    /// Encode ASCII uppercase text as display code (subset used in tests).
    fn dc(s: &str) -> Vec<u8> {
        s.chars()
            .map(|c| match c {
                ':' => 0,
                'A'..='Z' => 1 + (c as u8 - b'A'),
                '0'..='9' => 27 + (c as u8 - b'0'),
                '+' => 37,
                '-' => 38,
                '*' => 39,
                '/' => 40,
                '$' => 43,
                ' ' => 0o55,
                ',' => 46,
                '.' => 47,
                _ => panic!("no display code for {:?}", c),
            })
            .collect()
    }

    fn rec(words: usize) -> Vec<u8> {
        vec![0u8; words * 10]
    }

    #[test]
    fn empty_record() {
        assert_eq!(id_record(&[], &cs()).rtype, RecType::Empty);
    }

    #[test]
    fn proc_prefix() {
        let mut bp = rec(2);
        bp[..6].copy_from_slice(&dc(".PROC,"));
        bp[6..11].copy_from_slice(&dc("HELLO"));
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Proc);
        assert_eq!(info.name, "HELLO");
    }

    #[test]
    fn update_check_header() {
        let mut bp = rec(2);
        bp[..5].copy_from_slice(&dc("CHECK"));
        bp[6] = 0o36; // charset flag, ignored here
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Upl);
        // High bits of byte 5 in use: not an OLDPL header; falls to TEXT.
        bp[5] = 0o40;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Text);
    }

    #[test]
    fn update_random_directory() {
        let mut bp = rec(2);
        bp[..7].copy_from_slice(&dc("YANK$$$"));
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Upld);
    }

    #[test]
    fn pfdump_end_sentinel() {
        let mut bp = rec(2);
        bp[7] = 0o07;
        bp[8] = 0o70;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Pflbl);
    }

    fn pfdump_file(nwords: usize, cwlow: u32) -> Vec<u8> {
        let mut bp = rec(nwords);
        let name = dc("FOO");
        bp[..3].copy_from_slice(&name);
        bp[10..13].copy_from_slice(&name);
        bp[7] = 0o01; // control word 011cww
        bp[8] = 0o10 | ((cwlow >> 6) as u8 & 0o7);
        bp[9] = (cwlow & 0o77) as u8;
        bp[17] = 0o37; // ui 0377701 = SYSLIB
        bp[18] = 0o77;
        bp[19] = 0o01;
        bp
    }

    #[test]
    fn pfdump_file_with_ui_and_date() {
        let mut bp = pfdump_file(6, 4);
        bp[44] = 10; // 1980
        bp[45] = 1;
        bp[46] = 2;
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Pfdump);
        assert_eq!(info.name, "FOO");
        assert_eq!(info.ui, 0o377701);
        assert_eq!(info.date, "80/01/02.");
    }

    #[test]
    fn pfdump_name_mismatch_is_not_pfdump() {
        let mut bp = pfdump_file(6, 4);
        bp[11] = 0o10; // word 1 name differs
        assert_ne!(id_record(&bp, &cs()).rtype, RecType::Pfdump);
    }

    #[test]
    fn pfdump_label_record() {
        let mut bp = rec(8);
        // Words 0 and 1 both spell the label's file name, PFDUMP.
        bp[..6].copy_from_slice(&dc("PFDUMP"));
        bp[10..16].copy_from_slice(&dc("PFDUMP"));
        bp[7] = 0;
        bp[8] = 0o11; // control word 0o1100
        bp[9] = 0;
        bp[40..49].copy_from_slice(&dc("80/01/02."));
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Pflbl);
        assert_eq!(info.name, "PFDUMP");
        assert_eq!(info.date, "80/01/02.");
        assert!(info.extra.starts_with("reel "), "extra: {:?}", info.extra);
    }

    /// Builds a 7700 prefix table of `len` words with name and dates.
    fn with_7700(len: usize, total_words: usize) -> Vec<u8> {
        let mut bp = rec(total_words);
        bp[0] = 0o77;
        bp[1] = 0;
        bp[2] = (len >> 6) as u8;
        bp[3] = (len & 0o77) as u8;
        bp[10..16].copy_from_slice(&dc("SAMPLE"));
        if len >= 3 {
            bp[20..29].copy_from_slice(&dc("80/01/01."));
        }
        bp
    }

    #[test]
    fn bare_7700_is_ucf() {
        let bp = with_7700(0, 2);
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Ucf);
        assert_eq!(info.name, "SAMPLE");
    }

    #[test]
    fn used_word1_tail_is_acf() {
        let mut bp = with_7700(3, 6);
        bp[19] = 1;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Acf);
    }

    #[test]
    fn opl_behind_7700() {
        let mut bp = with_7700(3, 8);
        bp[40] = 0o70; // 7001 mod table follows the prefix
        bp[41] = 0o01;
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Opl);
        assert_eq!(info.name, "SAMPLE");
        assert_eq!(info.date, "80/01/01.");
    }

    #[test]
    fn oplc_and_opld_tags() {
        let mut bp = rec(4);
        bp[0] = 0o70;
        bp[1] = 0o02;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Oplc);
        bp[1] = 0;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Opld);
    }

    #[test]
    fn fixed_header_tags() {
        let tag = |b0: u8, b1: u8| {
            let mut bp = rec(4);
            bp[0] = b0;
            bp[1] = b1;
            id_record(&bp, &cs()).rtype
        };
        assert_eq!(tag(0o34, 0), RecType::Rel);
        assert_eq!(tag(0o50, 0), RecType::Sdr); // no 7700 prefix
        assert_eq!(tag(0o51, 0), RecType::Abs);
        assert_eq!(tag(0o52, 0), RecType::Ppu);
        assert_eq!(tag(0o61, 0), RecType::Ppl);
        assert_eq!(tag(0o75, 0), RecType::User);
        assert_eq!(tag(0o76, 0), RecType::Ulib);
    }

    #[test]
    fn ovl_behind_7700_5000() {
        let mut bp = with_7700(3, 8);
        bp[40] = 0o50;
        bp[41] = 0;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Ovl);
    }

    #[test]
    fn abs_ovl_discrimination_5300_5400() {
        let mut bp = rec(4);
        bp[0] = 0o53;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Ovl);
        bp[7] = 0o40;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Abs);

        let mut bp = rec(4);
        bp[0] = 0o54;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Abs);
        bp[4] = 1; // nonzero overlay origin
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Ovl);
    }

    #[test]
    fn random_oldpl_vs_capsule() {
        let mut bp = rec(4);
        bp[0] = 0o60;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Cap);
        bp[11..15].copy_from_slice(&dc("DECK"));
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Uplr);
        bp[11..18].copy_from_slice(&dc("COMDECK"));
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::Uplr);
    }

    #[test]
    fn pp_program_shape() {
        let mut bp = rec(4);
        bp[..3].copy_from_slice(&dc("1AJ"));
        bp[4] = 0o10; // load address
        bp[8] = 0o02; // length
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Pp);
        assert_eq!(info.name, "1AJ");
    }

    #[test]
    fn dumppf_with_catalog_entry() {
        let mut bp = rec(20);
        bp[0] = 0o74;
        bp[2] = 0;
        bp[3] = 17; // table length >= 16
        // Catalog entry: word 9 carries the ui, word 12 the mdate.
        bp[97] = 0o37;
        bp[98] = 0o77;
        bp[99] = 0o77;
        bp[124] = 12; // 1982
        bp[125] = 3;
        bp[126] = 4;
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Dumppf);
        assert_eq!(info.ui, 0o377777);
        assert_eq!(info.date, "82/03/04.");
    }

    #[test]
    fn text_fallback_takes_name_and_line() {
        let mut bp = rec(2);
        bp[..5].copy_from_slice(&dc("HELLO"));
        // 0,0 terminator ends the first line.
        let info = id_record(&bp, &cs());
        assert_eq!(info.rtype, RecType::Text);
        assert_eq!(info.name, "HELLO");
        // The end-of-line join leaves its two-space separator behind.
        assert_eq!(info.extra, "HELLO  ");
    }

    #[test]
    fn unknown_body_behind_7700() {
        let mut bp = with_7700(3, 8);
        bp[40] = 0o12; // no recognizable header follows
        bp[41] = 0o01;
        bp[42] = 0o01;
        assert_eq!(id_record(&bp, &cs()).rtype, RecType::T7700);
    }
}
