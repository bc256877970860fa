//! MODIFY and UPDATE program-library extraction.
//!
//! Three decoders share one line engine. Every source line is stored as a
//! header word (active flag, compressed word count, sequence number), a
//! chain of 18-bit modification-history entries, and a run of words holding
//! the byte-compressed text. [`expand_text`] reverses the compression: `00`
//! starts an escape, `00 00` ends the line, `00 xx` expands to `xx + 1`
//! spaces, and the `0077` / `007700` forms re-escape a literal `0o77` and a
//! following space run.
//!
//! The MODIFY form (OPL/OPLC) is introduced by a 7700 prefix table carrying
//! the deck name, dates, and charset flag, followed by a 7001/7002 table
//! naming the modsets. The UPDATE sequential form (UPL) opens with a
//! `CHECK` header and an identifier directory; the random form (UPLR)
//! stores its directory in a separate record, so mods print as `d<octal>`.

use chrono::NaiveDate;

use crate::config::{verbose, Config};
use crate::dcode::{Charset, DC_ALNUM, DC_NONUL};
use crate::dprint;
use crate::ifmt::{CdcReader, Word};
use crate::outfile::{out_open, parse_date, set_mtime};
use crate::ExtractError;

use bitflags::bitflags;

/// Longest expanded line.
pub const MAXLEN: usize = 160;

bitflags! {
    /// Charset behavior of the line engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExpandFlags: u8 {
        /// 64-character set: `00 01` expands to `:`.
        const IS_64 = 1;
        /// MODIFY 63-character set: code 0o63 is always `:`.
        const COL_63 = 2;
    }
}

// ── Modification history ──────────────────────────────────────────────────────

/// Walks the 18-bit history entries of one line, starting at char `idx` of
/// the header word. An entry with the top bit set names the mod that last
/// activated the line; a zero entry ends the chain. Continuation words flag
/// their last-word status in char 0 under `lastmask` (0o40 for UPDATE PLs,
/// 0 for MODIFY, which has no such flag).
///
/// Returns `None` on early end-of-record, otherwise the activating mod
/// number (-1 when no entry named one).
fn read_hist(cd: &mut CdcReader, first: &Word, idx: usize, lastmask: u8) -> Option<i64> {
    let mut cp = *first;
    let mut idx = idx;
    let mut rv = -1i64;

    loop {
        let hist =
            ((cp[idx] as u32) << 12) | ((cp[idx + 1] as u32) << 6) | cp[idx + 2] as u32;
        if hist == 0 {
            break;
        }
        if hist & 0o400000 != 0 {
            rv = (hist & 0o377777) as i64;
        }
        idx += 3;
        if idx > 9 {
            if cp[0] & lastmask != 0 {
                break;
            }
            cp = cd.get_word()?;
            idx = 1;
        }
    }

    Some(rv)
}

// ── Line engine ───────────────────────────────────────────────────────────────

/// Failure modes of the line engine.
#[derive(Debug, PartialEq, Eq)]
pub enum LineError {
    /// Expanded line exceeded [`MAXLEN`] characters.
    TooLong,
    /// End-of-record in the middle of the compressed text.
    Eor,
}

/// Expands `wc` words of compressed text into `obuf`.
///
/// Returns the count of declared words left unconsumed when the end-of-line
/// marker arrived early (the caller treats nonzero as a malformed line).
pub fn expand_text(
    cd: &mut CdcReader,
    wc: usize,
    obuf: &mut String,
    flags: ExpandFlags,
    cs: &Charset,
) -> Result<usize, LineError> {
    // 0 = default, 1 = saw 00, 2 = saw 0077, 3 = saw 007700.
    let mut state = 0u8;
    let mut wc = wc;

    while wc > 0 {
        let cp = cd.get_word().ok_or(LineError::Eor)?;
        let mut eol = false;
        for &c in cp.iter() {
            if c == 0 {
                match state {
                    1 => {
                        eol = true;
                        break;
                    }
                    2 => {
                        state = 3;
                        continue;
                    }
                    3 => {
                        // 00770000 is invalid; treat the second pair as a
                        // fresh 00.
                        dprint!("expand_text: 00770000");
                        state = 1;
                        continue;
                    }
                    _ => {
                        state = 1;
                        continue;
                    }
                }
            }

            // 0001 is the colon of the 64-character set.
            if state == 1 && c == 1 && flags.contains(ExpandFlags::IS_64) {
                if obuf.len() >= MAXLEN {
                    return Err(LineError::TooLong);
                }
                obuf.push(cs.dc(0));
                state = 0;
                continue;
            }

            // 00xx and 007700xx expand to xx+1 spaces.
            if state == 1 || state == 3 {
                state = 0;
                if obuf.len() + c as usize + 1 > MAXLEN {
                    return Err(LineError::TooLong);
                }
                for _ in 0..=c {
                    obuf.push(' ');
                }
                if c == 0o77 {
                    state = 2;
                }
                continue;
            }

            // Plain character (or the 0077-escaped literal).
            state = 0;
            if obuf.len() >= MAXLEN {
                return Err(LineError::TooLong);
            }
            if c == 0o63 && flags.contains(ExpandFlags::COL_63) {
                obuf.push(':');
            } else {
                obuf.push(cs.dc(c));
            }
        }

        wc -= 1;
        if eol {
            break;
        }
    }

    Ok(wc)
}

// ── Shared line loop ──────────────────────────────────────────────────────────

struct LineHeader {
    active: bool,
    wc: usize,
    seq: u32,
    modnum: i64,
}

/// Parses one MODIFY line header: char 0 carries the active bit (0o40) and
/// a 5-bit word count; chars 1-3 the sequence; history starts at char 4.
fn opl_line_header(cd: &mut CdcReader, cp: &Word) -> Option<LineHeader> {
    let active = cp[0] & 0o40 != 0;
    let wc = (cp[0] & 0o37) as usize;
    let seq = ((cp[1] as u32) << 12) | ((cp[2] as u32) << 6) | cp[3] as u32;
    let modnum = read_hist(cd, cp, 4, 0)?;
    Some(LineHeader { active, wc, seq, modnum })
}

/// Parses one UPDATE line header: char 0 bit 0o20 is the active flag and
/// bit 0o40 the last-history-word flag; chars 1-3 the word count, 4-6 the
/// sequence; history starts at char 7.
fn upl_line_header(cd: &mut CdcReader, cp: &Word) -> Option<LineHeader> {
    let active = cp[0] & 0o20 != 0;
    let wc = (((cp[1] as u32) << 12) | ((cp[2] as u32) << 6) | cp[3] as u32) as usize;
    let seq = ((cp[4] as u32) << 12) | ((cp[5] as u32) << 6) | cp[6] as u32;
    let modnum = read_hist(cd, cp, 7, 0o40)?;
    Some(LineHeader { active, wc, seq, modnum })
}

fn decode_err(e: LineError) -> ExtractError {
    match e {
        LineError::Eor => ExtractError::decode("EOR reading compressed text"),
        LineError::TooLong => ExtractError::decode("line too long in compressed text"),
    }
}

// ── MODIFY OPL / OPLC ─────────────────────────────────────────────────────────

/// Extracts a MODIFY OPL or OPLC deck to `<name>.txt`.
pub fn extract_opl(cd: &mut CdcReader, name: &str, cfg: &Config) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    dprint!("extract_opl: {}", name);

    // 7700 prefix table.
    let cp = cd.get_word().ok_or_else(|| ExtractError::decode("no 7700 table"))?;
    if cp[0] != 0o77 || cp[1] != 0 {
        return Err(ExtractError::decode("no 7700 table"));
    }
    let len = (((cp[2] as u32) << 6) | cp[3] as u32) as usize;
    dprint!("extract_opl: 7700 len={}", len);

    let cp = cd
        .get_word()
        .ok_or_else(|| ExtractError::decode("short 7700 table"))?;
    let deck = cs.copy_dc(&cp, 7, DC_ALNUM);
    let mut nread = 1;

    let mut date: Option<NaiveDate> = None;
    if len >= 3 {
        let cp = cd
            .get_word()
            .ok_or_else(|| ExtractError::decode("EOR reading cdate from 7700 table"))?;
        let mut mdate = cs.copy_dc(&cp, 10, DC_NONUL);
        let cp = cd
            .get_word()
            .ok_or_else(|| ExtractError::decode("EOR reading mdate from 7700 table"))?;
        if cp[0] != 0 {
            // Prefer the modification date when one is recorded.
            mdate = cs.copy_dc(&cp, 10, DC_NONUL);
        }
        nread = 3;
        date = parse_date(&mdate);
    }

    let mut flags = ExpandFlags::COL_63;
    let mut is_ascii = false;
    if len >= 14 {
        if !cd.skip_words(13 - nread) {
            return Err(ExtractError::decode("EOR reading 7700 table"));
        }
        let cp = cd
            .get_word()
            .ok_or_else(|| ExtractError::decode("EOR reading charset from 7700 table"))?;
        if cp[8] <= 1 && cp[9] == 0o64 {
            flags = ExpandFlags::IS_64;
        }
        if cp[8] == 1 && (cp[9] == 0 || cp[9] == 0o64) {
            is_ascii = true;
        }
        nread = 14;
    }

    dprint!("extract_opl: nread {} ascii {} flags {:?}", nread, is_ascii, flags);
    if !cd.skip_words(len.saturating_sub(nread)) {
        return Err(ExtractError::decode("EOR skipping over 7700 table"));
    }

    // 7001/7002 modset table.
    let cp = cd.get_word().ok_or_else(|| ExtractError::decode("no 700x table"))?;
    if cp[0] != 0o70 || (cp[1] != 1 && cp[1] != 2) {
        return Err(ExtractError::decode("no 700x table"));
    }
    let nmods = ((((cp[8] as u32) << 6) | cp[9] as u32) + 1) as usize;
    let mut mods = Vec::with_capacity(nmods);
    mods.push(deck.clone());
    for _ in 1..nmods {
        let cp = cd
            .get_word()
            .ok_or_else(|| ExtractError::decode("700x table too short"))?;
        let m = cs.copy_dc(&cp, 7, DC_ALNUM);
        dprint!(
            "extract_opl: mod {}{}",
            m,
            if cp[7] & 0o20 != 0 { " (yanked)" } else { "" }
        );
        mods.push(m);
    }

    let Ok(mut of) = out_open(cfg.to_stdout, name, "txt") else {
        cd.skip_record();
        return Err(ExtractError::Suppressed);
    };

    // Text lines.
    while let Some(cp) = cd.get_word() {
        let Some(line) = opl_line_header(cd, &cp) else {
            of.abandon();
            return Err(ExtractError::decode("EOR reading modification history"));
        };
        let modname = if line.modnum >= 0 {
            mods.get(line.modnum as usize).map(String::as_str).unwrap_or("invalid")
        } else {
            "unknown"
        };

        if !line.active {
            if !cd.skip_words(line.wc) {
                break;
            }
            continue;
        }

        dprint!("extract_opl: line {}:{} wc={}", modname, line.seq, line.wc);

        let mut obuf = String::new();
        match expand_text(cd, line.wc, &mut obuf, flags, cs) {
            Err(e) => {
                of.abandon();
                return Err(decode_err(e));
            }
            Ok(left) if left != 0 => {
                of.abandon();
                return Err(ExtractError::decode("missing EOL in compressed text"));
            }
            Ok(_) => {}
        }

        let r = if verbose() > 0 {
            of.write_line(&format!("{:<72.72}{:<7}{:>6}", obuf, modname, line.seq))
        } else {
            of.write_line(&obuf)
        };
        if let Err(e) = r {
            of.abandon();
            return Err(ExtractError::decode(format!("write error: {}", e)));
        }
    }

    let path = of.finish().map_err(|e| ExtractError::decode(format!("close error: {}", e)))?;
    if let (Some(path), Some(d)) = (path, date) {
        if let Some(dt) = d.and_hms_opt(12, 0, 0) {
            set_mtime(&path, dt);
        }
    }
    Ok(())
}

// ── UPDATE sequential PL ──────────────────────────────────────────────────────

/// Extracts an UPDATE sequential PL to `<name>.txt`. `date`, when known,
/// becomes the output file's modification date.
pub fn extract_upl(
    cd: &mut CdcReader,
    name: &str,
    date: Option<NaiveDate>,
    cfg: &Config,
) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    dprint!("extract_upl: {}", name);

    // Sequential OLDPL header: must start with "CHECK".
    let cp = cd
        .get_word()
        .ok_or_else(|| ExtractError::decode("invalid OLDPL header"))?;
    if cp[..5] != [0o03, 0o10, 0o05, 0o03, 0o13] || cp[5] & 0o76 != 0 {
        return Err(ExtractError::decode("invalid OLDPL header"));
    }
    let flags = if cp[6] != 0o36 {
        ExpandFlags::IS_64
    } else {
        ExpandFlags::empty()
    };

    let cp = cd
        .get_word()
        .ok_or_else(|| ExtractError::decode("short OLDPL header"))?;
    let idcnt = (((cp[4] as u32) << 12) | ((cp[5] as u32) << 6) | cp[6] as u32) as usize;
    let deckcnt = (((cp[7] as u32) << 12) | ((cp[8] as u32) << 6) | cp[9] as u32) as usize;
    dprint!("extract_upl: ids {} decks {}", idcnt, deckcnt);

    // Identifier directory.
    let mut ids = Vec::with_capacity(idcnt);
    for _ in 0..idcnt {
        let cp = cd
            .get_word()
            .ok_or_else(|| ExtractError::decode("OLDPL directory too short"))?;
        let id = cs.copy_dc(&cp, 9, DC_ALNUM);
        dprint!("extract_upl: mod {}", id);
        ids.push(id);
    }

    // Deck list is not needed for extraction.
    if !cd.skip_words(deckcnt) {
        return Err(ExtractError::decode("EOR skipping over OLDPL deck list"));
    }

    let Ok(mut of) = out_open(cfg.to_stdout, name, "txt") else {
        cd.skip_record();
        return Err(ExtractError::Suppressed);
    };

    let width = if verbose() > 1 { 80 } else { 72 };
    while let Some(cp) = cd.get_word() {
        // A word with five leading nulls is the deck checksum.
        if cp[..5] == [0, 0, 0, 0, 0] {
            break;
        }

        let Some(line) = upl_line_header(cd, &cp) else {
            of.abandon();
            return Err(ExtractError::decode("EOR reading modification history"));
        };
        let modname = if line.modnum > 0 {
            ids.get(line.modnum as usize - 1).map(String::as_str).unwrap_or("invalid")
        } else {
            "unknown"
        };

        if !line.active {
            if !cd.skip_words(line.wc) {
                break;
            }
            continue;
        }

        dprint!("extract_upl: line {}:{} wc={}", modname, line.seq, line.wc);

        let mut obuf = String::new();
        match expand_text(cd, line.wc, &mut obuf, flags, cs) {
            Err(e) => {
                of.abandon();
                return Err(decode_err(e));
            }
            Ok(left) if left != 0 => {
                of.abandon();
                return Err(ExtractError::decode("missing EOL in compressed text"));
            }
            Ok(_) => {}
        }

        let r = if verbose() > 0 {
            of.write_line(&format!(
                "{:<w$.w$}{}.{}",
                obuf,
                modname,
                line.seq,
                w = width
            ))
        } else {
            of.write_line(&obuf)
        };
        if let Err(e) = r {
            of.abandon();
            return Err(ExtractError::decode(format!("write error: {}", e)));
        }
    }

    let path = of.finish().map_err(|e| ExtractError::decode(format!("close error: {}", e)))?;
    if let (Some(path), Some(d)) = (path, date) {
        if let Some(dt) = d.and_hms_opt(12, 0, 0) {
            set_mtime(&path, dt);
        }
    }
    Ok(())
}

// ── UPDATE random PL ──────────────────────────────────────────────────────────

/// Extracts an UPDATE random PL deck to `<name>.txt`.
///
/// The identifier directory of a random PL lives in a separate record that
/// this decoder has no access to, so mods print as `d<octal>` from the raw
/// mod number.
pub fn extract_uplr(
    cd: &mut CdcReader,
    name: &str,
    date: Option<NaiveDate>,
    cfg: &Config,
) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    let flags = if cs.is_63() {
        ExpandFlags::empty()
    } else {
        ExpandFlags::IS_64
    };
    dprint!("extract_uplr: {}", name);

    let Ok(mut of) = out_open(cfg.to_stdout, name, "txt") else {
        cd.skip_record();
        return Err(ExtractError::Suppressed);
    };

    let width = if verbose() > 1 { 80 } else { 72 };
    while let Some(cp) = cd.get_word() {
        let Some(line) = upl_line_header(cd, &cp) else {
            of.abandon();
            return Err(ExtractError::decode("EOR reading modification history"));
        };

        if !line.active {
            if !cd.skip_words(line.wc) {
                break;
            }
            continue;
        }

        dprint!("extract_uplr: line d{:06o}:{} wc={}", line.modnum.max(0), line.seq, line.wc);

        let mut obuf = String::new();
        match expand_text(cd, line.wc, &mut obuf, flags, cs) {
            Err(e) => {
                of.abandon();
                return Err(decode_err(e));
            }
            Ok(left) if left != 0 => {
                of.abandon();
                return Err(ExtractError::decode("missing EOL in compressed text"));
            }
            Ok(_) => {}
        }

        let r = if verbose() > 0 {
            of.write_line(&format!(
                "{:<w$.w$}d{:06o}.{}",
                obuf,
                line.modnum.max(0),
                line.seq,
                w = width
            ))
        } else {
            of.write_line(&obuf)
        };
        if let Err(e) = r {
            of.abandon();
            return Err(ExtractError::decode(format!("write error: {}", e)));
        }
    }

    let path = of.finish().map_err(|e| ExtractError::decode(format!("close error: {}", e)))?;
    if let (Some(path), Some(d)) = (path, date) {
        if let Some(dt) = d.and_hms_opt(12, 0, 0) {
            set_mtime(&path, dt);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifmt::{CdcWriter, Word};
    use crate::simtap::{TapeItem, TapeReader, TapeWriter};
    use tempfile::TempDir;

    /// Packs a flat char list into words (zero-padded) on a fresh tape and
    /// returns the opened reader positioned past the first block.
    fn tape_with(dir: &TempDir, chars: &[u8]) -> (TapeReader, Vec<u8>) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let path = dir
            .path()
            .join(format!("in{}.tap", SEQ.fetch_add(1, Ordering::Relaxed)));
        let mut w = CdcWriter::new(TapeWriter::create(&path).unwrap());
        for chunk in chars.chunks(10) {
            let mut word: Word = [0u8; 10];
            word[..chunk.len()].copy_from_slice(chunk);
            w.put_word(&word).unwrap();
        }
        w.write_eor().unwrap();
        w.finish().unwrap();

        let mut tap = TapeReader::open(&path).unwrap();
        let first = match tap.read_block().unwrap() {
            Some(TapeItem::Block(b)) => b.to_vec(),
            other => panic!("expected data block, got {:?}", other),
        };
        (tap, first)
    }

    #[test]
    fn expand_plain_text_and_eol() {
        let dir = TempDir::new().unwrap();
        // "AB", 00 00 end-of-line, in one word.
        let (mut tap, first) = tape_with(&dir, &[0o01, 0o02, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        let left = expand_text(&mut cd, 1, &mut obuf, ExpandFlags::COL_63, &Charset::new(false))
            .unwrap();
        assert_eq!(left, 0);
        assert_eq!(obuf, "AB");
    }

    #[test]
    fn expand_space_runs() {
        let dir = TempDir::new().unwrap();
        // "A", 00 04 (five spaces), "B", EOL.
        let (mut tap, first) = tape_with(&dir, &[0o01, 0, 4, 0o02, 0, 0, 0, 0, 0, 0]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        expand_text(&mut cd, 1, &mut obuf, ExpandFlags::empty(), &Charset::new(false)).unwrap();
        assert_eq!(obuf, "A     B");
    }

    #[test]
    fn expand_colon_escape_in_64_set() {
        let dir = TempDir::new().unwrap();
        // 00 01 is ':' in the 64-character set.
        let (mut tap, first) = tape_with(&dir, &[0o01, 0, 1, 0o02, 0, 0, 0, 0, 0, 0]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        expand_text(&mut cd, 1, &mut obuf, ExpandFlags::IS_64, &Charset::new(false)).unwrap();
        assert_eq!(obuf, "A:B");

        // Without IS_64 the same bytes are a two-space run.
        let (mut tap, first) = tape_with(&dir, &[0o01, 0, 1, 0o02, 0, 0, 0, 0, 0, 0]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        expand_text(&mut cd, 1, &mut obuf, ExpandFlags::empty(), &Charset::new(false)).unwrap();
        assert_eq!(obuf, "A  B");
    }

    #[test]
    fn expand_0077_escapes() {
        let dir = TempDir::new().unwrap();
        // 00 77: 64 spaces then escape state; following 0o26 'V' is literal.
        let mut chars = vec![0u8, 0o77, 0o26];
        chars.resize(10, 0);
        let (mut tap, first) = tape_with(&dir, &chars);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        expand_text(&mut cd, 1, &mut obuf, ExpandFlags::empty(), &Charset::new(false)).unwrap();
        assert_eq!(obuf.len(), 64 + 1);
        assert!(obuf.ends_with('V'));
    }

    #[test]
    fn expand_line_too_long() {
        let dir = TempDir::new().unwrap();
        // Three 00 77 space runs exceed 160 characters.
        let chars = vec![0u8, 0o77, 0, 0o77, 0, 0o77, 0o01, 0, 0, 0];
        let (mut tap, first) = tape_with(&dir, &chars);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        let err = expand_text(&mut cd, 1, &mut obuf, ExpandFlags::empty(), &Charset::new(false))
            .unwrap_err();
        assert_eq!(err, LineError::TooLong);
    }

    #[test]
    fn expand_reports_eor() {
        let dir = TempDir::new().unwrap();
        let (mut tap, first) = tape_with(&dir, &[0o01; 10]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        let mut obuf = String::new();
        // Claims three words but the record only holds one.
        let err = expand_text(&mut cd, 3, &mut obuf, ExpandFlags::empty(), &Charset::new(false))
            .unwrap_err();
        assert_eq!(err, LineError::Eor);
    }

    #[test]
    fn read_hist_finds_activating_mod() {
        let dir = TempDir::new().unwrap();
        let (mut tap, first) = tape_with(&dir, &[0o01; 10]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        // Entry 0o400005 (activated by mod 5) then a zero entry, inline.
        let mut w: Word = [0; 10];
        w[4] = 0o40;
        w[5] = 0;
        w[6] = 5;
        assert_eq!(read_hist(&mut cd, &w, 4, 0), Some(5));
    }

    #[test]
    fn read_hist_last_word_flag_stops_update_chains() {
        let dir = TempDir::new().unwrap();
        let (mut tap, first) = tape_with(&dir, &[0o01; 10]);
        let mut cd = CdcReader::new(&mut tap, &first, true);
        // Header word with the 0o40 last-word flag and a full history word:
        // the chain must stop without reading another word.
        let mut w: Word = [0; 10];
        w[0] = 0o40 | 0o20;
        w[7] = 0o40;
        w[8] = 0;
        w[9] = 2;
        assert_eq!(read_hist(&mut cd, &w, 7, 0o40), Some(2));
    }
}
