//! CDC display-code translation.
//!
//! A [`Charset`] holds the three 64-entry translation maps: the base map
//! (`dcmap`), the 74-escape map (upper half of the 6/12 ASCII extension) and
//! the 76-escape map (lowercase and control codes). The maps are built once
//! from the 63/64-character-set choice and never change afterward; decoders
//! receive the charset by shared borrow.
//!
//! [`Charset::copy_dc`] is the workhorse used everywhere a display-coded
//! field becomes host text: it translates up to `max` 6-bit chars with
//! flag-selected termination, including the catalog's join-lines mode that
//! understands the CDC end-of-line encoding (a run of nulls reaching the end
//! of a word, where a line ending in character position 9 spills the run
//! into the following word).

use std::io::{self, Write};

use bitflags::bitflags;

use crate::config::verbose;

// ── Translation tables ────────────────────────────────────────────────────────

const DCMAP: [char; 64] = [
    ':', 'A', 'B', 'C', 'D', 'E', 'F', 'G', //
    'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', //
    'X', 'Y', 'Z', '0', '1', '2', '3', '4', //
    '5', '6', '7', '8', '9', '+', '-', '*', //
    '/', '(', ')', '$', '=', ' ', ',', '.', //
    '#', '[', ']', '%', '"', '_', '!', '&', //
    '\'', '?', '<', '>', '@', '\\', '^', ';',
];

const C74MAP: [&str; 64] = [
    "@:", "@", "^", "@C", ":", "@E", "@F", "`", //
    "@H", "@I", "@J", "@K", "@L", "@M", "@N", "@O", //
    "@P", "@Q", "@R", "@S", "@T", "@U", "@V", "@W", //
    "@X", "@Y", "@Z", "@0", "@1", "@2", "@3", "@4", //
    "@5", "@6", "@7", "@8", "@9", "@+", "@-", "@*", //
    "@/", "@(", "@)", "@$", "@=", "@ ", "@,", "@.", //
    "@#", "@[", "@]", "@%", "@\"", "@_", "@!", "@&", //
    "@'", "@?", "@<", "@>", "@@", "@\\", "@^", "@;",
];

const C76MAP: [&str; 64] = [
    "^:", "a", "b", "c", "d", "e", "f", "g", //
    "h", "i", "j", "k", "l", "m", "n", "o", //
    "p", "q", "r", "s", "t", "u", "v", "w", //
    "x", "y", "z", "{", "|", "}", "~", "\u{7f}", //
    "\u{00}", "\u{01}", "\u{02}", "\u{03}", "\u{04}", "\u{05}", "\u{06}", "\u{07}", //
    "\u{08}", "\u{09}", "\u{0a}", "\u{0b}", "\u{0c}", "\u{0d}", "\u{0e}", "\u{0f}", //
    "\u{10}", "\u{11}", "\u{12}", "\u{13}", "\u{14}", "\u{15}", "\u{16}", "\u{17}", //
    "\u{18}", "\u{19}", "\u{1a}", "\u{1b}", "\u{1c}", "\u{1d}", "\u{1e}", "\u{1f}",
];

bitflags! {
    /// Termination behavior for [`Charset::copy_dc`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CopyFlags: u8 {
        /// Stop at the first non-alphanumeric character (code > 36).
        const ALNUM_ONLY = 1;
        /// Stop at the first space (code 0o55).
        const STOP_SPACE = 2;
        /// Stop at the first null.
        const STOP_NUL = 4;
        /// Recognize the end-of-line null run and join lines with two spaces.
        const JOIN_EOL = 8;
    }
}

/// Entire buffer, no termination.
pub const DC_ALL: CopyFlags = CopyFlags::empty();
/// Any character, terminate on null.
pub const DC_NONUL: CopyFlags = CopyFlags::STOP_NUL;
/// Any character, terminate on space or null.
pub const DC_NOSPC: CopyFlags = CopyFlags::STOP_SPACE.union(CopyFlags::STOP_NUL);
/// Alphanumeric, null-terminated.
pub const DC_ALNUM: CopyFlags = CopyFlags::ALNUM_ONLY
    .union(CopyFlags::STOP_SPACE)
    .union(CopyFlags::STOP_NUL);
/// Free text: join lines at CDC end-of-line, terminate on a lone null.
pub const DC_TEXT: CopyFlags = CopyFlags::JOIN_EOL.union(CopyFlags::STOP_NUL);

// ── Charset ───────────────────────────────────────────────────────────────────

/// Display-code maps for one run, built from the 63/64-character choice.
#[derive(Debug, Clone)]
pub struct Charset {
    dcmap: [char; 64],
    c74map: [&'static str; 64],
    c76map: [&'static str; 64],
    sixty_three: bool,
}

impl Charset {
    /// Builds the maps. With `sixty_three` set, code 0o63 becomes `:` and
    /// the 74-escape for octal 04 becomes `%`.
    pub fn new(sixty_three: bool) -> Self {
        let mut dcmap = DCMAP;
        let mut c74map = C74MAP;
        if sixty_three {
            dcmap[0o63] = ':';
            c74map[0o04] = "%";
        }
        Charset {
            dcmap,
            c74map,
            c76map: C76MAP,
            sixty_three,
        }
    }

    /// `true` when the 63-character set was selected.
    #[inline]
    pub fn is_63(&self) -> bool {
        self.sixty_three
    }

    /// Base-map translation of one 6-bit character.
    #[inline]
    pub fn dc(&self, c: u8) -> char {
        self.dcmap[(c & 0o77) as usize]
    }

    /// 74-escape translation (previous character was 0o74).
    #[inline]
    pub fn c74(&self, c: u8) -> &'static str {
        self.c74map[(c & 0o77) as usize]
    }

    /// 76-escape translation (previous character was 0o76).
    #[inline]
    pub fn c76(&self, c: u8) -> &'static str {
        self.c76map[(c & 0o77) as usize]
    }

    /// Translates up to `max` chars of `src` into host text.
    ///
    /// Termination is flag-driven; see [`CopyFlags`] and the `DC_*` presets.
    /// In [`CopyFlags::JOIN_EOL`] mode a null run reaching the end of the
    /// current word (scanning one word further when the run starts in char
    /// position 9) is the CDC end-of-line; it is replaced by two spaces and
    /// translation resumes with the next line unless the record ends there.
    pub fn copy_dc(&self, src: &[u8], max: usize, flags: CopyFlags) -> String {
        let max = max.min(src.len());
        let mut out = String::new();
        let mut i = 0usize;
        while i < max {
            let c = src[i];
            if flags.contains(CopyFlags::JOIN_EOL) && c == 0 {
                // Candidate end-of-line: nulls must run to the end of the
                // word, where a line ending in position 9 also consumes the
                // following word.
                let mut j = i / 10 * 10;
                if i - j == 9 {
                    j += 10;
                }
                j = (j + 10).min(max);
                let mut k = i + 1;
                while k < j && src[k] == 0 {
                    k += 1;
                }
                if k == j {
                    if j + 2 < max {
                        out.push(' ');
                        out.push(' ');
                    }
                    i = j;
                    continue;
                }
            }
            if flags.contains(CopyFlags::ALNUM_ONLY) && c > 36 {
                break;
            }
            if flags.contains(CopyFlags::STOP_SPACE) && c == 0o55 {
                break;
            }
            if flags.contains(CopyFlags::STOP_NUL) && c == 0 {
                break;
            }
            out.push(self.dc(c));
            i += 1;
        }
        out
    }
}

// ── Timestamp probe ───────────────────────────────────────────────────────────

/// Checks for a display-coded `yy/mm/dd.` or `hh.mm.ss.` stamp at `sp`,
/// tolerating one leading space. `sep` is the display code of the two inner
/// separators (0o50 for `/`, 0o57 for `.`).
pub fn is_dc_ts(sp: &[u8], sep: u8) -> bool {
    let sp = if sp.first() == Some(&0o55) { &sp[1..] } else { sp };
    if sp.len() < 9 {
        return false;
    }
    if sp[2] != sep || sp[5] != sep || sp[8] != 0o57 {
        return false;
    }
    for &idx in &[0, 1, 3, 4, 6, 7] {
        let c = sp[idx as usize];
        if !(27..=36).contains(&c) {
            return false;
        }
    }
    true
}

// ── Octal / display dumps ─────────────────────────────────────────────────────

/// Formats up to two CDC words as octal digit pairs followed by their
/// display-code rendering, space-padded to fixed width.
pub fn dump_dword(cbuf: &[u8], cs: &Charset) -> String {
    let nchar = cbuf.len().min(20);
    let mut out = String::new();
    for i in 0..20 {
        if i < nchar {
            out.push_str(&format!("{:02o}", cbuf[i]));
        } else {
            out.push_str("  ");
        }
        if i % 10 == 9 {
            out.push(' ');
        }
    }
    for i in 0..20 {
        if i < nchar {
            out.push(cs.dc(cbuf[i]));
        } else {
            out.push(' ');
        }
        if i % 20 == 9 {
            out.push(' ');
        }
    }
    out
}

/// Dumps a decoded block for `-r`, limited by verbosity (20 chars, 160
/// chars, or everything) with the total char count on the first line and an
/// octal word offset every eight words.
pub fn print_data(out: &mut dyn Write, cbuf: &[u8], cs: &Charset) -> io::Result<()> {
    let nchar = cbuf.len();
    let lim = match verbose() {
        0 => 20,
        1 => 160,
        _ => nchar,
    };
    let lim = lim.min(nchar);

    let mut i = 0;
    while i < lim {
        if i > 0 {
            write!(out, "      ")?;
        }
        write!(out, "{}", dump_dword(&cbuf[i..lim.min(i + 20)], cs))?;
        if i == 0 {
            write!(out, " [{}]", nchar)?;
        } else if i % 80 == 0 {
            write!(out, " 0{:o}", i / 10)?;
        }
        writeln!(out)?;
        i += 20;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Display code for "HELLO"
    const HELLO: [u8; 5] = [0o10, 0o05, 0o14, 0o14, 0o17];

    #[test]
    fn base_map_translates() {
        let cs = Charset::new(false);
        let s: String = HELLO.iter().map(|&c| cs.dc(c)).collect();
        assert_eq!(s, "HELLO");
        assert_eq!(cs.dc(0), ':');
        assert_eq!(cs.dc(0o55), ' ');
    }

    #[test]
    fn sixty_three_overrides() {
        let cs = Charset::new(true);
        assert_eq!(cs.dc(0o63), ':');
        assert_eq!(cs.c74(0o04), "%");
        let cs64 = Charset::new(false);
        assert_eq!(cs64.dc(0o63), '_');
        assert_eq!(cs64.c74(0o04), ":");
    }

    #[test]
    fn copy_dc_alnum_stops_at_space_and_punct() {
        let cs = Charset::new(false);
        // "AB C" stops at the space
        let src = [0o01, 0o02, 0o55, 0o03];
        assert_eq!(cs.copy_dc(&src, 4, DC_ALNUM), "AB");
        // "A+B" stops at '+' (code 37)
        let src = [0o01, 37, 0o02];
        assert_eq!(cs.copy_dc(&src, 3, DC_ALNUM), "A");
    }

    #[test]
    fn copy_dc_nonul_keeps_spaces() {
        let cs = Charset::new(false);
        let src = [0o01, 0o55, 0o02, 0, 0o03];
        assert_eq!(cs.copy_dc(&src, 5, DC_NONUL), "A B");
    }

    #[test]
    fn copy_dc_text_joins_lines() {
        let cs = Charset::new(false);
        // Word 0: "AB" + null run to end of word (EOL), word 1: "CD" + more
        // data so the join is emitted.
        let mut src = [0u8; 30];
        src[0] = 0o01;
        src[1] = 0o02;
        src[10] = 0o03;
        src[11] = 0o04;
        src[20] = 0o05;
        src[21] = 0o06;
        let got = cs.copy_dc(&src, 30, DC_TEXT);
        assert!(got.starts_with("AB  CD"), "got {:?}", got);
    }

    #[test]
    fn copy_dc_text_eol_in_position_nine_spills() {
        let cs = Charset::new(false);
        // Chars 0..8 data, char 9 null: the run must also cover word 1 to
        // count as end-of-line.
        let mut src = [0u8; 30];
        for (i, c) in [0o01u8, 0o02, 0o03, 0o04, 0o05, 0o06, 0o07, 0o10, 0o11]
            .iter()
            .enumerate()
        {
            src[i] = *c;
        }
        src[20] = 0o24; // 'T' after the spilled EOL
        let got = cs.copy_dc(&src, 30, DC_TEXT);
        assert!(got.starts_with("ABCDEFGHI"), "got {:?}", got);
        assert!(got.contains("  T"), "got {:?}", got);
    }

    #[test]
    fn is_dc_ts_accepts_dates_and_times() {
        // "80/01/02." in display code: digits are 0o33+digit... '8'=35, '0'=27.
        let d = |ch: u8| 27 + ch; // digit value to display code
        let stamp = [d(8), d(0), 0o50, d(0), d(1), 0o50, d(0), d(2), 0o57];
        assert!(is_dc_ts(&stamp, 0o50));
        assert!(!is_dc_ts(&stamp, 0o57));
        // Leading space tolerated.
        let mut spaced = [0o55u8; 10];
        spaced[1..].copy_from_slice(&stamp);
        assert!(is_dc_ts(&spaced, 0o50));
        // Non-digit rejected.
        let bad = [0o01, d(0), 0o50, d(0), d(1), 0o50, d(0), d(2), 0o57];
        assert!(!is_dc_ts(&bad, 0o50));
    }

    #[test]
    fn dump_dword_pads_short_input() {
        let cs = Charset::new(false);
        let line = dump_dword(&HELLO, &cs);
        assert!(line.starts_with("1005141417"));
        assert!(line.contains("HELLO"));
        // Fixed layout: 40 octal digits + 2 separators + 20 display + 1.
        assert_eq!(line.chars().count(), 40 + 2 + 20 + 1);
    }
}
