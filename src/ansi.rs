//! ANSI tape label recognition and pretty-printing.
//!
//! An 80-byte block whose first three bytes read `VOL`, `HDR`, `EOV`, or
//! `EOF` is an ANSI label. Labels written in EBCDIC are recognized by a
//! trial translation: when byte 0 has its high bit set the block is mapped
//! through the EBCDIC table and re-tested. The translated copy is only used
//! for display; structural decisions elsewhere still see the original block.
//!
//! Field formatting compresses runs of spaces, masks non-printable bytes as
//! `~`, and expands the 6-digit Julian creation/expiry dates with century
//! windowing (leading space = 19xx, leading digit d = 2d00 + yy).

// ── EBCDIC trial translation ──────────────────────────────────────────────────

/// EBCDIC to 8-bit ASCII/Latin-1, the conventional S/360 mapping.
#[rustfmt::skip]
pub const EBCDIC_TO_ASCII: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x9C, 0x09, 0x86, 0x7F, 0x97, 0x8D, 0x8E, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x9D, 0x85, 0x08, 0x87, 0x18, 0x19, 0x92, 0x8F, 0x1C, 0x1D, 0x1E, 0x1F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x0A, 0x17, 0x1B, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x05, 0x06, 0x07,
    0x90, 0x91, 0x16, 0x93, 0x94, 0x95, 0x96, 0x04, 0x98, 0x99, 0x9A, 0x9B, 0x14, 0x15, 0x9E, 0x1A,
    0x20, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0x5B, 0x2E, 0x3C, 0x28, 0x2B, 0x21,
    0x26, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB0, 0xB1, 0x5D, 0x24, 0x2A, 0x29, 0x3B, 0x5E,
    0x2D, 0x2F, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0x7C, 0x2C, 0x25, 0x5F, 0x3E, 0x3F,
    0xBA, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF, 0xC0, 0xC1, 0xC2, 0x60, 0x3A, 0x23, 0x40, 0x27, 0x3D, 0x22,
    0xC3, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9,
    0xCA, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0xCB, 0xCC, 0xCD, 0xCE, 0xCF, 0xD0,
    0xD1, 0x7E, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
    0xD8, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF, 0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
    0x7B, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0xE8, 0xE9, 0xEA, 0xEB, 0xEC, 0xED,
    0x7D, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50, 0x51, 0x52, 0xEE, 0xEF, 0xF0, 0xF1, 0xF2, 0xF3,
    0x5C, 0x9F, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

fn has_label_id(b: &[u8]) -> bool {
    matches!(&b[..3], b"VOL" | b"HDR" | b"EOV" | b"EOF")
}

/// Tests whether `buf` is an 80-byte ANSI label, returning the ASCII label
/// image when it is. EBCDIC labels (high bit set in byte 0) are recognized
/// through a trial translation; the returned copy is the translated text.
pub fn is_label(buf: &[u8]) -> Option<[u8; 80]> {
    if buf.len() != 80 {
        return None;
    }
    if has_label_id(buf) {
        let mut l = [0u8; 80];
        l.copy_from_slice(buf);
        return Some(l);
    }
    if buf[0] & 0x80 != 0 {
        let mut l = [0u8; 80];
        for (d, &s) in l.iter_mut().zip(buf.iter()) {
            *d = EBCDIC_TO_ASCII[s as usize];
        }
        if has_label_id(&l) {
            return Some(l);
        }
    }
    None
}

// ── Field formatting ──────────────────────────────────────────────────────────

/// Appends `txt` followed by the trimmed field to `out`, compressing runs of
/// spaces and masking non-printable bytes as `~`. Appends nothing when the
/// field is all spaces. Returns `true` when something was appended.
pub fn push_lfield(out: &mut String, txt: &str, field: &[u8]) -> bool {
    let mut sp = 0;
    let mut ep = field.len();
    while sp < ep && field[sp] == b' ' {
        sp += 1;
    }
    while ep > sp && field[ep - 1] == b' ' {
        ep -= 1;
    }
    if sp == ep {
        return false;
    }

    out.push_str(txt);
    let mut prev = b'\0';
    for &c in &field[sp..ep] {
        if prev != b' ' || c != b' ' {
            out.push(if (32..127).contains(&c) { c as char } else { '~' });
        }
        prev = c;
    }
    true
}

/// Appends `txt` and a 6-digit Julian date expanded to `yyyy/mm/dd`.
///
/// The first digit position may be a space (19xx window) or a century digit
/// d (2d00 + yy). A field that is not all digits, or whose day number walks
/// off the calendar, is appended verbatim via [`push_lfield`].
pub fn push_jdate(out: &mut String, txt: &str, sp: &[u8]) {
    let sp = &sp[..6];
    let digits_ok =
        sp[1..].iter().all(|c| c.is_ascii_digit()) && (sp[0] == b' ' || sp[0].is_ascii_digit());
    if !digits_ok {
        push_lfield(out, txt, sp);
        return;
    }

    let d = |i: usize| (sp[i] - b'0') as i32;
    let mut yr = if sp[0] == b' ' { 1900 } else { 2000 + 100 * d(0) };
    yr += 10 * d(1) + d(2);

    let mut days = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if yr % 4 == 0 {
        days[1] = 29;
    }

    let mut jday = 100 * d(3) + 10 * d(4) + d(5);
    let mut mon = 0;
    while mon < 12 {
        if jday - days[mon] < 0 {
            break;
        }
        jday -= days[mon];
        mon += 1;
    }
    if mon == 12 {
        // Julian day ran past December: not a date after all.
        push_lfield(out, txt, sp);
        return;
    }

    out.push_str(&format!("{}{:04}/{:02}/{:02}", txt, yr, mon + 1, jday));
}

/// Formats the one-line summary of a label for `-r` output.
pub fn format_label(l: &[u8; 80]) -> String {
    let mut out = String::new();
    push_lfield(&mut out, "", &l[0..4]);

    if l[0] == b'V' {
        push_lfield(&mut out, " ", &l[4..10]);
        push_lfield(&mut out, " l", &l[79..80]);
        push_lfield(&mut out, " owner=", &l[37..51]);
        push_lfield(&mut out, " os=", &l[24..37]);
        return out;
    }

    push_lfield(&mut out, " ", &l[4..21]);
    push_lfield(&mut out, " s", &l[31..35]);
    push_lfield(&mut out, " g", &l[35..39]);
    push_lfield(&mut out, " v", &l[39..41]);
    push_lfield(&mut out, " b", &l[54..60]);
    push_jdate(&mut out, " cre=", &l[41..47]);
    push_jdate(&mut out, " exp=", &l[47..53]);
    push_lfield(&mut out, " os=", &l[60..73]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str, body: &str) -> Vec<u8> {
        let mut l = vec![b' '; 80];
        l[..id.len()].copy_from_slice(id.as_bytes());
        let b = body.as_bytes();
        l[4..4 + b.len()].copy_from_slice(b);
        l
    }

    #[test]
    fn detects_ascii_labels() {
        for id in ["VOL1", "HDR1", "EOV1", "EOF1"] {
            assert!(is_label(&label(id, "")).is_some(), "{}", id);
        }
        assert!(is_label(&label("XYZ1", "")).is_none());
        assert!(is_label(b"VOL1").is_none(), "length must be exactly 80");
    }

    #[test]
    fn detects_ebcdic_labels_via_trial_translation() {
        let ascii = label("VOL1", "ARCH01");
        // Build the EBCDIC image by inverting the table over printables.
        let mut ebcdic = vec![0u8; 80];
        for (i, &a) in ascii.iter().enumerate() {
            let e = EBCDIC_TO_ASCII
                .iter()
                .position(|&x| x == a)
                .expect("printable must be in table") as u8;
            ebcdic[i] = e;
        }
        assert!(ebcdic[0] & 0x80 != 0, "EBCDIC 'V' has the high bit set");
        let got = is_label(&ebcdic).expect("EBCDIC label must be recognized");
        assert_eq!(&got[..4], b"VOL1");
        assert_eq!(&got[4..10], b"ARCH01");
    }

    #[test]
    fn lfield_trims_compresses_and_masks() {
        let mut out = String::new();
        assert!(push_lfield(&mut out, " f=", b"  AB   CD\x01 "));
        assert_eq!(out, " f=AB CD~");
        let mut out = String::new();
        assert!(!push_lfield(&mut out, " f=", b"      "));
        assert!(out.is_empty());
    }

    #[test]
    fn jdate_expands_and_windows() {
        let mut out = String::new();
        push_jdate(&mut out, " cre=", b" 80002");
        assert_eq!(out, " cre=1980/01/02");

        let mut out = String::new();
        push_jdate(&mut out, " cre=", b"080002");
        assert_eq!(out, " cre=2080/01/02");

        // Day 365 of leap-year 1980 lands in December.
        let mut out = String::new();
        push_jdate(&mut out, " ", b" 80365");
        assert_eq!(out, " 1980/12/30");

        // Non-digits fall back to the raw field.
        let mut out = String::new();
        push_jdate(&mut out, " cre=", b"80A002");
        assert_eq!(out, " cre=80A002");
    }

    #[test]
    fn vol1_summary_line() {
        let mut l = label("VOL1", "SERIAL");
        l[37..43].copy_from_slice(b"OWNERX");
        l[24..27].copy_from_slice(b"NOS");
        l[79] = b'3';
        let line = format_label(&l.try_into().unwrap());
        assert_eq!(line, "VOL1 SERIAL l3 owner=OWNERX os=NOS");
    }

    #[test]
    fn hdr1_summary_line() {
        let mut l = label("HDR1", "FILEID");
        l[41..47].copy_from_slice(b" 80002");
        l[47..53].copy_from_slice(b" 80032");
        l[60..63].copy_from_slice(b"NOS");
        let line = format_label(&l.try_into().unwrap());
        assert!(line.starts_with("HDR1 FILEID"));
        assert!(line.contains(" cre=1980/01/02"));
        assert!(line.contains(" exp=1980/02/01"));
        assert!(line.ends_with(" os=NOS"));
    }
}
