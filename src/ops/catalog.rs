//! `-t`: catalog the tape.

use std::io::{self, Write};

use crate::ansi::{is_label, push_jdate, push_lfield};
use crate::config::{verbose, Config};
use crate::ifmt::CdcReader;
use crate::rectype::{id_record, RecInfo, RecType};
use crate::simtap::{TapeItem, TapeReader};

/// Trims the catalog date for display: drop a trailing period or space in
/// the last two positions and any leading space.
fn trim_date(date: &str) -> &str {
    let mut d = date;
    for idx in [9usize, 8] {
        if d.len() > idx && matches!(d.as_bytes()[idx], b' ' | b'.') {
            d = &d[..idx];
        }
    }
    d.strip_prefix(' ').unwrap_or(d)
}

/// Catalogs every record: five `type/name` cells per line, or one line per
/// record with length, date, and comment under `-v`. Members of user
/// libraries are elided unless `-l`; VOL1/HDR1 labels become `Catalog of`
/// headers.
pub fn do_catalog(out: &mut dyn Write, tap: &mut TapeReader, cfg: &Config) -> io::Result<i32> {
    let mut ec = 0;
    let mut in_ulib = false;
    let mut col = 0u32;

    loop {
        let item = match tap.read_block() {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}", e);
                ec = 2;
                break;
            }
        };
        let tbuf = match item {
            TapeItem::Mark => {
                writeln!(out, "  --mark--")?;
                continue;
            }
            TapeItem::Error => continue,
            TapeItem::Block(tbuf) => {
                if let Some(lbuf) = is_label(tbuf) {
                    let mut line = String::new();
                    match lbuf[0] {
                        b'V' => {
                            push_lfield(&mut line, "Catalog of ", &lbuf[4..10]);
                            if push_lfield(&mut line, " (", &lbuf[37..51]) {
                                line.push(')');
                            }
                        }
                        b'H' => {
                            push_lfield(&mut line, "\nCatalog of ", &lbuf[4..21]);
                            push_jdate(&mut line, " ", &lbuf[41..47]);
                            line.push('\n');
                        }
                        _ => {}
                    }
                    write!(out, "{}", line)?;
                    continue;
                }
                tbuf.to_vec()
            }
        };

        let mut cd = CdcReader::new(tap, &tbuf, cfg.use_trailer);
        let info = if cd.tape_eof() {
            RecInfo::eof()
        } else {
            id_record(cd.chars(), &cfg.charset)
        };
        let reclen = cd.skip_record();

        // User libraries list as one entry; members are skipped until the
        // closing directory.
        if !cfg.list_ulib {
            if in_ulib {
                if info.rtype == RecType::Opld {
                    in_ulib = false;
                }
                continue;
            }
            if info.rtype == RecType::Ulib {
                in_ulib = true;
            }
        }

        if verbose() > 0 {
            write!(out, "{:<7} {:<6}", info.name, info.rtype)?;
            if info.rtype > RecType::Eof {
                write!(out, " {:7} {:>8}", reclen, trim_date(&info.date))?;
            }
            let mut extra = info.extra;
            if verbose() < 2 {
                extra.truncate(48);
            }
            writeln!(out, " {}", extra)?;
        } else {
            match info.rtype {
                RecType::Eof | RecType::Empty => {
                    if info.rtype == RecType::Eof {
                        col = 4;
                    }
                    write!(out, "{:>8}{:6}", info.rtype.name(), "")?;
                }
                _ => write!(out, "{:>6}/{:<7}", info.rtype.name(), info.name)?,
            }
            col += 1;
            if col > 4 {
                writeln!(out)?;
                col = 0;
            } else {
                write!(out, " ")?;
            }
        }
    }
    Ok(ec)
}
