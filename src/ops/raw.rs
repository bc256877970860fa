//! `-r`: show raw tape block structure.

use std::io::{self, Write};

use crate::ansi::{format_label, is_label};
use crate::config::Config;
use crate::dcode::print_data;
use crate::ifmt::{unpack6, unpacked_len};
use crate::simtap::{TapeItem, TapeReader};

/// Dumps every frame of the tape: `--mark--` lines for tape marks, label
/// summaries for ANSI labels, and an octal/display dump for data blocks.
pub fn do_raw(out: &mut dyn Write, tap: &mut TapeReader, cfg: &Config) -> io::Result<i32> {
    let mut ec = 0;
    let mut cbuf: Vec<u8> = Vec::new();

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
        match item {
            TapeItem::Mark => writeln!(out, "  --mark--")?,
            TapeItem::Error => writeln!(out, "  --error--")?,
            TapeItem::Block(tbuf) => {
                write!(out, "{:5} ", tbuf.len())?;
                if let Some(lbuf) = is_label(tbuf) {
                    writeln!(out, "{}", format_label(&lbuf))?;
                } else {
                    cbuf.resize(unpacked_len(tbuf.len()), 0);
                    let nchar = unpack6(tbuf, &mut cbuf);
                    print_data(out, &cbuf[..nchar], &cfg.charset)?;
                }
            }
        }
    }
    Ok(ec)
}
