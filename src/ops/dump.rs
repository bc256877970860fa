//! `-d`: show the structure of PFDUMP records.

use std::io::{self, Write};

use crate::ansi::is_label;
use crate::config::Config;
use crate::ifmt::CdcReader;
use crate::outfile::name_match;
use crate::pfdump::analyze_pfdump;
use crate::rectype::{id_record, RecInfo, RecType};
use crate::simtap::{TapeItem, TapeReader};

/// Analyzes every PFDUMP record matching one of `args`. A matched record of
/// any other kind reports `Not dumping` and fails the run with 2; an
/// argument matching nothing fails it with 3.
pub fn do_dump(
    out: &mut dyn Write,
    tap: &mut TapeReader,
    args: &[String],
    cfg: &Config,
) -> io::Result<i32> {
    let mut ec = 0;
    let mut found = vec![false; args.len()];

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
            TapeItem::Mark | TapeItem::Error => continue,
            TapeItem::Block(tbuf) => {
                if is_label(tbuf).is_some() {
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

        let Some(idx) = args
            .iter()
            .position(|a| name_match(a, &info.name, info.ui).is_some())
        else {
            cd.skip_record();
            continue;
        };
        found[idx] = true;

        match info.rtype {
            RecType::Pfdump => analyze_pfdump(out, &mut cd, &cfg.charset)?,
            rt => {
                eprintln!("Not dumping {}/{}", rt, info.name);
                cd.skip_record();
                ec = 2;
            }
        }
    }

    for (arg, seen) in args.iter().zip(found) {
        if !seen {
            eprintln!("{} not found", arg);
            ec = 3;
        }
    }
    Ok(ec)
}
