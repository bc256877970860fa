//! `-x`: extract files from tape.

use std::io;

use crate::ansi::is_label;
use crate::config::Config;
use crate::dprint;
use crate::ifmt::CdcReader;
use crate::opl::{extract_opl, extract_upl, extract_uplr};
use crate::outfile::{name_match, out_open, parse_date};
use crate::pfdump::{extract_dumppf, extract_pfdump};
use crate::rectype::{id_record, RecInfo, RecType};
use crate::simtap::{TapeItem, TapeReader};
use crate::ExtractError;

/// Extracts an unstructured text or procedure record to `<name>.txt`,
/// translating display code line by line (the CDC end-of-line is a null run
/// closing a word). Under `-a`, 74/76 escape pairs map through the extended
/// charset tables.
pub fn extract_text(cd: &mut CdcReader, name: &str, cfg: &Config) -> Result<(), ExtractError> {
    let cs = &cfg.charset;
    let Ok(mut of) = out_open(cfg.to_stdout, name, "txt") else {
        cd.skip_record();
        return Err(ExtractError::Suppressed);
    };

    let mut eol = false;
    let mut esc = 0u8;
    let mut buf = String::new();
    while let Some(cp) = cd.get_word() {
        // Trailing nulls bound the word's text; exactly nine characters
        // means the line may continue into the next word.
        let mut oc = 10;
        while oc > 0 && cp[oc - 1] == 0 {
            oc -= 1;
        }
        if eol && oc > 0 {
            // The previous word's trailing null was a real colon.
            buf.push(cs.dc(0));
        }
        eol = oc == 9;

        for &c in &cp[..oc] {
            if cfg.ascii && (c == 0o74 || c == 0o76) {
                esc = c;
                continue;
            }
            match esc {
                0o74 => buf.push_str(cs.c74(c)),
                0o76 => buf.push_str(cs.c76(c)),
                _ => buf.push(cs.dc(c)),
            }
            esc = 0;
        }

        if oc < 9 {
            if esc != 0 {
                buf.push(cs.dc(esc));
            }
            esc = 0;
            buf.push('\n');
        }

        if buf.len() >= 4096 {
            if let Err(e) = of.write_str(&buf) {
                of.abandon();
                return Err(ExtractError::decode(format!("write error: {}", e)));
            }
            buf.clear();
        }
    }
    if esc != 0 {
        buf.push(cs.dc(esc));
    }
    if eol {
        buf.push(cs.dc(0));
    }

    if let Err(e) = of.write_str(&buf) {
        of.abandon();
        return Err(ExtractError::decode(format!("write error: {}", e)));
    }
    of.finish()
        .map_err(|e| ExtractError::decode(format!("close error: {}", e)))?;
    Ok(())
}

/// Extracts every record matching one of `args`, dispatching on the record
/// kind. Returns 2 when anything failed or an argument matched nothing.
pub fn do_extract(tap: &mut TapeReader, args: &[String], cfg: &Config) -> io::Result<i32> {
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
        let name = if info.name.is_empty() {
            "noname".to_string()
        } else {
            info.name.clone()
        };

        let Some((idx, fname)) = args
            .iter()
            .enumerate()
            .find_map(|(i, a)| name_match(a, &name, info.ui).map(|f| (i, f)))
        else {
            cd.skip_record();
            continue;
        };
        found[idx] = true;

        dprint!("do_extract: {}/{} len {}", info.rtype, name, tbuf.len());
        let date = parse_date(&info.date);
        let result = match info.rtype {
            RecType::Text | RecType::Proc => extract_text(&mut cd, fname, cfg),
            RecType::Opl | RecType::Oplc => extract_opl(&mut cd, fname, cfg),
            RecType::Upl => extract_upl(&mut cd, fname, date, cfg),
            RecType::Uplr => extract_uplr(&mut cd, fname, date, cfg),
            RecType::Dumppf => extract_dumppf(&mut cd, fname, cfg),
            RecType::Pfdump => extract_pfdump(&mut cd, fname, cfg),
            rt => {
                cd.skip_record();
                if rt > RecType::Eof {
                    Err(ExtractError::decode("not extracting"))
                } else {
                    Ok(())
                }
            }
        };

        if let Err(e) = result {
            ec = 2;
            if let ExtractError::Decode(msg) = e {
                eprintln!("{}/{}: {}", info.rtype, name, msg);
            }
        }
    }

    for (arg, seen) in args.iter().zip(found) {
        if !seen {
            eprintln!("{} not found", arg);
            ec = 2;
        }
    }
    Ok(ec)
}
