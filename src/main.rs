//! Binary entry point for the `cdctap` command-line tool.
//!
//! Parses the command line, opens the tape image, dispatches to the
//! selected operation, and exits with its code: 0 success, 1 usage or open
//! failure, 2 container/extract failures, 3 names not found under `-d`.

use std::io::{self, Write};

use cdctap::cli::args::{parse_args, OpMode};
use cdctap::cli::help::print_usage;
use cdctap::config::{set_debug, set_verbose};
use cdctap::ops::{do_catalog, do_dump, do_extract, do_raw};
use cdctap::simtap::TapeReader;

fn main() {
    let prog = std::env::args()
        .next()
        .as_deref()
        .and_then(|p| p.rsplit('/').next().map(str::to_owned))
        .unwrap_or_else(|| "cdctap".to_owned());

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&prog);
            std::process::exit(1);
        }
    };
    if args.exit_early {
        print_usage(&prog);
        std::process::exit(0);
    }

    set_verbose(args.verbose);
    set_debug(args.debug);

    let mut tap = match TapeReader::open(&args.tape) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}: {}", args.tape, e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match args.op {
        OpMode::Raw => do_raw(&mut out, &mut tap, &args.cfg),
        OpMode::Catalog => do_catalog(&mut out, &mut tap, &args.cfg),
        OpMode::Dump => do_dump(&mut out, &mut tap, &args.files, &args.cfg),
        OpMode::Extract => do_extract(&mut tap, &args.files, &args.cfg),
    };

    let ec = match result.and_then(|ec| out.flush().map(|_| ec)) {
        Ok(ec) => ec,
        Err(e) => {
            eprintln!("{}", e);
            2
        }
    };
    std::process::exit(ec);
}
