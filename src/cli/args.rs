//! Command-line argument parsing.
//!
//! The entry points are [`parse_args`] (reads `std::env::args()`) and
//! [`parse_args_from`] (takes an explicit slice, suitable for unit tests).
//! Short options may be aggregated (`-tv3`); `-f` takes its operand from
//! the rest of the cluster or the next argument. Non-option arguments are
//! the record names for `-d` and `-x`.
//!
//! Bad or unrecognized options return an `Err` with a human-readable
//! message; the caller prints it together with the usage synopsis.

use anyhow::{anyhow, bail};

use crate::config::Config;
use crate::dcode::Charset;

/// The operation selected on the command line. Exactly one is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    /// `-r`: raw block structure.
    Raw,
    /// `-t`: catalog.
    Catalog,
    /// `-d`: PFDUMP structure dump.
    Dump,
    /// `-x`: extract.
    Extract,
}

/// Everything the parser learned from the command line.
#[derive(Debug)]
pub struct ParsedArgs {
    /// Selected operation.
    pub op: OpMode,
    /// Input tape image path (`-f`).
    pub tape: String,
    /// Record-name operands for `-d` / `-x`.
    pub files: Vec<String>,
    /// Settled decoder configuration.
    pub cfg: Config,
    /// Verbosity from repeated `-v`.
    pub verbose: u8,
    /// Debug tracing (`-D`).
    pub debug: bool,
    /// `-h` was given; the caller should print usage and exit 0.
    pub exit_early: bool,
}

impl Default for ParsedArgs {
    fn default() -> Self {
        ParsedArgs {
            op: OpMode::Catalog,
            tape: String::new(),
            files: Vec::new(),
            cfg: Config::default(),
            verbose: 0,
            debug: false,
            exit_early: false,
        }
    }
}

/// Parses `std::env::args()`, skipping argv[0].
pub fn parse_args() -> anyhow::Result<ParsedArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&argv)
}

/// Parses an explicit argument list.
pub fn parse_args_from(argv: &[String]) -> anyhow::Result<ParsedArgs> {
    let mut args = ParsedArgs::default();
    let mut ops: Vec<OpMode> = Vec::new();
    let mut sixty_three = false;
    let mut tape: Option<String> = None;

    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        if !arg.starts_with('-') || arg == "-" {
            args.files.push(arg.clone());
            continue;
        }

        let mut chars = arg[1..].chars();
        while let Some(c) = chars.next() {
            match c {
                '3' => sixty_three = true,
                'a' => args.cfg.ascii = true,
                'D' => args.debug = true,
                'd' => ops.push(OpMode::Dump),
                'f' => {
                    let rest: String = chars.collect();
                    let operand = if !rest.is_empty() {
                        rest
                    } else {
                        it.next()
                            .ok_or_else(|| anyhow!("option -f requires an operand"))?
                            .clone()
                    };
                    tape = Some(operand);
                    break;
                }
                'h' => {
                    args.exit_early = true;
                    return Ok(args);
                }
                'l' => args.cfg.list_ulib = true,
                'O' => args.cfg.to_stdout = true,
                'r' => ops.push(OpMode::Raw),
                't' => ops.push(OpMode::Catalog),
                'v' => args.verbose = args.verbose.saturating_add(1),
                'x' => ops.push(OpMode::Extract),
                other => bail!("unrecognized option -{}", other),
            }
        }
    }

    ops.dedup();
    match ops.as_slice() {
        [op] => args.op = *op,
        _ => bail!("must specify exactly one of -d, -r, -t, or -x"),
    }

    args.tape = tape.ok_or_else(|| anyhow!("-f must be specified"))?;

    match args.op {
        OpMode::Raw | OpMode::Catalog => {
            if !args.files.is_empty() {
                bail!(
                    "files not allowed with -{}",
                    if args.op == OpMode::Raw { 'r' } else { 't' }
                );
            }
        }
        OpMode::Dump | OpMode::Extract => {
            if args.files.is_empty() {
                bail!("no files specified");
            }
        }
    }

    args.cfg.charset = Charset::new(sixty_three);
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn catalog_run() {
        let a = parse_args_from(&argv(&["-f", "t.tap", "-t"])).unwrap();
        assert_eq!(a.op, OpMode::Catalog);
        assert_eq!(a.tape, "t.tap");
        assert!(a.files.is_empty());
    }

    #[test]
    fn extract_with_names_and_modifiers() {
        let a = parse_args_from(&argv(&["-x", "-v", "-v", "-3", "-ftape.tap", "A", "B*"])).unwrap();
        assert_eq!(a.op, OpMode::Extract);
        assert_eq!(a.tape, "tape.tap");
        assert_eq!(a.files, ["A", "B*"]);
        assert_eq!(a.verbose, 2);
        assert!(a.cfg.charset.is_63());
    }

    #[test]
    fn aggregated_shorts() {
        let a = parse_args_from(&argv(&["-tvl", "-f", "t.tap"])).unwrap();
        assert_eq!(a.op, OpMode::Catalog);
        assert_eq!(a.verbose, 1);
        assert!(a.cfg.list_ulib);
    }

    #[test]
    fn missing_tape_is_an_error() {
        assert!(parse_args_from(&argv(&["-t"])).is_err());
    }

    #[test]
    fn zero_or_two_ops_are_errors() {
        assert!(parse_args_from(&argv(&["-f", "t.tap"])).is_err());
        assert!(parse_args_from(&argv(&["-f", "t.tap", "-t", "-r"])).is_err());
    }

    #[test]
    fn operand_rules_per_op() {
        assert!(parse_args_from(&argv(&["-f", "t", "-t", "FILE"])).is_err());
        assert!(parse_args_from(&argv(&["-f", "t", "-r", "FILE"])).is_err());
        assert!(parse_args_from(&argv(&["-f", "t", "-x"])).is_err());
        assert!(parse_args_from(&argv(&["-f", "t", "-d"])).is_err());
    }

    #[test]
    fn help_short_circuits() {
        let a = parse_args_from(&argv(&["-h"])).unwrap();
        assert!(a.exit_early);
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert!(parse_args_from(&argv(&["-q", "-f", "t", "-t"])).is_err());
    }
}
