//! Usage text.

/// Prints the usage synopsis to stderr.
pub fn print_usage(prog: &str) {
    eprintln!(
        "Usage: {} [-3aOv] -f path.tap [-r | -t | -d files... | -x files...]",
        prog
    );
    eprintln!(" -f   file in SIMH tape format (required)");
    eprintln!("operations:");
    eprintln!(" -d   show structure of PFDUMP record");
    eprintln!(" -r   show raw tape block structure");
    eprintln!(" -t   catalog the tape");
    eprintln!(" -x   extract files from tape");
    eprintln!("modifiers:");
    eprintln!(" -3   use 63-character set (default 64)");
    eprintln!(" -a   extract in ASCII mode (6/12 display code)");
    eprintln!(" -l   list contents of user libraries");
    eprintln!(" -O   extract to stdout (default write to file)");
    eprintln!(" -v   verbose output");
    eprintln!(" -vv  more verbose output");
}
