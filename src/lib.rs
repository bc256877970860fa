//! Read CDC 6000/Cyber I-format tapes in SIMH tape-image format.
//!
//! The library turns raw tape bytes into usable files in four layers:
//!
//! 1. [`simtap`] parses the SIMH container framing (length-prefixed blocks,
//!    tape marks, error marks).
//! 2. [`ifmt`] reinterprets block payloads as streams of 6-bit-packed
//!    60-bit words grouped into logical records ([`ifmt::CdcReader`]), and
//!    writes them back ([`ifmt::CdcWriter`]) for the nested tapes rebuilt
//!    from permanent-file dumps.
//! 3. [`rectype`] fingerprints a decoded record into one of ~25 kinds,
//!    extracting its name, date, and description.
//! 4. [`opl`] and [`pfdump`] reverse the MODIFY/UPDATE source-library
//!    compression and the PFDUMP/DUMPPF permanent-file dump framing.
//!
//! [`ops`] wires the layers into the four command-line operations; [`cli`]
//! parses the command line; [`ansi`], [`dcode`], [`outfile`] and [`config`]
//! carry the supporting pieces.

use std::fmt;

pub mod ansi;
pub mod cli;
pub mod config;
pub mod dcode;
pub mod ifmt;
pub mod opl;
pub mod ops;
pub mod outfile;
pub mod pfdump;
pub mod rectype;
pub mod simtap;

pub use config::Config;
pub use dcode::Charset;
pub use ifmt::{pack6, unpack6, CdcReader, CdcWriter, Word};
pub use rectype::{id_record, RecInfo, RecType};
pub use simtap::{TapeReader, TapeWriter};

/// How an extraction failed.
///
/// The suppressed case exists because a failed output open has already
/// printed its own OS-level diagnostic; the run still counts the failure.
#[derive(Debug)]
pub enum ExtractError {
    /// Diagnostic already emitted; fail silently.
    Suppressed,
    /// Decode failure, reported as `<rtype>/<name>: <message>`.
    Decode(String),
}

impl ExtractError {
    /// Shorthand for a decode failure.
    pub fn decode(msg: impl Into<String>) -> ExtractError {
        ExtractError::Decode(msg.into())
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Suppressed => f.write_str("(suppressed)"),
            ExtractError::Decode(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ExtractError {}
