//! Run configuration and process-wide verbosity state.
//!
//! All option-derived state is settled here once, during argument parsing,
//! before the first tape block is read. [`Config`] travels by shared borrow
//! into the decoders; the verbosity and debug levels are crate-level atomics
//! so that deeply nested decode loops can gate their diagnostics without
//! threading another parameter through every call.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::dcode::Charset;

// ── Verbosity global ──────────────────────────────────────────────────────────
//
// 0 = terse; 1 = verbose (-v); 2+ = more verbose (-vv).
pub static VERBOSE: AtomicU8 = AtomicU8::new(0);

/// Returns the current verbosity level.
#[inline]
pub fn verbose() -> u8 {
    VERBOSE.load(Ordering::Relaxed)
}

/// Sets the verbosity level.
#[inline]
pub fn set_verbose(level: u8) {
    VERBOSE.store(level, Ordering::Relaxed);
}

// ── Debug-trace global ────────────────────────────────────────────────────────

pub static DEBUG: AtomicBool = AtomicBool::new(false);

/// Returns `true` when `-D` debug tracing is active.
#[inline]
pub fn debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Enables or disables debug tracing.
#[inline]
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Emits a formatted trace line to stderr when debug tracing is enabled.
#[macro_export]
macro_rules! dprint {
    ($($arg:tt)*) => {
        if $crate::config::debug() {
            eprintln!($($arg)*);
        }
    };
}

// ── Settled configuration ─────────────────────────────────────────────────────

/// Option state resolved once at startup and read-only afterward.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display-code translation maps, built for the 63- or 64-character set.
    pub charset: Charset,
    /// Extract text in ASCII mode, honoring the 74/76 escape maps (`-a`).
    pub ascii: bool,
    /// List the members of user libraries in catalog output (`-l`).
    pub list_ulib: bool,
    /// Write extracted text to stdout instead of files (`-O`).
    pub to_stdout: bool,
    /// Interpret the 48-bit I-format block trailer when it validates.
    ///
    /// The untrailered fallback (`false`) treats every complete word of a
    /// block as data; some tapes written without trailers need it.
    pub use_trailer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            charset: Charset::new(false),
            ascii: false,
            list_ulib: false,
            to_stdout: false,
            use_trailer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_64_set_and_trailers() {
        let cfg = Config::default();
        assert_eq!(cfg.charset.dc(0), ':');
        assert!(cfg.use_trailer);
        assert!(!cfg.ascii);
    }
}
