//! The four tape operations: raw block dump (`-r`), catalog (`-t`),
//! PFDUMP structure dump (`-d`), and extraction (`-x`).
//!
//! Each operation owns the outer read loop: pull a frame, classify it as a
//! tape mark, ANSI label, or data block, and hand data blocks to a record
//! context. Operations write their report to a caller-supplied sink so
//! tests can capture output; diagnostics go to stderr. The returned exit
//! code is 0 for success, 2 for container or extraction failures, and 3
//! for `-d` arguments that matched nothing.

pub mod catalog;
pub mod dump;
pub mod extract;
pub mod raw;

pub use catalog::do_catalog;
pub use dump::do_dump;
pub use extract::do_extract;
pub use raw::do_raw;
