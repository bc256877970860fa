//! Reading and writing SIMH-format tape images.
//!
//! The container is a flat sequence of framed blocks: a 32-bit little-endian
//! length word, the block bytes, and the same length word again. A length of
//! zero is a tape mark; 0xFFFFFFFF is an erase gap; any other length with
//! the high bit set marks a block recorded with a read error. Two tape marks
//! in a row end the volume.
//!
//! [`TapeReader::read_block`] hands the caller one frame at a time, lending
//! the block bytes out of an internal buffer for the duration of one decode.
//! Container damage (a truncated frame, mismatched length words) is fatal:
//! the reader latches the failure and every subsequent call reports it,
//! because a byte position inside a broken frame no longer means anything.
//!
//! [`TapeWriter`] is the inverse, used for the nested "inner" tapes rebuilt
//! from permanent-file dumps. [`TapeWriter::finish`] appends a closing tape
//! mark and flushes.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::dprint;

/// Frame classification returned by [`TapeReader::read_block`].
#[derive(Debug, PartialEq, Eq)]
pub enum TapeItem<'a> {
    /// A data block; the slice is valid until the next read.
    Block(&'a [u8]),
    /// A tape mark (length word zero).
    Mark,
    /// An erase gap or error-marked block. Any payload has been consumed
    /// and discarded; the caller may continue reading.
    Error,
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Sequential reader over one SIMH tape image.
pub struct TapeReader {
    f: BufReader<File>,
    path: PathBuf,
    buf: Vec<u8>,
    prev_mark: bool,
    fatal: bool,
}

impl TapeReader {
    /// Opens a tape image for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<TapeReader> {
        let f = File::open(path.as_ref())?;
        Ok(TapeReader {
            f: BufReader::new(f),
            path: path.as_ref().to_path_buf(),
            buf: Vec::new(),
            prev_mark: false,
            fatal: false,
        })
    }

    /// The path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` at clean end of volume: physical end of the image,
    /// or the second of two consecutive tape marks. Container damage returns
    /// `Err` and latches; every later call fails the same way.
    pub fn read_block(&mut self) -> io::Result<Option<TapeItem<'_>>> {
        if self.fatal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: tape position lost after earlier error", self.path.display()),
            ));
        }
        let len = match self.read_len()? {
            Some(len) => len,
            None => return Ok(None),
        };

        if len == 0 {
            if self.prev_mark {
                dprint!("read_block: double mark, end of volume");
                return Ok(None);
            }
            self.prev_mark = true;
            return Ok(Some(TapeItem::Mark));
        }
        self.prev_mark = false;

        if len == 0xFFFF_FFFF {
            dprint!("read_block: erase gap");
            return Ok(Some(TapeItem::Error));
        }

        let nbytes = (len & 0x7FFF_FFFF) as usize;
        self.buf.resize(nbytes, 0);
        if let Err(e) = self.f.read_exact(&mut self.buf) {
            self.fatal = true;
            return Err(truncated(&self.path, e));
        }
        let trailer = match self.read_len() {
            Ok(Some(t)) => t,
            Ok(None) => {
                self.fatal = true;
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{}: missing trailing length word", self.path.display()),
                ));
            }
            Err(e) => {
                self.fatal = true;
                return Err(e);
            }
        };
        if trailer != len {
            self.fatal = true;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{}: length words disagree ({:#x} vs {:#x})",
                    self.path.display(),
                    len,
                    trailer
                ),
            ));
        }

        if len & 0x8000_0000 != 0 {
            dprint!("read_block: error-marked block of {} bytes", nbytes);
            return Ok(Some(TapeItem::Error));
        }
        Ok(Some(TapeItem::Block(&self.buf)))
    }

    /// Reads one length word; `Ok(None)` on clean end of image, `Err` (and
    /// latch) on a partial word.
    fn read_len(&mut self) -> io::Result<Option<u32>> {
        let mut word = [0u8; 4];
        let n = self.f.read(&mut word[..1])?;
        if n == 0 {
            return Ok(None);
        }
        if let Err(e) = self.f.read_exact(&mut word[1..]) {
            self.fatal = true;
            return Err(truncated(&self.path, e));
        }
        Ok(Some(u32::from_le_bytes(word)))
    }
}

fn truncated(path: &Path, e: io::Error) -> io::Error {
    io::Error::new(
        e.kind(),
        format!("{}: truncated SIMH frame: {}", path.display(), e),
    )
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Sequential writer producing a SIMH tape image.
pub struct TapeWriter {
    f: BufWriter<File>,
    path: PathBuf,
}

impl TapeWriter {
    /// Creates a fresh tape image, refusing to overwrite an existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<TapeWriter> {
        let f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        Ok(TapeWriter {
            f: BufWriter::new(f),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// The path this writer is producing.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one framed data block.
    pub fn write_block(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = (buf.len() as u32).to_le_bytes();
        self.f.write_all(&len)?;
        self.f.write_all(buf)?;
        self.f.write_all(&len)
    }

    /// Writes a tape mark.
    pub fn write_mark(&mut self) -> io::Result<()> {
        self.f.write_all(&0u32.to_le_bytes())
    }

    /// Appends the closing tape mark and flushes the image.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.write_mark()?;
        self.f.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn read_all(path: &Path) -> Vec<u8> {
        fs::read(path).unwrap()
    }

    #[test]
    fn writer_frames_blocks_and_closing_mark() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tap");
        let mut w = TapeWriter::create(&path).unwrap();
        w.write_block(b"abc").unwrap();
        w.finish().unwrap();

        let img = read_all(&path);
        assert_eq!(&img[0..4], &3u32.to_le_bytes());
        assert_eq!(&img[4..7], b"abc");
        assert_eq!(&img[7..11], &3u32.to_le_bytes());
        assert_eq!(&img[11..15], &0u32.to_le_bytes());
        assert_eq!(img.len(), 15);
    }

    #[test]
    fn reader_yields_blocks_marks_and_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.tap");
        let mut w = TapeWriter::create(&path).unwrap();
        w.write_block(b"one").unwrap();
        w.write_mark().unwrap();
        w.write_block(b"two!").unwrap();
        w.write_mark().unwrap();
        w.finish().unwrap(); // second consecutive mark = end of volume

        let mut r = TapeReader::open(&path).unwrap();
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Block(b)) if b == b"one"));
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Mark)));
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Block(b)) if b == b"two!"));
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Mark)));
        assert!(r.read_block().unwrap().is_none());
    }

    #[test]
    fn reader_stops_at_physical_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.tap");
        let mut w = TapeWriter::create(&path).unwrap();
        w.write_block(b"x").unwrap();
        drop(w); // no finish: image ends after the frame

        let mut r = TapeReader::open(&path).unwrap();
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Block(_))));
        assert!(r.read_block().unwrap().is_none());
    }

    #[test]
    fn truncated_frame_is_fatal_and_latches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.tap");
        let mut img = Vec::new();
        img.extend_from_slice(&100u32.to_le_bytes());
        img.extend_from_slice(b"short payload");
        fs::write(&path, img).unwrap();

        let mut r = TapeReader::open(&path).unwrap();
        assert!(r.read_block().is_err());
        assert!(r.read_block().is_err(), "fatal state must latch");
    }

    #[test]
    fn mismatched_length_words_are_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.tap");
        let mut img = Vec::new();
        img.extend_from_slice(&3u32.to_le_bytes());
        img.extend_from_slice(b"abc");
        img.extend_from_slice(&4u32.to_le_bytes());
        fs::write(&path, img).unwrap();

        let mut r = TapeReader::open(&path).unwrap();
        assert!(r.read_block().is_err());
    }

    #[test]
    fn erase_gap_is_survivable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gap.tap");
        let mut img = Vec::new();
        img.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        img.extend_from_slice(&3u32.to_le_bytes());
        img.extend_from_slice(b"abc");
        img.extend_from_slice(&3u32.to_le_bytes());
        fs::write(&path, img).unwrap();

        let mut r = TapeReader::open(&path).unwrap();
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Error)));
        assert!(matches!(r.read_block().unwrap(), Some(TapeItem::Block(b)) if b == b"abc"));
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.tap");
        fs::write(&path, b"old").unwrap();
        assert!(TapeWriter::create(&path).is_err());
    }
}
