// Round-trip properties of the public packing and record-context API.

mod common;

use common::to_words;
use tempfile::TempDir;

use cdctap::ifmt::{pack6, packed_len, unpack6, unpacked_len, CdcReader, CdcWriter};
use cdctap::simtap::{TapeItem, TapeReader, TapeWriter};

#[test]
fn unpack_count_law_over_sizes() {
    for n in 0..64usize {
        let src: Vec<u8> = (0..n as u8).map(|i| i.wrapping_mul(37)).collect();
        let mut dst = vec![0u8; unpacked_len(n) + 4];
        assert_eq!(unpack6(&src, &mut dst), n * 8 / 6);
    }
}

#[test]
fn chars_roundtrip_exactly() {
    let chars: Vec<u8> = (0..61u8).map(|i| (i * 5 + 1) & 0o77).collect();
    let mut bytes = vec![0u8; packed_len(chars.len())];
    let nb = pack6(&chars, &mut bytes);
    let mut back = vec![0u8; unpacked_len(nb) + 4];
    let nc = unpack6(&bytes[..nb], &mut back);
    assert_eq!(&back[..chars.len()], chars.as_slice());
    assert!(back[chars.len()..nc].iter().all(|&c| c == 0));
}

#[test]
fn written_records_read_back_with_boundaries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rt.tap");

    let rec_a = to_words(&(0..70u8).map(|i| i % 0o77).collect::<Vec<_>>());
    let rec_b = to_words(&(0..30u8).map(|i| (i * 3) % 0o77).collect::<Vec<_>>());

    let mut w = CdcWriter::new(TapeWriter::create(&path).unwrap());
    for word in &rec_a {
        w.put_word(word).unwrap();
    }
    w.write_eor().unwrap();
    for word in &rec_b {
        w.put_word(word).unwrap();
    }
    w.write_eof().unwrap();
    w.finish().unwrap();

    let mut tap = TapeReader::open(&path).unwrap();

    // Record A: exactly the written words, EOR at the boundary.
    let first = match tap.read_block().unwrap() {
        Some(TapeItem::Block(b)) => b.to_vec(),
        other => panic!("expected block, got {:?}", other),
    };
    let mut cd = CdcReader::new(&mut tap, &first, true);
    for (i, word) in rec_a.iter().enumerate() {
        assert_eq!(cd.get_word().as_ref(), Some(word), "word {}", i);
    }
    assert!(cd.get_word().is_none());
    assert_eq!(cd.reclen(), rec_a.len());

    // Record B reads back identically under the same framing.
    let second = match tap.read_block().unwrap() {
        Some(TapeItem::Block(b)) => b.to_vec(),
        other => panic!("expected block, got {:?}", other),
    };
    let mut cd = CdcReader::new(&mut tap, &second, true);
    for word in &rec_b {
        assert_eq!(cd.get_word().as_ref(), Some(word));
    }
    assert!(cd.get_word().is_none());
}

#[test]
fn eof_marker_block_reports_tape_eof() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("eof.tap");
    let mut w = CdcWriter::new(TapeWriter::create(&path).unwrap());
    w.write_eof().unwrap();
    w.finish().unwrap();

    let mut tap = TapeReader::open(&path).unwrap();
    let first = match tap.read_block().unwrap() {
        Some(TapeItem::Block(b)) => b.to_vec(),
        other => panic!("expected block, got {:?}", other),
    };
    // Six bytes decode to eight chars whose last is 0o17.
    assert_eq!(first.len(), 6);
    let cd = CdcReader::new(&mut tap, &first, true);
    assert!(cd.tape_eof());
}
