use std::io::Write;

use fitskit::{BigEndianArray, Error, FitsFile, Header, PayloadHeap, BLOCK_SIZE};

fn primary_header() -> Header {
    let mut header = Header::new();
    header.set_simple(true).unwrap();
    header.set_bitpix(8).unwrap();
    header.set_naxes(0).unwrap();
    header
}

fn table_unit() -> (Header, Vec<u8>) {
    let codec = BigEndianArray::<i32>::new();
    let mut heap = PayloadHeap::new();
    let first = heap.append_value(&codec, &vec![1, 2, 3]).unwrap();
    let second = heap.append_value(&codec, &vec![4, 5]).unwrap();

    let mut data = Vec::new();
    for (count, offset) in [(3i32, first as i32), (2, second as i32)] {
        data.extend_from_slice(&count.to_be_bytes());
        data.extend_from_slice(&offset.to_be_bytes());
    }
    heap.write(&mut data).unwrap();

    let mut header = Header::new();
    header.set_xtension("BINTABLE").unwrap();
    header.set_bitpix(8).unwrap();
    header.set_naxes(2).unwrap();
    header.set_naxis(1, 8).unwrap();
    header.set_naxis(2, 2).unwrap();
    header.add_int("PCOUNT", i64::from(heap.used_size()), None).unwrap();
    header.add_int("GCOUNT", 1, None).unwrap();
    header.add_int("TFIELDS", 1, None).unwrap();
    header.add_str("TFORM1", "1PJ(3)", None).unwrap();
    (header, data)
}

fn write_sample(path: &std::path::Path) {
    let mut file = FitsFile::create(path).unwrap();
    file.append_unit(&mut primary_header(), &[]).unwrap();
    let (mut header, data) = table_unit();
    file.append_unit(&mut header, &data).unwrap();
}

#[test]
fn test_walk_units_and_read_heap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.fits");
    write_sample(&path);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * BLOCK_SIZE as u64);

    let mut file = FitsFile::open(&path).unwrap();
    let units = file.units().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].data_offset, BLOCK_SIZE as u64);
    assert_eq!(units[1].data_offset, 2 * BLOCK_SIZE as u64);
    assert_eq!(units[1].header.true_data_size(), 16 + 20);
    assert_eq!(units[1].heap_offset(), 16);
    assert_eq!(units[1].heap_size(), 20);

    let data = file.read_data(&units[1]).unwrap();
    assert_eq!(&data[..4], &3i32.to_be_bytes());

    let heap = file.read_heap(&units[1]).unwrap();
    let codec = BigEndianArray::<i32>::new();
    assert_eq!(heap.read_at(12, &codec, &2).unwrap(), vec![4, 5]);
    assert_eq!(heap.read_at(0, &codec, &3).unwrap(), vec![1, 2, 3]);
    assert!(!heap.can_rewrite());
}

#[test]
fn test_read_modify_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rewrite.fits");
    write_sample(&path);

    {
        let mut file = FitsFile::open_rw(&path).unwrap();
        let mut units = file.units().unwrap();
        let header = &mut units[0].header;
        header.add_str("ORIGIN", "fitskit", Some("writer")).unwrap();
        assert!(header.can_rewrite());
        file.rewrite_header(header).unwrap();

        let mut heap = file.read_heap(&units[1]).unwrap();
        assert!(heap.can_rewrite());
        file.rewrite_heap(&heap).unwrap();

        heap.append(&[0; 4]).unwrap();
        assert!(matches!(
            file.rewrite_heap(&heap),
            Err(Error::RewriteNotEligible { element: "heap" })
        ));
    }

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * BLOCK_SIZE as u64);
    let mut file = FitsFile::open(&path).unwrap();
    let units = file.units().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].header.get_string("ORIGIN").as_deref(), Some("fitskit"));
    assert_eq!(units[1].header.get_string("TFORM1").as_deref(), Some("1PJ(3)"));
}

#[test]
fn test_grown_header_cannot_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grown.fits");
    write_sample(&path);

    let mut file = FitsFile::open_rw(&path).unwrap();
    let mut units = file.units().unwrap();
    let header = &mut units[0].header;
    for i in 0..40 {
        header.add_int(&format!("EXTRA{i}"), i, None).unwrap();
    }
    assert!(!header.can_rewrite());
    assert!(matches!(
        file.rewrite_header(header),
        Err(Error::RewriteNotEligible { element: "header" })
    ));
}

#[test]
fn test_read_only_file_cannot_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readonly.fits");
    write_sample(&path);

    let mut file = FitsFile::open(&path).unwrap();
    let mut units = file.units().unwrap();
    assert!(!units[0].header.can_rewrite());
    assert!(file.rewrite_header(&mut units[0].header).is_err());
}

#[test]
fn test_trailing_junk_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.fits");
    write_sample(&path);
    let mut raw = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    raw.write_all(&[b'x'; 100]).unwrap();
    drop(raw);

    let mut file = FitsFile::open(&path).unwrap();
    assert_eq!(file.units().unwrap().len(), 2);
}

#[test]
fn test_missing_data_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.fits");

    let mut header = Header::new();
    header.set_simple(true).unwrap();
    header.set_bitpix(16).unwrap();
    header.set_naxes(1).unwrap();
    header.set_naxis(1, 100).unwrap();
    let mut out = std::fs::File::create(&path).unwrap();
    header.write(&mut out).unwrap();
    drop(out);

    let mut file = FitsFile::open(&path).unwrap();
    assert!(matches!(
        file.units(),
        Err(Error::TruncatedFile { offset }) if offset == BLOCK_SIZE as u64
    ));
}
