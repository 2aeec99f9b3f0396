use pageblock::encoding::{new_data_reader, new_data_writer, v2};
use pageblock::object::objects;
use pageblock::{
    DataReader, DataWriter, Encoding, Error, MemoryReader, ReadContext, Record, Version,
};

fn three_pages(encoding: Encoding) -> (Vec<u8>, Vec<Record>) {
    let mut writer = v2::DataWriter::new(Vec::new(), encoding).expect("writer");
    let mut records = Vec::new();
    let mut offset = 0u64;
    for payload in [&b"first page"[..], b"second page", b"third page"] {
        writer.write(b"id", payload).expect("write");
        let len = writer.cut_page().expect("cut") as u32;
        records.push(Record::new(offset, len));
        offset += u64::from(len);
    }
    (writer.into_inner().expect("sink"), records)
}

/// Three pages of one object each, written in `version` format.
fn pages_of(version: Version, encoding: Encoding) -> (Vec<u8>, Vec<Record>) {
    let mut block = Vec::new();
    let mut records = Vec::new();
    {
        let mut writer = new_data_writer(version, &mut block, encoding, encoding.default_level())
            .expect("writer");
        let mut offset = 0u64;
        for payload in [&b"first page"[..], b"second page", b"third page"] {
            writer.write(b"id", payload).expect("write");
            let len = writer.cut_page().expect("cut") as u32;
            records.push(Record::new(offset, len));
            offset += u64::from(len);
        }
        writer.complete().expect("complete");
    }
    (block, records)
}

#[test]
fn skipping_a_page_is_a_contiguity_error() {
    let (block, records) = three_pages(Encoding::Zstd);
    let mut reader = v2::DataReader::new(MemoryReader::new(block), Encoding::Zstd).expect("reader");
    let mut buffer = Vec::new();
    let result = reader.read(
        &ReadContext::background(),
        &[records[0], records[2]],
        &mut buffer,
    );
    assert!(matches!(result, Err(Error::NonContiguous { .. })));
    assert!(buffer.is_empty(), "no bytes fetched for a rejected list");
}

#[test]
fn gaps_and_overlaps_are_rejected() {
    let mut reader =
        v2::DataReader::new(MemoryReader::new(vec![0u8; 64]), Encoding::None).expect("reader");
    let mut buffer = Vec::new();
    let ctx = ReadContext::background();
    for records in [
        [Record::new(0, 10), Record::new(20, 5)],
        [Record::new(0, 10), Record::new(5, 10)],
    ] {
        assert!(matches!(
            reader.read(&ctx, &records, &mut buffer),
            Err(Error::NonContiguous { .. })
        ));
    }
}

#[test]
fn reading_with_another_codec_fails() {
    let codecs: Vec<Encoding> = Encoding::ALL
        .into_iter()
        .filter(Encoding::is_supported)
        .collect();
    for version in [Version::V1, Version::V2] {
        for &written in codecs.iter().filter(|e| **e != Encoding::None) {
            let (block, records) = pages_of(version, written);
            for &read_with in codecs.iter().filter(|e| **e != written) {
                let mut reader =
                    new_data_reader(version, MemoryReader::new(block.clone()), read_with)
                        .expect("reader");
                let mut buffer = Vec::new();
                let result = reader.read(&ReadContext::background(), &records, &mut buffer);
                if version == Version::V1 && read_with == Encoding::None {
                    // the identity codec hands back the stored bytes; the
                    // object framing is what rejects them
                    let pages = result.expect("identity read");
                    assert!(
                        pages.iter().all(|page| objects(page).any(|o| o.is_err())),
                        "{written} block read as none decoded as objects"
                    );
                } else {
                    assert!(
                        result.is_err(),
                        "{version} {written} block decoded with {read_with}"
                    );
                }
            }
        }
    }
}

#[test]
fn cancelled_context_stops_the_read() {
    let (block, records) = three_pages(Encoding::Lz4);
    let mut reader = v2::DataReader::new(MemoryReader::new(block), Encoding::Lz4).expect("reader");
    let ctx = ReadContext::background();
    ctx.cancel();
    let mut buffer = vec![1u8, 2, 3];
    assert!(matches!(
        reader.read(&ctx, &records, &mut buffer),
        Err(Error::Cancelled)
    ));
    assert_eq!(buffer, vec![1, 2, 3]);

    let expired = ReadContext::with_timeout(std::time::Duration::ZERO);
    assert!(matches!(
        reader.read(&expired, &records, &mut buffer),
        Err(Error::DeadlineExceeded)
    ));
    assert_eq!(buffer, vec![1, 2, 3]);
}

#[test]
fn truncated_block_ends_scan_with_corruption() {
    let (mut block, _) = three_pages(Encoding::None);
    block.truncate(block.len() - 3);
    let mut reader = v2::DataReader::new(MemoryReader::new(block), Encoding::None).expect("reader");
    let mut buffer = Vec::new();
    assert!(reader.next_page(&mut buffer).expect("first").is_some());
    assert!(reader.next_page(&mut buffer).expect("second").is_some());
    assert!(matches!(
        reader.next_page(&mut buffer),
        Err(Error::CorruptPage(_))
    ));
}
