use std::fs::File;
use std::io::BufWriter;

use pageblock::encoding::{new_data_reader, new_data_writer};
use pageblock::object::objects;
use pageblock::{BlockConfig, DataReader, DataWriter, Encoding, MmapReader, ReadContext, Record, Version};
use tempfile::tempdir;

#[test]
fn file_backed_block_reads_back() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("data.block");

    let mut records = Vec::new();
    {
        let file = BufWriter::new(File::create(&path).expect("create"));
        let mut writer = new_data_writer(Version::V2, file, Encoding::Zstd, 5).expect("writer");
        let mut offset = 0u64;
        for page in 0..4u32 {
            for i in 0..16u32 {
                let id = (page * 16 + i).to_le_bytes();
                writer.write(&id, &vec![page as u8; 256]).expect("write");
            }
            let len = writer.cut_page().expect("cut") as u32;
            records.push(Record::new(offset, len));
            offset += u64::from(len);
        }
        writer.complete().expect("complete");
    }
    let size = std::fs::metadata(&path).expect("metadata").len();
    assert_eq!(size, records.iter().map(|r| u64::from(r.length)).sum::<u64>());

    let source = MmapReader::open(&path).expect("open");
    let mut reader = new_data_reader(Version::V2, source, Encoding::Zstd).expect("reader");
    let mut buffer = Vec::new();
    let pages = reader
        .read(&ReadContext::background(), &records[1..3], &mut buffer)
        .expect("read");
    for (n, page) in pages.iter().enumerate() {
        let payloads: Vec<_> = objects(page)
            .map(|object| object.expect("object").payload.to_vec())
            .collect();
        assert_eq!(payloads.len(), 16);
        assert!(payloads.iter().all(|p| p == &vec![(n + 1) as u8; 256]));
    }
}

#[test]
fn empty_file_has_no_pages() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.block");
    File::create(&path).expect("create");

    let config = BlockConfig::default();
    let mut reader = config
        .data_reader(MmapReader::open(&path).expect("open"))
        .expect("reader");
    let mut buffer = Vec::new();
    assert!(reader.next_page(&mut buffer).expect("scan").is_none());
}
