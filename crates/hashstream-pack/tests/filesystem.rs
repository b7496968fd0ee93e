use std::sync::Arc;

use futures::TryStreamExt;
use rand::RngCore;

use hashstream_index::{FindOptions, FsIndexStore, IndexReader, IndexRecord, MultipleLevelIndexWriter};
use hashstream_pack::{PackFormat, PackReader, PackWriter, WriterConfig};
use hashstream_store::FsPackStore;
use hashstream_types::{ByteRange, Location};

#[tokio::test]
async fn write_then_read_ranges_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let packs = Arc::new(FsPackStore::open(dir.path().join("packs")).await.unwrap());
    let index = Arc::new(FsIndexStore::open(dir.path().join("index")).await.unwrap());

    let mut data = vec![0u8; 3000];
    rand::thread_rng().fill_bytes(&mut data);

    let config = WriterConfig {
        blob_size: 250,
        shard_size: 1000,
        ..Default::default()
    };
    let result = PackWriter::new(packs.clone(), config)
        .with_index_writer(Arc::new(MultipleLevelIndexWriter::new(index.clone())))
        .write(&data[..])
        .await
        .unwrap();
    assert_eq!(result.packs.len(), 3);
    for pack in &result.packs {
        assert!(packs.root().join(pack.to_hex()).exists());
    }

    let records: Vec<IndexRecord> = IndexReader::new(index.clone())
        .find_records(result.containing, FindOptions::default())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].child_count(), 3);

    let reader = PackReader::new(packs.clone());
    let mut rebuilt = Vec::new();
    if let IndexRecord::Containing(containing) = &records[0] {
        for sub in &containing.sub_records {
            let IndexRecord::Pack(pack) = sub else {
                panic!("expected pack record");
            };
            let ranges: Vec<ByteRange> = pack.blobs.iter().map(|b| b.range()).collect();
            let blobs: Vec<_> = reader
                .stream(Location::Digest(pack.multihash), Some(ranges))
                .try_collect()
                .await
                .unwrap();
            assert_eq!(blobs.len(), 4);
            for blob in blobs {
                rebuilt.extend_from_slice(&blob.bytes);
            }
        }
    }
    assert_eq!(rebuilt, data);
}

#[tokio::test]
async fn raw_packs_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let packs = Arc::new(FsPackStore::open(dir.path()).await.unwrap());
    let config = WriterConfig {
        pack_format: "raw".parse::<PackFormat>().unwrap(),
        blob_size: 1000,
        ..Default::default()
    };
    let data = b"raw packs hold their blob verbatim".repeat(100);
    let result = PackWriter::new(packs.clone(), config).write(&data[..]).await.unwrap();
    assert_eq!(result.packs.len(), 4);

    let first = std::fs::read(dir.path().join(result.packs[0].to_hex())).unwrap();
    assert_eq!(&first[..], &data[..1000]);
}
