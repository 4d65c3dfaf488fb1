use std::fs;
use tempfile::TempDir;

use localkb_core::traits::{Encoder, VectorRanker};
use localkb_core::KbError;
use localkb_embed::HashEncoder;
use localkb_vector::{load_index, load_index_bytes, save_index, save_index_bytes, FlatIpIndex};

fn texts() -> Vec<String> {
    [
        "hybrid retrieval fuses two rankings",
        "bm25 scores keyword overlap",
        "dense vectors capture meaning",
        "reciprocal rank fusion sums inverse ranks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn built() -> (HashEncoder, FlatIpIndex) {
    let encoder = HashEncoder::new(256);
    let rows = encoder.encode(&texts()).unwrap();
    let index = FlatIpIndex::from_rows(encoder.dim(), &rows).unwrap();
    (encoder, index)
}

#[test]
fn round_trip_reproduces_search_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kb").join("index.flat");
    let (encoder, index) = built();
    let query = encoder.encode_one("rank fusion");
    let before = index.search(&query, 3).unwrap();

    save_index(&index, &path).unwrap();
    let loaded = load_index(&path).unwrap().expect("index on disk");
    assert_eq!(VectorRanker::len(&loaded), 4);
    assert_eq!(loaded.search(&query, 3).unwrap(), before);
    assert_eq!(before.indices[0], 3);
}

#[test]
fn byte_buffer_path_is_interchangeable() {
    let dir = TempDir::new().unwrap();
    let streamed = dir.path().join("streamed.flat");
    let buffered = dir.path().join("buffered.flat");
    let (_, index) = built();

    save_index(&index, &streamed).unwrap();
    save_index_bytes(&index, &buffered).unwrap();
    assert_eq!(fs::read(&streamed).unwrap(), fs::read(&buffered).unwrap());
    assert_eq!(load_index_bytes(&streamed).unwrap().unwrap(), index);
    assert_eq!(load_index(&buffered).unwrap().unwrap(), index);
}

#[test]
fn missing_index_is_none() {
    let dir = TempDir::new().unwrap();
    assert!(load_index(&dir.path().join("absent.flat")).unwrap().is_none());
    assert!(load_index_bytes(&dir.path().join("absent.flat")).unwrap().is_none());
}

#[test]
fn garbage_file_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.flat");
    fs::write(&path, b"definitely not an index").unwrap();
    assert!(matches!(load_index(&path), Err(KbError::CorruptIndex(_))));
}
