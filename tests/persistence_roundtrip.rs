//! # Persistence Round-Trip Tests
//!
//! A reloaded tree must be query-equivalent to the tree that was written:
//! same ids, same boxes, for every query box. Tested for both encodings:
//!
//! 1. Text: write, reload, compare yields over many random queries
//! 2. Binary: write, memory-map, compare yields over many random queries
//! 3. Cross: a text-reloaded tree written to binary reads back identically
//! 4. Malformed inputs fail with the documented error kinds
//!
//! The reloads deliberately reuse a fresh copy of the bounds source: the
//! files store only the structural tree.

use eyre::Result;
use kdbox::{builder, BoxIndex, BoxSource, Extent, FnSource, ParseError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

type Boxes = Vec<(Vec<f64>, Vec<f64>)>;

fn random_boxes(seed: u64, dims: usize, count: usize) -> Boxes {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut lo = Vec::with_capacity(dims);
            let mut hi = Vec::with_capacity(dims);
            for _ in 0..dims {
                let min = rng.gen_range(0.0..1.0);
                lo.push(min);
                hi.push(min + rng.gen_range(0.0..0.5));
            }
            (lo, hi)
        })
        .collect()
}

fn box_source(boxes: Boxes) -> FnSource<impl Fn(i32, &mut [f64], &mut [f64]) -> Result<Extent>> {
    FnSource::new(move |id, min: &mut [f64], max: &mut [f64]| {
        let (lo, hi) = &boxes[(id - 1) as usize];
        min.copy_from_slice(lo);
        max.copy_from_slice(hi);
        Ok(Extent::Region)
    })
}

fn query_sorted<S: BoxSource>(index: &BoxIndex<S>, q_min: &[f64], q_max: &[f64]) -> Vec<i32> {
    let mut ids: Vec<i32> = index
        .query(q_min, q_max)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    ids.sort_unstable();
    ids
}

fn assert_query_equivalent<A: BoxSource, B: BoxSource>(
    original: &BoxIndex<A>,
    reloaded: &BoxIndex<B>,
    seed: u64,
    dims: usize,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..30 {
        let mut q_min = Vec::with_capacity(dims);
        let mut q_max = Vec::with_capacity(dims);
        for _ in 0..dims {
            let a = rng.gen_range(-0.2..1.2);
            q_min.push(a);
            q_max.push(a + rng.gen_range(0.0..0.5));
        }

        assert_eq!(
            query_sorted(original, &q_min, &q_max),
            query_sorted(reloaded, &q_min, &q_max),
            "reloaded tree diverged on query ({:?}, {:?})",
            q_min,
            q_max
        );
    }
}

mod text_roundtrip {
    use super::*;

    #[test]
    fn text_reload_is_query_equivalent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.txt");
        let boxes = random_boxes(21, 2, 1_000);

        let index = builder()
            .dims(2)
            .leaf_size(25)
            .build(box_source(boxes.clone()), 1..=1_000)
            .unwrap();
        index.write_text(&path).unwrap();

        let reloaded = builder()
            .dims(2)
            .load_text(&path, box_source(boxes))
            .unwrap();

        assert_eq!(reloaded.node_count(), index.node_count());
        assert_eq!(reloaded.leaf_count(), index.leaf_count());
        assert_eq!(reloaded.item_count(), index.item_count());
        assert_query_equivalent(&index, &reloaded, 22, 2);

        // The spec scenario query.
        assert_eq!(
            query_sorted(&index, &[0.4, 0.4], &[0.6, 0.6]),
            query_sorted(&reloaded, &[0.4, 0.4], &[0.6, 0.6])
        );
    }

    #[test]
    fn empty_tree_roundtrips_through_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");

        let index = builder()
            .dims(3)
            .build(box_source(Vec::new()), 1..=0)
            .unwrap();
        index.write_text(&path).unwrap();

        let reloaded = builder()
            .dims(3)
            .load_text(&path, box_source(Vec::new()))
            .unwrap();

        assert!(reloaded.is_empty());
        assert!(query_sorted(&reloaded, &[0.0; 3], &[1.0; 3]).is_empty());
    }

    #[test]
    fn garbage_text_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.txt");
        std::fs::write(&path, "this is not a tree\n").unwrap();

        let err = builder()
            .dims(2)
            .load_text(&path, box_source(Vec::new()))
            .unwrap_err();

        assert!(err.downcast_ref::<ParseError>().is_some());
    }

    #[test]
    fn truncated_text_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trunc.txt");
        let boxes = random_boxes(23, 2, 200);

        let index = builder()
            .dims(2)
            .leaf_size(20)
            .build(box_source(boxes.clone()), 1..=200)
            .unwrap();
        index.write_text(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let cut = text.len() / 2;
        std::fs::write(&path, &text[..cut]).unwrap();

        let err = builder()
            .dims(2)
            .load_text(&path, box_source(boxes))
            .unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some());
    }

    #[test]
    fn missing_text_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = builder()
            .dims(2)
            .load_text(dir.path().join("absent.txt"), box_source(Vec::new()))
            .unwrap_err();

        assert!(err.to_string().contains("failed to open"));
    }
}

mod binary_roundtrip {
    use super::*;

    #[test]
    fn binary_reload_is_query_equivalent() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("idx");
        let boxes = random_boxes(31, 3, 1_000);

        let index = builder()
            .dims(3)
            .leaf_size(25)
            .build(box_source(boxes.clone()), 1..=1_000)
            .unwrap();
        index.write_binary(&index_dir).unwrap();

        let reloaded = builder()
            .dims(3)
            .load_binary(&index_dir, box_source(boxes))
            .unwrap();

        assert_eq!(reloaded.node_count(), index.node_count());
        assert_eq!(reloaded.leaf_count(), index.leaf_count());
        assert_eq!(reloaded.item_count(), index.item_count());
        assert_query_equivalent(&index, &reloaded, 32, 3);
    }

    #[test]
    fn empty_tree_roundtrips_through_binary() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("idx");

        let index = builder()
            .dims(2)
            .build(box_source(Vec::new()), 1..=0)
            .unwrap();
        index.write_binary(&index_dir).unwrap();

        let reloaded = builder()
            .dims(2)
            .load_binary(&index_dir, box_source(Vec::new()))
            .unwrap();

        assert!(reloaded.is_empty());
        assert!(query_sorted(&reloaded, &[0.0; 2], &[1.0; 2]).is_empty());
    }

    #[test]
    fn missing_array_file_fails_the_load() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("idx");
        let boxes = random_boxes(33, 2, 100);

        let index = builder()
            .dims(2)
            .build(box_source(boxes.clone()), 1..=100)
            .unwrap();
        index.write_binary(&index_dir).unwrap();
        std::fs::remove_file(index_dir.join("items")).unwrap();

        let err = builder()
            .dims(2)
            .load_binary(&index_dir, box_source(boxes))
            .unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn corrupted_header_fails_the_load() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("idx");
        let boxes = random_boxes(34, 2, 100);

        let index = builder()
            .dims(2)
            .build(box_source(boxes.clone()), 1..=100)
            .unwrap();
        index.write_binary(&index_dir).unwrap();

        let nodes = index_dir.join("nodes");
        let mut bytes = std::fs::read(&nodes).unwrap();
        bytes[3] ^= 0x55;
        std::fs::write(&nodes, &bytes).unwrap();

        let err = builder()
            .dims(2)
            .load_binary(&index_dir, box_source(boxes))
            .unwrap_err();
        assert!(err.to_string().contains("magic"));
    }
}

mod cross_encoding {
    use super::*;

    #[test]
    fn text_reload_then_binary_reload_matches_original() {
        let dir = tempdir().unwrap();
        let text_path = dir.path().join("index.txt");
        let bin_dir = dir.path().join("idx");
        let boxes = random_boxes(41, 2, 600);

        let index = builder()
            .dims(2)
            .leaf_size(30)
            .build(box_source(boxes.clone()), 1..=600)
            .unwrap();

        index.write_text(&text_path).unwrap();
        let from_text = builder()
            .dims(2)
            .load_text(&text_path, box_source(boxes.clone()))
            .unwrap();

        // A text-reloaded arena keeps the post-order layout, so it can be
        // written straight to the binary format.
        from_text.write_binary(&bin_dir).unwrap();
        let from_binary = builder()
            .dims(2)
            .load_binary(&bin_dir, box_source(boxes))
            .unwrap();

        assert_query_equivalent(&index, &from_binary, 42, 2);
    }
}
