use proptest::prelude::*;

use flbwt::index::{bwt, sa};
use flbwt::io::bwtfile;
use flbwt::{inverse, transform, transform_with_opt, TransformOpt};

fn naive_bwt(text: &[u8]) -> (Vec<u8>, u64) {
    let mut rows: Vec<usize> = (0..=text.len()).collect();
    rows.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
    let mut out = Vec::with_capacity(text.len());
    let mut last = 0;
    for (r, &s) in rows.iter().enumerate() {
        if s == 0 {
            last = r as u64;
        } else {
            out.push(text[s - 1]);
        }
    }
    (out, last)
}

#[test]
fn edge_shapes_round_trip() {
    let sorted: Vec<u8> = (0..=255u8).collect();
    let reverse: Vec<u8> = (0..=255u8).rev().collect();
    let cases: Vec<Vec<u8>> = vec![
        b"x".to_vec(),
        b"i$".to_vec(),
        vec![b'a'; 4096],
        vec![0u8; 777],
        sorted,
        reverse,
        b"abracadabra".repeat(300),
        b"mmississiippii$".to_vec(),
    ];
    for t in cases {
        let (b, last) = transform(&t).unwrap();
        assert_eq!(b.len(), t.len());
        assert!(last >= 1 && last <= t.len() as u64);
        assert_eq!(inverse(&b, last).unwrap(), t);
    }
}

#[test]
fn file_format_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let text = b"she sells sea shells by the sea shore".repeat(40);
    let (b, last) = transform(&text).unwrap();
    let path = dir.path().join("shells.bwt");
    bwtfile::save_to_file(&path, &b, last).unwrap();
    let (b2, last2) = bwtfile::load_from_file(&path).unwrap();
    assert_eq!((b2.as_slice(), last2), (b.as_slice(), last));
    assert_eq!(inverse(&b2, last2).unwrap(), text);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn random_bytes_round_trip(text in prop::collection::vec(any::<u8>(), 1..2000)) {
        let (b, last) = transform(&text).unwrap();
        prop_assert_eq!(inverse(&b, last).unwrap(), text);
    }

    #[test]
    fn small_alphabets_match_naive(text in prop::collection::vec(0u8..3, 1..300)) {
        prop_assert_eq!(transform(&text).unwrap(), naive_bwt(&text));
    }

    #[test]
    fn matches_full_suffix_array(text in prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..3000)) {
        let sa_arr = sa::build_sa(&text).unwrap();
        prop_assert_eq!(transform(&text).unwrap(), bwt::bwt_from_sa(&text, &sa_arr));
    }

    #[test]
    fn hash_table_size_does_not_change_output(
        text in prop::collection::vec(0u8..4, 1..500),
        buckets in 1usize..50,
        step in 1usize..64,
    ) {
        let opt = TransformOpt { hash_table_size: Some(buckets), arena_increment: step };
        let a = transform_with_opt(&text, &opt).unwrap();
        prop_assert_eq!((a.bwt, a.last), transform(&text).unwrap());
    }
}
