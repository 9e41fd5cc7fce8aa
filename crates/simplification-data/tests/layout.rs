use std::fs;

use simplification_data::{ParallelCorpus, TierPair};
use tempfile::tempdir;

#[test]
fn loads_every_pair_from_default_layout() {
    let tmp = tempdir().expect("tempdir");
    let base = tmp.path();

    for (count, pair) in TierPair::CURRICULUM.into_iter().enumerate() {
        let (src, tgt) = pair.default_paths(base);
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        let lines = count + 2;
        let body = |tier: &str| {
            (0..lines)
                .map(|i| format!("{} sentence {}", tier, i))
                .collect::<Vec<_>>()
                .join("\n")
        };
        fs::write(&src, body(pair.source_tier().file_stem())).unwrap();
        fs::write(&tgt, body(pair.target_tier().file_stem())).unwrap();
    }

    for (count, pair) in TierPair::CURRICULUM.into_iter().enumerate() {
        let (src, tgt) = pair.default_paths(base);
        let corpus = ParallelCorpus::load(&src, &tgt).unwrap();
        assert_eq!(corpus.len(), count + 2);
        let first = &corpus.pairs()[0];
        assert!(first.source.starts_with(pair.source_tier().file_stem()));
        assert!(first.target.starts_with(pair.target_tier().file_stem()));
    }
}

#[test]
fn tier_pairs_use_short_keys_when_serialized() {
    let encoded = serde_json::to_string(&TierPair::CURRICULUM).unwrap();
    assert_eq!(encoded, r#"["ele_int","int_adv","ele_adv"]"#);

    let decoded: TierPair = serde_json::from_str(r#""int_adv""#).unwrap();
    assert_eq!(decoded, TierPair::IntermediateAdvanced);
    assert_eq!(decoded.key(), "int_adv");
}
