use docrag_core::{Chunk, Error, ScoredChunk};
use docrag_hybrid::fuse;

fn hit(content: &str, score: f32, position: usize) -> ScoredChunk {
    ScoredChunk { chunk: Chunk::new(content), score, position }
}

#[test]
fn union_with_absent_ranks() {
    let semantic = vec![hit("alpha", 0.9, 0), hit("bravo", 0.5, 1)];
    let keyword = vec![hit("bravo", 1.0, 1), hit("charlie", 0.5, 2)];
    let fused = fuse(semantic, keyword, 0.7, 50).unwrap();

    let order: Vec<&str> = fused.iter().map(|f| f.chunk.content.as_str()).collect();
    assert_eq!(order, vec!["bravo", "alpha", "charlie"]);

    assert_eq!((fused[0].semantic_rank, fused[0].keyword_rank), (Some(1), Some(0)));
    assert_eq!((fused[1].semantic_rank, fused[1].keyword_rank), (Some(0), None));
    assert_eq!((fused[2].semantic_rank, fused[2].keyword_rank), (None, Some(1)));

    assert!((fused[0].combined_score - (0.7 * 0.5 + 0.3 * 1.0)).abs() < 1e-6);
    assert!((fused[1].combined_score - 0.7 * 0.9).abs() < 1e-6);
    assert!((fused[2].combined_score - 0.3 * 0.5).abs() < 1e-6);
}

#[test]
fn presence_in_both_lists_never_lowers_the_score() {
    for alpha in [0.0f32, 0.25, 0.5, 0.7, 1.0] {
        let semantic_only = fuse(vec![hit("doc", 0.6, 0)], vec![], alpha, 50).unwrap();
        let keyword_only = fuse(vec![], vec![hit("doc", 0.4, 0)], alpha, 50).unwrap();
        let both = fuse(vec![hit("doc", 0.6, 0)], vec![hit("doc", 0.4, 0)], alpha, 50).unwrap();
        assert_eq!(both.len(), 1);
        assert!(both[0].combined_score >= semantic_only[0].combined_score, "alpha={alpha}");
        assert!(both[0].combined_score >= keyword_only[0].combined_score, "alpha={alpha}");
    }
}

#[test]
fn alpha_outside_unit_interval_is_rejected() {
    for alpha in [1.5f32, -0.1, f32::NAN] {
        let err = fuse(vec![hit("a", 1.0, 0)], vec![], alpha, 50).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "alpha={alpha}");
    }
}

#[test]
fn chunks_sharing_a_prefix_are_the_same_item() {
    let prefix = "x".repeat(50);
    let semantic = vec![hit(&format!("{prefix} tail one"), 0.8, 0)];
    let keyword = vec![hit(&format!("{prefix} tail two"), 1.0, 3)];
    let fused = fuse(semantic, keyword, 0.7, 50).unwrap();
    assert_eq!(fused.len(), 1);
    assert_eq!(fused[0].keyword_rank, Some(0));

    let distinct = fuse(vec![hit("abc one", 0.8, 0)], vec![hit("abc two", 1.0, 1)], 0.7, 50).unwrap();
    assert_eq!(distinct.len(), 2);
}

#[test]
fn equal_scores_keep_union_order() {
    let fused = fuse(vec![hit("semantic", 0.4, 0)], vec![hit("keyword", 0.4, 1)], 0.5, 50).unwrap();
    let order: Vec<&str> = fused.iter().map(|f| f.chunk.content.as_str()).collect();
    assert_eq!(order, vec!["semantic", "keyword"]);
}

#[test]
fn repeated_fingerprint_keeps_first_occurrence() {
    let semantic = vec![hit("same", 0.9, 0), hit("same", 0.1, 4)];
    let keyword = vec![hit("same", 1.0, 0), hit("same", 0.5, 4)];
    let fused = fuse(semantic, keyword, 0.5, 50).unwrap();
    assert_eq!(fused.len(), 1);
    assert_eq!(fused[0].semantic_score, Some(0.9));
    assert_eq!(fused[0].keyword_score, Some(1.0));
    assert!((fused[0].combined_score - 0.95).abs() < 1e-6);
}
