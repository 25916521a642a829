//! Tests for retrieval ranking correctness.

use crate::retriever::TfidfRetriever;
use crate::types::DocumentChunk;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Helper to build a corpus with one chunk per text, all from one file.
    fn corpus(texts: &[&str]) -> Vec<DocumentChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| DocumentChunk {
                content: text.to_string(),
                source: "docs/kpi_definitions.md".to_string(),
                parent_id: 0,
                chunk_id: i,
                headers: Vec::new(),
                score: None,
            })
            .collect()
    }

    #[test]
    fn test_relevant_chunk_ranks_first() {
        let retriever = TfidfRetriever::new(
            corpus(&[
                "Returns policy: beverages may be returned within 14 days.",
                "Average Order Value (AOV) = SUM(UnitPrice * Quantity) / COUNT(DISTINCT OrderID).",
                "Summer Beverages 1997 campaign runs from 1997-06-01 to 1997-06-30.",
            ]),
            4,
        );

        let results = retriever.query("What is the definition of average order value?", Some(2));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, 1);
        assert!(results[0].score.unwrap() > results[1].score.unwrap());
    }

    #[test]
    fn test_identical_text_scores_one() {
        let retriever = TfidfRetriever::new(corpus(&["apple banana", "banana cherry", "date"]), 3);

        let results = retriever.query("Apple banana", None);
        assert_eq!(results[0].chunk_id, 0);
        assert_eq!(results[0].score, Some(1.0));
        assert_eq!(results[2].chunk_id, 2);
        assert_eq!(results[2].score, Some(0.0));
    }

    #[test]
    fn test_zero_overlap_keeps_corpus_order() {
        let retriever = TfidfRetriever::new(corpus(&["alpha", "beta", "gamma", "delta"]), 4);

        let results = retriever.query("completely unrelated words", None);
        let order: Vec<usize> = results.iter().map(|c| c.chunk_id).collect();

        assert_eq!(order, vec![0, 1, 2, 3]);
        assert!(results.iter().all(|c| c.score == Some(0.0)));
    }

    #[test]
    fn test_equal_scores_keep_corpus_order() {
        let retriever = TfidfRetriever::new(
            corpus(&[
                "shipping policy",
                "average order value",
                "gross margin",
                "average order value",
            ]),
            2,
        );

        let results = retriever.query("order value", None);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, 1);
        assert_eq!(results[1].chunk_id, 3);
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_k_larger_than_corpus_returns_all_once() {
        let retriever = TfidfRetriever::new(corpus(&["one fish", "two fish", "red fish"]), 2);

        let results = retriever.query("fish", Some(10));

        assert_eq!(results.len(), 3);
        let ids: HashSet<usize> = results.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| *id < 3));
    }

    #[test]
    fn test_default_k_applies() {
        let retriever = TfidfRetriever::new(corpus(&["a1 b1", "c1 d1", "e1 f1", "g1 h1"]), 2);

        assert_eq!(retriever.query("a1", None).len(), 2);
        assert_eq!(retriever.query("a1", Some(0)).len(), 2);
        assert_eq!(retriever.query("a1", Some(3)).len(), 3);
    }

    #[test]
    fn test_scores_are_rounded_and_sorted() {
        let retriever = TfidfRetriever::new(
            corpus(&[
                "revenue by category for beverages",
                "revenue by customer",
                "freight cost per order",
                "category margin",
            ]),
            4,
        );

        let results = retriever.query("beverages revenue category", None);
        let scores: Vec<f64> = results.iter().map(|c| c.score.unwrap()).collect();

        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        for score in scores {
            assert!((0.0..=1.0).contains(&score));
            assert_eq!((score * 10_000.0).round() / 10_000.0, score);
        }
    }

    #[test]
    fn test_query_does_not_touch_index() {
        let retriever = TfidfRetriever::new(corpus(&["alpha beta", "beta gamma"]), 2);
        let _ = retriever.query("beta", None);

        assert!(retriever.chunks().iter().all(|c| c.score.is_none()));
    }

    #[test]
    fn test_empty_corpus() {
        let retriever = TfidfRetriever::new(Vec::new(), 4);
        assert!(retriever.is_empty());
        assert!(retriever.query("anything", None).is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let retriever = Arc::new(TfidfRetriever::new(
            corpus(&["campaign dates", "kpi formulas", "return policy"]),
            1,
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let retriever = Arc::clone(&retriever);
                std::thread::spawn(move || retriever.query("kpi formulas", None)[0].chunk_id)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }
}
