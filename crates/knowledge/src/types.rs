//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// A retrievable section of a markdown document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Section text, headers included
    pub content: String,

    /// Path of the document the section came from
    pub source: String,

    /// Position of the parent document in corpus order
    pub parent_id: usize,

    /// Sequential index of this section within its parent
    pub chunk_id: usize,

    /// Titles of the enclosing headers, outermost first
    #[serde(default)]
    pub headers: Vec<String>,

    /// Similarity to the last query; only set on retrieval results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl DocumentChunk {
    /// Citation label in the form `<source>:chunk_<index>`.
    pub fn citation(&self) -> String {
        format!("{}:chunk_{}", self.source, self.chunk_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_format() {
        let chunk = DocumentChunk {
            content: "# Returns\nBeverages: 14 days".to_string(),
            source: "docs/product_policy.md".to_string(),
            parent_id: 2,
            chunk_id: 3,
            headers: vec!["Returns".to_string()],
            score: None,
        };

        assert_eq!(chunk.citation(), "docs/product_policy.md:chunk_3");
    }

    #[test]
    fn test_score_omitted_until_retrieved() {
        let chunk = DocumentChunk {
            content: "text".to_string(),
            source: "a.md".to_string(),
            parent_id: 0,
            chunk_id: 0,
            headers: Vec::new(),
            score: None,
        };

        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("score").is_none());
    }
}
