use serde::{Deserialize, Serialize};

/// A single normalized job listing extracted from an external source.
///
/// `sequence_id` and `link` are both unique within one acquisition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub sequence_id: u64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
}

/// A posting scored against a resume and placed in the final ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatch {
    pub posting: Posting,
    pub score: f64, // 0 – 100
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_requirements: Vec<String>,
    pub recommendations: Vec<String>,
    /// Dense 1..N over the returned matches.
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_serializes_camel_case() {
        let posting = Posting {
            sequence_id: 3,
            title: "Backend Engineer".to_string(),
            link: "https://example.com/jobs/3".to_string(),
            description: "Rust services".to_string(),
            company: Some("Acme".to_string()),
            location: None,
            date_posted: None,
        };
        let value = serde_json::to_value(&posting).unwrap();
        assert_eq!(value["sequenceId"], 3);
        assert_eq!(value["company"], "Acme");
        assert!(value["datePosted"].is_null());
    }
}
