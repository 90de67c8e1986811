use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DocumentCreate {
    pub key: String,
    pub content: String,
}

/// Partial document update; omitted and explicit-null fields are both left
/// unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}
