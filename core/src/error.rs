use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A field or index name that does not name a term index.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// An artifact expected on disk is absent.
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("document {doc_id}: invalid review date {date:?}")]
    InvalidDate { doc_id: String, date: String },
    #[error("duplicate document id: {0}")]
    DuplicateId(String),
    #[error("malformed document at line {line}: {source}")]
    MalformedDocument {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}
