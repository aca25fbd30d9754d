use thiserror::Error;

/// Errors raised while fetching, persisting or presenting the category taxonomy.
///
/// The tree builder and flattener never fail; malformed rows are reported as
/// orphans instead. Everything else that touches disk, the network or user
/// input funnels into this enum.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "web")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "web")]
    #[error("template error: {0}")]
    Template(String),

    #[error("catalog api returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("category {0} not found")]
    NotFound(i64),

    #[error("unknown status filter '{0}' (expected all, active or inactive)")]
    InvalidStatus(String),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
