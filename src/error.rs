use thiserror::Error;

/// Errors raised at the crate boundary.
///
/// The solver itself never fails; these only come from configuration
/// checks and from decoding host-supplied JSON.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to decode scene: {0}")]
    InvalidScene(#[source] serde_json::Error),

    #[error("failed to decode layout config: {0}")]
    InvalidConfigJson(#[source] serde_json::Error),
}

impl LayoutError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }
}
