use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Invalid search parameters: {0}")]
    InvalidSearch(String),

    #[error("Locality table error: {0}")]
    LocalityTable(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Rendering {url} failed: {message}")]
    Render { url: String, message: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ScoutError {
    /// Failures scoped to a single target's page. The aggregator logs these
    /// and moves on; everything else crosses the pipeline boundary.
    pub fn is_target_level(&self) -> bool {
        matches!(self, ScoutError::Navigation { .. } | ScoutError::Render { .. })
    }

    pub(crate) fn navigation(url: &str, err: impl std::fmt::Display) -> Self {
        ScoutError::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn render(url: &str, err: impl std::fmt::Display) -> Self {
        ScoutError::Render {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(err: serde_json::Error) -> Self {
        ScoutError::LocalityTable(err.to_string())
    }
}
