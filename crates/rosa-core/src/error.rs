use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Index out of range: {category}[{index}] (bound {bound})")]
    OutOfRange {
        category: &'static str,
        index: i64,
        bound: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Host function unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Host array not resolved: {0}")]
    ArrayNotResolved(&'static str),

    #[error("Failed to patch code at address {address:#x}: {message}")]
    PatchFailed { address: usize, message: String },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Process image not found: {0}")]
    ImageNotFound(String),

    #[error("No script environment is loaded")]
    NoEnvironment,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Script error: {0}")]
    Script(#[from] mlua::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub(crate) fn out_of_range(category: &'static str, index: i64, bound: usize) -> Self {
        Error::OutOfRange {
            category,
            index,
            bound,
        }
    }
}

impl From<Error> for mlua::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Script(inner) => inner,
            other => mlua::Error::external(other),
        }
    }
}
