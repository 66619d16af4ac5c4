use crate::model::ElementId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Could not serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Unknown model element: {id}")]
    UnknownElement { id: ElementId },

    #[error("Undo manager failed: {message}")]
    Undo { message: String },
}
