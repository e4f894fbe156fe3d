use artifactorium_types::NameError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("the '{0}' entry holds the registry root and cannot be reset")]
    ReservedName(String),
    #[error("property already set: {0}")]
    PropertyAlreadySet(String),
    #[error("property not in registry: {0}")]
    UnknownProperty(String),
    #[error("invalid entry name: {0}")]
    InvalidName(#[from] NameError),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error(
        "failed to resolve absolute path for {path}: {source}",
        path = path.display()
    )]
    AbsolutePath {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "failed to create directory {path}: {source}",
        path = path.display()
    )]
    Materialize {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize registry: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize registry: {0}")]
    Deserialization(String),
    #[error("failed to write registry file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read registry file: {0}")]
    FileRead(std::io::Error),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
