use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    /// Unbalanced delimiters or a declaration that does not match the route vocabulary.
    StructuralParse { file: PathBuf, message: String },
    /// A mounted router has neither a local definition nor a resolvable import.
    RouterResolution { router: String, file: PathBuf },
    /// A referenced schema module or export could not be loaded.
    SchemaResolution {
        module: String,
        export: String,
        reason: String,
    },
    DocumentWrite { path: PathBuf, message: String },
    InvalidConfig(String),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::StructuralParse { file, message } => {
                write!(f, "Unrecognized declaration in {}: {}", file.display(), message)
            }
            Error::RouterResolution { router, file } => write!(
                f,
                "Router '{}' is neither defined nor imported in {}",
                router,
                file.display()
            ),
            Error::SchemaResolution {
                module,
                export,
                reason,
            } => write!(f, "Cannot resolve schema {}.{}: {}", module, export, reason),
            Error::DocumentWrite { path, message } => {
                write!(f, "Cannot write document to {}: {}", path.display(), message)
            }
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_resolution_message_names_reference() {
        let err = Error::SchemaResolution {
            module: "schemas".to_string(),
            export: "userOut".to_string(),
            reason: "export not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve schema schemas.userOut: export not found"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("gone"));
    }
}
