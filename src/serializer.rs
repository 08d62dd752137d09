//! Serialization of OpenAPI documents to YAML or JSON, and the file writer.

use crate::document::DocumentModel;
use crate::error::{Error, Result};
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Output formats for the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// File name of the document written in this format.
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "openapi-docs.yml",
            OutputFormat::Json => "openapi-docs.json",
        }
    }

    pub fn serialize(self, doc: &OpenApiDocument) -> Result<String> {
        match self {
            OutputFormat::Yaml => serialize_yaml(doc),
            OutputFormat::Json => serialize_json(doc),
        }
    }
}

/// Serializes an OpenAPI document to YAML format.
///
/// # Example
///
/// ```
/// use route_openapi::document::DocumentModel;
/// use route_openapi::openapi_builder::OpenApiBuilder;
/// use route_openapi::serializer::serialize_yaml;
///
/// let doc = OpenApiBuilder::new().build(&DocumentModel::new());
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("openapi: 3.0.0"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes an OpenAPI document to pretty-printed JSON.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Writes string content to a file, creating parent directories first.
///
/// # Errors
///
/// Returns [`Error::DocumentWrite`] if the directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());
    let write_error = |e: std::io::Error| Error::DocumentWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, content).map_err(write_error)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Persists a finished document model.
pub trait DocumentWriter {
    /// Writes the model into `destination` and returns the path of the written artifact.
    fn write(&self, model: &DocumentModel, destination: &Path) -> Result<PathBuf>;
}

/// Writes `openapi-docs.yml` or `openapi-docs.json` into a destination directory.
pub struct FileDocumentWriter {
    builder: OpenApiBuilder,
    format: OutputFormat,
}

impl FileDocumentWriter {
    pub fn new(builder: OpenApiBuilder, format: OutputFormat) -> Self {
        Self { builder, format }
    }
}

impl DocumentWriter for FileDocumentWriter {
    fn write(&self, model: &DocumentModel, destination: &Path) -> Result<PathBuf> {
        let doc = self.builder.build(model);
        let content = self.format.serialize(&doc)?;
        let path = destination.join(self.format.file_name());
        write_to_file(&content, &path)?;
        info!(
            "Wrote {} paths to {}",
            doc.paths.len(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EndpointRecord, RequestConfig, ResponseConfig};
    use crate::extractor::HttpMethod;
    use tempfile::TempDir;

    fn create_test_model() -> DocumentModel {
        let mut model = DocumentModel::new();
        model.register(EndpointRecord {
            method: HttpMethod::Get,
            path: "/health".to_string(),
            summary: "health".to_string(),
            description: None,
            tag: "system".to_string(),
            request: RequestConfig::default(),
            responses: ResponseConfig::default(),
            security: Vec::new(),
        });
        model
    }

    #[test]
    fn test_serialize_yaml_and_json() {
        let doc = OpenApiBuilder::new().build(&create_test_model());

        let yaml = serialize_yaml(&doc).unwrap();
        let from_yaml: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(from_yaml["paths"]["/health"]["get"]["summary"], "health");

        let json = serialize_json(&doc).unwrap();
        let from_json: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json["paths"]["/health"]["get"]["tags"][0], "system");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/docs/out.yml");

        write_to_file("openapi: 3.0.0\n", &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "openapi: 3.0.0\n");
    }

    #[test]
    fn test_write_to_file_reports_document_write() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let err = write_to_file("x", &blocker.join("out.yml")).unwrap_err();
        assert!(matches!(err, Error::DocumentWrite { .. }));
    }

    #[test]
    fn test_file_document_writer() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FileDocumentWriter::new(OpenApiBuilder::new(), OutputFormat::Json);

        let path = writer
            .write(&create_test_model(), &temp_dir.path().join("docs"))
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "openapi-docs.json");
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["openapi"], "3.0.0");
    }
}
