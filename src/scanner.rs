use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions recognized as schema modules.
pub const SCHEMA_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Scanner for schema module directories.
///
/// The `SchemaScanner` recursively walks a schema directory and collects every JSON or YAML
/// schema module. Hidden directories (those starting with `.`) and `node_modules` are skipped.
///
/// # Example
///
/// ```no_run
/// use route_openapi::scanner::SchemaScanner;
/// use std::path::PathBuf;
///
/// let scanner = SchemaScanner::new(PathBuf::from("./schemas"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} schema modules", result.schema_files.len());
/// ```
pub struct SchemaScanner {
    root_path: PathBuf,
}

/// Result of a schema directory scan.
pub struct ScanResult {
    /// Schema module files, sorted by path
    pub schema_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl SchemaScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects schema modules.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let root_meta = std::fs::metadata(&self.root_path).with_context(|| {
            format!(
                "Schema directory not accessible: {}",
                self.root_path.display()
            )
        })?;
        if !root_meta.is_dir() {
            anyhow::bail!(
                "Schema path is not a directory: {}",
                self.root_path.display()
            );
        }

        let mut schema_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() == self.root_path || !is_skipped(e.file_name()))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && is_schema_module(path) {
                        debug!("Found schema module: {}", path.display());
                        schema_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult {
            schema_files,
            warnings,
        })
    }
}

fn is_skipped(file_name: &std::ffi::OsStr) -> bool {
    let name = file_name.to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}

pub fn is_schema_module(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCHEMA_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(result: &ScanResult) -> Vec<String> {
        result
            .schema_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_collects_json_and_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("user.json"), "{}").unwrap();
        fs::write(root.join("order.yaml"), "{}").unwrap();
        fs::write(root.join("user.schema.ts"), "export const x = 1;").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let result = SchemaScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(names(&result), vec!["order.yaml", "user.json"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("admin/reports")).unwrap();
        fs::write(root.join("admin/admin.yml"), "{}").unwrap();
        fs::write(root.join("admin/reports/report.json"), "{}").unwrap();

        let result = SchemaScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.schema_files.len(), 2);
    }

    #[test]
    fn test_scan_skips_hidden_and_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join(".cache")).unwrap();
        fs::create_dir(root.join("node_modules")).unwrap();
        fs::write(root.join(".cache/user.json"), "{}").unwrap();
        fs::write(root.join("node_modules/package.json"), "{}").unwrap();
        fs::write(root.join("user.json"), "{}").unwrap();

        let result = SchemaScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(names(&result), vec!["user.json"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = SchemaScanner::new(temp_dir.path().join("missing"));

        assert!(scanner.scan().is_err());
    }
}
