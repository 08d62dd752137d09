//! Schema reference resolution.
//!
//! Validator expressions name schemas as `module.export`. A [`SchemaProvider`] turns such a
//! reference into a [`Schema`]; [`SchemaResolver`] sits in front of the provider and hands out
//! shared handles so each reference is loaded once per generation run.

use crate::error::{Error, Result};
use crate::scanner::{SchemaScanner, SCHEMA_EXTENSIONS};
use crate::schema::Schema;
use crate::syntax::is_ident_path;
use log::{debug, warn};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An unresolved `module.export` schema name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaReference {
    pub module: String,
    pub export: String,
}

impl SchemaReference {
    pub fn new(module: &str, export: &str) -> Self {
        Self {
            module: module.to_string(),
            export: export.to_string(),
        }
    }

    /// Parses the trailing `module.export` pair of a dotted identifier path.
    ///
    /// `schemas.userOut` and `api.schemas.userOut` both yield `schemas.userOut`; a bare
    /// identifier is not a reference.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !is_ident_path(text) {
            return None;
        }
        let mut segments = text.rsplit('.');
        let export = segments.next()?;
        let module = segments.next()?;
        Some(Self::new(module, export))
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.export)
    }
}

/// Why a provider could not produce a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    ModuleNotFound { module: String },
    ExportNotFound { module: String, export: String },
    Malformed { file: PathBuf, message: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::ModuleNotFound { module } => {
                write!(f, "schema module '{}' not found", module)
            }
            SchemaError::ExportNotFound { module, export } => {
                write!(f, "module '{}' has no export '{}'", module, export)
            }
            SchemaError::Malformed { file, message } => {
                write!(f, "malformed schema module {}: {}", file.display(), message)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Loads schemas by reference.
///
/// `explicit_file` is the schema file the route source imported the module from, when the
/// locator could resolve one.
pub trait SchemaProvider {
    fn load(
        &mut self,
        reference: &SchemaReference,
        explicit_file: Option<&Path>,
    ) -> std::result::Result<Schema, SchemaError>;
}

/// Schema provider backed by JSON/YAML schema modules on disk.
///
/// A schema module maps export names to schemas:
///
/// ```yaml
/// idParam:
///   type: object
///   properties:
///     id: { type: string }
///   required: [id]
/// ```
///
/// An imported `./user.schema.ts` is looked up as `user.schema.{json,yaml,yml}` next to it
/// and then as `user.{json,yaml,yml}`. Otherwise the module is looked up by file stem and then
/// by module name in the schema directory.
pub struct FileSchemaProvider {
    schema_dir: PathBuf,
    schema_suffix: String,
    /// File stem to module file, built on first use
    index: Option<HashMap<String, PathBuf>>,
    modules: HashMap<PathBuf, BTreeMap<String, Schema>>,
}

impl FileSchemaProvider {
    pub fn new(schema_dir: PathBuf) -> Self {
        Self {
            schema_dir,
            schema_suffix: crate::locator::DEFAULT_SCHEMA_SUFFIX.to_string(),
            index: None,
            modules: HashMap::new(),
        }
    }

    pub fn with_schema_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.schema_suffix = suffix.into();
        self
    }

    fn explicit_candidates(&self, file: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if crate::scanner::is_schema_module(file) {
            candidates.push(file.to_path_buf());
        }
        for ext in SCHEMA_EXTENSIONS {
            candidates.push(file.with_extension(ext));
        }

        let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if let Some(stem) = file_name.strip_suffix(self.schema_suffix.as_str()) {
            let stem = stem.trim_end_matches(['.', '_', '-']);
            if !stem.is_empty() {
                for ext in SCHEMA_EXTENSIONS {
                    candidates.push(file.with_file_name(format!("{}.{}", stem, ext)));
                }
            }
        }
        candidates
    }

    fn index(&mut self) -> &HashMap<String, PathBuf> {
        let schema_dir = &self.schema_dir;
        let suffix_stem = self
            .schema_suffix
            .rsplit_once('.')
            .map_or(self.schema_suffix.as_str(), |(stem, _)| stem)
            .to_string();

        self.index.get_or_insert_with(|| {
            let mut index = HashMap::new();
            let files = match SchemaScanner::new(schema_dir.clone()).scan() {
                Ok(result) => result.schema_files,
                Err(e) => {
                    warn!("Schema directory scan failed: {:#}", e);
                    Vec::new()
                }
            };
            for file in files {
                let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if let Some(short) = stem.strip_suffix(suffix_stem.as_str()) {
                    let short = short.trim_end_matches(['.', '_', '-']);
                    if !short.is_empty() {
                        index.entry(short.to_string()).or_insert_with(|| file.clone());
                    }
                }
                index.entry(stem.to_string()).or_insert(file);
            }
            debug!("Indexed {} schema modules", index.len());
            index
        })
    }

    fn locate(
        &mut self,
        reference: &SchemaReference,
        explicit_file: Option<&Path>,
    ) -> std::result::Result<PathBuf, SchemaError> {
        let mut keys = Vec::new();
        if let Some(file) = explicit_file {
            if let Some(found) = self
                .explicit_candidates(file)
                .into_iter()
                .find(|c| c.is_file())
            {
                return Ok(found);
            }
            debug!(
                "No schema module next to {}, falling back to the schema directory",
                file.display()
            );
            if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
                if let Some((short, _)) = stem.split_once('.') {
                    keys.push(short.to_string());
                }
            }
        }
        keys.push(reference.module.clone());

        let index = self.index();
        keys.iter()
            .find_map(|key| index.get(key).cloned())
            .ok_or_else(|| SchemaError::ModuleNotFound {
                module: reference.module.clone(),
            })
    }

    fn module(
        &mut self,
        file: &Path,
    ) -> std::result::Result<&BTreeMap<String, Schema>, SchemaError> {
        match self.modules.entry(file.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(parse_module(file)?)),
        }
    }
}

fn parse_module(file: &Path) -> std::result::Result<BTreeMap<String, Schema>, SchemaError> {
    debug!("Loading schema module: {}", file.display());
    let malformed = |message: String| SchemaError::Malformed {
        file: file.to_path_buf(),
        message,
    };

    let text = fs::read_to_string(file).map_err(|e| malformed(e.to_string()))?;
    match file.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text).map_err(|e| malformed(e.to_string())),
        _ => serde_yaml::from_str(&text).map_err(|e| malformed(e.to_string())),
    }
}

impl SchemaProvider for FileSchemaProvider {
    fn load(
        &mut self,
        reference: &SchemaReference,
        explicit_file: Option<&Path>,
    ) -> std::result::Result<Schema, SchemaError> {
        let file = self.locate(reference, explicit_file)?;
        self.module(&file)?
            .get(&reference.export)
            .cloned()
            .ok_or_else(|| SchemaError::ExportNotFound {
                module: reference.module.clone(),
                export: reference.export.clone(),
            })
    }
}

/// Caching front of a [`SchemaProvider`].
///
/// Each distinct reference is loaded at most once; later lookups return the same
/// `Arc`. Failures are not cached.
pub struct SchemaResolver<P> {
    provider: P,
    cache: HashMap<(SchemaReference, Option<PathBuf>), Arc<Schema>>,
}

impl<P: SchemaProvider> SchemaResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(
        &mut self,
        reference: &SchemaReference,
        explicit_file: Option<&Path>,
    ) -> Result<Arc<Schema>> {
        let key = (reference.clone(), explicit_file.map(Path::to_path_buf));
        if let Some(schema) = self.cache.get(&key) {
            return Ok(Arc::clone(schema));
        }

        let schema = self
            .provider
            .load(reference, explicit_file)
            .map_err(|e| Error::SchemaResolution {
                module: reference.module.clone(),
                export: reference.export.clone(),
                reason: e.to_string(),
            })?;
        debug!("Resolved schema {}", reference);

        let schema = Arc::new(schema);
        self.cache.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Number of distinct references loaded so far.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct CountingProvider {
        loads: Rc<Cell<usize>>,
    }

    impl SchemaProvider for CountingProvider {
        fn load(
            &mut self,
            reference: &SchemaReference,
            _explicit_file: Option<&Path>,
        ) -> std::result::Result<Schema, SchemaError> {
            self.loads.set(self.loads.get() + 1);
            match reference.export.as_str() {
                "missing" => Err(SchemaError::ExportNotFound {
                    module: reference.module.clone(),
                    export: reference.export.clone(),
                }),
                _ => Ok(Schema::of_type("object")),
            }
        }
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            SchemaReference::parse("schemas.userOut"),
            Some(SchemaReference::new("schemas", "userOut"))
        );
        assert_eq!(
            SchemaReference::parse(" api.schemas.userOut "),
            Some(SchemaReference::new("schemas", "userOut"))
        );
        assert_eq!(SchemaReference::parse("userOut"), None);
        assert_eq!(SchemaReference::parse("schemas.get()"), None);
    }

    #[test]
    fn test_resolver_loads_each_reference_once() {
        let loads = Rc::new(Cell::new(0));
        let mut resolver = SchemaResolver::new(CountingProvider {
            loads: Rc::clone(&loads),
        });
        let reference = SchemaReference::new("schemas", "user");

        let first = resolver.resolve(&reference, None).unwrap();
        let second = resolver.resolve(&reference, None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.get(), 1);
        assert_eq!(resolver.resolved_count(), 1);
    }

    #[test]
    fn test_resolver_maps_failures() {
        let loads = Rc::new(Cell::new(0));
        let mut resolver = SchemaResolver::new(CountingProvider {
            loads: Rc::clone(&loads),
        });
        let reference = SchemaReference::new("schemas", "missing");

        let err = resolver.resolve(&reference, None).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaResolution { ref export, .. } if export == "missing"
        ));
        assert!(resolver.resolve(&reference, None).is_err());
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn test_file_provider_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let routes = temp_dir.path().join("routes");
        fs::create_dir(&routes).unwrap();
        fs::write(
            routes.join("user.json"),
            r#"{"idParam": {"type": "object", "properties": {"id": {"type": "string"}}}}"#,
        )
        .unwrap();

        let mut provider = FileSchemaProvider::new(temp_dir.path().join("schemas"));
        let schema = provider
            .load(
                &SchemaReference::new("schemas", "idParam"),
                Some(&routes.join("user.schema.ts")),
            )
            .unwrap();

        assert!(schema.properties.contains_key("id"));
    }

    #[test]
    fn test_file_provider_schema_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("admin")).unwrap();
        fs::write(
            temp_dir.path().join("admin/reports.schema.yaml"),
            "summary:\n  type: object\n",
        )
        .unwrap();

        let mut provider = FileSchemaProvider::new(temp_dir.path().to_path_buf());
        let schema = provider
            .load(&SchemaReference::new("reports", "summary"), None)
            .unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("object"));

        let missing_export = provider
            .load(&SchemaReference::new("reports", "detail"), None)
            .unwrap_err();
        assert!(matches!(missing_export, SchemaError::ExportNotFound { .. }));

        let missing_module = provider
            .load(&SchemaReference::new("orders", "summary"), None)
            .unwrap_err();
        assert_eq!(
            missing_module,
            SchemaError::ModuleNotFound {
                module: "orders".to_string()
            }
        );
    }

    #[test]
    fn test_file_provider_malformed_module() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let mut provider = FileSchemaProvider::new(temp_dir.path().to_path_buf());
        let err = provider
            .load(&SchemaReference::new("broken", "x"), None)
            .unwrap_err();

        assert!(matches!(err, SchemaError::Malformed { .. }));
    }
}
