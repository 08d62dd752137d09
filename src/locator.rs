//! Router locator: finds the span of source text that declares a mounted router's endpoints.
//!
//! Routers are assumed to be declared in contiguous, non-overlapping blocks in file order, so
//! a router's span runs from its `new Router()` definition to the next definition in the same
//! file (or to the end of the file). When the main file only imports the router, the import is
//! followed exactly one hop, relative to the importing file's directory.

use crate::error::{Error, Result};
use crate::source::{resolve_relative, SourceReader};
use crate::syntax::{find_imports, find_router_definitions, ImportStatement, MountDeclaration};
use log::{debug, warn};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default suffix identifying schema modules among a router file's imports.
pub const DEFAULT_SCHEMA_SUFFIX: &str = "schema.ts";

/// A router discovered during a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterDefinition {
    /// Router variable name; also the tag of its endpoints
    pub name: String,
    /// Mount segment without surrounding slashes (`users`, `admin/v2`, or empty)
    pub mount_path: String,
    /// File that holds the router definition
    pub file: PathBuf,
}

/// The located declaration block of one router.
#[derive(Debug, Clone)]
pub struct RouterSection {
    pub definition: RouterDefinition,
    /// Source text from the router definition up to the next one
    pub text: String,
    /// The contiguous run of import statements directly above the router definition
    pub middleware_imports: Vec<ImportStatement>,
    /// Module alias -> schema file, for imports ending with the schema suffix
    pub schema_files: HashMap<String, PathBuf>,
}

impl RouterSection {
    /// The schema file bound to `module` in the router's file, if any.
    pub fn schema_file(&self, module: &str) -> Option<&Path> {
        self.schema_files.get(module).map(PathBuf::as_path)
    }
}

/// Normalizes a mount path to a bare segment, removing `strip_base` when it prefixes the path.
pub fn normalize_mount(raw: &str, strip_base: Option<&str>) -> String {
    let path = raw.trim().trim_start_matches('/');
    let base = strip_base.map(|b| b.trim_matches('/')).filter(|b| !b.is_empty());

    let path = match base.and_then(|b| path.strip_prefix(b)) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    path.trim_matches('/').to_string()
}

/// Byte range of the block declaring `router` in `code`.
pub fn section_span(code: &str, router: &str) -> Option<Range<usize>> {
    let markers = find_router_definitions(code);
    let index = markers.iter().position(|m| m.name == router)?;
    let end = markers.get(index + 1).map_or(code.len(), |m| m.start);
    Some(markers[index].start..end)
}

/// Import statements forming a contiguous run directly above `section_start`.
///
/// Blank lines and line comments may separate the statements; any other text ends the run.
pub fn adjacent_imports(
    code: &str,
    imports: &[ImportStatement],
    section_start: usize,
) -> Vec<ImportStatement> {
    let mut boundary = code[..section_start].rfind('\n').map_or(0, |p| p + 1);
    let mut run = Vec::new();

    for import in imports.iter().rev() {
        if import.end > boundary {
            continue;
        }
        let gap = &code[import.end..boundary];
        let blank = gap.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with("//")
        });
        if !blank {
            break;
        }
        run.push(import.clone());
        boundary = import.start;
    }

    run.reverse();
    run
}

/// Locates router sections, reading imported router files through a [`SourceReader`].
pub struct RouterLocator<R> {
    reader: R,
    schema_suffix: String,
    sources: HashMap<PathBuf, Arc<str>>,
}

impl<R: SourceReader> RouterLocator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            schema_suffix: DEFAULT_SCHEMA_SUFFIX.to_string(),
            sources: HashMap::new(),
        }
    }

    pub fn with_schema_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.schema_suffix = suffix.into();
        self
    }

    /// Reads a source file, at most once per locator.
    pub fn read(&mut self, path: &Path) -> std::io::Result<Arc<str>> {
        if let Some(text) = self.sources.get(path) {
            return Ok(Arc::clone(text));
        }
        let text: Arc<str> = self.reader.read_source(path)?.into();
        self.sources.insert(path.to_path_buf(), Arc::clone(&text));
        Ok(text)
    }

    /// Finds the section of the router named by `mount`.
    ///
    /// `code` is the text of `file`, the file holding the mount declaration.
    pub fn locate(
        &mut self,
        code: &str,
        file: &Path,
        mount: &MountDeclaration,
        strip_base: Option<&str>,
    ) -> Result<RouterSection> {
        let name = mount.router.as_str();
        let mount_path = normalize_mount(&mount.path, strip_base);

        if let Some(span) = section_span(code, name) {
            debug!("Router '{}' defined in {}", name, file.display());
            return Ok(self.section(code, file, span, name, mount_path));
        }

        let unresolved = || Error::RouterResolution {
            router: name.to_string(),
            file: file.to_path_buf(),
        };

        let imports = find_imports(code);
        let (import, binding) = imports
            .iter()
            .filter(|i| i.is_relative())
            .find_map(|i| i.binding(name).map(|b| (i, b)))
            .ok_or_else(unresolved)?;

        let target = resolve_relative(file, &import.specifier);
        debug!("Router '{}' imported from {}", name, target.display());
        let text = self.read(&target).map_err(|e| {
            warn!("Cannot read {}: {}", target.display(), e);
            unresolved()
        })?;

        let span = match binding.imported.as_str() {
            "*" | "default" => None,
            imported => section_span(&text, imported),
        }
        .or_else(|| section_span(&text, name))
        .or_else(|| match find_router_definitions(&text).as_slice() {
            [only] => section_span(&text, &only.name),
            _ => None,
        })
        .ok_or_else(|| Error::RouterResolution {
            router: name.to_string(),
            file: target.clone(),
        })?;

        Ok(self.section(&text, &target, span, name, mount_path))
    }

    fn section(
        &self,
        code: &str,
        file: &Path,
        span: Range<usize>,
        name: &str,
        mount_path: String,
    ) -> RouterSection {
        let imports = find_imports(code);
        let middleware_imports = adjacent_imports(code, &imports, span.start);

        // adjacent imports come last so their bindings win
        let mut schema_files = HashMap::new();
        for import in imports.iter().chain(&middleware_imports) {
            if !import.specifier.ends_with(&self.schema_suffix) {
                continue;
            }
            let schema_file = resolve_relative(file, &import.specifier);
            for local in import.local_names() {
                schema_files.insert(local.to_string(), schema_file.clone());
            }
        }

        RouterSection {
            definition: RouterDefinition {
                name: name.to_string(),
                mount_path,
                file: file.to_path_buf(),
            },
            text: code[span].to_string(),
            middleware_imports,
            schema_files,
        }
    }
}
