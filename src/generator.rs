//! The generation pass.
//!
//! One run reads the main router file, follows every mount declaration to its router
//! section, extracts the section's endpoints and resolves their middleware into an
//! [`EndpointRecord`]. Routers and declarations that cannot be recognized are logged and
//! skipped; an unresolvable schema aborts the run.

use crate::classifier::{CustomMiddleware, MiddlewareClassifier, DEFAULT_WRAPPERS};
use crate::document::{DocumentModel, EndpointRecord, SecurityScheme};
use crate::error::Error;
use crate::extractor::oak::OakExtractor;
use crate::extractor::{split_endpoint, EndpointExtractor};
use crate::locator::{RouterLocator, RouterSection, DEFAULT_SCHEMA_SUFFIX};
use crate::resolver::{FileSchemaProvider, SchemaProvider, SchemaResolver};
use crate::source::{FsSourceReader, SourceReader};
use crate::syntax::find_mounts;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Inputs of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// File holding the `.use('/mount', router.routes())` declarations
    pub router_file: PathBuf,
    /// Directory searched for schema modules
    pub schema_dir: PathBuf,
    pub custom_middlewares: Vec<CustomMiddleware>,
    /// Mount prefix removed from every mount path, e.g. `/api/v1`
    pub strip_base: Option<String>,
    /// Middleware names never used as the operation handler
    pub denied_middlewares: Vec<String>,
    pub wrappers: Vec<String>,
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    pub schema_suffix: String,
}

impl GenerationOptions {
    pub fn new(router_file: PathBuf, schema_dir: PathBuf) -> Self {
        Self {
            router_file,
            schema_dir,
            custom_middlewares: Vec::new(),
            strip_base: None,
            denied_middlewares: Vec::new(),
            wrappers: DEFAULT_WRAPPERS.iter().map(|w| w.to_string()).collect(),
            security_schemes: BTreeMap::new(),
            schema_suffix: DEFAULT_SCHEMA_SUFFIX.to_string(),
        }
    }
}

/// Runs generation passes over a source reader and a schema provider.
pub struct Generator<R, P> {
    reader: R,
    provider: P,
}

impl<R: SourceReader, P: SchemaProvider> Generator<R, P> {
    pub fn new(reader: R, provider: P) -> Self {
        Self { reader, provider }
    }

    /// Performs a full generation pass.
    ///
    /// Consumes the generator so every run starts from empty caches and an empty model.
    ///
    /// # Errors
    ///
    /// Fails when the main router file cannot be read or a schema reference cannot be
    /// resolved.
    pub fn generate(self, options: &GenerationOptions) -> Result<DocumentModel> {
        let mut locator =
            RouterLocator::new(self.reader).with_schema_suffix(options.schema_suffix.as_str());
        let mut resolver = SchemaResolver::new(self.provider);
        let classifier = MiddlewareClassifier::new()
            .with_custom(options.custom_middlewares.clone())
            .with_denied(options.denied_middlewares.clone())
            .with_wrappers(options.wrappers.clone());

        let mut model = DocumentModel::new();
        for (name, scheme) in &options.security_schemes {
            debug!("Registering security scheme '{}'", name);
            model.register_security_scheme(name.clone(), scheme.clone());
        }

        let main = locator.read(&options.router_file).with_context(|| {
            format!(
                "Failed to read router file: {}",
                options.router_file.display()
            )
        })?;
        let mounts = find_mounts(&main);
        info!(
            "Found {} mounted routers in {}",
            mounts.len(),
            options.router_file.display()
        );

        for mount in &mounts {
            let section = match locator.locate(
                &main,
                &options.router_file,
                mount,
                options.strip_base.as_deref(),
            ) {
                Ok(section) => section,
                Err(e) => {
                    warn!("Skipping router '{}': {}", mount.router, e);
                    continue;
                }
            };

            let registered =
                register_section(&section, &classifier, &mut resolver, &mut model)?;
            info!(
                "Router '{}' mounted at '/{}': {} endpoints",
                section.definition.name, section.definition.mount_path, registered
            );
        }

        for record in model.endpoints() {
            for scheme in &record.security {
                if !model.security_schemes().contains_key(scheme) {
                    warn!(
                        "{} {} references undeclared security scheme '{}'",
                        record.method, record.path, scheme
                    );
                }
            }
        }

        info!(
            "Generated {} endpoints ({} schemas resolved)",
            model.len(),
            resolver.resolved_count()
        );
        Ok(model)
    }
}

fn register_section<P: SchemaProvider>(
    section: &RouterSection,
    classifier: &MiddlewareClassifier,
    resolver: &mut SchemaResolver<P>,
    model: &mut DocumentModel,
) -> Result<usize> {
    let definition = &section.definition;
    let mut registered = 0;

    for token in OakExtractor.extract_tokens(&section.text) {
        let Some(endpoint) = split_endpoint(&token, &definition.mount_path) else {
            let skipped = Error::StructuralParse {
                file: definition.file.clone(),
                message: format!(
                    "unrecognized .{}() declaration in router '{}'",
                    token.method.keyword(),
                    definition.name
                ),
            };
            warn!("{}", skipped);
            continue;
        };

        let expressions = classifier.classify_chain(&endpoint.middlewares);
        let summary = classifier.summary(&expressions, endpoint.description.as_deref());
        let resolved = classifier
            .resolve(&expressions, &section.schema_files, resolver)
            .with_context(|| {
                format!(
                    "Failed to resolve schemas of {} {} in {}",
                    endpoint.method,
                    endpoint.path,
                    definition.file.display()
                )
            })?;

        debug!("Registering {} {} ({})", endpoint.method, endpoint.path, summary);
        model.register(EndpointRecord {
            method: endpoint.method,
            path: endpoint.path,
            summary,
            description: endpoint.description,
            tag: definition.name.clone(),
            request: resolved.request,
            responses: resolved.responses,
            security: resolved.security,
        });
        registered += 1;
    }

    Ok(registered)
}

/// Runs a generation pass over the filesystem, loading schemas from `options.schema_dir`.
pub fn generate(options: &GenerationOptions) -> Result<DocumentModel> {
    let provider = FileSchemaProvider::new(options.schema_dir.clone())
        .with_schema_suffix(options.schema_suffix.as_str());
    Generator::new(FsSourceReader, provider).generate(options)
}
