//! Middleware classification and schema resolution.
//!
//! Each expression of an endpoint's middleware chain is classified by the validator names it
//! contains. Validator expressions contribute schemas to the request slots or responses; the
//! one remaining expression is the operation handler, which names the endpoint.
//!
//! | identifier | kind | slot |
//! |---|---|---|
//! | `validateBody` | body validator | body |
//! | `validateParam`, `validateQuery` | query validator | query |
//! | `validatePath` | path validator | path |
//! | `validateHeader` | header validator | headers |
//! | `validateResponse` | response validator | responses |
//! | `validator({...})` | validator config | every key present |
//! | configured names | custom validator | declared slots |

use crate::bracket::{split_top_level, Delimiter};
use crate::document::{RequestConfig, RequestSlot, ResponseConfig, ResponseEntry};
use crate::error::Result;
use crate::resolver::{SchemaProvider, SchemaReference, SchemaResolver};
use crate::schema::Schema;
use crate::syntax::{
    find_call, identifiers, is_ident_path, parse_object_literal, parse_status, Cursor,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Handler wrappers whose first argument names the operation.
pub const DEFAULT_WRAPPERS: [&str; 2] = ["usecaseWrapper", "executeAndValidateResponse"];

const VALIDATORS: [(&str, MiddlewareKind); 7] = [
    ("validateBody", MiddlewareKind::BodyValidator),
    ("validateParam", MiddlewareKind::QueryValidator),
    ("validateQuery", MiddlewareKind::QueryValidator),
    ("validatePath", MiddlewareKind::PathValidator),
    ("validateHeader", MiddlewareKind::HeaderValidator),
    ("validateResponse", MiddlewareKind::ResponseValidator),
    ("validator", MiddlewareKind::ValidatorConfig),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    BodyValidator,
    QueryValidator,
    PathValidator,
    HeaderValidator,
    ResponseValidator,
    /// `validator({body, param, path, header, response, usecase})`
    ValidatorConfig,
    CustomValidator,
    OperationHandler,
    Unclassified,
}

impl MiddlewareKind {
    pub fn is_validator(self) -> bool {
        !matches!(
            self,
            MiddlewareKind::OperationHandler | MiddlewareKind::Unclassified
        )
    }

    /// The request slot a single-slot validator fills.
    pub fn slot(self) -> Option<RequestSlot> {
        match self {
            MiddlewareKind::BodyValidator => Some(RequestSlot::Body),
            MiddlewareKind::QueryValidator => Some(RequestSlot::Query),
            MiddlewareKind::PathValidator => Some(RequestSlot::Path),
            MiddlewareKind::HeaderValidator => Some(RequestSlot::Headers),
            _ => None,
        }
    }
}

/// One element of an endpoint's middleware chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareExpression {
    pub position: usize,
    pub text: String,
    pub kind: MiddlewareKind,
}

/// Middleware outside the built-in vocabulary, declared by configuration.
///
/// ```yaml
/// name: authenticate
/// header: [x-api-key]
/// security: apiKeyAuth
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMiddleware {
    pub name: String,
    pub query: Vec<String>,
    pub path: Vec<String>,
    pub header: Vec<String>,
    pub body: Vec<String>,
    /// Security scheme required by endpoints using this middleware
    pub security: Option<String>,
}

impl CustomMiddleware {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Declared slots with their field names, in request order.
    pub fn declared_slots(&self) -> Vec<(RequestSlot, &[String])> {
        [
            (RequestSlot::Query, self.query.as_slice()),
            (RequestSlot::Path, self.path.as_slice()),
            (RequestSlot::Headers, self.header.as_slice()),
            (RequestSlot::Body, self.body.as_slice()),
        ]
        .into_iter()
        .filter(|(_, fields)| !fields.is_empty())
        .collect()
    }
}

/// Request, responses and security derived from one middleware chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMiddleware {
    pub request: RequestConfig,
    pub responses: ResponseConfig,
    pub security: Vec<String>,
}

pub struct MiddlewareClassifier {
    custom: Vec<CustomMiddleware>,
    denied: Vec<String>,
    wrappers: Vec<String>,
}

impl Default for MiddlewareClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MiddlewareClassifier {
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            denied: Vec::new(),
            wrappers: DEFAULT_WRAPPERS.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn with_custom(mut self, custom: Vec<CustomMiddleware>) -> Self {
        self.custom = custom;
        self
    }

    /// Names never taken as the operation handler, such as `authenticate`.
    pub fn with_denied(mut self, denied: Vec<String>) -> Self {
        self.denied = denied;
        self
    }

    /// Replaces the default handler wrappers; an empty list keeps the defaults.
    pub fn with_wrappers(mut self, wrappers: Vec<String>) -> Self {
        if !wrappers.is_empty() {
            self.wrappers = wrappers;
        }
        self
    }

    /// Classifies one expression against the validator vocabulary.
    ///
    /// Anything that is not a validator is [`MiddlewareKind::Unclassified`]; only
    /// [`classify_chain`](Self::classify_chain) promotes an expression to handler.
    pub fn classify(&self, expression: &str) -> MiddlewareKind {
        let idents = identifiers(expression);
        let contains = |name: &str| idents.iter().any(|ident| *ident == name);

        if let Some((_, kind)) = VALIDATORS.iter().find(|(name, _)| contains(name)) {
            return *kind;
        }
        if self.custom.iter().any(|c| contains(&c.name)) {
            return MiddlewareKind::CustomValidator;
        }
        MiddlewareKind::Unclassified
    }

    /// Classifies a whole chain; the first non-validator, non-denied expression is the
    /// operation handler.
    pub fn classify_chain<S: AsRef<str>>(&self, middlewares: &[S]) -> Vec<MiddlewareExpression> {
        let mut handler_found = false;
        middlewares
            .iter()
            .enumerate()
            .map(|(position, text)| {
                let text: &str = text.as_ref();
                let mut kind = self.classify(text);
                if kind == MiddlewareKind::Unclassified && !handler_found && !self.is_denied(text) {
                    kind = MiddlewareKind::OperationHandler;
                    handler_found = true;
                }
                MiddlewareExpression {
                    position,
                    text: text.to_string(),
                    kind,
                }
            })
            .collect()
    }

    fn is_denied(&self, expression: &str) -> bool {
        let idents = identifiers(expression);
        self.denied
            .iter()
            .any(|name| idents.iter().any(|ident| *ident == name.as_str()))
    }

    /// Derives the endpoint summary.
    ///
    /// An explicit description annotation wins, then a validator config `usecase`, then the
    /// handler: its wrapped function name when it is a wrapper call, otherwise its text.
    pub fn summary(&self, expressions: &[MiddlewareExpression], annotation: Option<&str>) -> String {
        if let Some(annotation) = annotation.map(str::trim).filter(|a| !a.is_empty()) {
            return annotation.to_string();
        }

        let usecase = expressions
            .iter()
            .filter(|e| e.kind == MiddlewareKind::ValidatorConfig)
            .filter_map(|e| validator_config(&e.text))
            .find_map(|entries| {
                entries
                    .into_iter()
                    .find(|(key, _)| *key == "usecase")
                    .map(|(_, value)| value.to_string())
            });
        if let Some(usecase) = usecase {
            return usecase;
        }

        let Some(handler) = expressions
            .iter()
            .find(|e| e.kind == MiddlewareKind::OperationHandler)
        else {
            return String::new();
        };

        self.wrapped_function(&handler.text)
            .unwrap_or_else(|| handler.text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn wrapped_function(&self, expression: &str) -> Option<String> {
        self.wrappers.iter().find_map(|wrapper| {
            let call = find_call(expression, wrapper)?;
            let first = call.args.first()?;
            is_ident_path(first).then(|| first.trim().to_string())
        })
    }

    /// Resolves every schema the chain references into request, response and security
    /// configuration.
    ///
    /// `schema_files` maps schema module aliases to the files the router imported them from.
    ///
    /// # Errors
    ///
    /// Fails with a schema resolution error on the first reference the provider cannot load.
    pub fn resolve<P: SchemaProvider>(
        &self,
        expressions: &[MiddlewareExpression],
        schema_files: &HashMap<String, PathBuf>,
        resolver: &mut SchemaResolver<P>,
    ) -> Result<ResolvedMiddleware> {
        let mut resolved = ResolvedMiddleware::default();
        let mut load = |reference: &SchemaReference| {
            let file = schema_files.get(&reference.module).map(PathBuf::as_path);
            resolver.resolve(reference, file)
        };

        for expression in expressions {
            let text = expression.text.as_str();
            if !expression.kind.is_validator() {
                let pairs: Vec<_> = self
                    .wrappers
                    .iter()
                    .filter_map(|wrapper| find_call(text, wrapper))
                    .flat_map(|call| response_pairs(call.args.get(1..).unwrap_or_default()))
                    .collect();
                add_responses(&mut resolved.responses, pairs, &mut load)?;
                continue;
            }

            // one expression may combine several validators, e.g. compose(validateBody(..), ..)
            let idents = identifiers(text);
            for (name, kind) in VALIDATORS.iter().filter(|(name, _)| idents.contains(name)) {
                resolve_validator(name, *kind, text, &mut resolved, &mut load)?;
            }
            for custom in self.custom_matches(text) {
                self.apply_custom(custom, text, &mut resolved, &mut load)?;
            }
        }

        Ok(resolved)
    }

    fn custom_matches<'a>(&'a self, expression: &str) -> impl Iterator<Item = &'a CustomMiddleware> {
        let idents: Vec<String> = identifiers(expression)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.custom
            .iter()
            .filter(move |custom| idents.iter().any(|ident| *ident == custom.name))
    }

    fn apply_custom<F>(
        &self,
        custom: &CustomMiddleware,
        text: &str,
        resolved: &mut ResolvedMiddleware,
        load: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&SchemaReference) -> Result<Arc<Schema>>,
    {
        let reference = find_call(text, &custom.name).and_then(|call| {
            call.args
                .iter()
                .find_map(|arg| SchemaReference::parse(arg))
        });
        let slots = custom.declared_slots();

        match reference {
            Some(reference) => {
                let schema = load(&reference)?;
                if slots.is_empty() {
                    resolved.request.merge_into(RequestSlot::Body, schema);
                } else {
                    for (slot, _) in slots {
                        resolved.request.merge_into(slot, Arc::clone(&schema));
                    }
                }
            }
            None => {
                for (slot, fields) in slots {
                    debug!("Synthesizing {:?} fields for middleware {}", slot, custom.name);
                    resolved
                        .request
                        .merge_into(slot, Arc::new(Schema::string_fields(fields)));
                }
            }
        }

        if let Some(scheme) = &custom.security {
            if !resolved.security.contains(scheme) {
                resolved.security.push(scheme.clone());
            }
        }
        Ok(())
    }
}

/// Applies the `name(...)` call found in `text` to the request slots or responses.
fn resolve_validator<F>(
    name: &str,
    kind: MiddlewareKind,
    text: &str,
    resolved: &mut ResolvedMiddleware,
    load: &mut F,
) -> Result<()>
where
    F: FnMut(&SchemaReference) -> Result<Arc<Schema>>,
{
    if let Some(slot) = kind.slot() {
        match validator_reference(text, name) {
            Some(reference) => {
                let schema = load(&reference)?;
                resolved.request.merge_into(slot, schema);
            }
            None => warn!("No schema reference in {}() of '{}', skipping", name, text),
        }
        return Ok(());
    }

    match kind {
        MiddlewareKind::ResponseValidator => {
            let pairs = find_call(text, name)
                .map(|call| response_pairs(&call.args))
                .unwrap_or_default();
            if pairs.is_empty() {
                warn!("No status/schema pair in '{}', skipping", text);
            }
            add_responses(&mut resolved.responses, pairs, load)
        }
        MiddlewareKind::ValidatorConfig => {
            let Some(entries) = validator_config(text) else {
                warn!("Validator config '{}' is not an object literal, skipping", text);
                return Ok(());
            };
            for (key, value) in entries {
                if let Some(slot) = config_slot(key) {
                    if let Some(reference) = SchemaReference::parse(value) {
                        let schema = load(&reference)?;
                        resolved.request.merge_into(slot, schema);
                    }
                } else if key == "response" {
                    add_responses(&mut resolved.responses, response_pairs(&[value]), load)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// The schema reference passed to a `name(...)` validator call.
fn validator_reference(expression: &str, name: &str) -> Option<SchemaReference> {
    let call = find_call(expression, name)?;
    call.args.iter().find_map(|arg| SchemaReference::parse(arg))
}

fn validator_config(expression: &str) -> Option<Vec<(&str, &str)>> {
    let call = find_call(expression, "validator")?;
    parse_object_literal(call.args.first()?)
}

fn config_slot(key: &str) -> Option<RequestSlot> {
    match key {
        "body" => Some(RequestSlot::Body),
        "param" | "query" => Some(RequestSlot::Query),
        "path" => Some(RequestSlot::Path),
        "header" | "headers" => Some(RequestSlot::Headers),
        _ => None,
    }
}

/// A declared response: status code and the schema reference text, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePair {
    pub status: String,
    pub schema: Option<String>,
}

/// Reads status/schema pairs from call arguments.
///
/// Accepts the positional form `200, m.x`, object literals `{status: 200, schema: m.x}`
/// and array literals of such objects.
pub fn response_pairs(args: &[&str]) -> Vec<ResponsePair> {
    if let [status, schema, ..] = args {
        if let (Some(status), true) = (parse_status(status), is_ident_path(schema)) {
            return vec![ResponsePair {
                status: status.to_string(),
                schema: Some(schema.trim().to_string()),
            }];
        }
    }

    let mut pairs = Vec::new();
    for arg in args {
        let arg = arg.trim();
        if arg.starts_with('[') {
            let elements = Cursor::new(arg)
                .group(Delimiter::Square)
                .and_then(split_top_level)
                .unwrap_or_default();
            pairs.extend(elements.into_iter().filter_map(object_pair));
        } else if let Some(pair) = object_pair(arg) {
            pairs.push(pair);
        }
    }
    pairs
}

fn object_pair(text: &str) -> Option<ResponsePair> {
    let entries = parse_object_literal(text)?;
    let value = |key: &str| entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

    let status = parse_status(value("status")?)?;
    Some(ResponsePair {
        status: status.to_string(),
        schema: value("schema")
            .filter(|s| is_ident_path(s))
            .map(|s| s.trim().to_string()),
    })
}

fn add_responses<F>(responses: &mut ResponseConfig, pairs: Vec<ResponsePair>, load: &mut F) -> Result<()>
where
    F: FnMut(&SchemaReference) -> Result<Arc<Schema>>,
{
    for pair in pairs {
        let schema = match pair.schema.as_deref().and_then(SchemaReference::parse) {
            Some(reference) => Some(load(&reference)?),
            None => None,
        };
        let description = pair
            .schema
            .unwrap_or_else(|| format!("Response {}", pair.status));
        responses.insert(pair.status, ResponseEntry { description, schema });
    }
    Ok(())
}
