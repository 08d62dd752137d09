use crate::document::{DocumentModel, EndpointRecord, SecurityScheme};
use crate::extractor::HttpMethod;
use crate::schema::Schema;
use log::debug;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

/// OpenAPI document builder
///
/// Renders a [`DocumentModel`] into an OpenAPI 3.0.0 document. The builder only carries the
/// document-level metadata, so one builder can render any number of models.
#[derive(Debug, Clone)]
pub struct OpenApiBuilder {
    info: Info,
    servers: Vec<Server>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FromStr for Server {
    type Err = String;

    /// Parses `URL` or `URL DESCRIPTION`; URLs never hold unencoded whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (url, description) = match s.split_once(char::is_whitespace) {
            Some((url, description)) => (url, Some(description.trim().to_string())),
            None => (s, None),
        };
        if url.is_empty() {
            return Err(format!("server URL is empty in '{}'", s));
        }
        Ok(Server {
            url: url.to_string(),
            description: description.filter(|d| !d.is_empty()),
        })
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    fn operation_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Trace => &mut self.trace,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    pub responses: BTreeMap<String, Response>,
    /// Security requirements, one map per alternative
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI SecurityScheme object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecuritySchemeObject {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
}

impl From<&SecurityScheme> for SecuritySchemeObject {
    fn from(scheme: &SecurityScheme) -> Self {
        match scheme {
            SecurityScheme::ApiKey { header } => SecuritySchemeObject {
                scheme_type: "apiKey".to_string(),
                location: Some("header".to_string()),
                name: Some(header.clone()),
                scheme: None,
                bearer_format: None,
            },
            SecurityScheme::Bearer { format } => SecuritySchemeObject {
                scheme_type: "http".to_string(),
                location: None,
                name: None,
                scheme: Some("bearer".to_string()),
                bearer_format: format.clone(),
            },
        }
    }
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize)]
pub struct Components {
    #[serde(rename = "securitySchemes")]
    pub security_schemes: BTreeMap<String, SecuritySchemeObject>,
}

/// Path items in first-declaration order.
#[derive(Debug, Clone, Default)]
pub struct Paths(Vec<(String, PathItem)>);

impl Paths {
    pub fn get(&self, path: &str) -> Option<&PathItem> {
        self.0.iter().find(|(p, _)| p == path).map(|(_, item)| item)
    }

    fn entry(&mut self, path: &str) -> &mut PathItem {
        let index = match self.0.iter().position(|(p, _)| p == path) {
            Some(index) => index,
            None => {
                self.0.push((path.to_string(), PathItem::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Paths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, item) in &self.0 {
            map.serialize_entry(path, item)?;
        }
        map.end()
    }
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    pub paths: Paths,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        Self {
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            servers: Vec::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    pub fn with_server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    /// Build the OpenAPI document for a model
    pub fn build(&self, model: &DocumentModel) -> OpenApiDocument {
        debug!("Building OpenAPI document for {} endpoints", model.len());

        let mut paths = Paths::default();
        for record in model.endpoints() {
            *paths.entry(&record.path).operation_mut(record.method) = Some(operation(record));
        }

        let components = (!model.security_schemes().is_empty()).then(|| Components {
            security_schemes: model
                .security_schemes()
                .iter()
                .map(|(name, scheme)| (name.clone(), SecuritySchemeObject::from(scheme)))
                .collect(),
        });

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths,
            components,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn operation(record: &EndpointRecord) -> Operation {
    let request = &record.request;

    let mut parameters = Vec::new();
    if let Some(schema) = &request.path {
        parameters.extend(slot_parameters(ParameterLocation::Path, schema));
    }
    for name in template_parameters(&record.path) {
        let declared = parameters
            .iter()
            .any(|p: &Parameter| p.location == ParameterLocation::Path && p.name == name);
        if !declared {
            parameters.push(Parameter {
                name: name.to_string(),
                location: ParameterLocation::Path,
                required: true,
                schema: Schema::of_type("string"),
            });
        }
    }
    if let Some(schema) = &request.query {
        parameters.extend(slot_parameters(ParameterLocation::Query, schema));
    }
    if let Some(schema) = &request.headers {
        parameters.extend(slot_parameters(ParameterLocation::Header, schema));
    }

    let request_body = request.body.as_ref().map(|body| RequestBody {
        required: true,
        content: json_content(&body.content_type, &body.schema),
    });

    let mut responses: BTreeMap<String, Response> = record
        .responses
        .iter()
        .map(|(status, entry)| {
            let response = Response {
                description: entry.description.clone(),
                content: entry
                    .schema
                    .as_ref()
                    .map(|schema| json_content(crate::document::JSON_CONTENT_TYPE, schema)),
            };
            (status.to_string(), response)
        })
        .collect();
    if responses.is_empty() {
        responses.insert(
            "default".to_string(),
            Response {
                description: "Successful response".to_string(),
                content: None,
            },
        );
    }

    Operation {
        summary: Some(record.summary.clone()).filter(|s| !s.is_empty()),
        description: record.description.clone(),
        tags: vec![record.tag.clone()],
        parameters,
        request_body,
        responses,
        security: record
            .security
            .iter()
            .map(|name| BTreeMap::from([(name.clone(), Vec::new())]))
            .collect(),
    }
}

/// One parameter per property of an object schema.
fn slot_parameters(location: ParameterLocation, schema: &Schema) -> Vec<Parameter> {
    if schema.properties.is_empty() {
        debug!("{:?} schema has no properties, no parameters emitted", location);
    }
    schema
        .properties
        .iter()
        .map(|(name, property)| Parameter {
            name: name.clone(),
            location,
            required: location == ParameterLocation::Path || schema.is_required(name),
            schema: property.clone(),
        })
        .collect()
}

fn template_parameters(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
}

fn json_content(content_type: &str, schema: &Schema) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(
        content_type.to_string(),
        MediaType {
            schema: schema.clone(),
        },
    )])
}
