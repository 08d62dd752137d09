//! The in-memory document model.
//!
//! A [`DocumentModel`] is built by one generation run and handed whole to a
//! [`crate::serializer::DocumentWriter`]; it holds no global state.

use crate::extractor::HttpMethod;
use crate::schema::Schema;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Content type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request part a schema can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestSlot {
    Query,
    Path,
    Headers,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub schema: Arc<Schema>,
    pub content_type: String,
}

/// Request schemas of one endpoint, one merged schema per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub query: Option<Arc<Schema>>,
    pub path: Option<Arc<Schema>>,
    pub headers: Option<Arc<Schema>>,
    pub body: Option<RequestBody>,
}

impl RequestConfig {
    pub fn slot(&self, slot: RequestSlot) -> Option<&Arc<Schema>> {
        match slot {
            RequestSlot::Query => self.query.as_ref(),
            RequestSlot::Path => self.path.as_ref(),
            RequestSlot::Headers => self.headers.as_ref(),
            RequestSlot::Body => self.body.as_ref().map(|b| &b.schema),
        }
    }

    /// Attaches `schema` to a slot.
    ///
    /// An occupied slot is never overwritten: the new schema is merged into the existing one
    /// and the slot receives the merged result.
    pub fn merge_into(&mut self, slot: RequestSlot, schema: Arc<Schema>) {
        let target = match slot {
            RequestSlot::Query => &mut self.query,
            RequestSlot::Path => &mut self.path,
            RequestSlot::Headers => &mut self.headers,
            RequestSlot::Body => match &mut self.body {
                Some(body) => {
                    body.schema = Arc::new(body.schema.merge(&schema));
                    return;
                }
                None => {
                    self.body = Some(RequestBody {
                        schema,
                        content_type: JSON_CONTENT_TYPE.to_string(),
                    });
                    return;
                }
            },
        };

        *target = Some(match target.take() {
            Some(existing) => {
                debug!("Merging schema into occupied {:?} slot", slot);
                Arc::new(existing.merge(&schema))
            }
            None => schema,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEntry {
    pub description: String,
    pub schema: Option<Arc<Schema>>,
}

/// Responses keyed by status code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseConfig {
    entries: BTreeMap<String, ResponseEntry>,
}

impl ResponseConfig {
    /// Sets the entry for `status`; a later declaration replaces an earlier one.
    pub fn insert(&mut self, status: impl Into<String>, entry: ResponseEntry) {
        let status = status.into();
        if self.entries.insert(status.clone(), entry).is_some() {
            debug!("Response {} declared again, keeping the later one", status);
        }
    }

    pub fn get(&self, status: &str) -> Option<&ResponseEntry> {
        self.entries.get(status)
    }

    /// Entries in status-code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully resolved endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRecord {
    pub method: HttpMethod,
    /// Templated path, e.g. `/users/{id}`
    pub path: String,
    pub summary: String,
    pub description: Option<String>,
    /// Name of the router that declared the endpoint
    pub tag: String,
    pub request: RequestConfig,
    pub responses: ResponseConfig,
    /// Names of the security schemes the endpoint requires
    pub security: Vec<String>,
}

impl EndpointRecord {
    pub fn key(&self) -> (HttpMethod, &str) {
        (self.method, &self.path)
    }
}

/// A security scheme component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SecurityScheme {
    /// API key sent in a request header
    ApiKey { header: String },
    /// HTTP bearer token
    Bearer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

/// Endpoints and security schemes collected by one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentModel {
    endpoints: Vec<EndpointRecord>,
    security_schemes: BTreeMap<String, SecurityScheme>,
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an endpoint.
    ///
    /// A record with the same method and path is replaced where it stands and returned.
    pub fn register(&mut self, record: EndpointRecord) -> Option<EndpointRecord> {
        match self
            .endpoints
            .iter_mut()
            .find(|existing| existing.key() == record.key())
        {
            Some(existing) => {
                debug!(
                    "Replacing {} {} with a later declaration",
                    record.method, record.path
                );
                Some(std::mem::replace(existing, record))
            }
            None => {
                self.endpoints.push(record);
                None
            }
        }
    }

    pub fn register_security_scheme(&mut self, name: impl Into<String>, scheme: SecurityScheme) {
        self.security_schemes.insert(name.into(), scheme);
    }

    pub fn endpoints(&self) -> &[EndpointRecord] {
        &self.endpoints
    }

    pub fn endpoint(&self, method: HttpMethod, path: &str) -> Option<&EndpointRecord> {
        self.endpoints
            .iter()
            .find(|record| record.key() == (method, path))
    }

    pub fn security_schemes(&self) -> &BTreeMap<String, SecurityScheme> {
        &self.security_schemes
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(method: HttpMethod, path: &str, summary: &str) -> EndpointRecord {
        EndpointRecord {
            method,
            path: path.to_string(),
            summary: summary.to_string(),
            description: None,
            tag: "users".to_string(),
            request: RequestConfig::default(),
            responses: ResponseConfig::default(),
            security: Vec::new(),
        }
    }

    fn field(name: &str) -> Arc<Schema> {
        Arc::new(Schema::object().with_property(name, Schema::of_type("string"), true))
    }

    #[test]
    fn test_register_last_write_wins() {
        let mut model = DocumentModel::new();
        model.register(record(HttpMethod::Get, "/users/{id}", "first"));
        model.register(record(HttpMethod::Post, "/users", "create"));
        let replaced = model.register(record(HttpMethod::Get, "/users/{id}", "second"));

        assert_eq!(replaced.map(|r| r.summary), Some("first".to_string()));
        assert_eq!(model.len(), 2);
        assert_eq!(model.endpoints()[0].summary, "second");
        assert_eq!(
            model
                .endpoint(HttpMethod::Get, "/users/{id}")
                .map(|r| r.summary.as_str()),
            Some("second")
        );
    }

    #[test]
    fn test_merge_into_occupied_slot() {
        let mut request = RequestConfig::default();
        request.merge_into(RequestSlot::Body, field("a"));
        request.merge_into(RequestSlot::Body, field("b"));
        request.merge_into(RequestSlot::Headers, field("x-api-key"));

        let body = request.body.as_ref().unwrap();
        assert_eq!(body.content_type, JSON_CONTENT_TYPE);
        assert_eq!(body.schema.required, vec!["a", "b"]);
        assert_eq!(request.slot(RequestSlot::Headers).unwrap().required, vec!["x-api-key"]);
        assert!(request.query.is_none());
    }

    #[test]
    fn test_merge_keeps_shared_schema_intact() {
        let shared = field("a");
        let mut request = RequestConfig::default();
        request.merge_into(RequestSlot::Query, Arc::clone(&shared));
        request.merge_into(RequestSlot::Query, field("b"));

        assert_eq!(shared.properties.len(), 1);
        assert_eq!(request.query.unwrap().properties.len(), 2);
    }

    #[test]
    fn test_response_last_write_wins() {
        let mut responses = ResponseConfig::default();
        let entry = |description: &str| ResponseEntry {
            description: description.to_string(),
            schema: None,
        };
        responses.insert("404", entry("schemas.notFound"));
        responses.insert("200", entry("schemas.userOut"));
        responses.insert("200", entry("schemas.userOutV2"));

        let statuses: Vec<_> = responses.iter().map(|(status, _)| status).collect();
        assert_eq!(statuses, vec!["200", "404"]);
        assert_eq!(responses.get("200").unwrap().description, "schemas.userOutV2");
    }

    #[test]
    fn test_security_scheme_serde() {
        let scheme: SecurityScheme =
            serde_yaml::from_str("type: apiKey\nheader: x-api-key\n").unwrap();
        assert_eq!(
            scheme,
            SecurityScheme::ApiKey {
                header: "x-api-key".to_string()
            }
        );

        let bearer: SecurityScheme = serde_json::from_str(r#"{"type": "bearer"}"#).unwrap();
        assert_eq!(bearer, SecurityScheme::Bearer { format: None });
    }
}
