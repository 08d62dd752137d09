//! Endpoint extraction from located router sections.
//!
//! An extractor walks a router section and produces one [`EndpointToken`] per recognized
//! HTTP-verb call. [`split_endpoint`] then turns a token into its full templated path and its
//! ordered middleware expressions.
//!
//! # Supported Routers
//!
//! - **Oak**: See [`oak::OakExtractor`]
//!
//! # Example
//!
//! ```
//! use route_openapi::extractor::{split_endpoint, EndpointExtractor, HttpMethod, oak::OakExtractor};
//!
//! let section = "const users = new Router();\nusers.get('/:id', validatePath(schemas.idParam), getUser);";
//! let tokens = OakExtractor.extract_tokens(section);
//! let endpoint = split_endpoint(&tokens[0], "users").unwrap();
//!
//! assert_eq!(endpoint.method, HttpMethod::Get);
//! assert_eq!(endpoint.path, "/users/{id}");
//! assert_eq!(endpoint.middlewares, vec!["validatePath(schemas.idParam)", "getUser"]);
//! ```

pub mod oak;

use crate::bracket::split_top_level;
use crate::syntax::Cursor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for finding endpoint declarations in a router section.
pub trait EndpointExtractor {
    /// Extracts endpoint tokens in declaration order.
    ///
    /// Scanning stops at the first unterminated call; no partial token is emitted for it.
    fn extract_tokens(&self, section: &str) -> Vec<EndpointToken>;
}

/// HTTP methods recognized as verb calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    /// The verb as written in route source (`get`, `post`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.keyword() == keyword)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword().to_ascii_uppercase())
    }
}

/// A raw verb call captured from a router section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointToken {
    pub method: HttpMethod,
    /// Argument list text between the call's parentheses, unsplit
    pub arguments: String,
    /// Text of a trailing `// @description` annotation
    pub description: Option<String>,
    /// Byte offset of the verb call within the section
    pub offset: usize,
}

/// An endpoint token split into path and middleware chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEndpoint {
    pub method: HttpMethod,
    /// Full templated path, mount segment included
    pub path: String,
    /// Middleware expressions in chain order
    pub middlewares: Vec<String>,
    pub description: Option<String>,
}

/// Splits a token into its templated path and middleware expressions.
///
/// Returns `None` when the arguments are unbalanced or the first argument is not a string
/// literal.
pub fn split_endpoint(token: &EndpointToken, mount_path: &str) -> Option<RawEndpoint> {
    let arguments = split_top_level(&token.arguments)?;
    let (first, rest) = arguments.split_first()?;
    let local = Cursor::new(first).string_literal()?;

    Some(RawEndpoint {
        method: token.method,
        path: convert_path_params(&join_mount(mount_path, local)),
        middlewares: rest.iter().map(|m| m.to_string()).collect(),
        description: token.description.clone(),
    })
}

/// Rewrites `:name` parameter markers as `{name}`.
pub fn convert_path_params(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Prefixes a local path with its router's mount segment.
///
/// A local path of `/` collapses to the mount path itself.
pub fn join_mount(mount_path: &str, local: &str) -> String {
    let mount = mount_path.trim_matches('/');
    let local = local.trim();

    let local = match local {
        "" | "/" => "",
        other => other.strip_prefix('/').unwrap_or(other),
    };

    match (mount.is_empty(), local.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", local),
        (false, true) => format!("/{}", mount),
        (false, false) => format!("/{}/{}", mount, local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(arguments: &str) -> EndpointToken {
        EndpointToken {
            method: HttpMethod::Post,
            arguments: arguments.to_string(),
            description: None,
            offset: 0,
        }
    }

    #[test]
    fn test_convert_path_params() {
        assert_eq!(
            convert_path_params("/users/:id/orders/:orderId"),
            "/users/{id}/orders/{orderId}"
        );
        assert_eq!(convert_path_params("/users/list"), "/users/list");
        assert_eq!(convert_path_params("/a/:/b"), "/a/:/b");
    }

    #[test]
    fn test_join_mount() {
        assert_eq!(join_mount("admin", "/"), "/admin");
        assert_eq!(join_mount("users", "/{id}"), "/users/{id}");
        assert_eq!(join_mount("", "/health"), "/health");
        assert_eq!(join_mount("", "/"), "/");
        assert_eq!(join_mount("api/v2", "items"), "/api/v2/items");
    }

    #[test]
    fn test_split_endpoint() {
        let endpoint = split_endpoint(
            &token("\"/:id/orders\", validateBody(schemas.order), usecaseWrapper(createOrder)"),
            "users",
        )
        .unwrap();

        assert_eq!(endpoint.method, HttpMethod::Post);
        assert_eq!(endpoint.path, "/users/{id}/orders");
        assert_eq!(
            endpoint.middlewares,
            vec!["validateBody(schemas.order)", "usecaseWrapper(createOrder)"]
        );
    }

    #[test]
    fn test_split_endpoint_templates_mount_parameters() {
        let endpoint = split_endpoint(&token("'/:id', getUser"), "orgs/:orgId/users").unwrap();
        assert_eq!(endpoint.path, "/orgs/{orgId}/users/{id}");

        let endpoint = split_endpoint(&token("'/', listUsers"), "orgs/:orgId/users").unwrap();
        assert_eq!(endpoint.path, "/orgs/{orgId}/users");
    }

    #[test]
    fn test_split_endpoint_rejects_non_literal_path() {
        assert!(split_endpoint(&token("path, handler"), "users").is_none());
        assert!(split_endpoint(&token(""), "users").is_none());
        assert!(split_endpoint(&token("'/x', a)"), "users").is_none());
    }

    #[test]
    fn test_method_keywords() {
        for method in HttpMethod::ALL {
            assert_eq!(HttpMethod::from_keyword(method.keyword()), Some(method));
        }
        assert_eq!(HttpMethod::from_keyword("use"), None);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
