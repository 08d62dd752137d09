//! Generator configuration file.
//!
//! ```yaml
//! title: Users API
//! version: 2.1.0
//! servers:
//!   - url: https://api.example.com
//!     description: Production
//! strip_base: /api/v1
//! denied_middlewares: [rateLimit]
//! custom_middlewares:
//!   - name: authenticate
//!     header: [x-api-key]
//!     security: apiKeyAuth
//! security_schemes:
//!   apiKeyAuth:
//!     type: apiKey
//!     header: x-api-key
//! ```

use crate::classifier::CustomMiddleware;
use crate::document::SecurityScheme;
use crate::error::{Error, Result};
use crate::openapi_builder::Server;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub servers: Vec<Server>,
    pub strip_base: Option<String>,
    pub schema_suffix: Option<String>,
    pub custom_middlewares: Vec<CustomMiddleware>,
    pub denied_middlewares: Vec<String>,
    pub wrappers: Vec<String>,
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

impl GeneratorConfig {
    /// Loads a YAML or JSON configuration file, picked by extension.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration: {}", path.display());
        let text = fs::read_to_string(path)?;
        let config: GeneratorConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?,
            _ => serde_yaml::from_str(&text)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every security scheme a custom middleware names is declared.
    pub fn validate(&self) -> Result<()> {
        for custom in &self.custom_middlewares {
            if custom.name.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "custom middleware without a name".to_string(),
                ));
            }
            if let Some(scheme) = &custom.security {
                if !self.security_schemes.contains_key(scheme) {
                    return Err(Error::InvalidConfig(format!(
                        "middleware '{}' references undeclared security scheme '{}'",
                        custom.name, scheme
                    )));
                }
            }
        }
        Ok(())
    }
}
