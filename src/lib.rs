//! Route OpenAPI - OpenAPI documentation from Oak router sources.
//!
//! The library reads a main router file, follows each `.use('/mount', router.routes())`
//! declaration to the router it mounts, and turns every `router.<method>(path, ...middlewares)`
//! call into an OpenAPI operation. Request and response schemas come from the validation
//! middlewares on each route (`validateBody(schemas.createUser)`, `validateResponse(...)`),
//! resolved against JSON or YAML schema modules on disk. Nothing is executed; the sources are
//! scanned with a small bracket-aware grammar.
//!
//! # Architecture
//!
//! 1. [`bracket`] and [`syntax`] - balanced-delimiter scanning, imports, mounts and calls
//! 2. [`source`] - file access behind the [`source::SourceReader`] seam
//! 3. [`locator`] - finds the section of source that defines a mounted router
//! 4. [`extractor`] - pulls endpoint declarations out of a router section
//! 5. [`classifier`] - classifies middleware and derives request/response slots
//! 6. [`scanner`] and [`resolver`] - discover and load schema modules, with caching
//! 7. [`document`] - the in-memory endpoint registry
//! 8. [`openapi_builder`] and [`serializer`] - render and write the OpenAPI document
//! 9. [`generator`] - drives one generation pass over all of the above
//!
//! # Example Usage
//!
//! ```no_run
//! use route_openapi::generator::{generate, GenerationOptions};
//! use route_openapi::openapi_builder::OpenApiBuilder;
//! use route_openapi::serializer::serialize_yaml;
//! use std::path::PathBuf;
//!
//! let options = GenerationOptions::new(
//!     PathBuf::from("src/routes/main.ts"),
//!     PathBuf::from("src/schemas"),
//! );
//! let model = generate(&options).unwrap();
//!
//! let document = OpenApiBuilder::new().build(&model);
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod bracket;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod locator;
pub mod openapi_builder;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod source;
pub mod syntax;
