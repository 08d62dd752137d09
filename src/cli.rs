use crate::config::GeneratorConfig;
use crate::generator::{self, GenerationOptions};
use crate::openapi_builder::{OpenApiBuilder, Server};
use crate::serializer::{DocumentWriter, FileDocumentWriter, OutputFormat};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Route OpenAPI - Generate OpenAPI documentation from Oak router sources
#[derive(Parser, Debug)]
#[command(name = "route-openapi")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Main router file holding the `.use('/mount', router.routes())` declarations
    #[arg(value_name = "ROUTER_FILE")]
    pub router_file: PathBuf,

    /// Directory containing the JSON/YAML schema modules
    #[arg(short = 's', long = "schemas", value_name = "DIR")]
    pub schema_dir: PathBuf,

    /// Output directory (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Server URL, optionally followed by a space and a description; may be repeated
    #[arg(long = "server", value_name = "URL [DESCRIPTION]")]
    pub servers: Vec<Server>,

    /// API title
    #[arg(long)]
    pub title: Option<String>,

    /// API version
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// API description
    #[arg(long)]
    pub description: Option<String>,

    /// Mount prefix to strip from every router path, e.g. /api/v1
    #[arg(long = "strip-base", value_name = "PATH")]
    pub strip_base: Option<String>,

    /// Middleware never used as the operation summary; may be repeated
    #[arg(long = "deny", value_name = "NAME")]
    pub denied: Vec<String>,

    /// YAML or JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.router_file.is_file() {
        anyhow::bail!(
            "Router file does not exist: {}",
            args.router_file.display()
        );
    }
    if !args.schema_dir.is_dir() {
        anyhow::bail!(
            "Schema directory does not exist: {}",
            args.schema_dir.display()
        );
    }

    info!("Router file: {}", args.router_file.display());
    info!("Schema directory: {}", args.schema_dir.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_dir {
        info!("Output directory: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Builds generation options from the arguments and the configuration file.
///
/// Lists from both sources are concatenated; scalar flags win over the file.
pub fn generation_options(args: &CliArgs, config: &GeneratorConfig) -> GenerationOptions {
    let mut options = GenerationOptions::new(args.router_file.clone(), args.schema_dir.clone());

    options.custom_middlewares = config.custom_middlewares.clone();
    options.strip_base = args.strip_base.clone().or_else(|| config.strip_base.clone());
    options.denied_middlewares = config
        .denied_middlewares
        .iter()
        .chain(&args.denied)
        .cloned()
        .collect();
    if !config.wrappers.is_empty() {
        options.wrappers = config.wrappers.clone();
    }
    options.security_schemes = config.security_schemes.clone();
    if let Some(suffix) = &config.schema_suffix {
        options.schema_suffix = suffix.clone();
    }

    options
}

/// Builds the document metadata from the arguments and the configuration file.
pub fn openapi_builder(args: &CliArgs, config: &GeneratorConfig) -> OpenApiBuilder {
    let title = args
        .title
        .clone()
        .or_else(|| config.title.clone())
        .unwrap_or_else(|| "Generated API".to_string());
    let version = args
        .api_version
        .clone()
        .or_else(|| config.version.clone())
        .unwrap_or_else(|| "1.0.0".to_string());
    let description = args.description.clone().or_else(|| config.description.clone());

    let mut servers: Vec<Server> = config.servers.iter().chain(&args.servers).cloned().collect();
    if servers.is_empty() {
        servers.push(Server {
            url: DEFAULT_SERVER.to_string(),
            description: None,
        });
    }

    servers
        .into_iter()
        .fold(OpenApiBuilder::new().with_info(title, version, description), |builder, server| {
            builder.with_server(server)
        })
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    let options = generation_options(&args, &config);
    info!("Starting OpenAPI document generation...");
    let model = generator::generate(&options)?;

    if model.is_empty() {
        log::warn!("No endpoints found; the document will have no paths");
    }

    let builder = openapi_builder(&args, &config);
    match &args.output_dir {
        Some(dir) => {
            let path = FileDocumentWriter::new(builder, args.output_format)
                .write(&model, dir)
                .context("Failed to write OpenAPI document")?;
            info!("OpenAPI document written to {}", path.display());
        }
        None => {
            let doc = builder.build(&model);
            println!("{}", args.output_format.serialize(&doc)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SecurityScheme;
    use pretty_assertions::assert_eq;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["route-openapi", "routes/main.ts", "--schemas", "schemas"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_parse_flags() {
        let args = args(&[
            "-f",
            "json",
            "--server",
            "https://api.example.com?region=eu Production",
            "--deny",
            "authenticate",
            "--deny",
            "rateLimit",
            "-v",
        ]);

        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.servers[0].url, "https://api.example.com?region=eu");
        assert_eq!(args.servers[0].description.as_deref(), Some("Production"));
        assert_eq!(args.denied, vec!["authenticate", "rateLimit"]);
        assert!(args.verbose);
        assert!(args.output_dir.is_none());
    }

    #[test]
    fn test_flags_override_and_extend_config() {
        let config = GeneratorConfig {
            title: Some("From Config".to_string()),
            strip_base: Some("/api".to_string()),
            denied_middlewares: vec!["rateLimit".to_string()],
            schema_suffix: Some("zod.ts".to_string()),
            security_schemes: [(
                "bearerAuth".to_string(),
                SecurityScheme::Bearer { format: None },
            )]
            .into_iter()
            .collect(),
            ..GeneratorConfig::default()
        };
        let args = args(&["--strip-base", "/api/v1", "--deny", "authenticate"]);

        let options = generation_options(&args, &config);
        assert_eq!(options.strip_base.as_deref(), Some("/api/v1"));
        assert_eq!(options.denied_middlewares, vec!["rateLimit", "authenticate"]);
        assert_eq!(options.schema_suffix, "zod.ts");
        assert_eq!(options.security_schemes.len(), 1);

        let doc = openapi_builder(&args, &config).build(&Default::default());
        assert_eq!(doc.info.title, "From Config");
        assert_eq!(doc.info.version, "1.0.0");
        assert_eq!(doc.servers[0].url, DEFAULT_SERVER);
    }

    #[test]
    fn test_parse_args_rejects_missing_router_file() {
        let err = parse_args_from_parsed(args(&[])).unwrap_err();
        assert!(err.to_string().contains("Router file does not exist"));
    }
}
