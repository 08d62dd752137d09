//! route-openapi - Command-line tool for generating OpenAPI documentation from Oak routers.
//!
//! # Usage
//!
//! ```bash
//! route-openapi [OPTIONS] --schemas <DIR> <ROUTER_FILE>
//! ```
//!
//! # Examples
//!
//! Write `openapi-docs.yml` into `./docs`:
//! ```bash
//! route-openapi src/routes/main.ts -s src/schemas -o docs
//! ```
//!
//! Print JSON to stdout, stripping the version prefix from every mount:
//! ```bash
//! route-openapi src/routes/main.ts -s src/schemas -f json --strip-base /api/v1
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use route_openapi::cli;

fn main() -> Result<()> {
    // Parse once before the logger exists so -v can pick the level
    let parsed = cli::CliArgs::parse();

    let log_level = if parsed.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("route-openapi starting...");

    let args = cli::parse_args_from_parsed(parsed)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
