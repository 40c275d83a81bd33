//! Thin demo binary driving `objfetch::iter_files` against a URI and
//! printing each delivered file's path/size/version to a table. Not part of
//! the library's public contract.

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use figment::providers::Env;
use figment::Figment;
use objfetch::{FetchConfig, FetchError};
use serde::Deserialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "List and fetch objects under a remote prefix")]
struct Args {
    /// `<scheme>://<bucket-or-container>[/<prefix>]`
    uri: String,

    /// Optional shell-glob pattern matched against the full key.
    #[arg(short, long)]
    glob: Option<String>,
}

/// Environment-sourced demo defaults, read via `OBJFETCH_*` variables.
#[derive(Debug, Deserialize, Default)]
struct EnvDefaults {
    aws_endpoint_url: Option<String>,
    aws_key: Option<String>,
    aws_secret: Option<String>,
    region_name: Option<String>,
    anon: Option<bool>,
}

fn build_config() -> Result<FetchConfig> {
    let defaults: EnvDefaults = Figment::new()
        .merge(Env::prefixed("OBJFETCH_"))
        .extract()
        .context("failed to read OBJFETCH_* environment configuration")?;

    let mut config = FetchConfig::new();
    if let Some(v) = defaults.aws_endpoint_url {
        config = config.set("aws_endpoint_url", v);
    }
    if let Some(v) = defaults.aws_key {
        config = config.set("aws_key", v);
    }
    if let Some(v) = defaults.aws_secret {
        config = config.set("aws_secret", v);
    }
    if let Some(v) = defaults.region_name {
        config = config.set("region_name", v);
    }
    if let Some(v) = defaults.anon {
        config = config.set("anon", v);
    }

    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = build_config()?;

    let mut table = Table::new();
    table.set_header(vec!["path", "version", "size"]);

    let iter = objfetch::iter_files(&args.uri, args.glob.as_deref(), config)?;
    for item in iter {
        match item {
            Ok(file) => {
                table.add_row(vec![file.path, file.version, file.size.to_string()]);
            }
            Err(FetchError::Cancelled) => break,
            Err(e) => {
                error!("fetch error: {e}");
                std::process::exit(1);
            }
        }
    }

    println!("{table}");
    Ok(())
}
