//! ZeroCater remote resource CLI
//!
//! Resolves gateway routes, fetches remote resources as a named service,
//! emits events and prints service tokens. Configuration comes from the
//! usual config file search plus environment overrides.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;

use zc_auth::ServiceTokenIssuer;
use zc_config::{AppConfig, ConfigLoader};
use zc_events::{EventEmitter, ServiceEvent};
use zc_remote::{ParamValue, PathParams, RemoteResources};

#[derive(Parser, Debug)]
#[command(name = "zc-remote")]
#[command(about = "Fetch resources from other ZeroCater services")]
struct Args {
    /// Config file, overriding the standard search paths
    #[arg(long, env = "ZC_CONFIG")]
    config: Option<PathBuf>,

    /// Calling service name, defaults to service.name from config
    #[arg(long, env = "ZC_SERVICE_NAME")]
    service: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the URL the gateway routes a resource type to
    Route {
        resource_type: String,
        /// Path parameter as name=value; comma-separated values form a list
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        /// Extra query parameter as name=value
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },

    /// Fetch a resource by type and path parameters
    Fetch {
        resource_type: String,
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        #[arg(long)]
        include: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Fetch whatever an absolute URL returns
    FetchUrl { url: String },

    /// Post an event to the service owning the target event type
    Emit {
        /// Target event resource type, e.g. OrderEvent
        #[arg(long)]
        target: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        resource_type: String,
        #[arg(long)]
        resource_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// JSON object sent as the document's top-level meta
        #[arg(long)]
        meta: Option<String>,
    },

    /// Print a freshly signed service token
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    zc_common::logging::init_logging("zc-remote");

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let service = args.service.unwrap_or_else(|| config.service.name.clone());

    match args.command {
        Command::Route {
            resource_type,
            params,
            query,
        } => {
            let remote = RemoteResources::from_config(&config)?;
            let url = remote
                .resolver()
                .resolve(&resource_type, &path_params(params), &query)
                .await?;
            println!("{}", url);
        }
        Command::Fetch {
            resource_type,
            params,
            include,
            page_size,
        } => {
            let remote = RemoteResources::from_config(&config)?;
            let wrapped = remote
                .get_resource(
                    &service,
                    &resource_type,
                    &path_params(params),
                    include.as_deref(),
                    page_size,
                )
                .await?;
            print_json(&wrapped.to_value())?;
        }
        Command::FetchUrl { url } => {
            let remote = RemoteResources::from_config(&config)?;
            let wrapped = remote.get_resource_from_url(&service, &url).await?;
            print_json(&wrapped.to_value())?;
        }
        Command::Emit {
            target,
            event,
            resource_type,
            resource_id,
            user_id,
            meta,
        } => {
            let remote = RemoteResources::from_config(&config)?;
            let emitter = EventEmitter::from_remote(&remote);

            let mut service_event = ServiceEvent::new(&event, resource_type);
            service_event.resource_id = resource_id.as_deref().map(id_value);
            service_event.user_id = user_id.as_deref().map(id_value);
            if let Some(meta) = meta {
                service_event = service_event.meta(parse_meta(&meta)?);
            }

            let response = emitter
                .emit_service_event(&service, &target, &service_event)
                .await?;
            info!(status = response.status.as_u16(), event = %event, "Event emitted");
            println!("{} {}", response.status.as_u16(), response.body);
        }
        Command::Token => {
            let issuer = ServiceTokenIssuer::from_config(&config.jwt)?;
            println!("{} {}", config.jwt.auth_header_prefix, issuer.issue(&service)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    loader.load().context("Failed to load configuration")
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got {:?}", raw)),
    }
}

fn path_params(pairs: Vec<(String, String)>) -> PathParams {
    pairs
        .into_iter()
        .map(|(name, value)| {
            let value = if value.contains(',') {
                ParamValue::List(value.split(',').map(str::to_string).collect())
            } else {
                ParamValue::Scalar(value)
            };
            (name, value)
        })
        .collect()
}

fn parse_meta(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("--meta must be valid JSON")? {
        Value::Object(meta) => Ok(meta),
        _ => bail!("--meta must be a JSON object"),
    }
}

/// Integer ids go out as JSON numbers, anything else as a string.
fn id_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
