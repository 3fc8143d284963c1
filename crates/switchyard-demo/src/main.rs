//! switchyard-demo CLI
//!
//! Runs requests through the sample application without a network server.

mod app;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use switchyard::{Request, Route};

/// Drive the sample switchyard application from the command line.
#[derive(Parser)]
#[command(name = "switchyard-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, env = "SWITCHYARD_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one request and print the response.
    Dispatch {
        /// HTTP method.
        method: String,

        /// Request URI, query string included.
        uri: String,

        /// Request header as `Name: value` (repeatable).
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body.
        #[arg(short, long)]
        body: Option<String>,

        /// Content type of the body.
        #[arg(long, default_value = "application/json")]
        content_type: String,
    },

    /// List the registered routes.
    Routes {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Generate the URL of a named route.
    Url {
        /// Route name.
        name: String,

        /// Parameters as `key=value`.
        params: Vec<String>,
    },
}

/// A route as printed by `routes`.
#[derive(Serialize)]
struct RouteRow {
    method: &'static str,
    path: String,
    action: String,
    name: Option<String>,
    middleware: Vec<String>,
}

impl From<&Route> for RouteRow {
    fn from(route: &Route) -> Self {
        Self {
            method: route.method().as_str(),
            path: route.template().to_string(),
            action: route.action().to_string(),
            name: route.name().map(str::to_string),
            middleware: route.middleware().iter().map(ToString::to_string).collect(),
        }
    }
}

/// Splits `Name: value`.
fn parse_header(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("invalid header `{raw}`, expected `Name: value`"),
    }
}

/// Parses `-H` headers, adding `content-type` only when none was given.
fn header_pairs<'a>(
    raw: &'a [String],
    default_content_type: Option<&'a str>,
) -> anyhow::Result<Vec<(&'a str, &'a str)>> {
    let mut pairs = raw
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if let Some(content_type) = default_content_type {
        if !pairs.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
            pairs.push(("content-type", content_type));
        }
    }
    Ok(pairs)
}

/// Splits `key=value`.
fn parse_param(raw: &str) -> anyhow::Result<(&str, &str)> {
    raw.split_once('=')
        .with_context(|| format!("invalid parameter `{raw}`, expected `key=value`"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let router = app::build_router().context("failed to build the route table")?;
    debug!(routes = router.routes().count(), "route table ready");

    match cli.command {
        Commands::Dispatch {
            method,
            uri,
            headers,
            body,
            content_type,
        } => {
            let default_type = body.as_ref().map(|_| content_type.as_str());
            let pairs = header_pairs(&headers, default_type)?;
            let body = body.unwrap_or_default();

            let request = Request::from_parts(&method, &uri, pairs, body.as_bytes())?;
            let response = router.handle(request)?;

            println!("{} {}", response.status, response.status_text());
            println!("{}", String::from_utf8_lossy(&response.body));
        }

        Commands::Routes { json } => {
            let rows: Vec<RouteRow> = router.routes().map(RouteRow::from).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    println!(
                        "{:<7} {:<28} {:<45} {:<14} {}",
                        row.method,
                        row.path,
                        row.action,
                        row.name.unwrap_or_default(),
                        row.middleware.join(",")
                    );
                }
            }
        }

        Commands::Url { name, params } => {
            let params = params
                .iter()
                .map(|raw| parse_param(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            println!("{}", router.try_url_for(&name, params)?);
        }
    }

    Ok(())
}
