//! Conneg CLI binary.
//!
//! Content negotiation for JSON:API services.
//!
//! # Commands
//!
//! - `server` - Start the demo JSON:API server
//! - `render` - Render a JSON document for an `Accept` header
//! - `parse` - Parse a request body for a `Content-Type`
//! - `formats` - List the built-in formats

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use clap::{Parser, Subcommand};
use conneg::{
    config::Config,
    formats::FORMATS,
    negotiation::ContentNegotiator,
    server::{create_router, AppState, ServerConfig},
    transport::TcpTransport,
    VERSION,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "conneg")]
#[command(version = VERSION)]
#[command(about = "Content negotiation for JSON:API services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the demo JSON:API server
    Server {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen host
        #[arg(long)]
        host: Option<String>,

        /// Bind to all interfaces
        #[arg(long)]
        bind_all: bool,

        /// Config file (default: <config dir>/conneg/config.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable a built-in format (repeatable: csv, text)
        #[arg(short, long = "format")]
        formats: Vec<String>,

        /// Accept parameterised JSON:API media types
        #[arg(long)]
        no_strict: bool,

        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Render a JSON document as the best match for an Accept header
    Render {
        /// Accept header value
        #[arg(short, long, default_value = "*/*")]
        accept: String,

        /// Enable a built-in format (repeatable)
        #[arg(long = "format")]
        formats: Vec<String>,

        /// JSON input (or - for stdin)
        input: Option<String>,

        /// Input file path
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Parse a request body as its Content-Type and print it as JSON
    Parse {
        /// Content-Type header value
        #[arg(short, long)]
        content_type: String,

        /// Enable a built-in format (repeatable)
        #[arg(long = "format")]
        formats: Vec<String>,

        /// Body input (or - for stdin)
        input: Option<String>,

        /// Input file path
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output as pretty-printed JSON
        #[arg(long)]
        pretty: bool,
    },

    /// List built-in formats
    Formats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            port,
            host,
            bind_all,
            config,
            formats,
            no_strict,
            cors,
            verbose,
        } => cmd_server(ServerArgs {
            port,
            host,
            bind_all,
            config,
            formats,
            no_strict,
            cors,
            verbose,
        }),

        Commands::Render {
            accept,
            formats,
            input,
            file,
        } => cmd_render(&accept, &formats, input, file),

        Commands::Parse {
            content_type,
            formats,
            input,
            file,
            pretty,
        } => cmd_parse(&content_type, &formats, input, file, pretty),

        Commands::Formats => cmd_formats(),
    }
}

struct ServerArgs {
    port: Option<u16>,
    host: Option<String>,
    bind_all: bool,
    config: Option<PathBuf>,
    formats: Vec<String>,
    no_strict: bool,
    cors: bool,
    verbose: bool,
}

fn cmd_server(args: ServerArgs) -> anyhow::Result<()> {
    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // file <- env <- CLI
    let mut config = load_config(args.config)?.merge(Config::from_env());
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if args.bind_all {
        config.server.host = "0.0.0.0".to_string();
    }
    if args.cors {
        config.server.cors = true;
    }
    if !args.formats.is_empty() {
        config.negotiation.formats = args.formats;
    }
    if args.no_strict {
        config.negotiation.strict_jsonapi = false;
    }

    let negotiator = config.negotiator()?;
    let server_config = ServerConfig::from_config(&config)?;
    let transport = TcpTransport::new(server_config.addr);

    tracing::info!("Starting conneg server on {}", server_config.addr);
    tracing::info!("Parsers: {}", negotiator.parsers().describe());
    tracing::info!("Renderers: {}", negotiator.renderers().describe());
    if !negotiator.strict_jsonapi() {
        tracing::warn!("Strict JSON:API media type checks disabled");
    }

    let state = Arc::new(AppState::new(server_config));
    let app = create_router(state, negotiator);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        transport
            .serve_with_shutdown(app, async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
            })
            .await?;
        Ok::<_, anyhow::Error>(())
    })
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Ok(Config::from_file(path)?)
            },
            None => Ok(Config::default()),
        },
    }
}

fn negotiator_with(formats: &[String]) -> anyhow::Result<ContentNegotiator> {
    let mut config = Config::default();
    config.negotiation.formats = formats.to_vec();
    Ok(config.negotiator()?)
}

fn cmd_render(
    accept: &str,
    formats: &[String],
    input: Option<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let negotiator = negotiator_with(formats)?;
    let document: Value = serde_json::from_str(&read_input(input, file)?)?;

    let selection = negotiator.select_renderer(Some(accept))?;
    let rendered = selection.handler.render(&document)?;

    eprintln!("Content-Type: {}", selection.media_type);
    let mut stdout = io::stdout().lock();
    stdout.write_all(&rendered)?;
    if !rendered.ends_with(b"\n") {
        writeln!(stdout)?;
    }
    Ok(())
}

fn cmd_parse(
    content_type: &str,
    formats: &[String],
    input: Option<String>,
    file: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    let negotiator = negotiator_with(formats)?;
    let body = read_input(input, file)?;

    let selection = negotiator
        .select_parser(&Method::POST, Some(content_type), body.len())?
        .ok_or_else(|| anyhow::anyhow!("no parser selected"))?;
    let value = negotiator.parse_body(&selection, body.as_bytes())?;

    let output = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{output}");
    Ok(())
}

fn cmd_formats() -> anyhow::Result<()> {
    let mut formats: Vec<_> = FORMATS.entries().collect();
    formats.sort_by_key(|(name, _)| *name);

    println!("{:<10} MEDIA TYPE", "NAME");
    for (name, format) in formats {
        println!("{:<10} {}", name, format.media_type);
    }
    Ok(())
}

fn read_input(input: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(path) = file {
        Ok(std::fs::read_to_string(path)?)
    } else if let Some(s) = input.filter(|s| s != "-") {
        Ok(s)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}
