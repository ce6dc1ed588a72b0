//! `lms-ws-service` entry point.
//!
//! ## Modes
//!
//! - **`serve`** (default): build the site from the configured seed, bind
//!   the socket and answer external function calls until Ctrl+C.
//! - **`ping`**: connect to a running service, send a hello handshake and
//!   verify the response.
//! - **`print-schema`**: dump the JSON schemas of the wire types.
//! - **`list-functions`**: print the registered external functions.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lms_ws_service::config::ServiceConfig;
use lms_ws_service::service::WsService;

#[derive(Debug, Parser)]
#[command(name = "lms-ws-service", version, about = "LMS external functions over a Unix socket")]
struct Cli {
    /// Config file (defaults to $LMS_WS_CONFIG, then ~/.config/lms-ws/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Socket path; overrides the config file.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the service (default).
    Serve,
    /// Check that a running service answers the hello handshake.
    Ping,
    /// Print the wire protocol JSON schemas.
    PrintSchema {
        /// Write one `<name>.json` per type into this directory instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the registered external functions.
    ListFunctions,
}

fn ping(path: &Path) -> Result<()> {
    let mut stream = std::os::unix::net::UnixStream::connect(path)
        .with_context(|| format!("ping: cannot connect to {}", path.display()))?;
    stream.set_read_timeout(Some(std::time::Duration::from_secs(10)))?;
    stream.set_write_timeout(Some(std::time::Duration::from_secs(5)))?;

    let hello = serde_json::json!({
        "id": 0,
        "method": "hello",
        "params": {
            "protocol_version": lms_ws_service::PROTOCOL_VERSION,
            "client_version": env!("CARGO_PKG_VERSION"),
        }
    });
    let mut bytes = serde_json::to_vec(&hello)?;
    bytes.push(b'\n');
    stream.write_all(&bytes)?;
    stream.flush()?;

    let mut reader = std::io::BufReader::new(&stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let resp: serde_json::Value =
        serde_json::from_str(line.trim()).context("ping: invalid response JSON")?;
    if let Some(result) = resp.get("result") {
        let count = result
            .get("functions")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len);
        eprintln!("ping: service is alive ({count} functions)");
        Ok(())
    } else {
        let msg = resp
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        bail!("ping: hello failed: {msg}")
    }
}

fn print_schema(out: Option<&Path>) -> Result<()> {
    let schemas = lms_ws_protocol::export_schemas();
    match out {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            for (name, schema) in &schemas {
                let path = dir.join(format!("{name}.json"));
                let text = serde_json::to_string_pretty(schema)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            eprintln!("wrote {} schemas to {}", schemas.len(), dir.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&schemas)?),
    }
    Ok(())
}

fn list_functions(config: &ServiceConfig) -> Result<()> {
    let service = WsService::from_config(config).context("building site")?;
    for info in service.registry().describe() {
        println!("{:<36} {:<12} {}", info.name, info.component, info.description);
    }
    Ok(())
}

#[tokio::main]
async fn run_service(config: ServiceConfig, socket: PathBuf) -> Result<()> {
    tracing::info!("lms-ws-service v{} starting", env!("CARGO_PKG_VERSION"));

    let service = Arc::new(WsService::from_config(&config).context("building site")?);
    tracing::info!(
        "{} functions registered, wwwroot {}",
        service.registry().len(),
        service.site().wwwroot()
    );

    let listener = lms_ws_service::ipc::bind(&socket)
        .with_context(|| format!("binding {}", socket.display()))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let service_signal = Arc::clone(&service);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!(
            "Signal received, shutting down (calls served: {})",
            service_signal.calls_served()
        );
        let _ = shutdown_tx.send(true);
    });

    lms_ws_service::ipc::serve(service, listener, shutdown_rx).await?;

    if let Err(e) = std::fs::remove_file(&socket) {
        tracing::debug!("socket cleanup: {e}");
    }
    tracing::info!("lms-ws-service exiting cleanly");
    Ok(())
}

fn main() -> Result<()> {
    let Cli {
        config,
        socket,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::load(config.as_deref()).context("loading config")?;
    let socket = socket.unwrap_or_else(|| config.resolved_socket_path());

    match command.unwrap_or(Command::Serve) {
        Command::Serve => run_service(config, socket),
        Command::Ping => ping(&socket),
        Command::PrintSchema { out } => print_schema(out.as_deref()),
        Command::ListFunctions => list_functions(&config),
    }
}
