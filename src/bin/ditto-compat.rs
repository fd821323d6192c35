use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use ditto_compat::translation::chat_sse_to_responses_sse;
use ditto_compat::utils::sse::sse_data_stream_from_reader;
use ditto_compat::{Capabilities, CompatConfig, ResponseHints, Shape, Translator};

/// Replays captured Chat/Responses traffic through the shape translators.
#[derive(Debug, Parser)]
#[command(name = "ditto-compat", version)]
struct Cli {
    /// TOML file with `[request]` / `[stream]` settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a complete request payload.
    Request {
        #[arg(long)]
        from: Shape,
        #[arg(long)]
        to: Shape,
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Convert a complete response payload.
    Response {
        #[arg(long)]
        from: Shape,
        #[arg(long)]
        to: Shape,
        /// Chat completion id for Responses -> Chat.
        #[arg(long)]
        id: Option<String>,
        /// Model reported for Chat -> Responses.
        #[arg(long)]
        model: Option<String>,
        file: Option<PathBuf>,
    },
    /// Convert a Chat SSE stream into Responses SSE on stdout.
    Stream {
        #[arg(long)]
        response_id: Option<String>,
        #[arg(long, default_value = "")]
        model: String,
        file: Option<PathBuf>,
    },
}

fn init_tracing(json_logs: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

async fn open_input(
    file: Option<&Path>,
) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, Box<dyn std::error::Error>> {
    match file {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|err| format!("open {} failed: {err}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

async fn read_json(file: Option<&Path>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input = open_input(file).await?;
    let mut raw = String::new();
    input.read_to_string(&mut raw).await?;
    Ok(serde_json::from_str(&raw)?)
}

async fn write_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = serde_json::to_vec_pretty(value)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match cli.config.as_deref() {
        Some(path) => CompatConfig::load(path)?,
        None => CompatConfig::default(),
    };
    let translator = Translator::new(Capabilities::system(), config);

    match cli.command {
        Command::Request { from, to, file } => {
            let request = read_json(file.as_deref()).await?;
            let out = translator.translate_request(&request, from, to)?;
            write_json(&out).await?;
        }
        Command::Response {
            from,
            to,
            id,
            model,
            file,
        } => {
            let response = read_json(file.as_deref()).await?;
            let hints = ResponseHints {
                id: id.as_deref(),
                model: model.as_deref(),
            };
            let out = translator.translate_response(&response, from, to, hints)?;
            write_json(&out).await?;
        }
        Command::Stream {
            response_id,
            model,
            file,
        } => {
            let input = open_input(file.as_deref()).await?;
            let state = translator.chat_stream(response_id.as_deref(), &model);
            tracing::info!(response_id = %state.response_id(), "converting chat stream");
            let mut frames =
                Box::pin(chat_sse_to_responses_sse(sse_data_stream_from_reader(input), state));
            let mut stdout = tokio::io::stdout();
            while let Some(frame) = frames.next().await {
                stdout.write_all(&frame?).await?;
            }
            stdout.flush().await?;
        }
    }
    Ok(())
}
