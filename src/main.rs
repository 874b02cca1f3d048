use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use eliza_core::{status, Backend, BackendConfig, Message, OllamaClient, Session};
use logging::LogTarget;

#[derive(Parser)]
#[command(name = "eliza")]
#[command(version, about = "Chat with persona characters on a local Ollama server")]
struct Cli {
    /// Ollama endpoint, e.g. http://localhost:11434
    #[arg(long, global = true)]
    url: Option<String>,

    /// Model to generate with
    #[arg(long, global = true)]
    model: Option<String>,

    /// Sampling temperature (0.1 - 2.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Reply length budget in tokens (50 - 500)
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Write logs to this file while the TUI is running
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the backend and list its models
    Models,
    /// Send a single message and print the reply
    Ask {
        /// Your message
        message: String,
    },
}

impl Cli {
    /// Default settings with any command line overrides applied.
    fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::default();

        if let Some(url) = &self.url {
            config.set_endpoint(url);
        }
        if let Some(model) = &self.model {
            config.set_model(model);
        }
        if let Some(temperature) = self.temperature {
            config.set_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config.set_max_tokens(max_tokens);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            logging::init(LogTarget::File(cli.log_file.as_deref()))?;
            run_tui(Session::new(cli.backend_config())).await
        }
        Some(Commands::Models) => {
            logging::init(LogTarget::Stderr)?;
            list_models(&cli.backend_config()).await
        }
        Some(Commands::Ask { message }) => {
            logging::init(LogTarget::Stderr)?;
            ask(Session::new(cli.backend_config()), message).await
        }
    }
}

async fn run_tui(session: Session) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(session, Arc::new(OllamaClient::new()));
    app.start_status_check();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn list_models(config: &BackendConfig) -> Result<()> {
    let client = OllamaClient::new();
    let status = status::check_backend(&client, config).await;

    println!("{} ({})", status, config.endpoint_url);
    for model in status.models() {
        let marker = if *model == config.model_name { "*" } else { " " };
        println!(" {} {}", marker, model);
    }

    if !status.is_connected() {
        bail!("Ollama is not reachable at {}", config.endpoint_url);
    }
    Ok(())
}

async fn ask(mut session: Session, message: &str) -> Result<()> {
    let client = OllamaClient::new();
    let backend: &dyn Backend = &client;

    let reply = session.send(backend, message).await?;
    println!("{}", reply_text(reply)?);
    Ok(())
}

/// The reply to print, or an error when the turn failed at the backend.
fn reply_text(reply: &Message) -> Result<&str> {
    if reply.is_error() {
        bail!("{}", reply.text);
    }
    Ok(&reply.text)
}
