//! CLI entry point for studymate

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use studymate_agent::{
    Responder, SendOutcome, StudySession, TemplatedConsolidator, TemplatedResponder,
};
use studymate_core::config::{Config, ConfigLoader, LoggingConfig};
use studymate_core::files::FileParser;
use studymate_core::ledger::RestoreOutcome;
use studymate_core::logging::init_logging;
use studymate_core::session::Role;
use studymate_core::storage::FileStorage;
use studymate_core::utils::{expand_home, truncate};
use studymate_manager::{run_server, Manager};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "studymate")]
#[command(about = "A study assistant that remembers your files and questions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or overwrite the configuration
    Onboard,
    /// Upload a file and make it the current file
    Upload {
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// Ask a single question
    Ask {
        message: String,
        /// Ask about the current file
        #[arg(short, long)]
        attach: bool,
    },
    /// Interactive chat
    Chat {
        /// Ask about the current file
        #[arg(short, long)]
        attach: bool,
    },
    /// List uploaded files grouped by name
    History,
    /// Make an earlier upload the current file
    Restore { id: String },
    /// Delete an upload from the history
    Delete { id: String },
    /// Forget the current file
    Clear,
    /// Start a new conversation
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Save the conversation transcript to a file
    Export { out: PathBuf },
    /// Show session status
    Status,
    /// Sign in
    Login {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
    },
    /// Sign out
    Logout,
    /// Upgrade to premium
    Pay {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "mobile-money")]
        method: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Set or clear the custom background
    Background { value: Option<String> },
    /// Run the HTTP ask endpoint
    Serve {
        /// Port to listen on; defaults to the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Onboard = cli.command {
        return run_onboard(&loader);
    }

    let config = loader.load().context("failed to load configuration")?;
    let _guard = init_logging(&log_config(&loader, &config));

    match cli.command {
        Commands::Onboard => {}
        Commands::Upload { path, mime } => run_upload(&config, &path, mime).await?,
        Commands::Ask { message, attach } => {
            let mut session = open_session(&config);
            ask(&mut session, &message, attach).await?;
        }
        Commands::Chat { attach } => run_chat(&config, attach).await?,
        Commands::History => run_history(&config),
        Commands::Restore { id } => run_restore(&config, &id),
        Commands::Delete { id } => {
            let mut session = open_session(&config);
            if session.delete_upload(&id) {
                println!("{} Deleted upload {}", style("✓").green().bold(), id);
            } else {
                println!("{} Upload {} not found", style("✗").red(), id);
            }
        }
        Commands::Clear => {
            open_session(&config).clear_current_file();
            println!("{} Current file cleared", style("✓").green().bold());
        }
        Commands::Reset { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Start a new conversation? Messages will be deleted.")
                    .default(false)
                    .interact()?;
            if confirmed {
                open_session(&config).reset_conversation();
                println!("{} Conversation reset", style("✓").green().bold());
            }
        }
        Commands::Export { out } => run_export(&config, &out)?,
        Commands::Status => run_status(&loader, &config),
        Commands::Login { name, email } => {
            let password = Password::new().with_prompt("Password").interact()?;
            let mut session = open_session(&config);
            match session.sign_in(&name, &email, &password) {
                Ok(user) => println!(
                    "{} Signed in as {} <{}>",
                    style("✓").green().bold(),
                    user.name,
                    user.email
                ),
                Err(e) => println!("{} {}", style("✗").red(), e),
            }
        }
        Commands::Logout => {
            open_session(&config).sign_out();
            println!("{} Signed out", style("✓").green().bold());
        }
        Commands::Pay {
            phone,
            amount,
            method,
            yes,
        } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("Pay {:.2} via {} from {}?", amount, method, phone))
                    .default(true)
                    .interact()?;
            if confirmed {
                let mut session = open_session(&config);
                match session.confirm_payment(&phone, amount, &method) {
                    Ok(payment) => println!(
                        "{} Payment {} confirmed. Premium is active.",
                        style("✓").green().bold(),
                        payment.id
                    ),
                    Err(e) => println!("{} {}", style("✗").red(), e),
                }
            }
        }
        Commands::Background { value } => {
            let cleared = value.is_none();
            open_session(&config).set_background(value);
            if cleared {
                println!("{} Background reset", style("✓").green().bold());
            } else {
                println!("{} Background updated", style("✓").green().bold());
            }
        }
        Commands::Serve { port } => run_serve(&config, port).await?,
    }

    Ok(())
}

/// Relative log directories live under the config directory
fn log_config(loader: &ConfigLoader, config: &Config) -> LoggingConfig {
    let mut logging = config.logging.clone();
    let dir = expand_home(&logging.dir);
    let dir = if dir.is_relative() {
        loader.config_dir().join(dir)
    } else {
        dir
    };
    logging.dir = dir.to_string_lossy().into_owned();
    logging
}

fn responder(config: &Config) -> Arc<dyn Responder> {
    Arc::new(TemplatedResponder::new(&config.responder))
}

fn open_session(config: &Config) -> StudySession {
    let storage = FileStorage::new(expand_home(&config.storage.dir))
        .with_quota(config.storage.quota_bytes);
    StudySession::open(
        config.clone(),
        Arc::new(storage),
        responder(config),
        Arc::new(TemplatedConsolidator::default()),
    )
}

/// Cancellation token fired by Ctrl+C while armed
struct CtrlC {
    token: CancellationToken,
    watcher: tokio::task::JoinHandle<()>,
}

impl CtrlC {
    fn arm() -> Self {
        let token = CancellationToken::new();
        let fired = token.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                fired.cancel();
            }
        });
        Self { token, watcher }
    }
}

impl Drop for CtrlC {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to StudyMate!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();
    config.storage.dir = Input::new()
        .with_prompt("Where should your session be stored?")
        .default(config.storage.dir.clone())
        .interact_text()?;
    config.responder.latency_ms = Input::new()
        .with_prompt("Simulated reply delay in milliseconds")
        .default(config.responder.latency_ms)
        .interact_text()?;
    config.backend.api_key = Input::new()
        .with_prompt("Backend API key (leave empty for offline answers)")
        .allow_empty(true)
        .interact_text()?;

    loader.save(&config)?;
    std::fs::create_dir_all(expand_home(&config.storage.dir))?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!("  {} - Upload notes", style("studymate upload notes.pdf").cyan());
    println!("  {} - Start chatting", style("studymate chat --attach").cyan());

    Ok(())
}

async fn run_upload(config: &Config, path: &Path, mime: Option<String>) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut session = open_session(config);
    let ctrl_c = CtrlC::arm();
    let bar = spinner(&format!("Reading {}...", name));
    let result = session
        .upload(&name, mime.as_deref().unwrap_or_default(), bytes, &ctrl_c.token)
        .await;
    bar.finish_and_clear();

    match result {
        Ok(record) => {
            println!(
                "{} Uploaded {} ({}, {} bytes)",
                style("✓").green().bold(),
                style(&record.name).bold(),
                record.category,
                record.size
            );
            println!("  id: {}", style(&record.id).dim());
        }
        Err(studymate_core::Error::Cancelled) => println!("{}", style("Upload cancelled.").yellow()),
        Err(e) => println!("{} {}", style("✗").red(), e),
    }
    Ok(())
}

async fn ask(session: &mut StudySession, message: &str, attach: bool) -> Result<()> {
    if attach && session.current_file().is_none() {
        println!(
            "{}",
            style("No current file; asking without one.").yellow()
        );
    }

    let ctrl_c = CtrlC::arm();
    let bar = spinner("Thinking...");
    let outcome = session.send(message, attach, &ctrl_c.token).await;
    bar.finish_and_clear();

    match outcome {
        Ok(SendOutcome::Replied { message, .. }) => {
            println!("\n{}", style("StudyMate:").bold().cyan());
            println!("{}", message.text);
            if let Some(media) = &message.generated_media {
                println!("  {} {}", style("media:").dim(), media.url);
            }
        }
        Ok(SendOutcome::Failed(message)) => println!("{}", style(&message.text).red()),
        Ok(SendOutcome::Cancelled) => println!("{}", style("Request cancelled.").yellow()),
        Ok(SendOutcome::LimitReached { limit }) => println!(
            "{} You've used all {} free questions. Run {} to upgrade.",
            style("!").yellow().bold(),
            limit,
            style("studymate pay").cyan()
        ),
        Err(e) => {
            error!("Failed to send message: {}", e);
            println!("{} {}", style("✗").red(), e);
        }
    }
    Ok(())
}

async fn run_chat(config: &Config, attach: bool) -> Result<()> {
    let mut session = open_session(config);
    let mut attach = attach;

    println!("{}", style("StudyMate chat").bold().cyan());
    println!(
        "{}",
        style("Commands: /attach toggles the current file, /reset starts over, /quit exits").dim()
    );
    if let Some(file) = session.current_file() {
        println!("Current file: {}", style(&file.name).bold());
    }

    loop {
        let line: String = Input::new()
            .with_prompt(if attach { "you (file)" } else { "you" })
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/attach" => {
                attach = !attach;
                println!("Attach current file: {}", if attach { "on" } else { "off" });
            }
            "/reset" => {
                session.reset_conversation();
                println!("{}", style("Conversation reset.").dim());
            }
            _ => ask(&mut session, line, attach).await?,
        }
    }

    info!("Chat ended");
    Ok(())
}

fn run_history(config: &Config) {
    let session = open_session(config);
    let groups = session.upload_groups();
    if groups.is_empty() {
        println!("No uploads yet.");
        return;
    }

    let current_id = session.current_file().map(|f| f.id.clone());
    println!("{}", style("Uploads").bold().cyan());
    for group in groups {
        println!(
            "\n  {} ({} version{})",
            style(&group.name).bold(),
            group.versions.len(),
            if group.versions.len() == 1 { "" } else { "s" }
        );
        for version in &group.versions {
            let mut flags = Vec::new();
            if current_id.as_deref() == Some(version.id.as_str()) {
                flags.push(style("current").green().to_string());
            }
            if !version.has_content() {
                flags.push(style("content dropped").yellow().to_string());
            }
            println!(
                "    {}  {}  {} bytes  {} {}",
                style(&version.id).dim(),
                version.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                version.size,
                version.category,
                flags.join(" ")
            );
        }
    }
}

fn run_restore(config: &Config, id: &str) {
    let mut session = open_session(config);
    match session.restore_upload(id) {
        RestoreOutcome::Restored => {
            let name = session.current_file().map(|f| f.name.clone()).unwrap_or_default();
            println!("{} {} is the current file again", style("✓").green().bold(), name);
        }
        RestoreOutcome::MissingContent => println!(
            "{} That version's content was dropped to save space. Please upload the file again.",
            style("!").yellow().bold()
        ),
        RestoreOutcome::NotFound => println!("{} Upload {} not found", style("✗").red(), id),
    }
}

fn run_export(config: &Config, out: &Path) -> Result<()> {
    let mut session = open_session(config);
    let mut transcript = String::from("# StudyMate conversation\n");
    for message in session.messages() {
        let speaker = match message.role {
            Role::User => "You",
            Role::Model => "StudyMate",
        };
        transcript.push_str(&format!("\n**{}:** {}\n", speaker, message.text));
        if let Some(attachment) = &message.attachment {
            transcript.push_str(&format!("_attached: {}_\n", attachment.name));
        }
    }

    std::fs::write(out, transcript)
        .with_context(|| format!("failed to write {}", out.display()))?;
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| out.display().to_string());
    session.record_download(&name, "transcript");

    println!(
        "{} Saved {} messages to {}",
        style("✓").green().bold(),
        session.messages().len(),
        out.display()
    );
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    let session = open_session(config);

    println!("{}", style("StudyMate Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Storage: {}", expand_home(&config.storage.dir).display());
    println!("  Responder: {}", session.responder_name());
    let key_status = if config.backend.api_key.is_empty() {
        style("not configured").dim()
    } else {
        style("configured").green()
    };
    println!("  Backend key: {}", key_status);
    println!();

    let remaining = session.usage_remaining();
    let in_window = session.usage_in_window();
    let record = session.record();
    let state = &record.user_state;

    println!("{}", style("Account:").bold());
    match &state.user {
        Some(user) => println!("  Signed in: {} <{}>", user.name, user.email),
        None => println!("  Signed in: {}", style("no").dim()),
    }
    println!(
        "  Plan: {}",
        if state.is_premium {
            style("premium").green()
        } else {
            style("free").yellow()
        }
    );
    match remaining {
        Some(left) => println!("  Questions left: {}", left),
        None => println!("  Questions left: unlimited"),
    }
    println!(
        "  Questions in the last {} min: {}",
        config.usage.window_secs / 60,
        in_window
    );
    println!();

    println!("{}", style("Session:").bold());
    match &record.current_file {
        Some(file) => println!("  Current file: {} ({})", file.name, file.category),
        None => println!("  Current file: none"),
    }
    println!("  Uploads: {}", state.upload_history.len());
    println!("  Messages: {}", record.messages.len());
    if !state.long_term_memory.is_empty() {
        println!("  Memory: {}", truncate(&state.long_term_memory, 80));
    }
}

async fn run_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let body_limit = usize::try_from(config.uploads.max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(1024 * 1024);

    let (state, manager) = Manager::channel(
        responder(config),
        FileParser::new(&config.uploads),
        body_limit,
    );
    tokio::spawn(manager.run());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
        }
    });

    println!(
        "{} http://{}:{}/api/ask",
        style("Serving").bold().cyan(),
        config.server.host,
        port
    );
    run_server(state, &config.server.host, port, shutdown_rx).await?;
    println!("{}", style("Server stopped.").green());
    Ok(())
}
