//! CyberVault CLI - Command line client for the credential vault core.
//!
//! This tool drives the session manager and vault store interactively
//! against a configured provider; it renders only the derived view and the
//! session notice stream, never filtering on its own.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cybervault_common::{
    generate_password, Category, Passphrase, RecordDraft, RecordId, VaultRecord,
    DEFAULT_PASSWORD_LENGTH,
};
use cybervault_provider::{create_default_registry, ClientConfig, Provider};
use cybervault_session::{AuthState, SessionManager, SessionNotice};
use cybervault_store::{CategoryFilter, ConfirmGate, DeleteOutcome, VaultStore, VaultView};

#[derive(Parser)]
#[command(name = "cybervault")]
#[command(about = "CyberVault - Personal credential vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive vault session.
    Shell {
        /// Path to a client configuration file (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the available providers.
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Shell { config } => cmd_shell(config.as_deref()).await,
        Commands::Providers => cmd_providers(),
    }
}

/// List registered providers.
fn cmd_providers() -> Result<()> {
    let registry = create_default_registry();
    println!("Available providers:");
    for name in registry.providers() {
        println!("  {}", name);
    }
    Ok(())
}

/// Run the interactive shell.
async fn cmd_shell(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path).context("Failed to read config file")?;
            ClientConfig::from_json(&json).context("Invalid config file")?
        }
        None => ClientConfig::default(),
    };

    let registry = create_default_registry();
    let provider: Arc<dyn Provider> = config
        .resolve(&registry)
        .context("Failed to resolve provider")?;

    let (manager, mut notices) = SessionManager::new(provider.clone());
    manager
        .initialize()
        .await
        .context("Failed to initialize session")?;

    println!("CyberVault interactive shell. Type 'help' for commands.");

    let mut store: Option<VaultStore> = None;
    let mut rendered: Vec<RecordId> = Vec::new();

    loop {
        drain_notices(&mut notices);

        // Reconcile the session-scoped store with the current auth state.
        match manager.state() {
            AuthState::Authenticated { identity, .. } => {
                if store.is_none() {
                    let vault = VaultStore::new(provider.clone(), identity.id.clone());
                    if let Err(e) = vault.load().await {
                        println!("Failed to load your vault: {}", e);
                    }
                    rendered = render_view(&vault.view());
                    store = Some(vault);
                }
            }
            _ => {
                if store.take().is_some() {
                    rendered.clear();
                }
            }
        }

        let prompt = match manager.state() {
            AuthState::Authenticated { identity, .. } => format!("{}> ", identity.email),
            _ => "cybervault> ".to_string(),
        };
        let line = match prompt_line(&prompt) {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) => {
                println!("Input error: {}", e);
                break;
            }
        };

        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some(word) => word,
            None => continue,
        };
        let rest: Vec<&str> = words.collect();

        match (command, store.as_ref()) {
            ("help", _) => print_help(),
            ("quit", _) | ("exit", _) => break,

            ("genpass", _) => {
                let length = rest
                    .first()
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(DEFAULT_PASSWORD_LENGTH);
                println!("{}", generate_password(length));
            }

            ("signup", None) => {
                if let Err(e) = shell_sign_up(&manager, &rest).await {
                    println!("Sign-up failed: {}", e);
                }
                wait_for_transition(&manager).await;
            }
            ("signin", None) => {
                if let Err(e) = shell_sign_in(&manager, &rest).await {
                    println!("Sign-in failed: {}", e);
                }
                wait_for_transition(&manager).await;
            }

            ("signout", Some(_)) | ("logout", Some(_)) => {
                if let Err(e) = manager.sign_out().await {
                    println!("Sign-out failed: {}", e);
                }
                wait_for_transition(&manager).await;
            }

            ("list", Some(vault)) => rendered = render_view(&vault.view()),
            ("search", Some(vault)) => {
                vault.set_search(rest.join(" "));
                rendered = render_view(&vault.view());
            }
            ("category", Some(vault)) => {
                let value = rest.first().copied().unwrap_or("all");
                vault.set_category(CategoryFilter::parse(value));
                rendered = render_view(&vault.view());
            }
            ("add", Some(vault)) => {
                match shell_add(vault, &rest).await {
                    Ok(()) => rendered = render_view(&vault.view()),
                    Err(e) => println!("Failed to add entry: {}", e),
                }
            }
            ("edit", Some(vault)) => {
                match shell_edit(vault, &rest, &rendered).await {
                    Ok(()) => rendered = render_view(&vault.view()),
                    Err(e) => println!("Failed to edit entry: {}", e),
                }
            }
            ("fav", Some(vault)) => match pick(&rendered, &rest) {
                Some(id) => match vault.toggle_favorite(&id).await {
                    Ok(()) => rendered = render_view(&vault.view()),
                    Err(e) => println!("Failed to toggle favorite: {}", e),
                },
                None => println!("Usage: fav <entry number>"),
            },
            ("del", Some(vault)) => match pick(&rendered, &rest) {
                Some(id) => match vault.delete(&id, &StdinGate).await {
                    Ok(DeleteOutcome::Deleted) => rendered = render_view(&vault.view()),
                    Ok(DeleteOutcome::Cancelled) => println!("Kept."),
                    Err(e) => println!("Failed to delete entry: {}", e),
                },
                None => println!("Usage: del <entry number>"),
            },

            (other, Some(_)) => println!("Unknown command: {} (try 'help')", other),
            (other, None) => println!(
                "Unknown command or not signed in: {} (try 'help')",
                other
            ),
        }
    }

    manager.shutdown().await;
    println!("Bye.");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  signup <email>       register a new account");
    println!("  signin <email>       sign in");
    println!("  list                 show the vault");
    println!("  search [term]        filter by search term (empty clears)");
    println!("  category <name|all>  filter by category");
    println!("  add [title]          add an entry");
    println!("  edit <n>             edit entry n");
    println!("  fav <n>              toggle favorite on entry n");
    println!("  del <n>              delete entry n (asks first)");
    println!("  genpass [len]        generate a password");
    println!("  signout              sign out");
    println!("  quit                 leave the shell");
}

async fn shell_sign_up(manager: &SessionManager, rest: &[&str]) -> Result<()> {
    let email = match rest.first() {
        Some(email) => email.to_string(),
        None => prompt_required("Email: ")?,
    };
    let display_name = prompt_line("Display name (optional): ")?.unwrap_or_default();
    let passphrase = prompt_passphrase("Passphrase: ")?;
    let confirm = prompt_passphrase("Confirm passphrase: ")?;
    if passphrase.as_str() != confirm.as_str() {
        anyhow::bail!("passphrases do not match");
    }

    manager.sign_up(&email, &passphrase, &display_name).await?;
    Ok(())
}

async fn shell_sign_in(manager: &SessionManager, rest: &[&str]) -> Result<()> {
    let email = match rest.first() {
        Some(email) => email.to_string(),
        None => prompt_required("Email: ")?,
    };
    let passphrase = prompt_passphrase("Passphrase: ")?;
    manager.sign_in(&email, &passphrase).await?;
    Ok(())
}

async fn shell_add(vault: &VaultStore, rest: &[&str]) -> Result<()> {
    let title = if rest.is_empty() {
        prompt_required("Title: ")?
    } else {
        rest.join(" ")
    };

    let mut draft = RecordDraft::new(title);
    draft.category = Category::parse(
        &prompt_line("Category [general]: ")?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "general".to_string()),
    );
    draft.website_url = prompt_line("Website (optional): ")?.filter(|v| !v.is_empty());
    draft.username = prompt_line("Username (optional): ")?.filter(|v| !v.is_empty());
    let secret = rpassword::prompt_password("Secret (empty for none): ")
        .context("Failed to read secret")?;
    draft.secret_value = (!secret.is_empty()).then_some(secret);
    draft.notes = prompt_line("Notes (optional): ")?.filter(|v| !v.is_empty());

    vault.create(draft).await?;
    Ok(())
}

async fn shell_edit(vault: &VaultStore, rest: &[&str], rendered: &[RecordId]) -> Result<()> {
    let id = pick(rendered, rest).context("Usage: edit <entry number>")?;
    let record = vault
        .view()
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .context("entry is no longer visible")?;

    println!("Editing '{}' (empty input keeps the current value)", record.title);
    let mut draft = record.to_draft();

    if let Some(title) = prompt_line(&format!("Title [{}]: ", draft.title))?.filter(|v| !v.is_empty())
    {
        draft.title = title;
    }
    if let Some(category) =
        prompt_line(&format!("Category [{}]: ", draft.category))?.filter(|v| !v.is_empty())
    {
        draft.category = Category::parse(&category);
    }
    if let Some(url) = prompt_line(&format!(
        "Website [{}]: ",
        draft.website_url.as_deref().unwrap_or("-")
    ))?
    .filter(|v| !v.is_empty())
    {
        draft.website_url = Some(url);
    }
    if let Some(username) = prompt_line(&format!(
        "Username [{}]: ",
        draft.username.as_deref().unwrap_or("-")
    ))?
    .filter(|v| !v.is_empty())
    {
        draft.username = Some(username);
    }
    let secret = rpassword::prompt_password("Secret (empty keeps current): ")
        .context("Failed to read secret")?;
    if !secret.is_empty() {
        draft.secret_value = Some(secret);
    }

    vault.update(&id, draft).await?;
    Ok(())
}

/// Map a typed entry number back to the id it was rendered under.
fn pick(rendered: &[RecordId], rest: &[&str]) -> Option<RecordId> {
    let index: usize = rest.first()?.parse().ok()?;
    rendered.get(index.checked_sub(1)?).cloned()
}

/// Print the derived view and return the ids in display order.
fn render_view(view: &VaultView) -> Vec<RecordId> {
    let mut ids = Vec::new();

    if view.is_empty() {
        if view.total == 0 {
            println!("The vault is empty. Add your first entry with 'add'.");
        } else {
            println!("No entries match the current filters.");
        }
        return ids;
    }

    if !view.favorites.is_empty() {
        println!("Favorites:");
        for record in &view.favorites {
            ids.push(record.id.clone());
            println!("  {:>2}. * {}", ids.len(), describe(record));
        }
    }
    if !view.others.is_empty() {
        println!("All entries:");
        for record in &view.others {
            ids.push(record.id.clone());
            println!("  {:>2}.   {}", ids.len(), describe(record));
        }
    }
    println!("{} of {} entries shown", view.matched, view.total);
    ids
}

fn describe(record: &VaultRecord) -> String {
    let mut parts = vec![format!("{} [{}]", record.title, record.category.label())];
    if let Some(username) = &record.username {
        parts.push(username.clone());
    }
    if let Some(url) = &record.website_url {
        parts.push(url.clone());
    }
    parts.join("  ")
}

fn drain_notices(notices: &mut mpsc::Receiver<SessionNotice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice {
            SessionNotice::Welcome { email } => {
                println!("Signed in successfully — welcome to CyberVault, {}!", email);
            }
            SessionNotice::ConfirmationSent { email } => {
                println!("Account created for {}. Confirm it to sign in.", email);
            }
            SessionNotice::SignedOut => println!("You have been signed out."),
        }
    }
}

/// Give the pushed session event a moment to land before re-prompting.
async fn wait_for_transition(manager: &SessionManager) {
    let mut rx = manager.watch_state();
    let _ = tokio::time::timeout(Duration::from_millis(500), rx.changed()).await;
}

/// Read a trimmed line; `None` on EOF.
fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt_required(prompt: &str) -> Result<String> {
    match prompt_line(prompt)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => anyhow::bail!("a value is required"),
    }
}

fn prompt_passphrase(prompt: &str) -> Result<Passphrase> {
    let value = rpassword::prompt_password(prompt).context("Failed to read passphrase")?;
    Ok(Passphrase::new(value))
}

/// Confirmation gate backed by a terminal y/n prompt.
struct StdinGate;

#[async_trait]
impl ConfirmGate for StdinGate {
    async fn confirm_delete(&self, record: &VaultRecord) -> bool {
        match prompt_line(&format!("Delete '{}'? [y/N]: ", record.title)) {
            Ok(Some(answer)) => matches!(answer.as_str(), "y" | "Y" | "yes"),
            _ => false,
        }
    }
}
