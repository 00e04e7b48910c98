#![forbid(unsafe_code)]
#![allow(clippy::print_stdout)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use herdbook::api::schemas::animals::NewAnimal;
use herdbook::client::{ApiClient, ClientConfig, ClientError};
use herdbook::domain::animal::AnimalStatus;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "herdbook-cli", version, about = "Command-line client for a herdbook server", long_about = None)]
struct Cli {
    #[command(flatten)]
    client: ClientConfig,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in.
    Register {
        username: String,
        #[arg(long, env = "HERDBOOK_PASSWORD")]
        password: String,
    },
    /// Sign in and store the session.
    Login {
        username: String,
        #[arg(long, env = "HERDBOOK_PASSWORD")]
        password: String,
    },
    /// Revoke the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Manage animals.
    #[command(subcommand)]
    Animals(AnimalCommand),
    /// Print the herd summary.
    Dashboard,
}

#[derive(Subcommand, Debug)]
enum AnimalCommand {
    /// List animals, optionally by status.
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<AnimalStatus>,
    },
    /// Add an animal.
    Add {
        tag: String,
        species: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        breed: Option<String>,
    },
}

fn parse_status(s: &str) -> Result<AnimalStatus, String> {
    s.parse::<AnimalStatus>().map_err(|e| e.to_string())
}

fn default_token_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from(".herdbook"), |home| PathBuf::from(home).join(".herdbook"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut cli = Cli::parse();
    if cli.client.token_dir.is_none() {
        cli.client.token_dir = Some(default_token_dir());
    }
    let client = ApiClient::new(&cli.client).context("failed to initialise client")?;

    match run(&client, cli.cmd).await {
        Err(e) if e.should_logout() => anyhow::bail!("{e}. Run `herdbook-cli login` again."),
        other => Ok(other?),
    }
}

async fn run(client: &ApiClient, cmd: Command) -> Result<(), ClientError> {
    match cmd {
        Command::Register { username, password } => {
            let user = client.register(&username, &password).await?;
            println!("Registered and signed in as {}", user.username);
        }
        Command::Login { username, password } => {
            let user = client.login(&username, &password).await?;
            println!("Signed in as {}", user.username);
        }
        Command::Logout => {
            client.logout().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = client.me().await?;
            println!("{} ({})", user.username, user.id);
        }
        Command::Animals(AnimalCommand::List { status }) => {
            for animal in client.list_animals(status).await? {
                println!(
                    "{:<12} {:<10} {:<10} {}",
                    animal.tag,
                    animal.species,
                    animal.status,
                    animal.name.unwrap_or_default()
                );
            }
        }
        Command::Animals(AnimalCommand::Add { tag, species, name, breed }) => {
            let animal = client
                .create_animal(&NewAnimal {
                    tag,
                    name,
                    species,
                    breed,
                    sex: None,
                    birth_date: None,
                    status: AnimalStatus::Active,
                })
                .await?;
            println!("Added {} ({})", animal.tag, animal.id);
        }
        Command::Dashboard => {
            let summary = client.dashboard().await?;
            println!("Animals: {}", summary.total_animals);
            for entry in &summary.by_status {
                println!("  {:<10} {}", entry.status, entry.count);
            }
            for entry in &summary.by_species {
                println!("  {:<10} {}", entry.species, entry.count);
            }
            println!("Health records (30 days): {}", summary.health_records_last_30_days);
        }
    }
    Ok(())
}
