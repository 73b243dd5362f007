//! autocard - set up an OpenPGP card automatically
//!
//! Generates a key, loads it onto the card and replaces the factory PINs
//! with random ones, driving gpg through its status protocol.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::env;
use std::path::PathBuf;
use std::process;

use tracing::debug;

use autocard::{ConfigLoader, Identity, Provisioner, RandomPinSource};

#[derive(Parser, Debug)]
#[command(name = "autocard")]
#[command(about = "Set up a GPG card automatically.", version)]
struct Cli {
    /// What to do
    #[arg(value_enum)]
    action: Action,

    /// Full name of owner
    #[arg(long, num_args = 1..)]
    name: Vec<String>,

    /// Email address of owner
    #[arg(long)]
    email: Option<String>,

    /// Current PIN of the card, usually the factory default 123456
    #[arg(long)]
    default_pin: Option<String>,

    /// Current admin PIN of the card, usually the factory default 12345678
    #[arg(long)]
    default_admin_pin: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Generate and load a key, then set random user and admin PINs
    Auto,
    /// Generate a key and load it onto the card
    #[value(alias = "gen_load_key")]
    GenLoadKey,
    /// Set a random user PIN
    #[value(alias = "set_pin")]
    SetPin,
    /// Set a random admin PIN
    #[value(alias = "set_admin_pin")]
    SetAdminPin,
}

impl Action {
    fn loads_key(&self) -> bool {
        matches!(self, Action::Auto | Action::GenLoadKey)
    }

    fn sets_user_pin(&self) -> bool {
        matches!(self, Action::Auto | Action::SetPin)
    }

    fn sets_admin_pin(&self) -> bool {
        matches!(self, Action::Auto | Action::SetAdminPin)
    }
}

fn init_tracing(debug: bool) {
    let debug = debug
        || env::var("AUTOCARD_DEBUG").map_or(false, |v| v == "1" || v.to_lowercase() == "true");
    let log_level = if debug { "debug" } else { "info" };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(pin) = cli.default_pin {
        config.card.default_user_pin = pin;
    }
    if let Some(pin) = cli.default_admin_pin {
        config.card.default_admin_pin = pin;
    }
    config
        .validate()
        .context("Invalid default PIN on the command line")?;
    debug!("Running {:?} with {:?}", cli.action, config.peer);

    // Identity problems surface before the card is touched
    let identity = if cli.action.loads_key() {
        anyhow::ensure!(!cli.name.is_empty(), "--name is required for {:?}", cli.action);
        let email = cli
            .email
            .with_context(|| format!("--email is required for {:?}", cli.action))?;
        Some(Identity::from_parts(&cli.name, email)?)
    } else {
        None
    };

    let provisioner = Provisioner::with_gpg(config);
    let mut pins = RandomPinSource;

    if let Some(identity) = identity {
        let key_id = provisioner
            .provision_new_card(&identity)
            .await
            .context("Failed to generate and load key")?;
        println!("All done");
        println!("Key ID: {}", key_id);
    }

    if cli.action.sets_user_pin() {
        let pin = provisioner
            .rotate_user_pin_randomly(&mut pins)
            .await
            .context("Failed to set user PIN")?;
        println!("New user PIN is {}", pin.expose());
    }

    if cli.action.sets_admin_pin() {
        let pin = provisioner
            .rotate_admin_pin_randomly(&mut pins)
            .await
            .context("Failed to set admin PIN")?;
        println!("New admin PIN is {}", pin.expose());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        let kind = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<autocard::Error>())
            .map(|err| err.kind().to_string())
            .unwrap_or_else(|| "error".to_string());
        eprintln!("{}: {:#}", kind, e);
        process::exit(1);
    }
}
