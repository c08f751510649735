// src/bin/vsession.rs
//! vsession: create, inspect and re-key credential databases from the shell

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vault_session::{
    CipherAlgorithm, Credentials, DatabaseType, FileEngine, Session, SessionEvent,
};

#[derive(Parser)]
#[command(name = "vsession", version, about = "Encrypted credential database sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new database
    Create {
        path: PathBuf,
        #[arg(long)]
        key_file: Option<PathBuf>,
        /// Write the legacy container format
        #[arg(long)]
        legacy: bool,
    },
    /// Show format, cipher and key derivation rounds
    Info {
        path: PathBuf,
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Replace the password (and optionally the key file)
    Passwd {
        path: PathBuf,
        #[arg(long)]
        key_file: Option<PathBuf>,
        #[arg(long)]
        new_key_file: Option<PathBuf>,
    },
    /// Change the key derivation rounds
    Rounds {
        path: PathBuf,
        rounds: u64,
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Change the body cipher
    Cipher {
        path: PathBuf,
        cipher: CipherArg,
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CipherArg {
    Aes,
    Chacha,
}

impl From<CipherArg> for CipherAlgorithm {
    fn from(arg: CipherArg) -> Self {
        match arg {
            CipherArg::Aes => CipherAlgorithm::Aes256,
            CipherArg::Chacha => CipherAlgorithm::ChaCha20Poly1305,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = Session::new(FileEngine::new()).context("failed to start storage engine")?;

    let result = run(&mut session, cli.command).await;
    if session.is_open() {
        session.close().ok();
        drain(&mut session).await.ok();
    }
    session.shutdown();
    result
}

async fn run(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Create {
            path,
            key_file,
            legacy,
        } => {
            let credentials = Credentials::new(prompt_new_password()?).with_optional_key_file(key_file);
            let database_type = if legacy {
                DatabaseType::LegacyFormat
            } else {
                DatabaseType::CurrentFormat
            };
            session.create(database_type, &path, credentials)?;
            drain(session).await?;
            info!(path = %path.display(), "database created");
            print_info(session, &path);
        }
        Command::Info { path, key_file } => {
            open(session, &path, key_file, true).await?;
            print_info(session, &path);
        }
        Command::Passwd {
            path,
            key_file,
            new_key_file,
        } => {
            open(session, &path, key_file, false).await?;
            let credentials =
                Credentials::new(prompt_new_password()?).with_optional_key_file(new_key_file);
            session.change_credentials(credentials)?;
            drain(session).await?;
            println!("credentials changed");
        }
        Command::Rounds {
            path,
            rounds,
            key_file,
        } => {
            open(session, &path, key_file, false).await?;
            session.set_key_derivation_rounds(rounds)?;
            drain(session).await?;
            println!("key derivation rounds: {}", session.key_derivation_rounds());
        }
        Command::Cipher {
            path,
            cipher,
            key_file,
        } => {
            open(session, &path, key_file, false).await?;
            session.set_cipher_algorithm(cipher.into())?;
            drain(session).await?;
            println!("cipher: {}", session.cipher_algorithm());
        }
    }
    Ok(())
}

async fn open(
    session: &mut Session,
    path: &Path,
    key_file: Option<PathBuf>,
    read_only: bool,
) -> Result<()> {
    let password = rpassword::prompt_password("Password: ").context("failed to read password")?;
    let credentials = Credentials::new(password).with_optional_key_file(key_file);
    session.open(DatabaseType::Unknown, path, credentials, read_only)?;
    drain(session)
        .await
        .with_context(|| format!("could not open {}", path.display()))
}

/// Waits for outstanding requests and fails on the first reported error
async fn drain(session: &mut Session) -> Result<()> {
    for event in session.settle().await {
        match event {
            SessionEvent::ErrorOccurred { code, message } => bail!("{code}: {message}"),
            other => info!(?other, "event"),
        }
    }
    Ok(())
}

fn prompt_new_password() -> Result<String> {
    let first = rpassword::prompt_password("New password: ").context("failed to read password")?;
    let second = rpassword::prompt_password("Repeat password: ").context("failed to read password")?;
    if first != second {
        bail!("passwords do not match");
    }
    Ok(first)
}

fn print_info(session: &Session, path: &Path) {
    println!("database: {}", path.display());
    println!("format:   {:?}", session.database_type());
    println!("cipher:   {}", session.cipher_algorithm());
    println!("rounds:   {}", session.key_derivation_rounds());
    println!("readonly: {}", session.is_read_only());
}
