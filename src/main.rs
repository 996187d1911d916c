//! CLI entry point for the ia-mine tool.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ia_miner::mine::SearchOptions;
use ia_miner::{CredentialBundle, MineError, Miner, MinerOptions, ResponseHandler, auth, config};
use tracing::{debug, info};

mod cli;

use cli::Args;

/// Exit code for an interrupt (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

/// Exit code when stdin is seekable but holds no identifiers.
const EXIT_EMPTY_STDIN: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Logs go to stderr; stdout carries only mined JSON.
    // Priority: RUST_LOG env var > debug flag > default (warn)
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    if args.configure {
        configure(&args).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = config::config_path(args.config_file.as_deref());
    let credentials = config::load(&config_path)?.credentials();

    let options = MinerOptions {
        workers: usize::try_from(args.workers).unwrap_or(usize::MAX),
        retries: args.retries,
        secure: args.secure,
        hosts: read_hosts(&args)?,
        cache: args.cache,
        debug: args.debug,
        auth_url: None,
    };

    if args.search.is_some() || args.all {
        run_search(&args, &credentials, options).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let (identifiers, stdin_was_seekable) = read_identifiers(args.input.as_deref())?;
    if identifiers.is_empty() {
        if stdin_was_seekable {
            return Ok(ExitCode::from(EXIT_EMPTY_STDIN));
        }
        info!("no identifiers to mine");
        return Ok(ExitCode::SUCCESS);
    }

    let miner = Miner::connect(&credentials, options).await?;
    let stats = miner
        .mine_items(&identifiers, &[], ResponseHandler::PrintBody)
        .await;
    debug!(
        completed = stats.completed(),
        abandoned = stats.abandoned(),
        retried = stats.retried(),
        "mining complete"
    );
    Ok(ExitCode::SUCCESS)
}

/// Runs the search modes: --info, --num-found, page mining, or mine-ids.
async fn run_search(
    args: &Args,
    credentials: &CredentialBundle,
    options: MinerOptions,
) -> Result<()> {
    let query = args.search.as_deref();
    let search_options = SearchOptions {
        rows: args.rows,
        fields: args.field.clone(),
        mine_ids: args.mine_ids,
        ..SearchOptions::default()
    };

    let miner = Miner::connect(credentials, options).await?;

    if args.info || args.num_found {
        let info = miner.search_info(query, &search_options).await?;
        if args.num_found {
            println!("{}", info.num_found);
        } else {
            println!("{}", serde_json::to_string(&info.header)?);
        }
        return Ok(());
    }

    let handler = args.itemlist.then_some(ResponseHandler::PrintIdentifiers);
    let stats = miner.search(query, &search_options, handler).await?;
    debug!(
        completed = stats.completed(),
        abandoned = stats.abandoned(),
        retried = stats.retried(),
        "search mining complete"
    );
    Ok(())
}

/// Prompts for account credentials, exchanges them for keys and session
/// cookies, and saves the merged config.
async fn configure(args: &Args) -> Result<()> {
    eprintln!("Enter your Archive.org credentials below to configure ia-mine.");
    eprintln!();
    let username = prompt("Email address: ")?;
    let password = prompt("Password: ")?;
    eprintln!();

    let auth_config = auth::login(auth::DEFAULT_ACCOUNT_URL, &username, &password)
        .await
        .context("login failed")?;

    let path = config::config_path(args.config_file.as_deref());
    let mut config = config::load(&path)?;
    config.merge(&auth_config, true);
    config::save(&config, &path)?;
    eprintln!("Config saved to: {}", path.display());
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read credentials from stdin")?;
    Ok(line.trim().to_string())
}

/// Reads the host list file, one host per line, blanks skipped.
fn read_hosts(args: &Args) -> Result<Vec<String>> {
    let Some(path) = &args.hosts else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read hosts file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Reads identifiers from the given file, or from stdin when the input is
/// `-` or absent. Returns the identifiers and whether they came from a
/// seekable stdin (a redirected file rather than a pipe or terminal), which
/// drives the empty-input exit code.
fn read_identifiers(input: Option<&str>) -> Result<(Vec<String>, bool)> {
    let (text, seekable) = match input {
        Some(path) if path != "-" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read itemlist {path}"))?;
            (text, false)
        }
        _ => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                info!("no input provided; pass an itemlist file or pipe identifiers via stdin");
                return Ok((Vec::new(), false));
            }
            let mut text = String::new();
            stdin.lock().read_to_string(&mut text)?;
            (text, stdin_is_seekable())
        }
    };

    let identifiers = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    Ok((identifiers, seekable))
}

/// Whether stdin is a seekable stream (a redirected file). Pipes and
/// terminals are not seekable.
#[cfg(unix)]
fn stdin_is_seekable() -> bool {
    // SAFETY: lseek on fd 0 with SEEK_CUR reads the offset without
    // touching the stream.
    unsafe { libc::lseek(0, 0, libc::SEEK_CUR) != -1 }
}

#[cfg(not(unix))]
fn stdin_is_seekable() -> bool {
    false
}

/// Prints the failure, with credential hints for authentication errors.
fn report_error(error: &anyhow::Error) {
    if let Some(MineError::Auth { message }) = error.downcast_ref::<MineError>() {
        eprintln!("error: {message}");
        if message.starts_with("The request signature we calculated") {
            eprintln!("hint: your secret key does not match your access key.");
        } else if message.starts_with("The AWS Access Key Id") {
            eprintln!("hint: your access key is invalid.");
        }
        eprintln!("hint: run `ia-mine --configure` to refresh your credentials.");
        return;
    }
    eprintln!("error: {error:#}");
}
