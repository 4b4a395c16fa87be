#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI that checks whether a sender has mailed you recently

use anyhow::Context;
use clap::Parser;
use imap_sender_check::{
    AccountConfig, AccountOverrides, SavedConfig, SearchResult, Security, Session,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sender-check")]
#[command(about = "Check if you have received emails from a specific sender")]
struct Args {
    /// Email address to search for (e.g. user@example.com)
    sender_email: String,

    /// Your email address
    #[arg(short, long)]
    email: Option<String>,

    /// Your email password or app password
    #[arg(short, long)]
    password: Option<String>,

    /// IMAP server address
    #[arg(short, long)]
    server: Option<String>,

    /// IMAP server port
    #[arg(long)]
    port: Option<u16>,

    /// Number of days to search back
    #[arg(short, long, default_value = "30")]
    days: u32,

    /// Mailbox to search
    #[arg(short, long, default_value = "INBOX")]
    mailbox: String,

    /// Save email address and server for future use (never the password)
    #[arg(long)]
    save_config: bool,

    /// Connect without TLS
    #[arg(long, conflicts_with = "starttls")]
    no_ssl: bool,

    /// Connect in plaintext and upgrade with STARTTLS
    #[arg(long)]
    starttls: bool,

    /// Accept self-signed or otherwise invalid certificates
    #[arg(long)]
    insecure: bool,

    /// Config file to read and save (default: user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    const fn security(&self) -> Security {
        if self.no_ssl {
            Security::Plain
        } else if self.starttls {
            Security::StartTls
        } else {
            Security::Tls
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config_path = args.config.clone().or_else(SavedConfig::default_path);
    let saved = config_path
        .as_deref()
        .map(SavedConfig::load_or_default)
        .unwrap_or_default();

    let account = resolve_account(&args, &saved)?;

    if args.save_config {
        save_config(&account, config_path);
    }

    println!("Searching for emails from: {}", args.sender_email);
    println!("Using account: {}", account.email_address);
    println!("Server: {}:{}", account.host, account.port);
    println!("Searching last {} days", args.days);
    println!("{}", "-".repeat(50));

    let mut session = Session::new(account);

    let outcome = tokio::select! {
        outcome = run(&mut session, &args) => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!("\nOperation cancelled by user");
            Ok(ExitCode::SUCCESS)
        }
    };

    session.disconnect().await;
    outcome
}

fn resolve_account(args: &Args, saved: &SavedConfig) -> anyhow::Result<AccountConfig> {
    let cli = AccountOverrides {
        email_address: args.email.clone(),
        password: args.password.clone(),
        host: args.server.clone(),
        port: args.port,
    };
    let mut overrides = cli.or(AccountOverrides::from_env()?);

    if overrides.email_address.is_none() && saved.email_address.is_none() {
        overrides.email_address = Some(prompt_line("Enter your email address: ")?);
    }
    if overrides.password.is_none() {
        let password = rpassword::prompt_password("Enter your email password (or app password): ")
            .context("Failed to read password")?;
        overrides.password = Some(password);
    }

    let mut account = AccountConfig::resolve(&overrides, saved, args.security())?;
    account.accept_invalid_certs = args.insecure;
    Ok(account)
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn save_config(account: &AccountConfig, path: Option<PathBuf>) {
    let Some(path) = path else {
        eprintln!("No config directory available; configuration not saved");
        return;
    };

    match SavedConfig::from(account).save(&path) {
        Ok(()) => println!("Configuration saved to {}", path.display()),
        Err(e) => eprintln!("Error saving config: {e}"),
    }
}

async fn run(session: &mut Session, args: &Args) -> anyhow::Result<ExitCode> {
    if let Err(e) = session.connect().await {
        eprintln!("Failed to connect: {e}");
        return Ok(ExitCode::FAILURE);
    }
    println!(
        "Successfully connected to {}",
        session.config().email_address
    );

    let results = match session
        .try_search_from_sender(&args.sender_email, args.days, &args.mailbox)
        .await
    {
        Ok(report) => {
            println!(
                "Found {} emails from {} in the last {} days",
                report.matched(),
                args.sender_email,
                args.days
            );
            for skipped in &report.skipped {
                eprintln!("Error processing email {}: {}", skipped.id, skipped.reason);
            }
            report.results
        }
        Err(e) => {
            eprintln!("Search failed: {e}");
            Vec::new()
        }
    };

    print_results(&results, &args.sender_email, args.days);
    Ok(ExitCode::SUCCESS)
}

fn print_results(results: &[SearchResult], sender: &str, days: u32) {
    if results.is_empty() {
        println!("\nNo emails found from {sender} in the last {days} days");
        return;
    }

    println!("\nFound {} email(s) from {sender}:", results.len());
    println!("{}", "=".repeat(80));

    for (i, result) in results.iter().enumerate() {
        println!("\nEmail #{}", i + 1);
        println!("   Subject: {}", result.subject);
        println!("   From: {}", result.from);
        println!("   Date: {}", result.date);
        println!("{}", "-".repeat(40));
    }
}
