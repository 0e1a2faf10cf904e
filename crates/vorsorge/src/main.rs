//! `vorsorge` - CLI for the family checkup tracker
//!
//! Runs the web server and offers schedule, status, and configuration
//! commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use vorsorge::cli::{Cli, Command, ConfigCommand, ScheduleCommand};
use vorsorge::{init_logging, schedule, web, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Config(ConfigCommand::Validate { file }) => {
            handle_validate(file.or(cli.config));
            Ok(())
        }
        command => {
            let config = Config::load_from(cli.config.clone())
                .context("failed to load configuration")?;
            run(command, &config).await
        }
    }
}

async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Serve(serve) => {
            let bind = serve.bind.unwrap_or(config.server.bind);
            web::serve(config, bind).await.context("server failed")
        }
        Command::Schedule(cmd) => handle_schedule(&cmd),
        Command::Status(status) => handle_status(config, status.json),
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

fn handle_schedule(cmd: &ScheduleCommand) -> anyhow::Result<()> {
    let appointments = schedule::generate(cmd.birth_date)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&appointments)?);
    } else {
        println!("Checkups for a child born {}", cmd.birth_date);
        println!("--------------------------------------");
        for appointment in &appointments {
            println!("{:<4} {}", appointment.exam, appointment.due_date);
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": path,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("vorsorge status");
        println!("---------------");
        println!("Database:      {}", path.display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Users:         {}", stats.users);
        println!("Parents:       {}", stats.parents);
        println!("Children:      {}", stats.children);
        println!("Appointments:  {}", stats.appointments);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                if shown.session.secret.is_some() {
                    shown.session.secret = Some("<redacted>".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!(
                    "  Secret:             {}",
                    if config.session.secret.is_some() {
                        "configured"
                    } else {
                        "generated per start"
                    }
                );
                println!("  Expiry (days):      {}", config.session.expiry_days);
                println!("  Secure cookie:      {}", config.session.secure_cookie);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
