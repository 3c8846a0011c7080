mod cli;
mod client;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use client::FhirClient;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);
    let profile = &cli.profile;

    match &cli.command {
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                let cfg = config::load_profile(profile)?;
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    cfg.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    cfg.format.as_deref().unwrap_or("table")
                );
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = config::load_profile(profile)?;
                config::set_key(&mut cfg, &set_args.key, &set_args.value)?;
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::List(args) => {
            let (client, format) = connect(&cli)?;
            commands::patients::list(&client, &args.view, format).await?;
        }
        Commands::Range(args) => {
            let (client, format) = connect(&cli)?;
            commands::patients::range(
                &client,
                args.from.as_deref(),
                args.to.as_deref(),
                &args.view,
                format,
            )
            .await?;
        }
        Commands::Search(args) => {
            let (client, format) = connect(&cli)?;
            commands::patients::search(
                &client,
                args.name.as_deref(),
                args.birthdate.as_deref(),
                &args.view,
                format,
            )
            .await?;
        }
        Commands::Shell => {
            let (client, format) = connect(&cli)?;
            commands::shell::run(&client, format).await?;
        }
    }

    Ok(())
}

fn connect(cli: &Cli) -> Result<(FhirClient, cli::OutputFormat)> {
    let server = config::resolve_server(&cli.server, &cli.profile)?;
    let format = config::resolve_format(cli.format, &cli.profile)?;
    tracing::debug!(%server, profile = %cli.profile, ?format, "using registry");
    Ok((FhirClient::new(&server)?, format))
}
