use crate::bootstrap::Clock;
use crate::docker::ContainerManager;
use crate::error::Error;
use crate::prompt::{interactive_configuration, Prompt};
use crate::runner::CommandRunner;
use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;

#[derive(Parser, Debug)]
#[command(name = "devbox", version, about = "Manage the local development container")]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure docker for the instance (interactive when no key is given)
    Configure {
        key: Option<String>,
        value: Option<String>,
    },
    /// Build the docker image (`update` skips the build cache)
    #[command(name = "build:image")]
    BuildImage { no_cache: Option<String> },
    /// Create and run the container, bootstrapping MySQL when configured
    Build,
    /// Start the container
    Start,
    /// Start the container
    Docker,
    /// Stop the container
    Stop,
    /// Stop every container on this host
    #[command(name = "stopAll")]
    StopAll,
    /// Run a command inside the container
    Command {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Setup and upgrade the application inside the container
    Setup,
    /// Show usage
    Help,
    #[command(external_subcommand)]
    Other(Vec<String>),
}

fn no_cache_requested(arg: Option<&str>) -> bool {
    matches!(arg.map(str::to_ascii_lowercase).as_deref(), Some("update" | "yes" | "true"))
}

pub fn help_text(container_name: &str) -> String {
    let rows = [
        ("To use interactive configure docker", "devbox configure".to_string()),
        ("To configure docker options", "devbox configure [key] [value]".to_string()),
        ("To build image", "devbox build:image [update]".to_string()),
        ("To build container", "devbox build".to_string()),
        ("To run container", "devbox start".to_string()),
        ("To stop the container", "devbox stop".to_string()),
        ("To stop all containers", "devbox stopAll".to_string()),
        ("To run a command in the container", "devbox command <args...>".to_string()),
        ("To setup the application", "devbox setup".to_string()),
        (
            "To enter the container",
            format!("docker exec -it {container_name} /bin/bash"),
        ),
    ];
    rows.iter()
        .map(|(what, how)| format!("{what}: {}", how.as_str().green()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_help<R: CommandRunner, C: Clock>(mgr: &ContainerManager<'_, R, C>) {
    let name = mgr
        .container_name()
        .unwrap_or_else(|_| crate::docker::DEFAULT_NAME.to_string());
    println!("{}", help_text(&name));
    println!("Configuration file: {}", mgr.store().path().display());
}

pub async fn dispatch<R: CommandRunner, C: Clock>(
    command: Option<Commands>,
    mgr: &mut ContainerManager<'_, R, C>,
    prompt: &mut impl Prompt,
) -> Result<()> {
    let Some(command) = command else {
        print_help(mgr);
        return Ok(());
    };
    tracing::debug!(?command, "dispatch");

    match command {
        Commands::Configure { key: None, .. } => {
            interactive_configuration(mgr.store_mut(), prompt)?;
            println!();
            print_help(mgr);
        }
        Commands::Configure {
            key: Some(key),
            value,
        } => {
            mgr.configure(&key, value.as_deref())?;
        }
        Commands::BuildImage { no_cache } => {
            mgr.build_image(no_cache_requested(no_cache.as_deref())).await?;
        }
        Commands::Build => mgr.build().await?,
        Commands::Start | Commands::Docker => mgr.start().await?,
        Commands::Stop => mgr.stop().await?,
        Commands::StopAll => mgr.stop_all().await?,
        Commands::Command { args } => {
            let out = mgr.exec_command(&args).await?;
            print!("{out}");
        }
        Commands::Setup => mgr.setup().await?,
        Commands::Help => print_help(mgr),
        Commands::Other(args) => {
            let name = args.into_iter().next().unwrap_or_default();
            return Err(Error::UnknownCommand(name).into());
        }
    }
    Ok(())
}
