mod bootstrap;
mod cli;
mod config;
mod docker;
mod env;
mod error;
mod prompt;
mod runner;

use anyhow::Result;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the progress text.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let start_dir = std::env::current_dir()?;
    let root = config::find_project_root(&start_dir);

    // .env may point DOCKER_BIN / DOCKER_CONTEXT_DIR elsewhere
    env::load_env(&root)?;

    let args = cli::Cli::parse();

    let layout = config::Layout::new(root);
    let mut store = config::ConfigStore::load(layout.config_file())?;
    let runner = runner::ProcessRunner;
    let clock = bootstrap::TokioClock;
    let mut manager = docker::ContainerManager::new(
        &mut store,
        &runner,
        &clock,
        layout,
        config::resolve_docker_binary(),
    );

    let mut prompt = prompt::TerminalPrompt::stdio();
    cli::dispatch(args.command, &mut manager, &mut prompt).await
}
