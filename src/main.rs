//! canvas-rec CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use canvas_rec::cli::{
    app::{load_merged_config, run_recorder, EXIT_ERROR},
    args::{Cli, Commands, RecordOptions},
    config_cmd::handle_config_command,
    control_cmd::handle_control_command,
    presenter::Presenter,
};
use canvas_rec::infrastructure::XdgConfigStore;

/// Log to stderr; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "canvas_rec=warn",
        1 => "canvas_rec=debug",
        _ => "canvas_rec=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();
    let cli_config = cli.to_config();

    match cli.command {
        Some(Commands::Config { action }) => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Control { action }) => {
            if let Err(e) = handle_control_command(action, &presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        None => {}
    }

    let config = load_merged_config(cli_config).await;
    let options = RecordOptions::from_config(&config);
    tracing::debug!(?options, "resolved options");

    run_recorder(options).await
}
