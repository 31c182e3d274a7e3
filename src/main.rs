use anyhow::Context;
use clap::Parser;
use dapp_client::{
    app::{view, AppSettings, AppState, Message},
    cli::{self, Command},
    config::{Config, DEFAULT_CONFIG_PATH},
    controller::Controller,
    wallet::WalletConnector,
};
use log::error;
use std::{io::BufRead, path::PathBuf, sync::Arc, thread};
use tokio::sync::mpsc;

/// Terminal client for the Transactions contract
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the toml config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// JSON-RPC endpoint, overrides the config file
    #[arg(long)]
    rpc_url: Option<String>,

    /// Deployed contract address, overrides the config file
    #[arg(long)]
    contract: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(url) = args.rpc_url {
        config.network.rpc_url = url;
    }
    if let Some(address) = args.contract {
        config.contract.address = address
            .parse()
            .with_context(|| format!("invalid contract address {:?}", address))?;
    }

    let settings = AppSettings::from_config(&config.ui)?;
    let limits = config.history.limits();
    let controller = Controller::new(
        AppState::new(settings),
        Arc::new(WalletConnector::new(config)),
        limits,
    );

    let (input_sender, input_receiver) = mpsc::channel(16);
    // stdin reads block, keep them off the runtime
    thread::spawn(move || read_commands(input_sender));

    println!("{}", cli::HELP);
    controller
        .run(input_receiver, |state| println!("\n{}", view::render(state)))
        .await;
    Ok(())
}

fn read_commands(sender: mpsc::Sender<Message>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read input: {}", e);
                return;
            }
        };
        match cli::parse_command(&line) {
            Ok(Some(Command::Message(message))) => {
                if sender.blocking_send(message).is_err() {
                    return;
                }
            }
            Ok(Some(Command::Help)) => println!("{}", cli::HELP),
            Ok(Some(Command::Quit)) => return,
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }
}
