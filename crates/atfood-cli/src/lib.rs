#![allow(clippy::print_stdout)]

use clap::Parser;

mod send;
mod transport;

pub use transport::ReqwestTransport;

#[derive(Parser)]
#[command(name = "atfood")]
#[command(about = "Run ATFOOD assistant actions from the terminal")]
pub struct AtfoodCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Send one action and print the resulting transcript
    Send(send::SendArgs),
    /// List the actions and recipe ids the backend routes
    Actions,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = AtfoodCli::parse();
    match cli.command {
        Commands::Send(args) => send::run(args).await,
        Commands::Actions => {
            print_actions();
            Ok(())
        }
    }
}

fn print_actions() {
    println!("actions:");
    for action in atfood_client_core::KnownAction::ALL {
        println!("  {:<16} {}", action.as_str(), action.summary());
    }
    println!("recipes:");
    for (id, title) in atfood_client_core::request::KNOWN_RECIPES {
        println!("  {id:<24} {title}");
    }
}
