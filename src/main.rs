use agora::cli::{self, CheckCommand, Cli, Commands, LedgerCommand};
use agora::error::Result;
use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    if let Err(e) = dispatch(args.command).await {
        cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => cli::run::execute(&args).await,
        Commands::Ledger(LedgerCommand::Balance(args)) => {
            cli::ledger::execute_balance(&args.config)
        }
        Commands::Ledger(LedgerCommand::Entries(args)) => {
            cli::ledger::execute_entries(&args.config, args.strategy.as_deref(), args.limit)
        }
        Commands::Ledger(LedgerCommand::Deposit(args)) => {
            cli::ledger::execute_deposit(&args.config, args.amount, &args.reference)
        }
        Commands::Strategies => cli::strategies::list(),
        Commands::Check(CheckCommand::Config(args)) => cli::check::execute_config(&args.config),
        Commands::Check(CheckCommand::Sources(args)) => {
            cli::check::execute_sources(&args.config).await
        }
    }
}
