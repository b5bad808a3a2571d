use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod cmd;
mod money;
mod scenario;
mod share;
mod tax;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "qsbs", version, about = "Estimate QSBS (IRC 1202) eligibility and tax savings")]
struct Cli {
    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Holding period, exclusion and tax savings for a scenario
    Calculate(cmd::calculate::CalculateCommand),
    /// Evaluate a file of scenarios, one result row each
    Batch(cmd::batch::BatchCommand),
    /// List state QSBS conformity and top rates
    States(cmd::states::StatesCommand),
    /// Encode or decode shareable scenario tokens
    Share(cmd::share::ShareCommand),
    /// Print input format schemas
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    log::debug!("Evaluating as of {}", today);

    match cli.command {
        Command::Calculate(calculate) => calculate.exec(today),
        Command::Batch(batch) => batch.exec(today),
        Command::States(states) => states.exec(),
        Command::Share(share) => share.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
