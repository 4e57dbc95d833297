use crate::batch::{run_insights, run_score, InsightsArgs, ScoreArgs};
use crate::server;
use churn_intel::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Churn Intel",
    about = "Score customer churn risk over HTTP or from CSV exports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a customer export and write the results as CSV
    Score(ScoreArgs),
    /// Score a customer export and print dashboard figures
    Insights(InsightsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Insights(args) => run_insights(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["churn-intel-api"]).expect("bare invocation parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_requires_an_input() {
        assert!(Cli::try_parse_from(["churn-intel-api", "score"]).is_err());

        let cli = Cli::try_parse_from([
            "churn-intel-api",
            "score",
            "--input",
            "customers.csv",
            "--output",
            "scored.csv",
            "--derive-features",
        ])
        .expect("score arguments parse");
        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.input.to_str(), Some("customers.csv"));
                assert!(args.derive_features);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
