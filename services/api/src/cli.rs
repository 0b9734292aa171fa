use crate::demo::{run_amendes_list, run_demo, run_rapport_preview, AmendesListArgs, DemoArgs, PreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rapports::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rapports",
    about = "Record citations and price fines from the command line or over HTTP",
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
    /// Browse the fine schedule
    Amendes {
        #[command(subcommand)]
        command: AmendesCommand,
    },
    /// Price a citation without recording it
    Rapport {
        #[command(subcommand)]
        command: RapportCommand,
    },
    /// Walk one citation through recording, repeat pricing and status changes
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AmendesCommand {
    /// List infractions, optionally filtered by category or name
    List(AmendesListArgs),
}

#[derive(Subcommand, Debug)]
enum RapportCommand {
    /// Show the penalty summary for a set of infractions
    Preview(PreviewArgs),
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
        Command::Amendes {
            command: AmendesCommand::List(args),
        } => run_amendes_list(args),
        Command::Rapport {
            command: RapportCommand::Preview(args),
        } => run_rapport_preview(args),
        Command::Demo(args) => run_demo(args),
    }
}
