use crate::commands::{run_catalog, run_render, run_table, CatalogArgs, RenderArgs, TableArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use disclosure_reports::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Disclosure Reports",
    about = "Browse institution disclosure reports over HTTP or from the command line",
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
    /// Render one navigation path the way the web page would
    Render(RenderArgs),
    /// Render a report record JSON file as a table
    Table(TableArgs),
    /// List the report catalog
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Disclosure data file to serve instead of the bundled sample
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Render(args) => run_render(args).await,
        Command::Table(args) => run_table(args),
        Command::Catalog(args) => run_catalog(args),
    }
}
