mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hiremate-cli")]
#[command(about = "HireMate CLI - Inspect problem catalogs and grade solutions locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the problems in a catalog
    List {
        /// Problem catalog (JSON)
        #[arg(short, long, default_value = "config/problems.json")]
        catalog: PathBuf,
    },

    /// Grade a solution file against a problem's test cases
    Run {
        #[arg(short, long, default_value = "config/problems.json")]
        catalog: PathBuf,

        /// Problem id (e.g., two-sum)
        #[arg(short, long)]
        problem: String,

        /// Source file containing the solution
        #[arg(long)]
        code: PathBuf,

        /// Language of the solution (javascript, typescript)
        #[arg(short, long, default_value = "javascript")]
        language: String,

        /// Include hidden test cases
        #[arg(long, default_value = "false")]
        all: bool,

        /// Print the run report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Check every reference solution against every test case
    Verify {
        #[arg(short, long, default_value = "config/problems.json")]
        catalog: PathBuf,

        /// Only verify this problem
        #[arg(short, long)]
        problem: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { catalog } => {
            commands::list_problems(&catalog)?;
        }
        Commands::Run {
            catalog,
            problem,
            code,
            language,
            all,
            json,
        } => {
            let executor = commands::load_executor()?;
            commands::run_solution(&executor, &catalog, &problem, &code, &language, all, json).await?;
        }
        Commands::Verify { catalog, problem } => {
            let executor = commands::load_executor()?;
            commands::verify_catalog(&executor, &catalog, problem.as_deref()).await?;
        }
    }

    Ok(())
}
