use clap::{Parser, Subcommand};
use mkopo_cli::seed::seed_demo;
use mkopo_cli::server::{AppState, serve};
use mkopo_common::time;
use mkopo_runtime::datastore::init_loan_store;
use mkopo_runtime::report::{ReportFormat, ReportKind};
use mkopo_runtime::substitute;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkopo")]
#[command(about = "Mkopo loan back-office CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,
        /// Sqlite database url; in-memory store when omitted
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },
    /// Populate the database with generated demo data
    Seed {
        #[arg(long, default_value = "25")]
        count: usize,
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },
    /// Write a report to a file
    Export {
        /// Report type: loans, payments, clients, summary
        #[arg(long = "type", default_value = "loans")]
        kind: String,
        /// Output format: csv or pdf
        #[arg(long, default_value = "csv")]
        format: String,
        /// Period start, YYYY-MM-DD; defaults to the first of this month
        #[arg(long)]
        from: Option<String>,
        /// Period end, YYYY-MM-DD; defaults to today
        #[arg(long)]
        to: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, env = "DATABASE_URL")]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, database } => {
            let store = match init_loan_store(database.as_deref()).await {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("❌ Error: {}", e);
                    std::process::exit(1);
                }
            };
            // The in-memory store starts empty; give it the sample book so
            // the dashboard has something to show.
            if database.is_none()
                && let Err(e) = substitute::seed(store.as_ref()).await
            {
                eprintln!("❌ Error: {}", e);
                std::process::exit(1);
            }
            if let Err(e) = serve(AppState::new(store), port).await {
                eprintln!("❌ Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Seed { count, database } => {
            let result = async {
                let store = init_loan_store(database.as_deref()).await?;
                seed_demo(store.as_ref(), count).await
            }
            .await;
            match result {
                Ok(loans) => println!("✔ Seeded {} clients with {} loans.", count, loans),
                Err(e) => {
                    eprintln!("❌ Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Export {
            kind,
            format,
            from,
            to,
            output,
            database,
        } => {
            let today = time::today();
            let from = from
                .as_deref()
                .and_then(time::parse_ymd)
                .unwrap_or_else(|| time::first_of_month(today));
            let to = to.as_deref().and_then(time::parse_ymd).unwrap_or(today);
            let kind = ReportKind::parse(&kind);
            let format = ReportFormat::parse(&format);

            let result = async {
                let store = init_loan_store(database.as_deref()).await.map_err(|e| e.to_string())?;
                let state = AppState::new(store);
                state
                    .reports
                    .generate(kind, format, from, to)
                    .await
                    .map_err(|e| e.to_string())
            }
            .await;

            match result {
                Ok(report) => {
                    let path = output.unwrap_or_else(|| PathBuf::from(&report.filename));
                    match fs::write(&path, &report.bytes) {
                        Ok(()) => println!("✔ Wrote {}.", path.display()),
                        Err(e) => {
                            eprintln!("❌ Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("❌ Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
