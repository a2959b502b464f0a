use anyhow::Result;
use casetrack::server;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long, default_value = "3000")]
        port: u16,
        #[clap(short, long, default_value = "casetrack.db")]
        database: String,
        /// Directory for uploaded attachment blobs
        #[clap(long, default_value = "attachments")]
        blob_dir: String,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Cases {
        #[clap(subcommand)]
        command: CaseCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long, default_value = "casetrack.db")]
        database: String,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long, default_value = "casetrack.db")]
        database: String,
    },
}

#[derive(Subcommand, Debug)]
enum CaseCommands {
    /// Reassign case numbers 1..N per organization, ordered by creation time.
    /// Destructive to external references to the old numbers.
    ReassignNumbers {
        #[clap(short, long, default_value = "casetrack.db")]
        database: String,
        /// Restrict the backfill to a single organization
        #[clap(short, long)]
        organization: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Serve {
            port,
            database,
            blob_dir,
            cors_origin,
        } => {
            info!("Starting server on port {}", port);
            server::start_server(port, &database, &blob_dir, cors_origin.as_deref()).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                info!("Initializing database: {}", database);
                server::migrate_database(&database, server::MigrateDirection::Up).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
        },
        Commands::Cases { command } => match command {
            CaseCommands::ReassignNumbers {
                database,
                organization,
            } => {
                server::reassign_case_numbers(&database, organization).await?;
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
