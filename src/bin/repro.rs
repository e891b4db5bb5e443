use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use binuuid::db::{self, provision};
use binuuid::{codec, models, repro};

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Parser, Debug)]
#[command(author, version, about = "binary identifier round-trip reproduction", long_about = None)]
struct Cli {
    /// Overrides DATABASE_URL; an in-memory database is used when neither is set
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store the fixed rows and compare the flat and relational fetches
    Run,
    /// Drop and recreate the parent and child tables
    Provision,
    /// Render 32 hex digits of wire bytes as a canonical identifier
    Decode { hex: String },
    /// Print the wire bytes of a canonical identifier as hex
    Encode { canonical: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }
    init_tracing();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let pool = db::connect(&database_url, 1).await?;
            let schema = models::schema()?;
            let report = repro::run(&pool, &schema).await.context("reproduction failed")?;
            print!("{}", report.render()?);
            pool.close().await;

            if !report.is_consistent() {
                anyhow::bail!("flat and relational fetches disagree");
            }
        }
        Commands::Provision => {
            let pool = db::connect(&database_url, 1).await?;
            let schema = models::schema()?;
            provision::create_tables(&pool, &schema, provision::Mode::Recreate).await?;
            println!("Tables recreated");
        }
        Commands::Decode { hex } => {
            let wire = hex::decode(hex.trim()).with_context(|| format!("not a hex string: {}", hex))?;
            println!("{}", codec::decode(&wire)?);
        }
        Commands::Encode { canonical } => {
            println!("{}", hex::encode(codec::encode(&canonical)?));
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
