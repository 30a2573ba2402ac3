//! One-off migration runner for deploy pipelines:
//! `migrate --database-url postgres://... [--fresh]`

use clap::Parser;
use sea_orm_migration::MigratorTrait;
use shopcore_api::{db, migrator::Migrator};

#[derive(Parser, Debug)]
#[command(name = "migrate", about = "Apply shopcore-api database migrations")]
struct Args {
    /// Database connection URL; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Drop everything and re-apply from scratch
    #[arg(long, default_value_t = false)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("pass --database-url or set DATABASE_URL"))?;

    let pool = db::establish_connection(&url).await?;

    if args.fresh {
        tracing::warn!("running fresh migration: all tables will be dropped");
        Migrator::fresh(&pool).await?;
    } else {
        Migrator::up(&pool, None).await?;
    }

    tracing::info!("migrations applied");
    Ok(())
}
