use dadpars::config::Config;
use dadpars::repo;
use dadpars::seed::{destination, seed, SampleData};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::from_env()?;
    let target = destination(&cfg)?;
    let repo = repo::from_config(&cfg).await?;
    let report = seed(repo.as_ref(), SampleData::bundled()?).await?;
    info!(created = report.created, skipped = report.skipped, target = %target, "sample data seeded");
    Ok(())
}
