use anyhow::Context;
use env_logger::Env;
use marketdigest::config::AppConfig;
use marketdigest::pipeline;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse the specified (or default) .env file
    let dotenv_path = env::var("MARKETDIGEST_DOTENV_PATH").unwrap_or_else(|_| ".env".to_string());
    let dotenv_result = dotenvy::from_path(&dotenv_path);

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(()) => log::info!("Loaded env from {}", dotenv_path),
        Err(err) => log::debug!("No .env loaded from {}: {}", dotenv_path, err),
    }

    let config = AppConfig::from_env().context("Reading configuration")?;
    let today = chrono::Utc::now().date_naive();
    let digest = pipeline::run(&config, today)
        .await
        .with_context(|| format!("Weekly digest for {}", today))?;

    println!("{}", digest.path.display());
    Ok(())
}
