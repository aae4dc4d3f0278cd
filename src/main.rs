use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use cache::{CacheStore, RedisStore};
use services::Scheduler;
use utils::config::Config;

mod cache;
mod errors;
mod models;
mod routes;
mod server;
mod services;
mod utils;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let redis_store = RedisStore::connect(&config.redis_url)
        .await
        .expect("Failed to connect to Redis");
    let cache = Arc::new(CacheStore::new(Arc::new(redis_store)));

    let scheduler = Arc::new(RwLock::new(Scheduler::new(cache.clone())));

    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.read().await.start().await;
        });
    }

    tracing::info!("Starting server on http://0.0.0.0:{}", config.port);
    server::run(config, cache, scheduler).await.unwrap();
}
