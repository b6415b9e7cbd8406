use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use hackhub::{
    arguments::{config_path_override, patterns, print_debug_info, print_help},
    cache::MemoryCache,
    config::{self, CONFIG_FILE_PATH},
    database::SqliteStore,
    jobs::LocalJobRunner,
    logger::{self, LogTag},
    notifications::NotificationService,
    ratelimit::QuotaLimiter,
    realtime::EventHub,
    stars::{StarMutationHandler, StarService},
    webserver::{self, AppState},
};

/// How often expired cache entries and quota counters are swept
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "HackHub starting up...");
    print_debug_info();

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("HackHub failed: {:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::info(LogTag::System, "HackHub stopped");
    logger::flush();
}

async fn run() -> anyhow::Result<()> {
    let config_path = config_path_override().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&config_path).map_err(anyhow::Error::msg)?;
    let config = config::get_config_clone();
    logger::apply_settings(
        &config.logging.level,
        config.logging.file_enabled,
        &config.logging.file_path,
    );
    logger::info(LogTag::Config, &format!("Configuration loaded from {}", config_path));

    let store = Arc::new(
        SqliteStore::open(&config.database.path)
            .with_context(|| format!("Failed to open database at {}", config.database.path))?,
    );

    let hub = EventHub::create();
    let cache = Arc::new(MemoryCache::new(config.cache.capacity));
    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        store.clone(),
        hub.clone(),
    ));

    let handler = Arc::new(StarMutationHandler::new(
        store.clone(),
        Some(notifications.clone()),
    ));
    let (runner, worker) = LocalJobRunner::start(&config.jobs, handler);

    let limiter = Arc::new(QuotaLimiter::new(config.rate_limits.clone()));
    let stars = Arc::new(StarService::new(
        store.clone(),
        cache.clone(),
        runner.clone(),
        limiter.clone(),
        config.stars.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.webserver.clone(),
        realtime: config.realtime.clone(),
        hub: hub.clone(),
        identity: store.clone(),
        stars,
        notifications,
        jobs: Some(runner.clone()),
        startup_time: chrono::Utc::now(),
    });

    ctrlc::set_handler(|| {
        logger::info(LogTag::System, "Interrupt received, shutting down...");
        webserver::shutdown();
    })
    .context("Failed to install Ctrl-C handler")?;

    let maintenance = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            ticker.tick().await;
            let entries = cache.purge_expired();
            let counters = limiter.purge_expired();
            if entries > 0 || counters > 0 {
                logger::debug(
                    LogTag::System,
                    &format!(
                        "Maintenance: purged {} cache entries, {} quota counters (cache hit rate {:.1}%)",
                        entries,
                        counters,
                        cache.metrics().hit_rate() * 100.0
                    ),
                );
            }
        }
    });

    let served = webserver::start_server(state).await;

    // Accepted mutations are applied before exit
    maintenance.abort();
    hub.shutdown();
    runner.shutdown();
    if let Err(e) = worker.await {
        logger::error(LogTag::Jobs, &format!("Job worker ended abnormally: {}", e));
    }

    served.map_err(anyhow::Error::msg)
}
