use anyhow::Context;
use axum::Router;
use datagrid_core::{GridContext, GridRegistry, LinkContext};
use datagrid_server::cache::{build_cache, start_pruner};
use datagrid_server::config::AppConfig;
use datagrid_server::demo;
use datagrid_server::metrics;
use datagrid_server::routes;
use datagrid_server::state::AppState;
use datagrid_server::telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_tracing(&cfg.log_filter)?;

    let setup = build_cache(&cfg).await;
    let _pruner = setup
        .filesystem
        .clone()
        .map(|store| start_pruner(store, cfg.cache_prune_interval_secs, cfg.cache_ttl));

    let mut registry = GridRegistry::new();
    demo::register(&mut registry).context("register demo grids")?;

    let links = demo::link_routes(LinkContext::new(cfg.base_url.clone()));
    let grid_context = GridContext::new(setup.cache.clone(), links, cfg.route_prefix.clone());
    let app_state = AppState::new(registry, grid_context);
    let app: Router = routes::router(app_state.clone());

    info!(
        addr = %cfg.bind_addr,
        prefix = %cfg.route_prefix,
        cache_backend = setup.cache.backend(),
        cache_policy = ?cfg.cache_policy,
        cache_ttl_secs = cfg.cache_ttl.as_secs(),
        cache_dir = %cfg.cache_dir.display(),
        redis = %cfg.redis_url.as_deref().unwrap_or("unset"),
        grids = ?app_state.registry().ids().collect::<Vec<_>>(),
        "starting datagrid-server"
    );
    metrics::BOOT_COUNTER.inc();

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
