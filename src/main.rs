use std::{process, sync::Arc, time::Duration};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{catalog::CatalogService, error::AppError},
    cache::{
        CacheConfig, ObjectStore, PageCacheState, PageStore, WebhookNotifier, WriteInvalidator,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, AppState, CatalogState, RevalidateState},
        telemetry,
        upstream::CatalogClient,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let settings = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let state = build_application(&settings)?;
    let router = http::build_router(state);

    serve_http(&settings, router).await
}

fn build_application(settings: &config::Settings) -> Result<AppState, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);

    let store = Arc::new(ObjectStore::new(cache_config.clone()));
    let pages = Arc::new(PageStore::new());

    let upstream = CatalogClient::new(
        settings.upstream.base_url.clone(),
        settings.upstream.timeout,
    )
    .map_err(|err| AppError::unexpected(format!("failed to build upstream client: {err}")))?;

    let notifier = Arc::new(
        WebhookNotifier::new(
            settings.webhook.endpoint.clone(),
            settings.webhook.secret.clone(),
        )
        .map_err(|err| AppError::unexpected(format!("failed to build webhook client: {err}")))?,
    );

    let invalidator = WriteInvalidator::new(cache_config.clone(), store.clone());
    let catalog = Arc::new(CatalogService::new(
        upstream,
        store,
        invalidator,
        notifier,
    ));

    // The page store always exists so revalidation stays well-defined; the
    // middleware layer is only mounted when the page cache is on.
    let page_cache = cache_config.page_cache_enabled.then(|| PageCacheState {
        config: cache_config.clone(),
        pages: pages.clone(),
    });

    Ok(AppState {
        catalog: CatalogState { catalog },
        revalidate: RevalidateState {
            secret: settings.revalidate.secret.clone(),
            pages,
        },
        page_cache,
    })
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vetrina::server",
        addr = %settings.server.addr,
        upstream = %settings.upstream.base_url,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(drain: Duration) {
    let _ = tokio::signal::ctrl_c().await;
    info!(
        target = "vetrina::server",
        drain_seconds = drain.as_secs(),
        "Shutdown signal received, draining connections"
    );

    // In-flight connections get the configured window, then the process goes
    // down regardless.
    tokio::spawn(async move {
        tokio::time::sleep(drain).await;
        warn!(
            target = "vetrina::server",
            "Drain window elapsed with connections still open, exiting"
        );
        process::exit(0);
    });
}
