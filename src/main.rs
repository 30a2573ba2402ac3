use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use shopcore_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Database
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Redis client; connectivity is only checked by the health endpoint.
    let redis_client = Arc::new(redis::Client::open(cfg.redis_url.clone())?);
    let cache = api::cache::CacheClient::new(
        redis_client.clone(),
        cfg.cache_namespace.clone(),
        Duration::from_secs(cfg.cache_ttl_secs),
    );

    // In-process event channel
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // External providers
    let carrier: Arc<dyn api::carriers::CarrierClient> = Arc::new(
        api::carriers::HttpCarrierClient::new(&cfg.carrier_api_url, cfg.carrier_api_key.clone())?,
    );
    let mailer: Option<Arc<dyn api::notifications::EmailClient>> = match &cfg.email_api_key {
        Some(key) => Some(Arc::new(api::notifications::HttpEmailClient::new(
            &cfg.email_api_url,
            Some(key.clone()),
            cfg.email_from.clone(),
        )?)),
        None => {
            info!("no email API key configured; transactional mail disabled");
            None
        }
    };
    let image_host: Option<Arc<dyn api::images::ImageHostClient>> = match &cfg.image_api_key {
        Some(key) => Some(Arc::new(api::images::HttpImageHostClient::new(
            &cfg.image_api_url,
            Some(key.clone()),
        )?)),
        None => None,
    };

    // Session verification against the identity provider's shared secret
    let verifier = Arc::new(api::auth::SessionVerifier::new(
        &cfg.session_secret,
        &cfg.session_issuer,
        &cfg.session_audience,
    ));

    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        Arc::new(event_sender.clone()),
        carrier,
        mailer,
        image_host,
        cfg.email_from.clone(),
    );

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
        cache,
        redis: redis_client,
    };

    // CORS from config, permissive only in development or when overridden.
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!("using permissive CORS (no explicit origins configured)");
        CorsLayer::permissive()
    } else {
        error!("missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err(
            "missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .into(),
        );
    };

    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "shopcore-api up" }))
        .nest("/api/v1", api::api_v1_routes())
        .merge(api::openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.request_timeout_secs,
        )))
        .layer(cors_layer)
        // Inject the session verifier for the auth middleware
        .layer(axum::middleware::from_fn_with_state(
            verifier.clone(),
            |axum::extract::State(verifier): axum::extract::State<
                Arc<api::auth::SessionVerifier>,
            >,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(verifier);
                next.run(req).await
            },
        ))
        // Every request carries an id for traceability
        .layer(axum::middleware::from_fn(
            api::request_id::request_id_middleware,
        ))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("shopcore-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
