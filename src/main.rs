use actix_web::{web, App, HttpResponse, HttpServer};
use actix_cors::Cors;
use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use board::config::AppConfig;
use board::openapi::ApiDoc;
use board::retry::RetryExecutor;
use board::routes::{config, AppState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

async fn render_metrics(handle: web::Data<PrometheusHandle>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env();
    info!("Bootstrapping board server");
    info!(
        max_attempts = cfg.retry.max_attempts,
        backoff_ms = cfg.retry.backoff.as_millis() as u64,
        "optimistic-lock retry policy"
    );
    info!("Frontend URL: {}", cfg.frontend_url.as_deref().unwrap_or("(none)"));

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing prometheus recorder")?;

    // Flipped on ctrl-c so in-flight retries stop waiting out their backoff.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    actix_web::rt::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested; interrupting pending retries");
            let _ = shutdown_tx.send(true);
        }
    });
    let retry = RetryExecutor::new(cfg.retry).with_shutdown(shutdown_rx);

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let state = {
        info!("Using in-memory repository backend");
        AppState::new(Arc::new(board::repo::inmem::InMemRepo::new()), retry)
    };

    #[cfg(feature = "postgres-store")]
    let state = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = cfg
            .database_url
            .clone()
            .context("DATABASE_URL must be set for postgres-store")?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&db_url)
            .context("creating Pg pool")?;
        let repo = board::repo::pg::PgRepo::new(pool);
        repo.migrate().await.context("running migrations")?;
        info!("Using Postgres repository backend");
        AppState::new(Arc::new(repo), retry)
    };

    let openapi = ApiDoc::openapi();
    let frontend_url = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .max_age(3600);
            if let Some(front) = frontend_url.as_deref() {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(prometheus.clone()))
            .configure(config)
            .route("/metrics", web::get().to(render_metrics))
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))
    .with_context(|| format!("binding {}:{}", cfg.bind_addr, cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await?;
    Ok(())
}
