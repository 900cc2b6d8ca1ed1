use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use authkeeper::config::CorsConfig;
use authkeeper::{not_found, routes, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PATCH"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Missing secret or database URL stops the process here
    let config = Settings::new().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    info!("Configuration loaded successfully ({} environment)", config.environment);

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialize application state")?;
    let state = web::Data::new(state);

    // Expired rate-limit windows
    let purge_state = state.clone();
    let purge_interval = Duration::from_secs(config.rate_limit.purge_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        loop {
            interval.tick().await;
            match purge_state.rate_limiter.cleanup().await {
                Ok(0) => {}
                Ok(removed) => info!("Purged {} expired rate-limit windows", removed),
                Err(e) => error!("Failed to purge rate-limit windows: {}", e),
            }
        }
    });

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let server_state = state.clone();
    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_config))
            .app_data(server_state.clone())
            .configure(routes)
            .default_service(web::to(not_found))
    })
    .listen(listener)?
    .workers(config.server.workers.max(1) as usize)
    .run()
    .await
    .context("server terminated with an error")?;

    state.shutdown().await?;
    info!("Server stopped");
    Ok(())
}
