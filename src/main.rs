// src/main.rs

use brevet_backend::config::Config;
use brevet_backend::routes;
use brevet_backend::state::AppState;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONNECT_RETRIES: u32 = 5;

/// Logs to stdout and to a daily file under `logs/`.
/// The returned guard must live as long as the process to flush the file writer.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "quiz-engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}

/// Retries while Postgres is still starting.
async fn connect_with_retry(config: &Config) -> PgPool {
    let mut attempt = 0;
    loop {
        let connected = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await;

        match connected {
            Ok(pool) => return pool,
            Err(e) if attempt < CONNECT_RETRIES => {
                attempt += 1;
                tracing::warn!("Database not ready ({}), retry {}/{} in 2s", e, attempt, CONNECT_RETRIES);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => panic!("Failed to connect to database after {} retries: {}", CONNECT_RETRIES, e),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let pool = connect_with_retry(&config).await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database connected, migrations applied");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let app = routes::create_router(AppState::postgres(pool, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Quiz engine listening on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
