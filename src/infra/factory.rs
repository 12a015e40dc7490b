use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{BookingRepository, BusinessRepository, CalendarRegistry};
use crate::domain::services::assistant::Assistant;
use crate::domain::services::booking_lifecycle::BookingManager;
use crate::domain::services::intent::RuleBasedIntentRouter;
use crate::infra::calendar::registry::HttpCalendarRegistry;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_business_repo::PostgresBusinessRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_business_repo::SqliteBusinessRepo,
};

/// Wires the core services on top of the given repositories and calendar registry.
pub fn build_state(
    config: &Config,
    business_repo: Arc<dyn BusinessRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    calendars: Arc<dyn CalendarRegistry>,
) -> AppState {
    let retry = config.retry_policy();
    let bookings = Arc::new(BookingManager::new(booking_repo.clone(), calendars.clone(), config.booking_policy()));
    let assistant = Arc::new(Assistant::new(
        business_repo.clone(),
        Arc::new(RuleBasedIntentRouter::new()),
        bookings.clone(),
        retry,
    ));

    AppState {
        config: config.clone(),
        business_repo,
        booking_repo,
        calendars,
        bookings,
        assistant,
        retry,
    }
}

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let calendars: Arc<dyn CalendarRegistry> = Arc::new(HttpCalendarRegistry::new(
        config.calendar_service_url.clone(),
        config.calendar_service_token.clone(),
        Duration::from_millis(config.provider_timeout_ms),
    ));

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        build_state(
            config,
            Arc::new(PostgresBusinessRepo::new(pool.clone())),
            Arc::new(PostgresBookingRepo::new(pool)),
            calendars,
        )
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        build_state(
            config,
            Arc::new(SqliteBusinessRepo::new(pool.clone())),
            Arc::new(SqliteBookingRepo::new(pool)),
            calendars,
        )
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
