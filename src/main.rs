// src/main.rs

use std::{sync::Arc, time::Duration};

use dotenvy::dotenv;
use feedfor::{
    config::Config,
    llm::{OpenAiClient, RetryPolicy},
    mailer::LogMailer,
    routes,
    state::AppState,
    store::PgStore,
    utils::jwt::sign_jwt,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    // `feedfor issue-token <subject> <role>` prints an API token and exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("issue-token") {
        issue_token(&config, &args[1..]);
        return;
    }

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let llm = OpenAiClient::new(
        config.openai_base_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .expect("Failed to build the LLM HTTP client");

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        llm: Arc::new(llm),
        mailer: Arc::new(LogMailer::new(config.mail_from.clone())),
        retry: RetryPolicy {
            max_attempts: config.llm_max_attempts,
            base_delay: Duration::from_millis(config.llm_backoff_ms),
        },
        config: config.clone(),
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server error");
}

fn issue_token(config: &Config, args: &[String]) {
    let (Some(subject), role) = (args.first(), args.get(1).map(String::as_str)) else {
        eprintln!("usage: feedfor issue-token <subject> [client|admin]");
        std::process::exit(2);
    };
    let role = role.unwrap_or("client");

    match sign_jwt(subject, role, &config.jwt_secret, config.jwt_expiration) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("Failed to sign token: {}", e);
            std::process::exit(1);
        }
    }
}
