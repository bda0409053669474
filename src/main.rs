use std::sync::Arc;
use std::time::Duration;

use campaign_studio::{config::AppConfig, handlers, AppState};

const SESSION_IDLE_MINUTES: i64 = 30;
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = AppConfig::from_env().expect("Invalid configuration");

    if config.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY not found. Gemini-backed endpoints will answer with an error.");
    }
    if config.grok_api_key.is_none() {
        tracing::warn!("GROK_API_KEY not found. Creative ideas will use the static fallback.");
    }

    let state = Arc::new(AppState::from_config(config).expect("Failed to build API clients"));
    tracing::info!(
        "Configuration - Gemini: {}, Grok: {}, agent model: {}, video model: {}",
        if state.agents.is_some() { "✅" } else { "❌" },
        if state.grok_configured { "✅" } else { "❌" },
        state.config.agent_model,
        state.config.video_model
    );

    // Requests delete their own sessions; this catches the ones a dropped connection left behind
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweep_state
                .sessions
                .cleanup_idle_sessions(chrono::Duration::minutes(SESSION_IDLE_MINUTES))
                .await;
            if removed > 0 {
                tracing::debug!("Removed {} idle sessions", removed);
            }
        }
    });

    let bind_addr = state.config.bind_addr();
    let app = handlers::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", bind_addr, e));
    tracing::info!("listening on {}", listener.local_addr().expect("listener address"));
    axum::serve(listener, app).await.expect("Server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,campaign_studio=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,campaign_studio=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("Campaign studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
