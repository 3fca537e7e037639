use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use adapter::database::connect_database_with;
use anyhow::{Context, Result};
use api::route::v1;
use axum::Router;
use chrono::Local;
use registry::AppRegistry;
use shared::config::AppConfig;
use shared::env::{which, Environment};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let pool = connect_database_with(&app_config.database);
    let registry = AppRegistry::new(pool, app_config);

    // 終了時刻を過ぎた承認済み予約を COMPLETED へ倒すスイープを
    // 別タスクとして回す。COMPLETED は読み取り時の導出ではなく永続化する。
    tokio::spawn(completion_sweep(registry.clone()));

    let app = Router::new().merge(v1::routes()).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    );

    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 8080);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    let app = app.with_state(registry);
    axum::serve(listener, app)
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(
                error.cause_chain = ?e, error.message = %e, "Unexpected error"
            )
        })
}

// 完了スイープ。1 分間隔でポーリングし、確定した遷移ごとに通知を飛ばす
async fn completion_sweep(registry: AppRegistry) {
    loop {
        let now = Local::now().naive_local();
        match registry
            .booking_repository()
            .complete_elapsed(now.date(), now.time())
            .await
        {
            Ok(transitions) => {
                for transition in &transitions {
                    registry
                        .notification_dispatcher()
                        .notify(
                            transition.borrower_id,
                            &transition.event_type(),
                            serde_json::json!({
                                "bookingId": transition.booking_id,
                                "from": transition.from,
                                "to": transition.to,
                            }),
                        )
                        .await;
                }
                if !transitions.is_empty() {
                    tracing::info!(count = transitions.len(), "bookings marked as completed");
                }
            }
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "completion sweep failed");
            }
        }

        sleep(Duration::from_secs(60)).await;
    }
}
