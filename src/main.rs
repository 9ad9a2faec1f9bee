use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use consult_payments::config::AppConfig;
use consult_payments::domain::payment::PaymentSettings;
use consult_payments::gateways::fixture::FixtureGateway;
use consult_payments::gateways::myfatoorah::MyFatoorahGateway;
use consult_payments::gateways::{AmountLimits, PaymentGateway};
use consult_payments::repo::pg::PgLedgerStore;
use consult_payments::service::ledger_service::LedgerService;
use consult_payments::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let limits = AmountLimits { min: cfg.min_amount, max: cfg.max_amount };
    let gateway: Arc<dyn PaymentGateway> = if cfg.gateway_mode == "live" {
        Arc::new(MyFatoorahGateway {
            base_url: cfg.gateway_base_url.clone(),
            api_key: cfg.gateway_api_key.clone(),
            success_url: cfg.success_url.clone(),
            error_url: cfg.error_url.clone(),
            limits,
            timeout_ms: cfg.gateway_timeout_ms,
            client: reqwest::Client::new(),
        })
    } else {
        tracing::warn!("gateway running in fixture mode; no live credentials in use");
        Arc::new(FixtureGateway::new(limits))
    };

    let store = Arc::new(PgLedgerStore { pool });
    let ledger_service = LedgerService {
        store,
        gateway,
        currency: cfg.currency.clone(),
    };

    let state = AppState {
        ledger_service,
        settings: PaymentSettings {
            currency: cfg.currency.clone(),
            min_amount: cfg.min_amount,
            max_amount: cfg.max_amount,
            gateway: if cfg.gateway_mode == "live" { "myfatoorah" } else { "fixture" }.to_string(),
        },
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/api/payments/refund",
            post(consult_payments::http::handlers::payments::request_refund),
        )
        .layer(from_fn_with_state(
            admin_key,
            consult_payments::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/api/health", get(consult_payments::http::handlers::payments::health))
        .route(
            "/api/payments",
            post(consult_payments::http::handlers::payments::create_attempt),
        )
        .route(
            "/api/payments/verify",
            post(consult_payments::http::handlers::payments::verify_payment),
        )
        .route(
            "/api/payments/webhook",
            post(consult_payments::http::handlers::payments::gateway_webhook),
        )
        .route(
            "/api/payments/booking/:booking_id",
            get(consult_payments::http::handlers::payments::booking_history),
        )
        .route(
            "/api/payments/settings",
            get(consult_payments::http::handlers::payments::payment_settings),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
