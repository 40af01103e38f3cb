use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use stripe::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod checkout;
mod config;
mod error;
mod middleware;
mod rate_limit;
mod routes;
mod signature;
mod webhook;

use config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub stripe_client: Arc<Client>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "donation_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());
    let stripe_client = Arc::new(Client::new(config.stripe_secret_key.clone()));

    let app_state = AppState {
        stripe_client,
        config: config.clone(),
    };

    let app = routes::app(app_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::debug!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    // connect-info so the rate limiter can key on the peer address when no
    // forwarding headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
