mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::LevelFilter;

use crate::{
    db::{
        db::DBClient, managementdb::PropertyManagement, propertydb::PropertyCatalog,
        subscriptiondb::SubscriptionLedger, unlockdb::UnlockLedger,
    },
    service::{
        access_gate::AccessGate,
        management_service::{ManagementService, SubscriptionPricing},
        payment_provider::{PaymentGateway, StripeGateway},
        unlock_service::{UnlockPricing, UnlockService},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub catalog: Arc<dyn PropertyCatalog>,
    // Services
    pub access_gate: AccessGate,
    pub unlock_service: Arc<UnlockService>,
    pub management_service: Arc<ManagementService>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn PropertyCatalog>,
        ledger: Arc<dyn UnlockLedger>,
        management: Arc<dyn PropertyManagement>,
        subscriptions: Arc<dyn SubscriptionLedger>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let access_gate = AccessGate::new(ledger.clone());
        let unlock_service = Arc::new(UnlockService::new(
            catalog.clone(),
            ledger,
            gateway.clone(),
            UnlockPricing::from_config(&config),
        ));
        let management_service = Arc::new(ManagementService::new(
            catalog.clone(),
            management,
            subscriptions,
            gateway,
            SubscriptionPricing::from_config(&config),
        ));

        Self {
            env: config,
            catalog,
            access_gate,
            unlock_service,
            management_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = Arc::new(DBClient::new(pool));
    if let Err(err) = db_client.migrate().await {
        tracing::error!("Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let gateway = Arc::new(StripeGateway::new(&config));
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_client.clone(),
        db_client.clone(),
        db_client.clone(),
        db_client,
        gateway,
    ));

    let app = create_router(app_state);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
