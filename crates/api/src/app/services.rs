//! Service wiring: the store, repositories and collaborators every handler
//! reaches through `Extension<Arc<AppServices>>`.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use url::Url;

use tourbook_auth::{Hs256Jwt, PasswordHasher};
use tourbook_infra::{
    BookingRepository, DocumentStore, InMemoryDocumentStore, LogMailer, Mailer,
    OfflinePaymentGateway, PaymentGateway, PostgresDocumentStore, ReviewRepository,
    TourRepository, UserRepository,
};

use crate::config::AppConfig;

const PG_MAX_CONNECTIONS: u32 = 10;
const OFFLINE_CHECKOUT_BASE: &str = "https://checkout.tourbook.local/";

pub struct AppServices {
    pub config: AppConfig,
    pub users: UserRepository,
    pub tours: TourRepository,
    pub reviews: ReviewRepository,
    pub bookings: BookingRepository,
    pub tokens: Hs256Jwt,
    pub passwords: PasswordHasher,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppServices {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            tours: TourRepository::new(store.clone()),
            reviews: ReviewRepository::new(store.clone()),
            bookings: BookingRepository::new(store),
            tokens: Hs256Jwt::new(config.jwt_secret.as_bytes(), config.jwt_expires_in),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            mailer,
            payments,
            config,
        }
    }
}

/// Build production services from configuration.
///
/// Uses Postgres when `DATABASE_URL` is set (applying the schema first), the
/// in-memory store otherwise.
pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pg = PostgresDocumentStore::connect(url, PG_MAX_CONNECTIONS)
                .await
                .context("connecting to Postgres")?;
            pg.migrate().await.context("applying document schema")?;
            info!("using Postgres document store");
            Arc::new(pg)
        }
        None => {
            info!("DATABASE_URL not set; using in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let mailer = Arc::new(
        LogMailer::new(config.mail_from.clone())
            .revealing_links(!config.environment.is_production()),
    );
    let payments = Arc::new(OfflinePaymentGateway::new(Url::parse(OFFLINE_CHECKOUT_BASE)?));

    Ok(AppServices::new(config, store, mailer, payments))
}
