#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde;
#[macro_use]
extern crate lazy_static;

use std::sync::Arc;

use chrono::Duration;
use error::BackendError;
use rocket::http::Method;
use rocket::Rocket;
use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::data::collection::secret::PasswordStorage;
use crate::data::collection::service::CollectionService;
use crate::data::store::{CollectionStore, MongoStore};
use crate::error::ConfigurationError;
use crate::route::mount_api;

pub mod config;
pub mod data;
pub mod error;
pub mod resp;
pub mod route;
pub mod util;

fn init_logging(level: Level) {
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("Unable to forward log records: {}", err);
    }

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global logger: {}", err);
    };
}

fn load_config() -> Result<Config, ConfigurationError> {
    match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            Ok(c)
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            Ok(c)
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            Err(other)
        }
    }
}

fn cors() -> Cors {
    let allowed_origins = AllowedOrigins::All;

    rocket_cors::CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: false,
        ..Default::default()
    }
    .to_cors()
    .expect("static CORS options are valid")
}

/// Builds the application around an already connected store.
pub fn build(c: &Config, store: Arc<dyn CollectionStore>) -> Rocket<rocket::Build> {
    let service = CollectionService::new(store)
        .with_password_storage(PasswordStorage::from_config(c.hash_passwords))
        .with_recent_limit(c.recent_limit)
        .with_active_window(Duration::hours(c.active_window_hours));

    let figment = rocket::Config::figment()
        .merge(("address", c.address))
        .merge(("port", c.port));

    let r = rocket::custom(figment)
        .manage(service)
        .attach(cors());

    mount_api(r)
}

pub async fn create(log_level: Option<Level>) -> Result<Rocket<rocket::Build>, BackendError> {
    if let Some(l) = log_level {
        init_logging(l);
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = load_config()?;

    tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
    let store = match MongoStore::connect(&c.mongodb_uri, &c.mongodb_db).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Unable to connect to MongoDB: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting HTTP server...");
    Ok(build(&c, Arc::new(store)))
}
