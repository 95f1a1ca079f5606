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

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::{db::DBClient, userdb::UserExt};
use crate::models::usermodel::UserRole;
use crate::service::{
    job_service::JobService,
    storage::{ObjectStorage, SupabaseStorage},
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub job_service: Arc<JobService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let storage: Arc<dyn ObjectStorage> = Arc::new(SupabaseStorage::new(
            config.supabase_url.clone(),
            config.storage_bucket.clone(),
            config.supabase_service_key.clone(),
        ));

        let job_service = Arc::new(JobService::new(
            db_client_arc.clone(),
            storage,
            config.signed_url_ttl,
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            job_service,
        }
    }
}

/// Creates the admin account from ADMIN_EMAIL/ADMIN_PASSWORD on first
/// start. A no-op when the account exists or the variables are unset.
async fn bootstrap_admin(db_client: &DBClient, config: &Config) {
    let (email, raw_password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => (email.clone(), password.clone()),
        _ => return,
    };

    match db_client.get_user(None, Some(&email)).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let hashed = match utils::password::hash(raw_password) {
                Ok(hashed) => hashed,
                Err(err) => {
                    tracing::error!("failed to hash admin password: {}", err);
                    return;
                }
            };
            match db_client
                .save_user("Admin".to_string(), email, hashed, UserRole::Admin, None)
                .await
            {
                Ok(user) => tracing::info!("provisioned admin account {}", user.email),
                Err(err) => tracing::error!("failed to provision admin account: {}", err),
            }
        }
        Err(err) => tracing::error!("failed to look up admin account: {}", err),
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
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!().run(&pool).await {
        println!("🔥 Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let db_client = DBClient::new(pool);
    bootstrap_admin(&db_client, &config).await;

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state).layer(cors);

    println!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
