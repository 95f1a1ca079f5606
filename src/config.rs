// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // Supabase storage configuration
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage_bucket: String,
    pub signed_url_ttl: u64,
    // First admin account, provisioned at startup when set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let supabase_url = std::env::var("SUPABASE_URL").expect("SUPABASE_URL must be set");
        let supabase_service_key =
            std::env::var("SUPABASE_SERVICE_KEY").expect("SUPABASE_SERVICE_KEY must be set");
        let storage_bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "job-files".to_string());
        let signed_url_ttl = std::env::var("SIGNED_URL_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .expect("SIGNED_URL_TTL must be a number of seconds");

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid port number");

        let admin_email = std::env::var("ADMIN_EMAIL").ok();
        let admin_password = std::env::var("ADMIN_PASSWORD").ok();

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            supabase_url,
            supabase_service_key,
            storage_bucket,
            signed_url_ttl,
            admin_email,
            admin_password,
            allowed_origins,
        }
    }
}
