use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub allowed_origin: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub mail_relay_url: String,
    pub mail_relay_token: String,
    pub mail_from: String,
    pub upload_dir: String,
    pub upload_base_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("allowed_origin", "*")?
            .set_default("data_backend", "memory")?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "skillswap")?
            .set_default("surreal_db", "platform")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("jwt_secret", "")?
            .set_default("jwt_ttl_days", 7)?
            .set_default("mail_relay_url", "")?
            .set_default("mail_relay_token", "")?
            .set_default("mail_from", "no-reply@skillswap.local")?
            .set_default("upload_dir", "uploads")?
            .set_default("upload_base_url", "/uploads")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
