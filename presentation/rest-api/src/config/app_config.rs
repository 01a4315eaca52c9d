use super::{
    catalog_config::CatalogConfig, cors_config, firebase_config::FirebaseConfig,
    server_config::ServerConfig,
};
use poem::middleware::Cors;

pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: Cors,
    pub firebase: FirebaseConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            cors: cors_config::init_cors(),
            firebase: FirebaseConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
        })
    }
}
