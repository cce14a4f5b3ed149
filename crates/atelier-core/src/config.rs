//! Configuration module
//!
//! All runtime configuration is read from the environment; defaults exist for
//! everything except the database URL and, for the S3 backend, the bucket.

use std::env;
use std::str::FromStr;

use uuid::Uuid;

use crate::constants;
use crate::storage_types::StorageBackend;

const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: bool,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub upload_prefix: String,
    // Media processing configuration
    pub max_upload_bytes: usize,
    pub large_image_max_mp: u32,
    pub allowed_content_types: Vec<String>,
    // Presigned direct uploads
    pub presign_ttl_secs: u64,
    // Reclamation sweep
    pub reconcile_stale_hours: i64,
    pub reconcile_interval_secs: u64,
    // Caller identity (static token provider)
    pub api_token: Option<String>,
    pub api_user_email: String,
    pub api_user_id: Uuid,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| StorageBackend::from_str(&s))
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .or(max_upload_mb.map(|mb| mb * 1024 * 1024))
            .unwrap_or(constants::DEFAULT_MAX_UPLOAD_BYTES);

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| {
                "image/jpeg,image/jpg,image/png,image/gif,image/webp,image/bmp".to_string()
            })
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let upload_prefix = env::var("UPLOAD_PREFIX")
            .unwrap_or_else(|_| constants::DEFAULT_UPLOAD_PREFIX.to_string());
        if upload_prefix.is_empty() || !upload_prefix.ends_with('/') {
            return Err(anyhow::anyhow!(
                "UPLOAD_PREFIX must be non-empty and end with '/'"
            ));
        }

        let api_user_id = match env::var("API_USER_ID") {
            Ok(raw) => Uuid::parse_str(&raw)
                .map_err(|_| anyhow::anyhow!("API_USER_ID must be a valid UUID"))?,
            Err(_) => constants::DEFAULT_ADMIN_ID,
        };

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT_URL").ok(),
            s3_force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            upload_prefix,
            max_upload_bytes,
            large_image_max_mp: env::var("LARGE_IMAGE_MAX_MP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::DEFAULT_LARGE_MAX_MP),
            allowed_content_types,
            presign_ttl_secs: env::var("PRESIGN_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::DEFAULT_PRESIGN_TTL_SECS),
            reconcile_stale_hours: env::var("RECONCILE_STALE_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(constants::DEFAULT_RECONCILE_STALE_HOURS),
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            api_token: env::var("API_TOKEN").ok(),
            api_user_email: env::var("API_USER_EMAIL")
                .unwrap_or_else(|_| "admin@localhost".to_string()),
            api_user_id,
        })
    }

    /// Maximum request size tolerated by the Content-Length pre-check,
    /// allowing overhead for multipart framing.
    pub fn max_request_bytes(&self) -> usize {
        (self.max_upload_bytes as f64 * constants::CONTENT_LENGTH_OVERHEAD) as usize
    }

    /// Whether a content type is in the supported image set.
    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        let normalized = content_type.to_lowercase();
        self.allowed_content_types.iter().any(|ct| ct == &normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgres://localhost/atelier".to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECS,
            storage_backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_force_path_style: false,
            local_storage_path: None,
            local_storage_base_url: None,
            upload_prefix: "uploads/".to_string(),
            max_upload_bytes: 100 * 1024 * 1024,
            large_image_max_mp: 25,
            allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            presign_ttl_secs: 600,
            reconcile_stale_hours: 24,
            reconcile_interval_secs: 0,
            api_token: None,
            api_user_email: "admin@localhost".to_string(),
            api_user_id: constants::DEFAULT_ADMIN_ID,
        }
    }

    #[test]
    fn test_max_request_bytes_allows_multipart_overhead() {
        let config = base_config();
        assert_eq!(config.max_request_bytes(), 110 * 1024 * 1024);
    }

    #[test]
    fn test_allowed_content_type_is_case_insensitive() {
        let config = base_config();
        assert!(config.is_allowed_content_type("IMAGE/JPEG"));
        assert!(!config.is_allowed_content_type("video/mp4"));
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
