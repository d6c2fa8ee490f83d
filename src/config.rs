use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Remote vision API credentials. Both values must be present for the
/// remote detector to be selected at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub vision: Option<VisionConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "facelens".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "facelens-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);

        // Remote detection is opt-in: without credentials every request is
        // served by the synthetic detector.
        let vision = match (
            std::env::var("VISION_API_URL"),
            std::env::var("VISION_API_KEY"),
        ) {
            (Ok(endpoint), Ok(api_key)) => Some(VisionConfig { endpoint, api_key }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt,
            upload_dir,
            max_upload_bytes,
            vision,
        })
    }
}
