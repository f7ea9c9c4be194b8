use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the admin account created on first start.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

/// Outbound AI workflow service. Absent when `AI_BASE_URL` is unset.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub user: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin: Option<AdminSeed>,
    pub ai: Option<AiConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://todo.db?mode=rwc".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "todolist".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "todolist-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let admin = std::env::var("ADMIN_PASSWORD").ok().map(|password| AdminSeed {
            username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            password,
        });
        let ai = std::env::var("AI_BASE_URL").ok().map(|base_url| AiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var("AI_API_KEY").unwrap_or_default(),
            user: std::env::var("AI_USER").unwrap_or_else(|_| "todolist".into()),
        });
        Ok(Self {
            database_url,
            jwt,
            admin,
            ai,
        })
    }
}
