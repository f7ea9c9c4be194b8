use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::ai::client::{HttpWorkflowClient, WorkflowClient};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub ai: Option<Arc<dyn WorkflowClient>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .context("parse DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true);
        let db = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("connect to database")?;

        let ai = match &config.ai {
            Some(cfg) => {
                let client = HttpWorkflowClient::new(cfg).context("build AI workflow client")?;
                Some(Arc::new(client) as Arc<dyn WorkflowClient>)
            }
            None => None,
        };

        Ok(Self { db, config, ai })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    /// Migrated in-memory database, test JWT settings and an echoing AI client.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use async_trait::async_trait;

        struct FakeWorkflow;
        #[async_trait]
        impl WorkflowClient for FakeWorkflow {
            async fn run(&self, input: &str) -> anyhow::Result<serde_json::Value> {
                Ok(serde_json::json!({ "status": "succeeded", "data": { "echo": input } }))
            }
        }

        // a single long-lived connection keeps the in-memory database alive
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            admin: None,
            ai: None,
        });

        let state = Self {
            db,
            config,
            ai: Some(Arc::new(FakeWorkflow) as Arc<dyn WorkflowClient>),
        };
        state.migrate().await.expect("migrations apply");
        state
    }
}
