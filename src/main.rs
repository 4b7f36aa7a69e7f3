use std::sync::Arc;

use unicore::{app, config::AppConfig, db, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database_url).await?;

    if let Err(e) = db::migrate(&pool).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
    if config.jwt.secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; authenticated routes will fail");
    }

    let state = AppState::new(pool, config.clone());
    app::serve(app::build_app(state), &config).await
}
