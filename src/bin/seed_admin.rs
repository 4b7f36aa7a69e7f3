//! Creates the initial admin account. Does nothing if the email is already taken.

use std::sync::Arc;

use unicore::{
    config::AppConfig,
    db,
    error::AppError,
    state::AppState,
    telemetry,
    users::{dto::CreateUserInput, model::Role},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@aiera.edu".into());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "ChangeMe123!".into());
    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "System Admin".into());

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await?;
    let state = AppState::new(pool.clone(), config);

    let input = CreateUserInput {
        password: Some(password),
        ..CreateUserInput::new(name, email.clone(), Role::Admin)
    };
    match state.users.create_user(input).await {
        Ok(created) => {
            tracing::info!(user_id = %created.user.id, email = %created.user.email, "admin created");
        }
        Err(AppError::Conflict(_)) => {
            tracing::info!(%email, "admin already exists");
        }
        Err(e) => {
            pool.close().await;
            return Err(e.into());
        }
    }

    pool.close().await;
    Ok(())
}
