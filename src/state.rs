use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::AppConfig,
    students::repo::{PgStudentRegistry, StudentRegistry},
    users::{
        repo::{PgUserRepository, UserRepository},
        service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<AppConfig>) -> Self {
        let repo = Arc::new(PgUserRepository::new(db.clone())) as Arc<dyn UserRepository>;
        let students = Arc::new(PgStudentRegistry::new(db)) as Arc<dyn StudentRegistry>;
        Self::from_parts(repo, students, config)
    }

    pub fn from_parts(
        repo: Arc<dyn UserRepository>,
        students: Arc<dyn StudentRegistry>,
        config: Arc<AppConfig>,
    ) -> Self {
        let users = UserService::new(repo, students, config.clone());
        Self { config, users }
    }
}
