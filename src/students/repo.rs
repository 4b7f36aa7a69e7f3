use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{AcademicSemester, NewStudent, Student, StudentRow};
use crate::error::AppResult;

/// The three calls the legacy student flow makes outside the users table.
#[async_trait]
pub trait StudentRegistry: Send + Sync {
    async fn find_semester(&self, id: Uuid) -> AppResult<Option<AcademicSemester>>;

    /// Most recently issued student id starting with `prefix`.
    async fn last_student_id(&self, prefix: &str) -> AppResult<Option<String>>;

    async fn insert(&self, student: NewStudent) -> AppResult<Student>;
}

#[derive(Clone)]
pub struct PgStudentRegistry {
    db: PgPool,
}

impl PgStudentRegistry {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentRegistry for PgStudentRegistry {
    async fn find_semester(&self, id: Uuid) -> AppResult<Option<AcademicSemester>> {
        let semester = sqlx::query_as::<_, AcademicSemester>(
            r#"
            SELECT id, name, year, code
            FROM academic_semesters
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(semester)
    }

    async fn last_student_id(&self, prefix: &str) -> AppResult<Option<String>> {
        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT student_id
            FROM students
            WHERE starts_with(student_id, $1)
            ORDER BY student_id DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&self.db)
        .await?;
        Ok(last)
    }

    async fn insert(&self, s: NewStudent) -> AppResult<Student> {
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            INSERT INTO students (student_id, user_id, name, email, admission_semester, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, student_id, user_id, name, email, admission_semester, details, created_at
            "#,
        )
        .bind(&s.student_id)
        .bind(s.user_id)
        .bind(sqlx::types::Json(&s.name))
        .bind(&s.email)
        .bind(s.admission_semester)
        .bind(&s.details)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }
}

#[cfg(test)]
pub use memory::InMemoryStudentRegistry;
