use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{NewUser, Role, User, UserFilter, UserPatch, UserRow, Visibility};
use crate::error::AppResult;

/// Persistence port for user records. Every read names its [`Visibility`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_id(&self, id: Uuid, visibility: Visibility) -> AppResult<Option<User>>;

    /// `email` must already be lower-cased.
    async fn find_by_email(&self, email: &str, visibility: Visibility)
        -> AppResult<Option<User>>;

    /// Login lookup keyed on `(email, role)`. Blocked users are returned.
    async fn find_for_login(
        &self,
        email: &str,
        role: Role,
        visibility: Visibility,
    ) -> AppResult<Option<User>>;

    async fn list(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<Vec<User>>;

    async fn count(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<i64>;

    /// Writes only the columns `patch` supplies. Returns `None` if no live row matched.
    async fn update(&self, id: Uuid, patch: &UserPatch) -> AppResult<Option<User>>;

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> AppResult<Option<User>>;

    /// Sets `is_deleted`. Absent ids are not an error.
    async fn mark_deleted(&self, id: Uuid) -> AppResult<()>;
}

const USER_COLUMNS: &str = "id, display_id, name, email, role, password_hash, avatar, \
    department, course, student_id, employee_id, year, gpa, enrolled_subjects, subjects, \
    permissions, status, is_deleted, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter, visibility: Visibility) {
    qb.push(" WHERE TRUE");
    if visibility == Visibility::Live {
        qb.push(" AND is_deleted = FALSE");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(dept) = &filter.department {
        qb.push(" AND department ILIKE ").push_bind(escape_like(dept));
    }
    if let Some(q) = &filter.q {
        let pattern = escape_like(q);
        qb.push(" AND (");
        let mut sep = qb.separated(" OR ");
        for col in ["name", "email", "department", "course", "student_id", "employee_id"] {
            sep.push(col)
                .push_unseparated(" ILIKE ")
                .push_bind_unseparated(pattern.clone());
        }
        qb.push(")");
    }
}

fn push_patch(qb: &mut QueryBuilder<'_, Postgres>, patch: &UserPatch) {
    fn col<'a, T>(qb: &mut QueryBuilder<'a, Postgres>, name: &str, value: &Option<T>)
    where
        T: 'a + Clone + Send + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres>,
    {
        if let Some(v) = value {
            qb.push(format!(", {name} = ")).push_bind(v.clone());
        }
    }

    col(qb, "name", &patch.name);
    col(qb, "email", &patch.email);
    col(qb, "role", &patch.role.map(|r| r.as_str()));
    col(qb, "password_hash", &patch.password_hash);
    col(qb, "avatar", &patch.avatar);
    col(qb, "department", &patch.department);
    col(qb, "course", &patch.course);
    col(qb, "student_id", &patch.student_id);
    col(qb, "employee_id", &patch.employee_id);
    col(qb, "year", &patch.year);
    col(qb, "gpa", &patch.gpa);
    col(qb, "enrolled_subjects", &patch.enrolled_subjects);
    col(qb, "subjects", &patch.subjects);
    col(qb, "permissions", &patch.permissions);
}

fn live_clause(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Live => " AND is_deleted = FALSE",
        Visibility::IncludeDeleted => "",
    }
}

fn into_user(row: Option<UserRow>) -> AppResult<Option<User>> {
    Ok(row.map(User::try_from).transpose()?)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, u: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (display_id, name, email, role, password_hash, avatar,
                               department, course, student_id, employee_id, year, gpa,
                               enrolled_subjects, subjects, permissions, status, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, FALSE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&u.display_id)
        .bind(&u.name)
        .bind(&u.email)
        .bind(u.role.as_str())
        .bind(&u.password_hash)
        .bind(&u.profile.avatar)
        .bind(&u.profile.department)
        .bind(&u.profile.course)
        .bind(&u.profile.student_id)
        .bind(&u.profile.employee_id)
        .bind(u.profile.year)
        .bind(u.profile.gpa)
        .bind(&u.profile.enrolled_subjects)
        .bind(&u.profile.subjects)
        .bind(&u.profile.permissions)
        .bind(u.status.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(User::try_from(row)?)
    }

    async fn find_by_id(&self, id: Uuid, visibility: Visibility) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1{}",
            live_clause(visibility)
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        into_user(row)
    }

    async fn find_by_email(
        &self,
        email: &str,
        visibility: Visibility,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1{}",
            live_clause(visibility)
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        into_user(row)
    }

    async fn find_for_login(
        &self,
        email: &str,
        role: Role,
        visibility: Visibility,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND role = $2{}",
            live_clause(visibility)
        ))
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await?;
        into_user(row)
    }

    async fn list(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filters(&mut qb, filter, visibility);
        qb.push(" ORDER BY created_at DESC");
        let rows = qb.build_query_as::<UserRow>().fetch_all(&self.db).await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn count(&self, filter: &UserFilter, visibility: Visibility) -> AppResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut qb, filter, visibility);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.db).await?;
        Ok(total)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> AppResult<Option<User>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = now()");
        push_patch(&mut qb, patch);
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND is_deleted = FALSE RETURNING ")
            .push(USER_COLUMNS);
        let row = qb
            .build_query_as::<UserRow>()
            .fetch_optional(&self.db)
            .await?;
        into_user(row)
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(hash)
        .fetch_optional(&self.db)
        .await?;
        into_user(row)
    }

    async fn mark_deleted(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET is_deleted = TRUE, updated_at = now()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("ali"), "%ali%");
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn live_listing_excludes_deleted_rows() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM users");
        let filter = UserFilter {
            role: Some(Role::Lecturer),
            department: None,
            q: Some("x".into()),
        };
        push_filters(&mut qb, &filter, Visibility::Live);
        let sql = qb.sql();
        assert!(sql.contains("is_deleted = FALSE"));
        assert!(sql.contains("role = $1"));
        assert!(sql.contains("name ILIKE $2 OR email ILIKE $3"));
        assert!(sql.contains("employee_id ILIKE $7"));
    }

    #[test]
    fn update_sets_only_supplied_columns() {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = now()");
        let patch = UserPatch {
            department: Some("Math".into()),
            role: Some(Role::Lecturer),
            ..UserPatch::default()
        };
        push_patch(&mut qb, &patch);
        let sql = qb.sql();
        assert_eq!(
            sql,
            "UPDATE users SET updated_at = now(), role = $1, department = $2"
        );
        assert!(!sql.contains("password_hash"));
        assert!(!sql.contains("status"));
    }
}
