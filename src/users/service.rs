use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{ValidateEmail, ValidateUrl};

use super::{
    dto::{CreateUserInput, CreatedUser, UpdateUserInput},
    model::{
        sanitize, NewUser, Profile, PublicUser, Role, User, UserFilter, UserPatch, UserStatus,
        Visibility,
    },
    repo::UserRepository,
};
use crate::{
    auth::{
        claims::CallerContext,
        dto::LoginResponse,
        jwt::JwtKeys,
        password::{generate_password, verify_password_blocking, PasswordPolicy},
    },
    config::AppConfig,
    error::{AppError, AppResult},
    response::FieldIssue,
    students::{
        id::{id_prefix, next_student_id},
        model::{CreateStudentRequest, NewStudent, Student},
        repo::StudentRegistry,
    },
};

/// User lifecycle: login, creation, lookup, update, soft delete, passwords.
///
/// Knows nothing about HTTP. Every record leaving this type goes through
/// [`sanitize`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    students: Arc<dyn StudentRegistry>,
    config: Arc<AppConfig>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        students: Arc<dyn StudentRegistry>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            repo,
            students,
            config,
        }
    }

    fn policy(&self) -> PasswordPolicy {
        PasswordPolicy::from(&self.config.password)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, role: Role) -> AppResult<LoginResponse> {
        let email = email.to_lowercase();
        let Some(user) = self
            .repo
            .find_for_login(&email, role, Visibility::Live)
            .await?
        else {
            warn!(%email, %role, "login rejected");
            return Err(AppError::invalid_credentials());
        };

        let matches =
            verify_password_blocking(password.to_owned(), user.password_hash.clone()).await?;
        if !matches {
            warn!(user_id = %user.id, "login rejected");
            return Err(AppError::invalid_credentials());
        }

        let keys = JwtKeys::from_config(&self.config.jwt)?;
        let token = keys.sign(&CallerContext {
            id: user.id,
            role: user.role,
            email: user.email.clone(),
        })?;

        info!(user_id = %user.id, %role, "user logged in");
        Ok(LoginResponse {
            token,
            user: sanitize(&user),
        })
    }

    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<CreatedUser> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        let profile = input.profile();
        validate_fields(&name, &email, profile.avatar.as_deref())?;
        let (password, generated) = match input.password.clone() {
            Some(p) => (p, false),
            None => (generate_password(), true),
        };

        self.ensure_unique_email(&email, None).await?;

        let password_hash = self.policy().hash_blocking(password.clone()).await?;
        let user = self
            .repo
            .insert(NewUser {
                display_id: None,
                name,
                email,
                role: input.role,
                password_hash,
                profile,
                status: UserStatus::Active,
            })
            .await?;

        info!(user_id = %user.id, generated, "user created");
        Ok(CreatedUser {
            user: sanitize(&user),
            password: generated.then_some(password),
        })
    }

    /// Live users matching `filter`, plus the full match count.
    #[instrument(skip(self))]
    pub async fn list_users(&self, filter: UserFilter) -> AppResult<(Vec<PublicUser>, i64)> {
        let users = self.repo.list(&filter, Visibility::Live).await?;
        let total = self.repo.count(&filter, Visibility::Live).await?;
        Ok((users.iter().map(sanitize).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> AppResult<PublicUser> {
        self.repo
            .find_by_id(id, Visibility::Live)
            .await?
            .map(|u| sanitize(&u))
            .ok_or_else(AppError::user_not_found)
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: Uuid, input: UpdateUserInput) -> AppResult<PublicUser> {
        let password = input.password.clone();
        let mut patch = into_patch(input, None);
        if let Some(email) = &patch.email {
            self.ensure_unique_email(email, Some(id)).await?;
        }

        let mut merged = self
            .repo
            .find_by_id(id, Visibility::Live)
            .await?
            .ok_or_else(AppError::user_not_found)?;
        patch.apply(&mut merged);
        validate_record(&merged)?;
        if let Some(p) = password {
            patch.password_hash = Some(self.policy().hash_blocking(p).await?);
        }

        let updated = self
            .repo
            .update(id, &patch)
            .await?
            .ok_or_else(AppError::user_not_found)?;
        info!(user_id = %id, "user updated");
        Ok(sanitize(&updated))
    }

    /// Soft delete. Succeeds for unknown and already deleted ids.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.repo.mark_deleted(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn set_password(&self, id: Uuid, password: &str) -> AppResult<PublicUser> {
        let hash = self.policy().hash_blocking(password.to_owned()).await?;
        let user = self
            .repo
            .set_password_hash(id, &hash)
            .await?
            .ok_or_else(AppError::user_not_found)?;
        info!(user_id = %id, "password updated");
        Ok(sanitize(&user))
    }

    /// Legacy combined flow: a student user plus its linked student profile.
    #[instrument(skip(self, req), fields(email = %req.student.email))]
    pub async fn create_student_into_db(&self, req: CreateStudentRequest) -> AppResult<Student> {
        let CreateStudentRequest { password, student } = req;
        let password = password
            .or_else(|| self.config.password.default_password.clone())
            .ok_or_else(|| AppError::Configuration("missing default password".into()))?;

        let semester = self
            .students
            .find_semester(student.admission_semester)
            .await?
            .ok_or_else(|| AppError::NotFound("Admission semester not found".into()))?;
        let last = self.students.last_student_id(&id_prefix(&semester)).await?;
        let student_id = next_student_id(&semester, last.as_deref())?;

        let email = student.email.to_lowercase();
        let password_hash = self.policy().hash_blocking(password).await?;
        let user = self
            .repo
            .insert(NewUser {
                display_id: Some(student_id.clone()),
                name: student.name.display(),
                email: email.clone(),
                role: Role::Student,
                password_hash,
                profile: Profile {
                    student_id: Some(student_id.clone()),
                    ..Profile::default()
                },
                status: UserStatus::Active,
            })
            .await?;

        let created = self
            .students
            .insert(NewStudent {
                student_id,
                user_id: user.id,
                name: student.name,
                email,
                admission_semester: student.admission_semester,
                details: serde_json::Value::Object(student.details),
            })
            .await?;

        info!(user_id = %user.id, student_id = %created.student_id, "student created");
        Ok(created)
    }

    /// Uniqueness spans soft-deleted records too.
    async fn ensure_unique_email(&self, email: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let existing = self
            .repo
            .find_by_email(email, Visibility::IncludeDeleted)
            .await?;
        match existing {
            Some(u) if Some(u.id) != exclude => {
                Err(AppError::Conflict("Email already exists".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Normalizes the supplied fields into a column patch.
fn into_patch(input: UpdateUserInput, password_hash: Option<String>) -> UserPatch {
    UserPatch {
        name: input.name.map(|n| n.trim().to_string()),
        email: input.email.map(|e| e.trim().to_lowercase()),
        role: input.role,
        password_hash,
        avatar: input.avatar,
        department: input.department,
        course: input.course,
        student_id: input.student_id,
        employee_id: input.employee_id,
        year: input.year,
        gpa: input.gpa,
        enrolled_subjects: input.enrolled_subjects,
        subjects: input.subjects,
        permissions: input.permissions,
    }
}

/// Field rules of the stored record, checked after a merge.
fn validate_record(user: &User) -> AppResult<()> {
    validate_fields(&user.name, &user.email, user.profile.avatar.as_deref())
}

fn validate_fields(name: &str, email: &str, avatar: Option<&str>) -> AppResult<()> {
    let mut issues = Vec::new();
    if name.trim().is_empty() {
        issues.push(FieldIssue::new("name", "Name is required"));
    }
    if !email.validate_email() {
        issues.push(FieldIssue::new("email", "Valid email is required"));
    }
    if let Some(avatar) = avatar {
        if !avatar.validate_url() {
            issues.push(FieldIssue::new("avatar", "Invalid url"));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(issues))
    }
}
