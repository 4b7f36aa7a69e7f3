use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use super::model::{Profile, PublicUser, Role, UserFilter};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    pub role: Role,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: Option<String>,
    #[validate(url(message = "Invalid url"))]
    pub avatar: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub employee_id: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f64>,
    pub enrolled_subjects: Option<Vec<String>>,
    pub subjects: Option<Vec<String>>,
    pub permissions: Option<Vec<String>>,
}

impl CreateUserInput {
    /// Input with no password and an empty profile.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
            password: None,
            avatar: None,
            department: None,
            course: None,
            student_id: None,
            employee_id: None,
            year: None,
            gpa: None,
            enrolled_subjects: None,
            subjects: None,
            permissions: None,
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            avatar: self.avatar.clone(),
            department: self.department.clone(),
            course: self.course.clone(),
            student_id: self.student_id.clone(),
            employee_id: self.employee_id.clone(),
            year: self.year,
            gpa: self.gpa,
            enrolled_subjects: self.enrolled_subjects.clone().unwrap_or_default(),
            subjects: self.subjects.clone().unwrap_or_default(),
            permissions: self.permissions.clone().unwrap_or_default(),
        }
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email(message = "Valid email is required"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: Option<String>,
    #[validate(url(message = "Invalid url"))]
    pub avatar: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub employee_id: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f64>,
    pub enrolled_subjects: Option<Vec<String>>,
    pub subjects: Option<Vec<String>>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub q: Option<String>,
}

impl From<UserQuery> for UserFilter {
    fn from(q: UserQuery) -> Self {
        // An empty `?q=` means no filter.
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        UserFilter {
            role: q.role,
            department: non_empty(q.department),
            q: non_empty(q.q),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(custom(function = "password_bounds"))]
    pub password: String,
}

fn trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(String::deserialize(d)?.trim().to_string())
}

fn trimmed_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.map(|s| s.trim().to_string()))
}

fn not_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Name is required".into()));
    }
    Ok(())
}

fn password_bounds(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    let message = if len < 6 {
        "Password must be at least 6 characters long"
    } else if len > 50 {
        "Password is too long"
    } else {
        return Ok(());
    };
    Err(ValidationError::new("length").with_message(message.into()))
}

/// Result of CreateUser. `password` is only set when it was generated.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}
