use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Semester a student is admitted in. Only `year` and `code` feed id numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AcademicSemester {
    pub id: Uuid,
    pub name: String,
    pub year: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentName {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

impl StudentName {
    /// `first [middle] last`, single-spaced and trimmed.
    pub fn display(&self) -> String {
        [
            Some(self.first_name.trim()),
            self.middle_name.as_deref().map(str::trim),
            Some(self.last_name.trim()),
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Student profile as submitted. Attributes outside the ones the user record
/// needs are stored untouched in `details`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    #[validate(nested)]
    pub name: StudentName,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    pub admission_semester: Uuid,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: Option<String>,
    #[validate(nested)]
    pub student: StudentPayload,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub student_id: String,
    pub user_id: Uuid,
    pub name: StudentName,
    pub email: String,
    pub admission_semester: Uuid,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub student_id: String,
    pub user: Uuid,
    pub name: StudentName,
    pub email: String,
    pub admission_semester: Uuid,
    pub details: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub id: Uuid,
    pub student_id: String,
    pub user_id: Uuid,
    pub name: sqlx::types::Json<StudentName>,
    pub email: String,
    pub admission_semester: Uuid,
    pub details: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl From<StudentRow> for Student {
    fn from(r: StudentRow) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            user: r.user_id,
            name: r.name.0,
            email: r.email,
            admission_semester: r.admission_semester,
            details: r.details,
            created_at: r.created_at,
        }
    }
}
