use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Lecturer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Lecturer => "lecturer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "lecturer" => Ok(Role::Lecturer),
            "admin" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "blocked" => Ok(UserStatus::Blocked),
            other => anyhow::bail!("unknown status: {other}"),
        }
    }
}

/// Role-dependent attributes shared by the record, the public view and the inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub enrolled_subjects: Vec<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Domain record. Holds the password hash, so it never leaves the service as is.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub display_id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub profile: Profile,
    pub status: UserStatus,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Everything needed to insert a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub profile: Profile,
    pub status: UserStatus,
}

/// Columns supplied by an update. `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
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

impl UserPatch {
    /// Writes the supplied fields into `user`.
    pub fn apply(&self, user: &mut User) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        set(&mut user.name, &self.name);
        set(&mut user.email, &self.email);
        set(&mut user.role, &self.role);
        set(&mut user.password_hash, &self.password_hash);
        let p = &mut user.profile;
        set_opt(&mut p.avatar, &self.avatar);
        set_opt(&mut p.department, &self.department);
        set_opt(&mut p.course, &self.course);
        set_opt(&mut p.student_id, &self.student_id);
        set_opt(&mut p.employee_id, &self.employee_id);
        set_opt(&mut p.year, &self.year);
        set_opt(&mut p.gpa, &self.gpa);
        set(&mut p.enrolled_subjects, &self.enrolled_subjects);
        set(&mut p.subjects, &self.subjects);
        set(&mut p.permissions, &self.permissions);
    }
}

/// Row shape of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub display_id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub student_id: Option<String>,
    pub employee_id: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f64>,
    pub enrolled_subjects: Vec<String>,
    pub subjects: Vec<String>,
    pub permissions: Vec<String>,
    pub status: String,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            display_id: r.display_id,
            name: r.name,
            email: r.email,
            role: r.role.parse()?,
            password_hash: r.password_hash,
            profile: Profile {
                avatar: r.avatar,
                department: r.department,
                course: r.course,
                student_id: r.student_id,
                employee_id: r.employee_id,
                year: r.year,
                gpa: r.gpa,
                enrolled_subjects: r.enrolled_subjects,
                subjects: r.subjects,
                permissions: r.permissions,
            },
            status: r.status.parse()?,
            is_deleted: r.is_deleted,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Public view of a user: no hash, one `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,
    pub status: UserStatus,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Pure projection to the public view. The legacy display id is dropped; the
/// student path mirrors it into `profile.student_id`.
pub fn sanitize(user: &User) -> PublicUser {
    PublicUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        profile: user.profile.clone(),
        status: user.status,
        is_deleted: user.is_deleted,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// Whether a read may return soft-deleted records. Every repository read takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Live,
    IncludeDeleted,
}

impl Visibility {
    pub fn admits(&self, user: &User) -> bool {
        match self {
            Visibility::Live => !user.is_deleted,
            Visibility::IncludeDeleted => true,
        }
    }
}

/// Listing filters. `q` matches name, email, department, course, studentId, employeeId.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub q: Option<String>,
}

impl UserFilter {
    /// In-process evaluation of the same predicate the SQL query builds.
    pub fn matches(&self, user: &User) -> bool {
        fn contains(hay: Option<&str>, needle: &str) -> bool {
            hay.is_some_and(|h| h.to_lowercase().contains(needle))
        }

        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(dept) = &self.department {
            if !contains(user.profile.department.as_deref(), &dept.to_lowercase()) {
                return false;
            }
        }
        if let Some(q) = &self.q {
            let q = q.to_lowercase();
            let p = &user.profile;
            return contains(Some(&user.name), &q)
                || contains(Some(&user.email), &q)
                || contains(p.department.as_deref(), &q)
                || contains(p.course.as_deref(), &q)
                || contains(p.student_id.as_deref(), &q)
                || contains(p.employee_id.as_deref(), &q);
        }
        true
    }
}
