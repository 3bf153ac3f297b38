//! Domain identifiers, roles, and entity types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current wall-clock time as unix milliseconds.
///
/// All entity timestamps use this representation so they serialize as plain
/// JSON numbers.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Unique identifier for a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(pub String);

/// Unique identifier for a classroom within a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassroomId(pub String);

/// Unique identifier for a student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Unique identifier for a transfer history record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// The identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

impl_id!(UserId);
impl_id!(SchoolId);
impl_id!(ClassroomId);
impl_id!(StudentId);
impl_id!(TransferId);

// ---------------------------------------------------------------------------
// Roles and principals
// ---------------------------------------------------------------------------

/// Account role driving authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator: every operation is permitted.
    Superadmin,
    /// Administrator scoped to a single school.
    SchoolAdmin,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::SchoolAdmin => "school_admin",
        }
    }
}

/// Authenticated identity attached to the request context by the auth guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user's id.
    pub id: UserId,
    /// Role used by authorization guards.
    pub role: Role,
    /// The school a `SchoolAdmin` administers. `None` for superadmins.
    pub school_id: Option<SchoolId>,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// User account. The password digest never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    pub is_active: bool,
    pub created_at: i64,
}

impl User {
    /// Public projection safe to return in responses.
    #[must_use]
    pub fn public(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "email": self.email,
            "role": self.role,
            "school_id": self.school_id,
        })
    }
}

/// A school: the top level of the ownership hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub address: String,
    pub contact_email: String,
    pub phone: String,
    pub created_by: UserId,
    pub created_at: i64,
}

/// A classroom, always owned by exactly one school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    /// Short code, unique within the owning school.
    pub code: String,
    pub school_id: SchoolId,
    pub capacity: Option<u32>,
    pub courses: Vec<String>,
    pub created_by: UserId,
    pub created_at: i64,
}

/// Enrollment status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Transferred,
}

/// A student enrolled in one classroom of one school.
///
/// The current location lives on the student record itself; the movement
/// history is the ordered sequence of [`TransferRecord`]s for the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Auto-generated when not supplied at creation.
    pub admission_number: String,
    pub classroom_id: ClassroomId,
    pub school_id: SchoolId,
    pub enrollment_date: i64,
    pub status: StudentStatus,
    pub created_at: i64,
}

/// Outcome status of a transfer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

/// One relocation event in a student's append-only movement history.
/// Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub student_id: StudentId,
    pub from_school_id: SchoolId,
    pub from_classroom_id: ClassroomId,
    pub to_school_id: SchoolId,
    pub to_classroom_id: ClassroomId,
    pub transferred_by: UserId,
    pub reason: Option<String>,
    pub status: TransferStatus,
    pub transferred_at: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
