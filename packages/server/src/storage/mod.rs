//! Persistence traits and pagination types.
//!
//! The dispatch framework and business modules consume storage only through
//! these traits; the backing technology is out of scope and swappable. The
//! in-memory implementations in [`memory`] back tests and the default
//! server wiring.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use campus_core::{
    ApiError, Classroom, ClassroomId, School, SchoolId, Student, StudentId, TransferRecord, User,
    UserId,
};

pub use memory::{
    MemoryClassroomStore, MemorySchoolStore, MemoryStudentStore, MemoryTransferStore,
    MemoryUserStore,
};

// ---------------------------------------------------------------------------
// Errors and pagination
// ---------------------------------------------------------------------------

/// Failure reported by a store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    /// The backing store failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what.to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Unavailable(msg) => ApiError::Internal(msg),
        }
    }
}

/// Validated pagination window: `page >= 1`, `1 <= limit <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    /// Clamp raw query values into a valid window.
    #[must_use]
    pub fn clamped(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Index of the first item in this window.
    ///
    /// Saturates rather than overflowing; an absurd `page` lands past the
    /// end of any result set and yields an empty page.
    #[must_use]
    pub fn offset(self) -> usize {
        usize::try_from(self.page.saturating_sub(1).saturating_mul(self.limit))
            .unwrap_or(usize::MAX)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

/// One page of results plus the pagination echo the API returns.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paged<T> {
    /// Slice a fully sorted result set into one window.
    #[must_use]
    pub fn slice(mut all: Vec<T>, page: Page) -> Self {
        let total = all.len() as u64;
        let total_pages = total.div_ceil(page.limit);
        let items: Vec<T> = if page.offset() >= all.len() {
            Vec::new()
        } else {
            all.drain(page.offset()..).take(page.limit as usize).collect()
        };
        Self {
            items,
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// User accounts. Email is unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<User, StoreError>;
    async fn get(&self, id: &UserId) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list(&self, page: Page) -> Result<Paged<User>, StoreError>;
    /// Replace the stored record for `user.id`.
    async fn update(&self, user: User) -> Result<User, StoreError>;
    async fn remove(&self, id: &UserId) -> Result<User, StoreError>;
}

/// Schools. Name is unique.
#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn insert(&self, school: School) -> Result<School, StoreError>;
    async fn get(&self, id: &SchoolId) -> Result<School, StoreError>;
    async fn list(&self, page: Page) -> Result<Paged<School>, StoreError>;
    async fn update(&self, school: School) -> Result<School, StoreError>;
    async fn remove(&self, id: &SchoolId) -> Result<School, StoreError>;
}

/// Classrooms. Code is unique within the owning school.
#[async_trait]
pub trait ClassroomStore: Send + Sync {
    async fn insert(&self, classroom: Classroom) -> Result<Classroom, StoreError>;
    async fn get(&self, id: &ClassroomId) -> Result<Classroom, StoreError>;
    async fn list(
        &self,
        school_id: Option<&SchoolId>,
        page: Page,
    ) -> Result<Paged<Classroom>, StoreError>;
    async fn update(&self, classroom: Classroom) -> Result<Classroom, StoreError>;
    async fn remove(&self, id: &ClassroomId) -> Result<Classroom, StoreError>;
}

/// Students. Email and admission number are unique.
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn insert(&self, student: Student) -> Result<Student, StoreError>;
    async fn get(&self, id: &StudentId) -> Result<Student, StoreError>;
    async fn list(
        &self,
        school_id: Option<&SchoolId>,
        classroom_id: Option<&ClassroomId>,
        page: Page,
    ) -> Result<Paged<Student>, StoreError>;
    /// Replace the stored record for `student.id`. This is the write the
    /// transfer saga uses both to move a student and to restore the
    /// snapshot when the history write fails.
    async fn update(&self, student: Student) -> Result<Student, StoreError>;
    async fn remove(&self, id: &StudentId) -> Result<Student, StoreError>;
}

/// Append-only transfer history.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn append(&self, record: TransferRecord) -> Result<TransferRecord, StoreError>;
    /// Full movement history for one student, ordered by transfer time.
    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<TransferRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_out_of_range_values() {
        assert_eq!(Page::clamped(None, None), Page { page: 1, limit: 10 });
        assert_eq!(Page::clamped(Some(0), Some(0)), Page { page: 1, limit: 1 });
        assert_eq!(
            Page::clamped(Some(5), Some(1000)),
            Page { page: 5, limit: 100 }
        );
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(Page { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(Page { page: 3, limit: 10 }.offset(), 20);
    }

    #[test]
    fn paged_slice_windows_and_counts() {
        let all: Vec<u32> = (0..25).collect();
        let paged = Paged::slice(all, Page { page: 2, limit: 10 });
        assert_eq!(paged.items, (10..20).collect::<Vec<u32>>());
        assert_eq!(paged.total, 25);
        assert_eq!(paged.total_pages, 3);
    }

    #[test]
    fn huge_page_numbers_saturate_instead_of_overflowing() {
        let page = Page::clamped(Some(u64::MAX), Some(100));
        assert_eq!(page.offset(), usize::MAX);
        let paged = Paged::slice(vec![1, 2, 3], page);
        assert!(paged.items.is_empty());
        assert_eq!(paged.total, 3);
    }

    #[test]
    fn paged_slice_past_the_end_is_empty() {
        let paged = Paged::slice(vec![1, 2, 3], Page { page: 9, limit: 10 });
        assert!(paged.items.is_empty());
        assert_eq!(paged.total, 3);
    }

    #[test]
    fn store_errors_classify_into_the_taxonomy() {
        assert_eq!(ApiError::from(StoreError::NotFound("student")).code(), 404);
        assert_eq!(ApiError::from(StoreError::Conflict("dup".into())).code(), 409);
        assert_eq!(
            ApiError::from(StoreError::Unavailable("down".into())).code(),
            500
        );
    }
}
