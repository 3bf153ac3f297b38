//! In-memory store implementations backed by `DashMap`.
//!
//! These are the default wiring for local runs and tests. Uniqueness checks
//! scan the map; acceptable at in-memory scale and irrelevant to callers,
//! who only see the trait.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use campus_core::{
    Classroom, ClassroomId, School, SchoolId, Student, StudentId, TransferRecord, User, UserId,
};

use super::{
    ClassroomStore, Page, Paged, SchoolStore, StoreError, StudentStore, TransferStore, UserStore,
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// `DashMap`-backed [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, User>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(&self, email: &str, except: Option<&UserId>) -> bool {
        self.users
            .iter()
            .any(|e| e.value().email == email && Some(e.key()) != except)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        if self.email_taken(&user.email, None) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get(&self, id: &UserId) -> Result<User, StoreError> {
        self.users
            .get(id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound("user"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().email == email)
            .map(|e| e.value().clone()))
    }

    async fn list(&self, page: Page) -> Result<Paged<User>, StoreError> {
        let mut all: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| (a.created_at, &a.id.0).cmp(&(b.created_at, &b.id.0)));
        Ok(Paged::slice(all, page))
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        if !self.users.contains_key(&user.id) {
            return Err(StoreError::NotFound("user"));
        }
        if self.email_taken(&user.email, Some(&user.id)) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn remove(&self, id: &UserId) -> Result<User, StoreError> {
        self.users
            .remove(id)
            .map(|(_, user)| user)
            .ok_or(StoreError::NotFound("user"))
    }
}

// ---------------------------------------------------------------------------
// Schools
// ---------------------------------------------------------------------------

/// `DashMap`-backed [`SchoolStore`].
#[derive(Debug, Default)]
pub struct MemorySchoolStore {
    schools: DashMap<SchoolId, School>,
}

impl MemorySchoolStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn name_taken(&self, name: &str, except: Option<&SchoolId>) -> bool {
        self.schools
            .iter()
            .any(|e| e.value().name == name && Some(e.key()) != except)
    }
}

#[async_trait]
impl SchoolStore for MemorySchoolStore {
    async fn insert(&self, school: School) -> Result<School, StoreError> {
        if self.name_taken(&school.name, None) {
            return Err(StoreError::Conflict("school name already exists".to_string()));
        }
        self.schools.insert(school.id.clone(), school.clone());
        Ok(school)
    }

    async fn get(&self, id: &SchoolId) -> Result<School, StoreError> {
        self.schools
            .get(id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound("school"))
    }

    async fn list(&self, page: Page) -> Result<Paged<School>, StoreError> {
        let mut all: Vec<School> = self.schools.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| (a.created_at, &a.id.0).cmp(&(b.created_at, &b.id.0)));
        Ok(Paged::slice(all, page))
    }

    async fn update(&self, school: School) -> Result<School, StoreError> {
        if !self.schools.contains_key(&school.id) {
            return Err(StoreError::NotFound("school"));
        }
        if self.name_taken(&school.name, Some(&school.id)) {
            return Err(StoreError::Conflict("school name already exists".to_string()));
        }
        self.schools.insert(school.id.clone(), school.clone());
        Ok(school)
    }

    async fn remove(&self, id: &SchoolId) -> Result<School, StoreError> {
        self.schools
            .remove(id)
            .map(|(_, school)| school)
            .ok_or(StoreError::NotFound("school"))
    }
}

// ---------------------------------------------------------------------------
// Classrooms
// ---------------------------------------------------------------------------

/// `DashMap`-backed [`ClassroomStore`].
#[derive(Debug, Default)]
pub struct MemoryClassroomStore {
    classrooms: DashMap<ClassroomId, Classroom>,
}

impl MemoryClassroomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn code_taken(&self, code: &str, school_id: &SchoolId, except: Option<&ClassroomId>) -> bool {
        self.classrooms.iter().any(|e| {
            e.value().code == code && &e.value().school_id == school_id && Some(e.key()) != except
        })
    }
}

#[async_trait]
impl ClassroomStore for MemoryClassroomStore {
    async fn insert(&self, classroom: Classroom) -> Result<Classroom, StoreError> {
        if self.code_taken(&classroom.code, &classroom.school_id, None) {
            return Err(StoreError::Conflict(
                "classroom code already exists in this school".to_string(),
            ));
        }
        self.classrooms.insert(classroom.id.clone(), classroom.clone());
        Ok(classroom)
    }

    async fn get(&self, id: &ClassroomId) -> Result<Classroom, StoreError> {
        self.classrooms
            .get(id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound("classroom"))
    }

    async fn list(
        &self,
        school_id: Option<&SchoolId>,
        page: Page,
    ) -> Result<Paged<Classroom>, StoreError> {
        let mut all: Vec<Classroom> = self
            .classrooms
            .iter()
            .filter(|e| school_id.is_none_or(|s| &e.value().school_id == s))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| (a.created_at, &a.id.0).cmp(&(b.created_at, &b.id.0)));
        Ok(Paged::slice(all, page))
    }

    async fn update(&self, classroom: Classroom) -> Result<Classroom, StoreError> {
        if !self.classrooms.contains_key(&classroom.id) {
            return Err(StoreError::NotFound("classroom"));
        }
        if self.code_taken(&classroom.code, &classroom.school_id, Some(&classroom.id)) {
            return Err(StoreError::Conflict(
                "classroom code already exists in this school".to_string(),
            ));
        }
        self.classrooms.insert(classroom.id.clone(), classroom.clone());
        Ok(classroom)
    }

    async fn remove(&self, id: &ClassroomId) -> Result<Classroom, StoreError> {
        self.classrooms
            .remove(id)
            .map(|(_, classroom)| classroom)
            .ok_or(StoreError::NotFound("classroom"))
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// `DashMap`-backed [`StudentStore`].
#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    students: DashMap<StudentId, Student>,
}

impl MemoryStudentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn identity_taken(
        &self,
        email: &str,
        admission_number: &str,
        except: Option<&StudentId>,
    ) -> bool {
        self.students.iter().any(|e| {
            (e.value().email == email || e.value().admission_number == admission_number)
                && Some(e.key()) != except
        })
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn insert(&self, student: Student) -> Result<Student, StoreError> {
        if self.identity_taken(&student.email, &student.admission_number, None) {
            return Err(StoreError::Conflict(
                "email or admission number already exists".to_string(),
            ));
        }
        self.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    async fn get(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.students
            .get(id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound("student"))
    }

    async fn list(
        &self,
        school_id: Option<&SchoolId>,
        classroom_id: Option<&ClassroomId>,
        page: Page,
    ) -> Result<Paged<Student>, StoreError> {
        let mut all: Vec<Student> = self
            .students
            .iter()
            .filter(|e| school_id.is_none_or(|s| &e.value().school_id == s))
            .filter(|e| classroom_id.is_none_or(|c| &e.value().classroom_id == c))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| (a.created_at, &a.id.0).cmp(&(b.created_at, &b.id.0)));
        Ok(Paged::slice(all, page))
    }

    async fn update(&self, student: Student) -> Result<Student, StoreError> {
        if !self.students.contains_key(&student.id) {
            return Err(StoreError::NotFound("student"));
        }
        if self.identity_taken(&student.email, &student.admission_number, Some(&student.id)) {
            return Err(StoreError::Conflict(
                "email or admission number already exists".to_string(),
            ));
        }
        self.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    async fn remove(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.students
            .remove(id)
            .map(|(_, student)| student)
            .ok_or(StoreError::NotFound("student"))
    }
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Append-only [`TransferStore`] on a locked `Vec`, so records written in
/// the same millisecond keep their append order.
#[derive(Debug, Default)]
pub struct MemoryTransferStore {
    records: RwLock<Vec<TransferRecord>>,
}

impl MemoryTransferStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn append(&self, record: TransferRecord) -> Result<TransferRecord, StoreError> {
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        let mut history: Vec<TransferRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| &r.student_id == student_id)
            .cloned()
            .collect();
        // Stable sort: ties stay in append order.
        history.sort_by_key(|r| r.transferred_at);
        Ok(history)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
