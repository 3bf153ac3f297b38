//! Business modules mounted on the dispatcher.
//!
//! Each module owns its stores, declares its contract, and implements the
//! operations the contract names. Authorization and input validation live
//! in the guard chains; operations assume a guarded context.

pub mod classrooms;
pub mod schools;
pub mod students;
pub mod users;

pub use classrooms::ClassroomsModule;
pub use schools::SchoolsModule;
pub use students::StudentsModule;
pub use users::UsersModule;
