// Core entities
pub mod classes;
pub mod grades;
pub mod indiscipline;
pub mod invites;
pub mod notifications;
pub mod students;
pub mod subjects;
pub mod teachers;

// Type re-exports
pub use classes::*;
pub use grades::*;
pub use indiscipline::*;
pub use invites::*;
pub use notifications::*;
pub use students::*;
pub use subjects::*;
pub use teachers::*;
