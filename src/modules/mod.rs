pub mod attendance;
pub mod auth;
pub mod documents;
pub mod elearning;
pub mod enrollments;
pub mod formations;
pub mod grades;
pub mod organizations;
pub mod payments;
pub mod programs;
pub mod reports;
pub mod sessions;
pub mod signatures;
pub mod slots;
pub mod students;
pub mod users;

pub use self::auth::model::LoginRequest;
pub use self::users::model::User;
