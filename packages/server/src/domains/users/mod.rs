pub mod generator;
pub mod models;
pub mod service;

pub use generator::UserGenerator;
pub use models::user::{Gender, NewUser, User};
pub use service::{BatchInsertReport, RejectedUser, UserService};
