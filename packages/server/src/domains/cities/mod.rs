pub mod models;

pub use models::city::City;
