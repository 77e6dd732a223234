pub mod cities;
pub mod health;
pub mod randomizing_jobs;
pub mod users;

pub use cities::list_cities_handler;
pub use health::health_handler;
pub use randomizing_jobs::{cancel_job_handler, create_job_handler, list_jobs_handler};
pub use users::{create_user_handler, get_user_handler};
