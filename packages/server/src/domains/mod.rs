pub mod cities;
pub mod randomizing_jobs;
pub mod users;
