pub mod admin;
pub mod auth;
pub mod jobs;
pub mod users;
pub mod writer;
