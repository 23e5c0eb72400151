pub mod auth;
pub mod config;
pub mod error;
pub mod follows;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod router;
pub mod token;
pub mod users;
pub mod validation;

mod rows;
