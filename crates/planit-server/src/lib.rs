pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod routes;

pub use config::Config;
pub use db::DbPool;
pub use routes::{create_router, AppState};
