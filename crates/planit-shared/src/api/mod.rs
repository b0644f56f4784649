mod admin;
mod auth;
mod dashboard;
mod documents;
mod projects;
mod tasks;
mod workspaces;

pub use admin::*;
pub use auth::*;
pub use dashboard::*;
pub use documents::*;
pub use projects::*;
pub use tasks::*;
pub use workspaces::*;
