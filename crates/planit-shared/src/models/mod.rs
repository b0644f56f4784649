mod admin_request;
mod dashboard;
mod document;
mod notification;
mod project;
mod task;
mod user;
mod workspace;

pub use admin_request::*;
pub use dashboard::*;
pub use document::*;
pub use notification::*;
pub use project::*;
pub use task::*;
pub use user::*;
pub use workspace::*;
