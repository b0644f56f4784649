pub mod access;
pub mod admin_requests;
pub mod admin_users;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod enterprise;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod workspaces;
