use serde::{Deserialize, Serialize};

use crate::models::{AdminRequest, User, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Sign-up that also files a pending request for an elevated role.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminSignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub requested_role: UserRole,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminSignupResponse {
    pub user: User,
    pub request: AdminRequest,
    pub message: String,
}

/// Body of a successful enterprise login; the token itself travels in the
/// session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnterpriseSessionResponse {
    pub user: User,
    pub expires_in: i64,
}
