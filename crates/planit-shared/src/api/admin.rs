use serde::{Deserialize, Serialize};

use crate::models::{AdminRequest, AdminRequestStatus, User, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAdminRequest {
    pub requested_role: UserRole,
    pub reason: String,
}

/// Decision body for `POST /api/admin/approvals/:id`. The action is kept as
/// a string so an unknown value is reported as a bad request.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Optional body for the `/accept` and `/reject` routes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DecisionNote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApprovalListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdminRequestStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetUserActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub request: AdminRequest,
    pub user: User,
}
