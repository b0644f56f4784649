use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AdminRequestStatus;

/// Account-level role. Declared from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "kebab-case"))]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    SuperAdmin,
    CompanyAdmin,
    Owner,
    Admin,
    Manager,
    Member,
    Guest,
}

impl UserRole {
    pub const ALL: [UserRole; 7] = [
        Self::SuperAdmin,
        Self::CompanyAdmin,
        Self::Owner,
        Self::Admin,
        Self::Manager,
        Self::Member,
        Self::Guest,
    ];

    /// Higher is more privileged.
    pub fn rank(&self) -> u8 {
        match self {
            Self::SuperAdmin => 6,
            Self::CompanyAdmin => 5,
            Self::Owner => 4,
            Self::Admin => 3,
            Self::Manager => 2,
            Self::Member => 1,
            Self::Guest => 0,
        }
    }

    pub fn outranks(&self, other: UserRole) -> bool {
        self.rank() > other.rank()
    }

    /// Roles allowed to decide admin requests and manage users.
    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::CompanyAdmin | Self::Admin)
    }

    /// Roles allowed through the cookie-based enterprise login.
    pub fn is_enterprise(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::CompanyAdmin)
    }

    /// Whether a holder of this role may hand out `target`.
    pub fn can_grant(&self, target: UserRole) -> bool {
        self.is_admin_tier() && self.rank() >= target.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::CompanyAdmin => "company-admin",
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

/// Public view of an account. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_request_status: Option<AdminRequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_request_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact user reference embedded in task and document responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
