use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::case::ParseEnumError;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Who is acting on a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Ordering doctor or clinic staff.
    Customer,
    /// Lab staff (designers, reviewers).
    Lab,
    /// Milling center operator.
    Milling,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Lab => "lab",
            ActorRole::Milling => "milling",
            ActorRole::Admin => "admin",
        }
    }

    /// Staff roles may waive cancellation fees.
    pub fn can_waive_fee(&self) -> bool {
        matches!(self, ActorRole::Lab | ActorRole::Admin)
    }

    /// Roles allowed to pull production batches and record shipments.
    pub fn can_run_production(&self) -> bool {
        matches!(self, ActorRole::Milling | ActorRole::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(ActorRole::Customer),
            "lab" => Ok(ActorRole::Lab),
            "milling" => Ok(ActorRole::Milling),
            "admin" => Ok(ActorRole::Admin),
            _ => Err(ParseEnumError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: ActorRole,
    /// Clinic the user belongs to (customers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    pub method: String,
}
