//! Reschedule proposals and the two negotiating roles.
//!
//! The persisted shape of a proposal is the interoperability contract between
//! sessions, and must stay exactly:
//!
//! ```json
//! {"targetDate": "2025-03-20", "initiator": "owner", "status": "pending"}
//! ```
//!
//! Older records use `ENY` (owner) and `EJK` (authority) as initiators; both
//! are still accepted when reading.

use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Which side of the negotiation is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The equipment-owning partner.
    #[serde(alias = "ENY")]
    Owner,

    /// The inspecting body.
    #[serde(alias = "EJK")]
    Authority,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Authority => "authority",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" | "eny" => Ok(Self::Owner),
            "authority" | "ejk" => Ok(Self::Authority),
            other => Err(format!(
                "unknown role '{other}': expected 'owner' or 'authority'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStatus {
    Pending,
    Accepted,
}

/// A proposal as stored on each device of the group being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub target_date: Date,
    pub initiator: Role,
    pub status: MoveStatus,
}

impl Proposal {
    pub fn pending(target_date: Date, initiator: Role) -> Self {
        Self {
            target_date,
            initiator,
            status: MoveStatus::Pending,
        }
    }

    /// The same proposal, accepted by the counter-party.
    #[must_use]
    pub fn accepted(self) -> Self {
        Self {
            status: MoveStatus::Accepted,
            ..self
        }
    }
}

/// A proposal together with the origin date that keys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub origin: Date,
    pub proposal: Proposal,
}

/// One logical move written out to every device of its due-date group.
///
/// `proposal: None` removes the field from each listed device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub origin: Date,
    pub device_ids: Vec<String>,
    pub proposal: Option<Proposal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    #[test]
    fn wire_shape_is_stable() {
        let proposal = Proposal::pending(date(2025, 3, 20), Role::Owner);
        let json = serde_json::to_string(&proposal).unwrap();
        assert_eq!(
            json,
            r#"{"targetDate":"2025-03-20","initiator":"owner","status":"pending"}"#
        );

        let accepted = serde_json::to_string(&proposal.accepted()).unwrap();
        assert!(accepted.contains(r#""status":"accepted""#));
    }

    #[test]
    fn reads_legacy_initiators() {
        let json = r#"{"targetDate":"2025-03-20","initiator":"EJK","status":"accepted"}"#;
        let proposal: Proposal = serde_json::from_str(json).unwrap();
        assert_eq!(proposal.initiator, Role::Authority);
        assert_eq!(proposal.status, MoveStatus::Accepted);
    }

    #[test]
    fn role_from_str() {
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("ejk".parse::<Role>().unwrap(), Role::Authority);
        assert!("inspector".parse::<Role>().is_err());
    }
}
