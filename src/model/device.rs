//! Device: one physical inspectable asset.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::dates::{DateError, parse_due_date};

use super::Proposal;

/// A device as the scheduler sees it.
///
/// `next_due_date` is owned by the inspection records and kept as the raw
/// stored text; the scheduler only ever writes `proposal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,

    /// Next periodic inspection, as recorded (`2025.03.10`, `2025-03-10`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<String>,

    /// Reschedule proposal shared by the device's due-date group.
    #[serde(
        default,
        alias = "appointment_proposal",
        skip_serializing_if = "Option::is_none"
    )]
    pub proposal: Option<Proposal>,

    /// Only populated in multi-partner views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            next_due_date: None,
            proposal: None,
            partner_name: None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn due(mut self, raw: impl Into<String>) -> Self {
        self.next_due_date = Some(raw.into());
        self
    }

    /// The parsed due date. `None` when no inspection is on file.
    pub fn due_date(&self) -> Option<Result<Date, DateError>> {
        self.next_due_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    use crate::model::{MoveStatus, Role};

    #[test]
    fn blank_due_date_counts_as_absent() {
        assert!(Device::new("d1").due_date().is_none());
        assert!(Device::new("d1").due("  ").due_date().is_none());
        assert_eq!(
            Device::new("d1").due("2025.03.10").due_date(),
            Some(Ok(date(2025, 3, 10)))
        );
    }

    #[test]
    fn reads_legacy_proposal_field() {
        let json = r#"{
            "id": "d1",
            "nextDueDate": "2025.03.10",
            "appointment_proposal": {
                "targetDate": "2025-03-20",
                "initiator": "ENY",
                "status": "pending"
            }
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        let proposal = device.proposal.unwrap();
        assert_eq!(proposal.target_date, date(2025, 3, 20));
        assert_eq!(proposal.initiator, Role::Owner);
        assert_eq!(proposal.status, MoveStatus::Pending);
    }
}
