//! Due-date index: devices grouped by the day their next inspection falls due.
//!
//! A pure projection of the held device list. Devices without a due date, or
//! with one that does not parse, are left out and remembered as excluded, so
//! that every input device ends up in exactly one place.

use std::collections::BTreeMap;

use jiff::civil::Date;
use tracing::warn;

use crate::model::Device;

/// Devices grouped by normalized due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueIndex {
    groups: BTreeMap<Date, Vec<Device>>,
    excluded: Vec<String>,
}

/// Builds the index. Never fails: malformed dates are logged and excluded.
pub fn index_by_due_date(devices: &[Device]) -> DueIndex {
    let mut index = DueIndex::default();
    for device in devices {
        match device.due_date() {
            Some(Ok(date)) => index.groups.entry(date).or_default().push(device.clone()),
            Some(Err(e)) => {
                warn!(device_id = %device.id, error = %e, "excluding device from due-date index");
                index.excluded.push(device.id.clone());
            }
            None => index.excluded.push(device.id.clone()),
        }
    }
    index
}

impl DueIndex {
    /// Devices due on `date`, in input order.
    pub fn group(&self, date: Date) -> &[Device] {
        self.groups.get(&date).map_or(&[], Vec::as_slice)
    }

    pub fn count(&self, date: Date) -> usize {
        self.group(date).len()
    }

    pub fn contains(&self, date: Date) -> bool {
        self.groups.contains_key(&date)
    }

    /// The fan-out write list for a move of `date`'s group.
    pub fn device_ids(&self, date: Date) -> Vec<String> {
        self.group(date).iter().map(|d| d.id.clone()).collect()
    }

    /// All groups in date order.
    #[cfg(test)]
    pub fn groups(&self) -> impl Iterator<Item = (Date, &[Device])> + '_ {
        self.groups.iter().map(|(date, devices)| (*date, devices.as_slice()))
    }

    /// Ids of devices with no usable due date.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }
}
