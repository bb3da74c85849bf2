//! Inspection statistics per partner and across partners.

use std::collections::BTreeMap;

use jiff::civil::Date;

use crate::{
    dates::YearMonth,
    model::{Device, Partner},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerStats {
    pub partner: Partner,
    pub total: usize,

    /// Due strictly before today.
    pub expired: usize,

    /// No inspection on file, or a due date that does not parse.
    pub no_inspection: usize,

    /// Due today or later, by month.
    pub upcoming: BTreeMap<YearMonth, usize>,
}

pub fn partner_stats(partner: &Partner, devices: &[Device], today: Date) -> PartnerStats {
    let mut stats = PartnerStats {
        partner: partner.clone(),
        total: devices.len(),
        expired: 0,
        no_inspection: 0,
        upcoming: BTreeMap::new(),
    };
    for device in devices {
        match device.due_date() {
            Some(Ok(due)) if due < today => stats.expired += 1,
            Some(Ok(due)) => *stats.upcoming.entry(YearMonth::of(due)).or_default() += 1,
            Some(Err(_)) | None => stats.no_inspection += 1,
        }
    }
    stats
}

/// Devices due in one month across all partners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthTotal {
    pub count: usize,

    /// Devices per contributing partner, keyed by `(name, id)` so the map
    /// sorts by name and partners sharing a name stay apart.
    pub companies: BTreeMap<(String, String), usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub partners: usize,
    pub total: usize,
    pub expired: usize,
    pub no_inspection: usize,
    pub upcoming: BTreeMap<YearMonth, MonthTotal>,
}

pub fn aggregate(stats: &[PartnerStats]) -> Summary {
    let mut summary = Summary {
        partners: stats.len(),
        ..Summary::default()
    };
    for partner in stats {
        summary.total += partner.total;
        summary.expired += partner.expired;
        summary.no_inspection += partner.no_inspection;
        for (&month, &count) in &partner.upcoming {
            let entry = summary.upcoming.entry(month).or_default();
            entry.count += count;
            let key = (partner.partner.name.clone(), partner.partner.id.clone());
            *entry.companies.entry(key).or_default() += count;
        }
    }
    summary
}
