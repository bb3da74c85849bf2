//! Calendar projection: month grids of badges, computed from the due-date
//! index and the move ledger.
//!
//! Everything here is a pure function of its inputs. Turning cells into
//! something a person can see and act on is the front end's job.

use std::collections::BTreeMap;

use jiff::civil::Date;

use crate::dates::YearMonth;
use crate::due_index::DueIndex;
use crate::ledger::Ledger;
use crate::model::{MoveStatus, Proposal, Role};

/// Whether the calendar accepts gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// One partner, live, editable.
    Interactive,

    /// All partners at once, read-only, a snapshot taken at open time.
    Aggregate,
}

impl ViewMode {
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// One month laid out on a Monday-first week grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: YearMonth,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    pub fn day(&self, date: Date) -> Option<&DayCell> {
        self.cells.iter().find_map(|cell| match cell {
            CalendarCell::Day(day) if day.date == date => Some(day),
            _ => None,
        })
    }

    /// Days that carry at least one badge.
    pub fn busy_days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(|cell| match cell {
            CalendarCell::Day(day) if !day.badges.is_empty() => Some(day),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    /// Padding before the first day of the month.
    Blank,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: Date,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Badge {
    /// Devices due this day with no move and not parked.
    Original { count: usize, draggable: bool },

    /// Devices due this day whose group has been moved away or parked.
    Suppressed {
        count: usize,
        disposition: Disposition,
    },

    /// A group proposed to move onto this day.
    Proposed {
        origin: Date,
        count: usize,
        label: ProposalLabel,
        draggable: bool,
        clickable: bool,
    },
}

/// Where a suppressed group went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    MovedTo(Date),
    Parked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalLabel {
    OwnerProposed,
    AuthorityProposed,
    Accepted,
}

impl ProposalLabel {
    pub fn of(proposal: &Proposal) -> Self {
        match (proposal.status, proposal.initiator) {
            (MoveStatus::Accepted, _) => Self::Accepted,
            (MoveStatus::Pending, Role::Owner) => Self::OwnerProposed,
            (MoveStatus::Pending, Role::Authority) => Self::AuthorityProposed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OwnerProposed => "owner-proposed",
            Self::AuthorityProposed => "authority-proposed",
            Self::Accepted => "accepted",
        }
    }
}

/// Lays out `month`.
///
/// Moves whose origin group no longer exists (its devices got a new due date
/// in the meantime) are not shown.
pub fn render_month(
    month: YearMonth,
    index: &DueIndex,
    ledger: &Ledger,
    mode: ViewMode,
) -> MonthGrid {
    let leading = month.first_day().weekday().to_monday_zero_offset();
    let mut cells = vec![CalendarCell::Blank; usize::from(leading.unsigned_abs())];
    cells.extend(
        month
            .days()
            .map(|date| CalendarCell::Day(day_cell(date, index, ledger, mode))),
    );
    MonthGrid { month, cells }
}

fn day_cell(date: Date, index: &DueIndex, ledger: &Ledger, mode: ViewMode) -> DayCell {
    let interactive = mode.is_interactive();
    let mut badges = Vec::new();

    let count = index.count(date);
    if count > 0 {
        let disposition = match ledger.get(date) {
            Some(proposal) => Some(Disposition::MovedTo(proposal.target_date)),
            None if ledger.is_parked(date) => Some(Disposition::Parked),
            None => None,
        };
        badges.push(match disposition {
            Some(disposition) => Badge::Suppressed { count, disposition },
            None => Badge::Original {
                count,
                draggable: interactive,
            },
        });
    }

    for record in ledger.moves_into(date) {
        let count = index.count(record.origin);
        if count == 0 {
            continue;
        }
        badges.push(Badge::Proposed {
            origin: record.origin,
            count,
            label: ProposalLabel::of(&record.proposal),
            draggable: interactive,
            clickable: interactive,
        });
    }

    DayCell { date, badges }
}

/// A group waiting in the parking tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkedBadge {
    pub origin: Date,
    pub count: usize,
    pub draggable: bool,
}

pub fn parking_tray(index: &DueIndex, ledger: &Ledger, mode: ViewMode) -> Vec<ParkedBadge> {
    ledger
        .parked()
        .map(|origin| ParkedBadge {
            origin,
            count: index.count(origin),
            draggable: mode.is_interactive(),
        })
        .collect()
}

/// Label for devices without a partner name in aggregate views.
pub const UNKNOWN_PARTNER: &str = "Unknown";

/// Per-partner device counts behind one day of the aggregate calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerBreakdown {
    pub partner: String,

    /// Devices originally due this day.
    pub due: usize,

    /// Devices whose group has a move targeting this day.
    pub moved_in: usize,
}

impl PartnerBreakdown {
    pub fn total(&self) -> usize {
        self.due + self.moved_in
    }
}

/// Who contributes to `date`'s totals, sorted by partner name.
pub fn breakdown(date: Date, index: &DueIndex, ledger: &Ledger) -> Vec<PartnerBreakdown> {
    let mut partners = BTreeMap::new();

    for device in index.group(date) {
        tally(&mut partners, device.partner_name.as_deref()).due += 1;
    }
    for record in ledger.moves_into(date) {
        for device in index.group(record.origin) {
            tally(&mut partners, device.partner_name.as_deref()).moved_in += 1;
        }
    }

    partners.into_values().collect()
}

fn tally<'a>(
    partners: &'a mut BTreeMap<String, PartnerBreakdown>,
    name: Option<&str>,
) -> &'a mut PartnerBreakdown {
    let name = name.unwrap_or(UNKNOWN_PARTNER);
    partners
        .entry(name.to_string())
        .or_insert_with(|| PartnerBreakdown {
            partner: name.to_string(),
            due: 0,
            moved_in: 0,
        })
}
