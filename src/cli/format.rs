//! Output formatting for CLI display.

use std::fmt::Write as _;

use jiff::civil::Date;

use crate::{
    calendar::{
        Badge, CalendarCell, DayCell, Disposition, MonthGrid, ParkedBadge, PartnerBreakdown,
    },
    dates::YearMonth,
    model::{Device, MoveRecord, MoveStatus, Partner},
    session::{Ignored, Outcome, Prompt},
    stats::{PartnerStats, Summary},
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub(super) fn month_title(month: YearMonth) -> String {
    let name = usize::try_from(month.month() - 1)
        .ok()
        .and_then(|i| MONTH_NAMES.get(i))
        .copied()
        .unwrap_or("?");
    format!("{name} {}", month.year())
}

pub(super) fn partner_line(partner: &Partner) -> String {
    match &partner.address {
        Some(address) => format!("{}  {}  ({address})", partner.id, partner.name),
        None => format!("{}  {}", partner.id, partner.name),
    }
}

pub(super) fn device_line(device: &Device) -> String {
    let due = match device.due_date() {
        Some(Ok(date)) => date.to_string(),
        Some(Err(_)) => format!("invalid ({})", device.next_due_date.as_deref().unwrap_or("")),
        None => "no inspection".to_string(),
    };
    let mut line = format!("{}  {due}", device.id);
    if let Some(partner) = &device.partner_name {
        let _ = write!(line, "  [{partner}]");
    }
    if let Some(proposal) = &device.proposal {
        let _ = write!(
            line,
            "  -> {} ({}, {})",
            proposal.target_date,
            proposal.initiator,
            status_word(proposal.status)
        );
    }
    line
}

/// A Monday-first month grid. Each day is marked by what it holds:
/// `*` devices due, `+` a proposed move in, `~` due devices moved away or
/// parked.
pub(super) fn month_grid(grid: &MonthGrid) -> String {
    let mut out = format!("{}\n Mo  Tu  We  Th  Fr  Sa  Su\n", month_title(grid.month));
    for week in grid.cells.chunks(7) {
        let row: Vec<String> = week.iter().map(grid_cell).collect();
        out.push_str(row.join("").trim_end());
        out.push('\n');
    }
    out.push_str("* due  + moved in  ~ moved away / parked");
    out
}

fn grid_cell(cell: &CalendarCell) -> String {
    match cell {
        CalendarCell::Blank => "    ".to_string(),
        CalendarCell::Day(day) => format!("{:>3}{}", day.date.day(), marker(day)),
    }
}

fn marker(day: &DayCell) -> char {
    let has = |f: fn(&Badge) -> bool| day.badges.iter().any(f);
    if has(|b| matches!(b, Badge::Proposed { .. })) {
        '+'
    } else if has(|b| matches!(b, Badge::Original { .. })) {
        '*'
    } else if has(|b| matches!(b, Badge::Suppressed { .. })) {
        '~'
    } else {
        ' '
    }
}

/// One line per badge on every busy day of the grid.
pub(super) fn agenda(grid: &MonthGrid) -> String {
    let mut lines = Vec::new();
    for day in grid.busy_days() {
        for badge in &day.badges {
            lines.push(format!("{}  {}", day.date, badge_text(badge)));
        }
    }
    if lines.is_empty() {
        return "Nothing due this month".to_string();
    }
    lines.join("\n")
}

pub(super) fn badge_text(badge: &Badge) -> String {
    match badge {
        Badge::Original { count, .. } => format!("{} due", devices(*count)),
        Badge::Suppressed {
            count,
            disposition: Disposition::MovedTo(target),
        } => format!("{} due, moved to {target}", devices(*count)),
        Badge::Suppressed {
            count,
            disposition: Disposition::Parked,
        } => format!("{} due, parked", devices(*count)),
        Badge::Proposed {
            origin,
            count,
            label,
            ..
        } => format!("{} from {origin} [{}]", devices(*count), label.as_str()),
    }
}

pub(super) fn parking(tray: &[ParkedBadge]) -> String {
    if tray.is_empty() {
        return "Parked: none".to_string();
    }
    let entries: Vec<String> = tray
        .iter()
        .map(|p| format!("{} ({})", p.origin, p.count))
        .collect();
    format!("Parked: {}", entries.join(", "))
}

pub(super) fn breakdown(date: Date, partners: &[PartnerBreakdown]) -> String {
    if partners.is_empty() {
        return format!("{date}: nothing scheduled");
    }
    let mut out = format!("{date}:");
    for p in partners {
        let _ = write!(
            out,
            "\n  {}: {} ({} due, {} moved in)",
            p.partner,
            p.total(),
            p.due,
            p.moved_in
        );
    }
    out
}

pub(super) fn prompt(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Accept(record) => format!("Accept {}? [y/N] ", move_text(record)),
        Prompt::Reset(record) => format!("Remove {}? [y/N] ", move_text(record)),
    }
}

pub(super) fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Proposed(record) => format!("Proposed {}", move_text(record)),
        Outcome::Parked {
            origin,
            cleared: Some(_),
        } => format!("Parked {origin}; its move was removed"),
        Outcome::Parked {
            origin,
            cleared: None,
        } => format!("Parked {origin}"),
        Outcome::Withdrawn(record) => format!("Withdrew {}", move_text(record)),
        Outcome::Accepted(record) => format!("Accepted {}", move_text(record)),
        Outcome::Reset(record) => format!("Removed {}", move_text(record)),
        Outcome::Declined => "Nothing changed".to_string(),
        Outcome::Breakdown { date, partners } => breakdown(*date, partners),
        Outcome::Ignored(Ignored::ReadOnly) => "This calendar is read-only".to_string(),
        Outcome::Ignored(Ignored::InvalidMove) => {
            "A group cannot be moved onto its own date".to_string()
        }
        Outcome::Ignored(Ignored::NotFound) => "Nothing to act on at that date".to_string(),
        Outcome::Ignored(Ignored::NotInteractive) => "Nothing to do".to_string(),
    }
}

fn move_text(record: &MoveRecord) -> String {
    format!(
        "move {} -> {} (by {}, {})",
        record.origin,
        record.proposal.target_date,
        record.proposal.initiator,
        status_word(record.proposal.status)
    )
}

fn status_word(status: MoveStatus) -> &'static str {
    match status {
        MoveStatus::Pending => "pending",
        MoveStatus::Accepted => "accepted",
    }
}

fn devices(count: usize) -> String {
    if count == 1 {
        "1 device".to_string()
    } else {
        format!("{count} devices")
    }
}

pub(super) fn partner_stats(stats: &PartnerStats) -> String {
    let mut out = format!(
        "{}: {} total, {} expired, {} without inspection",
        stats.partner.name,
        devices(stats.total),
        stats.expired,
        stats.no_inspection
    );
    for (month, count) in &stats.upcoming {
        let _ = write!(out, "\n  {month}  {count}");
    }
    out
}

pub(super) fn summary(summary: &Summary) -> String {
    let mut out = format!(
        "All partners ({}): {} total, {} expired, {} without inspection",
        summary.partners,
        devices(summary.total),
        summary.expired,
        summary.no_inspection
    );
    for (month, total) in &summary.upcoming {
        let companies: Vec<String> = total
            .companies
            .iter()
            .map(|((name, _), count)| format!("{name} {count}"))
            .collect();
        let _ = write!(out, "\n  {month}  {}  {}", total.count, companies.join(", "));
    }
    out
}
