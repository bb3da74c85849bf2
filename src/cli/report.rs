//! Read-only reports: statistics and a printed calendar month.

use jiff::civil::Date;

use crate::{
    calendar,
    dates::YearMonth,
    due_index::index_by_due_date,
    ledger::Ledger,
    stats,
    storage::{DeviceStore, Storage},
};

use super::{Scope, format, load_scope};

pub(super) fn cmd_stats(
    storage: &Storage,
    partner: Option<&str>,
    today: Date,
) -> Result<(), String> {
    let partners = match partner {
        Some(id) => vec![
            storage
                .load_partner(id)
                .map_err(|e| format!("failed to load partner: {e}"))?,
        ],
        None => storage
            .list_partners()
            .map_err(|e| format!("failed to list partners: {e}"))?,
    };
    if partners.is_empty() {
        println!("No partners");
        return Ok(());
    }

    let mut all = Vec::with_capacity(partners.len());
    for partner in &partners {
        let devices = storage
            .device_snapshot(&partner.id)
            .map_err(|e| format!("failed to load devices of {}: {e}", partner.id))?;
        all.push(stats::partner_stats(partner, &devices, today));
    }

    for partner_stats in &all {
        println!("{}", format::partner_stats(partner_stats));
    }
    if partner.is_none() {
        println!();
        println!("{}", format::summary(&stats::aggregate(&all)));
    }
    Ok(())
}

pub(super) fn cmd_calendar(
    storage: &Storage,
    scope: &Scope,
    month: YearMonth,
) -> Result<(), String> {
    let loaded = load_scope(storage, scope)?;
    let index = index_by_due_date(&loaded.devices);
    let mut ledger = Ledger::new();
    ledger.sync_from_devices(&loaded.devices);

    let grid = calendar::render_month(month, &index, &ledger, loaded.mode);
    println!("{}", format::month_grid(&grid));
    println!();
    println!("{}", format::agenda(&grid));

    if !index.excluded().is_empty() {
        eprintln!(
            "{} device(s) without a usable due date are not shown",
            index.excluded().len()
        );
    }
    Ok(())
}
