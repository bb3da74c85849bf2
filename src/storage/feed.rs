//! Change feed: delivers device rows written by any process sharing the
//! store.
//!
//! Triggers append every insert or update of a device to `device_change`.
//! A background thread polls that table past the last sequence number it
//! has seen and hands the changed devices to the subscriber.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::model::Device;

use super::{ChangeCallback, Result, Storage, Subscription, connect, device::decode_proposal};

impl Storage {
    /// Starts a feed for `partner_id`. Only writes made after this call are
    /// delivered.
    ///
    /// The callback runs on the feed thread; it must not cancel its own
    /// subscription.
    pub(super) fn watch(
        &self,
        partner_id: &str,
        mut on_change: ChangeCallback,
    ) -> Result<Subscription> {
        let conn = connect(&self.path)?;
        let mut cursor = latest_seq(&conn)?;
        let stop = Arc::new(AtomicBool::new(false));
        let interval = self.poll_interval;
        let partner = partner_id.to_string();

        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("rigcal-feed-{partner_id}"))
            .spawn(move || {
                debug!(partner_id = %partner, "change feed started");
                while !flag.load(Ordering::Acquire) {
                    thread::park_timeout(interval);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    match changes_since(&conn, &partner, cursor) {
                        Ok((_, seq)) if seq == cursor => {}
                        Ok((devices, seq)) => {
                            cursor = seq;
                            if !devices.is_empty() {
                                on_change(devices);
                            }
                        }
                        Err(e) => {
                            warn!(partner_id = %partner, error = %e, "change feed poll failed");
                        }
                    }
                }
                debug!(partner_id = %partner, "change feed stopped");
            })?;

        Ok(Subscription::new(move || {
            stop.store(true, Ordering::Release);
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("change feed thread panicked");
            }
        }))
    }
}

fn latest_seq(conn: &Connection) -> Result<i64> {
    let seq = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM device_change", [], |row| {
        row.get(0)
    })?;
    Ok(seq)
}

/// Devices of `partner_id` changed after `cursor`, each listed once, and the
/// new cursor.
fn changes_since(conn: &Connection, partner_id: &str, cursor: i64) -> Result<(Vec<Device>, i64)> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.seq, c.partner_id, d.id, d.proposal
         FROM device_change c
         JOIN device d ON d.partner_id = c.partner_id AND d.id = c.device_id
         WHERE c.seq > ?1
         ORDER BY c.seq",
    )?;
    let rows = stmt
        .query_map([cursor], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut latest = cursor;
    let mut seen = HashSet::new();
    let mut devices = Vec::new();
    for (seq, owner, id, proposal) in rows {
        latest = latest.max(seq);
        if owner != partner_id || !seen.insert(id.clone()) {
            continue;
        }
        let proposal = decode_proposal(&id, proposal.as_deref());
        devices.push(Device {
            proposal,
            ..Device::new(id)
        });
    }
    Ok((devices, latest))
}
