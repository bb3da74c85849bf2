//! Device storage: devices, their inspection records, and the
//! [`DeviceStore`] implementation the scheduler runs against.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::model::{Device, Proposal};

use super::{
    ChangeCallback, DeviceStore, Result, Storage, StorageError, Subscription,
    partner::is_constraint_violation,
};

impl Storage {
    /// Registers a new device under an existing partner.
    pub fn create_device(&self, partner_id: &str, device_id: &str) -> Result<()> {
        let conn = self.conn()?;
        ensure_partner(&conn, partner_id)?;
        let inserted = conn.execute(
            "INSERT INTO device (partner_id, id) VALUES (?1, ?2)",
            [partner_id, device_id],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(StorageError::DeviceAlreadyExists {
                partner_id: partner_id.to_string(),
                device_id: device_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends an inspection record. Its `next_due` becomes the device's due
    /// date until a later record supersedes it.
    pub fn record_inspection(
        &self,
        partner_id: &str,
        device_id: &str,
        next_due: &str,
        recorded_at: Timestamp,
    ) -> Result<()> {
        let conn = self.conn()?;
        ensure_device(&conn, partner_id, device_id)?;
        conn.execute(
            "INSERT INTO inspection (partner_id, device_id, recorded_at, next_due)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![partner_id, device_id, recorded_at.to_string(), next_due],
        )?;
        Ok(())
    }
}

impl DeviceStore for Storage {
    fn device_snapshot(&self, partner_id: &str) -> Result<Vec<Device>> {
        let conn = self.conn()?;
        ensure_partner(&conn, partner_id)?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.proposal,
                    (SELECT i.next_due FROM inspection i
                     WHERE i.partner_id = d.partner_id AND i.device_id = d.id
                     ORDER BY i.rowid DESC LIMIT 1)
             FROM device d
             WHERE d.partner_id = ?1
             ORDER BY d.id",
        )?;
        let rows = stmt
            .query_map([partner_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .map(|(id, proposal, next_due)| {
                let proposal = decode_proposal(&id, proposal.as_deref());
                Device {
                    next_due_date: next_due,
                    proposal,
                    ..Device::new(id)
                }
            })
            .collect())
    }

    fn subscribe(&self, partner_id: &str, on_change: ChangeCallback) -> Result<Subscription> {
        self.watch(partner_id, on_change)
    }

    fn apply_proposal(
        &self,
        partner_id: &str,
        device_ids: &[String],
        proposal: Option<&Proposal>,
    ) -> Result<()> {
        let encoded = proposal.map(serde_json::to_string).transpose()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for device_id in device_ids {
            let rows = tx.execute(
                "UPDATE device SET proposal = ?1 WHERE partner_id = ?2 AND id = ?3",
                rusqlite::params![encoded, partner_id, device_id],
            )?;
            if rows == 0 {
                // Dropping the transaction rolls back the devices already written.
                return Err(StorageError::DeviceNotFound {
                    partner_id: partner_id.to_string(),
                    device_id: device_id.clone(),
                });
            }
        }
        tx.commit()?;
        debug!(
            partner_id,
            devices = device_ids.len(),
            cleared = proposal.is_none(),
            "applied proposal"
        );
        Ok(())
    }
}

/// Decodes a stored proposal. Unreadable values are logged and treated as
/// absent rather than failing the whole snapshot.
pub(super) fn decode_proposal(device_id: &str, raw: Option<&str>) -> Option<Proposal> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(proposal) => Some(proposal),
        Err(e) => {
            warn!(device_id, error = %e, "ignoring unreadable proposal");
            None
        }
    }
}

fn ensure_partner(conn: &Connection, partner_id: &str) -> Result<()> {
    conn.query_row("SELECT 1 FROM partner WHERE id = ?1", [partner_id], |_| Ok(()))
        .optional()?
        .ok_or_else(|| StorageError::PartnerNotFound(partner_id.to_string()))
}

fn ensure_device(conn: &Connection, partner_id: &str, device_id: &str) -> Result<()> {
    conn.query_row(
        "SELECT 1 FROM device WHERE partner_id = ?1 AND id = ?2",
        [partner_id, device_id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(|| StorageError::DeviceNotFound {
        partner_id: partner_id.to_string(),
        device_id: device_id.to_string(),
    })
}
