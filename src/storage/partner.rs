//! Partner storage: create, load, and list partners.

use rusqlite::{ErrorCode, OptionalExtension};

use crate::model::Partner;

use super::{Result, Storage, StorageError};

impl Storage {
    pub fn create_partner(&self, partner: &Partner) -> Result<()> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO partner (id, name, address) VALUES (?1, ?2, ?3)",
            rusqlite::params![&partner.id, &partner.name, &partner.address],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StorageError::PartnerAlreadyExists(partner.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_partner(&self, id: &str) -> Result<Partner> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, address FROM partner WHERE id = ?1",
            [id],
            |row| {
                Ok(Partner {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    address: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::PartnerNotFound(id.to_string()))
    }

    /// All partners, ordered by name.
    pub fn list_partners(&self) -> Result<Vec<Partner>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, address FROM partner ORDER BY name, id")?;
        let partners = stmt
            .query_map([], |row| {
                Ok(Partner {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    address: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(partners)
    }
}

pub(super) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}
