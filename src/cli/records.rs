//! Record keeping commands: partners, devices, inspections.

use clap::Subcommand;
use jiff::Timestamp;
use uuid::Uuid;

use crate::{
    dates::parse_due_date,
    model::Partner,
    storage::{DeviceStore, Storage},
};

use super::format;

#[derive(Debug, Subcommand)]
pub enum PartnerCommand {
    /// Register a partner. Prints its ID.
    Add {
        /// Company name.
        name: String,

        /// ID to use instead of a generated one.
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// List partners by name.
    List,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Register a device under a partner.
    Add {
        #[arg(long)]
        partner: String,

        /// Device ID, unique within the partner (e.g. a serial number).
        id: String,

        /// Next inspection due date, recorded as an initial inspection.
        #[arg(long)]
        due: Option<String>,
    },

    /// List a partner's devices with their due dates.
    List {
        #[arg(long)]
        partner: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum InspectionCommand {
    /// Record an inspection and the date the next one is due.
    Add {
        #[arg(long)]
        partner: String,

        device: String,

        /// e.g. `2026.03.10` or `2026-03-10`.
        next_due: String,
    },
}

pub(super) fn cmd_partner(storage: &Storage, command: PartnerCommand) -> Result<(), String> {
    match command {
        PartnerCommand::Add { name, id, address } => {
            let partner = Partner {
                id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                name,
                address,
            };
            storage
                .create_partner(&partner)
                .map_err(|e| format!("failed to create partner: {e}"))?;
            println!("{}", partner.id);
            Ok(())
        }
        PartnerCommand::List => {
            let partners = storage
                .list_partners()
                .map_err(|e| format!("failed to list partners: {e}"))?;
            if partners.is_empty() {
                println!("No partners");
                return Ok(());
            }
            for partner in &partners {
                println!("{}", format::partner_line(partner));
            }
            Ok(())
        }
    }
}

pub(super) fn cmd_device(storage: &Storage, command: DeviceCommand) -> Result<(), String> {
    match command {
        DeviceCommand::Add { partner, id, due } => {
            if let Some(due) = &due {
                parse_due_date(due).map_err(|e| e.to_string())?;
            }
            storage
                .create_device(&partner, &id)
                .map_err(|e| format!("failed to create device: {e}"))?;
            if let Some(due) = &due {
                storage
                    .record_inspection(&partner, &id, due, Timestamp::now())
                    .map_err(|e| format!("failed to record inspection: {e}"))?;
            }
            eprintln!("Device {id} added to {partner}");
            Ok(())
        }
        DeviceCommand::List { partner } => {
            let devices = storage
                .device_snapshot(&partner)
                .map_err(|e| format!("failed to load devices: {e}"))?;
            if devices.is_empty() {
                println!("No devices");
                return Ok(());
            }
            for device in &devices {
                println!("{}", format::device_line(device));
            }
            Ok(())
        }
    }
}

pub(super) fn cmd_inspection(storage: &Storage, command: InspectionCommand) -> Result<(), String> {
    match command {
        InspectionCommand::Add {
            partner,
            device,
            next_due,
        } => {
            let due = parse_due_date(&next_due).map_err(|e| e.to_string())?;
            storage
                .record_inspection(&partner, &device, &next_due, Timestamp::now())
                .map_err(|e| format!("failed to record inspection: {e}"))?;
            eprintln!("Inspection recorded for {device}; next due {due}");
            Ok(())
        }
    }
}
