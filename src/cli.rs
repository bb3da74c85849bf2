//! CLI interface for rigcal.
//!
//! Commands split into two groups:
//!
//! - `rigcal partner|device|inspection ...`: record keeping, one call each.
//! - `rigcal stats|calendar|schedule ...`: views over one partner
//!   (`--partner <id>`) or every partner at once (`--all`).
//!
//! `schedule` is the only interactive command: it opens a live calendar and
//! reads commands from stdin until `quit`.

mod format;
mod records;
mod report;
mod schedule;

use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::{Zoned, civil::Date};

use crate::{
    calendar::ViewMode,
    config::Config,
    dates::YearMonth,
    model::{Device, Role},
    storage::{DeviceStore, Storage},
};

use records::{DeviceCommand, InspectionCommand, PartnerCommand};

/// Rigcal: negotiate equipment inspection dates on a shared calendar.
#[derive(Debug, Parser)]
#[command(name = "rigcal", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: moving an inspection date
  1. rigcal partner add 'Acme Kft.' --id acme
  2. rigcal device add --partner acme crane-01 --due 2025.03.10
  3. rigcal schedule --partner acme --as owner
     > move 2025-03-10 2025-03-20
  4. rigcal schedule --partner acme --as authority
     > click 2025-03-10

Overview:
  rigcal calendar --all --month 2025-03
  rigcal stats";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage partners: the companies owning inspected equipment.
    Partner {
        #[command(subcommand)]
        command: PartnerCommand,
    },

    /// Manage a partner's devices.
    Device {
        #[command(subcommand)]
        command: DeviceCommand,
    },

    /// Record inspections, which set a device's next due date.
    Inspection {
        #[command(subcommand)]
        command: InspectionCommand,
    },

    /// Expired, missing, and upcoming inspections.
    ///
    /// Covers every partner unless `--partner` is given.
    Stats {
        #[arg(long)]
        partner: Option<String>,
    },

    /// Print one month of the calendar.
    Calendar {
        #[command(flatten)]
        scope: Scope,

        /// Month to show as `YYYY-MM`. Defaults to the current month.
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Open the calendar interactively and negotiate moves.
    ///
    /// With `--all` the calendar is read-only.
    Schedule {
        #[command(flatten)]
        scope: Scope,

        /// Which side you act for. Falls back to `RIGCAL_ROLE`, then the
        /// config file.
        #[arg(long = "as", value_enum)]
        role: Option<RoleArg>,

        /// Month to start on as `YYYY-MM`. Defaults to the current month.
        #[arg(long)]
        month: Option<YearMonth>,
    },
}

/// Which devices a view covers.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct Scope {
    /// A single partner's devices, live and editable.
    #[arg(long)]
    partner: Option<String>,

    /// Every partner's devices, read-only.
    #[arg(long)]
    all: bool,
}

/// CLI-facing role, mapped to the domain `Role`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    /// The equipment-owning partner.
    #[value(alias = "eny")]
    Owner,
    /// The inspecting body.
    #[value(alias = "ejk")]
    Authority,
}

impl RoleArg {
    fn to_domain(self) -> Role {
        match self {
            Self::Owner => Role::Owner,
            Self::Authority => Role::Authority,
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: &Config) -> Result<(), String> {
    let path = config.store_path()?;
    let storage = Storage::open(&path, config.poll_interval())
        .map_err(|e| format!("failed to open store at {}: {e}", path.display()))?;

    match cli.command {
        Command::Partner { command } => records::cmd_partner(&storage, command),
        Command::Device { command } => records::cmd_device(&storage, command),
        Command::Inspection { command } => records::cmd_inspection(&storage, command),
        Command::Stats { partner } => report::cmd_stats(&storage, partner.as_deref(), today()),
        Command::Calendar { scope, month } => {
            let month = month.unwrap_or_else(|| YearMonth::of(today()));
            report::cmd_calendar(&storage, &scope, month)
        }
        Command::Schedule { scope, role, month } => {
            let month = month.unwrap_or_else(|| YearMonth::of(today()));
            schedule::cmd_schedule(
                &storage,
                config,
                &scope,
                role.map(RoleArg::to_domain),
                month,
            )
        }
    }
}

/// Devices loaded for a view, with how the view may treat them.
struct Loaded {
    partner_id: Option<String>,
    devices: Vec<Device>,
    mode: ViewMode,
}

fn load_scope(storage: &Storage, scope: &Scope) -> Result<Loaded, String> {
    if let Some(partner_id) = &scope.partner {
        let devices = storage
            .device_snapshot(partner_id)
            .map_err(|e| format!("failed to load devices: {e}"))?;
        return Ok(Loaded {
            partner_id: Some(partner_id.clone()),
            devices,
            mode: ViewMode::Interactive,
        });
    }

    let partners = storage
        .list_partners()
        .map_err(|e| format!("failed to list partners: {e}"))?;
    let mut devices = Vec::new();
    for partner in &partners {
        let snapshot = storage
            .device_snapshot(&partner.id)
            .map_err(|e| format!("failed to load devices of {}: {e}", partner.id))?;
        devices.extend(snapshot.into_iter().map(|device| Device {
            partner_name: Some(partner.name.clone()),
            ..device
        }));
    }
    Ok(Loaded {
        partner_id: None,
        devices,
        mode: ViewMode::Aggregate,
    })
}

fn today() -> Date {
    Zoned::now().date()
}
