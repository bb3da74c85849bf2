//! Move ledger: the in-memory state of reschedule proposals.
//!
//! One move per origin date. The ledger is a cache rebuilt from the
//! `proposal` field on each device; the device collection is the source of
//! truth. Parking is purely session-local and survives rebuilds.
//!
//! Proposal state machine, per origin date:
//!
//! ```text
//!             propose(role)               respond(other role)
//!   (none) ───────────────▶ pending(role) ───────────────────▶ accepted
//!      ▲                        │                                 │
//!      └── respond(same role) ──┘                                 │
//!      └── reset / park ──────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use jiff::civil::Date;
use tracing::debug;

use crate::model::{Device, MoveRecord, MoveStatus, Proposal, Role};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("cannot move {0} onto itself")]
    InvalidMove(Date),

    #[error("no move recorded for {0}")]
    NotFound(Date),
}

pub type Result<T> = core::result::Result<T, LedgerError>;

/// What responding to a move does for a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// The initiator takes back its own pending proposal.
    Withdraw,

    /// The counter-party accepts a pending proposal.
    Accept,

    /// The move is already accepted; only an explicit, confirmed reset
    /// can remove it.
    ResetRequired,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    moves: BTreeMap<Date, Proposal>,
    parked: BTreeSet<Date>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the moves from the proposals stored on `devices`.
    ///
    /// Each proposal is keyed by its device's current due date. Devices of one
    /// group normally agree; after a partial write they may not, in which case
    /// the last device scanned wins and the next write heals the group.
    pub fn sync_from_devices(&mut self, devices: &[Device]) {
        let mut moves = BTreeMap::new();
        for device in devices {
            let Some(proposal) = device.proposal else {
                continue;
            };
            let Some(Ok(origin)) = device.due_date() else {
                continue;
            };
            if let Some(previous) = moves.insert(origin, proposal)
                && previous != proposal
            {
                debug!(
                    %origin,
                    device_id = %device.id,
                    "divergent proposals in group; keeping the last"
                );
            }
        }
        self.moves = moves;
    }

    pub fn get(&self, origin: Date) -> Option<&Proposal> {
        self.moves.get(&origin)
    }

    pub fn record(&self, origin: Date) -> Option<MoveRecord> {
        self.get(origin).map(|&proposal| MoveRecord { origin, proposal })
    }

    /// All moves in origin order.
    pub fn moves(&self) -> impl Iterator<Item = MoveRecord> + '_ {
        self.moves.iter().map(|(&origin, &proposal)| MoveRecord { origin, proposal })
    }

    /// Moves whose target is `target`, in origin order.
    pub fn moves_into(&self, target: Date) -> impl Iterator<Item = MoveRecord> + '_ {
        self.moves().filter(move |m| m.proposal.target_date == target)
    }

    pub fn is_parked(&self, origin: Date) -> bool {
        self.parked.contains(&origin)
    }

    pub fn parked(&self) -> impl Iterator<Item = Date> + '_ {
        self.parked.iter().copied()
    }

    /// Proposes moving `origin`'s group to `target`, replacing any existing move.
    pub fn propose(&mut self, origin: Date, target: Date, initiator: Role) -> Result<Proposal> {
        if origin == target {
            return Err(LedgerError::InvalidMove(origin));
        }
        let proposal = Proposal::pending(target, initiator);
        self.parked.remove(&origin);
        self.moves.insert(origin, proposal);
        Ok(proposal)
    }

    /// What [`respond`](Self::respond) would do, without doing it.
    pub fn pending_response(&self, origin: Date, role: Role) -> Result<Response> {
        let proposal = self.get(origin).ok_or(LedgerError::NotFound(origin))?;
        Ok(match proposal.status {
            MoveStatus::Accepted => Response::ResetRequired,
            MoveStatus::Pending if proposal.initiator == role => Response::Withdraw,
            MoveStatus::Pending => Response::Accept,
        })
    }

    /// Applies `role`'s response to the move for `origin`.
    ///
    /// Accepted moves are left untouched; see [`Response::ResetRequired`].
    pub fn respond(&mut self, origin: Date, role: Role) -> Result<Response> {
        let response = self.pending_response(origin, role)?;
        match response {
            Response::Withdraw => {
                self.moves.remove(&origin);
            }
            Response::Accept => {
                if let Some(proposal) = self.moves.get_mut(&origin) {
                    *proposal = proposal.accepted();
                }
            }
            Response::ResetRequired => {}
        }
        Ok(response)
    }

    /// Parks `origin`, dropping its move if it had one.
    pub fn park(&mut self, origin: Date) -> Option<Proposal> {
        self.parked.insert(origin);
        self.moves.remove(&origin)
    }

    /// Removes the move for `origin` regardless of who proposed it.
    pub fn reset(&mut self, origin: Date) -> Result<Proposal> {
        self.moves
            .remove(&origin)
            .ok_or(LedgerError::NotFound(origin))
    }
}
