//! Scheduler session: one open calendar, its held device list, and the
//! gestures a user can apply to it.
//!
//! The session keeps the device list as the source of truth and re-derives
//! the due-date index and the ledger from it. Ledger changes are made in
//! memory first and then fanned out to every device of the moved group;
//! remote changes arrive through [`Feed`] and are applied by [`pump`].
//!
//! [`pump`]: SchedulerSession::pump

use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    calendar::{self, MonthGrid, ParkedBadge, PartnerBreakdown, ViewMode},
    dates::YearMonth,
    due_index::{DueIndex, index_by_due_date},
    ledger::{Ledger, LedgerError, Response},
    model::{Device, FanOut, MoveRecord, Proposal, Role},
    storage::{DeviceStore, StorageError},
    sync::{Feed, merge_changes},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("an interactive session needs a partner")]
    MissingPartner,

    #[error("could not open change feed: {0}")]
    Feed(#[source] StorageError),

    #[error("could not refresh devices after subscribing: {0}")]
    Refresh(#[source] StorageError),

    /// The move was applied locally but not saved. Retrying the gesture
    /// writes it again.
    #[error("could not save the move of {origin}: {source}")]
    Persistence {
        origin: Date,
        #[source]
        source: StorageError,
    },
}

pub type Result<T> = core::result::Result<T, SessionError>;

/// A user action on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// A badge for `origin`'s group was dragged and released.
    Drop { origin: Date, onto: DropTarget },

    ClickProposal { origin: Date },

    ClickOriginal { date: Date },

    ClickDay { date: Date },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Day(Date),
    ParkingTray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Proposed(MoveRecord),

    /// `cleared` is the move that parking removed, if there was one.
    Parked {
        origin: Date,
        cleared: Option<Proposal>,
    },

    Withdrawn(MoveRecord),

    /// Carries the move as it was before acceptance.
    Accepted(MoveRecord),

    Reset(MoveRecord),

    /// The user answered no to a confirmation.
    Declined,

    Breakdown {
        date: Date,
        partners: Vec<PartnerBreakdown>,
    },

    Ignored(Ignored),
}

/// Why a gesture did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    ReadOnly,
    InvalidMove,
    NotFound,
    NotInteractive,
}

/// A question the session needs answered before it goes ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Accept the counter-party's proposal?
    Accept(MoveRecord),

    /// Delete an agreed (or pending) move?
    Reset(MoveRecord),
}

pub trait Confirm {
    fn confirm(&mut self, prompt: &Prompt) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&Prompt) -> bool,
{
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        self(prompt)
    }
}

pub struct SchedulerSession<'s> {
    store: &'s dyn DeviceStore,
    partner_id: Option<String>,
    role: Role,
    mode: ViewMode,
    month: YearMonth,
    devices: Vec<Device>,
    index: DueIndex,
    ledger: Ledger,
    feed: Option<Feed>,
}

impl<'s> SchedulerSession<'s> {
    /// Opens a session over `devices`, showing `month`.
    ///
    /// Interactive sessions subscribe to `partner_id`'s change feed, then
    /// merge a fresh snapshot into `devices` so writes landing between the
    /// caller's snapshot and the subscription are not lost.
    pub fn open(
        store: &'s dyn DeviceStore,
        partner_id: Option<String>,
        mut devices: Vec<Device>,
        role: Role,
        mode: ViewMode,
        month: YearMonth,
    ) -> Result<Self> {
        let feed = match (mode, partner_id.as_deref()) {
            (ViewMode::Interactive, Some(partner)) => {
                let feed = Feed::open(store, partner).map_err(SessionError::Feed)?;
                let fresh = store
                    .device_snapshot(partner)
                    .map_err(SessionError::Refresh)?;
                let changed = merge_changes(&mut devices, fresh);
                if changed > 0 {
                    debug!(partner_id = partner, changed, "caught up on open");
                }
                Some(feed)
            }
            (ViewMode::Interactive, None) => return Err(SessionError::MissingPartner),
            (ViewMode::Aggregate, _) => None,
        };

        let mut session = Self {
            store,
            partner_id,
            role,
            mode,
            month,
            devices,
            index: DueIndex::default(),
            ledger: Ledger::new(),
            feed,
        };
        session.rederive();
        info!(
            partner_id = session.partner_id.as_deref().unwrap_or("*"),
            %role,
            devices = session.devices.len(),
            interactive = mode.is_interactive(),
            "scheduler session opened"
        );
        Ok(session)
    }

    /// Closes the session, stopping its change feed.
    pub fn close(mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
        debug!("scheduler session closed");
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The current month's grid.
    pub fn view(&self) -> MonthGrid {
        calendar::render_month(self.month, &self.index, &self.ledger, self.mode)
    }

    pub fn parking_tray(&self) -> Vec<ParkedBadge> {
        calendar::parking_tray(&self.index, &self.ledger, self.mode)
    }

    /// Whether `origin`'s group has a move, pending or accepted.
    pub fn has_move(&self, origin: Date) -> bool {
        self.ledger.get(origin).is_some()
    }

    /// Devices due on `date`.
    pub fn details(&self, date: Date) -> &[Device] {
        self.index.group(date)
    }

    pub fn show_month(&mut self, month: YearMonth) {
        self.month = month;
    }

    pub fn next_month(&mut self) {
        self.month = self.month.next();
    }

    pub fn prev_month(&mut self) {
        self.month = self.month.prev();
    }

    /// Applies every change batch received so far. Returns the number of
    /// devices that changed.
    pub fn pump(&mut self) -> usize {
        let Some(feed) = &self.feed else {
            return 0;
        };
        let changes = feed.drain();
        if changes.is_empty() {
            return 0;
        }
        let changed = merge_changes(&mut self.devices, changes);
        if changed > 0 {
            debug!(changed, "applied remote changes");
            self.rederive();
        }
        changed
    }

    pub fn handle(&mut self, gesture: Gesture, confirm: &mut dyn Confirm) -> Result<Outcome> {
        match gesture {
            Gesture::Drop { .. } | Gesture::ClickProposal { .. } if !self.mode.is_interactive() => {
                Ok(Outcome::Ignored(Ignored::ReadOnly))
            }
            Gesture::Drop { origin, .. } if !self.index.contains(origin) => {
                Ok(Outcome::Ignored(Ignored::NotFound))
            }
            Gesture::Drop {
                origin,
                onto: DropTarget::Day(target),
            } => self.propose(origin, target),
            Gesture::Drop {
                origin,
                onto: DropTarget::ParkingTray,
            } => self.park(origin),
            Gesture::ClickProposal { origin } => self.respond(origin, confirm),
            Gesture::ClickDay { date } if !self.mode.is_interactive() => Ok(Outcome::Breakdown {
                date,
                partners: calendar::breakdown(date, &self.index, &self.ledger),
            }),
            Gesture::ClickOriginal { .. } | Gesture::ClickDay { .. } => {
                Ok(Outcome::Ignored(Ignored::NotInteractive))
            }
        }
    }

    /// Deletes the move for `origin` after confirmation, whoever proposed it.
    pub fn reset(&mut self, origin: Date, confirm: &mut dyn Confirm) -> Result<Outcome> {
        if !self.mode.is_interactive() {
            return Ok(Outcome::Ignored(Ignored::ReadOnly));
        }
        let Some(record) = self.ledger.record(origin) else {
            return Ok(Outcome::Ignored(Ignored::NotFound));
        };
        if !confirm.confirm(&Prompt::Reset(record)) {
            return Ok(Outcome::Declined);
        }
        if self.ledger.reset(origin).is_err() {
            return Ok(Outcome::Ignored(Ignored::NotFound));
        }
        self.persist(origin, None)?;
        Ok(Outcome::Reset(record))
    }

    fn propose(&mut self, origin: Date, target: Date) -> Result<Outcome> {
        let proposal = match self.ledger.propose(origin, target, self.role) {
            Ok(proposal) => proposal,
            Err(LedgerError::InvalidMove(_)) => return Ok(Outcome::Ignored(Ignored::InvalidMove)),
            Err(LedgerError::NotFound(_)) => return Ok(Outcome::Ignored(Ignored::NotFound)),
        };
        self.persist(origin, Some(proposal))?;
        Ok(Outcome::Proposed(MoveRecord { origin, proposal }))
    }

    fn park(&mut self, origin: Date) -> Result<Outcome> {
        let cleared = self.ledger.park(origin);
        if cleared.is_some() {
            self.persist(origin, None)?;
        }
        Ok(Outcome::Parked { origin, cleared })
    }

    fn respond(&mut self, origin: Date, confirm: &mut dyn Confirm) -> Result<Outcome> {
        let Some(record) = self.ledger.record(origin) else {
            return Ok(Outcome::Ignored(Ignored::NotFound));
        };
        let Ok(response) = self.ledger.pending_response(origin, self.role) else {
            return Ok(Outcome::Ignored(Ignored::NotFound));
        };
        match response {
            Response::Withdraw => {
                self.ledger.respond(origin, self.role).ok();
                self.persist(origin, None)?;
                Ok(Outcome::Withdrawn(record))
            }
            Response::Accept => {
                if !confirm.confirm(&Prompt::Accept(record)) {
                    return Ok(Outcome::Declined);
                }
                self.ledger.respond(origin, self.role).ok();
                self.persist(origin, Some(record.proposal.accepted()))?;
                Ok(Outcome::Accepted(record))
            }
            Response::ResetRequired => self.reset(origin, confirm),
        }
    }

    /// Writes `proposal` to every device of `origin`'s group.
    ///
    /// On success the held devices are updated the way the store will report
    /// them, so the echo from the change feed is a no-op. On failure the
    /// ledger keeps its in-memory change.
    fn persist(&mut self, origin: Date, proposal: Option<Proposal>) -> Result<()> {
        let fan_out = FanOut {
            origin,
            device_ids: self.index.device_ids(origin),
            proposal,
        };
        let Some(partner_id) = self.partner_id.as_deref() else {
            return Ok(());
        };
        if fan_out.device_ids.is_empty() {
            return Ok(());
        }

        if let Err(source) =
            self.store
                .apply_proposal(partner_id, &fan_out.device_ids, fan_out.proposal.as_ref())
        {
            warn!(%origin, error = %source, "move kept locally but not saved");
            return Err(SessionError::Persistence { origin, source });
        }
        info!(
            partner_id,
            %origin,
            devices = fan_out.device_ids.len(),
            target = ?fan_out.proposal.map(|p| p.target_date),
            "saved move"
        );

        for device in &mut self.devices {
            if fan_out.device_ids.contains(&device.id) {
                device.proposal = fan_out.proposal;
            }
        }
        self.rederive();
        Ok(())
    }

    fn rederive(&mut self) {
        self.index = index_by_due_date(&self.devices);
        self.ledger.sync_from_devices(&self.devices);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::{Timestamp, civil::date};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        calendar::{Badge, Disposition, ProposalLabel},
        model::{MoveStatus, Partner},
        storage::{Storage, memory::MemoryStore},
    };

    const ORIGIN: Date = date(2025, 3, 10);
    const TARGET: Date = date(2025, 3, 20);

    fn march() -> YearMonth {
        "2025-03".parse().unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            "p1",
            [
                Device::new("d1").due("2025.03.10"),
                Device::new("d2").due("2025.03.10"),
                Device::new("d3").due("2025.03.12"),
            ],
        );
        store
    }

    fn open(store: &MemoryStore, role: Role) -> SchedulerSession<'_> {
        let devices = store.device_snapshot("p1").unwrap();
        SchedulerSession::open(
            store,
            Some("p1".to_string()),
            devices,
            role,
            ViewMode::Interactive,
            march(),
        )
        .unwrap()
    }

    fn drag(origin: Date, target: Date) -> Gesture {
        Gesture::Drop {
            origin,
            onto: DropTarget::Day(target),
        }
    }

    fn park(origin: Date) -> Gesture {
        Gesture::Drop {
            origin,
            onto: DropTarget::ParkingTray,
        }
    }

    fn yes(_: &Prompt) -> bool {
        true
    }

    fn no(_: &Prompt) -> bool {
        false
    }

    fn never(prompt: &Prompt) -> bool {
        panic!("unexpected confirmation: {prompt:?}")
    }

    fn badges(session: &SchedulerSession<'_>, day: Date) -> Vec<Badge> {
        session.view().day(day).unwrap().badges.clone()
    }

    #[test]
    fn owner_proposes_and_authority_accepts() {
        let store = seeded_store();
        let mut owner = open(&store, Role::Owner);
        let mut authority = open(&store, Role::Authority);

        let outcome = owner.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        let proposed = Proposal::pending(TARGET, Role::Owner);
        assert_eq!(
            outcome,
            Outcome::Proposed(MoveRecord {
                origin: ORIGIN,
                proposal: proposed,
            })
        );
        assert_eq!(store.writes(), 1);
        assert_eq!(store.device("p1", "d1").unwrap().proposal, Some(proposed));
        assert_eq!(store.device("p1", "d2").unwrap().proposal, Some(proposed));
        assert_eq!(store.device("p1", "d3").unwrap().proposal, None);

        // The echo of our own write changes nothing.
        assert_eq!(owner.pump(), 0);

        assert_eq!(authority.pump(), 2);
        assert_eq!(authority.ledger().get(ORIGIN), Some(&proposed));
        assert_eq!(
            badges(&authority, TARGET),
            [Badge::Proposed {
                origin: ORIGIN,
                count: 2,
                label: ProposalLabel::OwnerProposed,
                draggable: true,
                clickable: true,
            }]
        );
        assert_eq!(
            badges(&authority, ORIGIN),
            [Badge::Suppressed {
                count: 2,
                disposition: Disposition::MovedTo(TARGET),
            }]
        );

        let mut asked = Vec::new();
        let outcome = authority
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut |p: &Prompt| {
                asked.push(*p);
                true
            })
            .unwrap();
        let record = MoveRecord {
            origin: ORIGIN,
            proposal: proposed,
        };
        assert_eq!(asked, [Prompt::Accept(record)]);
        assert_eq!(outcome, Outcome::Accepted(record));

        owner.pump();
        let accepted = owner.ledger().get(ORIGIN).unwrap();
        assert_eq!(accepted.status, MoveStatus::Accepted);
        assert_eq!(accepted.initiator, Role::Owner);
        assert!(matches!(
            badges(&owner, TARGET)[0],
            Badge::Proposed {
                label: ProposalLabel::Accepted,
                ..
            }
        ));
    }

    #[test]
    fn same_day_drop_is_ignored_without_write() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        let outcome = session.handle(drag(ORIGIN, ORIGIN), &mut never).unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::InvalidMove));
        assert_eq!(store.writes(), 0);
        assert_eq!(session.ledger().moves().count(), 0);
    }

    #[test]
    fn drag_from_unknown_date_is_ignored() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        let outcome = session
            .handle(drag(date(2025, 3, 11), TARGET), &mut never)
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::NotFound));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn clicking_an_original_does_nothing() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        let outcome = session
            .handle(Gesture::ClickOriginal { date: ORIGIN }, &mut never)
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::NotInteractive));
    }

    #[test]
    fn failed_write_keeps_local_move() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);
        store.fail_writes(true);

        let err = session.handle(drag(ORIGIN, TARGET), &mut never).unwrap_err();
        assert!(matches!(err, SessionError::Persistence { origin, .. } if origin == ORIGIN));
        assert_eq!(
            session.ledger().get(ORIGIN),
            Some(&Proposal::pending(TARGET, Role::Owner))
        );
        assert_eq!(store.device("p1", "d1").unwrap().proposal, None);

        // Retrying once the store recovers saves it.
        store.fail_writes(false);
        session.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn own_pending_proposal_is_withdrawn_without_asking() {
        let store = seeded_store();
        let mut session = open(&store, Role::Authority);
        session.handle(drag(ORIGIN, TARGET), &mut never).unwrap();

        let outcome = session
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut never)
            .unwrap();
        assert!(matches!(outcome, Outcome::Withdrawn(_)));
        assert!(session.ledger().get(ORIGIN).is_none());
        assert_eq!(store.device("p1", "d1").unwrap().proposal, None);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn declined_accept_changes_nothing() {
        let store = seeded_store();
        let mut owner = open(&store, Role::Owner);
        let mut authority = open(&store, Role::Authority);
        owner.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        authority.pump();

        let outcome = authority
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut no)
            .unwrap();
        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(
            authority.ledger().get(ORIGIN).unwrap().status,
            MoveStatus::Pending
        );
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn accepted_move_needs_confirmed_reset() {
        let store = seeded_store();
        let mut owner = open(&store, Role::Owner);
        let mut authority = open(&store, Role::Authority);
        owner.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        authority.pump();
        authority
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut yes)
            .unwrap();
        owner.pump();

        let outcome = owner
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut no)
            .unwrap();
        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(
            owner.ledger().get(ORIGIN).unwrap().status,
            MoveStatus::Accepted
        );

        let mut asked = Vec::new();
        let outcome = owner
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut |p: &Prompt| {
                asked.push(*p);
                true
            })
            .unwrap();
        assert!(matches!(outcome, Outcome::Reset(_)));
        assert!(matches!(asked[..], [Prompt::Reset(_)]));
        assert!(owner.ledger().get(ORIGIN).is_none());

        authority.pump();
        assert!(authority.ledger().get(ORIGIN).is_none());
    }

    #[test]
    fn explicit_reset_of_missing_move() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        let outcome = session.reset(ORIGIN, &mut never).unwrap();
        assert_eq!(outcome, Outcome::Ignored(Ignored::NotFound));
    }

    #[test]
    fn parking_after_acceptance_clears_the_move() {
        let store = seeded_store();
        let mut owner = open(&store, Role::Owner);
        let mut authority = open(&store, Role::Authority);
        owner.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        authority.pump();
        authority
            .handle(Gesture::ClickProposal { origin: ORIGIN }, &mut yes)
            .unwrap();
        owner.pump();

        let outcome = owner.handle(park(ORIGIN), &mut never).unwrap();
        let Outcome::Parked { origin, cleared } = outcome else {
            panic!("expected parked, got {outcome:?}");
        };
        assert_eq!(origin, ORIGIN);
        assert_eq!(cleared.unwrap().status, MoveStatus::Accepted);
        assert!(owner.ledger().get(ORIGIN).is_none());
        assert!(badges(&owner, TARGET).is_empty());
        assert_eq!(
            badges(&owner, ORIGIN),
            [Badge::Suppressed {
                count: 2,
                disposition: Disposition::Parked,
            }]
        );
        assert_eq!(owner.parking_tray().len(), 1);

        // Parking is local: the other side just sees the move gone.
        authority.pump();
        assert!(authority.ledger().get(ORIGIN).is_none());
        assert!(matches!(
            badges(&authority, ORIGIN)[..],
            [Badge::Original { count: 2, .. }]
        ));
    }

    #[test]
    fn parking_without_move_does_not_write() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        let outcome = session.handle(park(ORIGIN), &mut never).unwrap();
        assert_eq!(
            outcome,
            Outcome::Parked {
                origin: ORIGIN,
                cleared: None,
            }
        );
        assert_eq!(store.writes(), 0);

        // Dragging out of the tray proposes and unparks.
        session.handle(drag(ORIGIN, TARGET), &mut never).unwrap();
        assert!(session.parking_tray().is_empty());
    }

    #[test]
    fn aggregate_view_is_read_only() {
        let store = seeded_store();
        let mut devices = store.device_snapshot("p1").unwrap();
        for device in &mut devices {
            device.partner_name = Some("Acme".to_string());
        }
        let mut other = Device::new("x1").due("2025-03-20");
        other.partner_name = Some("Beta".to_string());
        devices.push(other);

        let mut session = SchedulerSession::open(
            &store,
            None,
            devices,
            Role::Authority,
            ViewMode::Aggregate,
            march(),
        )
        .unwrap();
        assert_eq!(store.subscriber_count(), 0);

        for gesture in [
            drag(ORIGIN, TARGET),
            park(ORIGIN),
            Gesture::ClickProposal { origin: ORIGIN },
        ] {
            assert_eq!(
                session.handle(gesture, &mut never).unwrap(),
                Outcome::Ignored(Ignored::ReadOnly)
            );
        }
        assert_eq!(
            session.reset(ORIGIN, &mut never).unwrap(),
            Outcome::Ignored(Ignored::ReadOnly)
        );
        assert_eq!(store.writes(), 0);
        assert!(matches!(
            badges(&session, ORIGIN)[..],
            [Badge::Original {
                count: 2,
                draggable: false,
            }]
        ));

        let outcome = session
            .handle(Gesture::ClickDay { date: ORIGIN }, &mut never)
            .unwrap();
        let Outcome::Breakdown { partners, .. } = outcome else {
            panic!("expected breakdown, got {outcome:?}");
        };
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].partner, "Acme");
        assert_eq!(partners[0].due, 2);
    }

    #[test]
    fn interactive_session_needs_partner() {
        let store = seeded_store();
        let result = SchedulerSession::open(
            &store,
            None,
            Vec::new(),
            Role::Owner,
            ViewMode::Interactive,
            march(),
        );
        assert!(matches!(result, Err(SessionError::MissingPartner)));
    }

    #[test]
    fn write_between_snapshot_and_open_is_seen() {
        let store = seeded_store();
        let devices = store.device_snapshot("p1").unwrap();
        let proposal = Proposal::pending(TARGET, Role::Authority);
        store
            .apply_proposal("p1", &["d1".to_string(), "d2".to_string()], Some(&proposal))
            .unwrap();

        let session = SchedulerSession::open(
            &store,
            Some("p1".to_string()),
            devices,
            Role::Owner,
            ViewMode::Interactive,
            march(),
        )
        .unwrap();

        assert_eq!(session.ledger().get(ORIGIN), Some(&proposal));
        assert!(session.has_move(ORIGIN));
    }

    #[test]
    fn write_from_another_connection_before_open_is_seen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rigcal.sqlite");
        let storage = Storage::open(&path, Duration::from_millis(10)).unwrap();
        storage
            .create_partner(&Partner {
                id: "p1".to_string(),
                name: "Acme".to_string(),
                address: None,
            })
            .unwrap();
        for id in ["d1", "d2"] {
            storage.create_device("p1", id).unwrap();
            storage
                .record_inspection("p1", id, "2025.03.10", Timestamp::now())
                .unwrap();
        }
        let devices = storage.device_snapshot("p1").unwrap();

        let other = Storage::open(&path, Duration::from_millis(10)).unwrap();
        let proposal = Proposal::pending(TARGET, Role::Authority);
        other
            .apply_proposal("p1", &["d1".to_string(), "d2".to_string()], Some(&proposal))
            .unwrap();

        let mut session = SchedulerSession::open(
            &storage,
            Some("p1".to_string()),
            devices,
            Role::Owner,
            ViewMode::Interactive,
            march(),
        )
        .unwrap();

        assert_eq!(session.pump(), 0);
        assert_eq!(session.ledger().get(ORIGIN), Some(&proposal));
        session.close();
    }

    #[test]
    fn subscription_released_on_close_and_drop() {
        let store = seeded_store();

        let session = open(&store, Role::Owner);
        assert_eq!(store.subscriber_count(), 1);
        session.close();
        assert_eq!(store.subscriber_count(), 0);

        {
            let _session = open(&store, Role::Owner);
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn month_navigation() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);

        session.next_month();
        assert_eq!(session.view().month.to_string(), "2025-04");
        session.prev_month();
        session.prev_month();
        assert_eq!(session.view().month.to_string(), "2025-02");
        session.show_month(march());
        assert_eq!(session.details(ORIGIN).len(), 2);
    }

    #[test]
    fn rendering_is_pure() {
        let store = seeded_store();
        let mut session = open(&store, Role::Owner);
        session.handle(drag(ORIGIN, TARGET), &mut never).unwrap();

        assert_eq!(session.view(), session.view());
    }
}
