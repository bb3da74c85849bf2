//! Sync bridge: carries change-feed batches from the store's thread to the
//! session that owns the device list.

use std::sync::mpsc::{self, Receiver};

use tracing::debug;

use crate::{
    model::Device,
    storage::{self, DeviceStore, Subscription},
};

/// Merges a change batch into `held`, keyed by device id.
///
/// New ids are appended; known ids are replaced, except that fields the
/// payload leaves empty (`next_due_date`, `partner_name`) keep their held
/// value. Returns how many devices actually changed, so applying the same
/// batch twice reports zero the second time.
pub fn merge_changes(held: &mut Vec<Device>, changes: Vec<Device>) -> usize {
    let mut changed = 0;
    for mut incoming in changes {
        match held.iter_mut().find(|d| d.id == incoming.id) {
            Some(current) => {
                if incoming.next_due_date.is_none() {
                    incoming.next_due_date.clone_from(&current.next_due_date);
                }
                if incoming.partner_name.is_none() {
                    incoming.partner_name.clone_from(&current.partner_name);
                }
                if *current != incoming {
                    changed += 1;
                }
                *current = incoming;
            }
            None => {
                held.push(incoming);
                changed += 1;
            }
        }
    }
    changed
}

/// A live feed for one partner's devices.
///
/// Dropping the feed releases the store subscription.
#[derive(Debug)]
pub struct Feed {
    subscription: Subscription,
    rx: Receiver<Vec<Device>>,
}

impl Feed {
    pub fn open(store: &dyn DeviceStore, partner_id: &str) -> storage::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let subscription = store.subscribe(
            partner_id,
            Box::new(move |devices| {
                // The receiver is gone once the session closes.
                let _ = tx.send(devices);
            }),
        )?;
        debug!(partner_id, "feed opened");
        Ok(Self { subscription, rx })
    }

    /// Every batch received so far, flattened in arrival order.
    pub fn drain(&self) -> Vec<Device> {
        self.rx.try_iter().flatten().collect()
    }

    /// Stops the feed, waiting until no further batches can arrive.
    pub fn close(self) {
        self.subscription.cancel();
    }
}
