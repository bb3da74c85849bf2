//! In-memory [`DeviceStore`] for tests.
//!
//! Clones share state, so two sessions built on clones of one store see each
//! other's writes. Change callbacks fire synchronously inside the write that
//! caused them, carrying raw device documents without `next_due_date`.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::model::{Device, Proposal};

use super::{ChangeCallback, DeviceStore, Result, StorageError, Subscription};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    devices: BTreeMap<String, Vec<Device>>,
    subscribers: BTreeMap<u64, (String, ChangeCallback)>,
    next_subscriber: u64,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds devices for a partner, creating it if needed. Does not notify.
    pub fn insert(&self, partner_id: &str, devices: impl IntoIterator<Item = Device>) {
        self.lock()
            .devices
            .entry(partner_id.to_string())
            .or_default()
            .extend(devices);
    }

    /// Delivers a change as if another process had written it.
    pub fn push_change(&self, partner_id: &str, devices: Vec<Device>) {
        let mut inner = self.lock();
        for (owner, callback) in inner.subscribers.values_mut() {
            if owner == partner_id {
                callback(devices.clone());
            }
        }
    }

    /// Makes every following write fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful `apply_proposal` calls.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn device(&self, partner_id: &str, device_id: &str) -> Option<Device> {
        self.lock()
            .devices
            .get(partner_id)?
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DeviceStore for MemoryStore {
    fn device_snapshot(&self, partner_id: &str) -> Result<Vec<Device>> {
        self.lock()
            .devices
            .get(partner_id)
            .cloned()
            .ok_or_else(|| StorageError::PartnerNotFound(partner_id.to_string()))
    }

    fn subscribe(&self, partner_id: &str, on_change: ChangeCallback) -> Result<Subscription> {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner
                .subscribers
                .insert(id, (partner_id.to_string(), on_change));
            id
        };
        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(move || {
            let removed = inner
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .subscribers
                .remove(&id);
            drop(removed);
        }))
    }

    fn apply_proposal(
        &self,
        partner_id: &str,
        device_ids: &[String],
        proposal: Option<&Proposal>,
    ) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("injected write failure")));
        }
        let devices = inner
            .devices
            .get_mut(partner_id)
            .ok_or_else(|| StorageError::PartnerNotFound(partner_id.to_string()))?;
        if let Some(missing) = device_ids
            .iter()
            .find(|id| !devices.iter().any(|d| &d.id == *id))
        {
            return Err(StorageError::DeviceNotFound {
                partner_id: partner_id.to_string(),
                device_id: missing.clone(),
            });
        }

        let mut changed = Vec::new();
        for device in devices.iter_mut().filter(|d| device_ids.contains(&d.id)) {
            device.proposal = proposal.copied();
            changed.push(Device {
                proposal: device.proposal,
                ..Device::new(device.id.clone())
            });
        }
        inner.writes += 1;

        for (owner, callback) in inner.subscribers.values_mut() {
            if owner == partner_id {
                callback(changed.clone());
            }
        }
        Ok(())
    }
}
