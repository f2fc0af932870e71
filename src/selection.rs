//! Text-selection tracking.
//!
//! A [`SelectionHub`] stands in for the page: whatever owns the document
//! publishes selection changes to it for as long as the page lives. Chat
//! sessions do not keep a listener for that whole time. They subscribe when
//! mounted and get a [`SelectionSubscription`] guard back; dropping the guard
//! removes the listener, so an unmounted session stops seeing selections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Latest non-blank selection seen by one listener.
#[derive(Debug, Default)]
pub struct SelectionSlot {
    text: Mutex<Option<String>>,
}

impl SelectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        lock(&self.text).clone()
    }

    /// Store `selection`, or clear the slot when it is blank.
    pub fn update(&self, selection: &str) {
        let mut slot = lock(&self.text);
        if selection.trim().is_empty() {
            *slot = None;
        } else {
            *slot = Some(selection.to_string());
        }
    }

    pub fn clear(&self) {
        *lock(&self.text) = None;
    }
}

#[derive(Debug, Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Arc<SelectionSlot>>>,
}

/// Page-lifetime source of selection events.
#[derive(Debug, Clone, Default)]
pub struct SelectionHub {
    inner: Arc<HubInner>,
}

impl SelectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a selection change to every subscribed slot.
    pub fn publish(&self, selection: &str) {
        for slot in lock(&self.inner.listeners).values() {
            slot.update(selection);
        }
    }

    /// Register `slot` until the returned guard is dropped.
    pub fn subscribe(&self, slot: Arc<SelectionSlot>) -> SelectionSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).insert(id, slot);
        SelectionSubscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

/// Registration guard returned by [`SelectionHub::subscribe`].
#[derive(Debug)]
#[must_use = "dropping the subscription unregisters the listener"]
pub struct SelectionSubscription {
    hub: Weak<HubInner>,
    id: u64,
}

impl Drop for SelectionSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            lock(&hub.listeners).remove(&self.id);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
