//! Service context shared by the ledger components.
//!
//! Holds the explicitly constructed store handle, journal and notifier -
//! created once at process start, handed to each component, never
//! re-created mid-request.

use crate::notify::{Notification, Notifier, TracingNotifier};
use panelpay_core::{LedgerConfig, LedgerEvent};
use panelpay_persistence::{Database, JournalStore, LedgerStore};
use std::sync::Arc;

/// Context for ledger operations - store access, journal, notifier, limits.
pub struct ServiceContext {
    store: Arc<LedgerStore>,
    journal: Arc<JournalStore>,
    notifier: Arc<dyn Notifier>,
    config: LedgerConfig,
}

impl ServiceContext {
    /// Build from a database with the default notifier and limits
    pub fn new(db: &Database) -> Self {
        Self::from_parts(
            Arc::new(db.ledger_store()),
            db.journal(),
            Arc::new(TracingNotifier),
            LedgerConfig::default(),
        )
    }

    /// Build from explicit parts (tests inject a recording notifier here)
    pub fn from_parts(
        store: Arc<LedgerStore>,
        journal: Arc<JournalStore>,
        notifier: Arc<dyn Notifier>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            journal,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Append a committed transition to the journal. Best-effort: the
    /// transaction already committed, so a journal failure is only logged.
    /// The closure receives the assigned event id.
    pub fn record<F>(&self, build: F)
    where
        F: FnOnce(&str) -> LedgerEvent,
    {
        let event = build(&self.journal.next_event_id());
        if let Err(err) = self.journal.append(&event) {
            tracing::warn!(%err, kind = %event.kind, "journal append failed");
        }
    }

    /// Deliver a notification. Best-effort: failure is logged, never
    /// propagated into the ledger path.
    pub fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification) {
            tracing::warn!(%err, user_id = %notification.user_id, "notification failed");
        }
    }
}
