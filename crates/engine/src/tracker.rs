//! Outstanding-transaction accounting
//!
//! Every backend request the engine issues is registered here under one of
//! two pools until its terminal notification arrives. Consumers only see the
//! edges: a pool going from empty to non-empty and back.

use std::collections::HashSet;

use upkeep_errors::EngineError;
use upkeep_events::{AppEvent, ControllerEvent, EventEmitter, EventSender};
use upkeep_types::{Pool, TransactionId};

/// Result of [`TransactionTracker::complete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The handle was tracked in `pool` and is now released
    Released { pool: Pool },
    /// The handle was not (or no longer) tracked
    Untracked,
}

#[derive(Debug)]
pub struct TransactionTracker {
    general: HashSet<TransactionId>,
    update: HashSet<TransactionId>,
    events: EventSender,
}

impl TransactionTracker {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self {
            general: HashSet::new(),
            update: HashSet::new(),
            events,
        }
    }

    /// Register `id` under `pool`
    ///
    /// # Errors
    ///
    /// Returns `EngineError::AlreadyTracked` if `id` is registered in either
    /// pool already.
    pub fn track(&mut self, id: TransactionId, pool: Pool) -> Result<(), EngineError> {
        if self.is_tracked(id) {
            return Err(EngineError::AlreadyTracked {
                transaction: id.as_uuid(),
            });
        }

        let before = self.len(pool);
        self.pool_mut(pool).insert(id);
        self.edge(pool, before);
        Ok(())
    }

    /// Release `id`; a second completion of the same handle is a no-op
    pub fn complete(&mut self, id: TransactionId) -> Completion {
        for pool in [Pool::General, Pool::Update] {
            let before = self.len(pool);
            if self.pool_mut(pool).remove(&id) {
                self.edge(pool, before);
                return Completion::Released { pool };
            }
        }
        Completion::Untracked
    }

    /// Drop every handle, e.g. after the backend went away
    pub fn abandon_all(&mut self) {
        for pool in [Pool::General, Pool::Update] {
            let before = self.len(pool);
            self.pool_mut(pool).clear();
            self.edge(pool, before);
        }
    }

    #[must_use]
    pub fn is_tracked(&self, id: TransactionId) -> bool {
        self.general.contains(&id) || self.update.contains(&id)
    }

    #[must_use]
    pub fn len(&self, pool: Pool) -> usize {
        match pool {
            Pool::General => self.general.len(),
            Pool::Update => self.update.len(),
        }
    }

    #[must_use]
    pub fn is_active(&self, pool: Pool) -> bool {
        self.len(pool) > 0
    }

    /// Any transaction outstanding
    #[must_use]
    pub fn busy(&self) -> bool {
        self.is_active(Pool::General) || self.is_active(Pool::Update)
    }

    /// A package action (or its resolution queries) is outstanding
    #[must_use]
    pub fn update_running(&self) -> bool {
        self.is_active(Pool::Update)
    }

    fn pool_mut(&mut self, pool: Pool) -> &mut HashSet<TransactionId> {
        match pool {
            Pool::General => &mut self.general,
            Pool::Update => &mut self.update,
        }
    }

    // Single place where level changes are detected and announced.
    fn edge(&self, pool: Pool, before: usize) {
        let after = self.len(pool);
        let active = match (before, after) {
            (0, n) if n > 0 => true,
            (n, 0) if n > 0 => false,
            _ => return,
        };
        tracing::debug!(%pool, active, "pool level changed");
        self.events
            .emit(AppEvent::Controller(ControllerEvent::PoolChanged { pool, active }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use upkeep_events::{channel, EventReceiver};

    fn edges(rx: &mut EventReceiver) -> Vec<(Pool, bool)> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Controller(ControllerEvent::PoolChanged { pool, active }) =
                message.event
            {
                out.push((pool, active));
            }
        }
        out
    }

    #[test]
    fn test_edges_only_on_boundaries() {
        let (tx, mut rx) = channel();
        let mut tracker = TransactionTracker::new(tx);
        let a = TransactionId::new();
        let b = TransactionId::new();

        tracker.track(a, Pool::General).unwrap();
        tracker.track(b, Pool::General).unwrap();
        assert_eq!(tracker.complete(a), Completion::Released { pool: Pool::General });
        assert!(tracker.busy());
        assert!(!tracker.update_running());
        tracker.complete(b);

        assert_eq!(
            edges(&mut rx),
            vec![(Pool::General, true), (Pool::General, false)]
        );
        assert!(!tracker.busy());
    }

    #[test]
    fn test_double_completion_is_ignored() {
        let (tx, mut rx) = channel();
        let mut tracker = TransactionTracker::new(tx);
        let a = TransactionId::new();

        tracker.track(a, Pool::Update).unwrap();
        tracker.complete(a);
        assert_eq!(tracker.complete(a), Completion::Untracked);
        assert_eq!(edges(&mut rx), vec![(Pool::Update, true), (Pool::Update, false)]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let (tx, _rx) = channel();
        let mut tracker = TransactionTracker::new(tx);
        let a = TransactionId::new();

        tracker.track(a, Pool::General).unwrap();
        assert!(matches!(
            tracker.track(a, Pool::Update),
            Err(EngineError::AlreadyTracked { .. })
        ));
        assert!(!tracker.update_running());
    }

    #[test]
    fn test_abandon_all_emits_falling_edges() {
        let (tx, mut rx) = channel();
        let mut tracker = TransactionTracker::new(tx);
        tracker.track(TransactionId::new(), Pool::General).unwrap();
        tracker.track(TransactionId::new(), Pool::Update).unwrap();
        edges(&mut rx);

        tracker.abandon_all();
        assert!(!tracker.busy());
        assert_eq!(
            edges(&mut rx),
            vec![(Pool::General, false), (Pool::Update, false)]
        );

        tracker.abandon_all();
        assert!(edges(&mut rx).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Track(usize, bool),
        Complete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8usize, any::<bool>()).prop_map(|(slot, update)| Op::Track(slot, update)),
            (0..8usize).prop_map(Op::Complete),
        ]
    }

    proptest! {
        #[test]
        fn prop_busy_iff_tracked(ops in prop::collection::vec(op(), 0..64)) {
            let (tx, mut rx) = channel();
            let mut tracker = TransactionTracker::new(tx);
            let ids: Vec<TransactionId> = (0..8).map(|_| TransactionId::new()).collect();
            let mut live: HashSet<TransactionId> = HashSet::new();

            for op in ops {
                match op {
                    Op::Track(slot, update) => {
                        let pool = if update { Pool::Update } else { Pool::General };
                        let accepted = tracker.track(ids[slot], pool).is_ok();
                        prop_assert_eq!(accepted, live.insert(ids[slot]));
                    }
                    Op::Complete(slot) => {
                        let released = tracker.complete(ids[slot]) != Completion::Untracked;
                        prop_assert_eq!(released, live.remove(&ids[slot]));
                    }
                }
                prop_assert_eq!(tracker.busy(), !live.is_empty());
                prop_assert_eq!(
                    tracker.len(Pool::General) + tracker.len(Pool::Update),
                    live.len()
                );
            }

            // Edges alternate per pool, starting with a rising edge.
            let mut level = std::collections::HashMap::new();
            for (pool, active) in edges(&mut rx) {
                let previous = level.insert(pool, active).unwrap_or(false);
                prop_assert_ne!(previous, active);
            }
        }
    }
}
