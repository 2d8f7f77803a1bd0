//! Client-side view of community actions and the viewer's membership.
//!
//! Join and leave are applied optimistically. Each one opens a pending
//! mutation holding a snapshot of the action's prior joined flag and
//! participant count; the mutation then ends in exactly one of
//! `commit` (server confirmed) or `rollback` (server refused or the request
//! failed), and rollback restores the snapshot exactly.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use ecoaction_types::events::MutationKind;
use ecoaction_types::models::{ActionId, CommunityAction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("action {0} is not loaded")]
    UnknownAction(ActionId),
    #[error("a {} for action {action_id} is already in progress", .kind.as_str())]
    InFlight { action_id: ActionId, kind: MutationKind },
    #[error("Already joined this action")]
    AlreadyJoined(ActionId),
    #[error("Not a participant of this action")]
    NotJoined(ActionId),
    #[error("mutation for action {0} is no longer pending")]
    Settled(ActionId),
}

/// Handle for one pending mutation, consumed when it settles.
#[derive(Debug, PartialEq, Eq)]
pub struct MutationTicket {
    action_id: ActionId,
    kind: MutationKind,
    seq: u64,
}

impl MutationTicket {
    pub fn action_id(&self) -> ActionId {
        self.action_id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: MutationKind,
    seq: u64,
    prior_joined: bool,
    prior_count: u32,
}

/// One action as the viewer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionView {
    pub action: CommunityAction,
    pub joined: bool,
    pub pending: Option<MutationKind>,
}

impl ActionView {
    pub fn participants(&self) -> u32 {
        self.action.participants_count
    }
}

#[derive(Debug, Default)]
pub struct ActionBoard {
    order: Vec<ActionId>,
    actions: HashMap<ActionId, CommunityAction>,
    joined: HashSet<ActionId>,
    pending: HashMap<ActionId, Pending>,
    viewer: u64,
    next_seq: u64,
}

impl ActionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listed actions with server state, keeping server order.
    /// Actions with a pending mutation keep their optimistic state.
    pub fn load(&mut self, actions: Vec<CommunityAction>) {
        let mut order = Vec::with_capacity(actions.len());
        let mut next = HashMap::with_capacity(actions.len());

        for action in actions {
            let id = action.id;
            if next.contains_key(&id) {
                continue;
            }
            order.push(id);
            match (self.pending.contains_key(&id), self.actions.remove(&id)) {
                (true, Some(local)) => next.insert(id, local),
                _ => next.insert(id, action),
            };
        }

        // Keep in-flight actions even if the server list dropped them, so
        // their mutation can still settle.
        for id in self.pending.keys() {
            if let Some(local) = self.actions.remove(id) {
                order.push(*id);
                next.insert(*id, local);
            }
        }

        self.order = order;
        self.actions = next;
    }

    /// Insert or replace a single action, e.g. after create or update.
    pub fn upsert(&mut self, action: CommunityAction) {
        let id = action.id;
        if self.pending.contains_key(&id) {
            return;
        }
        if self.actions.insert(id, action).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: ActionId) {
        if self.pending.contains_key(&id) {
            return;
        }
        self.actions.remove(&id);
        self.order.retain(|other| *other != id);
        self.joined.remove(&id);
    }

    /// Replace the membership set with server truth. Actions with a pending
    /// mutation keep their optimistic membership.
    pub fn set_joined(&mut self, ids: impl IntoIterator<Item = ActionId>) {
        let mut joined: HashSet<ActionId> = ids
            .into_iter()
            .filter(|id| !self.pending.contains_key(id))
            .collect();
        for id in self.pending.keys() {
            if self.joined.contains(id) {
                joined.insert(*id);
            }
        }
        self.joined = joined;
    }

    /// Memberships belong to one viewer session. When `viewer` changes the
    /// joined set is dropped, except for actions still mid-mutation.
    pub fn sync_viewer(&mut self, viewer: u64) {
        if self.viewer != viewer {
            self.viewer = viewer;
            self.forget_memberships();
        }
    }

    pub fn forget_memberships(&mut self) {
        let pending = &self.pending;
        self.joined.retain(|id| pending.contains_key(id));
    }

    pub fn get(&self, id: ActionId) -> Option<ActionView> {
        let action = self.actions.get(&id)?;
        Some(ActionView {
            action: action.clone(),
            joined: self.joined.contains(&id),
            pending: self.pending.get(&id).map(|p| p.kind),
        })
    }

    pub fn views(&self) -> Vec<ActionView> {
        self.order.iter().filter_map(|id| self.get(*id)).collect()
    }

    pub fn is_joined(&self, id: ActionId) -> bool {
        self.joined.contains(&id)
    }

    pub fn is_pending(&self, id: ActionId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn participants(&self, id: ActionId) -> Option<u32> {
        self.actions.get(&id).map(|a| a.participants_count)
    }

    pub fn joined_ids(&self) -> Vec<ActionId> {
        let mut ids: Vec<_> = self.joined.iter().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Open a pending mutation and apply it optimistically.
    pub fn begin(&mut self, id: ActionId, kind: MutationKind) -> Result<MutationTicket, MutationError> {
        if let Some(pending) = self.pending.get(&id) {
            return Err(MutationError::InFlight {
                action_id: id,
                kind: pending.kind,
            });
        }
        let joined = self.joined.contains(&id);
        let action = self
            .actions
            .get_mut(&id)
            .ok_or(MutationError::UnknownAction(id))?;

        match (kind, joined) {
            (MutationKind::Join, true) => return Err(MutationError::AlreadyJoined(id)),
            (MutationKind::Leave, false) => return Err(MutationError::NotJoined(id)),
            _ => {}
        }

        let prior_count = action.participants_count;
        match kind {
            MutationKind::Join => {
                action.participants_count = prior_count.saturating_add(1);
                self.joined.insert(id);
            }
            MutationKind::Leave => {
                action.participants_count = prior_count.saturating_sub(1);
                self.joined.remove(&id);
            }
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending.insert(
            id,
            Pending {
                kind,
                seq,
                prior_joined: joined,
                prior_count,
            },
        );

        Ok(MutationTicket {
            action_id: id,
            kind,
            seq,
        })
    }

    fn take_pending(&mut self, ticket: &MutationTicket) -> Result<Pending, MutationError> {
        match self.pending.get(&ticket.action_id) {
            Some(pending) if pending.seq == ticket.seq => {}
            _ => return Err(MutationError::Settled(ticket.action_id)),
        }
        self.pending
            .remove(&ticket.action_id)
            .ok_or(MutationError::Settled(ticket.action_id))
    }

    /// The server accepted the mutation; the optimistic state stands.
    /// Returns the participant count now shown.
    pub fn commit(&mut self, ticket: MutationTicket) -> Result<u32, MutationError> {
        self.take_pending(&ticket)?;
        Ok(self.participants(ticket.action_id).unwrap_or(0))
    }

    /// The mutation failed; restore the joined flag and count captured by
    /// `begin`.
    pub fn rollback(&mut self, ticket: MutationTicket) -> Result<(), MutationError> {
        let pending = self.take_pending(&ticket)?;
        if let Some(action) = self.actions.get_mut(&ticket.action_id) {
            action.participants_count = pending.prior_count;
        }
        if pending.prior_joined {
            self.joined.insert(ticket.action_id);
        } else {
            self.joined.remove(&ticket.action_id);
        }
        Ok(())
    }
}
