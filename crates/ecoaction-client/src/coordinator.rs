use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ecoaction_types::api::{ActionFilters, ActionUpdate, NewAction};
use ecoaction_types::events::{ClientEvent, MutationKind};
use ecoaction_types::models::{ActionId, CommunityAction, CommunityStats};

use crate::board::{ActionBoard, ActionView, MutationError};
use crate::community::CommunityService;
use crate::context::AuthContext;
use crate::error::Result;

/// Result of a confirmed join or leave.
#[derive(Debug)]
pub struct MutationOutcome {
    pub action_id: ActionId,
    pub kind: MutationKind,
    /// Count shown after the mutation settled.
    pub participants_count: u32,
    /// Background refresh of community stats and the session user. Dropping
    /// the handle does not cancel it.
    pub refresh: JoinHandle<()>,
}

/// Drives the community screens: owns the action board, routes join/leave
/// through the optimistic pending → committed | rolled-back cycle and keeps
/// the last known community stats.
#[derive(Clone)]
pub struct CommunityCoordinator {
    service: CommunityService,
    context: AuthContext,
    board: Arc<Mutex<ActionBoard>>,
    stats: Arc<Mutex<Option<CommunityStats>>>,
}

impl CommunityCoordinator {
    pub fn new(service: CommunityService, context: AuthContext) -> Self {
        Self {
            service,
            context,
            board: Arc::new(Mutex::new(ActionBoard::new())),
            stats: Arc::new(Mutex::new(None)),
        }
    }

    /// The board, with memberships dropped if the session changed since the
    /// last access.
    fn board(&self) -> MutexGuard<'_, ActionBoard> {
        let viewer = self.context.generation();
        let mut board = self.board.lock().unwrap_or_else(PoisonError::into_inner);
        board.sync_viewer(viewer);
        board
    }

    /// Settle a mutation. If the session ended while it was in flight, the
    /// settled membership belongs to nobody and is dropped too.
    fn settle<T>(
        &self,
        generation: u64,
        apply: impl FnOnce(&mut ActionBoard) -> std::result::Result<T, MutationError>,
    ) -> Result<T> {
        let mut board = self.board();
        let out = apply(&mut board)?;
        if self.context.generation() != generation {
            board.forget_memberships();
        }
        Ok(out)
    }

    /// Load actions and, when signed in, the viewer's memberships.
    /// Memberships fetched for a session that ended meanwhile are dropped.
    pub async fn refresh(&self, filters: &ActionFilters) -> Result<()> {
        let actions = self.service.list_actions(filters).await?;
        let generation = self.context.generation();
        let joined: Vec<ActionId> = match self.context.credential() {
            Some(credential) => self
                .with_session(self.service.my_actions(&credential))
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect(),
            None => Vec::new(),
        };

        let mut board = self.board();
        board.load(actions);
        if self.context.generation() == generation {
            board.set_joined(joined);
        }
        debug!(actions = board.len(), "community board refreshed");
        Ok(())
    }

    pub fn views(&self) -> Vec<ActionView> {
        self.board().views()
    }

    pub fn view(&self, id: ActionId) -> Option<ActionView> {
        self.board().get(id)
    }

    pub fn is_joined(&self, id: ActionId) -> bool {
        self.board().is_joined(id)
    }

    pub fn stats(&self) -> Option<CommunityStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn load_stats(&self) -> Result<CommunityStats> {
        let stats = self.service.stats().await?;
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = Some(stats.clone());
        Ok(stats)
    }

    pub async fn join_action(&self, id: ActionId) -> Result<MutationOutcome> {
        self.mutate(id, MutationKind::Join).await
    }

    pub async fn leave_action(&self, id: ActionId) -> Result<MutationOutcome> {
        self.mutate(id, MutationKind::Leave).await
    }

    async fn mutate(&self, id: ActionId, kind: MutationKind) -> Result<MutationOutcome> {
        let generation = self.context.generation();
        let credential = self.context.require_credential()?;
        let ticket = self.board().begin(id, kind)?;

        let result = match kind {
            MutationKind::Join => self.service.join_action(&credential, id).await,
            MutationKind::Leave => self.service.leave_action(&credential, id).await,
        };

        match result {
            Ok(_) => {
                let participants_count = self.settle(generation, |board| board.commit(ticket))?;
                info!(action_id = %id, kind = kind.as_str(), participants_count, "mutation committed");
                self.context.events().publish(ClientEvent::MutationCommitted {
                    action_id: id,
                    kind,
                    participants_count,
                });
                Ok(MutationOutcome {
                    action_id: id,
                    kind,
                    participants_count,
                    refresh: self.spawn_refresh(),
                })
            }
            Err(e) => {
                self.settle(generation, |board| board.rollback(ticket))?;
                warn!(action_id = %id, kind = kind.as_str(), "mutation rolled back: {}", e);
                self.context.events().publish(ClientEvent::MutationRolledBack {
                    action_id: id,
                    kind,
                    reason: e.to_string(),
                });
                if e.is_unauthorized() {
                    self.context.invalidate()?;
                }
                Err(e)
            }
        }
    }

    /// Pull server-authoritative stats and profile counters after a change.
    fn spawn_refresh(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.load_stats().await {
                error!("failed to refresh community stats: {}", e);
            }
            if let Err(e) = this.context.refresh_user().await {
                error!("failed to refresh user after mutation: {}", e);
            }
        })
    }

    pub async fn create_action(&self, action: &NewAction) -> Result<CommunityAction> {
        let credential = self.context.require_credential()?;
        let created = self
            .with_session(self.service.create_action(&credential, action))
            .await?;
        self.board().upsert(created.clone());
        Ok(created)
    }

    pub async fn update_action(&self, id: ActionId, update: &ActionUpdate) -> Result<CommunityAction> {
        let credential = self.context.require_credential()?;
        let updated = self
            .with_session(self.service.update_action(&credential, id, update))
            .await?;
        self.board().upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete_action(&self, id: ActionId) -> Result<()> {
        let credential = self.context.require_credential()?;
        self.with_session(self.service.delete_action(&credential, id)).await?;
        self.board().remove(id);
        Ok(())
    }

    /// Await an authenticated call; a 401 ends the session.
    async fn with_session<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match call.await {
            Err(e) if e.is_unauthorized() => {
                self.context.invalidate()?;
                Err(e)
            }
            other => other,
        }
    }
}
