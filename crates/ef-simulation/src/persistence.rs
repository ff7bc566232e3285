//! Dirty-state persistence.
//!
//! The persistence system picks up entities whose state changed, throttles
//! them per entity, and hands a snapshot to the entity's save hook. Saves
//! never block the tick: a pending save is spawned on a tokio runtime and
//! its failure is only logged. Dirty flags are cleared when the
//! save is dispatched, so a failed save is not retried until the entity
//! changes again.
//!
//! Pending saves run on the runtime handed to
//! [`PersistenceSystem::with_runtime`], else on the ambient tokio runtime,
//! else on a small background runtime the system starts for itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::runtime::{Handle, Runtime};
use ef_core::component::ComponentKind;
use ef_core::entity::EntityId;
use ef_core::save::{EntitySnapshot, SaveContext, SaveDispatch, SaveError, SaveHook};

use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

// ============================================================================
// Repository boundary
// ============================================================================

/// Storage for player snapshots.
#[async_trait]
pub trait PlayerRepository: Send + Sync + fmt::Debug {
    /// Store a snapshot, replacing any earlier one under the same key.
    async fn save_player(&self, snapshot: &EntitySnapshot) -> Result<(), SaveError>;
    /// Fetch a snapshot by key.
    async fn load_player(&self, key: &str) -> Result<Option<EntitySnapshot>, SaveError>;
}

/// Adapts a [`PlayerRepository`] into a per-entity save hook.
#[derive(Debug, Clone)]
pub struct RepositorySaveHook {
    repo: Arc<dyn PlayerRepository>,
}

impl RepositorySaveHook {
    /// Wrap `repo`.
    pub fn new(repo: Arc<dyn PlayerRepository>) -> Self {
        Self { repo }
    }
}

impl SaveHook for RepositorySaveHook {
    fn save(&self, ctx: SaveContext) -> SaveDispatch {
        let repo = Arc::clone(&self.repo);
        SaveDispatch::Pending(Box::pin(async move {
            repo.save_player(&ctx.snapshot).await
        }))
    }
}

/// In-memory repository for tests and headless runs.
#[derive(Debug, Default)]
pub struct InMemoryPlayerRepository {
    players: Mutex<HashMap<String, EntitySnapshot>>,
    saves: AtomicUsize,
    fail_with: Option<SaveError>,
}

impl InMemoryPlayerRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every save fails with `error`.
    pub fn failing(error: SaveError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// Save attempts received, failed ones included.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stored snapshot for `key`.
    pub fn get(&self, key: &str) -> Option<EntitySnapshot> {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn save_player(&self, snapshot: &EntitySnapshot) -> Result<(), SaveError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.key(), snapshot.clone());
        Ok(())
    }

    async fn load_player(&self, key: &str) -> Result<Option<EntitySnapshot>, SaveError> {
        Ok(self.get(key))
    }
}

// ============================================================================
// Direct player saves
// ============================================================================

/// Per-player throttle in front of a repository, for saves requested
/// outside the tick (logout, zone change, explicit save commands).
#[derive(Debug)]
pub struct PlayerSaver {
    repo: Arc<dyn PlayerRepository>,
    cooldown_ms: u64,
    last_saved: HashMap<String, u64>,
}

impl PlayerSaver {
    /// A saver throttled to one save per `cooldown_ms` per player.
    pub fn new(repo: Arc<dyn PlayerRepository>, cooldown_ms: u64) -> Self {
        Self {
            repo,
            cooldown_ms,
            last_saved: HashMap::new(),
        }
    }

    /// Save unless the same player was saved less than the cooldown ago.
    /// `force` skips the throttle. Returns whether the repository was called.
    pub async fn save_player(
        &mut self,
        snapshot: &EntitySnapshot,
        now: u64,
        force: bool,
    ) -> Result<bool, SaveError> {
        let key = snapshot.key();
        let throttled = self
            .last_saved
            .get(&key)
            .is_some_and(|last| now.saturating_sub(*last) < self.cooldown_ms);
        if throttled && !force {
            tracing::debug!(player = %key, now, "player save throttled");
            return Ok(false);
        }

        self.repo.save_player(snapshot).await?;
        self.last_saved.insert(key, now);
        Ok(true)
    }

    /// Forget a player's throttle state, e.g. after logout.
    pub fn forget(&mut self, key: &str) {
        self.last_saved.remove(key);
    }
}

// ============================================================================
// System
// ============================================================================

/// Dispatches saves for dirty entities carrying a `persistence` component.
#[derive(Debug, Default)]
pub struct PersistenceSystem {
    dispatched: u64,
    runtime: Option<Handle>,
    owned: Option<Runtime>,
}

impl PersistenceSystem {
    /// A system that spawns pending saves on the ambient runtime, starting
    /// its own when there is none.
    pub fn new() -> Self {
        Self::default()
    }

    /// A system that spawns pending saves on `handle`.
    pub fn with_runtime(handle: Handle) -> Self {
        Self {
            dispatched: 0,
            runtime: Some(handle),
            owned: None,
        }
    }

    /// Saves handed to hooks since the system was created.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    fn try_save(&mut self, id: EntityId, ctx: &mut SimContext<'_>) -> bool {
        let now = ctx.now();
        let Some(entity) = ctx.world.get_entity_mut(id) else {
            return false;
        };
        let lifecycle_dirty = entity.components.lifecycle.is_some_and(|l| l.dirty);
        let Some(persistence) = entity.components.persistence.as_ref() else {
            return false;
        };
        if !persistence.dirty && !lifecycle_dirty {
            return false;
        }
        if persistence
            .last_save_at
            .is_some_and(|last| now.saturating_sub(last) < persistence.cooldown_ms)
        {
            return false;
        }

        let hook = Arc::clone(&persistence.hook);
        let auto_clear = persistence.auto_clear_dirty;
        let snapshot = EntitySnapshot::capture(entity);

        if let Some(persistence) = entity.components.persistence.as_mut() {
            persistence.last_save_at = Some(now);
            if auto_clear {
                persistence.dirty = false;
            }
        }
        if auto_clear {
            if let Some(lifecycle) = entity.components.lifecycle.as_mut() {
                lifecycle.dirty = false;
            }
        }

        let dispatch = hook.save(SaveContext {
            entity: id,
            snapshot,
            now,
        });
        self.settle(id, dispatch);
        self.dispatched += 1;
        true
    }

    /// Log a finished save or spawn a pending one. Never waits.
    fn settle(&mut self, id: EntityId, dispatch: SaveDispatch) {
        match dispatch {
            SaveDispatch::Done(Ok(())) => {
                tracing::debug!(entity = %id, "save completed");
            }
            SaveDispatch::Done(Err(err)) => {
                tracing::warn!(entity = %id, error = %err, "save failed");
            }
            SaveDispatch::Pending(future) => {
                let Some(handle) = self.spawner() else {
                    tracing::error!(entity = %id, "no async runtime; pending save dropped");
                    return;
                };
                handle.spawn(async move {
                    if let Err(err) = future.await {
                        tracing::warn!(entity = %id, error = %err, "save failed");
                    }
                });
            }
        }
    }

    fn spawner(&mut self) -> Option<Handle> {
        if let Some(handle) = &self.runtime {
            return Some(handle.clone());
        }
        if let Ok(handle) = Handle::try_current() {
            return Some(handle);
        }
        if self.owned.is_none() {
            match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("ef-save")
                .enable_all()
                .build()
            {
                Ok(runtime) => {
                    tracing::info!("started background runtime for saves");
                    self.owned = Some(runtime);
                }
                Err(err) => {
                    tracing::error!(error = %err, "could not start save runtime");
                    return None;
                }
            }
        }
        self.owned.as_ref().map(|rt| rt.handle().clone())
    }
}

impl Drop for PersistenceSystem {
    fn drop(&mut self) {
        // Blocking shutdown panics inside async contexts.
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

impl System for PersistenceSystem {
    fn name(&self) -> &str {
        "persistence"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for id in ctx.world.query(ComponentKind::Persistence) {
            if self.try_save(id, ctx) {
                let name = ctx.world.entity_name(id);
                ctx.emit(SimEventKind::Saved { entity: id }, format!("saved {name}"));
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
