use ef_core::component::{ActionKind, ComponentKind};
use ef_core::entity::EntityId;
use ef_core::error::CoreError;
use ef_mechanics::error::MechError;

/// Result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No entity with this id.
    #[error("entity not found in simulation: {0}")]
    EntityNotFound(EntityId),

    /// A required component is absent.
    #[error("entity {entity} has no {kind} component")]
    MissingComponent {
        /// The entity that was inspected.
        entity: EntityId,
        /// The component that was expected.
        kind: ComponentKind,
    },

    /// The action queue holds a kind nobody handles.
    #[error("no handler registered for {0} actions")]
    NoHandler(ActionKind),

    /// An `ai` action named an unregistered behaviour.
    #[error("unknown AI behaviour: {0}")]
    UnknownBehaviour(String),

    /// Config JSON failed to parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// From ef-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// From ef-mechanics.
    #[error(transparent)]
    Mechanics(#[from] MechError),

    /// A system failed.
    #[error("system error: {0}")]
    SystemError(String),
}
