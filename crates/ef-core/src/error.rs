use crate::component::ComponentKind;
use crate::entity::EntityId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating a world.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with the same ID is already registered.
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// The entity exists but lacks a component the caller relies on.
    #[error("entity {entity} has no {kind} component")]
    MissingComponent {
        /// The entity that was inspected.
        entity: EntityId,
        /// The component that was expected.
        kind: ComponentKind,
    },
}
