//! Error types for the mechanics crate.

use ef_core::{ComponentKind, EntityId};

/// Errors that can occur during mechanics operations.
///
/// Rejected gameplay input (a skill on cooldown, an attack out of range) is
/// never an error; those paths return `false` or `None`. These variants
/// cover misconfiguration and broken references.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// A monster archetype referenced by an entity is not in the content table.
    #[error("unknown monster archetype: {0}")]
    UnknownArchetype(String),

    /// A skill referenced by an input is not in the content table.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// An entity referenced during resolution does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity lacks a component an operation needs.
    #[error("entity {entity} has no {kind} component")]
    MissingComponent {
        /// The entity that was inspected.
        entity: EntityId,
        /// The component kind that was missing.
        kind: ComponentKind,
    },

    /// Static content could not be parsed.
    #[error("invalid content: {0}")]
    InvalidContent(#[from] serde_json::Error),

    /// A tuning value is out of its valid range.
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
