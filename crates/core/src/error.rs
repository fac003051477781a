//! Error types: fatal engine errors versus user-recoverable rulings.
//!
//! The engine distinguishes two failure classes. A [`Rejection`] is a
//! validation failure returned as a value inside [`Ruling`]: nothing was
//! applied, nothing was logged, and the caller is expected to surface the
//! message and allow a retry. An [`EngineError`] is fatal: an invariant that
//! correct upstream logic makes structurally impossible was violated, or a
//! remote participant became unreachable mid-operation.

use crate::ids::{PlayerId, ResourceId, TechId, TerritoryId, UnitId};

/// Fatal, non-recoverable engine failures.
///
/// These terminate the current operation. The journal guarantees that no
/// partially-applied change group is left behind when one surfaces.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    /// A state invariant was violated. Programmer error, not a validation
    /// failure.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A remote player could not be reached or the session was torn down
    /// while waiting on them.
    #[error("remote player {player} is unreachable")]
    Disconnected { player: PlayerId },

    /// A phase lifecycle method was invoked out of order.
    #[error("phase '{phase}' cannot {operation} while {state}")]
    PhaseOrder {
        phase: String,
        operation: &'static str,
        state: &'static str,
    },

    /// A delegate snapshot could not be restored.
    #[error("malformed delegate snapshot for phase '{phase}': {detail}")]
    BadSnapshot { phase: String, detail: String },
}

impl EngineError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }
}

/// Marker returned by [`crate::bridge::RemotePlayer`] methods when the
/// player cannot be reached. The bridge converts it into
/// [`EngineError::Disconnected`] with the player attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("remote player unreachable")]
pub struct Disconnected;

/// Outcome of a player-visible operation that passed through validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ruling {
    /// Validation passed and all changes were applied.
    Applied,
    /// Validation failed; no change was applied and no history was written.
    Rejected(Rejection),
}

impl Ruling {
    pub fn is_applied(&self) -> bool {
        matches!(self, Ruling::Applied)
    }

    /// The rejection, if validation failed.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Ruling::Applied => None,
            Ruling::Rejected(rejection) => Some(rejection),
        }
    }
}

impl From<Rejection> for Ruling {
    fn from(rejection: Rejection) -> Self {
        Ruling::Rejected(rejection)
    }
}

/// Descriptive validation failures surfaced to the acting player.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("edit mode is not enabled")]
    EditModeDisabled,

    #[error("{unit} is not in {territory}")]
    UnitNotInTerritory { unit: UnitId, territory: TerritoryId },

    #[error("can't add mixed nationality units to water")]
    MixedOwnershipOnWater,

    #[error("can't add sea units to land")]
    SeaUnitsOnLand,

    #[error("can't add land units that can't be transported to water")]
    UntransportableOnWater,

    #[error("can't add land units to water without enough transports")]
    NotEnoughTransports,

    #[error("new total for {resource} is unchanged")]
    UnchangedTotal { resource: ResourceId },

    #[error("new total for {resource} is invalid")]
    InvalidTotal { resource: ResourceId },

    #[error("{player} already has {tech}")]
    TechAlreadyKnown { player: PlayerId, tech: TechId },

    #[error("{player} does not have {tech}")]
    TechNotKnown { player: PlayerId, tech: TechId },

    #[error("damage {damage} for {unit} is out of range")]
    DamageOutOfRange { unit: UnitId, damage: u32 },

    #[error("territory {territory} is already owned by that player")]
    OwnerUnchanged { territory: TerritoryId },

    #[error("that action is not known to this game")]
    UnknownAction,

    #[error("no attempts left for that action this round")]
    NoAttemptsRemaining,

    #[error("not enough resources: need {needed}, have {available}")]
    NotEnoughResources { needed: u32, available: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_render_non_empty_messages() {
        let samples = [
            Rejection::EditModeDisabled,
            Rejection::NotEnoughTransports,
            Rejection::InvalidTotal {
                resource: ResourceId(0),
            },
            Rejection::NotEnoughResources {
                needed: 5,
                available: 2,
            },
        ];
        for rejection in samples {
            assert!(!rejection.to_string().is_empty());
        }
    }

    #[test]
    fn ruling_accessors() {
        assert!(Ruling::Applied.is_applied());
        let ruling = Ruling::from(Rejection::EditModeDisabled);
        assert!(!ruling.is_applied());
        assert_eq!(ruling.rejection(), Some(&Rejection::EditModeDisabled));
    }
}
