use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CostError;
use crate::model::HeaderPatch;

/// The two states of a cost record's lock.
///
/// Unlocked → Locked via an explicit lock request, Locked → Unlocked via an
/// explicit unlock request. No other transitions exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked)
    }
}

impl From<bool> for LockState {
    fn from(locked: bool) -> Self {
        if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "UNLOCKED"),
            LockState::Locked => write!(f, "LOCKED"),
        }
    }
}

/// What an authorized header update does to the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    /// Lock flag unchanged; field changes (if any) apply.
    Stay(LockState),
    /// Unlocked → Locked, applied together with any field changes.
    Lock,
    /// Locked → Unlocked. Never carries field changes.
    Unlock,
}

impl LockTransition {
    pub fn target(&self) -> LockState {
        match self {
            LockTransition::Stay(state) => *state,
            LockTransition::Lock => LockState::Locked,
            LockTransition::Unlock => LockState::Unlocked,
        }
    }
}

/// Which kind of write is asking for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Summary,
    BreakdownItem,
    VariationOrder,
    Rto,
    Record,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteKind::Summary => write!(f, "cost summary"),
            WriteKind::BreakdownItem => write!(f, "breakdown items"),
            WriteKind::VariationOrder => write!(f, "variation orders"),
            WriteKind::Rto => write!(f, "requisition to order"),
            WriteKind::Record => write!(f, "cost record"),
        }
    }
}

/// Authorizes every write against a cost record. Reads never pass through
/// the gate.
pub struct LockGate;

impl LockGate {
    /// Decide the lock transition for a header update.
    ///
    /// - Unlocked: everything is permitted; `locked = true` locks in the same
    ///   call as the field changes.
    /// - Locked: only a bare `locked = false` is permitted. Field changes,
    ///   a repeated `locked = true`, or a patch without a lock flag fail.
    pub fn authorize_header(
        current: LockState,
        patch: &HeaderPatch,
    ) -> Result<LockTransition, CostError> {
        match current {
            LockState::Unlocked => Ok(match patch.locked {
                Some(true) => LockTransition::Lock,
                Some(false) | None => LockTransition::Stay(LockState::Unlocked),
            }),
            LockState::Locked => match patch.locked {
                Some(false) if !patch.has_field_changes() => Ok(LockTransition::Unlock),
                Some(false) => Err(CostError::Locked(
                    "Cost header is locked. Unlock without other changes before editing.".into(),
                )),
                Some(true) | None => Err(CostError::Locked(
                    "Cost header is locked. Unlock before editing.".into(),
                )),
            },
        }
    }

    /// Any non-header write: permitted only while unlocked.
    pub fn authorize_write(current: LockState, kind: WriteKind) -> Result<(), CostError> {
        match current {
            LockState::Unlocked => Ok(()),
            LockState::Locked => Err(CostError::Locked(match kind {
                WriteKind::Summary => "Cost summary is locked. Unlock header before editing.".into(),
                other => format!("Cost record is locked; {other} cannot change. Unlock header before editing."),
            })),
        }
    }
}
