mod gate;

pub use gate::{LockGate, LockState, LockTransition, WriteKind};
