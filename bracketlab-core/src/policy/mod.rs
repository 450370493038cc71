//! Pure decision policies consulted by the lifecycle machine.

pub mod confirmation;
pub mod trailing;

pub use confirmation::{confirm, ConditionType, Confirmation, REQUIRED_HITS};
pub use trailing::{tightens, trail};
