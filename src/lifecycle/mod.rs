//! Engines: budget and distribution computation, the two state machines,
//! the consistency coordinator, and the use-case facade tying them to the
//! repositories.

pub mod budget;
pub mod coordinator;
pub mod distribution;
pub mod intervention_machine;
pub mod project_machine;
pub mod usecases;
