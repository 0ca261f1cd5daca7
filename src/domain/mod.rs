//! Aggregates: decisions, interventions, projects, program books, annual
//! programs. Cross-aggregate edges are ids, never owning pointers.

pub mod annual_program;
pub mod decision;
pub mod intervention;
pub mod program_book;
pub mod project;
