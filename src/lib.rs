//! Capworks: lifecycle and consistency engine for capital-works planning.
//!
//! Capital-works programs track two kinds of units: **interventions**
//! (single physical work items) and **projects** (groupings of
//! interventions sharing execution). Both move through regulated status
//! lifecycles driven by recorded **decisions**, and both feed the annual
//! planning batches — **program books** owned by **annual programs** —
//! that rank candidate projects for funding.
//!
//! This crate is the engine behind those rules:
//!
//! - Table-driven state machines for intervention and project statuses,
//!   with guards over the decision ledger
//!   ([`lifecycle::intervention_machine`], [`lifecycle::project_machine`]).
//! - Budget and annual-distribution recomputation after every mutation
//!   ([`lifecycle::budget`], [`lifecycle::distribution`]).
//! - A consistency coordinator that detects which program books went stale
//!   after a project or intervention changed, refreshes them, and syncs
//!   annual program statuses ([`lifecycle::coordinator`]).
//! - An append-only, newest-first decision ledger
//!   ([`domain::decision`]).
//!
//! # Boundaries
//!
//! Persistence, transport, and geometry analysis live outside the crate.
//! Aggregates cross-reference each other by id only; repositories are trait
//! seams ([`core::store`]) with a bundled in-memory arena used by the CLI
//! and the test suites. There is **no cross-aggregate transaction**: the
//! coordinator persists sequentially (project, interventions, program
//! books, annual programs) and a mid-cascade failure aborts the remainder
//! without rolling back earlier writes.
//!
//! # Example
//!
//! ```
//! use capworks::core::config::PlanningConfig;
//! use capworks::core::store::MemoryStore;
//! use capworks::domain::intervention::Intervention;
//! use capworks::domain::project::{Project, ProjectType};
//! use capworks::lifecycle::usecases::Planner;
//!
//! let mut store = MemoryStore::new();
//! let mut planner = Planner::new(&mut store, PlanningConfig::default());
//!
//! planner
//!     .create_intervention(Intervention::new("i1", 2024, 1000.0), "demo")
//!     .unwrap();
//! let mut project = Project::new("p1", ProjectType::Integrated, 2024, 2026);
//! project.link_intervention("i1");
//! let project = planner.create_project(project, "demo").unwrap();
//! assert_eq!(project.global_budget.allowance, 1000.0);
//! ```

pub mod cli;
pub mod core;
pub mod domain;
pub mod lifecycle;
