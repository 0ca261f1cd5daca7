//! Cross-aggregate consistency coordinator.
//!
//! Given the before/after images of a project (and optionally the before
//! image of one changed intervention), decides which program books went
//! stale, refreshes them, and syncs their annual programs.
//!
//! Persistence is issued sequentially in a fixed order: project save,
//! intervention saves, program book saves, annual program status sync.
//! There is no cross-aggregate transaction and no rollback: a failure
//! mid-cascade aborts the remaining steps and leaves earlier writes in
//! place. All reads feeding staleness decisions happen before the first
//! write.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::core::error::CapworksError;
use crate::core::store::{
    AnnualProgramRepository, InterventionRepository, ProgramBookRepository, ProjectRepository,
};
use crate::domain::intervention::Intervention;
use crate::domain::program_book::ProgramBook;
use crate::domain::project::{Project, ProjectStatus};

#[derive(Debug, Default)]
pub struct ConsistencyOutcome {
    pub refreshed_program_book_ids: Vec<String>,
    pub synced_annual_program_ids: Vec<String>,
}

/// Runs the full consistency pass.
///
/// Both project images must carry their hydrated intervention views;
/// `interventions_to_save` is the set the caller wants persisted in step
/// two (normally the updated hydrated view plus any detached intervention).
pub fn recompute_consistency<S>(
    store: &mut S,
    original: &Project,
    updated: &Project,
    original_intervention: Option<&Intervention>,
    interventions_to_save: Vec<Intervention>,
) -> Result<ConsistencyOutcome, CapworksError>
where
    S: ProjectRepository
        + InterventionRepository
        + ProgramBookRepository
        + AnnualProgramRepository,
{
    let original_ids = original.program_book_ids();
    let new_ids = updated.program_book_ids();

    let removed: Vec<String> = original_ids
        .iter()
        .filter(|id| !new_ids.contains(id))
        .cloned()
        .collect();

    // A removal already forces a full recompute of the affected books, so
    // finer-grained staleness detection only runs when nothing was removed.
    let affected: Vec<String> = if removed.is_empty() {
        outdated_set(original, updated, original_intervention, &original_ids, &new_ids)
    } else {
        removed.clone()
    };

    // Snapshot every book before the first write.
    let mut books: Vec<ProgramBook> = Vec::with_capacity(affected.len());
    for book_id in &affected {
        books.push(store.get_program_book(book_id)?);
    }

    store.save_project(updated.clone())?;
    store.save_interventions(interventions_to_save)?;

    let mut outcome = ConsistencyOutcome::default();
    for mut book in books {
        if removed.contains(&book.id) {
            book.apply_removal(&updated.id);
        } else {
            book.mark_outdated();
        }
        let mut members: Vec<Project> = Vec::with_capacity(book.project_ids.len());
        for project_id in &book.project_ids {
            // A dangling member aborts the whole pass; partial refreshes
            // are worse than a loud failure here.
            members.push(store.get_project(project_id).map_err(|e| {
                warn!("program book {} references missing member: {}", book.id, e);
                CapworksError::UnexpectedError(format!(
                    "objective recomputation failed for program book {}: {}",
                    book.id, e
                ))
            })?);
        }
        book.recompute_objectives(&members);
        debug!("program book {} refreshed as outdated", book.id);
        outcome.refreshed_program_book_ids.push(book.id.clone());
        store.save_program_book(book)?;
    }

    let program_ids = store.distinct_annual_program_ids(&outcome.refreshed_program_book_ids);
    for program_id in program_ids {
        let books = store.books_for_annual_program(&program_id);
        let mut program = store.get_annual_program(&program_id)?;
        program.sync_status(&books);
        store.save_annual_program(program)?;
        outcome.synced_annual_program_ids.push(program_id);
    }
    Ok(outcome)
}

/// Statuses only a decision can produce; reaching one means the project's
/// years moved (or it died) under every book that held it.
fn is_decision_driven(status: ProjectStatus) -> bool {
    matches!(
        status,
        ProjectStatus::Replanned | ProjectStatus::Postponed | ProjectStatus::Canceled
    )
}

fn union(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out = Vec::new();
    for id in a.iter().chain(b.iter()) {
        if seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    out
}

fn outdated_set(
    original: &Project,
    updated: &Project,
    original_intervention: Option<&Intervention>,
    original_ids: &[String],
    new_ids: &[String],
) -> Vec<String> {
    if is_decision_driven(updated.status) {
        return original_ids.to_vec();
    }

    // Changes to the inputs every priority ordering depends on outdate the
    // book behind every annual period.
    if original.intervention_ids.len() != updated.intervention_ids.len()
        || original.sub_category_ids != updated.sub_category_ids
        || original.service_priorities != updated.service_priorities
    {
        return union(original_ids, new_ids);
    }

    let mut out: Vec<String> = Vec::new();
    for book_id in union(original_ids, new_ids) {
        let mut years: Vec<i32> = Vec::new();
        for project in [original, updated] {
            for period in &project.annual_distribution.annual_periods {
                if period.program_book_id.as_deref() == Some(book_id.as_str())
                    && !years.contains(&period.year)
                {
                    years.push(period.year);
                }
            }
        }
        let stale = years.iter().any(|&year| {
            interventions_for_year(original, year) != interventions_for_year(updated, year)
                || intervention_changed_in_year(original_intervention, updated, year)
        });
        if stale {
            out.push(book_id);
        }
    }
    out
}

fn interventions_for_year(project: &Project, year: i32) -> Vec<&str> {
    let mut ids: Vec<&str> = project
        .interventions
        .iter()
        .filter(|iv| iv.planification_year == year)
        .map(|iv| iv.id.as_str())
        .collect();
    ids.sort_unstable();
    ids
}

fn intervention_changed_in_year(
    original_intervention: Option<&Intervention>,
    updated: &Project,
    year: i32,
) -> bool {
    let Some(before) = original_intervention else {
        return false;
    };
    let Some(after) = updated.interventions.iter().find(|iv| iv.id == before.id) else {
        return false;
    };
    if before.requestor_id != after.requestor_id
        || before.work_type_id != after.work_type_id
        || before.assets != after.assets
    {
        return true;
    }
    let period_of = |iv: &Intervention| {
        iv.annual_distribution
            .annual_periods
            .iter()
            .find(|p| p.year == year)
            .map(|p| (p.account_id.clone(), p.annual_allowance))
    };
    period_of(before) != period_of(after)
}
