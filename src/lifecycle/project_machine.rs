//! Project status state machine.
//!
//! Transition validity is table-driven like the intervention machine, but
//! every edge executes a named handler: moving a project drags its
//! interventions, annual periods, and derived numbers along with it.

use log::debug;

use crate::core::error::CapworksError;
use crate::domain::decision::{Decision, DecisionKind};
use crate::domain::project::{Project, ProjectStatus};
use crate::domain::program_book::{ProgramBook, ProgramBookStatus};
use crate::lifecycle::budget::{self, ProjectShape};
use crate::lifecycle::distribution;
use crate::lifecycle::intervention_machine;

use ProjectStatus::{
    Canceled, FinalOrdered, Planned, Postponed, PreliminaryOrdered, Programmed, Replanned,
};

pub struct Transition {
    pub from: &'static [Option<ProjectStatus>],
    pub to: ProjectStatus,
}

/// The complete legal transition table. `None` is the not-yet-created
/// source used on first persistence.
pub const TRANSITIONS: &[Transition] = &[
    Transition {
        from: &[None, Some(Programmed), Some(PreliminaryOrdered), Some(FinalOrdered)],
        to: Planned,
    },
    Transition {
        from: &[
            Some(Planned),
            Some(Replanned),
            Some(Programmed),
            Some(PreliminaryOrdered),
            Some(FinalOrdered),
            Some(Postponed),
        ],
        to: Replanned,
    },
    Transition {
        from: &[Some(PreliminaryOrdered), Some(FinalOrdered), Some(Programmed)],
        to: Postponed,
    },
    Transition {
        from: &[
            Some(Planned),
            Some(Replanned),
            Some(Programmed),
            Some(PreliminaryOrdered),
            Some(Postponed),
            Some(FinalOrdered),
        ],
        to: Canceled,
    },
    Transition {
        from: &[
            Some(Planned),
            Some(Replanned),
            Some(Postponed),
            Some(PreliminaryOrdered),
            Some(FinalOrdered),
        ],
        to: Programmed,
    },
    Transition {
        from: &[Some(Programmed), Some(FinalOrdered)],
        to: PreliminaryOrdered,
    },
    Transition {
        from: &[Some(Programmed), Some(PreliminaryOrdered)],
        to: FinalOrdered,
    },
];

fn find_edge(from: Option<ProjectStatus>, to: ProjectStatus) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.to == to && t.from.contains(&from))
}

/// True when the pair is listed, or a no-op same-status pair.
pub fn can_transition(from: Option<ProjectStatus>, to: ProjectStatus) -> bool {
    from == Some(to) || find_edge(from, to).is_some()
}

fn invalid(from: ProjectStatus, to: ProjectStatus) -> CapworksError {
    CapworksError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

/// Moves the project to `to`, running the handler attached to the edge.
///
/// Pairs listed in the table always run their handler (a replanned project
/// can be replanned again with new years); unlisted same-status pairs are
/// no-op successes; anything else is an invalid transition.
pub fn transition(
    project: &mut Project,
    to: ProjectStatus,
    decision: Option<&Decision>,
    actor: &str,
) -> Result<(), CapworksError> {
    let from = project.status;
    if find_edge(Some(from), to).is_none() {
        if from == to {
            return Ok(());
        }
        return Err(invalid(from, to));
    }

    match to {
        Planned => handle_return_to_planned(project),
        Replanned | Postponed => handle_reassign_years(project, to, decision, actor),
        Canceled => handle_cancel(project),
        Programmed | PreliminaryOrdered | FinalOrdered => {
            project.status = to;
            Ok(())
        }
    }?;
    debug!(
        "project {} moved {} -> {}",
        project.id,
        from.as_str(),
        to.as_str()
    );
    Ok(())
}

fn handle_return_to_planned(project: &mut Project) -> Result<(), CapworksError> {
    if project.geometry.is_some() && project.intervention_ids.is_empty() {
        return Err(CapworksError::validation(
            "interventionIds",
            "a geolocated project cannot return to planned without interventions",
        ));
    }
    project.clear_program_book_links();
    project.status = Planned;
    intervention_machine::rederive_statuses(project);
    let shape = ProjectShape::of(project);
    distribution::recompute(project, shape);
    budget::refresh(project, shape);
    Ok(())
}

fn handle_reassign_years(
    project: &mut Project,
    to: ProjectStatus,
    decision: Option<&Decision>,
    actor: &str,
) -> Result<(), CapworksError> {
    let decision = decision.ok_or_else(|| {
        CapworksError::validation("decision", "year reassignment requires a decision")
    })?;
    let new_start = decision.start_year.ok_or_else(|| {
        CapworksError::validation("startYear", "startYear is required to reassign years")
    })?;
    let new_end = decision.end_year.ok_or_else(|| {
        CapworksError::validation("endYear", "endYear is required to reassign years")
    })?;
    if new_start > new_end {
        return Err(CapworksError::validation(
            "startYear",
            format!("startYear {} exceeds endYear {}", new_start, new_end),
        ));
    }
    if new_start == project.start_year && new_end == project.end_year {
        return Err(CapworksError::validation(
            "startYear",
            "requested year range equals the current range",
        ));
    }

    let old_start = project.start_year;
    let old_end = project.end_year;
    project.start_year = new_start;
    project.end_year = new_end;

    let synthetic_kind = if to == Postponed {
        DecisionKind::Postponed
    } else {
        DecisionKind::Replanned
    };
    for intervention in &mut project.interventions {
        let clamped = intervention.planification_year.clamp(new_start, new_end);
        let mut synthetic = Decision::new(synthetic_kind, actor)
            .with_target_year(clamped)
            .with_text(format!(
                "project years moved from [{}, {}] to [{}, {}]",
                old_start, old_end, new_start, new_end
            ));
        synthetic.previous_planification_year = Some(intervention.planification_year);
        intervention.decisions.record(synthetic);
        intervention.planification_year = clamped;
        intervention.intervention_year = clamped;
        intervention.recompute_decision_required();
    }

    project.clear_program_book_links();
    project.status = to;
    let shape = ProjectShape::of(project);
    distribution::recompute(project, shape);
    budget::refresh(project, shape);
    intervention_machine::rederive_statuses(project);
    Ok(())
}

fn handle_cancel(project: &mut Project) -> Result<(), CapworksError> {
    project.clear_program_book_links();
    project.status = Canceled;
    intervention_machine::rederive_statuses(project);
    let shape = ProjectShape::of(project);
    distribution::recompute(project, shape);
    budget::refresh(project, shape);
    Ok(())
}

/// Status a past decision implies when walking history for a removal
/// target. Ordering statuses never come from decisions.
fn status_implied_by_decision(kind: DecisionKind) -> Option<ProjectStatus> {
    match kind {
        DecisionKind::Postponed => Some(Postponed),
        DecisionKind::Replanned => Some(Replanned),
        DecisionKind::Canceled => Some(Canceled),
        _ => None,
    }
}

/// Resolves the status a project falls back to when removed from a book.
///
/// With no remaining membership, the most recent prior status implied by
/// history wins (ordering statuses excluded), defaulting to planned. A
/// preliminary-ordered project otherwise follows the highest-priority
/// status among its remaining books.
fn resolve_removal_target(project: &Project, remaining_books: &[ProgramBook]) -> ProjectStatus {
    if remaining_books.is_empty() {
        return project
            .decisions
            .iter()
            .filter_map(|d| status_implied_by_decision(d.kind))
            .find(|status| !status.is_ordering())
            .unwrap_or(Planned);
    }
    if project.status == PreliminaryOrdered {
        if remaining_books
            .iter()
            .any(|b| b.status == ProgramBookStatus::SubmittedFinal)
        {
            return FinalOrdered;
        }
        if remaining_books
            .iter()
            .any(|b| b.status == ProgramBookStatus::SubmittedPreliminary)
        {
            return PreliminaryOrdered;
        }
        return Programmed;
    }
    project.status
}

/// Applies a project-level decision.
///
/// Stamps the previous year range for audit, resolves the target status,
/// prepends the decision, executes the transition, and — only for
/// remove-from-program-book — detaches the targeted annual period(s).
/// `remaining_books` must be fetched before any write of the same
/// operation and must exclude the book being left.
pub fn apply_decision(
    project: &mut Project,
    mut decision: Decision,
    remaining_books: &[ProgramBook],
    actor: &str,
) -> Result<(), CapworksError> {
    decision.previous_start_year = Some(project.start_year);
    decision.previous_end_year = Some(project.end_year);

    match decision.kind {
        DecisionKind::Postponed => {
            project.decisions.record(decision.clone());
            transition(project, Postponed, Some(&decision), actor)
        }
        DecisionKind::Replanned => {
            project.decisions.record(decision.clone());
            transition(project, Replanned, Some(&decision), actor)
        }
        DecisionKind::Canceled => {
            project.decisions.record(decision.clone());
            transition(project, Canceled, Some(&decision), actor)
        }
        DecisionKind::RemoveFromProgramBook => {
            let book_id = decision.program_book_id.clone().ok_or_else(|| {
                CapworksError::validation(
                    "programBookId",
                    "removeFromProgramBook requires the book being left",
                )
            })?;
            let target = resolve_removal_target(project, remaining_books);
            if !can_transition(Some(project.status), target) {
                return Err(invalid(project.status, target));
            }
            project.decisions.record(decision.clone());
            if target == Planned {
                transition(project, Planned, Some(&decision), actor)?;
            } else {
                // Restorative move: the years and distribution stay as they
                // are, only the status falls back.
                project.status = target;
            }
            match decision.target_year {
                Some(year) => project.detach_period_from_book(year, &book_id),
                None => {
                    for period in &mut project.annual_distribution.annual_periods {
                        if period.program_book_id.as_deref() == Some(book_id.as_str()) {
                            period.program_book_id = None;
                        }
                    }
                }
            }
            Ok(())
        }
        other => Err(CapworksError::validation(
            "typeId",
            format!("'{}' is not a project decision", other.as_str()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intervention::Intervention;
    use crate::domain::project::ProjectType;

    fn hydrated_project(status: ProjectStatus) -> Project {
        let mut project = Project::new("p1", ProjectType::Integrated, 2024, 2026);
        project.status = status;
        project.link_intervention("i1");
        let mut intervention = Intervention::new("i1", 2024, 1000.0);
        intervention.status = crate::domain::intervention::InterventionStatus::Accepted;
        project.interventions.push(intervention);
        let shape = ProjectShape::of(&project);
        distribution::recompute(&mut project, shape);
        project
    }

    #[test]
    fn unlisted_pair_fails_and_same_status_is_noop() {
        let mut project = hydrated_project(ProjectStatus::Planned);
        let err = transition(&mut project, Postponed, None, "t").unwrap_err();
        assert_eq!(err.code(), "invalidTransition");

        // planned -> planned is unlisted but same-status, so a no-op.
        transition(&mut project, Planned, None, "t").unwrap();
        assert_eq!(project.status, ProjectStatus::Planned);
    }

    #[test]
    fn reassign_rejects_identical_range() {
        let mut project = hydrated_project(ProjectStatus::Programmed);
        let decision = Decision::new(DecisionKind::Postponed, "t").with_range(2024, 2026);
        let err = apply_decision(&mut project, decision, &[], "t").unwrap_err();
        assert_eq!(err.code(), "invalidInput");
    }

    #[test]
    fn postpone_clamps_interventions_and_clears_links() {
        let mut project = hydrated_project(ProjectStatus::Programmed);
        project.annual_distribution.annual_periods[0].program_book_id =
            Some("book1".to_string());

        let decision = Decision::new(DecisionKind::Postponed, "t").with_range(2025, 2027);
        apply_decision(&mut project, decision, &[], "t").unwrap();

        assert_eq!(project.status, Postponed);
        assert_eq!(project.start_year, 2025);
        assert_eq!(project.end_year, 2027);
        let intervention = &project.interventions[0];
        assert_eq!(intervention.planification_year, 2025);
        let synthetic = intervention.decisions.latest().unwrap();
        assert_eq!(synthetic.kind, DecisionKind::Postponed);
        assert_eq!(synthetic.target_year, Some(2025));
        assert_eq!(synthetic.previous_planification_year, Some(2024));
        assert!(project
            .annual_distribution
            .annual_periods
            .iter()
            .all(|p| p.program_book_id.is_none()));
        // Audit copy of the replaced range sits on the project decision.
        let recorded = project.decisions.latest().unwrap();
        assert_eq!(recorded.previous_start_year, Some(2024));
        assert_eq!(recorded.previous_end_year, Some(2026));
    }

    #[test]
    fn removal_with_no_remaining_books_walks_history() {
        let mut project = hydrated_project(ProjectStatus::Programmed);
        project
            .decisions
            .record(Decision::new(DecisionKind::Postponed, "t"));
        project.annual_distribution.annual_periods[0].program_book_id =
            Some("book1".to_string());

        let decision =
            Decision::new(DecisionKind::RemoveFromProgramBook, "t").with_program_book("book1");
        apply_decision(&mut project, decision, &[], "t").unwrap();
        assert_eq!(project.status, Postponed);
        assert!(project
            .annual_distribution
            .annual_periods
            .iter()
            .all(|p| p.program_book_id.is_none()));
    }

    #[test]
    fn removal_from_preliminary_follows_remaining_book_status() {
        let mut project = hydrated_project(ProjectStatus::PreliminaryOrdered);
        let mut remaining = ProgramBook::new("book2", "ap1");
        remaining.status = ProgramBookStatus::SubmittedFinal;

        let decision =
            Decision::new(DecisionKind::RemoveFromProgramBook, "t").with_program_book("book1");
        apply_decision(&mut project, decision, &[remaining], "t").unwrap();
        assert_eq!(project.status, FinalOrdered);
    }

    #[test]
    fn removal_defaults_to_planned_without_history() {
        let mut project = hydrated_project(ProjectStatus::Programmed);
        let decision =
            Decision::new(DecisionKind::RemoveFromProgramBook, "t").with_program_book("book1");
        apply_decision(&mut project, decision, &[], "t").unwrap();
        assert_eq!(project.status, Planned);
    }

    #[test]
    fn cancel_cascades_to_interventions() {
        let mut project = hydrated_project(ProjectStatus::Programmed);
        let decision = Decision::new(DecisionKind::Canceled, "t");
        apply_decision(&mut project, decision, &[], "t").unwrap();
        assert_eq!(project.status, Canceled);
        assert_eq!(
            project.interventions[0].status,
            crate::domain::intervention::InterventionStatus::Canceled
        );
        // Years are never reassigned by a cancellation.
        assert_eq!(project.start_year, 2024);
        assert_eq!(project.end_year, 2026);
    }

    #[test]
    fn intervention_decisions_are_rejected_for_projects() {
        let mut project = hydrated_project(ProjectStatus::Planned);
        let decision = Decision::new(DecisionKind::Accepted, "t");
        let err = apply_decision(&mut project, decision, &[], "t").unwrap_err();
        assert_eq!(err.code(), "invalidInput");
    }

    #[test]
    fn table_closure_over_all_pairs() {
        let all = [
            Planned,
            Programmed,
            PreliminaryOrdered,
            FinalOrdered,
            Postponed,
            Replanned,
            Canceled,
        ];
        // from -> set of listed targets
        let listed: &[(ProjectStatus, &[ProjectStatus])] = &[
            (Planned, &[Replanned, Canceled, Programmed]),
            (
                Programmed,
                &[Planned, Replanned, Postponed, Canceled, PreliminaryOrdered, FinalOrdered],
            ),
            (
                PreliminaryOrdered,
                &[Planned, Replanned, Postponed, Canceled, Programmed, FinalOrdered],
            ),
            (
                FinalOrdered,
                &[Planned, Replanned, Postponed, Canceled, Programmed, PreliminaryOrdered],
            ),
            (Postponed, &[Replanned, Canceled, Programmed]),
            (Replanned, &[Replanned, Canceled, Programmed]),
            (Canceled, &[]),
        ];
        for (from, targets) in listed {
            for to in all {
                let expected = targets.contains(&to) || *from == to;
                assert_eq!(
                    can_transition(Some(*from), to),
                    expected,
                    "pair {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
        assert!(can_transition(None, Planned));
        assert!(!can_transition(None, Programmed));
    }
}
