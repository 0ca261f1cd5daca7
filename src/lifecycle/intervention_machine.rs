//! Intervention status state machine.
//!
//! The transition graph is a static table of (from-set, to, guard) records,
//! so the legal edges are enumerable without executing any handler. Guards
//! are pure predicates over the intervention's decision ledger and its
//! project link.

use log::debug;

use crate::core::error::CapworksError;
use crate::domain::decision::{Decision, DecisionKind};
use crate::domain::intervention::{Intervention, InterventionStatus};
use crate::domain::project::Project;

use InterventionStatus::{Accepted, Canceled, Integrated, Refused, Waiting, Wished};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    RequiresDecision(DecisionKind),
    RequiresIntegratedProject,
}

pub struct Transition {
    pub from: &'static [Option<InterventionStatus>],
    pub to: InterventionStatus,
    pub guard: Guard,
}

/// The complete legal transition table. `None` is the transient
/// "not yet created" source.
pub const TRANSITIONS: &[Transition] = &[
    Transition {
        from: &[None],
        to: Wished,
        guard: Guard::Always,
    },
    Transition {
        from: &[Some(Waiting)],
        to: Wished,
        guard: Guard::RequiresDecision(DecisionKind::Returned),
    },
    Transition {
        from: &[None, Some(Wished)],
        to: Waiting,
        guard: Guard::Always,
    },
    Transition {
        from: &[Some(Refused)],
        to: Waiting,
        guard: Guard::RequiresDecision(DecisionKind::RevisionRequest),
    },
    Transition {
        from: &[Some(Waiting), Some(Accepted)],
        to: Refused,
        guard: Guard::RequiresDecision(DecisionKind::Refused),
    },
    Transition {
        from: &[Some(Waiting)],
        to: Accepted,
        guard: Guard::RequiresDecision(DecisionKind::Accepted),
    },
    Transition {
        from: &[Some(Waiting), Some(Accepted)],
        to: Integrated,
        guard: Guard::RequiresIntegratedProject,
    },
    Transition {
        from: &[
            Some(Wished),
            Some(Waiting),
            Some(Refused),
            Some(Accepted),
            Some(Integrated),
        ],
        to: Canceled,
        guard: Guard::Always,
    },
];

fn find_edge(
    from: Option<InterventionStatus>,
    to: InterventionStatus,
) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.to == to && t.from.contains(&from))
}

/// True when the pair is listed (ignoring guards). Same-status pairs are
/// no-op successes and always allowed.
pub fn can_transition(from: Option<InterventionStatus>, to: InterventionStatus) -> bool {
    from == Some(to) || find_edge(from, to).is_some()
}

fn check_guard(intervention: &Intervention, edge: &Transition) -> Result<(), CapworksError> {
    let from = intervention.status.as_str().to_string();
    match edge.guard {
        Guard::Always => Ok(()),
        Guard::RequiresDecision(kind) => {
            if intervention.decisions.has_kind(kind) {
                Ok(())
            } else {
                Err(CapworksError::MissingDecision {
                    from,
                    to: edge.to.as_str().to_string(),
                    required: kind.as_str().to_string(),
                })
            }
        }
        Guard::RequiresIntegratedProject => {
            let integrates = intervention
                .project
                .as_ref()
                .map(|link| link.type_id.integrates_interventions())
                .unwrap_or(false);
            if integrates {
                Ok(())
            } else {
                Err(CapworksError::validation(
                    "project.typeId",
                    "integration requires an integrated or integratedgp project",
                ))
            }
        }
    }
}

/// Moves the intervention to `to`, enforcing table membership and the
/// edge's guard.
///
/// Same-status calls are no-op successes. Unless the target is `refused` or
/// `canceled`, a decision carrying a target year moves both year fields.
/// `decision_required` is recomputed on every successful call.
pub fn transition(
    intervention: &mut Intervention,
    to: InterventionStatus,
    decision: Option<&Decision>,
) -> Result<(), CapworksError> {
    let from = intervention.status;
    if from == to {
        intervention.recompute_decision_required();
        return Ok(());
    }
    let edge = find_edge(Some(from), to).ok_or_else(|| CapworksError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    })?;
    check_guard(intervention, edge)?;

    intervention.status = to;
    if !matches!(to, Refused | Canceled) {
        if let Some(year) = decision.and_then(|d| d.target_year) {
            intervention.planification_year = year;
            intervention.intervention_year = year;
        }
    }
    intervention.recompute_decision_required();
    debug!(
        "intervention {} moved {} -> {}",
        intervention.id,
        from.as_str(),
        to.as_str()
    );
    Ok(())
}

/// Target status a decision kind drives an intervention toward, when any.
/// Postponements and replans move years without forcing a status.
fn status_for_decision(kind: DecisionKind) -> Option<InterventionStatus> {
    match kind {
        DecisionKind::Accepted => Some(Accepted),
        DecisionKind::Refused => Some(Refused),
        DecisionKind::Returned => Some(Wished),
        DecisionKind::RevisionRequest => Some(Waiting),
        DecisionKind::Canceled => Some(Canceled),
        DecisionKind::Postponed
        | DecisionKind::Replanned
        | DecisionKind::RemoveFromProgramBook => None,
    }
}

/// Records the decision (newest-first) and applies its implied transition
/// or year move.
pub fn apply_decision(
    intervention: &mut Intervention,
    decision: Decision,
) -> Result<(), CapworksError> {
    if decision.kind == DecisionKind::RemoveFromProgramBook {
        return Err(CapworksError::validation(
            "typeId",
            "'removeFromProgramBook' is not an intervention decision",
        ));
    }
    let target = status_for_decision(decision.kind);
    intervention.decisions.record(decision.clone());
    match target {
        Some(status) => transition(intervention, status, Some(&decision))?,
        None => {
            if let Some(year) = decision.target_year {
                intervention.planification_year = year;
                intervention.intervention_year = year;
            }
            intervention.recompute_decision_required();
        }
    }
    Ok(())
}

/// Status the owning project implies for its interventions.
pub fn status_implied_by_project(project: &Project) -> InterventionStatus {
    use crate::domain::project::ProjectStatus;
    if project.status == ProjectStatus::Canceled {
        Canceled
    } else if project.type_id.integrates_interventions() {
        Integrated
    } else {
        Accepted
    }
}

/// Re-runs the machine over every hydrated intervention toward the status
/// the project implies. Edges that are not legal for a given intervention
/// are skipped rather than failed: re-derivation only applies lawful moves.
pub fn rederive_statuses(project: &mut Project) {
    let target = status_implied_by_project(project);
    let link = crate::domain::intervention::ProjectLink {
        id: project.id.clone(),
        type_id: project.type_id,
    };
    for intervention in &mut project.interventions {
        intervention.project = Some(link.clone());
        match transition(intervention, target, None) {
            Ok(()) => {}
            Err(err) => debug!(
                "intervention {} kept status {}: {}",
                intervention.id,
                intervention.status.as_str(),
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_intervention() -> Intervention {
        let mut intervention = Intervention::new("i1", 2024, 100.0);
        intervention.status = Waiting;
        intervention
    }

    #[test]
    fn refusal_requires_a_refused_decision() {
        let mut intervention = waiting_intervention();
        let err = transition(&mut intervention, Refused, None).unwrap_err();
        assert_eq!(err.code(), "missingDecision");

        intervention
            .decisions
            .record(Decision::new(DecisionKind::Refused, "t"));
        transition(&mut intervention, Refused, None).unwrap();
        assert_eq!(intervention.status, Refused);
    }

    #[test]
    fn refused_to_waiting_needs_revision_request() {
        let mut intervention = waiting_intervention();
        intervention.status = Refused;
        let err = transition(&mut intervention, Waiting, None).unwrap_err();
        assert_eq!(err.code(), "missingDecision");

        intervention
            .decisions
            .record(Decision::new(DecisionKind::RevisionRequest, "t"));
        transition(&mut intervention, Waiting, None).unwrap();
        assert_eq!(intervention.status, Waiting);
    }

    #[test]
    fn same_status_is_noop_success() {
        let mut intervention = waiting_intervention();
        transition(&mut intervention, Waiting, None).unwrap();
        assert_eq!(intervention.status, Waiting);
    }

    #[test]
    fn refusal_never_moves_years() {
        let mut intervention = waiting_intervention();
        let decision = Decision::new(DecisionKind::Refused, "t").with_target_year(2030);
        apply_decision(&mut intervention, decision).unwrap();
        assert_eq!(intervention.status, Refused);
        assert_eq!(intervention.planification_year, 2024);
    }

    #[test]
    fn acceptance_moves_years_to_target() {
        let mut intervention = waiting_intervention();
        let decision = Decision::new(DecisionKind::Accepted, "t").with_target_year(2026);
        apply_decision(&mut intervention, decision).unwrap();
        assert_eq!(intervention.status, Accepted);
        assert_eq!(intervention.planification_year, 2026);
        assert_eq!(intervention.intervention_year, 2026);
    }

    #[test]
    fn integration_needs_integrated_project() {
        let mut intervention = waiting_intervention();
        let err = transition(&mut intervention, Integrated, None).unwrap_err();
        assert_eq!(err.code(), "invalidInput");

        intervention.project = Some(crate::domain::intervention::ProjectLink {
            id: "p1".to_string(),
            type_id: crate::domain::project::ProjectType::IntegratedGp,
        });
        transition(&mut intervention, Integrated, None).unwrap();
        assert_eq!(intervention.status, Integrated);
    }

    #[test]
    fn unlisted_pairs_fail_as_invalid() {
        let mut intervention = Intervention::new("i1", 2024, 100.0);
        intervention.status = Canceled;
        let err = transition(&mut intervention, Waiting, None).unwrap_err();
        match err {
            CapworksError::InvalidTransition { from, to } => {
                assert_eq!(from, "canceled");
                assert_eq!(to, "waiting");
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn full_transition_table_closure() {
        // Every listed edge is reachable, everything else rejected.
        let all = [Wished, Waiting, Refused, Accepted, Integrated, Canceled];
        let legal: &[(Option<InterventionStatus>, InterventionStatus)] = &[
            (None, Wished),
            (Some(Waiting), Wished),
            (None, Waiting),
            (Some(Wished), Waiting),
            (Some(Refused), Waiting),
            (Some(Waiting), Refused),
            (Some(Accepted), Refused),
            (Some(Waiting), Accepted),
            (Some(Waiting), Integrated),
            (Some(Accepted), Integrated),
            (Some(Wished), Canceled),
            (Some(Waiting), Canceled),
            (Some(Refused), Canceled),
            (Some(Accepted), Canceled),
            (Some(Integrated), Canceled),
        ];
        for from in std::iter::once(None).chain(all.iter().map(|s| Some(*s))) {
            for to in all {
                let expected = from == Some(to) || legal.contains(&(from, to));
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "pair {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }
}
