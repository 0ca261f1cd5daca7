//! Global budget and length computation.
//!
//! The calculator dispatches on the project's shape, resolved once per
//! project and passed explicitly; nothing in the crate re-tests the shape
//! predicate downstream.

use serde::{Deserialize, Serialize};

use crate::domain::project::{GlobalBudget, Project, ProjectType};

/// Geolocated projects derive their numbers from interventions;
/// non-geolocated projects carry an explicit budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectShape {
    Geolocated,
    NonGeolocated,
}

impl ProjectShape {
    /// A project is non-geolocated iff its type is `other` and it has no
    /// geometry.
    pub fn of(project: &Project) -> Self {
        if project.type_id == ProjectType::Other && project.geometry.is_none() {
            ProjectShape::NonGeolocated
        } else {
            ProjectShape::Geolocated
        }
    }
}

/// Truncates (not rounds) to 3 decimal places, the budget precision used
/// everywhere in the engine.
pub fn truncate_thousandths(value: f64) -> f64 {
    (value * 1000.0).trunc() / 1000.0
}

/// Computes a project's global budget.
///
/// Geolocated: sum of intervention allowances, truncated. With no hydrated
/// interventions the previously-set (or zero) budget is kept. Non-geolocated
/// budgets are explicit inputs and are never recomputed or zeroed here.
pub fn compute_global_budget(project: &Project, shape: ProjectShape) -> GlobalBudget {
    match shape {
        ProjectShape::NonGeolocated => project.global_budget,
        ProjectShape::Geolocated => {
            if project.interventions.is_empty() {
                project.global_budget
            } else {
                let total: f64 = project
                    .interventions
                    .iter()
                    .map(|iv| iv.estimate.allowance)
                    .sum();
                GlobalBudget {
                    allowance: truncate_thousandths(total),
                }
            }
        }
    }
}

/// Computes a project's total linear length from intervention assets.
pub fn compute_length(project: &Project, shape: ProjectShape) -> f64 {
    match shape {
        ProjectShape::NonGeolocated => project.length,
        ProjectShape::Geolocated => {
            if project.interventions.is_empty() {
                project.length
            } else {
                project.interventions.iter().map(|iv| iv.asset_length()).sum()
            }
        }
    }
}

/// Writes both derived numbers back onto the project.
pub fn refresh(project: &mut Project, shape: ProjectShape) {
    project.global_budget = compute_global_budget(project, shape);
    project.length = compute_length(project, shape);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intervention::{Asset, Intervention};

    fn geolocated_project() -> Project {
        let mut project = Project::new("p1", ProjectType::Integrated, 2024, 2025);
        project.interventions.push(Intervention::new("i1", 2024, 1000.0));
        project.interventions.push(Intervention::new("i2", 2025, 2500.0));
        project
    }

    #[test]
    fn shape_predicate() {
        let project = Project::new("p1", ProjectType::Other, 2024, 2024);
        assert_eq!(ProjectShape::of(&project), ProjectShape::NonGeolocated);

        let mut geolocated = Project::new("p2", ProjectType::Other, 2024, 2024);
        geolocated.geometry = Some(serde_json::json!({"type": "Point"}));
        assert_eq!(ProjectShape::of(&geolocated), ProjectShape::Geolocated);

        let integrated = Project::new("p3", ProjectType::Integrated, 2024, 2024);
        assert_eq!(ProjectShape::of(&integrated), ProjectShape::Geolocated);
    }

    #[test]
    fn sums_intervention_allowances() {
        let project = geolocated_project();
        let budget = compute_global_budget(&project, ProjectShape::Geolocated);
        assert_eq!(budget.allowance, 3500.0);
    }

    #[test]
    fn truncates_to_three_decimals() {
        let mut project = geolocated_project();
        project.interventions[0].estimate.set_allowance(0.0015);
        project.interventions[1].estimate.set_allowance(0.0011);
        let budget = compute_global_budget(&project, ProjectShape::Geolocated);
        assert_eq!(budget.allowance, 0.002);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut project = geolocated_project();
        refresh(&mut project, ProjectShape::Geolocated);
        let first = project.global_budget;
        refresh(&mut project, ProjectShape::Geolocated);
        assert_eq!(project.global_budget, first);
    }

    #[test]
    fn keeps_explicit_non_geolocated_budget() {
        let mut project = Project::new("p1", ProjectType::Other, 2024, 2024);
        project.global_budget = GlobalBudget { allowance: 750.0 };
        refresh(&mut project, ProjectShape::NonGeolocated);
        assert_eq!(project.global_budget.allowance, 750.0);
    }

    #[test]
    fn keeps_prior_budget_without_hydrated_interventions() {
        let mut project = Project::new("p1", ProjectType::Integrated, 2024, 2024);
        project.global_budget = GlobalBudget { allowance: 420.0 };
        let budget = compute_global_budget(&project, ProjectShape::Geolocated);
        assert_eq!(budget.allowance, 420.0);
    }

    #[test]
    fn length_sums_assets() {
        let mut project = geolocated_project();
        project.interventions[0].assets.push(Asset {
            id: "a1".to_string(),
            type_id: "roadway".to_string(),
            length: 120.5,
        });
        project.interventions[1].assets.push(Asset {
            id: "a2".to_string(),
            type_id: "sidewalk".to_string(),
            length: 79.5,
        });
        assert_eq!(compute_length(&project, ProjectShape::Geolocated), 200.0);
    }
}
