//! Annual distribution: splitting a project's budget and work across the
//! calendar years of its range.
//!
//! The engine is caller-invoked only. It must be re-run after project
//! creation, a year-range change, an intervention add/remove, and any
//! allowance change; nothing here auto-triggers.

use log::debug;

use crate::domain::intervention::InterventionAnnualPeriod;
use crate::domain::project::{Project, ProjectAnnualPeriod};
use crate::lifecycle::budget::{self, ProjectShape};

/// Rebuilds the annual periods of the project and of every hydrated
/// intervention for the current [start_year, end_year] range.
///
/// Periods for years that survive the rebuild keep their account and
/// program-book links; years that fell out of range are dropped; new years
/// start empty.
pub fn recompute(project: &mut Project, shape: ProjectShape) {
    match shape {
        ProjectShape::Geolocated => recompute_geolocated(project),
        ProjectShape::NonGeolocated => recompute_non_geolocated(project),
    }
    debug!(
        "distribution rebuilt for project {} over [{}, {}]: {} periods",
        project.id,
        project.start_year,
        project.end_year,
        project.annual_distribution.annual_periods.len()
    );
}

fn year_range(project: &Project) -> Vec<i32> {
    (project.start_year..=project.end_year).collect()
}

fn recompute_geolocated(project: &mut Project) {
    let years = year_range(project);

    // Intervention periods first: each intervention's whole allowance lands
    // on the period whose rank matches its planification year.
    for intervention in &mut project.interventions {
        let old = std::mem::take(&mut intervention.annual_distribution.annual_periods);
        intervention.annual_distribution.annual_periods = years
            .iter()
            .enumerate()
            .map(|(rank, &year)| {
                let prior = old.iter().find(|p| p.year == year);
                InterventionAnnualPeriod {
                    year,
                    rank,
                    annual_allowance: if year == intervention.planification_year {
                        intervention.estimate.allowance
                    } else {
                        0.0
                    },
                    account_id: prior.and_then(|p| p.account_id.clone()),
                }
            })
            .collect();
    }

    // Project periods aggregate the intervention periods year by year.
    let old = std::mem::take(&mut project.annual_distribution.annual_periods);
    let periods: Vec<ProjectAnnualPeriod> = years
        .iter()
        .enumerate()
        .map(|(rank, &year)| {
            let prior = old.iter().find(|p| p.year == year);
            let allowance: f64 = project
                .interventions
                .iter()
                .flat_map(|iv| &iv.annual_distribution.annual_periods)
                .filter(|p| p.year == year)
                .map(|p| p.annual_allowance)
                .sum();
            ProjectAnnualPeriod {
                year,
                rank,
                annual_allowance: budget::truncate_thousandths(allowance),
                program_book_id: prior.and_then(|p| p.program_book_id.clone()),
                account_id: prior.and_then(|p| p.account_id.clone()),
            }
        })
        .collect();
    project.annual_distribution.annual_periods = periods;
}

fn recompute_non_geolocated(project: &mut Project) {
    // Allowances are explicit inputs here; re-windowing preserves them for
    // surviving years and never invents new ones.
    let years = year_range(project);
    let old = std::mem::take(&mut project.annual_distribution.annual_periods);
    project.annual_distribution.annual_periods = years
        .iter()
        .enumerate()
        .map(|(rank, &year)| {
            let prior = old.iter().find(|p| p.year == year);
            ProjectAnnualPeriod {
                year,
                rank,
                annual_allowance: prior.map(|p| p.annual_allowance).unwrap_or(0.0),
                program_book_id: prior.and_then(|p| p.program_book_id.clone()),
                account_id: prior.and_then(|p| p.account_id.clone()),
            }
        })
        .collect();
}
