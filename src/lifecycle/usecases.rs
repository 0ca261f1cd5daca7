//! Use-case facade over the repositories.
//!
//! Each operation runs to completion within one logical request: snapshot
//! reads first, then the in-memory cascade, then persistence in the fixed
//! order project, interventions, program books, annual program sync. Every
//! mutating operation takes an explicit actor and ends with a history
//! record.

use log::info;
use serde_json::json;

use crate::core::config::PlanningConfig;
use crate::core::error::CapworksError;
use crate::core::history::HistoryRecord;
use crate::core::store::{
    AnnualProgramRepository, HistoryRepository, InterventionRepository, ProgramBookRepository,
    ProjectRepository,
};
use crate::domain::decision::{Decision, DecisionKind};
use crate::domain::intervention::{Intervention, InterventionStatus, ProjectLink};
use crate::domain::program_book::ProgramBook;
use crate::domain::project::{Project, ProjectStatus};
use crate::lifecycle::budget::{self, ProjectShape};
use crate::lifecycle::coordinator::{self, ConsistencyOutcome};
use crate::lifecycle::distribution;
use crate::lifecycle::intervention_machine;
use crate::lifecycle::project_machine;

pub struct Planner<'a, S> {
    store: &'a mut S,
    config: PlanningConfig,
}

impl<'a, S> Planner<'a, S>
where
    S: ProjectRepository
        + InterventionRepository
        + ProgramBookRepository
        + AnnualProgramRepository
        + HistoryRepository,
{
    pub fn new(store: &'a mut S, config: PlanningConfig) -> Self {
        Self { store, config }
    }

    fn hydrate(&self, project: &mut Project) -> Result<(), CapworksError> {
        let mut interventions = Vec::with_capacity(project.intervention_ids.len());
        for id in &project.intervention_ids {
            interventions.push(self.store.get_intervention(id)?);
        }
        project.interventions = interventions;
        Ok(())
    }

    fn record_history(
        &mut self,
        actor: &str,
        entity_type: &str,
        entity_id: &str,
        operation: &str,
        payload: serde_json::Value,
    ) -> Result<(), CapworksError> {
        self.store
            .append_history(HistoryRecord::new(
                actor,
                entity_type,
                entity_id,
                operation,
                payload,
            ))
            .map_err(|e| CapworksError::UnexpectedError(format!("history append failed: {}", e)))
    }

    fn refresh_derived(project: &mut Project) {
        let shape = ProjectShape::of(project);
        distribution::recompute(project, shape);
        budget::refresh(project, shape);
    }

    /// Validation boundary for new or imported projects.
    pub fn create_project(
        &mut self,
        mut project: Project,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        project.validate(&self.config)?;
        self.hydrate(&mut project)?;
        let link = ProjectLink {
            id: project.id.clone(),
            type_id: project.type_id,
        };
        for intervention in &mut project.interventions {
            intervention.project = Some(link.clone());
        }
        Self::refresh_derived(&mut project);
        self.store.save_project(project.clone())?;
        self.store.save_interventions(project.interventions.clone())?;
        self.record_history(
            actor,
            "project",
            &project.id.clone(),
            "create",
            json!({"status": project.status, "startYear": project.start_year, "endYear": project.end_year}),
        )?;
        info!("project {} created by {}", project.id, actor);
        Ok(project)
    }

    /// Validation boundary for new or imported interventions.
    pub fn create_intervention(
        &mut self,
        intervention: Intervention,
        actor: &str,
    ) -> Result<Intervention, CapworksError> {
        intervention.validate(&self.config)?;
        if !intervention_machine::can_transition(None, intervention.status) {
            return Err(CapworksError::InvalidTransition {
                from: "null".to_string(),
                to: intervention.status.as_str().to_string(),
            });
        }
        self.store.save_intervention(intervention.clone())?;
        self.record_history(
            actor,
            "intervention",
            &intervention.id.clone(),
            "create",
            json!({"status": intervention.status, "planificationYear": intervention.planification_year}),
        )?;
        Ok(intervention)
    }

    pub fn add_intervention_to_project(
        &mut self,
        project_id: &str,
        intervention_id: &str,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        let mut project = self.store.get_project(project_id)?;
        self.hydrate(&mut project)?;
        let original = project.clone();

        let mut intervention = self.store.get_intervention(intervention_id)?;
        intervention.project = Some(ProjectLink {
            id: project.id.clone(),
            type_id: project.type_id,
        });
        project.link_intervention(intervention_id);
        project.interventions.push(intervention);
        Self::refresh_derived(&mut project);

        let saves = project.interventions.clone();
        coordinator::recompute_consistency(self.store, &original, &project, None, saves)?;
        self.record_history(
            actor,
            "project",
            project_id,
            "addIntervention",
            json!({"interventionId": intervention_id}),
        )?;
        Ok(project)
    }

    pub fn remove_intervention_from_project(
        &mut self,
        project_id: &str,
        intervention_id: &str,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        let mut project = self.store.get_project(project_id)?;
        self.hydrate(&mut project)?;
        if !project.contains_intervention(intervention_id) {
            return Err(CapworksError::NotFound(format!(
                "intervention {} in project {}",
                intervention_id, project_id
            )));
        }
        let original = project.clone();

        let mut detached = self.store.get_intervention(intervention_id)?;
        detached.project = None;
        detached.annual_distribution.annual_periods.clear();
        project.unlink_intervention(intervention_id);
        Self::refresh_derived(&mut project);

        let mut saves = project.interventions.clone();
        saves.push(detached);
        coordinator::recompute_consistency(self.store, &original, &project, None, saves)?;
        self.record_history(
            actor,
            "project",
            project_id,
            "removeIntervention",
            json!({"interventionId": intervention_id}),
        )?;
        Ok(project)
    }

    /// Applies a project-level decision and runs the full cascade.
    pub fn apply_project_decision(
        &mut self,
        project_id: &str,
        decision: Decision,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        let mut project = self.store.get_project(project_id)?;
        self.hydrate(&mut project)?;
        let original = project.clone();

        // Remaining-membership snapshot, read before any write.
        let remaining: Vec<ProgramBook> = if decision.kind == DecisionKind::RemoveFromProgramBook
        {
            let leaving = decision.program_book_id.clone().unwrap_or_default();
            self.store
                .books_containing_project(project_id)
                .into_iter()
                .filter(|b| b.id != leaving)
                .collect()
        } else {
            Vec::new()
        };

        project_machine::apply_decision(&mut project, decision.clone(), &remaining, actor)?;

        let saves = project.interventions.clone();
        let outcome =
            coordinator::recompute_consistency(self.store, &original, &project, None, saves)?;
        self.record_history(
            actor,
            "project",
            project_id,
            "decision",
            json!({
                "typeId": decision.kind,
                "status": project.status,
                "refreshedProgramBooks": outcome.refreshed_program_book_ids,
            }),
        )?;
        Ok(project)
    }

    /// Applies an intervention-level decision, cascading through the owning
    /// project when one exists.
    pub fn apply_intervention_decision(
        &mut self,
        intervention_id: &str,
        decision: Decision,
        actor: &str,
    ) -> Result<Intervention, CapworksError> {
        let original_intervention = self.store.get_intervention(intervention_id)?;
        let mut intervention = original_intervention.clone();
        intervention_machine::apply_decision(&mut intervention, decision.clone())?;

        self.persist_intervention_change(&original_intervention, &intervention)?;
        self.record_history(
            actor,
            "intervention",
            intervention_id,
            "decision",
            json!({"typeId": decision.kind, "status": intervention.status}),
        )?;
        Ok(intervention)
    }

    /// Replaces an intervention wholesale (allowance, assets, accounts...)
    /// and propagates the change.
    pub fn update_intervention(
        &mut self,
        updated: Intervention,
        actor: &str,
    ) -> Result<Intervention, CapworksError> {
        let original = self.store.get_intervention(&updated.id)?;
        updated.validate(&self.config)?;
        self.persist_intervention_change(&original, &updated)?;
        self.record_history(
            actor,
            "intervention",
            &updated.id.clone(),
            "update",
            json!({"allowance": updated.estimate.allowance}),
        )?;
        Ok(updated)
    }

    pub fn transition_project(
        &mut self,
        project_id: &str,
        to: ProjectStatus,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        let mut project = self.store.get_project(project_id)?;
        self.hydrate(&mut project)?;
        let original = project.clone();
        project_machine::transition(&mut project, to, None, actor)?;
        let saves = project.interventions.clone();
        coordinator::recompute_consistency(self.store, &original, &project, None, saves)?;
        self.record_history(
            actor,
            "project",
            project_id,
            "transition",
            json!({"status": project.status}),
        )?;
        Ok(project)
    }

    pub fn transition_intervention(
        &mut self,
        intervention_id: &str,
        to: InterventionStatus,
        actor: &str,
    ) -> Result<Intervention, CapworksError> {
        let original = self.store.get_intervention(intervention_id)?;
        let mut intervention = original.clone();
        intervention_machine::transition(&mut intervention, to, None)?;
        self.persist_intervention_change(&original, &intervention)?;
        self.record_history(
            actor,
            "intervention",
            intervention_id,
            "transition",
            json!({"status": intervention.status}),
        )?;
        Ok(intervention)
    }

    /// Links the project's annual period for the book's year, validates the
    /// prefix invariant, programs the project, and refreshes the book.
    pub fn add_project_to_program_book(
        &mut self,
        project_id: &str,
        program_book_id: &str,
        actor: &str,
    ) -> Result<Project, CapworksError> {
        let mut book = self.store.get_program_book(program_book_id)?;
        let mut annual_program = self.store.get_annual_program(&book.annual_program_id)?;
        let mut project = self.store.get_project(project_id)?;
        self.hydrate(&mut project)?;

        let year = annual_program.year;
        let period = project
            .annual_distribution
            .annual_periods
            .iter_mut()
            .find(|p| p.year == year)
            .ok_or_else(|| {
                CapworksError::validation(
                    "annualPeriods",
                    format!("project {} has no annual period for year {}", project_id, year),
                )
            })?;
        period.program_book_id = Some(book.id.clone());
        project.validate_program_book_prefix()?;

        project_machine::transition(&mut project, ProjectStatus::Programmed, None, actor)?;
        book.admit_project(&project.id);

        self.store.save_project(project.clone())?;
        self.store.save_interventions(project.interventions.clone())?;
        let mut members = Vec::with_capacity(book.project_ids.len());
        for member_id in &book.project_ids {
            members.push(self.store.get_project(member_id)?);
        }
        book.recompute_objectives(&members);
        self.store.save_program_book(book)?;
        let books = self.store.books_for_annual_program(&annual_program.id);
        annual_program.sync_status(&books);
        self.store.save_annual_program(annual_program)?;

        self.record_history(
            actor,
            "project",
            project_id,
            "addToProgramBook",
            json!({"programBookId": program_book_id, "year": year}),
        )?;
        Ok(project)
    }

    /// Shared tail for intervention mutations: no project means a plain
    /// save, otherwise the owning project's derived numbers are refreshed
    /// and the consistency pass runs with the before-image.
    fn persist_intervention_change(
        &mut self,
        original_intervention: &Intervention,
        intervention: &Intervention,
    ) -> Result<Option<ConsistencyOutcome>, CapworksError> {
        let Some(link) = intervention.project.clone() else {
            self.store.save_intervention(intervention.clone())?;
            return Ok(None);
        };
        let mut project = self.store.get_project(&link.id)?;
        self.hydrate(&mut project)?;
        let original_project = project.clone();
        if let Some(slot) = project
            .interventions
            .iter_mut()
            .find(|iv| iv.id == intervention.id)
        {
            *slot = intervention.clone();
        } else {
            return Err(CapworksError::UnexpectedError(format!(
                "intervention {} carries a link to project {} that does not own it",
                intervention.id, link.id
            )));
        }
        Self::refresh_derived(&mut project);
        let saves = project.interventions.clone();
        let outcome = coordinator::recompute_consistency(
            self.store,
            &original_project,
            &project,
            Some(original_intervention),
            saves,
        )?;
        Ok(Some(outcome))
    }
}
