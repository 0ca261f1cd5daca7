//! Repository seams and the in-memory aggregate arena.
//!
//! The engine never follows object pointers across aggregates; every
//! cross-aggregate edge is an id plus a repository lookup. `MemoryStore` is
//! the bundled arena implementation; durable backends live behind the same
//! traits outside this crate.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::CapworksError;
use crate::core::history::{HistoryLog, HistoryRecord};
use crate::domain::annual_program::AnnualProgram;
use crate::domain::intervention::Intervention;
use crate::domain::program_book::ProgramBook;
use crate::domain::project::Project;

pub type RepoResult<T> = Result<T, CapworksError>;

pub trait ProjectRepository {
    fn find_project(&self, id: &str) -> Option<Project>;
    fn all_projects(&self) -> Vec<Project>;
    fn save_project(&mut self, project: Project) -> RepoResult<()>;
    fn delete_project(&mut self, id: &str) -> RepoResult<()>;

    fn get_project(&self, id: &str) -> RepoResult<Project> {
        self.find_project(id)
            .ok_or_else(|| CapworksError::NotFound(format!("project {}", id)))
    }
}

pub trait InterventionRepository {
    fn find_intervention(&self, id: &str) -> Option<Intervention>;
    fn all_interventions(&self) -> Vec<Intervention>;
    fn save_intervention(&mut self, intervention: Intervention) -> RepoResult<()>;
    /// Bulk save, applied in slice order.
    fn save_interventions(&mut self, interventions: Vec<Intervention>) -> RepoResult<()> {
        for intervention in interventions {
            self.save_intervention(intervention)?;
        }
        Ok(())
    }
    fn delete_intervention(&mut self, id: &str) -> RepoResult<()>;

    fn get_intervention(&self, id: &str) -> RepoResult<Intervention> {
        self.find_intervention(id)
            .ok_or_else(|| CapworksError::NotFound(format!("intervention {}", id)))
    }
}

pub trait ProgramBookRepository {
    fn find_program_book(&self, id: &str) -> Option<ProgramBook>;
    fn find_program_books(&self, ids: &[String]) -> Vec<ProgramBook>;
    /// Books owned by the given annual program, ordered by id.
    fn books_for_annual_program(&self, annual_program_id: &str) -> Vec<ProgramBook>;
    /// Books whose membership includes the given project, ordered by id.
    fn books_containing_project(&self, project_id: &str) -> Vec<ProgramBook>;
    fn save_program_book(&mut self, book: ProgramBook) -> RepoResult<()>;
    /// Distinct owning annual program ids across the given books.
    fn distinct_annual_program_ids(&self, ids: &[String]) -> Vec<String>;

    fn get_program_book(&self, id: &str) -> RepoResult<ProgramBook> {
        self.find_program_book(id)
            .ok_or_else(|| CapworksError::NotFound(format!("program book {}", id)))
    }
}

pub trait AnnualProgramRepository {
    fn find_annual_program(&self, id: &str) -> Option<AnnualProgram>;
    fn save_annual_program(&mut self, program: AnnualProgram) -> RepoResult<()>;

    fn get_annual_program(&self, id: &str) -> RepoResult<AnnualProgram> {
        self.find_annual_program(id)
            .ok_or_else(|| CapworksError::NotFound(format!("annual program {}", id)))
    }
}

pub trait HistoryRepository {
    /// Write-only audit sink; failure surfaces as an unexpected error.
    fn append_history(&mut self, record: HistoryRecord) -> RepoResult<()>;
}

/// Id-keyed arena holding every aggregate, serializable as a scenario file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub projects: FxHashMap<String, Project>,
    #[serde(default)]
    pub interventions: FxHashMap<String, Intervention>,
    #[serde(rename = "programBooks", default)]
    pub program_books: FxHashMap<String, ProgramBook>,
    #[serde(rename = "annualPrograms", default)]
    pub annual_programs: FxHashMap<String, AnnualProgram>,
    #[serde(default)]
    pub history: HistoryLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectRepository for MemoryStore {
    fn find_project(&self, id: &str) -> Option<Project> {
        self.projects.get(id).cloned()
    }

    fn all_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        projects
    }

    fn save_project(&mut self, mut project: Project) -> RepoResult<()> {
        // The hydrated intervention view is transient and never persisted.
        project.interventions.clear();
        self.projects.insert(project.id.clone(), project);
        Ok(())
    }

    fn delete_project(&mut self, id: &str) -> RepoResult<()> {
        self.projects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CapworksError::NotFound(format!("project {}", id)))
    }
}

impl InterventionRepository for MemoryStore {
    fn find_intervention(&self, id: &str) -> Option<Intervention> {
        self.interventions.get(id).cloned()
    }

    fn all_interventions(&self) -> Vec<Intervention> {
        let mut interventions: Vec<Intervention> =
            self.interventions.values().cloned().collect();
        interventions.sort_by(|a, b| a.id.cmp(&b.id));
        interventions
    }

    fn save_intervention(&mut self, intervention: Intervention) -> RepoResult<()> {
        self.interventions
            .insert(intervention.id.clone(), intervention);
        Ok(())
    }

    fn delete_intervention(&mut self, id: &str) -> RepoResult<()> {
        self.interventions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CapworksError::NotFound(format!("intervention {}", id)))
    }
}

impl ProgramBookRepository for MemoryStore {
    fn find_program_book(&self, id: &str) -> Option<ProgramBook> {
        self.program_books.get(id).cloned()
    }

    fn find_program_books(&self, ids: &[String]) -> Vec<ProgramBook> {
        ids.iter()
            .filter_map(|id| self.program_books.get(id).cloned())
            .collect()
    }

    fn books_for_annual_program(&self, annual_program_id: &str) -> Vec<ProgramBook> {
        let mut books: Vec<ProgramBook> = self
            .program_books
            .values()
            .filter(|b| b.annual_program_id == annual_program_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        books
    }

    fn books_containing_project(&self, project_id: &str) -> Vec<ProgramBook> {
        let mut books: Vec<ProgramBook> = self
            .program_books
            .values()
            .filter(|b| b.contains_project(project_id))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        books
    }

    fn save_program_book(&mut self, book: ProgramBook) -> RepoResult<()> {
        self.program_books.insert(book.id.clone(), book);
        Ok(())
    }

    fn distinct_annual_program_ids(&self, ids: &[String]) -> Vec<String> {
        let mut program_ids: Vec<String> = Vec::new();
        for book in self.find_program_books(ids) {
            if !program_ids.iter().any(|id| *id == book.annual_program_id) {
                program_ids.push(book.annual_program_id.clone());
            }
        }
        program_ids
    }
}

impl AnnualProgramRepository for MemoryStore {
    fn find_annual_program(&self, id: &str) -> Option<AnnualProgram> {
        self.annual_programs.get(id).cloned()
    }

    fn save_annual_program(&mut self, program: AnnualProgram) -> RepoResult<()> {
        self.annual_programs.insert(program.id.clone(), program);
        Ok(())
    }
}

impl HistoryRepository for MemoryStore {
    fn append_history(&mut self, record: HistoryRecord) -> RepoResult<()> {
        self.history.append(record)
    }
}
