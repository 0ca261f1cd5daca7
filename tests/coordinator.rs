use capworks::core::config::PlanningConfig;
use capworks::core::store::{
    AnnualProgramRepository, InterventionRepository, MemoryStore, ProgramBookRepository,
    ProjectRepository,
};
use capworks::domain::annual_program::{AnnualProgram, AnnualProgramStatus};
use capworks::domain::intervention::{Asset, Intervention};
use capworks::domain::program_book::{Objective, ObjectiveKind, ProgramBook, ProgramBookStatus};
use capworks::domain::project::{Project, ProjectType};
use capworks::lifecycle::coordinator;
use capworks::lifecycle::usecases::Planner;

fn planner(store: &mut MemoryStore) -> Planner<'_, MemoryStore> {
    Planner::new(store, PlanningConfig::default())
}

/// One programmed project (p1, 2024-2025) with one intervention per year,
/// placed in book1 (annual program ap1, year 2024).
fn seed(store: &mut MemoryStore) {
    let mut p = planner(store);
    let mut i1 = Intervention::new("i1", 2024, 1000.0);
    i1.requestor_id = "borough-11".to_string();
    i1.work_type_id = "reconstruction".to_string();
    p.create_intervention(i1, "t").unwrap();
    p.create_intervention(Intervention::new("i2", 2025, 500.0), "t")
        .unwrap();
    let mut project = Project::new("p1", ProjectType::Integrated, 2024, 2025);
    project.link_intervention("i1");
    project.link_intervention("i2");
    p.create_project(project, "t").unwrap();

    store
        .save_annual_program(AnnualProgram::new("ap1", 2024))
        .unwrap();
    let mut book = ProgramBook::new("book1", "ap1");
    book.status = ProgramBookStatus::Programming;
    book.objectives.push(Objective {
        id: "o-budget".to_string(),
        name: String::new(),
        kind: ObjectiveKind::Budget,
        reference_value: 10_000.0,
        calculated_value: 0.0,
    });
    store.save_program_book(book).unwrap();
    let mut p = planner(store);
    p.add_project_to_program_book("p1", "book1", "t").unwrap();
}

fn hydrated(store: &MemoryStore, id: &str) -> Project {
    let mut project = store.get_project(id).unwrap();
    let mut interventions = Vec::new();
    for iv_id in &project.intervention_ids {
        interventions.push(store.find_intervention(iv_id).unwrap());
    }
    project.interventions = interventions;
    project
}

#[test]
fn sub_category_change_outdates_every_linked_book() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    // Freshen the book first so the staleness below is attributable.
    {
        let mut book = store.get_program_book("book1").unwrap();
        for scenario in &mut book.priority_scenarios {
            scenario.is_outdated = false;
        }
        store.save_program_book(book).unwrap();
    }

    let original = hydrated(&store, "p1");
    let mut updated = original.clone();
    updated.sub_category_ids.push("arterial".to_string());

    let saves = updated.interventions.clone();
    let outcome =
        coordinator::recompute_consistency(&mut store, &original, &updated, None, saves).unwrap();
    assert_eq!(outcome.refreshed_program_book_ids, vec!["book1"]);

    let book = store.get_program_book("book1").unwrap();
    assert!(book.is_outdated());
    // Objectives were recomputed from the current membership.
    assert_eq!(book.objectives[0].calculated_value, 1500.0);
}

#[test]
fn unrelated_change_leaves_books_untouched() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    {
        let mut book = store.get_program_book("book1").unwrap();
        for scenario in &mut book.priority_scenarios {
            scenario.is_outdated = false;
        }
        store.save_program_book(book).unwrap();
    }

    let original = hydrated(&store, "p1");
    let mut updated = original.clone();
    updated.name = "renamed".to_string();

    let saves = updated.interventions.clone();
    let outcome =
        coordinator::recompute_consistency(&mut store, &original, &updated, None, saves).unwrap();
    assert!(outcome.refreshed_program_book_ids.is_empty());
    let book = store.get_program_book("book1").unwrap();
    assert!(!book.is_outdated());
}

#[test]
fn intervention_requestor_change_outdates_its_period_book() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    {
        let mut book = store.get_program_book("book1").unwrap();
        for scenario in &mut book.priority_scenarios {
            scenario.is_outdated = false;
        }
        store.save_program_book(book).unwrap();
    }

    let mut changed = store.get_intervention("i1").unwrap();
    changed.requestor_id = "borough-14".to_string();
    let mut p = planner(&mut store);
    p.update_intervention(changed, "t").unwrap();

    let book = store.get_program_book("book1").unwrap();
    assert!(book.is_outdated());
}

#[test]
fn asset_change_outdates_book_via_update_path() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    {
        let mut book = store.get_program_book("book1").unwrap();
        for scenario in &mut book.priority_scenarios {
            scenario.is_outdated = false;
        }
        store.save_program_book(book).unwrap();
    }

    let mut changed = store.get_intervention("i1").unwrap();
    changed.assets.push(Asset {
        id: "a1".to_string(),
        type_id: "roadway".to_string(),
        length: 80.0,
    });
    let mut p = planner(&mut store);
    p.update_intervention(changed, "t").unwrap();

    let book = store.get_program_book("book1").unwrap();
    assert!(book.is_outdated());
    // Length objective inputs changed too: the project image was refreshed.
    let project = store.get_project("p1").unwrap();
    assert_eq!(project.length, 80.0);
}

#[test]
fn dangling_member_fails_fast_after_project_write() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    {
        let mut book = store.get_program_book("book1").unwrap();
        book.project_ids.push("ghost".to_string());
        store.save_program_book(book).unwrap();
    }

    let original = hydrated(&store, "p1");
    let mut updated = original.clone();
    updated.sub_category_ids.push("arterial".to_string());

    let saves = updated.interventions.clone();
    let err = coordinator::recompute_consistency(&mut store, &original, &updated, None, saves)
        .unwrap_err();
    assert_eq!(err.code(), "unexpectedError");

    // The project write had already committed: partial persistence is the
    // documented failure mode, not a rollback.
    let saved = store.get_project("p1").unwrap();
    assert_eq!(saved.sub_category_ids, vec!["arterial"]);
    // The book itself was not saved with half-updated objectives.
    let book = store.get_program_book("book1").unwrap();
    assert_eq!(book.objectives[0].calculated_value, 1500.0);
}

#[test]
fn annual_program_status_follows_book_statuses() {
    let mut store = MemoryStore::new();
    seed(&mut store);
    {
        let mut book = store.get_program_book("book1").unwrap();
        book.status = ProgramBookStatus::SubmittedFinal;
        store.save_program_book(book).unwrap();
    }

    let original = hydrated(&store, "p1");
    let mut updated = original.clone();
    updated.sub_category_ids.push("arterial".to_string());
    let saves = updated.interventions.clone();
    let outcome =
        coordinator::recompute_consistency(&mut store, &original, &updated, None, saves).unwrap();
    assert_eq!(outcome.synced_annual_program_ids, vec!["ap1"]);

    let program = store.find_annual_program("ap1").unwrap();
    assert_eq!(program.status, AnnualProgramStatus::SubmittedFinal);
}

#[test]
fn membership_removal_skips_finer_detection_and_applies_outcome() {
    let mut store = MemoryStore::new();
    seed(&mut store);

    let original = hydrated(&store, "p1");
    let mut updated = original.clone();
    updated.clear_program_book_links();
    // A simultaneous ordering-input change would normally outdate books on
    // its own; the removal path takes precedence.
    updated.sub_category_ids.push("arterial".to_string());

    let saves = updated.interventions.clone();
    let outcome =
        coordinator::recompute_consistency(&mut store, &original, &updated, None, saves).unwrap();
    assert_eq!(outcome.refreshed_program_book_ids, vec!["book1"]);

    let book = store.get_program_book("book1").unwrap();
    assert!(!book.contains_project("p1"));
    assert_eq!(book.removed_project_ids, vec!["p1"]);
    assert!(book.is_outdated());
    assert_eq!(book.objectives[0].calculated_value, 0.0);
}
