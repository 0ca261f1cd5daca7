use capworks::domain::intervention::Intervention;
use capworks::domain::project::{Project, ProjectType};
use capworks::lifecycle::budget::{self, ProjectShape};
use capworks::lifecycle::distribution;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn project_with_interventions(count: usize) -> Project {
    let mut project = Project::new("bench", ProjectType::Integrated, 2024, 2033);
    for index in 0..count {
        let id = format!("i{}", index);
        let year = 2024 + (index as i32 % 10);
        project.link_intervention(&id);
        project
            .interventions
            .push(Intervention::new(id, year, 100.0 + index as f64));
    }
    project
}

fn bench_recompute(c: &mut Criterion) {
    let template = project_with_interventions(200);
    c.bench_function("distribution_and_budget_200_interventions", |b| {
        b.iter(|| {
            let mut project = template.clone();
            let shape = ProjectShape::of(&project);
            distribution::recompute(&mut project, shape);
            budget::refresh(&mut project, shape);
            black_box(project.global_budget.allowance)
        })
    });
}

criterion_group!(benches, bench_recompute);
criterion_main!(benches);
