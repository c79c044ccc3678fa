use criterion::Criterion;
use hve_sim::{
    mortality::MortalityTally,
    population::generate_population,
    run_simulation,
    timeline::build_timelines,
    vaccination::DoseSchedule,
    DeathFlagPolicy, Params, WeekDistribution,
};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn bench_params(n_people: usize) -> Params {
    Params {
        n_people,
        n_deaths: n_people / 10,
        n_weeks: 104,
        n_runs: 1,
        seed: 0,
        dose_uptake: vec![0.82, 0.96, 0.82],
        dose_week_distributions: vec![
            WeekDistribution {
                mean: 20.0,
                std: 3.0
            };
            3
        ],
        min_time: 4,
        hve_duration: 26,
        hve_p: 0.5,
        split_week: 4,
        figure_per: 1e5,
        death_flag_policy: DeathFlagPolicy::FollowingWeek,
        reports: vec![],
    }
}

pub fn timeline_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline");
    let params = bench_params(10_000);
    let mut rng = StdRng::seed_from_u64(0);
    let mut population = generate_population(&params, &mut rng);
    DoseSchedule::new(&params)
        .expect("Valid dose schedule")
        .schedule(&mut population, &mut rng);

    group.bench_function("build_timelines", |b| {
        b.iter(|| {
            black_box(build_timelines(
                black_box(&population),
                params.n_weeks,
                params.split_week,
                params.death_flag_policy,
                &mut rng,
            ));
        });
    });

    let timelines = build_timelines(
        &population,
        params.n_weeks,
        params.split_week,
        params.death_flag_policy,
        &mut rng,
    );
    group.bench_function("tally_mortality", |b| {
        b.iter(|| {
            black_box(MortalityTally::from_timelines(
                black_box(&timelines),
                params.category_space(),
            ));
        });
    });

    group.finish();
}

pub fn run_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(20);
    for n_people in [1_000, 10_000] {
        let params = bench_params(n_people);
        let mut rng = StdRng::seed_from_u64(1);
        group.bench_function(format!("run_simulation_{n_people}"), |b| {
            b.iter(|| {
                black_box(run_simulation(black_box(&params), &mut rng).expect("Valid run"));
            });
        });
    }
    group.finish();
}
