use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::simulation::{run_benchmarks, timeline_benchmarks};

criterion_group!(simulation_benches, timeline_benchmarks, run_benchmarks,);

criterion_main!(simulation_benches);
