//! Table building benchmark.
//!
//! Measures `table::build` at the controller's maximum table size, for the
//! raw axis and for an encoder source with a non-trivial ratio, plus the
//! full configure path against the simulated controller.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ecam_common::config::TriggerConfig;
use ecam_common::consts::MAX_TABLE_SIZE;
use ecam_common::link::types::SourceKind;
use ecam_common::motor::{MotorEntry, StaticMotorDirectory};
use ecam_link::drivers::simulation::SimulatedLink;
use ecam_sync::convert::{FeedbackSource, Resolution, UnitConverter};
use ecam_sync::retry::RetryPolicy;
use ecam_sync::table::{self, AxisContext};
use ecam_sync::{SynchronizationSpec, TriggerController};

fn context(converter: UnitConverter) -> AxisContext {
    AxisContext {
        axis: 1,
        step_per_unit: 100.0,
        converter,
        is_target_encoder: false,
    }
}

/// Benchmark: build a full-size table in axis counts.
fn bench_build_axis(c: &mut Criterion) {
    let ctx = context(UnitConverter::identity(Resolution::new(8000, 1)));
    let spec = SynchronizationSpec::position(0.0, 0.01, MAX_TABLE_SIZE as u32);
    c.bench_function("build_max_table_axis", |b| {
        b.iter(|| black_box(table::build(black_box(&spec), &ctx, false)))
    });
}

/// Benchmark: build a full-size table in external encoder units.
fn bench_build_encoder(c: &mut Criterion) {
    let ctx = context(UnitConverter::new(
        Resolution::new(8000, 1),
        FeedbackSource {
            kind: SourceKind::ExternalEncoder,
            resolution: Resolution::new(131_072, 3),
        },
    ));
    let spec = SynchronizationSpec::position(-5.0, -0.001, MAX_TABLE_SIZE as u32);
    c.bench_function("build_max_table_encoder", |b| {
        b.iter(|| black_box(table::build(black_box(&spec), &ctx, false)))
    });
}

/// Benchmark: configure (resolve, build, load) against the simulated controller.
fn bench_configure_simulated(c: &mut Criterion) {
    let motors = StaticMotorDirectory::from_entries(&[MotorEntry {
        axis: 1,
        alias: "m1".into(),
        step_per_unit: 100.0,
    }]);
    let mut controller = TriggerController::new(
        Box::new(SimulatedLink::default()),
        Box::new(motors),
        &TriggerConfig::default(),
        RetryPolicy::default(),
    );
    if let Err(e) = controller.bind_motor(1) {
        panic!("bind failed: {e}");
    }
    let spec = SynchronizationSpec::position(0.0, 0.01, MAX_TABLE_SIZE as u32);
    c.bench_function("configure_max_table_simulated", |b| {
        b.iter(|| black_box(controller.configure(black_box(&spec))))
    });
}

criterion_group!(
    benches,
    bench_build_axis,
    bench_build_encoder,
    bench_configure_simulated
);
criterion_main!(benches);
