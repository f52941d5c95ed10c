//! Benchmark suite for per-stay processing.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - ICU window filtering over timelines of increasing length
//! - Horizon and label derivation
//! - Timeline parsing from CSV text
//! - Full in-memory evaluation of a stay

use chrono::{Duration, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use decompensation_builder::{
    EventTimeline, EventWindowFilter, LabelDeriver, Stay, StayId, StayProcessor, TimelineEvent,
};

fn admission() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2150-03-01 08:00:00", "%Y-%m-%d %H:%M:%S")
        .expect("valid timestamp")
}

/// Timeline with one event every 15 minutes starting an hour before admission.
fn create_timeline(events: usize) -> EventTimeline {
    EventTimeline::new(["Hours", "Heart Rate", "Oxygen saturation", "Temperature"]).with_events(
        (0..events)
            .map(|i| {
                let hours = i as f64 * 0.25 - 1.0;
                TimelineEvent::from_values(hours, &["86", if i % 3 == 0 { "97" } else { "" }, ""])
            })
            .collect(),
    )
}

fn create_csv(events: usize) -> String {
    let mut csv = String::from("Hours,Heart Rate,Oxygen saturation,Temperature\n");
    for i in 0..events {
        csv.push_str(&format!("{:.4},86,97,\n", i as f64 * 0.25 - 1.0));
    }
    csv
}

fn bench_window_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_filter");
    let filter = EventWindowFilter::default();

    for events in [100usize, 1_000, 10_000] {
        let timeline = create_timeline(events);
        group.throughput(Throughput::Elements(events as u64));
        group.bench_with_input(BenchmarkId::from_parameter(events), &timeline, |b, t| {
            b.iter(|| filter.apply(black_box(t.clone()), black_box(48.0)))
        });
    }

    group.finish();
}

fn bench_label_derivation(c: &mut Criterion) {
    let deriver = LabelDeriver::default();
    let admitted = admission();
    let died = Some(admitted + Duration::minutes(2_000));

    c.bench_function("label_derivation", |b| {
        b.iter(|| {
            deriver.derive_from(
                black_box(admitted),
                black_box(died),
                black_box(Some(72.5)),
                black_box(true),
            )
        })
    });
}

fn bench_timeline_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_parsing");

    for events in [100usize, 1_000] {
        let csv = create_csv(events);
        group.throughput(Throughput::Bytes(csv.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(events), &csv, |b, csv| {
            b.iter(|| EventTimeline::from_reader(black_box(csv.as_bytes()), "bench"))
        });
    }

    group.finish();
}

fn bench_stay_evaluation(c: &mut Criterion) {
    let processor = StayProcessor::default();
    let stay = Stay::new(StayId(1), admission(), None, Some(96.0), false);
    let timeline = create_timeline(500);

    c.bench_function("stay_evaluation", |b| {
        b.iter(|| processor.evaluate(black_box(&stay), black_box(timeline.clone())))
    });
}

criterion_group!(
    benches,
    bench_window_filter,
    bench_label_derivation,
    bench_timeline_parsing,
    bench_stay_evaluation
);
criterion_main!(benches);
