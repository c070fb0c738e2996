use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use healthrs::import::{scan, Selector};
use healthrs::models::{
    DistanceSample, Vo2MaxReading, WalkingWorkout, DISTANCE_WALKING_RUNNING_TYPE, VO2_MAX_TYPE,
    WALKING_ACTIVITY,
};
use healthrs::walking::daily_walking;
use healthrs::TableBuilder;
use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;

/// Scan and table-building throughput over synthetic exports
///
/// One in twenty elements is a VO2max record and one in fifty a walking
/// workout; the rest are minute-level walking distance samples.

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S +0100";

fn create_export(elements: usize) -> NamedTempFile {
    let start: NaiveDateTime = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();

    let mut body = String::with_capacity(elements * 260);
    body.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<HealthData locale=\"en_GB\">\n");

    for i in 0..elements {
        let at = start + Duration::minutes(i as i64 * 3);
        let begin = at.format(TIMESTAMP_FORMAT);
        let end = (at + Duration::minutes(2)).format(TIMESTAMP_FORMAT);

        if i % 50 == 0 {
            let _ = writeln!(
                body,
                r#" <Workout workoutActivityType="{}" duration="20" durationUnit="min" totalDistance="1.9" totalDistanceUnit="km" sourceName="Apple Watch" startDate="{}" endDate="{}"><WorkoutStatistics type="HKQuantityTypeIdentifierActiveEnergyBurned" sum="95" unit="kcal"/></Workout>"#,
                WALKING_ACTIVITY, begin, end
            );
        } else if i % 20 == 0 {
            let _ = writeln!(
                body,
                r#" <Record type="{}" sourceName="Apple Watch" unit="mL/min·kg" startDate="{}" endDate="{}" value="{:.2}"/>"#,
                VO2_MAX_TYPE,
                begin,
                begin,
                40.0 + (i % 7) as f64 * 0.5
            );
        } else {
            let _ = writeln!(
                body,
                r#" <Record type="{}" sourceName="Apple Watch" unit="km" startDate="{}" endDate="{}" value="{:.3}"/>"#,
                DISTANCE_WALKING_RUNNING_TYPE,
                begin,
                end,
                0.05 + (i % 11) as f64 * 0.01
            );
        }
    }
    body.push_str("</HealthData>\n");

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

fn bench_vo2max_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("VO2max scan");

    for &size in &[1_000, 10_000, 100_000] {
        let export = create_export(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("scan_and_build", size), &export, |b, export| {
            b.iter(|| {
                let mut vo2 = TableBuilder::<Vo2MaxReading>::new();
                let stats = scan(
                    export.path(),
                    Selector::new().records([VO2_MAX_TYPE]),
                    &mut [&mut vo2],
                    false,
                )
                .unwrap();
                black_box((stats, vo2.build()))
            });
        });
    }

    group.finish();
}

fn bench_daily_walking(c: &mut Criterion) {
    let mut group = c.benchmark_group("Daily walking");

    for &size in &[1_000, 10_000, 100_000] {
        let export = create_export(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("scan_mask_aggregate", size), &export, |b, export| {
            b.iter(|| {
                let mut workouts = TableBuilder::<WalkingWorkout>::new();
                let mut ambient = TableBuilder::<DistanceSample>::new();
                scan(
                    export.path(),
                    Selector::new()
                        .workouts([WALKING_ACTIVITY])
                        .records([DISTANCE_WALKING_RUNNING_TYPE])
                        .source_containing(Some("Watch")),
                    &mut [&mut workouts, &mut ambient],
                    false,
                )
                .unwrap();
                black_box(daily_walking(&workouts.build(), &ambient.build()))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vo2max_scan, bench_daily_walking);
criterion_main!(benches);
