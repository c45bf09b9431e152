//! Benchmarks for message classification.
//!
//! Every chat turn runs `classify` before the model is called, so it sits
//! on the request path. This measures a mix of add, complete, delete and
//! plain conversational messages.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use taskpilot_core::types::{Priority, Task, Timestamp};
use taskpilot_intent::{classify, extract};

fn generate_message(index: usize) -> String {
    match index % 6 {
        0 => format!("add task: call urgent client {} by friday", index),
        1 => format!("create task review pull request #{} in 3 days", index),
        2 => format!("complete {}", index % 10 + 1),
        3 => format!("delete task {}", index % 10 + 1),
        4 => "add task: important budget review tomorrow".to_string(),
        _ => format!(
            "Can you help me figure out what to focus on this afternoon? I have about {} \
             minutes before my next meeting and a lot of small things piling up.",
            index
        ),
    }
}

fn bench_classify(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
    let messages: Vec<String> = (0..1000).map(generate_message).collect();

    let mut group = c.benchmark_group("classify");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("mixed_single_message", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let command = classify(&messages[idx % messages.len()], &now);
            idx += 1;
            command
        });
    });

    group.bench_function("conversational_single_message", |b| {
        let message = generate_message(5);
        b.iter(|| classify(&message, &now));
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
    let messages: Vec<String> = (0..100).map(generate_message).collect();
    let seed: Vec<Task> = (0..10)
        .map(|i| Task::new(format!("task {}", i), None, Priority::Normal, Timestamp(0)))
        .collect();

    let mut group = c.benchmark_group("extract");
    group.sample_size(100);

    group.bench_function("batch_100_messages", |b| {
        b.iter(|| {
            let mut tasks = seed.clone();
            for message in &messages {
                extract(message, &mut tasks, &now);
            }
            tasks.len()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_extract);
criterion_main!(benches);
