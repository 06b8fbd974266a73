//! Latency benchmarks for framing plus inference per domain
//!
//! Run with: cargo bench -p modelgate-models

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modelgate_models::fixtures;
use modelgate_models::vision::decode_rgb;
use modelgate_models::{
    Artifact, DepressionGateway, DepressionRequest, FlightGateway, FlightRequest, ImageArtifact,
};

fn benchmark_tabular(c: &mut Criterion) {
    let depression = fixtures::depression_artifact();
    let flight = fixtures::flight_artifact();

    let depression_request: DepressionRequest = serde_json::from_str(
        r#"{
            "Gender": "Male", "Age": 22, "Academic_Pressure": 4, "Study_Satisfaction": 2,
            "Sleep_Duration": "5-6 hours", "Dietary_Habits": "Unhealthy",
            "Suicidal_Thoughts": "Yes", "Study_Hours": 10, "Financial_Stress": 5,
            "Family_History": "Yes"
        }"#,
    )
    .unwrap();
    let flight_request = FlightRequest {
        airline: "IndiGo".into(),
        source: "Delhi".into(),
        destination: "Mumbai".into(),
        total_stops: 0,
        month: 6,
        year: 2024,
        duration_hours: 2,
        duration_min: 30,
    };

    let mut group = c.benchmark_group("Tabular");
    group.sample_size(200);

    group.bench_function("depression_logistic", |b| {
        b.iter(|| DepressionGateway::infer(black_box(&depression), black_box(&depression_request)).unwrap())
    });
    group.bench_function("flight_forest", |b| {
        b.iter(|| FlightGateway::infer(black_box(&flight), black_box(&flight_request)).unwrap())
    });

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let index = fixtures::search_index().unwrap();

    let queries = vec![
        ("single_term", "heist"),
        ("phrase", "space crew lost near a distant star"),
        ("no_match", "romantic period drama"),
    ];

    let mut group = c.benchmark_group("Search");
    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::new("top_10", name), &query, |b, query| {
            b.iter(|| index.search(black_box(query), None, 10))
        });
    }
    group.finish();
}

fn benchmark_image(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::write_models_dir(dir.path()).unwrap();
    let artifact = ImageArtifact::load(&config.animal_source()).unwrap();
    let png = fixtures::png_bytes(320, 240, [30, 160, 90]).unwrap();

    let mut group = c.benchmark_group("Image");
    group.sample_size(50);

    group.bench_function("decode_resize", |b| {
        b.iter(|| decode_rgb(black_box(&png), artifact.input_size()).unwrap())
    });
    group.bench_function("classify", |b| {
        let img = decode_rgb(&png, artifact.input_size()).unwrap();
        b.iter(|| {
            let batch = artifact.to_batch(black_box(&img)).unwrap();
            artifact.predict(&batch).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_tabular, benchmark_search, benchmark_image);
criterion_main!(benches);
