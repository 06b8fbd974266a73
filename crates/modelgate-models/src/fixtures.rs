//! Small synthetic artifacts for tests, benchmarks and local runs.
//!
//! The models are hand-fitted so their outputs are easy to reason about:
//! the depression classifier leans heavily on suicidal thoughts and
//! financial stress, and the flight regressor prices a non-stop IndiGo
//! flight at exactly 5000.

use crate::config::ModelsConfig;
use crate::search::{CatalogRecord, SearchIndex, TfidfParams, TfidfVectorizer};
use crate::tabular::{
    ColumnTransform, ColumnTransformer, DecisionTree, Estimator, HandleUnknown, TabularArtifact,
    TabularPipeline, TransformStep,
};
use crate::vision::{CnnConfig, ConvBlockConfig, ImageCnn, ImageSource, Preprocess};
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use modelgate_core::{Error, FeatureValue, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::Path;

/// Labels of the synthetic image classifier
pub const ANIMAL_CLASSES: [&str; 3] = ["cat", "dog", "elephant"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn categories(items: &[&str]) -> Vec<FeatureValue> {
    items.iter().map(|&s| FeatureValue::from(s)).collect()
}

fn one_hot(name: &str, columns: &[&str], cats: Vec<Vec<FeatureValue>>) -> ColumnTransform {
    ColumnTransform {
        name: name.to_string(),
        columns: strings(columns),
        steps: vec![TransformStep::OneHotEncoder {
            categories: cats,
            handle_unknown: HandleUnknown::Ignore,
        }],
    }
}

/// Logistic depression classifier over the survey columns
pub fn depression_artifact() -> TabularArtifact {
    let numeric = [
        "Age",
        "Academic Pressure",
        "Study Satisfaction",
        "Study Hours",
        "Financial Stress",
    ];
    let categorical = [
        "Gender",
        "Sleep Duration",
        "Dietary Habits",
        "Have you ever had suicidal thoughts ?",
        "Family History of Mental Illness",
    ];

    let preprocessor = ColumnTransformer {
        transformers: vec![
            ColumnTransform {
                name: "num".to_string(),
                columns: strings(&numeric),
                steps: vec![TransformStep::StandardScaler {
                    mean: vec![21.0, 3.0, 3.0, 7.0, 3.0],
                    scale: vec![3.0, 1.4, 1.4, 3.5, 1.4],
                }],
            },
            one_hot(
                "cat",
                &categorical,
                vec![
                    categories(&["Female", "Male"]),
                    categories(&["5-6 hours", "7-8 hours", "Less than 5 hours", "More than 8 hours"]),
                    categories(&["Healthy", "Moderate", "Unhealthy"]),
                    categories(&["No", "Yes"]),
                    categories(&["No", "Yes"]),
                ],
            ),
        ],
    };

    let coef = vec![
        0.0, 0.8, -0.4, 0.1, 0.6, // scaled numerics
        0.0, 0.0, // gender
        0.0, -0.2, 0.3, -0.1, // sleep
        -0.3, 0.0, 0.4, // diet
        -1.2, 1.2, // suicidal thoughts
        0.0, 0.2, // family history
    ];

    let features = [
        "Gender",
        "Age",
        "Academic Pressure",
        "Study Satisfaction",
        "Sleep Duration",
        "Dietary Habits",
        "Have you ever had suicidal thoughts ?",
        "Study Hours",
        "Financial Stress",
        "Family History of Mental Illness",
    ];

    TabularArtifact {
        version: Some("1.0.0".to_string()),
        target: Some("Depression".to_string()),
        features: strings(&features),
        metrics: BTreeMap::from([("accuracy".to_string(), 0.84)]),
        rows: Some(27901),
        model: TabularPipeline {
            preprocessor,
            estimator: Estimator::LogisticRegression {
                coef,
                intercept: -0.1,
                classes: vec![FeatureValue::Int(0), FeatureValue::Int(1)],
            },
        },
    }
}

fn stump(feature: i64, threshold: f64, left: f64, right: f64) -> DecisionTree {
    DecisionTree {
        children_left: vec![1, -1, -1],
        children_right: vec![2, -1, -1],
        feature: vec![feature, -2, -2],
        threshold: vec![threshold, -2.0, -2.0],
        value: vec![vec![(left + right) / 2.0], vec![left], vec![right]],
    }
}

/// Two-stump forest pricing flights by stop count and Vistara
pub fn flight_artifact() -> TabularArtifact {
    let numeric = ["Total_Stops", "Month", "Year", "Duration_hours", "Duration_min"];
    let preprocessor = ColumnTransformer {
        transformers: vec![
            ColumnTransform {
                name: "num".to_string(),
                columns: strings(&numeric),
                steps: vec![TransformStep::SimpleImputer {
                    statistics: vec![
                        FeatureValue::Float(1.0),
                        FeatureValue::Float(5.0),
                        FeatureValue::Float(2019.0),
                        FeatureValue::Float(10.0),
                        FeatureValue::Float(30.0),
                    ],
                }],
            },
            one_hot(
                "cat",
                &["Airline", "Source", "Destination"],
                vec![
                    categories(&["Air India", "IndiGo", "Vistara"]),
                    categories(&["Delhi", "Mumbai"]),
                    categories(&["Cochin", "Delhi", "Mumbai"]),
                ],
            ),
        ],
    };

    TabularArtifact {
        version: Some("1.0.0".to_string()),
        target: Some("Flight ticket price".to_string()),
        features: strings(&[
            "Airline",
            "Source",
            "Destination",
            "Total_Stops",
            "Month",
            "Year",
            "Duration_hours",
            "Duration_min",
        ]),
        metrics: BTreeMap::from([("mae".to_string(), 1180.5), ("r2".to_string(), 0.81)]),
        rows: Some(10683),
        model: TabularPipeline {
            preprocessor,
            estimator: Estimator::RandomForestRegressor {
                // Encoded column 0 is Total_Stops, column 7 is Airline=Vistara
                trees: vec![stump(0, 0.5, 4500.0, 9000.0), stump(7, 0.5, 5500.0, 8000.0)],
            },
        },
    }
}

fn record(id: &str, kind: &str, title: &str, year: i32, listed_in: &str) -> CatalogRecord {
    CatalogRecord {
        show_id: id.to_string(),
        kind: kind.to_string(),
        title: title.to_string(),
        country: Some("United States".to_string()),
        release_year: year,
        rating: Some("TV-MA".to_string()),
        duration: Some(if kind == "Movie" { "104 min" } else { "2 Seasons" }.to_string()),
        listed_in: listed_in.to_string(),
    }
}

/// Catalog entries with the text they are indexed by
pub fn catalog() -> Vec<(CatalogRecord, String)> {
    [
        ("s1", "Movie", "Midnight Heist", 2019, "Action & Adventure, Thrillers", "bank heist crew plans robbery"),
        ("s2", "TV Show", "Heist Files", 2021, "Crime TV Shows", "detectives chase heist crew"),
        ("s3", "Movie", "Star Road", 2018, "Sci-Fi & Fantasy", "space crew lost near distant star"),
        ("s4", "Movie", "Laugh Track", 2020, "Comedies", "stand up comedy special"),
        ("s5", "TV Show", "Kitchen Wars", 2022, "Reality TV", "chefs compete in kitchen battles"),
        ("s6", "Movie", "Ocean Deep", 2017, "Documentaries", "documentary about deep ocean life"),
    ]
    .into_iter()
    .map(|(id, kind, title, year, listed_in, description)| {
        let text = format!("{} {} {}", title, listed_in, description);
        (record(id, kind, title, year, listed_in), text)
    })
    .collect()
}

/// Vectorizer whose vocabulary and smoothed idf come from `documents`
pub fn vectorizer_for(documents: &[String]) -> Result<TfidfVectorizer> {
    // An empty vocabulary tokenizes with the default pattern and lowercasing
    let tokenizer = TfidfVectorizer::new(TfidfParams::new(HashMap::new(), Vec::new()))
        .map_err(Error::internal)?;

    let mut df: BTreeMap<String, usize> = BTreeMap::new();
    for doc in documents {
        let mut terms = tokenizer.tokenize(doc);
        terms.sort();
        terms.dedup();
        for term in terms {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    let n = documents.len() as f64;
    let mut vocabulary = HashMap::with_capacity(df.len());
    let mut idf = Vec::with_capacity(df.len());
    for (i, (term, count)) in df.into_iter().enumerate() {
        vocabulary.insert(term, i);
        idf.push(((1.0 + n) / (1.0 + count as f64)).ln() + 1.0);
    }

    TfidfVectorizer::new(TfidfParams::new(vocabulary, idf)).map_err(Error::internal)
}

/// Search index over [`catalog`]
pub fn search_index() -> Result<SearchIndex> {
    let documents = catalog();
    let texts: Vec<String> = documents.iter().map(|(_, text)| text.clone()).collect();
    let mut index = SearchIndex::from_documents(vectorizer_for(&texts)?, documents);
    index.version = Some("1.0.0".to_string());
    Ok(index)
}

/// Architecture of the synthetic image classifier
pub fn animal_config() -> CnnConfig {
    CnnConfig {
        version: Some("1.0.0".to_string()),
        input_size: 16,
        channels: 3,
        preprocess: Preprocess::UnitScale,
        conv_blocks: vec![
            ConvBlockConfig {
                out_channels: 4,
                kernel_size: 3,
            },
            ConvBlockConfig {
                out_channels: 8,
                kernel_size: 3,
            },
        ],
        hidden: Some(8),
        num_classes: ANIMAL_CLASSES.len(),
    }
}

#[derive(Serialize)]
struct LabelFile<'a> {
    class_names: &'a [&'a str],
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| Error::internal(e.to_string()))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Write a randomly initialised image classifier under `dir`
pub fn write_animal_artifact(config: &ModelsConfig) -> Result<ImageSource> {
    let source = config.animal_source();
    let cnn = animal_config();

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    ImageCnn::new(&cnn, vb).map_err(|e| Error::internal(e.to_string()))?;
    varmap
        .save(&source.weights)
        .map_err(|e| Error::internal(e.to_string()))?;

    write_json(&source.config, &cnn)?;
    write_json(
        &source.labels,
        &LabelFile {
            class_names: &ANIMAL_CLASSES,
        },
    )?;
    Ok(source)
}

/// Populate `dir` with all four artifacts under their default names
pub fn write_models_dir(dir: &Path) -> Result<ModelsConfig> {
    let config = ModelsConfig {
        dir: dir.to_path_buf(),
        ..Default::default()
    };

    write_json(&config.depression_path(), &depression_artifact())?;
    write_json(&config.flight_path(), &flight_artifact())?;
    write_json(&config.recommend_path(), &search_index()?)?;
    write_animal_artifact(&config)?;

    Ok(config)
}

/// Solid-colour PNG
pub fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(out.into_inner())
}
