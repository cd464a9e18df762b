mod common;

use std::time::Duration;

use antipode::SearchError;
use antipode::catalog::ImageCatalog;
use antipode::color::project_color;
use antipode::hsl::Rgb;
use antipode::search::{AntipodeMethod, BatchOptions, Domain, EmbeddingKind};
use common::*;
use rstest::*;
use tempfile::TempDir;

const RED: Rgb = Rgb::new(255, 0, 0);
const BLUE: Rgb = Rgb::new(0, 0, 255);
const YELLOW: Rgb = Rgb::new(255, 255, 0);
const GREEN: Rgb = Rgb::new(0, 255, 0);

#[fixture]
fn dir() -> TempDir {
    TempDir::new().unwrap()
}

async fn seeded(dir: &TempDir, catalog: StaticCatalog) -> TestSearch {
    let (db, _) = open(dir, catalog).await;
    for r in [
        record("blue", [1.0, 0.0, 0.0, 0.0], BLUE),
        record("yellow", [0.9, 0.1, 0.0, 0.0], YELLOW),
        record("red", [0.0, 1.0, 0.0, 0.0], RED),
        record("green", [-1.0, 0.0, 0.0, 0.0], GREEN),
    ] {
        db.store_image_vectors(&r).await.unwrap();
    }
    db
}

fn ids(results: &[antipode::search::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.image_id.as_str()).collect()
}

#[rstest]
#[tokio::test]
async fn self_query_scores_zero(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    let results = db.search_by_clip(&[1.0, 0.0, 0.0, 0.0], 4).await.unwrap();
    assert_eq!(results[0].image_id, "blue");
    assert!(results[0].score.abs() < 1e-6);
    assert_eq!(ids(&results), vec!["blue", "yellow", "red", "green"]);
    assert!(results.windows(2).all(|w| w[0].score <= w[1].score));
}

#[rstest]
#[tokio::test]
async fn similar_excludes_source_and_tags(dir: TempDir) {
    let catalog = StaticCatalog::default().with_tag("yellow", "no-similar-clip");
    let db = seeded(&dir, catalog).await;

    let clip = db.similar("blue", Domain::Clip, 8, 1).await.unwrap();
    assert_eq!(ids(&clip.results), vec!["red", "green"]);
    assert_eq!(ids(&clip.strangers), vec!["green"]);

    // 只排除语义搜索
    let color = db.similar("blue", Domain::Color, 8, 0).await.unwrap();
    assert!(ids(&color.results).contains(&"yellow"));
    assert!(!ids(&color.results).contains(&"blue"));
    assert!(color.strangers.is_empty());
}

#[rstest]
#[tokio::test]
async fn exclude_all_tag(dir: TempDir) {
    let catalog = StaticCatalog::default().with_tag("red", "no-similar");
    let db = seeded(&dir, catalog).await;
    for domain in [Domain::Clip, Domain::Color] {
        let response = db.similar("blue", domain, 8, 3).await.unwrap();
        assert!(!ids(&response.results).contains(&"red"));
        assert!(!ids(&response.strangers).contains(&"red"));
    }
}

#[rstest]
#[tokio::test]
async fn complementary_of_blue_is_yellow(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    let response = db.antipode("blue", Domain::Color, "complementary", 3).await.unwrap();
    assert_eq!(response.method, AntipodeMethod::Complementary);
    assert_eq!(response.label, "Complementary");
    assert_eq!(response.results[0].image_id, "yellow");
    assert!(!ids(&response.results).contains(&"blue"));
}

#[rstest]
#[tokio::test]
async fn negate_finds_opposite(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    let response = db.antipode("blue", Domain::Clip, "negate", 1).await.unwrap();
    assert_eq!(ids(&response.results), vec!["green"]);

    let response = db.antipode("blue", Domain::Clip, "stranger", 2).await.unwrap();
    assert_eq!(ids(&response.results), vec!["green", "red"]);
}

#[rstest]
#[tokio::test]
async fn every_method_runs(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    for domain in [Domain::Clip, Domain::Color] {
        for method in AntipodeMethod::methods(domain) {
            let response = db.antipode("red", domain, method.as_str(), 8).await.unwrap();
            assert_eq!(response.domain, domain);
            assert!(!ids(&response.results).contains(&"red"), "{method}");
        }
    }
}

#[rstest]
#[tokio::test]
async fn antipode_rejects_bad_input(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;

    let err = db.antipode("blue", Domain::Clip, "complementary", 8).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidArgument(ref msg) if msg.contains("negate")));

    let err = db.antipode("blue", Domain::Clip, "negate", 21).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidArgument(_)));

    let err = db.antipode("missing", Domain::Clip, "negate", 8).await.unwrap_err();
    assert!(matches!(err, SearchError::NotFound(_)));

    let mut only_color = record("only-color", [0.0; 4], RED);
    only_color.clip_embedding = None;
    db.store_image_vectors(&only_color).await.unwrap();
    let err = db.antipode("only-color", Domain::Clip, "negate", 8).await.unwrap_err();
    assert!(matches!(err, SearchError::MissingEmbedding { kind: EmbeddingKind::Clip, .. }));
}

#[rstest]
#[tokio::test]
async fn hex_color_search(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    let results = db.color_search("#ffff00", 2).await.unwrap();
    assert_eq!(results[0].image_id, "yellow");
    assert!(matches!(db.color_search("yellow", 2).await, Err(SearchError::InvalidArgument(_))));
}

#[rstest]
#[tokio::test]
async fn radar(dir: TempDir) {
    let db = seeded(&dir, StaticCatalog::default()).await;
    let axes = db.concept_radar("blue").await.unwrap();
    assert_eq!(axes.len(), 10);
    assert!(axes.iter().all(|a| (-1.0..=1.0).contains(&a.display)));
    // 20 条提示词全部缓存
    assert_eq!(db.concept_cache().len(), 20);

    let mut point = [0.0f32; 10];
    point[1] = 0.9;
    let response = db.radar_query(&point, 4).await.unwrap();
    assert_eq!(response.query, "a very bright image");
    assert_eq!(response.results.len(), 4);

    let err = db.radar_query(&[0.0; 10], 4).await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidArgument(_)));
}

#[rstest]
#[tokio::test]
async fn batch_skips_complete_images(dir: TempDir) {
    let catalog = StaticCatalog::default()
        .with_image("red.ppm", dataset("red.ppm"))
        .with_image("split.ppm", dataset("split.ppm"));
    let (db, embedder) = open(&dir, catalog).await;
    let images = db.catalog().list_images().await.unwrap();
    let opts = BatchOptions { delay: Duration::ZERO, ..Default::default() };

    let mut seen = 0;
    let results = db.generate_embeddings(&images, &opts, |_| seen += 1).await.unwrap();
    assert_eq!(seen, 2);
    assert!(results.iter().all(|r| r.success && !r.skipped));
    assert_eq!(embedder.image_calls(), 2);

    let record = db.get_image_vectors("split.ppm").await.unwrap().unwrap();
    assert_eq!(record.dominant_colors.len(), 2);
    assert!(record.clip_embedding.is_some());

    let results = db.generate_embeddings(&images, &opts, |_| {}).await.unwrap();
    assert!(results.iter().all(|r| r.success && r.skipped));
    assert_eq!(embedder.image_calls(), 2);

    let force = BatchOptions { force: true, ..opts.clone() };
    let results = db.generate_embeddings(&images, &force, |_| {}).await.unwrap();
    assert!(results.iter().all(|r| r.success && !r.skipped));
    assert_eq!(embedder.image_calls(), 4);
}

#[rstest]
#[tokio::test]
async fn batch_keeps_partial_results(dir: TempDir) {
    let catalog = StaticCatalog::default()
        .with_image("broken.jpg", b"not an image".to_vec())
        .with_image("red.ppm", dataset("red.ppm"));
    let (db, _) = open(&dir, catalog).await;
    let images = db.catalog().list_images().await.unwrap();
    let opts = BatchOptions { delay: Duration::ZERO, ..Default::default() };

    let results = db.generate_embeddings(&images, &opts, |_| {}).await.unwrap();
    assert_eq!(results[0].image_id, "broken.jpg");
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().is_some_and(|e| e.starts_with("color: 图片解码失败")));
    assert!(results[1].success);

    // 语义向量成功写入，颜色向量缺失
    let record = db.get_image_vectors("broken.jpg").await.unwrap().unwrap();
    assert!(record.clip_embedding.is_some());
    assert!(record.color_histogram.is_none());
}

#[rstest]
#[tokio::test]
async fn reopen_with_other_dimension(dir: TempDir) {
    let path = dir.path().join("test.db");
    let (db, _) = open_at(&path, StaticCatalog::default()).await;
    db.store_image_vectors(&record("blue", [1.0, 0.0, 0.0, 0.0], BLUE)).await.unwrap();
    drop(db);

    let err = antipode::VectorSearchBuilder::new(&path, FakeEmbedder::default(), StaticCatalog::default())
        .clip_dimension(8)
        .open()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SearchError::DimensionMismatch { expected: 4, actual: 8 }));
}

#[tokio::test]
async fn unavailable_store() {
    let path = std::path::Path::new("/nonexistent-dir/antipode/test.db");
    let (db, _) = open_at(path, StaticCatalog::default()).await;
    assert!(!db.is_vector_search_available().await);

    let err = db.search_by_clip(&[1.0, 0.0, 0.0, 0.0], 8).await.unwrap_err();
    assert!(err.is_unavailable());
    let err = db.similar("blue", Domain::Color, 8, 0).await.unwrap_err();
    assert!(err.is_unavailable());
    let err = db.get_index_stats().await.unwrap_err();
    assert!(err.is_unavailable());

    let err = db.generate_embeddings(&[], &BatchOptions::default(), |_| {}).await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn unavailable_store_every_search() {
    let path = std::path::Path::new("/nonexistent-dir/antipode/test.db");
    let (db, _) = open_at(path, StaticCatalog::default()).await;
    let clip = [1.0, 0.0, 0.0, 0.0];
    let hist = project_color(RED);
    let mut point = [0.0f32; 10];
    point[0] = 0.9;

    let results = vec![
        ("search_by_color", db.search_by_color(&hist, 8).await.map(drop)),
        ("search_by_text", db.search_by_text("a cat", 8).await.map(drop)),
        ("search_by_hex_color", db.search_by_hex_color("#ff0000", 8).await.map(drop)),
        ("search_clip_negated", db.search_clip_negated(&clip, 8, None).await.map(drop)),
        ("search_clip_very_stranger", db.search_clip_very_stranger(&clip, 8, None).await.map(drop)),
        ("search_clip_centroid_reflection", db.search_clip_centroid_reflection(&clip, 8, None).await.map(drop)),
        ("search_clip_otherwise", db.search_clip_otherwise(8, None).await.map(drop)),
        ("search_color_complementary", db.search_color_complementary(BLUE, 8, None).await.map(drop)),
        ("search_color_histogram_inverted", db.search_color_histogram_inverted(&hist, 8, None).await.map(drop)),
        ("search_color_lightness_inverted", db.search_color_lightness_inverted(BLUE, 8, None).await.map(drop)),
        ("search_color_negative_space", db.search_color_negative_space(&hist, 8, None).await.map(drop)),
        ("text_search", db.text_search("a cat", 8).await.map(drop)),
        ("color_search", db.color_search("#ff0000", 8).await.map(drop)),
        ("concept_radar", db.concept_radar("blue").await.map(drop)),
        ("radar_query", db.radar_query(&point, 8).await.map(drop)),
        ("store_image_vectors", db.store_image_vectors(&record("blue", clip, BLUE)).await),
        ("get_image_vectors", db.get_image_vectors("blue").await.map(drop)),
        ("delete_image_vectors", db.delete_image_vectors("blue").await.map(drop)),
        ("batch_get_color_metadata", db.batch_get_color_metadata(&["blue".to_string()]).await.map(drop)),
        ("ensure_vector_index", db.ensure_vector_index().await),
    ];
    for (name, result) in results {
        assert!(result.is_err_and(|e| e.is_unavailable()), "{name}");
    }

    for domain in [Domain::Clip, Domain::Color] {
        for method in AntipodeMethod::methods(domain) {
            let err = db.antipode("blue", domain, method.as_str(), 8).await.unwrap_err();
            assert!(err.is_unavailable(), "{method}");
        }
    }
}
