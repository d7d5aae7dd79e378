mod common;

use common::scenario_corpus;
use lens_corpus::LensCorpus;
use lens_graph::{GraphConfig, LensGraphService};
use lens_vector_store::EmbeddingFile;
use std::sync::Arc;
use tempfile::TempDir;

/// Writes the scenario corpus without inline vectors plus an embedding file
/// that lacks Fleet of Theseus.
async fn write_fixture(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let scenario = scenario_corpus();
    let mut embeddings = EmbeddingFile::new();
    let mut lenses = Vec::new();
    for lens in scenario.lenses() {
        let mut lens = lens.clone();
        if lens.id != "fleet_of_theseus" {
            embeddings
                .insert(lens.id.clone(), lens.embedding.clone())
                .expect("insert embedding");
        }
        lens.embedding.clear();
        lenses.push(lens);
    }
    let corpus = LensCorpus::from_parts(
        lenses,
        scenario.frames().cloned().collect(),
        scenario.contrasts().to_vec(),
    )
    .expect("corpus");

    let corpus_path = dir.path().join("lenses.json");
    let embeddings_path = dir.path().join("vectors").join("embeddings.json");
    corpus.save(&corpus_path).await.expect("save corpus");
    embeddings.save(&embeddings_path).await.expect("save embeddings");
    (corpus_path, embeddings_path)
}

#[tokio::test]
async fn service_builds_from_files_on_disk() {
    let tmp = TempDir::new().expect("tempdir");
    let (corpus_path, embeddings_path) = write_fixture(&tmp).await;

    let corpus = Arc::new(LensCorpus::load(&corpus_path).await.expect("load corpus"));
    let embeddings = Arc::new(
        EmbeddingFile::load(&embeddings_path)
            .await
            .expect("load embeddings"),
    );
    let service = LensGraphService::start(corpus, embeddings, GraphConfig::default())
        .await
        .expect("start");

    let graph = service.snapshot();
    let report = graph.report();
    assert_eq!(report.lens_count, 5);
    assert_eq!(report.frame_count, 3);
    assert_eq!(report.missing_embeddings, vec!["fleet_of_theseus".to_string()]);
    assert_eq!(report.uncovered_lenses, vec!["Fleet of Theseus".to_string()]);
    assert_eq!(report.curated_contrasts, 2);
    assert_eq!(report.rejected_overrides.len(), 1);
    assert_eq!(report.rejected_overrides[0].reason, "missing embedding");

    // Vectors come from the embedding file, not the corpus
    let kintsugi = graph.get_lens("Kintsugi").expect("lens");
    assert_eq!(kintsugi.embedding.len(), 4);
    assert!(graph
        .contrast_score("Kintsugi", "Fleet of Theseus")
        .expect("resolve")
        .is_none());

    // Frame edges do not need embeddings
    let journey = graph
        .journey("Kintsugi", "Fleet of Theseus", None)
        .expect("journey");
    assert_eq!(journey.paths.len(), 1);
    assert_eq!(journey.paths[0].hops, 1);
}

#[tokio::test]
async fn rebuild_from_unchanged_files_is_stable() {
    let tmp = TempDir::new().expect("tempdir");
    let (corpus_path, embeddings_path) = write_fixture(&tmp).await;
    let embeddings = Arc::new(
        EmbeddingFile::load(&embeddings_path)
            .await
            .expect("load embeddings"),
    );

    let first = Arc::new(LensCorpus::load(&corpus_path).await.expect("load corpus"));
    let service = LensGraphService::start(first, embeddings, GraphConfig::default())
        .await
        .expect("start");
    let before = service.snapshot();

    let reloaded = LensCorpus::load(&corpus_path).await.expect("reload");
    assert_eq!(reloaded.lens_count(), before.lens_count());

    service.invalidate();
    let after = service.refresh().await;
    assert_eq!(after.generation(), before.generation() + 1);
    assert_eq!(after.edges(), before.edges());
}
