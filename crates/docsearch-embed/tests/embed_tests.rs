use docsearch_core::config::VectorConfig;
use docsearch_core::traits::Embedder;
use docsearch_core::Error;
use docsearch_embed::{load_embedder, parse_hash_model, DeviceHint, HashEmbedder, DEFAULT_HASH_DIM};

fn cfg(model: &str) -> VectorConfig {
    VectorConfig {
        model: model.to_string(),
        ..VectorConfig::default()
    }
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = load_embedder(&cfg("hash")).expect("embedder");
    assert_eq!(embedder.dim(), DEFAULT_HASH_DIM);
    assert_eq!(embedder.model_id(), format!("hash:{DEFAULT_HASH_DIM}"));

    let texts = vec!["hello world".to_string(), "hello world".to_string(), "unrelated".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3);
    assert!(embs.iter().all(|v| v.len() == DEFAULT_HASH_DIM));
    assert_eq!(embs[0], embs[1]);
    assert_ne!(embs[0], embs[2]);
}

#[test]
fn explicit_hash_dimension_round_trips_through_model_id() {
    let embedder = load_embedder(&cfg("hash:16")).unwrap();
    assert_eq!(embedder.dim(), 16);
    let again = load_embedder(&cfg(embedder.model_id())).unwrap();
    assert_eq!(again.dim(), 16);
}

#[test]
fn hash_model_parsing() {
    assert_eq!(parse_hash_model("hash").map(Result::unwrap), Some(DEFAULT_HASH_DIM));
    assert_eq!(parse_hash_model("hash:32").map(Result::unwrap), Some(32));
    assert!(matches!(parse_hash_model("hash:0"), Some(Err(Error::Configuration(_)))));
    assert!(matches!(parse_hash_model("hash:big"), Some(Err(Error::Configuration(_)))));
    assert!(parse_hash_model("hashbrown").is_none());
    assert!(parse_hash_model("/models/bge-m3").is_none());
}

#[test]
fn vectors_are_not_normalized_by_the_embedder() {
    let v = HashEmbedder::new(32).embed_one("alpha alpha alpha beta");
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!(norm > 1.0, "norm={norm}");
}

#[test]
fn device_hints() {
    assert_eq!("CPU".parse::<DeviceHint>().unwrap(), DeviceHint::Cpu);
    assert_eq!("mps".parse::<DeviceHint>().unwrap(), DeviceHint::Metal);
    assert_eq!("cuda".parse::<DeviceHint>().unwrap(), DeviceHint::Cuda);
    assert!(matches!("tpu".parse::<DeviceHint>(), Err(Error::Configuration(_))));

    let bad = VectorConfig {
        device: Some("tpu".into()),
        ..cfg("hash")
    };
    assert!(matches!(load_embedder(&bad), Err(Error::Configuration(_))));
}

#[cfg(not(feature = "candle"))]
#[test]
fn model_directory_without_runtime_is_dependency_unavailable() {
    if docsearch_embed::fake_embeddings_forced() {
        return;
    }
    let err = load_embedder(&cfg("/models/bge-m3")).err().expect("must fail");
    assert!(err.is_dependency_unavailable(), "{err}");
}
