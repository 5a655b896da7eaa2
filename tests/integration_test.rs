//! End-to-end tests for the encoding pipeline.
//!
//! The mock backends cover the structural properties; tests marked
//! `#[ignore]` need the real model files in `models/all-mpnet-base-v2`
//! (fetch them with `mpnet-embed download`).
use mpnet_embedder::embedder::EmbedderError;
use mpnet_embedder::embedder::download::{all_files_present, default_model_dir};
use mpnet_embedder::embedder::mock::{MockModel, MockTokenizer};
use mpnet_embedder::embedder::vector::l2_norm;
use mpnet_embedder::{EmbedderConfig, SentenceEmbedder, cosine_similarity};

fn mock_embedder(config: EmbedderConfig, model: MockModel) -> SentenceEmbedder {
    SentenceEmbedder::with_backends(config, Box::new(MockTokenizer::new()), Box::new(model))
        .unwrap()
}

fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() <= tol, "index {i}: {x} vs {y}");
    }
}

/// Padding in a mixed-length batch must not change any sentence's embedding.
#[test]
fn test_batch_size_invariance() {
    let embedder = mock_embedder(EmbedderConfig::default(), MockModel::new(32));

    let target = "the quick brown fox";
    let alone = embedder.encode(target).unwrap();

    let batch = embedder
        .encode_batch(&[
            "a",
            target,
            "a much longer sentence that forces plenty of padding on its neighbours",
        ])
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_close(&alone, &batch[1], 1e-6);
}

#[test]
fn test_batch_size_invariance_with_token_type_ids() {
    let embedder = mock_embedder(
        EmbedderConfig::default(),
        MockModel::new(16).with_token_type_ids(),
    );

    let alone = embedder.encode("short").unwrap();
    let batch = embedder
        .encode_batch(&["short", "one two three four five six"])
        .unwrap();
    assert_close(&alone, &batch[0], 1e-6);
}

#[test]
fn test_order_preserved() {
    let embedder = mock_embedder(EmbedderConfig::default(), MockModel::new(16));
    let texts = ["first text", "second", "the third one here"];

    let batch = embedder.encode_batch(&texts).unwrap();
    for (text, vec) in texts.iter().zip(&batch) {
        assert_close(&embedder.encode(text).unwrap(), vec, 1e-6);
    }
}

#[test]
fn test_deterministic() {
    let embedder = mock_embedder(EmbedderConfig::default(), MockModel::new(64));
    let a = embedder.encode("The quick brown fox").unwrap();
    let b = embedder.encode("The quick brown fox").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_normalized_output() {
    let embedder = mock_embedder(EmbedderConfig::default(), MockModel::new(768));
    for v in embedder
        .encode_batch(&["Test sentence", "Hello world", "x"])
        .unwrap()
    {
        assert_eq!(v.len(), 768);
        let norm = l2_norm(&v);
        assert!((0.9999..=1.0001).contains(&norm), "norm={norm}");
    }
}

#[test]
fn test_pooled_and_per_token_models_agree() {
    let per_token = mock_embedder(EmbedderConfig::default(), MockModel::new(24));
    let pooled = mock_embedder(EmbedderConfig::default(), MockModel::new(24).pooled());

    let texts = ["hello", "a somewhat longer input sentence"];
    let a = per_token.encode_batch(&texts).unwrap();
    let b = pooled.encode_batch(&texts).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_close(x, y, 1e-6);
    }
}

#[test]
fn test_truncation_keeps_leading_tokens() {
    let config = EmbedderConfig {
        max_tokens: 3,
        ..EmbedderConfig::default()
    };
    let embedder = mock_embedder(config, MockModel::new(16));

    // <s> alpha beta | gamma delta </s> are dropped in both
    let a = embedder.encode("alpha beta gamma delta").unwrap();
    let b = embedder.encode("alpha beta something else entirely").unwrap();
    assert_close(&a, &b, 1e-6);
}

#[test]
fn test_empty_batch() {
    let tokenizer = MockTokenizer::new();
    let model = MockModel::new(8);
    let (tokenizer_calls, model_calls) = (tokenizer.calls(), model.calls());
    let embedder = SentenceEmbedder::with_backends(
        EmbedderConfig::default(),
        Box::new(tokenizer),
        Box::new(model),
    )
    .unwrap();

    let empty: Vec<String> = Vec::new();
    assert!(embedder.encode_batch(empty.as_slice()).unwrap().is_empty());
    assert_eq!(tokenizer_calls.get(), 0);
    assert_eq!(model_calls.get(), 0);
}

#[test]
fn test_tokenization_failure_fails_whole_batch() {
    let model = MockModel::new(8);
    let model_calls = model.calls();
    let embedder = SentenceEmbedder::with_backends(
        EmbedderConfig::default(),
        Box::new(MockTokenizer::new().failing_on("\u{0}")),
        Box::new(model),
    )
    .unwrap();

    let err = embedder
        .encode_batch(&["ok", "also ok", "bad\u{0}text"])
        .unwrap_err();
    assert!(matches!(err, EmbedderError::TokenizationFailed { index: 2, .. }));
    assert!(err.to_string().starts_with("tokenization failed"));
    assert_eq!(model_calls.get(), 0);
}

#[test]
fn test_nonexistent_model_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope").join("model.onnx");
    std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

    let config = EmbedderConfig {
        model_path: Some(missing.clone()),
        tokenizer_path: Some(dir.path().join("tokenizer.json")),
        ..EmbedderConfig::default()
    };

    let err = SentenceEmbedder::new(config).err().unwrap();
    match &err {
        EmbedderError::FileNotFound { path, .. } => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains(&missing.display().to_string()));
}

#[test]
fn test_embedder_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SentenceEmbedder>();
}

#[test]
fn test_concurrent_encode() {
    let embedder = mock_embedder(EmbedderConfig::default(), MockModel::new(16));
    let expected = embedder.encode("shared sentence").unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| embedder.encode("shared sentence").unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}

// ── Real model ───────────────────────────────────────────────────────

fn real_embedder() -> Option<SentenceEmbedder> {
    if !all_files_present(&default_model_dir()) {
        eprintln!("Skipping: model files not downloaded");
        return None;
    }
    Some(SentenceEmbedder::new(EmbedderConfig::default()).unwrap())
}

#[test]
#[ignore]
fn test_real_model_dimensions_and_norm() {
    let Some(embedder) = real_embedder() else {
        return;
    };

    let v = embedder.encode("Hello world").unwrap();
    assert_eq!(v.len(), 768);
    let norm = l2_norm(&v);
    assert!((0.9999..=1.0001).contains(&norm), "norm={norm}");
}

#[test]
#[ignore]
fn test_real_model_deterministic() {
    let Some(embedder) = real_embedder() else {
        return;
    };

    for text in ["The quick brown fox", "Hello world", "A cat sits on the mat"] {
        let a = embedder.encode(text).unwrap();
        let b = embedder.encode(text).unwrap();
        assert_close(&a, &b, 1e-6);
    }
}

#[test]
#[ignore]
fn test_real_model_batch_invariance() {
    let Some(embedder) = real_embedder() else {
        return;
    };

    let alone = embedder.encode("A cat sits on the mat").unwrap();
    let batch = embedder
        .encode_batch(&[
            "Hi",
            "A cat sits on the mat",
            "The committee postponed its decision on the new infrastructure budget until next spring",
        ])
        .unwrap();
    assert_close(&alone, &batch[1], 1e-4);
}

#[test]
#[ignore]
fn test_real_model_semantic_ordering() {
    let Some(embedder) = real_embedder() else {
        return;
    };

    let v1 = embedder.encode("A cat sits on the mat").unwrap();
    let v2 = embedder.encode("A kitten is sitting on a rug").unwrap();
    let v3 = embedder.encode("The stock market crashed yesterday").unwrap();

    assert!(cosine_similarity(&v1, &v2) > cosine_similarity(&v1, &v3));
}
