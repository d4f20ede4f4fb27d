use std::time::Duration;

use assert_matches::assert_matches;

use ncbi_gene_batch::config::{Config, ConfigLoader, ConfigOverrides};
use ncbi_gene_batch::error::GeneError;

#[test]
fn parse_config_file() {
    let raw = r#"{
        "eutils_base_url": "http://localhost:8080/eutils/",
        "delay_ms": 350,
        "email": "lab@example.org",
        "tool": "  ",
        "summary_marker": { "marker": "<dt>Summary</dt>" }
    }"#;
    let config: Config = serde_json::from_str(raw).unwrap();
    let resolved = ConfigLoader::resolve_config(config);

    assert_eq!(resolved.eutils_base_url, "http://localhost:8080/eutils");
    assert_eq!(resolved.delay, Duration::from_millis(350));
    assert_eq!(resolved.email.as_deref(), Some("lab@example.org"));
    assert_eq!(resolved.tool, None);
    assert_eq!(resolved.summary_marker.open, "<dd>");
    assert_eq!(resolved.max_retries, 3);
}

#[test]
fn overrides_win() {
    let mut resolved = ConfigLoader::resolve_config(Config::default());
    resolved.apply(ConfigOverrides {
        delay_ms: Some(0),
        timeout_secs: Some(5),
        dictionary_path: Some("/tmp/words".into()),
    });
    assert_eq!(resolved.delay, Duration::ZERO);
    assert_eq!(resolved.timeout, Some(Duration::from_secs(5)));
    assert_eq!(
        resolved.dictionary_path.as_deref(),
        Some(std::path::Path::new("/tmp/words"))
    );
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, GeneError::ConfigRead(_));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ delay_ms: ").unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, GeneError::ConfigParse(_));
}
