//! Integration tests: configuration files and credential resolution.

use lodestar::config::{ResearchConfig, SecretRef};
use lodestar::{Depth, ResearchError, ResearchPipeline};

#[test]
fn init_config_output_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lodestar").join("config.toml");
    ResearchConfig::default().save_to_file(&path).expect("save");

    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("[llm]"));
    assert!(text.contains("LODESTAR_LLM_API_KEY"));
    assert!(!text.contains("sk-"), "no credential is ever written");

    let loaded = ResearchConfig::from_file(&path).expect("load");
    assert!(loaded.validate().is_ok());
    assert_eq!(loaded.depth, Depth::Intermediate);
}

#[test]
fn pipeline_requires_a_search_key() {
    let mut config = ResearchConfig::default();
    config.llm.api_key = SecretRef::None;
    config.search.api_key = SecretRef::env("LODESTAR_TEST_UNSET_SEARCH_KEY_7F3A");

    let err = ResearchPipeline::from_config(&config).err().expect("missing key must fail");
    assert!(matches!(err, ResearchError::Config(_)));
    assert!(err.to_string().contains("LODESTAR_TEST_UNSET_SEARCH_KEY_7F3A"));
}

#[test]
fn pipeline_builds_from_command_secrets() {
    let mut config = ResearchConfig::default();
    config.llm.api_key = SecretRef::Command {
        cmd: "echo llm-key".into(),
    };
    config.search.api_key = SecretRef::Command {
        cmd: "echo search-key".into(),
    };
    assert!(ResearchPipeline::from_config(&config).is_ok());
}

#[test]
fn invalid_config_is_rejected_before_any_request() {
    let mut config = ResearchConfig::default();
    config.llm.api_key = SecretRef::None;
    config.search.api_key = SecretRef::None;
    config.llm.temperature = 3.5;

    let err = ResearchPipeline::from_config(&config).err().expect("invalid config");
    assert!(err.to_string().contains("temperature"));
}
