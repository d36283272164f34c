use std::time::Duration;

use solace::config::{SolaceConfig, validate};

#[test]
fn zero_config_defaults() {
    let config = SolaceConfig::default();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.generator.provider, "openai");
    assert_eq!(config.generator.timeout_secs, 20);
    assert_eq!(config.persona.name, "Aster");
    assert_eq!(config.memory.max_messages, 20);
    assert_eq!(config.memory.periodic_scan, 50);
    assert!(config.memory.target_length.is_none());

    validate(&config).expect("defaults must validate");
}

#[test]
fn toml_overrides_apply_and_unset_fields_keep_defaults() {
    let toml = r#"
        [gateway]
        port = 9000

        [persona]
        name = "Juniper"
        personality = "quiet and curious"

        [memory]
        max_messages = 30
        target_length = 12
    "#;
    let config: SolaceConfig = toml::from_str(toml).expect("parse");

    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.persona.name, "Juniper");
    assert_eq!(config.memory.max_messages, 30);
    assert_eq!(config.memory.target_length, Some(12));
    assert_eq!(config.generator.model, "gpt-4o-mini");

    validate(&config).expect("validates");
}

#[test]
fn context_config_derives_target_from_max_when_unset() {
    let mut config = SolaceConfig::default();
    config.memory.max_messages = 30;

    let ctx = config.context_config();
    assert_eq!(ctx.max_messages, 30);
    assert_eq!(ctx.target_length, 15);
    assert_eq!(ctx.generation_timeout, Duration::from_secs(20));

    config.memory.target_length = Some(8);
    assert_eq!(config.context_config().target_length, 8);
}

#[test]
fn validate_rejects_bad_values() {
    let mut config = SolaceConfig::default();
    config.generator.provider = "parrot".into();
    let err = validate(&config).expect_err("bad provider");
    assert!(err.to_string().contains("invalid provider"));

    let mut config = SolaceConfig::default();
    config.memory.max_messages = 0;
    let err = validate(&config).expect_err("zero max_messages");
    assert!(err.to_string().contains("max_messages"));

    let mut config = SolaceConfig::default();
    config.memory.target_length = Some(1);
    let err = validate(&config).expect_err("tiny target");
    assert!(err.to_string().contains("target_length"));

    let mut config = SolaceConfig::default();
    config.memory.target_length = Some(25);
    assert!(validate(&config).is_err(), "target beyond max must fail");

    let mut config = SolaceConfig::default();
    config.generator.timeout_secs = 0;
    let err = validate(&config).expect_err("zero timeout");
    assert!(err.to_string().contains("timeout_secs"));
}
