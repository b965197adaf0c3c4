use resilient_records::config::{ConfigurationError, ResilienceConfig};
use std::io::Write;

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_toml_file_overrides_defaults() -> anyhow::Result<()> {
    let file = config_file(
        ".toml",
        r#"
primary_queue_concurrency = 3
replica_name_suffix = "-retry"
"#,
    );

    let config = ResilienceConfig::from_file(file.path())?;
    assert_eq!(config.primary_queue_concurrency, 3);
    assert_eq!(config.replica_name_suffix, "-retry");
    assert_eq!(config.notification_channel_capacity, 1000);
    Ok(())
}

#[test]
fn test_yaml_file_is_supported() -> anyhow::Result<()> {
    let file = config_file(".yaml", "notification_channel_capacity: 64\n");

    let config = ResilienceConfig::from_file(file.path())?;
    assert_eq!(config.notification_channel_capacity, 64);
    Ok(())
}

#[test]
fn test_invalid_file_value_is_rejected() {
    let file = config_file(".toml", "primary_queue_concurrency = 0\n");

    let result = ResilienceConfig::from_file(file.path());
    assert!(matches!(
        result,
        Err(ConfigurationError::Invalid {
            field: "primary_queue_concurrency",
            ..
        })
    ));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = ResilienceConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigurationError::Load(_))));
}

#[test]
fn test_environment_overrides_defaults() -> anyhow::Result<()> {
    std::env::set_var("RESILIENCE_DEFAULT_DOWNLOAD_LIMIT", "50");
    let config = ResilienceConfig::from_env();
    std::env::remove_var("RESILIENCE_DEFAULT_DOWNLOAD_LIMIT");

    let config = config?;
    assert_eq!(config.default_download_limit, 50);
    assert_eq!(config.recovery_settings().default_download_limit, 50);
    Ok(())
}
