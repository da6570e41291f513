use crate::{AnalyticsConfig, AppConfig, ConfigError, TelemetryConfig};
use figment::Jail;

#[test]
fn test_defaults() {
    let telemetry = TelemetryConfig::default();
    assert_eq!(telemetry.log_level, "info");
    assert!(!telemetry.json);

    let analytics = AnalyticsConfig::default();
    assert_eq!(analytics.index_prefix, "gravitee");
    assert_eq!(analytics.group_by_size, 1000);
    assert!(!analytics.entrypoint_keyword);
    assert!(analytics.metric_doc_types.is_empty());
}

#[test]
fn test_load_default_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            r#"
                app_name = "analytics"

                [analytics]
                index_prefix = "apim"
                entrypoint_keyword = true

                [analytics.metric_doc_types]
                "custom-gauge" = "api"
            "#,
        )?;

        let config = AppConfig::load(".").map_err(|e| e.to_string())?;
        assert_eq!(config.app_name, "analytics");
        assert!(config.is_development());
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.analytics.index_prefix, "apim");
        assert!(config.analytics.entrypoint_keyword);
        assert_eq!(config.analytics.group_by_size, 1000);
        assert_eq!(
            config.analytics.metric_doc_types.get("custom-gauge"),
            Some(&"api".to_string())
        );
        Ok(())
    });
}

#[test]
fn test_env_file_and_variables_override() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", r#"app_name = "analytics""#)?;
        jail.create_file(
            "production.toml",
            r#"
                app_env = "production"

                [telemetry]
                log_level = "warn"
                json = true
            "#,
        )?;
        jail.set_env("APP_ENV", "production");
        jail.set_env("APIM_ANALYTICS__GROUP_BY_SIZE", "50");

        let config = AppConfig::load(".").map_err(|e| e.to_string())?;
        assert!(config.is_production());
        assert_eq!(config.telemetry.log_level, "warn");
        assert!(config.telemetry.json);
        assert_eq!(config.analytics.group_by_size, 50);
        Ok(())
    });
}

#[test]
fn test_rejects_zero_group_by_size() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            r#"
                app_name = "analytics"

                [analytics]
                group_by_size = 0
            "#,
        )?;

        let result = AppConfig::load(".");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    });
}

#[test]
fn test_missing_app_name_fails() {
    Jail::expect_with(|_jail| {
        let result = AppConfig::load(".");
        assert!(matches!(result, Err(ConfigError::Load(_))));
        Ok(())
    });
}
