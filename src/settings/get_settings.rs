use crate::settings::structs::AppSettings;
use std::sync::LazyLock;

/// Load the app settings from YAML + environment variables.
///
/// Every field has a default, so a missing `config/settings.yaml` is fine;
/// environment variables use the `APP__` prefix (e.g.
/// `APP__DETECTOR__SERVICE_URL`).
///
/// # Errors
///
/// Returns an error if the config file is malformed or a value fails to
/// deserialize into [`AppSettings`].
pub fn load_app_settings() -> color_eyre::Result<AppSettings> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/settings").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );
    Ok(builder.build()?.try_deserialize::<AppSettings>()?)
}

/// Immutable global settings, initialized on first access.
static SETTINGS: LazyLock<AppSettings> =
    LazyLock::new(|| load_app_settings().expect("Failed to load app settings"));

#[must_use]
pub fn settings() -> &'static AppSettings {
    &SETTINGS
}

#[cfg(test)]
mod tests {
    use super::load_app_settings;

    #[test]
    fn test_defaults_load_without_config_file() -> color_eyre::Result<()> {
        let settings = load_app_settings()?;
        assert_eq!(settings.breaker.failure_threshold, 5);
        assert_eq!(settings.queues.analysis.concurrency, 3);
        assert_eq!(settings.queues.analysis.lock_duration_secs, 300);
        assert_eq!(settings.queues.analytics.concurrency, 1);
        Ok(())
    }
}
