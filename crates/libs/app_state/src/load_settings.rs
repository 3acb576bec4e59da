use crate::{AppSettings, ConfigMode, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;

pub const SETTINGS_PATH: &str = "config/settings.yaml";

/// Load the app settings from `config/settings.yaml` (if present) and `APP__*` environment
/// variables.
pub fn load_app_settings(mode: ConfigMode) -> Result<AppSettings> {
    // Need to load from dotenv to get it to overwrite the settings file from env.
    dotenv::from_path(".env").ok();
    load_app_settings_from(Path::new(SETTINGS_PATH), mode)
}

pub fn load_app_settings_from(config_path: &Path, mode: ConfigMode) -> Result<AppSettings> {
    load_with_environment(config_path, None, mode)
}

/// `environment` replaces the process environment when set.
fn load_with_environment(
    config_path: &Path,
    environment: Option<config::Map<String, String>>,
    mode: ConfigMode,
) -> Result<AppSettings> {
    let builder = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(environment),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    Ok(AppSettings::resolve(raw_settings, mode)?)
}
