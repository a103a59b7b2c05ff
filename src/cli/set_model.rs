//! `set-model` command: persist the default model in the config file.

use std::error::Error;

use crate::core::config::Config;

pub fn run_set_model(model: Option<String>) -> Result<(), Box<dyn Error>> {
    // Environment overrides are per-run and must not be written back.
    let mut config = Config::load_from_path(&Config::get_config_path()?)?;
    let message = apply_default_model(&mut config, model);
    config.save()?;
    println!("✅ {message}");
    Ok(())
}

/// Update `default_model`, trimming the id; a blank or missing id clears it.
pub(crate) fn apply_default_model(config: &mut Config, model: Option<String>) -> String {
    let model = model
        .map(|model| model.trim().to_string())
        .filter(|model| !model.is_empty());
    match model {
        Some(model) => {
            let message = format!("Set default-model to: {model}");
            config.default_model = Some(model);
            message
        }
        None => {
            config.default_model = None;
            "Unset default-model".to_string()
        }
    }
}
