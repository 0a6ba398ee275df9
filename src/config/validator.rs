use std::collections::HashMap;
use thiserror::Error;

use crate::config::{Settings, TabConfig};
use crate::forms::{BUSINESS_TAB, LOAN_TAB};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct SettingsValidator;

impl SettingsValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<SettingsError>> {
        let mut errors = Vec::new();

        if settings.log.level.trim().is_empty() {
            errors.push(SettingsError::MissingField("log.level".to_string()));
        }

        if let Err(e) = Self::validate_tabs(&settings.tabs) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_cross_references(settings) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_tabs(tabs: &[TabConfig]) -> Result<(), Vec<SettingsError>> {
        let mut errors = Vec::new();
        let mut seen_names = HashMap::new();

        for (idx, tab) in tabs.iter().enumerate() {
            if tab.name.is_empty() {
                errors.push(SettingsError::MissingField(format!("tabs[{}].name", idx)));
                continue;
            }

            if let Some(prev_idx) = seen_names.insert(&tab.name, idx) {
                errors.push(SettingsError::Duplicate(format!(
                    "Tab '{}' appears at indices {} and {}",
                    tab.name, prev_idx, idx
                )));
            }

            if !tab.schema.is_object() {
                errors.push(SettingsError::InvalidValue {
                    field: format!("tabs[{}].schema", idx),
                    reason: "Schema must be a JSON object".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_cross_references(settings: &Settings) -> Result<(), Vec<SettingsError>> {
        let default_tab = &settings.form.default_tab;
        let known = [BUSINESS_TAB, LOAN_TAB].contains(&default_tab.as_str())
            || settings.tabs.iter().any(|t| &t.name == default_tab);

        if known {
            Ok(())
        } else {
            Err(vec![SettingsError::CrossReference(format!(
                "form.default_tab '{}' is not a known tab",
                default_tab
            ))])
        }
    }
}
