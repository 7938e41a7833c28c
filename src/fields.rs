use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ProgressionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Url,
    Textarea,
    Number,
    Select { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    fn new(name: &str, label: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_specs(specs: &[FieldSpec]) -> Result<(), ProgressionError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(ProgressionError::InvalidFieldSpec(
                "field name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(ProgressionError::InvalidFieldSpec(format!(
                "duplicate field {}",
                spec.name
            )));
        }
        if let FieldKind::Select { options } = &spec.kind {
            if options.is_empty() {
                return Err(ProgressionError::InvalidFieldSpec(format!(
                    "select field {} has no options",
                    spec.name
                )));
            }
        }
    }
    Ok(())
}

pub fn parse_specs(raw: &serde_json::Value) -> Result<Vec<FieldSpec>, ProgressionError> {
    let specs: Vec<FieldSpec> = serde_json::from_value(raw.clone())
        .map_err(|e| ProgressionError::InvalidFieldSpec(e.to_string()))?;
    validate_specs(&specs)?;
    Ok(specs)
}

/// Picks the stored configuration when it is usable, otherwise the defaults.
pub fn resolve_fields(action_type: &str, stored: Option<&serde_json::Value>) -> Vec<FieldSpec> {
    match stored.map(parse_specs) {
        Some(Ok(specs)) if !specs.is_empty() => specs,
        Some(Ok(_)) => default_fields(action_type),
        Some(Err(err)) => {
            tracing::warn!(action_type, error = %err, "stored field config rejected, using defaults");
            default_fields(action_type)
        }
        None => default_fields(action_type),
    }
}

pub fn default_fields(action_type: &str) -> Vec<FieldSpec> {
    match action_type {
        "linkedin_post" => vec![
            FieldSpec::new("post_url", "Lien du post", FieldKind::Url, true),
            FieldSpec::new("published_on", "Date de publication", FieldKind::Date, true),
        ],
        "event" => vec![
            FieldSpec::new("event_name", "Nom de l'événement", FieldKind::Text, true),
            FieldSpec::new("event_date", "Date", FieldKind::Date, true),
            FieldSpec::new(
                "role",
                "Rôle",
                FieldKind::Select {
                    options: vec![
                        "participant".to_string(),
                        "organisateur".to_string(),
                        "intervenant".to_string(),
                    ],
                },
                true,
            ),
        ],
        "association" => vec![
            FieldSpec::new("association_name", "Nom de l'association", FieldKind::Text, true),
            FieldSpec::new("description", "Description", FieldKind::Textarea, true),
            FieldSpec::new("created_on", "Date de création", FieldKind::Date, false),
        ],
        _ => vec![FieldSpec::new("description", "Description", FieldKind::Textarea, true)],
    }
}

/// Checks submitted values against the field specs, reporting every problem.
pub fn validate_submission(
    specs: &[FieldSpec],
    values: &HashMap<String, String>,
) -> Result<(), ProgressionError> {
    let mut errors = Vec::new();
    let error = |field: &str, message: &str| FieldError {
        field: field.to_string(),
        message: message.to_string(),
    };

    for key in values.keys() {
        if !specs.iter().any(|s| &s.name == key) {
            errors.push(error(key, "unknown field"));
        }
    }

    for spec in specs {
        let value = values.get(&spec.name).map(|v| v.trim()).filter(|v| !v.is_empty());
        let Some(value) = value else {
            if spec.required {
                errors.push(error(&spec.name, "required"));
            }
            continue;
        };

        let valid = match &spec.kind {
            FieldKind::Text | FieldKind::Textarea => true,
            FieldKind::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            FieldKind::Url => value.starts_with("https://") || value.starts_with("http://"),
            FieldKind::Number => value.parse::<f64>().is_ok_and(f64::is_finite),
            FieldKind::Select { options } => options.iter().any(|o| o == value),
        };

        if !valid {
            let message = match &spec.kind {
                FieldKind::Date => "expected a YYYY-MM-DD date",
                FieldKind::Url => "expected an http(s) url",
                FieldKind::Number => "expected a number",
                _ => "not one of the allowed options",
            };
            errors.push(error(&spec.name, message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        Err(ProgressionError::InvalidSubmission(errors))
    }
}
