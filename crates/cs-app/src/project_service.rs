//! Configuration loading and binding introspection.

use std::path::Path;

use cs_exchange::{FieldTarget, Quantity};
use cs_field::ReportQuery;
use cs_project::CoSimConfig;

use crate::error::AppResult;

/// Load and validate a configuration file (YAML, or JSON by extension).
pub fn load_config(path: &Path) -> AppResult<CoSimConfig> {
    Ok(cs_project::load(path)?)
}

/// One binding with what it resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRow {
    pub source: String,
    pub destination: String,
    pub resolved: String,
}

/// Parsed bindings of both directions, as the `bindings` command prints them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSummary {
    pub model_to_field: Vec<BindingRow>,
    pub field_to_model: Vec<BindingRow>,
    /// Destinations bound more than once; the last binding wins.
    pub duplicate_destinations: Vec<String>,
}

fn quantity_name(quantity: Quantity) -> &'static str {
    match quantity {
        Quantity::Velocity => "velocity",
        Quantity::Temperature => "temperature",
        Quantity::MassFlow => "mass flow",
    }
}

pub fn describe_bindings(config: &CoSimConfig) -> AppResult<BindingSummary> {
    let map = config.exchange_map()?;
    let specs = config.boundary_specs();

    let model_to_field = map
        .model_to_field()
        .iter()
        .map(|b| {
            let resolved = match FieldTarget::parse(&b.destination) {
                Ok(target) => match specs.iter().find(|s| s.name == target.boundary) {
                    Some(spec) => format!("{} {} of {}", spec.kind, quantity_name(target.quantity), spec.name),
                    None => format!("undeclared boundary '{}'", target.boundary),
                },
                Err(e) => e.to_string(),
            };
            BindingRow {
                source: b.source.clone(),
                destination: b.destination.clone(),
                resolved,
            }
        })
        .collect();

    let field_to_model = map
        .field_to_model()
        .iter()
        .map(|b| {
            let resolved = match config.report(&b.source).map(|r| &r.query) {
                Some(ReportQuery::HeatTransfer { boundaries }) => boundaries
                    .iter()
                    .map(|boundary| format!("{}{}", b.destination, boundary))
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(query) => query.kind().to_string(),
                None => "undeclared report".to_string(),
            };
            BindingRow {
                source: b.source.clone(),
                destination: b.destination.clone(),
                resolved,
            }
        })
        .collect();

    let mut duplicate_destinations: Vec<String> = map
        .model_to_field()
        .duplicate_destinations()
        .into_iter()
        .chain(map.field_to_model().duplicate_destinations())
        .map(str::to_string)
        .collect();
    duplicate_destinations.dedup();

    Ok(BindingSummary {
        model_to_field,
        field_to_model,
        duplicate_destinations,
    })
}
