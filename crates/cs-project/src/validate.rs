//! Configuration validation logic.

use std::collections::HashSet;

use cs_exchange::{ExchangeError, FieldTarget};
use cs_field::ReportQuery;

use crate::schema::{CadenceDef, CoSimConfig, FieldDef, LATEST_VERSION};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Cannot resolve kind of boundary '{name}'; name it inlet/outlet/wall or declare a kind")]
    UnresolvedKind { name: String },

    #[error("Boundary '{boundary}' has no binding for {quantity} in {mode:?} pressure mode")]
    UnboundQuantity {
        boundary: String,
        quantity: String,
        mode: cs_field::PressureMode,
    },

    #[error("Initial values: {names} names but {values} values")]
    LengthMismatch { names: usize, values: usize },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error(transparent)]
    Binding(#[from] ExchangeError),
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive and finite"))
    }
}

fn nonzero(field: &str, value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        Err(invalid(field, value, "must be positive"))
    } else {
        Ok(())
    }
}

pub fn validate_config(config: &CoSimConfig) -> Result<(), ValidationError> {
    if config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    let sim = &config.simulation;
    positive("simulation.t_end", sim.t_end)?;
    positive("simulation.dt", sim.dt)?;
    nonzero("simulation.solve_iterations", sim.solve_iterations)?;
    nonzero("simulation.max_steps", sim.max_steps)?;
    nonzero("simulation.max_event_iterations", sim.max_event_iterations)?;

    match config.cadence {
        CadenceDef::EventCount { every, increment } => {
            positive("cadence.every", every)?;
            positive("cadence.increment", increment)?;
        }
        CadenceDef::SimTime { every } => positive("cadence.every", every)?,
    }

    let map = config.exchange_map()?;

    let mut boundary_names = HashSet::new();
    for b in &config.boundaries {
        if !boundary_names.insert(b.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: b.name.clone(),
                context: "boundaries".to_string(),
            });
        }
        if b.resolved_kind().is_none() {
            return Err(ValidationError::UnresolvedKind {
                name: b.name.clone(),
            });
        }
        if let Some(t) = b.temperature {
            positive("boundaries.temperature", t)?;
        }
    }

    let mut bound: HashSet<(String, cs_exchange::Quantity)> = HashSet::new();
    for binding in map.model_to_field() {
        let target = FieldTarget::parse(&binding.destination)?;
        if !boundary_names.contains(target.boundary.as_str()) {
            return Err(ValidationError::MissingReference {
                id: target.boundary,
                context: "model_to_field destination".to_string(),
            });
        }
        bound.insert((target.boundary, target.quantity));
    }
    for spec in config.boundary_specs() {
        for &quantity in spec.required(config.pressure_mode) {
            let direct = bound.contains(&(spec.name.clone(), quantity));
            // a negative-pressure outlet may be driven through its `.v` entry
            let via_velocity = quantity == cs_exchange::Quantity::MassFlow
                && bound.contains(&(spec.name.clone(), cs_exchange::Quantity::Velocity));
            if !direct && !via_velocity {
                return Err(ValidationError::UnboundQuantity {
                    boundary: spec.name.clone(),
                    quantity: quantity.suffix().to_string(),
                    mode: config.pressure_mode,
                });
            }
        }
    }

    let mut report_names = HashSet::new();
    let mut csv_files = HashSet::new();
    for report in &config.reports {
        if !report_names.insert(report.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: report.name.clone(),
                context: "reports".to_string(),
            });
        }
        for export in &report.csv {
            if !csv_files.insert(export.file.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: export.file.clone(),
                    context: "report csv files".to_string(),
                });
            }
            match (&report.query, &export.boundary) {
                (ReportQuery::HeatTransfer { boundaries }, Some(b)) if !boundaries.contains(b) => {
                    return Err(ValidationError::MissingReference {
                        id: b.clone(),
                        context: format!("csv export of report '{}'", report.name),
                    });
                }
                (ReportQuery::HeatTransfer { .. }, None) => {
                    return Err(invalid(
                        "reports.csv.boundary",
                        &export.file,
                        "per-boundary reports need a boundary to export",
                    ));
                }
                (_, Some(b)) if !matches!(report.query, ReportQuery::HeatTransfer { .. }) => {
                    return Err(invalid(
                        "reports.csv.boundary",
                        b,
                        "only per-boundary reports take a boundary",
                    ));
                }
                _ => {}
            }
        }
    }
    for binding in map.field_to_model() {
        if !report_names.contains(binding.source.as_str()) {
            return Err(ValidationError::MissingReference {
                id: binding.source.clone(),
                context: "field_to_model source".to_string(),
            });
        }
    }

    let init = &config.initial;
    if init.names.len() != init.values.len() {
        return Err(ValidationError::LengthMismatch {
            names: init.names.len(),
            values: init.values.len(),
        });
    }
    for door in &init.doors {
        positive("initial.doors.flow_exponent", door.flow_exponent)?;
    }
    for cleaner in &init.air_cleaners {
        positive("initial.air_cleaners.a", cleaner.a)?;
        positive("initial.air_cleaners.b", cleaner.b)?;
    }

    if config.observables.iter().any(|o| o.trim().is_empty()) {
        return Err(invalid("observables", "\"\"", "names must not be empty"));
    }

    let mut rooms = HashSet::new();
    for room in &config.rooms {
        if room.trim().is_empty() || !rooms.insert(room.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: room.clone(),
                context: "rooms".to_string(),
            });
        }
    }
    if let Some(active) = &config.active_room
        && !rooms.contains(active.as_str())
    {
        return Err(ValidationError::MissingReference {
            id: active.clone(),
            context: "active_room".to_string(),
        });
    }

    match &config.field {
        FieldDef::Surrogate(p) => {
            positive("field.inlet_area_m2", p.inlet_area_m2)?;
            positive("field.initial_temperature_k", p.initial_temperature_k)?;
            if !(p.relaxation > 0.0 && p.relaxation <= 1.0) {
                return Err(invalid("field.relaxation", p.relaxation, "must be in (0, 1]"));
            }
            if !(p.wall_conductance_w_k.is_finite() && p.wall_conductance_w_k >= 0.0) {
                return Err(invalid(
                    "field.wall_conductance_w_k",
                    p.wall_conductance_w_k,
                    "must be non-negative",
                ));
            }
        }
        FieldDef::Process(p) => {
            if p.program.trim().is_empty() {
                return Err(invalid("field.program", "\"\"", "must not be empty"));
            }
            if p.poll_interval_ms == 0 {
                return Err(invalid("field.poll_interval_ms", 0, "must be positive"));
            }
            positive("field.command_timeout_s", p.command_timeout_s)?;
            if let Some(t) = p.startup_timeout_s {
                positive("field.startup_timeout_s", t)?;
            }
            if p.prompt.trim().is_empty() {
                return Err(invalid("field.prompt", "\"\"", "must not be blank"));
            }
        }
    }

    Ok(())
}
