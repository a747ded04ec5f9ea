//! Boundary kinds and the solver commands that set them.

use std::fmt;

use cs_exchange::Quantity;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Inlet,
    Outlet,
    Wall,
}

impl BoundaryKind {
    /// Resolve a kind from a boundary name, testing `inlet`, then `outlet`,
    /// then `wall`.
    pub fn infer(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("inlet") {
            Some(BoundaryKind::Inlet)
        } else if lower.contains("outlet") {
            Some(BoundaryKind::Outlet)
        } else if lower.contains("wall") {
            Some(BoundaryKind::Wall)
        } else {
            None
        }
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoundaryKind::Inlet => "inlet",
            BoundaryKind::Outlet => "outlet",
            BoundaryKind::Wall => "wall",
        };
        f.write_str(s)
    }
}

/// Which side of the room has its flow fixed.
///
/// `Normal`: velocity inlet, outflow outlet.
/// `Negative`: free inlet vent, fixed mass-flow outlet (room under negative pressure).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureMode {
    #[default]
    Normal,
    Negative,
}

/// A declared field boundary with its kind resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundarySpec {
    pub name: String,
    pub kind: BoundaryKind,
    /// Fixed temperature (K) used when no exchanged value is bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl BoundarySpec {
    pub fn new(name: impl Into<String>, kind: BoundaryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }

    /// Quantities an exchange must supply for this boundary in `mode`.
    pub fn required(&self, mode: PressureMode) -> &'static [Quantity] {
        match (self.kind, mode) {
            (BoundaryKind::Inlet, PressureMode::Normal) => {
                &[Quantity::Velocity, Quantity::Temperature]
            }
            (BoundaryKind::Inlet, PressureMode::Negative) => &[Quantity::Temperature],
            (BoundaryKind::Outlet, PressureMode::Normal) => &[],
            (BoundaryKind::Outlet, PressureMode::Negative) => &[Quantity::MassFlow],
            (BoundaryKind::Wall, _) if self.temperature.is_some() => &[],
            (BoundaryKind::Wall, _) => &[Quantity::Temperature],
        }
    }

    /// Solver command applying `values` to this boundary.
    pub fn command(&self, mode: PressureMode, values: &BoundaryValues) -> FieldResult<String> {
        let name = &self.name;
        let need = |value: Option<f64>, quantity: &'static str| {
            value.ok_or_else(|| FieldError::MissingValue {
                boundary: name.clone(),
                quantity,
            })
        };
        let cmd = match (self.kind, mode) {
            (BoundaryKind::Inlet, PressureMode::Normal) => {
                let v = need(values.velocity, "velocity")?;
                let t = need(values.temperature, "temperature")?;
                format!(
                    "/define/boundary/velocity-inlet {name} no no yes yes no {v} no 0 no {t} no no yes 5 10"
                )
            }
            (BoundaryKind::Inlet, PressureMode::Negative) => {
                let t = need(values.temperature, "temperature")?;
                format!(
                    "/define/boundary/inlet-vent {name} yes no 0 no 0 no {t} no yes yes no 0.06 no 0.04"
                )
            }
            (BoundaryKind::Outlet, PressureMode::Normal) => {
                format!("/define/boundary/zone-type {name} outflow")
            }
            (BoundaryKind::Outlet, PressureMode::Negative) => {
                // older binding tables drive the outlet through its `.v` entry
                let m = need(values.mass_flow.or(values.velocity), "mass flow")?;
                format!("/define/boundary/mass-flow-outlet {name} yes yes no {m}")
            }
            (BoundaryKind::Wall, _) => {
                let t = need(values.temperature.or(self.temperature), "temperature")?;
                format!("/define/boundary/wall {name} 0 no 0 no yes temperature no {t}")
            }
        };
        Ok(cmd)
    }
}

/// Values collected for one boundary from an exchange payload.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundaryValues {
    pub velocity: Option<f64>,
    pub temperature: Option<f64>,
    pub mass_flow: Option<f64>,
}

impl BoundaryValues {
    pub fn set(&mut self, quantity: Quantity, value: f64) {
        match quantity {
            Quantity::Velocity => self.velocity = Some(value),
            Quantity::Temperature => self.temperature = Some(value),
            Quantity::MassFlow => self.mass_flow = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_none() && self.temperature.is_none() && self.mass_flow.is_none()
    }
}

/// Outcome of a single boundary command.
///
/// Setting a boundary never propagates a failure by itself; the caller
/// decides whether a failed set aborts the run.
#[derive(Debug)]
pub enum BoundaryStatus {
    Set,
    Failed(FieldError),
}

impl BoundaryStatus {
    pub fn is_set(&self) -> bool {
        matches!(self, BoundaryStatus::Set)
    }
}

impl fmt::Display for BoundaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryStatus::Set => f.write_str("Set Down"),
            BoundaryStatus::Failed(e) => write!(f, "Set Error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_inferred_from_name() {
        assert_eq!(BoundaryKind::infer("inlet"), Some(BoundaryKind::Inlet));
        assert_eq!(BoundaryKind::infer("wall-floor"), Some(BoundaryKind::Wall));
        assert_eq!(BoundaryKind::infer("outlet-2"), Some(BoundaryKind::Outlet));
        assert_eq!(BoundaryKind::infer("door"), None);
        // outlet takes precedence over wall
        assert_eq!(BoundaryKind::infer("wall-outlet"), Some(BoundaryKind::Outlet));
        assert_eq!(BoundaryKind::infer("outlet_wall"), Some(BoundaryKind::Outlet));
        assert_eq!(BoundaryKind::infer("inlet-wall"), Some(BoundaryKind::Inlet));
    }

    #[test]
    fn velocity_inlet_command() {
        let spec = BoundarySpec::new("inlet", BoundaryKind::Inlet);
        let values = BoundaryValues {
            velocity: Some(0.5),
            temperature: Some(293.15),
            mass_flow: None,
        };
        assert_eq!(
            spec.command(PressureMode::Normal, &values).unwrap(),
            "/define/boundary/velocity-inlet inlet no no yes yes no 0.5 no 0 no 293.15 no no yes 5 10"
        );
    }

    #[test]
    fn negative_mode_outlet_falls_back_to_velocity_entry() {
        let spec = BoundarySpec::new("outlet", BoundaryKind::Outlet);
        let mut values = BoundaryValues::default();
        values.set(Quantity::Velocity, 0.02);
        assert_eq!(
            spec.command(PressureMode::Negative, &values).unwrap(),
            "/define/boundary/mass-flow-outlet outlet yes yes no 0.02"
        );
        assert_eq!(
            spec.command(PressureMode::Normal, &values).unwrap(),
            "/define/boundary/zone-type outlet outflow"
        );
    }

    #[test]
    fn wall_uses_fixed_temperature_when_unbound() {
        let spec = BoundarySpec::new("wall-floor", BoundaryKind::Wall).with_temperature(290.0);
        assert!(spec.required(PressureMode::Normal).is_empty());
        assert_eq!(
            spec.command(PressureMode::Negative, &BoundaryValues::default())
                .unwrap(),
            "/define/boundary/wall wall-floor 0 no 0 no yes temperature no 290"
        );
    }

    #[test]
    fn missing_inlet_value_is_reported() {
        let spec = BoundarySpec::new("inlet", BoundaryKind::Inlet);
        let mut values = BoundaryValues::default();
        values.set(Quantity::Temperature, 293.0);
        let err = spec.command(PressureMode::Normal, &values).unwrap_err();
        assert!(matches!(err, FieldError::MissingValue { quantity: "velocity", .. }));
    }

    #[test]
    fn status_strings() {
        assert_eq!(BoundaryStatus::Set.to_string(), "Set Down");
        let failed = BoundaryStatus::Failed(FieldError::Cancelled);
        assert!(failed.to_string().starts_with("Set Error"));
        assert!(!failed.is_set());
    }
}
