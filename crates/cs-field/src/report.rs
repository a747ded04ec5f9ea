//! Report queries and parsing of the flat text files the solver writes.

use cs_exchange::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// One of the four aggregate report forms the solver understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportQuery {
    /// Mass-weighted average of `quantity` over a cell zone.
    VolumeMassAverage { zone: String, quantity: String },
    /// Mass flow through surfaces matching `surface` (a trailing `*` is a wildcard).
    SurfaceMassFlow { surface: String },
    /// Area-weighted average of `quantity` over a surface.
    AreaWeightedAverage { surface: String, quantity: String },
    /// Heat transfer rate through each listed boundary.
    HeatTransfer { boundaries: Vec<String> },
}

impl ReportQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportQuery::VolumeMassAverage { .. } => "volume mass-average",
            ReportQuery::SurfaceMassFlow { .. } => "surface mass-flow",
            ReportQuery::AreaWeightedAverage { .. } => "area-weighted average",
            ReportQuery::HeatTransfer { .. } => "heat transfer",
        }
    }

    /// Prefix of the report file name.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportQuery::VolumeMassAverage { .. } => "simuT",
            ReportQuery::SurfaceMassFlow { .. } => "simu",
            ReportQuery::AreaWeightedAverage { .. } => "simuP",
            ReportQuery::HeatTransfer { .. } => "simufluxes",
        }
    }

    pub fn file_name(&self, tag: &str) -> String {
        format!("{}_{}.txt", self.file_prefix(), tag)
    }

    /// Solver command writing this report to `file_name`.
    pub fn command(&self, file_name: &str) -> String {
        match self {
            ReportQuery::VolumeMassAverage { zone, quantity } => {
                format!("/report/volume-integrals/mass-avg {zone} () {quantity} yes {file_name}")
            }
            ReportQuery::SurfaceMassFlow { surface } => {
                format!("/report/fluxes/mass-flow no {surface} () yes {file_name}")
            }
            ReportQuery::AreaWeightedAverage { surface, quantity } => {
                format!(
                    "/report/surface-integrals/area-weighted-avg {surface} () {quantity} yes {file_name}"
                )
            }
            ReportQuery::HeatTransfer { .. } => {
                format!("/report/fluxes/heat-transfer yes yes {file_name}")
            }
        }
    }

    /// Tokens whose successor holds the reported value.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ReportQuery::VolumeMassAverage { zone, .. } => vec![zone.as_str()],
            ReportQuery::SurfaceMassFlow { surface }
            | ReportQuery::AreaWeightedAverage { surface, .. } => {
                vec![surface.trim_end_matches('*')]
            }
            ReportQuery::HeatTransfer { boundaries } => {
                boundaries.iter().map(String::as_str).collect()
            }
        }
    }

    /// Extract the value(s) from a report file's text.
    pub fn parse(&self, text: &str) -> FieldResult<FieldValue> {
        let lookup = |key: &str| {
            value_after(text, key).map_err(|detail| FieldError::ReportParse {
                report: self.kind().to_string(),
                detail,
            })
        };
        match self {
            ReportQuery::HeatTransfer { boundaries } => {
                let values = boundaries
                    .iter()
                    .map(|b| Ok((b.clone(), lookup(b)?)))
                    .collect::<FieldResult<Vec<_>>>()?;
                Ok(FieldValue::PerBoundary(values))
            }
            _ => {
                let key = self.keys().first().copied().unwrap_or_default();
                Ok(FieldValue::Scalar(lookup(key)?))
            }
        }
    }
}

/// Value of the whitespace-separated token that follows `key`.
pub fn value_after(text: &str, key: &str) -> Result<f64, String> {
    let mut tokens = text.split_whitespace();
    if !tokens.by_ref().any(|tok| tok == key) {
        return Err(format!("token '{key}' not found"));
    }
    let raw = tokens
        .next()
        .ok_or_else(|| format!("no value after '{key}'"))?;
    raw.parse::<f64>()
        .map_err(|_| format!("value after '{key}' is not a number: '{raw}'"))
}
