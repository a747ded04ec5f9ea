//! Field-side destination names of the form `<boundary>.<quantity>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, ExchangeResult};

/// Boundary quantity a model value can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Velocity,
    Temperature,
    MassFlow,
}

impl Quantity {
    pub fn suffix(self) -> &'static str {
        match self {
            Quantity::Velocity => "v",
            Quantity::Temperature => "T",
            Quantity::MassFlow => "m_flow",
        }
    }
}

impl FromStr for Quantity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v" => Ok(Quantity::Velocity),
            "T" => Ok(Quantity::Temperature),
            "m_flow" | "m" => Ok(Quantity::MassFlow),
            _ => Err(()),
        }
    }
}

/// Parsed model→field destination, e.g. `inlet.v` or `wall-floor.T`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldTarget {
    pub boundary: String,
    pub quantity: Quantity,
}

impl FieldTarget {
    /// Split on the last `.`; boundary names may themselves contain dots.
    pub fn parse(name: &str) -> ExchangeResult<Self> {
        let invalid = || ExchangeError::Target {
            name: name.to_string(),
        };
        let (boundary, suffix) = name.rsplit_once('.').ok_or_else(invalid)?;
        if boundary.is_empty() {
            return Err(invalid());
        }
        let quantity = suffix.parse().map_err(|_| invalid())?;
        Ok(Self {
            boundary: boundary.to_string(),
            quantity,
        })
    }
}

impl fmt::Display for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.boundary, self.quantity.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boundary_and_quantity() {
        let t = FieldTarget::parse("inlet.v").unwrap();
        assert_eq!(t.boundary, "inlet");
        assert_eq!(t.quantity, Quantity::Velocity);

        let t = FieldTarget::parse("zone.a.outlet.m").unwrap();
        assert_eq!(t.boundary, "zone.a.outlet");
        assert_eq!(t.quantity, Quantity::MassFlow);
        assert_eq!(t.to_string(), "zone.a.outlet.m_flow");
    }

    #[test]
    fn rejects_unknown_suffix_and_bare_names() {
        assert!(FieldTarget::parse("inlet.p").is_err());
        assert!(FieldTarget::parse("inlet").is_err());
        assert!(FieldTarget::parse(".T").is_err());
    }
}
