//! Exchange map and payload resolution.

use std::collections::BTreeMap;

use tracing::debug;

use crate::binding::{BindingSet, Direction};
use crate::error::ExchangeResult;

/// Values produced by one exchange, keyed by destination name.
///
/// Rebuilt at every exchange point and dropped afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangePayload {
    values: BTreeMap<String, f64>,
}

impl ExchangePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Result of one field-side query.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A single aggregated value.
    Scalar(f64),
    /// One value per named boundary, in report order.
    PerBoundary(Vec<(String, f64)>),
}

/// Both binding directions of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableExchangeMap {
    model_to_field: BindingSet,
    field_to_model: BindingSet,
}

impl VariableExchangeMap {
    /// Parse both binding strings. Nothing is installed unless both parse.
    pub fn configure(model_to_field: &str, field_to_model: &str) -> ExchangeResult<Self> {
        let model_to_field = BindingSet::parse(Direction::ModelToField, model_to_field)?;
        let field_to_model = BindingSet::parse(Direction::FieldToModel, field_to_model)?;
        Ok(Self {
            model_to_field,
            field_to_model,
        })
    }

    pub fn model_to_field(&self) -> &BindingSet {
        &self.model_to_field
    }

    pub fn field_to_model(&self) -> &BindingSet {
        &self.field_to_model
    }

    /// Read every model-side source and store it under its field-side name.
    ///
    /// Bindings sharing a destination resolve to the last binding's value.
    pub fn resolve_model_to_field<E>(
        &self,
        mut read_model: impl FnMut(&str) -> Result<f64, E>,
    ) -> Result<ExchangePayload, E> {
        let mut payload = ExchangePayload::new();
        for binding in &self.model_to_field {
            let value = read_model(&binding.source)?;
            debug!(source = %binding.source, destination = %binding.destination, value, "model->field");
            payload.insert(binding.destination.clone(), value);
        }
        Ok(payload)
    }

    /// Query every field-side source and store it under its model-side name.
    ///
    /// A [`FieldValue::PerBoundary`] result fans out into one entry per
    /// boundary, named `destination + boundary`.
    pub fn resolve_field_to_model<E>(
        &self,
        mut query_field: impl FnMut(&str) -> Result<FieldValue, E>,
    ) -> Result<ExchangePayload, E> {
        let mut payload = ExchangePayload::new();
        for binding in &self.field_to_model {
            match query_field(&binding.source)? {
                FieldValue::Scalar(value) => {
                    debug!(source = %binding.source, destination = %binding.destination, value, "field->model");
                    payload.insert(binding.destination.clone(), value);
                }
                FieldValue::PerBoundary(values) => {
                    for (boundary, value) in values {
                        let name = format!("{}{}", binding.destination, boundary);
                        debug!(source = %binding.source, destination = %name, value, "field->model");
                        payload.insert(name, value);
                    }
                }
            }
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn model_values() -> HashMap<&'static str, f64> {
        HashMap::from([("a", 1.0), ("b", 2.0), ("c", 3.0)])
    }

    #[test]
    fn configure_is_all_or_nothing() {
        assert!(VariableExchangeMap::configure("a x", "onlyonetoken;a b").is_err());
        assert!(VariableExchangeMap::configure("onlyonetoken;a b", "a x").is_err());
        assert!(VariableExchangeMap::configure("a b;;c d", "x y").is_err());
        assert!(VariableExchangeMap::configure("a b", "x y; ;").is_err());
    }

    #[test]
    fn duplicate_destination_last_write_wins() {
        let map = VariableExchangeMap::configure("a x;b x", "").unwrap();
        let values = model_values();
        let payload = map
            .resolve_model_to_field(|name| values.get(name).copied().ok_or(()))
            .unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get("x"), Some(2.0));
    }

    #[test]
    fn lookup_errors_propagate() {
        let map = VariableExchangeMap::configure("a x;missing y", "").unwrap();
        let values = model_values();
        let err = map
            .resolve_model_to_field(|name| values.get(name).copied().ok_or(name.to_string()))
            .unwrap_err();
        assert_eq!(err, "missing");
    }

    #[test]
    fn per_boundary_results_fan_out_with_suffix() {
        let map = VariableExchangeMap::configure("", "fluxes room.Q_;RoomT room.T").unwrap();
        let payload = map
            .resolve_field_to_model(|source| -> Result<FieldValue, ()> {
                Ok(match source {
                    "fluxes" => FieldValue::PerBoundary(vec![
                        ("wall-floor".to_string(), -12.5),
                        ("inlet".to_string(), 40.0),
                    ]),
                    _ => FieldValue::Scalar(295.0),
                })
            })
            .unwrap();
        assert_eq!(payload.get("room.Q_wall-floor"), Some(-12.5));
        assert_eq!(payload.get("room.Q_inlet"), Some(40.0));
        assert_eq!(payload.get("room.T"), Some(295.0));
        assert_eq!(payload.len(), 3);
    }
}
