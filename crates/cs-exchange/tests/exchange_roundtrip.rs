//! Model -> field -> model through an identity mapping reproduces the sources.

use std::collections::HashMap;

use cs_exchange::{FieldValue, VariableExchangeMap};

#[test]
fn identity_round_trip_reproduces_sources() {
    let model: HashMap<String, f64> = HashMap::from([
        ("supply.v".to_string(), 0.75),
        ("supply.T".to_string(), 291.15),
        ("exhaust.m".to_string(), -0.09),
    ]);

    let outbound =
        VariableExchangeMap::configure("supply.v inlet.v;supply.T inlet.T;exhaust.m outlet.m", "")
            .unwrap();
    let payload = outbound
        .resolve_model_to_field(|name| model.get(name).copied().ok_or(()))
        .unwrap();

    // The field side stores what it was given.
    let field: HashMap<String, f64> = payload.iter().map(|(k, v)| (k.to_string(), v)).collect();

    let inbound =
        VariableExchangeMap::configure("", "inlet.v supply.v;inlet.T supply.T;outlet.m exhaust.m")
            .unwrap();
    let back = inbound
        .resolve_field_to_model(|name| field.get(name).map(|v| FieldValue::Scalar(*v)).ok_or(()))
        .unwrap();

    for (name, value) in &model {
        assert_eq!(back.get(name), Some(*value), "{name} changed in round trip");
    }
}
