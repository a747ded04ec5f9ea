//! Binding parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, ExchangeResult};

/// Direction of a binding set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    ModelToField,
    FieldToModel,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ModelToField => f.write_str("model->field"),
            Direction::FieldToModel => f.write_str("field->model"),
        }
    }
}

/// One unidirectional `(source, destination)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub source: String,
    pub destination: String,
}

impl Binding {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Ordered bindings for one direction. Immutable once parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    direction: Option<Direction>,
    bindings: Vec<Binding>,
}

impl BindingSet {
    /// Parse `"srcA dstA;srcB dstB;..."`.
    ///
    /// A blank string means no bindings. Otherwise every `;`-separated
    /// entry, including an empty one, must split into exactly two
    /// whitespace-separated tokens.
    pub fn parse(direction: Direction, spec: &str) -> ExchangeResult<Self> {
        let mut bindings = Vec::new();
        if spec.trim().is_empty() {
            return Ok(Self {
                direction: Some(direction),
                bindings,
            });
        }
        for (index, entry) in spec.split(';').enumerate() {
            let entry = entry.trim();
            let tokens: Vec<&str> = entry.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(ExchangeError::Parse {
                    direction,
                    index,
                    entry: entry.to_string(),
                    tokens: tokens.len(),
                });
            }
            bindings.push(Binding::new(tokens[0], tokens[1]));
        }
        Ok(Self {
            direction: Some(direction),
            bindings,
        })
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn first(&self) -> Option<&Binding> {
        self.bindings.first()
    }

    /// Destination names that appear more than once, in first-seen order.
    pub fn duplicate_destinations(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for b in &self.bindings {
            if !seen.insert(b.destination.as_str()) && !dups.contains(&b.destination.as_str()) {
                dups.push(b.destination.as_str());
            }
        }
        dups
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}
