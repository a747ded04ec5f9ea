//! Initial-value settings applied before model initialization.

/// Ordered `(name, value)` pairs. Setting an existing name replaces its
/// value in place, so the original order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialSettings {
    entries: Vec<(String, f64)>,
}

impl InitialSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) -> &mut Self {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    /// `<room>.T` in kelvin.
    pub fn room_temperature(&mut self, room: &str, kelvin: f64) -> &mut Self {
        self.set(&format!("{room}.T"), kelvin)
    }

    /// Closed-door leakage parameters.
    pub fn door(
        &mut self,
        door: &str,
        leakage: f64,
        discharge_coefficient: f64,
        flow_exponent: f64,
    ) -> &mut Self {
        self.set(&format!("{door}.LClo"), leakage);
        self.set(&format!("{door}.CDClo"), discharge_coefficient);
        self.set(&format!("{door}.mClo"), flow_exponent)
    }

    /// Equivalent opening area of an air cleaner: `A = 20·(1.2/a)^(1/b)`.
    pub fn air_cleaner(&mut self, cleaner: &str, a: f64, b: f64) -> &mut Self {
        self.set(&format!("{cleaner}.A"), air_cleaner_area(a, b))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn air_cleaner_area(a: f64, b: f64) -> f64 {
    20.0 * (1.2 / a).powf(1.0 / b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_position() {
        let mut s = InitialSettings::new();
        s.set("a", 1.0).set("b", 2.0).set("a", 3.0);
        assert_eq!(s.names(), vec!["a", "b"]);
        assert_eq!(s.values(), vec![3.0, 2.0]);
    }

    #[test]
    fn room_and_door_names() {
        let mut s = InitialSettings::new();
        s.room_temperature("room1", 295.15);
        s.door("door12", 0.01, 0.65, 0.5);
        assert_eq!(s.get("room1.T"), Some(295.15));
        assert_eq!(s.get("door12.LClo"), Some(0.01));
        assert_eq!(s.get("door12.CDClo"), Some(0.65));
        assert_eq!(s.get("door12.mClo"), Some(0.5));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn air_cleaner_area_formula() {
        let mut s = InitialSettings::new();
        s.air_cleaner("cleaner", 1.2, 2.0);
        assert_eq!(s.get("cleaner.A"), Some(20.0));
        s.air_cleaner("cleaner", 0.3, 2.0);
        // (1.2 / 0.3)^(1/2) = 2
        assert!((s.get("cleaner.A").unwrap() - 40.0).abs() < 1e-12);
        assert_eq!(s.len(), 1);
    }
}
