//! Content-based hashing for run IDs.

use cs_project::CoSimConfig;
use sha2::{Digest, Sha256};

pub fn compute_run_id(config: &CoSimConfig, driver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    hasher.update(driver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(t_end: f64) -> CoSimConfig {
        serde_yaml::from_str(&format!(
            "version: 1\nname: hash\nmodel: m.yaml\nsimulation: {{ t_end: {t_end}, dt: 1.0 }}\ncadence: {{ type: sim_time, every: 3.0 }}\nexchange: {{}}\n"
        ))
        .unwrap()
    }

    #[test]
    fn hash_stability() {
        let a = compute_run_id(&config(10.0), "v1");
        let b = compute_run_id(&config(10.0), "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        assert_ne!(
            compute_run_id(&config(10.0), "v1"),
            compute_run_id(&config(20.0), "v1")
        );
        assert_ne!(
            compute_run_id(&config(10.0), "v1"),
            compute_run_id(&config(10.0), "v2")
        );
    }
}
