//! SI quantities used for supply-air conversions.

use uom::si::area::square_meter;
use uom::si::f64::{Area, MassDensity, MassRate, Pressure, Velocity};
use uom::si::mass_density::kilogram_per_cubic_meter;
use uom::si::velocity::meter_per_second;

pub type Density = MassDensity;

pub fn m2(v: f64) -> Area {
    Area::new::<square_meter>(v)
}

pub fn kgpm3(v: f64) -> Density {
    Density::new::<kilogram_per_cubic_meter>(v)
}

pub fn mps(v: f64) -> Velocity {
    Velocity::new::<meter_per_second>(v)
}

/// Mass flow through an opening of area `area` at face velocity `v`.
pub fn volumetric_mass_flow(rho: Density, v: Velocity, area: Area) -> MassRate {
    rho * v * area
}

/// Dynamic pressure `0.5·ρ·v²`.
pub fn dynamic_pressure(rho: Density, v: Velocity) -> Pressure {
    0.5 * rho * v * v
}

pub mod constants {
    /// Density of air used for supply-flow conversions (kg/m³).
    pub const RHO_AIR_KG_M3: f64 = 1.2;
    /// Specific heat of air at constant pressure (J/(kg·K)).
    pub const CP_AIR_J_KG_K: f64 = 1006.0;
    /// Gravity along the solver's y axis (m/s²).
    pub const G0_MPS2: f64 = 9.8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::mass_rate::kilogram_per_second;
    use uom::si::pressure::pascal;

    #[test]
    fn supply_mass_flow() {
        let mdot = volumetric_mass_flow(kgpm3(1.2), mps(2.0), m2(0.1));
        assert!((mdot.get::<kilogram_per_second>() - 0.24).abs() < 1e-12);
    }

    #[test]
    fn dynamic_pressure_of_supply_jet() {
        let p = dynamic_pressure(kgpm3(1.2), mps(2.0));
        assert!((p.get::<pascal>() - 2.4).abs() < 1e-12);
    }
}
