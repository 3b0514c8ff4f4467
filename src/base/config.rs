use crate::StrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds configuration data for the site-model assembly
///
/// The water level decides the surface/undrained classification of the fixed
/// nodes at construction time. The thickness coefficients control the
/// intentional thickening of the boundary element columns, which suppresses
/// spurious reflections at the lateral edges of the finite mesh.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Water level (y coordinate); nodes at or above it are undrained
    pub water_level: f64,

    /// Thicken the boundary element columns
    pub thicker_boundary: bool,

    /// Base thickness multiplier applied to every element
    pub base_thickness_coef: f64,

    /// Extra thickness multiplier for boundary elements
    pub boundary_thickness_coef: f64,

    /// Use the artificially large uniform permeability during gravity analysis
    pub high_permeability: bool,
}

impl ModelConfig {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        ModelConfig {
            water_level: 0.0,
            thicker_boundary: true,
            base_thickness_coef: 1.0,
            boundary_thickness_coef: 1e4,
            high_permeability: true,
        }
    }

    /// Sets the water level
    pub fn set_water_level(&mut self, value: f64) -> Result<&mut Self, StrError> {
        self.water_level = value;
        Ok(self)
    }

    /// Enables or disables the thickening of boundary element columns
    pub fn set_thicker_boundary(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.thicker_boundary = flag;
        Ok(self)
    }

    /// Sets the base thickness multiplier
    pub fn set_base_thickness_coef(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 {
            return Err("base thickness coefficient must be > 0.0");
        }
        self.base_thickness_coef = value;
        Ok(self)
    }

    /// Sets the extra thickness multiplier for boundary elements
    pub fn set_boundary_thickness_coef(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 1.0 {
            return Err("boundary thickness coefficient must be ≥ 1.0");
        }
        self.boundary_thickness_coef = value;
        Ok(self)
    }

    /// Enables or disables the high-permeability gravity stage
    pub fn set_high_permeability(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.high_permeability = flag;
        Ok(self)
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model configuration\n").unwrap();
        write!(f, "===================\n").unwrap();
        write!(f, "water_level = {:?}\n", self.water_level).unwrap();
        write!(f, "thicker_boundary = {:?}\n", self.thicker_boundary).unwrap();
        write!(f, "base_thickness_coef = {:?}\n", self.base_thickness_coef).unwrap();
        write!(f, "boundary_thickness_coef = {:?}\n", self.boundary_thickness_coef).unwrap();
        write!(f, "high_permeability = {:?}\n", self.high_permeability).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ModelConfig;

    #[test]
    fn new_and_setters_work() {
        let mut config = ModelConfig::new();
        assert_eq!(config.water_level, 0.0);
        assert!(config.thicker_boundary);
        assert!(config.high_permeability);
        config
            .set_water_level(-6.0)
            .unwrap()
            .set_thicker_boundary(false)
            .unwrap()
            .set_base_thickness_coef(100.0)
            .unwrap()
            .set_boundary_thickness_coef(100.0)
            .unwrap()
            .set_high_permeability(false)
            .unwrap();
        assert_eq!(config.water_level, -6.0);
        assert!(!config.thicker_boundary);
        assert_eq!(config.base_thickness_coef, 100.0);
        assert_eq!(config.boundary_thickness_coef, 100.0);
        assert!(!config.high_permeability);
    }

    #[test]
    fn setters_handle_errors() {
        let mut config = ModelConfig::new();
        assert_eq!(
            config.set_base_thickness_coef(0.0).err(),
            Some("base thickness coefficient must be > 0.0")
        );
        assert_eq!(
            config.set_boundary_thickness_coef(0.5).err(),
            Some("boundary thickness coefficient must be ≥ 1.0")
        );
    }

    #[test]
    fn display_works() {
        let config = ModelConfig::new();
        assert_eq!(
            format!("{}", config),
            "Model configuration\n\
             ===================\n\
             water_level = 0.0\n\
             thicker_boundary = true\n\
             base_thickness_coef = 1.0\n\
             boundary_thickness_coef = 10000.0\n\
             high_permeability = true\n"
        );
    }
}
