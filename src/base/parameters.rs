use crate::base::GRAVITY_ACCELERATION;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds parameters for the soil constitutive models (multi-yield-surface plasticity)
///
/// Each variant corresponds to one instantiation routine of the solver engine.
/// The parameter sets are fixed; see the engine documentation for the meaning
/// of the coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum ParamSoil {
    /// Pressure-independent multi-yield-surface model (clays and silts)
    PressureIndependMultiYield {
        /// Saturated soil mass density in ton/m³
        rho: f64,

        /// Reference shear modulus in kPa
        shear_modulus: f64,

        /// Reference bulk modulus in kPa
        bulk_modulus: f64,

        /// Apparent cohesion in kPa
        cohesion: f64,

        /// Octahedral shear strain at peak shear strength
        peak_shear_strain: f64,

        /// Friction angle in degrees
        friction_angle: f64,

        /// Reference mean effective confining pressure in kPa
        ref_press: f64,

        /// Pressure dependence coefficient for the moduli
        press_depend_coef: f64,

        /// Number of yield surfaces (must be smaller than 40)
        n_yield_surf: usize,
    },

    /// Pressure-dependent multi-yield-surface model (sands and gravels)
    PressureDependMultiYield {
        /// Saturated soil mass density in ton/m³
        rho: f64,

        /// Reference shear modulus in kPa
        shear_modulus: f64,

        /// Reference bulk modulus in kPa
        bulk_modulus: f64,

        /// Friction angle in degrees
        friction_angle: f64,

        /// Octahedral shear strain at peak shear strength
        peak_shear_strain: f64,

        /// Reference mean effective confining pressure in kPa
        ref_press: f64,

        /// Pressure dependence coefficient for the moduli
        press_depend_coef: f64,

        /// Phase transformation angle in degrees
        pt_angle: f64,

        /// Contraction coefficient
        contrac: f64,

        /// First dilation coefficient
        dilat1: f64,

        /// Second dilation coefficient
        dilat2: f64,

        /// Liquefaction coefficient: effective-confinement threshold in kPa
        liq1: f64,

        /// Liquefaction coefficient: accumulated plastic shear strain
        liq2: f64,

        /// Liquefaction coefficient: accumulated plastic shear strain
        liq3: f64,

        /// Number of yield surfaces (must be smaller than 40)
        n_yield_surf: usize,

        /// Initial void ratio
        void_ratio: f64,

        /// Critical-state parameter
        cs1: f64,

        /// Critical-state parameter
        cs2: f64,

        /// Critical-state parameter
        cs3: f64,

        /// Atmospheric pressure in kPa
        p_atm: f64,
    },

    /// Pressure-dependent variant with the Kσ effect and dilation history
    PressureDependMultiYield02 {
        /// Saturated soil mass density in ton/m³
        rho: f64,

        /// Reference shear modulus in kPa
        shear_modulus: f64,

        /// Reference bulk modulus in kPa
        bulk_modulus: f64,

        /// Friction angle in degrees
        friction_angle: f64,

        /// Octahedral shear strain at peak shear strength
        peak_shear_strain: f64,

        /// Reference mean effective confining pressure in kPa
        ref_press: f64,

        /// Pressure dependence coefficient for the moduli
        press_depend_coef: f64,

        /// Phase transformation angle in degrees
        pt_angle: f64,

        /// Contraction coefficient
        contrac1: f64,

        /// Contraction coefficient for dilation history
        contrac2: f64,

        /// Contraction coefficient for the Kσ effect
        contrac3: f64,

        /// Dilation coefficient
        dilat1: f64,

        /// Dilation coefficient for dilation history
        dilat2: f64,

        /// Dilation coefficient for the Kσ effect
        dilat3: f64,

        /// Liquefaction coefficient (redefined with respect to the base model)
        liq1: f64,

        /// Liquefaction coefficient (redefined with respect to the base model)
        liq2: f64,

        /// Number of yield surfaces (must be smaller than 40)
        n_yield_surf: usize,

        /// Initial void ratio
        void_ratio: f64,

        /// Critical-state parameter
        cs1: f64,

        /// Critical-state parameter
        cs2: f64,

        /// Critical-state parameter
        cs3: f64,

        /// Atmospheric pressure in kPa
        p_atm: f64,
    },

    /// Third pressure-dependent variant; selecting it fails loudly
    PressureDependMultiYield03,
}

impl ParamSoil {
    /// Returns the constitutive-model name understood by the solver engine
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamSoil::PressureIndependMultiYield { .. } => "PressureIndependMultiYield",
            ParamSoil::PressureDependMultiYield { .. } => "PressureDependMultiYield",
            ParamSoil::PressureDependMultiYield02 { .. } => "PressureDependMultiYield02",
            ParamSoil::PressureDependMultiYield03 => "PressureDependMultiYield03",
        }
    }

    /// Returns the ordered instantiation arguments for a 2D analysis
    ///
    /// The argument order matches the solver engine convention. The
    /// unimplemented third pressure-dependent variant returns an error here,
    /// so that selecting it can never silently no-op.
    #[rustfmt::skip]
    pub fn instantiation_args(&self) -> Result<Vec<f64>, StrError> {
        const ND: f64 = 2.0;
        match self {
            ParamSoil::PressureIndependMultiYield {
                rho, shear_modulus, bulk_modulus, cohesion, peak_shear_strain,
                friction_angle, ref_press, press_depend_coef, n_yield_surf,
            } => Ok(vec![
                ND, *rho, *shear_modulus, *bulk_modulus, *cohesion, *peak_shear_strain,
                *friction_angle, *ref_press, *press_depend_coef, *n_yield_surf as f64,
            ]),
            ParamSoil::PressureDependMultiYield {
                rho, shear_modulus, bulk_modulus, friction_angle, peak_shear_strain,
                ref_press, press_depend_coef, pt_angle, contrac, dilat1, dilat2,
                liq1, liq2, liq3, n_yield_surf, void_ratio, cs1, cs2, cs3, p_atm,
            } => Ok(vec![
                ND, *rho, *shear_modulus, *bulk_modulus, *friction_angle, *peak_shear_strain,
                *ref_press, *press_depend_coef, *pt_angle, *contrac, *dilat1, *dilat2,
                *liq1, *liq2, *liq3, *n_yield_surf as f64, *void_ratio, *cs1, *cs2, *cs3, *p_atm,
            ]),
            ParamSoil::PressureDependMultiYield02 {
                rho, shear_modulus, bulk_modulus, friction_angle, peak_shear_strain,
                ref_press, press_depend_coef, pt_angle, contrac1, contrac2, contrac3,
                dilat1, dilat2, dilat3, liq1, liq2, n_yield_surf, void_ratio,
                cs1, cs2, cs3, p_atm,
            } => Ok(vec![
                ND, *rho, *shear_modulus, *bulk_modulus, *friction_angle, *peak_shear_strain,
                *ref_press, *press_depend_coef, *pt_angle, *contrac1, *contrac3,
                *dilat1, *dilat3, *n_yield_surf as f64, *contrac2, *dilat2,
                *liq1, *liq2, *void_ratio, *cs1, *cs2, *cs3, *p_atm,
            ]),
            ParamSoil::PressureDependMultiYield03 => {
                Err("PressureDependMultiYield03 is not available")
            }
        }
    }

    /// Returns a sample pressure-independent record (silt)
    pub fn sample_silt() -> Self {
        ParamSoil::PressureIndependMultiYield {
            rho: 1.68,
            shear_modulus: 14046.9,
            bulk_modulus: 42140.7,
            cohesion: 35.9,
            peak_shear_strain: 0.1,
            friction_angle: 0.0,
            ref_press: 100.0,
            press_depend_coef: 0.0,
            n_yield_surf: 30,
        }
    }

    /// Returns a sample pressure-independent record (loose sand)
    pub fn sample_loose_sand() -> Self {
        ParamSoil::PressureIndependMultiYield {
            rho: 1.68,
            shear_modulus: 39020.0,
            bulk_modulus: 117060.0,
            cohesion: 183.8,
            peak_shear_strain: 0.1,
            friction_angle: 0.0,
            ref_press: 100.0,
            press_depend_coef: 0.0,
            n_yield_surf: 30,
        }
    }

    /// Returns a sample Kσ-effect record (dense sandy gravel)
    pub fn sample_sandy_gravel() -> Self {
        ParamSoil::PressureDependMultiYield02 {
            rho: 2.24,
            shear_modulus: 42735.4,
            bulk_modulus: 128206.2,
            friction_angle: 40.0,
            peak_shear_strain: 0.1,
            ref_press: 100.0,
            press_depend_coef: 0.5,
            pt_angle: 26.0,
            contrac1: 0.013,
            contrac2: 5.0,
            contrac3: 0.0,
            dilat1: 0.3,
            dilat2: 3.0,
            dilat3: 0.0,
            liq1: 1.0,
            liq2: 0.0,
            n_yield_surf: 30,
            void_ratio: 0.49,
            cs1: 0.9,
            cs2: 0.02,
            cs3: 0.7,
            p_atm: 101.0,
        }
    }
}

/// Holds the per-material element properties
///
/// Kept apart from [ParamSoil] because these values vary by analysis stage;
/// the permeabilities in particular are overridden under high-permeability
/// mode during gravity analysis.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParamElement {
    /// Element thickness
    pub thickness: f64,

    /// Combined undrained bulk modulus of the fluid phase in kPa
    pub bulk: f64,

    /// Fluid mass density
    pub fluid_mass: f64,

    /// Vertical (native) permeability
    pub vperm: f64,

    /// Horizontal (native) permeability
    pub hperm: f64,

    /// Horizontal body force per unit mass
    pub unit_weight_x: f64,

    /// Vertical body force per unit mass
    pub unit_weight_y: f64,
}

impl ParamElement {
    /// Allocates a new instance with equal native permeabilities and default body forces
    pub fn new(bulk: f64, perm: f64) -> Self {
        ParamElement {
            thickness: 1.0,
            bulk,
            fluid_mass: 1.0,
            vperm: perm,
            hperm: perm,
            unit_weight_x: 0.0,
            unit_weight_y: -GRAVITY_ACCELERATION,
        }
    }
}

/// Holds parameters for the uniaxial viscous (dashpot) material
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParamViscous {
    /// Damping coefficient (force per unit velocity)
    pub c: f64,

    /// Power factor of the force-velocity relation
    pub alpha: f64,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ParamElement, ParamSoil, ParamViscous};

    #[test]
    fn kind_name_works() {
        assert_eq!(ParamSoil::sample_silt().kind_name(), "PressureIndependMultiYield");
        assert_eq!(
            ParamSoil::sample_sandy_gravel().kind_name(),
            "PressureDependMultiYield02"
        );
        assert_eq!(
            ParamSoil::PressureDependMultiYield03.kind_name(),
            "PressureDependMultiYield03"
        );
    }

    #[test]
    fn instantiation_args_works() {
        let args = ParamSoil::sample_silt().instantiation_args().unwrap();
        assert_eq!(args.len(), 10);
        assert_eq!(args[0], 2.0); // 2D
        assert_eq!(args[1], 1.68); // rho
        assert_eq!(args[9], 30.0); // number of yield surfaces

        let args = ParamSoil::sample_sandy_gravel().instantiation_args().unwrap();
        assert_eq!(args.len(), 23);
        assert_eq!(args[4], 40.0); // friction angle
        assert_eq!(args[13], 30.0); // number of yield surfaces
        assert_eq!(args[22], 101.0); // atmospheric pressure
    }

    #[test]
    fn unimplemented_variant_fails_loudly() {
        assert_eq!(
            ParamSoil::PressureDependMultiYield03.instantiation_args().err(),
            Some("PressureDependMultiYield03 is not available")
        );
    }

    #[test]
    fn param_element_new_works() {
        let p = ParamElement::new(6.7e6, 1.0e-3);
        assert_eq!(p.thickness, 1.0);
        assert_eq!(p.bulk, 6.7e6);
        assert_eq!(p.fluid_mass, 1.0);
        assert_eq!(p.vperm, 1.0e-3);
        assert_eq!(p.hperm, 1.0e-3);
        assert_eq!(p.unit_weight_x, 0.0);
        assert_eq!(p.unit_weight_y, -9.81);
    }

    #[test]
    fn param_viscous_clone_works() {
        let p = ParamViscous { c: 1750.0, alpha: 1.0 };
        let q = p.clone();
        assert_eq!(p, q);
    }
}
