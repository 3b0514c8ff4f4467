/// Defines an auxiliary directory where the test files are saved
pub const DEFAULT_TEST_DIR: &str = "/tmp/srsim/test";

/// Defines the gravity acceleration in m/s²
pub const GRAVITY_ACCELERATION: f64 = 9.81;

/// Defines the mass density of the elastic half-space below the site in ton/m³
///
/// Used by the absorbing (Lysmer-Kuhlemeyer) boundary; a physical constant of
/// the underlying foundation, not read from the mesh.
pub const HALF_SPACE_DENSITY: f64 = 2.0;

/// Defines the shear-wave velocity of the elastic half-space in m/s
pub const HALF_SPACE_SHEAR_VELOCITY: f64 = 875.0;

/// Defines the uniform permeability applied during gravity analysis
///
/// An artificially large value so that hydrostatic equilibrium is reached
/// quickly; the true (native) permeabilities replace it before dynamic loading.
pub const HIGH_PERMEABILITY: f64 = 1.0;
