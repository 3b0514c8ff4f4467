use crate::base::{MaterialStage, ParamSoil, ParamViscous};
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Defines the number of solver DOFs per node (ux, uy, pore pressure)
pub const NDF: usize = 3;

/// Defines the constraint handlers understood by the solver engine
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum ConstraintHandler {
    /// Penalty method with single-point and multi-point penalty values
    Penalty { alpha_sp: f64, alpha_mp: f64 },
}

/// Defines the nonlinear convergence tests understood by the solver engine
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum ConvergenceTest {
    /// Relative norm of the displacement increment
    RelativeNormDispIncr {
        /// Convergence tolerance
        tol: f64,

        /// Maximum number of iterations per step
        max_iter: usize,

        /// Per-iteration reporting flag (0 = silent)
        print_flag: usize,
    },
}

/// Defines the nonlinear solution algorithms understood by the solver engine
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum SolutionAlgorithm {
    Newton,
    NewtonLineSearch,
    ModifiedNewton,
    KrylovNewton,
    Broyden,
}

/// Defines the DOF numbering schemes understood by the solver engine
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum DofNumberer {
    /// Reverse Cuthill-McKee
    Rcm,

    /// Reverse Cuthill-McKee for partitioned models
    ParallelRcm,
}

/// Defines the linear system solvers understood by the solver engine
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum SystemSolver {
    /// Profile symmetric positive definite storage (serial)
    ProfileSpd,

    /// Distributed multifrontal solver (parallel)
    Mumps,
}

/// Defines the time integrators understood by the solver engine
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum Integrator {
    /// Newmark method with the given gamma and beta coefficients
    Newmark { gamma: f64, beta: f64 },
}

/// Defines the analysis types understood by the solver engine
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum AnalysisKind {
    Transient,
}

/// Defines the permeability axes addressable through element parameters
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum PermeabilityAxis {
    Vertical,
    Horizontal,
}

impl PermeabilityAxis {
    /// Returns the element parameter name understood by the solver engine
    pub fn parameter_name(&self) -> &'static str {
        match self {
            PermeabilityAxis::Vertical => "vPerm",
            PermeabilityAxis::Horizontal => "hPerm",
        }
    }
}

/// Defines the capability boundary to the external finite element solver
///
/// The model-assembly layer drives the solver exclusively through these calls;
/// it never defines the wire protocol behind them. All creation calls are
/// strict: creating a tag twice is an error, and the idempotency policy
/// (warn and skip) is enforced by the callers via the existence queries.
pub trait SolverEngine {
    /// Returns true if a node with the given tag exists in the solver
    fn has_node(&self, tag: usize) -> bool;

    /// Returns true if an element with the given tag exists in the solver
    fn has_element(&self, tag: usize) -> bool;

    /// Returns true if a material with the given tag exists in the solver
    fn has_material(&self, tag: usize) -> bool;

    /// Creates a node
    fn node(&mut self, tag: usize, x: f64, y: f64) -> Result<(), StrError>;

    /// Applies a fixed-DOF mask to a node
    fn fix(&mut self, tag: usize, mask: [u8; 3]) -> Result<(), StrError>;

    /// Ties the listed DOFs of two nodes
    fn equal_dof(&mut self, retained: usize, constrained: usize, dofs: &[usize]) -> Result<(), StrError>;

    /// Assigns a nodal mass
    fn mass(&mut self, tag: usize, mass: [f64; 3]) -> Result<(), StrError>;

    /// Applies a nodal load within the current load pattern
    fn load(&mut self, tag: usize, components: [f64; 3]) -> Result<(), StrError>;

    /// Instantiates a soil material
    fn soil_material(&mut self, tag: usize, param: &ParamSoil) -> Result<(), StrError>;

    /// Instantiates a uniaxial viscous material
    fn viscous_material(&mut self, tag: usize, param: &ParamViscous) -> Result<(), StrError>;

    /// Creates a four-node quadrilateral coupled solid-fluid element
    fn quad_up_element(
        &mut self,
        tag: usize,
        nodes: [usize; 4],
        thickness: f64,
        mat_tag: usize,
        bulk: f64,
        fluid_mass: f64,
        vperm: f64,
        hperm: f64,
        unit_weight_x: f64,
        unit_weight_y: f64,
    ) -> Result<(), StrError>;

    /// Creates a zero-length element acting along one direction
    fn zero_length_element(
        &mut self,
        tag: usize,
        node_a: usize,
        node_b: usize,
        mat_tag: usize,
        direction: usize,
    ) -> Result<(), StrError>;

    /// Registers an updatable element parameter for one permeability axis
    fn register_parameter(&mut self, param_tag: usize, element_tag: usize, axis: PermeabilityAxis)
        -> Result<(), StrError>;

    /// Updates a previously registered parameter
    fn update_parameter(&mut self, param_tag: usize, value: f64) -> Result<(), StrError>;

    /// Switches the behavior stage of one material
    fn update_material_stage(&mut self, mat_tag: usize, stage: MaterialStage) -> Result<(), StrError>;

    /// Creates a constant time series
    fn constant_time_series(&mut self, tag: usize) -> Result<(), StrError>;

    /// Creates a path time series read from a file with fixed time step and scale factor
    fn path_time_series(&mut self, tag: usize, path: &str, dt: f64, factor: f64) -> Result<(), StrError>;

    /// Creates a plain load pattern bound to a time series
    fn plain_pattern(&mut self, tag: usize, ts_tag: usize) -> Result<(), StrError>;

    /// Creates a uniform-excitation pattern driven by a velocity time series
    fn uniform_excitation(&mut self, tag: usize, direction: usize, ts_tag: usize) -> Result<(), StrError>;

    /// Sets the Rayleigh damping coefficients
    fn rayleigh(&mut self, a0: f64, a1: f64, a2: f64, a3: f64) -> Result<(), StrError>;

    /// Selects the constraint handler
    fn constraints(&mut self, handler: ConstraintHandler) -> Result<(), StrError>;

    /// Selects the convergence test
    fn test(&mut self, test: ConvergenceTest) -> Result<(), StrError>;

    /// Selects the nonlinear solution algorithm
    fn algorithm(&mut self, algorithm: SolutionAlgorithm) -> Result<(), StrError>;

    /// Selects the DOF numbering scheme
    fn numberer(&mut self, numberer: DofNumberer) -> Result<(), StrError>;

    /// Selects the linear system solver
    fn system(&mut self, system: SystemSolver) -> Result<(), StrError>;

    /// Selects the time integrator
    fn integrator(&mut self, integrator: Integrator) -> Result<(), StrError>;

    /// Selects the analysis type
    fn analysis(&mut self, kind: AnalysisKind) -> Result<(), StrError>;

    /// Enables the computation of reactions including dynamic contributions
    fn dynamic_reactions(&mut self, enabled: bool) -> Result<(), StrError>;

    /// Advances the analysis by the given number of steps of size dt
    fn analyze(&mut self, n_steps: usize, dt: f64) -> Result<(), StrError>;

    /// Returns the reaction at one DOF of a node
    fn node_reaction(&mut self, tag: usize, dof: usize) -> Result<f64, StrError>;

    /// Resets the simulation time
    fn set_time(&mut self, t: f64) -> Result<(), StrError>;

    /// Holds the currently applied loads constant and resets the pattern time
    fn load_const(&mut self, t: f64) -> Result<(), StrError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ConstraintHandler, ConvergenceTest, PermeabilityAxis, SolutionAlgorithm};

    #[test]
    fn parameter_name_works() {
        assert_eq!(PermeabilityAxis::Vertical.parameter_name(), "vPerm");
        assert_eq!(PermeabilityAxis::Horizontal.parameter_name(), "hPerm");
    }

    #[test]
    fn derive_works() {
        let handler = ConstraintHandler::Penalty {
            alpha_sp: 1e18,
            alpha_mp: 1e18,
        };
        assert_eq!(handler.clone(), handler);
        let test = ConvergenceTest::RelativeNormDispIncr {
            tol: 1e-4,
            max_iter: 35,
            print_flag: 1,
        };
        assert_eq!(test.clone(), test);
        assert_ne!(SolutionAlgorithm::Newton, SolutionAlgorithm::Broyden);
    }
}
