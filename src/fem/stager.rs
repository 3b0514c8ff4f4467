use crate::base::{MaterialStage, PermeabilityStage};
use crate::fem::{
    AnalysisKind, ConstraintHandler, ConvergenceTest, DofNumberer, Integrator, SolutionAlgorithm, SolverEngine,
    SystemSolver,
};
use crate::model::SiteModel;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Defines the tag of the velocity path time series driving the dynamic phase
pub const VELOCITY_SERIES_TAG: usize = 100;

/// Defines the tag of the uniform-excitation pattern of the dynamic phase
pub const EXCITATION_PATTERN_TAG: usize = 400;

const GRAVITY_PENALTY: f64 = 1e18;
const DYNAMIC_PENALTY: f64 = 1e20;
const CONVERGENCE_TOL: f64 = 1e-4;
const GRAVITY_ELASTIC_MAX_ITER: usize = 35;
const GRAVITY_PLASTIC_MAX_ITER: usize = 50;
const DAMPING_RATIO: f64 = 0.2;
const DAMPING_FREQ_LO: f64 = 0.2;
const DAMPING_FREQ_HI: f64 = 20.0;

/// Defines the phases of the staged analysis
///
/// Transitions are strictly forward; there is no rollback.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Phase {
    /// The model has been assembled; no solve has run yet
    Built,

    /// The elastic gravity pass has completed
    GravityElastic,

    /// The plastic gravity pass has completed
    GravityPlastic,

    /// The native permeabilities have been switched in
    PermeabilityNative,

    /// The solver has been reconfigured for transient analysis
    DynamicReady,

    /// Dynamic stepping is in progress
    DynamicStepping,

    /// The dynamic phase has completed
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Holds the velocity time-history input of the dynamic phase
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct VelocityRecord {
    /// Path to the velocity history file
    pub path: String,

    /// Fixed time step of the record
    pub dt: f64,
}

impl VelocityRecord {
    /// Allocates a new instance, requiring the file to exist
    pub fn new(path: &str, dt: f64) -> Result<Self, StrError> {
        if dt <= 0.0 {
            return Err("velocity record time step must be > 0.0");
        }
        if !Path::new(path).exists() {
            log::error!("velocity time-history file {:?} not found", path);
            return Err("velocity time-history file not found");
        }
        Ok(VelocityRecord {
            path: path.to_string(),
            dt,
        })
    }
}

/// Defines the per-step solve collaborator of the dynamic phase
///
/// The adaptive retry logic (alternate algorithms attempted in a fixed
/// fallback order) lives behind this trait; the stager only consumes
/// "advance one step, report success or failure".
pub trait StepRunner {
    /// Advances the transient analysis by one step of size dt
    fn advance(&mut self, engine: &mut dyn SolverEngine, dt: f64) -> Result<(), StrError>;
}

/// Implements the simplest step runner: one Newton attempt per step
pub struct SingleStepRunner;

impl StepRunner for SingleStepRunner {
    fn advance(&mut self, engine: &mut dyn SolverEngine, dt: f64) -> Result<(), StrError> {
        engine.analyze(1, dt)
    }
}

/// Drives the phase sequence of the staged analysis
///
/// `Built → GravityElastic → GravityPlastic → PermeabilityNative →
/// DynamicReady → DynamicStepping → Done`. Requests out of order are errors;
/// a fatal solve failure aborts the run with no recovery at this layer.
pub struct AnalysisStager<'a> {
    model: &'a SiteModel,
    phase: Phase,
}

impl<'a> AnalysisStager<'a> {
    /// Allocates a new instance in the Built phase
    pub fn new(model: &'a SiteModel) -> Self {
        AnalysisStager {
            model,
            phase: Phase::Built,
        }
    }

    /// Returns the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn expect(&self, expected: Phase) -> Result<(), StrError> {
        if self.phase != expected {
            log::error!("current phase is {} but {} is required", self.phase, expected);
            return Err("phase transition is out of order");
        }
        Ok(())
    }

    /// Applies the solver configuration shared by both gravity passes
    ///
    /// Large time steps appropriate for settling, not for wave propagation.
    fn configure_gravity(&self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        engine.constraints(ConstraintHandler::Penalty {
            alpha_sp: GRAVITY_PENALTY,
            alpha_mp: GRAVITY_PENALTY,
        })?;
        engine.test(ConvergenceTest::RelativeNormDispIncr {
            tol: CONVERGENCE_TOL,
            max_iter: GRAVITY_ELASTIC_MAX_ITER,
            print_flag: 1,
        })?;
        engine.algorithm(SolutionAlgorithm::Newton)?;
        engine.integrator(Integrator::Newmark { gamma: 0.5, beta: 0.25 })?;
        self.configure_numbering(engine)?;
        engine.analysis(AnalysisKind::Transient)?;
        engine.dynamic_reactions(true)?;
        Ok(())
    }

    fn configure_numbering(&self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        if self.model.ctx().is_parallel() {
            engine.numberer(DofNumberer::ParallelRcm)?;
            engine.system(SystemSolver::Mumps)?;
        } else {
            engine.numberer(DofNumberer::Rcm)?;
            engine.system(SystemSolver::ProfileSpd)?;
        }
        Ok(())
    }

    /// Runs the elastic gravity pass
    ///
    /// The materials start in their elastic stage to avoid convergence failure
    /// from initializing a nonlinear material far from its yield surface.
    pub fn run_gravity_elastic(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        self.expect(Phase::Built)?;
        self.configure_gravity(engine)?;
        self.model.update_material_stage(engine, MaterialStage::Elastic)?;
        engine.analyze(10, 5.0e2)?;
        engine.analyze(10, 5.0e3)?;

        // reaction forces of the surface fixes, for diagnostics only
        if !self.model.ctx().is_parallel() {
            for fixed in &self.model.store.fixed_surface {
                let reaction = engine.node_reaction(fixed.tag, 2)?;
                log::debug!("node {} reaction Fy = {:?}", fixed.tag, reaction);
            }
        }
        log::info!("finished the elastic gravity analysis");
        self.phase = Phase::GravityElastic;
        Ok(())
    }

    /// Runs the plastic gravity pass (the materials switch to their true behavior)
    pub fn run_gravity_plastic(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        self.expect(Phase::GravityElastic)?;
        self.model.update_material_stage(engine, MaterialStage::Plastic)?;
        engine.test(ConvergenceTest::RelativeNormDispIncr {
            tol: CONVERGENCE_TOL,
            max_iter: GRAVITY_PLASTIC_MAX_ITER,
            print_flag: 1,
        })?;
        engine.analyze(10, 5.0e-3)?;
        log::info!("finished the plastic gravity analysis");
        self.phase = Phase::GravityPlastic;
        Ok(())
    }

    /// Switches the native permeabilities in (a pure parameter-update pass, no solve)
    pub fn switch_permeability(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        self.expect(Phase::GravityPlastic)?;
        self.model.update_permeability(engine, PermeabilityStage::Native)?;
        self.phase = Phase::PermeabilityNative;
        Ok(())
    }

    /// Reconfigures the solver for the transient phase
    ///
    /// The simulation time is reset and the gravity loads are held constant:
    /// they represent the gravitational body force, which must not be doubled
    /// by the dynamic phase.
    pub fn prepare_dynamic(&mut self, engine: &mut dyn SolverEngine, record: &VelocityRecord) -> Result<(), StrError> {
        self.expect(Phase::PermeabilityNative)?;
        let dashpot = self
            .model
            .dashpot
            .as_ref()
            .ok_or("the dynamic phase requires the absorbing boundary")?;

        engine.set_time(0.0)?;
        engine.load_const(0.0)?;

        // the velocity history scales with the dashpot force-equivalence factor
        let factor = dashpot.coefficient * dashpot.area;
        engine.path_time_series(VELOCITY_SERIES_TAG, &record.path, record.dt, factor)?;
        engine.uniform_excitation(EXCITATION_PATTERN_TAG, 1, VELOCITY_SERIES_TAG)?;

        let w1 = 2.0 * std::f64::consts::PI * DAMPING_FREQ_LO;
        let w2 = 2.0 * std::f64::consts::PI * DAMPING_FREQ_HI;
        let a0 = 2.0 * DAMPING_RATIO * w1 * w2 / (w1 + w2);
        let a1 = 2.0 * DAMPING_RATIO / (w1 + w2);
        engine.rayleigh(a0, a1, 0.0, 0.0)?;

        engine.constraints(ConstraintHandler::Penalty {
            alpha_sp: DYNAMIC_PENALTY,
            alpha_mp: DYNAMIC_PENALTY,
        })?;
        engine.test(ConvergenceTest::RelativeNormDispIncr {
            tol: CONVERGENCE_TOL,
            max_iter: GRAVITY_ELASTIC_MAX_ITER,
            print_flag: 0,
        })?;
        engine.algorithm(SolutionAlgorithm::Newton)?;
        self.configure_numbering(engine)?;
        engine.integrator(Integrator::Newmark { gamma: 0.5, beta: 0.25 })?;
        engine.analysis(AnalysisKind::Transient)?;

        log::info!("solver reconfigured for the dynamic phase");
        self.phase = Phase::DynamicReady;
        Ok(())
    }

    /// Advances the dynamic analysis in fixed-size steps
    ///
    /// Each step is delegated to the runner; a step failure (the runner
    /// exhausting its fallback strategies) aborts the run.
    pub fn run_dynamic(
        &mut self,
        engine: &mut dyn SolverEngine,
        runner: &mut dyn StepRunner,
        n_steps: usize,
        dt: f64,
    ) -> Result<(), StrError> {
        self.expect(Phase::DynamicReady)?;
        if dt <= 0.0 {
            return Err("dynamic time step must be > 0.0");
        }
        self.phase = Phase::DynamicStepping;
        for step in 0..n_steps {
            if let Err(message) = runner.advance(engine, dt) {
                log::error!("dynamic step {} of {} failed: {}", step + 1, n_steps, message);
                return Err("dynamic analysis aborted on a step failure");
            }
        }
        log::info!("finished the dynamic analysis ({} steps)", n_steps);
        self.phase = Phase::Done;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{AnalysisStager, Phase, SingleStepRunner, VelocityRecord};
    use crate::base::{ModelConfig, SampleSite, DEFAULT_TEST_DIR};
    use crate::fem::JournalEngine;
    use crate::model::{PartitionContext, SiteModel};
    use std::fs;
    use std::path::Path;

    fn built_model(engine: &mut JournalEngine) -> SiteModel {
        let store = SampleSite::two_layer_store(7.5);
        let catalog = SampleSite::two_layer_catalog();
        let config = ModelConfig::new();
        let mut model = SiteModel::new(store, catalog, config, PartitionContext::serial()).unwrap();
        model.build(engine).unwrap();
        model
    }

    fn velocity_record() -> VelocityRecord {
        fs::create_dir_all(DEFAULT_TEST_DIR).unwrap();
        let path = Path::new(DEFAULT_TEST_DIR).join("velocityHistory.txt");
        fs::write(&path, "0.0\n0.1\n0.0\n").unwrap();
        VelocityRecord::new(path.to_str().unwrap(), 0.005).unwrap()
    }

    #[test]
    fn velocity_record_handles_errors() {
        assert_eq!(
            VelocityRecord::new("/no/such/velocityHistory.txt", 0.005).err(),
            Some("velocity time-history file not found")
        );
        assert_eq!(
            VelocityRecord::new("/no/such/velocityHistory.txt", 0.0).err(),
            Some("velocity record time step must be > 0.0")
        );
    }

    #[test]
    fn phases_advance_in_order() {
        let mut engine = JournalEngine::new();
        let model = built_model(&mut engine);
        let record = velocity_record();
        let mut stager = AnalysisStager::new(&model);
        assert_eq!(stager.phase(), Phase::Built);

        stager.run_gravity_elastic(&mut engine).unwrap();
        assert_eq!(stager.phase(), Phase::GravityElastic);
        // gravity solver configuration and the two settling runs
        assert_eq!(
            engine.commands_matching("constraints"),
            ["constraints Penalty 1e18 1e18"]
        );
        assert_eq!(engine.commands_matching("analyze"), ["analyze 10 500.0", "analyze 10 5000.0"]);
        // the stage switch covers the three catalog soils, not the viscous material
        assert_eq!(engine.commands_matching("updateMaterialStage").len(), 3);
        assert!(engine
            .commands
            .contains(&"updateMaterialStage -material 1 -stage 0".to_string()));

        stager.run_gravity_plastic(&mut engine).unwrap();
        assert_eq!(stager.phase(), Phase::GravityPlastic);
        assert!(engine.commands.contains(&"test RelativeNormDispIncr 0.0001 50 1".to_string()));
        assert!(engine.commands.contains(&"analyze 10 0.005".to_string()));
        assert_eq!(engine.commands_matching("updateMaterialStage").len(), 6);

        stager.switch_permeability(&mut engine).unwrap();
        assert_eq!(stager.phase(), Phase::PermeabilityNative);
        // two handles per quad element, no solve in between
        assert_eq!(engine.commands_matching("updateParameter").len(), 16);
        assert_eq!(engine.commands_matching("analyze").len(), 3);

        stager.prepare_dynamic(&mut engine, &record).unwrap();
        assert_eq!(stager.phase(), Phase::DynamicReady);
        assert!(engine.commands.contains(&"setTime 0.0".to_string()));
        assert!(engine.commands.contains(&"loadConst -time 0.0".to_string()));
        assert_eq!(engine.commands_matching("pattern UniformExcitation"), [
            "pattern UniformExcitation 400 1 -vel 100"
        ]);
        assert_eq!(engine.commands_matching("rayleigh").len(), 1);
        assert!(engine.commands.contains(&"constraints Penalty 1e20 1e20".to_string()));
        assert!(engine.commands.contains(&"test RelativeNormDispIncr 0.0001 35 0".to_string()));

        let mut runner = SingleStepRunner;
        stager.run_dynamic(&mut engine, &mut runner, 5, 0.005).unwrap();
        assert_eq!(stager.phase(), Phase::Done);
        assert_eq!(engine.commands_matching("analyze 1 ").len(), 5);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut engine = JournalEngine::new();
        let model = built_model(&mut engine);
        let mut stager = AnalysisStager::new(&model);
        assert_eq!(
            stager.run_gravity_plastic(&mut engine).err(),
            Some("phase transition is out of order")
        );
        stager.run_gravity_elastic(&mut engine).unwrap();
        assert_eq!(
            stager.run_gravity_elastic(&mut engine).err(),
            Some("phase transition is out of order")
        );
        assert_eq!(
            stager.switch_permeability(&mut engine).err(),
            Some("phase transition is out of order")
        );
        // no path back once a later phase is reached
        stager.run_gravity_plastic(&mut engine).unwrap();
        assert_eq!(
            stager.run_gravity_elastic(&mut engine).err(),
            Some("phase transition is out of order")
        );
    }

    #[test]
    fn step_failure_aborts_the_run() {
        let mut engine = JournalEngine::new();
        let model = built_model(&mut engine);
        let record = velocity_record();
        let mut stager = AnalysisStager::new(&model);
        stager.run_gravity_elastic(&mut engine).unwrap();
        stager.run_gravity_plastic(&mut engine).unwrap();
        stager.switch_permeability(&mut engine).unwrap();
        stager.prepare_dynamic(&mut engine, &record).unwrap();

        engine.set_analyze_budget(2);
        let mut runner = SingleStepRunner;
        assert_eq!(
            stager.run_dynamic(&mut engine, &mut runner, 10, 0.005).err(),
            Some("dynamic analysis aborted on a step failure")
        );
        assert_eq!(stager.phase(), Phase::DynamicStepping); // no rollback, no recovery
    }
}
