use crate::base::{MaterialStage, ParamSoil, ParamViscous};
use crate::fem::{
    AnalysisKind, ConstraintHandler, ConvergenceTest, DofNumberer, Integrator, PermeabilityAxis, SolutionAlgorithm,
    SolverEngine, SystemSolver,
};
use crate::StrError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

/// Implements a solver engine that records every capability call
///
/// The journal keeps one formatted line per call, in order, plus the live tag
/// sets needed to answer the existence queries. It backs the dry-run binary
/// (the journal documents exactly what would be sent to the real solver) and
/// the test suite (assertions over the recorded command sequence).
pub struct JournalEngine {
    /// Recorded capability calls, one line each, in call order
    pub commands: Vec<String>,

    nodes: HashSet<usize>,
    elements: HashSet<usize>,
    materials: HashSet<usize>,
    parameters: HashMap<usize, f64>,
    time: f64,
    analyze_budget: Option<usize>,
}

/// Holds the serializable journal summary
#[derive(Serialize)]
struct JournalSummary<'a> {
    n_nodes: usize,
    n_elements: usize,
    n_materials: usize,
    n_parameters: usize,
    time: f64,
    commands: &'a Vec<String>,
}

impl JournalEngine {
    /// Allocates a new instance
    pub fn new() -> Self {
        JournalEngine {
            commands: Vec::new(),
            nodes: HashSet::new(),
            elements: HashSet::new(),
            materials: HashSet::new(),
            parameters: HashMap::new(),
            time: 0.0,
            analyze_budget: None,
        }
    }

    /// Limits the number of analyze calls that will succeed (test hook)
    pub fn set_analyze_budget(&mut self, n_calls: usize) {
        self.analyze_budget = Some(n_calls);
    }

    /// Returns the current simulation time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the number of created nodes
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of created elements
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of instantiated materials
    pub fn n_materials(&self) -> usize {
        self.materials.len()
    }

    /// Returns the last value given to a registered parameter (NaN before any update)
    pub fn parameter_value(&self, param_tag: usize) -> Option<f64> {
        self.parameters.get(&param_tag).copied()
    }

    /// Returns the recorded commands starting with the given prefix
    pub fn commands_matching(&self, prefix: &str) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.as_str())
            .collect()
    }

    /// Writes the journal and a summary to a JSON file
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<Path> + ?Sized,
    {
        let path = full_path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| "cannot create output directory")?;
        }
        let summary = JournalSummary {
            n_nodes: self.nodes.len(),
            n_elements: self.elements.len(),
            n_materials: self.materials.len(),
            n_parameters: self.parameters.len(),
            time: self.time,
            commands: &self.commands,
        };
        let file = File::create(path).map_err(|_| "cannot create journal file")?;
        serde_json::to_writer_pretty(file, &summary).map_err(|_| "cannot write journal file")?;
        Ok(())
    }

    fn require_node(&self, tag: usize) -> Result<(), StrError> {
        if !self.nodes.contains(&tag) {
            log::error!("node {} is unknown to the solver", tag);
            return Err("node is unknown to the solver");
        }
        Ok(())
    }
}

impl SolverEngine for JournalEngine {
    fn has_node(&self, tag: usize) -> bool {
        self.nodes.contains(&tag)
    }

    fn has_element(&self, tag: usize) -> bool {
        self.elements.contains(&tag)
    }

    fn has_material(&self, tag: usize) -> bool {
        self.materials.contains(&tag)
    }

    fn node(&mut self, tag: usize, x: f64, y: f64) -> Result<(), StrError> {
        if !self.nodes.insert(tag) {
            return Err("node tag already exists in the solver");
        }
        self.commands.push(format!("node {} {:?} {:?}", tag, x, y));
        Ok(())
    }

    fn fix(&mut self, tag: usize, mask: [u8; 3]) -> Result<(), StrError> {
        self.require_node(tag)?;
        self.commands
            .push(format!("fix {} {} {} {}", tag, mask[0], mask[1], mask[2]));
        Ok(())
    }

    fn equal_dof(&mut self, retained: usize, constrained: usize, dofs: &[usize]) -> Result<(), StrError> {
        self.require_node(retained)?;
        self.require_node(constrained)?;
        let dofs: Vec<_> = dofs.iter().map(|d| d.to_string()).collect();
        self.commands
            .push(format!("equalDOF {} {} {}", retained, constrained, dofs.join(" ")));
        Ok(())
    }

    fn mass(&mut self, tag: usize, mass: [f64; 3]) -> Result<(), StrError> {
        self.require_node(tag)?;
        self.commands
            .push(format!("mass {} {:?} {:?} {:?}", tag, mass[0], mass[1], mass[2]));
        Ok(())
    }

    fn load(&mut self, tag: usize, components: [f64; 3]) -> Result<(), StrError> {
        self.require_node(tag)?;
        self.commands.push(format!(
            "load {} {:?} {:?} {:?}",
            tag, components[0], components[1], components[2]
        ));
        Ok(())
    }

    fn soil_material(&mut self, tag: usize, param: &ParamSoil) -> Result<(), StrError> {
        let args = param.instantiation_args()?;
        if !self.materials.insert(tag) {
            return Err("material tag already exists in the solver");
        }
        let args: Vec<_> = args.iter().map(|a| format!("{:?}", a)).collect();
        self.commands
            .push(format!("nDMaterial {} {} {}", param.kind_name(), tag, args.join(" ")));
        Ok(())
    }

    fn viscous_material(&mut self, tag: usize, param: &ParamViscous) -> Result<(), StrError> {
        if !self.materials.insert(tag) {
            return Err("material tag already exists in the solver");
        }
        self.commands
            .push(format!("uniaxialMaterial Viscous {} {:?} {:?}", tag, param.c, param.alpha));
        Ok(())
    }

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
    ) -> Result<(), StrError> {
        for node in nodes {
            if !self.nodes.contains(&node) {
                log::error!("element {} references node {} unknown to the solver", tag, node);
                return Err("element references a node unknown to the solver");
            }
        }
        if !self.materials.contains(&mat_tag) {
            return Err("element references a material unknown to the solver");
        }
        if !self.elements.insert(tag) {
            return Err("element tag already exists in the solver");
        }
        self.commands.push(format!(
            "element quadUP {} {} {} {} {} {:?} {} {:?} {:?} {:?} {:?} {:?} {:?}",
            tag,
            nodes[0],
            nodes[1],
            nodes[2],
            nodes[3],
            thickness,
            mat_tag,
            bulk,
            fluid_mass,
            vperm,
            hperm,
            unit_weight_x,
            unit_weight_y
        ));
        Ok(())
    }

    fn zero_length_element(
        &mut self,
        tag: usize,
        node_a: usize,
        node_b: usize,
        mat_tag: usize,
        direction: usize,
    ) -> Result<(), StrError> {
        self.require_node(node_a)?;
        self.require_node(node_b)?;
        if !self.materials.contains(&mat_tag) {
            return Err("element references a material unknown to the solver");
        }
        if !self.elements.insert(tag) {
            return Err("element tag already exists in the solver");
        }
        self.commands.push(format!(
            "element zeroLength {} {} {} -mat {} -dir {}",
            tag, node_a, node_b, mat_tag, direction
        ));
        Ok(())
    }

    fn register_parameter(
        &mut self,
        param_tag: usize,
        element_tag: usize,
        axis: PermeabilityAxis,
    ) -> Result<(), StrError> {
        if !self.elements.contains(&element_tag) {
            return Err("parameter references an element unknown to the solver");
        }
        if self.parameters.contains_key(&param_tag) {
            return Err("parameter tag already exists in the solver");
        }
        self.parameters.insert(param_tag, f64::NAN);
        self.commands.push(format!(
            "parameter {} element {} {}",
            param_tag,
            element_tag,
            axis.parameter_name()
        ));
        Ok(())
    }

    fn update_parameter(&mut self, param_tag: usize, value: f64) -> Result<(), StrError> {
        match self.parameters.get_mut(&param_tag) {
            Some(stored) => *stored = value,
            None => return Err("parameter tag is unknown to the solver"),
        }
        self.commands.push(format!("updateParameter {} {:?}", param_tag, value));
        Ok(())
    }

    fn update_material_stage(&mut self, mat_tag: usize, stage: MaterialStage) -> Result<(), StrError> {
        if !self.materials.contains(&mat_tag) {
            return Err("material tag is unknown to the solver");
        }
        self.commands.push(format!(
            "updateMaterialStage -material {} -stage {}",
            mat_tag,
            stage.index()
        ));
        Ok(())
    }

    fn constant_time_series(&mut self, tag: usize) -> Result<(), StrError> {
        self.commands.push(format!("timeSeries Constant {}", tag));
        Ok(())
    }

    fn path_time_series(&mut self, tag: usize, path: &str, dt: f64, factor: f64) -> Result<(), StrError> {
        self.commands.push(format!(
            "timeSeries Path {} -dt {:?} -filePath {} -factor {:?}",
            tag, dt, path, factor
        ));
        Ok(())
    }

    fn plain_pattern(&mut self, tag: usize, ts_tag: usize) -> Result<(), StrError> {
        self.commands.push(format!("pattern Plain {} {}", tag, ts_tag));
        Ok(())
    }

    fn uniform_excitation(&mut self, tag: usize, direction: usize, ts_tag: usize) -> Result<(), StrError> {
        self.commands.push(format!(
            "pattern UniformExcitation {} {} -vel {}",
            tag, direction, ts_tag
        ));
        Ok(())
    }

    fn rayleigh(&mut self, a0: f64, a1: f64, a2: f64, a3: f64) -> Result<(), StrError> {
        self.commands
            .push(format!("rayleigh {:?} {:?} {:?} {:?}", a0, a1, a2, a3));
        Ok(())
    }

    fn constraints(&mut self, handler: ConstraintHandler) -> Result<(), StrError> {
        match handler {
            ConstraintHandler::Penalty { alpha_sp, alpha_mp } => {
                self.commands
                    .push(format!("constraints Penalty {:?} {:?}", alpha_sp, alpha_mp));
            }
        }
        Ok(())
    }

    fn test(&mut self, test: ConvergenceTest) -> Result<(), StrError> {
        match test {
            ConvergenceTest::RelativeNormDispIncr {
                tol,
                max_iter,
                print_flag,
            } => {
                self.commands.push(format!(
                    "test RelativeNormDispIncr {:?} {} {}",
                    tol, max_iter, print_flag
                ));
            }
        }
        Ok(())
    }

    fn algorithm(&mut self, algorithm: SolutionAlgorithm) -> Result<(), StrError> {
        self.commands.push(format!("algorithm {:?}", algorithm));
        Ok(())
    }

    fn numberer(&mut self, numberer: DofNumberer) -> Result<(), StrError> {
        let name = match numberer {
            DofNumberer::Rcm => "RCM",
            DofNumberer::ParallelRcm => "ParallelRCM",
        };
        self.commands.push(format!("numberer {}", name));
        Ok(())
    }

    fn system(&mut self, system: SystemSolver) -> Result<(), StrError> {
        let name = match system {
            SystemSolver::ProfileSpd => "ProfileSPD",
            SystemSolver::Mumps => "Mumps",
        };
        self.commands.push(format!("system {}", name));
        Ok(())
    }

    fn integrator(&mut self, integrator: Integrator) -> Result<(), StrError> {
        match integrator {
            Integrator::Newmark { gamma, beta } => {
                self.commands.push(format!("integrator Newmark {:?} {:?}", gamma, beta));
            }
        }
        Ok(())
    }

    fn analysis(&mut self, kind: AnalysisKind) -> Result<(), StrError> {
        match kind {
            AnalysisKind::Transient => self.commands.push("analysis Transient".to_string()),
        }
        Ok(())
    }

    fn dynamic_reactions(&mut self, enabled: bool) -> Result<(), StrError> {
        if enabled {
            self.commands.push("reactions -dynamic".to_string());
        } else {
            self.commands.push("reactions".to_string());
        }
        Ok(())
    }

    fn analyze(&mut self, n_steps: usize, dt: f64) -> Result<(), StrError> {
        if let Some(budget) = self.analyze_budget.as_mut() {
            if *budget == 0 {
                return Err("analysis step failed to converge");
            }
            *budget -= 1;
        }
        self.time += n_steps as f64 * dt;
        self.commands.push(format!("analyze {} {:?}", n_steps, dt));
        Ok(())
    }

    fn node_reaction(&mut self, tag: usize, dof: usize) -> Result<f64, StrError> {
        self.require_node(tag)?;
        self.commands.push(format!("nodeReaction {} {}", tag, dof));
        Ok(0.0)
    }

    fn set_time(&mut self, t: f64) -> Result<(), StrError> {
        self.time = t;
        self.commands.push(format!("setTime {:?}", t));
        Ok(())
    }

    fn load_const(&mut self, t: f64) -> Result<(), StrError> {
        self.time = t;
        self.commands.push(format!("loadConst -time {:?}", t));
        Ok(())
    }
}

impl fmt::Display for JournalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Journal with {} commands\n", self.commands.len()).unwrap();
        write!(
            f,
            "nodes = {}, elements = {}, materials = {}, parameters = {}\n",
            self.nodes.len(),
            self.elements.len(),
            self.materials.len(),
            self.parameters.len()
        )
        .unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
