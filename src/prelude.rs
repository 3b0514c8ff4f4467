//! Makes available common structures needed to assemble and stage a site model
//!
//! You may write `use srsim::prelude::*` in your code and obtain access to
//! commonly used functionality.

pub use crate::base::{GeometryStore, MaterialCatalog, MaterialStage, ModelConfig, PermeabilityStage, SampleSite};
pub use crate::base::{ParamElement, ParamSoil, ParamViscous};
pub use crate::fem::{AnalysisStager, JournalEngine, Phase, SingleStepRunner, SolverEngine, StepRunner, VelocityRecord};
pub use crate::model::{DashpotAssembly, Partition, PartitionContext, SiteModel, TieFamily, WorkerSet};
