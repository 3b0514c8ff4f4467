//! Implements the partitioned assembly of the site model

mod constraints;
mod dashpot;
mod partition;
mod site_model;
pub use crate::model::constraints::*;
pub use crate::model::dashpot::*;
pub use crate::model::partition::*;
pub use crate::model::site_model::*;
