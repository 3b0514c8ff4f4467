use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines the behavior stage of the soil constitutive models
///
/// The transition is one-directional and global: once the catalog has been
/// switched to [MaterialStage::Plastic], there is no supported path back.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum MaterialStage {
    /// Linear behavior used for the first gravity pass
    Elastic,

    /// True nonlinear behavior for the second gravity pass and dynamic analysis
    Plastic,
}

impl MaterialStage {
    /// Returns the stage index understood by the solver engine
    pub fn index(&self) -> usize {
        match self {
            MaterialStage::Elastic => 0,
            MaterialStage::Plastic => 1,
        }
    }
}

/// Defines the permeability stage, independent of the material stage
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum PermeabilityStage {
    /// Uniform, artificially large permeability used throughout gravity analysis
    High,

    /// The material's true permeability, switched in before dynamic loading
    Native,
}

/// Defines the three independently-read equal-DOF tie families
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum TieGroup {
    /// Ties along the left edge of the site
    LeftEdge,

    /// Ties along the right edge of the site
    RightEdge,

    /// Ties along the base of the site
    Base,
}

impl TieGroup {
    /// Returns a short label for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            TieGroup::LeftEdge => "left-edge",
            TieGroup::RightEdge => "right-edge",
            TieGroup::Base => "base",
        }
    }
}

impl fmt::Display for TieGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{MaterialStage, PermeabilityStage, TieGroup};

    #[test]
    fn material_stage_index_works() {
        assert_eq!(MaterialStage::Elastic.index(), 0);
        assert_eq!(MaterialStage::Plastic.index(), 1);
    }

    #[test]
    fn derive_works() {
        let stage = PermeabilityStage::High;
        let cloned = stage.clone();
        assert_eq!(stage, cloned);
        assert_ne!(PermeabilityStage::High, PermeabilityStage::Native);
    }

    #[test]
    fn tie_group_label_works() {
        assert_eq!(TieGroup::LeftEdge.label(), "left-edge");
        assert_eq!(TieGroup::RightEdge.label(), "right-edge");
        assert_eq!(format!("{}", TieGroup::Base), "base");
    }
}
