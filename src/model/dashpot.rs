use crate::base::{
    GeometryStore, MaterialCatalog, ModelConfig, Node, ParamViscous, HALF_SPACE_DENSITY, HALF_SPACE_SHEAR_VELOCITY,
};
use crate::fem::SolverEngine;
use crate::model::TieFamily;
use crate::StrError;
use std::fmt;

/// Holds the derived Lysmer-Kuhlemeyer dashpot assembly
///
/// The assembly approximates the energy radiated into the semi-infinite
/// foundation below the mesh: a zero-length viscous element between a fully
/// fixed anchor and a free node that is rigidly coupled to the base corner on
/// all non-horizontal DOFs, so that relative sliding along the horizontal
/// direction generates the dashpot force. Everything here is synthesized from
/// already-resolved geometry; nothing is read from input.
#[derive(Clone, Copy, Debug)]
pub struct DashpotAssembly {
    /// Fully fixed anchor node (mask `[1,1,1]`)
    pub anchor: Node,

    /// Free node (mask `[0,1,1]`), tied to the corner on the horizontal DOF
    pub free: Node,

    /// Reference corner: the smaller-x node common to the left-edge and base ties
    pub corner: Node,

    /// Tag of the new viscous material (one past the catalog maximum)
    pub mat_tag: usize,

    /// Tag of the new zero-length element (one past the mesh maximum)
    pub element_tag: usize,

    /// Tributary base area
    pub area: f64,

    /// Viscous coefficient per unit area: half-space density × shear-wave velocity
    pub coefficient: f64,
}

impl DashpotAssembly {
    /// Derives the assembly from the resolved tie families
    ///
    /// The tributary area is the horizontal extent of the base tie family times
    /// the effective thickness of the base layer; when the boundary columns
    /// are thickened, the sub-segments outside `site_boundary` contribute
    /// proportionally to the boundary multiplier.
    pub fn derive(
        store: &GeometryStore,
        catalog: &MaterialCatalog,
        config: &ModelConfig,
        left: &TieFamily,
        base: &TieFamily,
        site_boundary: Option<(f64, f64)>,
    ) -> Result<Self, StrError> {
        // reference corner from the family intersection (expected size 2)
        let base_tags = base.node_tags();
        let common: Vec<usize> = left.node_tags().into_iter().filter(|tag| base_tags.contains(tag)).collect();
        if common.is_empty() {
            log::error!("left-edge and base tie families share no node");
            return Err("left-edge and base tie families share no node");
        }
        let mut corner: Option<&Node> = None;
        for tag in &common {
            let node = store
                .nodes
                .get(tag)
                .ok_or("equal-DOF tie references a node absent from the global registry")?;
            match corner {
                Some(current) if current.x <= node.x => (),
                _ => corner = Some(node),
            }
        }
        let corner = *corner.unwrap();

        // horizontal extent of the base tie family
        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        for tag in &base_tags {
            let node = store
                .nodes
                .get(tag)
                .ok_or("equal-DOF tie references a node absent from the global registry")?;
            min_x = f64::min(min_x, node.x);
            max_x = f64::max(max_x, node.x);
        }

        // effective thickness of the base layer at the corner
        let base_element = store
            .elements
            .values()
            .find(|element| element.nodes.contains(&corner.tag))
            .ok_or("no element contains the base corner node")?;
        let props = catalog.element_props_of_tag(base_element.mat_tag)?;
        let thickness = props.thickness * config.base_thickness_coef;

        let area = match site_boundary {
            Some((left_boundary, right_boundary)) => {
                let multiplier = config.boundary_thickness_coef;
                (right_boundary - left_boundary) * thickness
                    + (max_x - right_boundary) * thickness * multiplier
                    + (left_boundary - min_x) * thickness * multiplier
            }
            None => (max_x - min_x) * thickness,
        };

        // monotonic tag allocation, never recycled
        let anchor_tag = store.max_node_tag() + 1;
        let anchor = Node {
            tag: anchor_tag,
            x: corner.x,
            y: corner.y,
        };
        let free = Node {
            tag: anchor_tag + 1,
            x: corner.x,
            y: corner.y,
        };

        Ok(DashpotAssembly {
            anchor,
            free,
            corner,
            mat_tag: catalog.max_mat_tag() + 1,
            element_tag: store.max_element_tag() + 1,
            area,
            coefficient: HALF_SPACE_DENSITY * HALF_SPACE_SHEAR_VELOCITY,
        })
    }

    /// Returns the viscous material parameters (coefficient scaled by the area)
    pub fn viscous_param(&self) -> ParamViscous {
        ParamViscous {
            c: self.coefficient * self.area,
            alpha: 1.0,
        }
    }

    /// Creates the boundary conditions, material, and element in the engine
    ///
    /// The two new nodes must have been created beforehand (they go through
    /// the model's node-creation path so the arena stays the source of truth).
    pub fn install(&self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        engine.fix(self.anchor.tag, [1, 1, 1])?;
        engine.fix(self.free.tag, [0, 1, 1])?;
        engine.equal_dof(self.corner.tag, self.free.tag, &[1])?;
        engine.viscous_material(self.mat_tag, &self.viscous_param())?;
        engine.zero_length_element(self.element_tag, self.anchor.tag, self.free.tag, self.mat_tag, 1)?;
        log::info!(
            "dashpot nodes ({}, {}), material {} and element {} defined",
            self.anchor.tag,
            self.free.tag,
            self.mat_tag,
            self.element_tag
        );
        Ok(())
    }
}

impl fmt::Display for DashpotAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dashpot at ({:?}, {:?}): area = {:?}, coefficient = {:?}",
            self.corner.x, self.corner.y, self.area, self.coefficient
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
