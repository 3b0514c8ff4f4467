use crate::base::{
    GeometryStore, MaterialCatalog, MaterialStage, ModelConfig, Node, PermeabilityStage, TieGroup,
    GRAVITY_ACCELERATION, HIGH_PERMEABILITY,
};
use crate::fem::{PermeabilityAxis, SolverEngine};
use crate::model::{resolve_tie_family, DashpotAssembly, Partition, PartitionContext, TieFamily, WorkerSet};
use crate::StrError;
use std::fmt;

/// Defines the tag of the constant time series driving the gravity loads
pub const GRAVITY_SERIES_TAG: usize = 1;

/// Defines the tag of the plain load pattern holding the gravity loads
pub const GRAVITY_PATTERN_TAG: usize = 1;

/// Holds one worker's view of the site model and orchestrates its assembly
///
/// Construction is strictly sequential: materials must exist in the catalog
/// before elements reference them, and nodes must be resolved across the
/// partition closure before anything asks for them. The build sequence mirrors
/// that ordering; each step is also available individually.
pub struct SiteModel {
    /// The append-only arena of records (source of truth for tags)
    pub store: GeometryStore,

    /// The registry of soil materials and element properties
    pub catalog: MaterialCatalog,

    /// Assembly configuration
    pub config: ModelConfig,

    /// This worker's x-interval
    pub partition: Partition,

    /// This worker's visible node and element sets (grow-only)
    pub visible: WorkerSet,

    /// Left-edge tie family (after resolution)
    pub left: Option<TieFamily>,

    /// Right-edge tie family (after resolution)
    pub right: Option<TieFamily>,

    /// Base tie family (after resolution)
    pub base: Option<TieFamily>,

    /// The absorbing boundary (after derivation)
    pub dashpot: Option<DashpotAssembly>,

    /// Interior span `(left boundary, right boundary)` when thickening is active
    pub site_boundary: Option<(f64, f64)>,

    /// First permeability parameter tag: one power of ten past the element tags
    param_tag_base: usize,
}

impl SiteModel {
    /// Allocates a new instance: partitions the mesh and selects the visible sets
    pub fn new(
        store: GeometryStore,
        catalog: MaterialCatalog,
        config: ModelConfig,
        ctx: PartitionContext,
    ) -> Result<Self, StrError> {
        let partition = Partition::new(&store, ctx)?;
        let visible = partition.select(&store)?;
        log::info!(
            "{}: {} nodes and {} elements visible",
            partition,
            visible.node_tags.len(),
            visible.element_tags.len()
        );

        // parameter tags live one power of ten above the element tags
        let max_element_tag = store.max_element_tag();
        let mut param_tag_base = 10;
        while param_tag_base <= max_element_tag {
            param_tag_base *= 10;
        }

        Ok(SiteModel {
            store,
            catalog,
            config,
            partition,
            visible,
            left: None,
            right: None,
            base: None,
            dashpot: None,
            site_boundary: None,
            param_tag_base,
        })
    }

    /// Returns this worker's identity
    pub fn ctx(&self) -> PartitionContext {
        self.partition.ctx
    }

    /// Runs the full assembly sequence against the engine
    pub fn build(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        self.create_nodes(engine)?;
        self.apply_fixities(engine)?;
        self.resolve_constraints(engine)?;
        self.create_materials(engine)?;
        self.create_elements(engine)?;
        self.apply_masses(engine)?;
        self.apply_gravity_loads(engine)?;
        self.install_dashpot(engine)?;
        Ok(())
    }

    /// Creates the visible nodes in the engine (existing tags are skipped with a warning)
    pub fn create_nodes(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for tag in self.visible.node_tags_sorted() {
            let node = self
                .store
                .nodes
                .get(&tag)
                .ok_or("visible node tag is absent from the global registry")?;
            if engine.has_node(tag) {
                log::warn!("{} already exists; not created", node);
                continue;
            }
            engine.node(node.tag, node.x, node.y)?;
        }
        log::info!("finished creating site nodes");
        Ok(())
    }

    /// Applies the bottom, surface, and undrained fixities for the visible nodes
    pub fn apply_fixities(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for fixed in &self.store.fixed_bottom {
            if self.visible.node_tags.contains(&fixed.tag) {
                engine.fix(fixed.tag, fixed.mask)?;
            }
        }
        for fixed in &self.store.fixed_surface {
            if self.visible.node_tags.contains(&fixed.tag) {
                engine.fix(fixed.tag, fixed.mask)?;
            }
        }
        for fixed in &self.store.undrained {
            if self.visible.node_tags.contains(&fixed.tag) {
                engine.fix(fixed.tag, fixed.mask)?;
            }
        }
        log::info!("finished fixing bottom, surface, and undrained nodes");
        Ok(())
    }

    /// Resolves the three tie families against this worker and applies the ties
    ///
    /// Nodes materialized by the closure join the primary visible set, so all
    /// subsequent queries see the closure, not the original partition.
    pub fn resolve_constraints(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        let left = resolve_tie_family(TieGroup::LeftEdge, &self.store, &mut self.visible, engine)?;
        let right = resolve_tie_family(TieGroup::RightEdge, &self.store, &mut self.visible, engine)?;
        let base = resolve_tie_family(TieGroup::Base, &self.store, &mut self.visible, engine)?;
        left.apply(engine)?;
        right.apply(engine)?;
        base.apply(engine)?;
        self.left = Some(left);
        self.right = Some(right);
        self.base = Some(base);
        log::info!("finished creating equal-DOF constraints");
        Ok(())
    }

    /// Instantiates every catalog material in the engine, exactly once
    ///
    /// Unlike nodes and elements, a repeated instantiation attempt is a
    /// configuration error rather than a warning.
    pub fn create_materials(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for tag in self.catalog.tags_sorted() {
            if engine.has_material(tag) {
                log::error!("material {} is already instantiated in the solver", tag);
                return Err("material is already instantiated in the solver");
            }
            let name = self.catalog.name_of(tag)?.to_string();
            let record = *self.catalog.soil(&name)?;
            engine.soil_material(tag, &record.param)?;
        }
        log::info!("finished creating all soil materials");
        Ok(())
    }

    /// Computes the interior span from the first left and right tie pairs
    fn compute_site_boundary(&self) -> Option<(f64, f64)> {
        let left = self.left.as_ref()?;
        let right = self.right.as_ref()?;
        let first_left = left.all.first()?;
        let first_right = right.all.first()?;
        let left_boundary = f64::max(
            self.store.nodes.get(&first_left.a)?.x,
            self.store.nodes.get(&first_left.b)?.x,
        );
        let right_boundary = f64::min(
            self.store.nodes.get(&first_right.a)?.x,
            self.store.nodes.get(&first_right.b)?.x,
        );
        Some((left_boundary, right_boundary))
    }

    /// Creates the visible elements and registers their permeability parameters
    ///
    /// The element thickness is the material thickness scaled by the base
    /// coefficient; elements extending past the interior span are additionally
    /// scaled by the boundary multiplier. Under high-permeability mode the
    /// native permeabilities are replaced by the uniform large value; the
    /// registered parameter handles allow switching them later without
    /// re-creating the elements.
    pub fn create_elements(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        if self.config.thicker_boundary {
            self.site_boundary = self.compute_site_boundary();
            if self.site_boundary.is_none() {
                log::warn!("cannot thicken boundary columns without the edge tie families");
            }
        }

        for tag in self.visible.element_tags_sorted() {
            let element = *self
                .store
                .elements
                .get(&tag)
                .ok_or("visible element tag is absent from the global registry")?;
            if engine.has_element(tag) {
                log::warn!("{} already exists; not created", element);
                continue;
            }

            let name = self.catalog.name_of(element.mat_tag)?.to_string();
            let props = *self.catalog.element_props(&name)?;
            let mut thickness = props.thickness * self.config.base_thickness_coef;
            if let Some((left_boundary, right_boundary)) = self.site_boundary {
                let mut min_x = f64::MAX;
                let mut max_x = f64::MIN;
                for node_tag in element.nodes {
                    let node = self
                        .store
                        .nodes
                        .get(&node_tag)
                        .ok_or("element references a node absent from the global registry")?;
                    min_x = f64::min(min_x, node.x);
                    max_x = f64::max(max_x, node.x);
                }
                if min_x < left_boundary {
                    thickness *= self.config.boundary_thickness_coef;
                }
                if max_x > right_boundary {
                    thickness *= self.config.boundary_thickness_coef;
                }
            }

            let (vperm, hperm) = if self.config.high_permeability {
                (HIGH_PERMEABILITY, HIGH_PERMEABILITY)
            } else {
                (props.vperm, props.hperm)
            };

            engine.quad_up_element(
                element.tag,
                element.nodes,
                thickness,
                element.mat_tag,
                props.bulk,
                props.fluid_mass,
                vperm,
                hperm,
                props.unit_weight_x,
                props.unit_weight_y,
            )?;

            // register the updatable permeability handles
            let vperm_param = self.param_tag_base + 2 * element.tag;
            let hperm_param = self.param_tag_base + 2 * element.tag + 1;
            engine.register_parameter(vperm_param, element.tag, PermeabilityAxis::Vertical)?;
            engine.register_parameter(hperm_param, element.tag, PermeabilityAxis::Horizontal)?;
            let stored = self.store.elements.get_mut(&tag).unwrap();
            stored.vperm_param = Some(vperm_param);
            stored.hperm_param = Some(hperm_param);
        }
        log::info!("finished creating site elements");
        Ok(())
    }

    /// Assigns the nodal masses for the visible nodes
    pub fn apply_masses(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for record in &self.store.masses {
            if self.visible.node_tags.contains(&record.tag) {
                engine.mass(record.tag, record.mass)?;
            }
        }
        log::info!("finished creating nodal masses");
        Ok(())
    }

    /// Creates the gravity load pattern and the nodal weight loads
    pub fn apply_gravity_loads(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        engine.constant_time_series(GRAVITY_SERIES_TAG)?;
        engine.plain_pattern(GRAVITY_PATTERN_TAG, GRAVITY_SERIES_TAG)?;
        for record in &self.store.masses {
            if self.visible.node_tags.contains(&record.tag) {
                let components = [
                    -GRAVITY_ACCELERATION * record.mass[0],
                    -GRAVITY_ACCELERATION * record.mass[1],
                    -GRAVITY_ACCELERATION * record.mass[2],
                ];
                engine.load(record.tag, components)?;
            }
        }
        log::info!("finished adding gravity loads");
        Ok(())
    }

    /// Adds nodes through the arena, keeping the engine and visible set consistent
    ///
    /// A tag absent from the registry is accepted with a warning (user-defined
    /// node, e.g. the absorbing boundary). A tag known to the solver but not
    /// built by this worker is a data-integrity error.
    pub fn add_nodes(&mut self, nodes: &[Node], engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for node in nodes {
            match self.store.nodes.get(&node.tag) {
                None => {
                    log::warn!("{} is not in the global registry; adding a user-defined node", node);
                    self.store.add_node(node.tag, node.x, node.y)?;
                    engine.node(node.tag, node.x, node.y)?;
                    self.visible.node_tags.insert(node.tag);
                }
                Some(existing) => {
                    if existing.x != node.x || existing.y != node.y {
                        log::error!("node tag {} re-used with different coordinates", node.tag);
                        return Err("node tag re-used with different coordinates");
                    }
                    let built = self.visible.node_tags.contains(&node.tag);
                    let present = engine.has_node(node.tag);
                    match (built, present) {
                        (false, false) => {
                            engine.node(node.tag, node.x, node.y)?;
                            self.visible.node_tags.insert(node.tag);
                        }
                        (true, false) => {
                            log::info!("{} already built but not found in the solver; created", node);
                            engine.node(node.tag, node.x, node.y)?;
                        }
                        (false, true) => {
                            log::error!("{} not built but present in the solver", node);
                            return Err("node is not built but is present in the solver");
                        }
                        (true, true) => log::warn!("{} already exists; not created", node),
                    }
                }
            }
        }
        Ok(())
    }

    /// Derives and installs the absorbing (Lysmer-Kuhlemeyer) boundary
    pub fn install_dashpot(&mut self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        let (left, base) = match (&self.left, &self.base) {
            (Some(left), Some(base)) => (left, base),
            _ => return Err("tie families must be resolved before the absorbing boundary is derived"),
        };
        let dashpot = DashpotAssembly::derive(
            &self.store,
            &self.catalog,
            &self.config,
            left,
            base,
            self.site_boundary,
        )?;
        self.add_nodes(&[dashpot.anchor, dashpot.free], engine)?;
        dashpot.install(engine)?;
        self.dashpot = Some(dashpot);
        log::info!("finished creating the absorbing boundary");
        Ok(())
    }

    /// Switches the behavior stage of every catalog material (global transition)
    pub fn update_material_stage(
        &self,
        engine: &mut dyn SolverEngine,
        stage: MaterialStage,
    ) -> Result<(), StrError> {
        for tag in self.catalog.tags_sorted() {
            engine.update_material_stage(tag, stage)?;
        }
        Ok(())
    }

    /// Updates the permeability of every visible element through its parameter handles
    ///
    /// This is a parameter-update pass: the elements are never re-instantiated.
    pub fn update_permeability(
        &self,
        engine: &mut dyn SolverEngine,
        stage: PermeabilityStage,
    ) -> Result<(), StrError> {
        for tag in self.visible.element_tags_sorted() {
            let element = self
                .store
                .elements
                .get(&tag)
                .ok_or("visible element tag is absent from the global registry")?;
            let (vperm, hperm) = match stage {
                PermeabilityStage::High => (HIGH_PERMEABILITY, HIGH_PERMEABILITY),
                PermeabilityStage::Native => {
                    let props = self.catalog.element_props_of_tag(element.mat_tag)?;
                    (props.vperm, props.hperm)
                }
            };
            let vperm_param = element
                .vperm_param
                .ok_or("permeability parameters are not registered for the element")?;
            let hperm_param = element
                .hperm_param
                .ok_or("permeability parameters are not registered for the element")?;
            engine.update_parameter(vperm_param, vperm)?;
            engine.update_parameter(hperm_param, hperm)?;
        }
        log::info!("updated the permeability of all elements");
        Ok(())
    }
}

impl fmt::Display for SiteModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Site model ({})\n", self.partition.ctx).unwrap();
        write!(f, "visible nodes = {}\n", self.visible.node_tags.len()).unwrap();
        write!(f, "visible elements = {}\n", self.visible.element_tags.len()).unwrap();
        write!(f, "materials = {}\n", self.catalog.len()).unwrap();
        write!(f, "dashpot = {}\n", self.dashpot.is_some()).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
