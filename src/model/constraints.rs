use crate::base::{EqualDofTie, GeometryStore, TieGroup};
use crate::fem::SolverEngine;
use crate::model::WorkerSet;
use crate::StrError;
use std::fmt;

/// Holds one equal-DOF tie family restricted to a worker
///
/// A tie qualifies for the worker when at least one of its two member nodes is
/// visible; this is what lets a tie reach across a partition boundary. The
/// full (partition-independent) list is kept alongside because some derived
/// artifacts (e.g. the absorbing boundary) are computed from it.
#[derive(Clone, Debug)]
pub struct TieFamily {
    /// Family name
    pub group: TieGroup,

    /// All ties of the family, regardless of partition
    pub all: Vec<EqualDofTie>,

    /// Ties qualified for this worker
    pub qualified: Vec<EqualDofTie>,
}

impl TieFamily {
    /// Returns the node tags appearing anywhere in the full family
    pub fn node_tags(&self) -> Vec<usize> {
        let mut tags: Vec<usize> = self.all.iter().flat_map(|tie| [tie.a, tie.b]).collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Applies the qualified ties to the solver engine
    pub fn apply(&self, engine: &mut dyn SolverEngine) -> Result<(), StrError> {
        for tie in &self.qualified {
            engine.equal_dof(tie.a, tie.b, &tie.dofs)?;
        }
        Ok(())
    }
}

impl fmt::Display for TieFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ties: {} of {} qualified",
            self.group,
            self.qualified.len(),
            self.all.len()
        )
    }
}

/// Restricts one tie family to a worker and closes the visible node set over it
///
/// Every qualified tie whose other member is not yet visible has that member
/// materialized: the node is created in the engine, added to the worker's
/// primary node collection, and any fixed-DOF boundary condition known for it
/// in the global fixed list is re-applied immediately (the node would
/// otherwise be left unconstrained). Running the resolution twice yields the
/// same final node and fix set.
pub fn resolve_tie_family(
    group: TieGroup,
    store: &GeometryStore,
    visible: &mut WorkerSet,
    engine: &mut dyn SolverEngine,
) -> Result<TieFamily, StrError> {
    let all = store.ties(group).clone();
    let qualified: Vec<EqualDofTie> = all
        .iter()
        .filter(|tie| visible.node_tags.contains(&tie.a) || visible.node_tags.contains(&tie.b))
        .cloned()
        .collect();

    // member nodes used by qualified ties but invisible to this worker
    let mut missing: Vec<usize> = qualified
        .iter()
        .flat_map(|tie| [tie.a, tie.b])
        .filter(|tag| !visible.node_tags.contains(tag))
        .collect();
    missing.sort();
    missing.dedup();

    for tag in missing {
        let node = match store.nodes.get(&tag) {
            Some(node) => node,
            None => {
                log::error!("{} tie references unknown node {}", group, tag);
                return Err("equal-DOF tie references a node absent from the global registry");
            }
        };
        if engine.has_node(tag) {
            log::error!("{} not built but present in the solver", node);
            return Err("node is not built but is present in the solver");
        }
        log::warn!("{} used by a {} tie but not in this part of the model; adding it", node, group);
        engine.node(node.tag, node.x, node.y)?;
        visible.node_tags.insert(tag);
        if let Some(mask) = store.fixed_mask_of(tag) {
            log::info!("{} missing constraints at DOF mask {:?}; adding them", node, mask);
            engine.fix(tag, mask)?;
        }
    }

    Ok(TieFamily { group, all, qualified })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::resolve_tie_family;
    use crate::base::{EqualDofTie, FixedNode, GeometryStore, TieGroup};
    use crate::fem::{JournalEngine, SolverEngine};
    use crate::model::WorkerSet;

    fn store_with_tie_across_boundary() -> GeometryStore {
        let mut store = GeometryStore::new(100.0);
        store.add_node(10, 0.0, 0.0).unwrap();
        store.add_node(11, 10.0, 0.0).unwrap();
        store.fixed_bottom.push(FixedNode { tag: 11, mask: [0, 1, 0] });
        store.ties_base.push(EqualDofTie { a: 10, b: 11, dofs: vec![1] });
        store
    }

    fn visible_with_node_10(engine: &mut JournalEngine) -> WorkerSet {
        let mut visible = WorkerSet::default();
        visible.node_tags.insert(10);
        engine.node(10, 0.0, 0.0).unwrap();
        visible
    }

    #[test]
    fn cross_boundary_member_is_materialized_and_fixed() {
        let store = store_with_tie_across_boundary();
        let mut engine = JournalEngine::new();
        let mut visible = visible_with_node_10(&mut engine);

        let family = resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).unwrap();
        assert_eq!(family.qualified.len(), 1);
        assert!(visible.node_tags.contains(&11));
        assert!(engine.has_node(11));
        assert_eq!(engine.commands_matching("fix"), ["fix 11 0 1 0"]);

        family.apply(&mut engine).unwrap();
        assert_eq!(engine.commands_matching("equalDOF"), ["equalDOF 10 11 1"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let store = store_with_tie_across_boundary();
        let mut engine = JournalEngine::new();
        let mut visible = visible_with_node_10(&mut engine);

        resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).unwrap();
        let n_nodes = visible.node_tags.len();
        let n_commands = engine.commands.len();

        resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).unwrap();
        assert_eq!(visible.node_tags.len(), n_nodes);
        assert_eq!(engine.commands.len(), n_commands); // no duplicate creation or fix
    }

    #[test]
    fn unqualified_ties_are_left_alone() {
        let mut store = store_with_tie_across_boundary();
        store.add_node(20, 50.0, 0.0).unwrap();
        store.add_node(21, 60.0, 0.0).unwrap();
        store.ties_base.push(EqualDofTie { a: 20, b: 21, dofs: vec![1] });
        let mut engine = JournalEngine::new();
        let mut visible = visible_with_node_10(&mut engine);

        let family = resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).unwrap();
        assert_eq!(family.all.len(), 2);
        assert_eq!(family.qualified.len(), 1);
        assert!(!visible.node_tags.contains(&20));
        assert!(!visible.node_tags.contains(&21));
        assert_eq!(family.node_tags(), [10, 11, 20, 21]);
        assert_eq!(format!("{}", family), "base ties: 1 of 2 qualified");
    }

    #[test]
    fn tie_to_unknown_node_is_fatal() {
        let mut store = store_with_tie_across_boundary();
        store.ties_base.push(EqualDofTie { a: 10, b: 99, dofs: vec![1] });
        let mut engine = JournalEngine::new();
        let mut visible = visible_with_node_10(&mut engine);
        assert_eq!(
            resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).err(),
            Some("equal-DOF tie references a node absent from the global registry")
        );
    }

    #[test]
    fn node_present_in_solver_but_not_built_is_fatal() {
        let store = store_with_tie_across_boundary();
        let mut engine = JournalEngine::new();
        let mut visible = visible_with_node_10(&mut engine);
        engine.node(11, 10.0, 0.0).unwrap(); // solver knows it; the worker does not
        assert_eq!(
            resolve_tie_family(TieGroup::Base, &store, &mut visible, &mut engine).err(),
            Some("node is not built but is present in the solver")
        );
    }
}
