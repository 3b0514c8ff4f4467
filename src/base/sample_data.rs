use crate::base::{EqualDofTie, FixedNode, GeometryStore, MaterialCatalog, NodalMass, ParamElement, ParamSoil};

/// Holds programmatic site fixtures for tests and demonstrations
pub struct SampleSite {}

impl SampleSite {
    /// Returns a two-layer slope-free site with 15 nodes and 8 u-p elements
    ///
    /// ```text
    ///  y
    ///  ^
    /// 10  11---12---13---14---15     (2) silt (upper layer)
    ///      | [5]| [6]| [7]| [8]|     (1) sandy gravel (base layer)
    ///  5   6----7----8----9---10
    ///      | [1]| [2]| [3]| [4]|     [#] indicates element tag
    ///  0   1----2----3----4----5  -> x
    ///      0   10   20   30   40
    /// ```
    ///
    /// Bottom nodes carry the vertical fix `[0,1,0]`; surface nodes carry the
    /// pore-pressure fix `[0,0,1]` (kept only below the water level). The
    /// leftmost and rightmost element columns are the boundary columns: the
    /// left/right tie families pair them with their interior neighbors, and
    /// the base family ties every bottom node to the bottom-left corner.
    pub fn two_layer_store(water_level: f64) -> GeometryStore {
        let mut store = GeometryStore::new(water_level);

        // nodes (tag = 5 * row + col + 1)
        for row in 0..3 {
            for col in 0..5 {
                let tag = 5 * row + col + 1;
                store.add_node(tag, 10.0 * col as f64, 5.0 * row as f64).unwrap();
            }
        }

        // elements: base layer is sandy gravel (mat 2), upper layer is silt (mat 1)
        for col in 0..4 {
            let n = col + 1;
            store.add_element(col + 1, [n, n + 1, n + 6, n + 5], 2);
            store.add_element(col + 5, [n + 5, n + 6, n + 11, n + 10], 1);
        }

        // fixities: bottom vertical, surface pore pressure
        for tag in 1..=5 {
            store.fixed_bottom.push(FixedNode { tag, mask: [0, 1, 0] });
        }
        for tag in 11..=15 {
            if store.nodes.get(&tag).unwrap().y < water_level {
                store.fixed_surface.push(FixedNode { tag, mask: [0, 0, 1] });
            }
        }
        store.classify_undrained();

        // tie families
        for (a, b) in [(1, 2), (6, 7), (11, 12)] {
            store.ties_left.push(EqualDofTie { a, b, dofs: vec![1, 2] });
        }
        for (a, b) in [(5, 4), (10, 9), (15, 14)] {
            store.ties_right.push(EqualDofTie { a, b, dofs: vec![1, 2] });
        }
        for b in 2..=5 {
            store.ties_base.push(EqualDofTie { a: 1, b, dofs: vec![1] });
        }

        // nodal masses on the middle row
        for tag in 6..=10 {
            store.masses.push(NodalMass { tag, mass: [0.5, 0.5, 0.0] });
        }

        store
    }

    /// Returns the material catalog matching [SampleSite::two_layer_store]
    ///
    /// The third record (loose sand) is not referenced by any element; it
    /// exercises the catalog without entering the mesh.
    pub fn two_layer_catalog() -> MaterialCatalog {
        let mut catalog = MaterialCatalog::new();
        catalog.add("silt", 1, ParamSoil::sample_silt()).unwrap();
        catalog.add("sandy gravel", 2, ParamSoil::sample_sandy_gravel()).unwrap();
        catalog.add("loose sand", 3, ParamSoil::sample_loose_sand()).unwrap();
        catalog.set_element_props("silt", ParamElement::new(2.2e5, 1e-5)).unwrap();
        catalog.set_element_props("sandy gravel", ParamElement::new(6.7e6, 1e-3)).unwrap();
        catalog.set_element_props("loose sand", ParamElement::new(6.0e6, 1e-5)).unwrap();
        catalog
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::SampleSite;
    use crate::base::TieGroup;

    #[test]
    fn two_layer_store_works() {
        let store = SampleSite::two_layer_store(7.5);
        assert_eq!(store.nodes.len(), 15);
        assert_eq!(store.elements.len(), 8);
        assert_eq!(store.fixed_bottom.len(), 5);
        assert_eq!(store.fixed_surface.len(), 0); // surface row is above water
        assert_eq!(store.undrained.len(), 5);
        assert_eq!(store.ties(TieGroup::LeftEdge).len(), 3);
        assert_eq!(store.ties(TieGroup::RightEdge).len(), 3);
        assert_eq!(store.ties(TieGroup::Base).len(), 4);
        assert_eq!(store.masses.len(), 5);
        assert_eq!(store.x_extent().unwrap(), (0.0, 40.0));
        assert_eq!(store.elements.get(&1).unwrap().nodes, [1, 2, 7, 6]);
        assert_eq!(store.elements.get(&8).unwrap().nodes, [9, 10, 15, 14]);
    }

    #[test]
    fn high_water_level_keeps_surface_fixes() {
        let store = SampleSite::two_layer_store(12.0);
        assert_eq!(store.fixed_surface.len(), 5);
        assert_eq!(store.undrained.len(), 0);
    }

    #[test]
    fn two_layer_catalog_works() {
        let catalog = SampleSite::two_layer_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.tag_of("sandy gravel").unwrap(), 2);
        assert_eq!(catalog.element_props("silt").unwrap().vperm, 1e-5);
        assert_eq!(catalog.max_mat_tag(), 3);
    }
}
