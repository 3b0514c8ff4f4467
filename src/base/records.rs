use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds one node of the global mesh
///
/// The tag is globally unique across the whole mesh; worker-visible subsets
/// are sets of tags into the arena, never copies with different tags.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Node {
    /// Globally unique identification tag
    pub tag: usize,

    /// Horizontal coordinate
    pub x: f64,

    /// Vertical coordinate
    pub y: f64,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}) at ({:?}, {:?})", self.tag, self.x, self.y)
    }
}

/// Holds one four-node quadrilateral coupled solid-fluid (u-p) element
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuadUpElement {
    /// Globally unique identification tag
    pub tag: usize,

    /// Node tags in corner-winding order (the order is significant)
    pub nodes: [usize; 4],

    /// Material tag referencing the catalog
    pub mat_tag: usize,

    /// Parameter handle for the vertical permeability
    ///
    /// Populated only after the element has been instantiated in the solver.
    pub vperm_param: Option<usize>,

    /// Parameter handle for the horizontal permeability
    ///
    /// Populated only after the element has been instantiated in the solver.
    pub hperm_param: Option<usize>,
}

impl QuadUpElement {
    /// Allocates a new instance with unset permeability parameter handles
    pub fn new(tag: usize, nodes: [usize; 4], mat_tag: usize) -> Self {
        QuadUpElement {
            tag,
            nodes,
            mat_tag,
            vperm_param: None,
            hperm_param: None,
        }
    }
}

impl fmt::Display for QuadUpElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuadUp({}) nodes {:?} material {}",
            self.tag, self.nodes, self.mat_tag
        )
    }
}

/// Holds one node with prescribed fixed degrees of freedom
///
/// Recognized masks are `[0,1,0]` (vertical, bottom nodes) and `[0,0,1]`
/// (pore pressure, surface or undrained nodes).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct FixedNode {
    /// Node tag
    pub tag: usize,

    /// Fixed-DOF mask (1 = fixed)
    pub mask: [u8; 3],
}

impl fmt::Display for FixedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedNode({}) mask {:?}", self.tag, self.mask)
    }
}

/// Holds one equal-DOF tie forcing two nodes to share displacement DOFs
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EqualDofTie {
    /// First (retained/master) node tag
    pub a: usize,

    /// Second (constrained) node tag
    pub b: usize,

    /// One-based DOF indices to tie
    pub dofs: Vec<usize>,
}

impl EqualDofTie {
    /// Returns true if the tie involves the given node tag
    pub fn involves(&self, tag: usize) -> bool {
        self.a == tag || self.b == tag
    }
}

impl fmt::Display for EqualDofTie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EqualDof({}, {}) dofs {:?}", self.a, self.b, self.dofs)
    }
}

/// Holds one nodal mass record
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodalMass {
    /// Node tag
    pub tag: usize,

    /// Mass components (x, y, pore pressure)
    pub mass: [f64; 3],
}

impl fmt::Display for NodalMass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodalMass({}) {:?}", self.tag, self.mass)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{EqualDofTie, FixedNode, NodalMass, Node, QuadUpElement};

    #[test]
    fn display_works() {
        let node = Node { tag: 7, x: 1.5, y: -2.0 };
        assert_eq!(format!("{}", node), "Node(7) at (1.5, -2.0)");

        let ele = QuadUpElement::new(3, [1, 2, 6, 5], 2);
        assert_eq!(format!("{}", ele), "QuadUp(3) nodes [1, 2, 6, 5] material 2");
        assert_eq!(ele.vperm_param, None);
        assert_eq!(ele.hperm_param, None);

        let fix = FixedNode { tag: 1, mask: [0, 1, 0] };
        assert_eq!(format!("{}", fix), "FixedNode(1) mask [0, 1, 0]");

        let mass = NodalMass { tag: 4, mass: [0.5, 0.5, 0.0] };
        assert_eq!(format!("{}", mass), "NodalMass(4) [0.5, 0.5, 0.0]");
    }

    #[test]
    fn tie_involves_works() {
        let tie = EqualDofTie { a: 10, b: 11, dofs: vec![1, 2] };
        assert_eq!(format!("{}", tie), "EqualDof(10, 11) dofs [1, 2]");
        assert!(tie.involves(10));
        assert!(tie.involves(11));
        assert!(!tie.involves(12));
    }
}
