use crate::base::{EqualDofTie, FixedNode, NodalMass, Node, QuadUpElement, TieGroup};
use crate::StrError;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Defines the standard filename for node records
pub const NODE_RECORDS: &str = "nodeInfo.dat";

/// Defines the standard filename for element records
pub const ELEMENT_RECORDS: &str = "elementInfo.dat";

/// Defines the standard filename for fixed-DOF records
pub const FIXED_NODE_RECORDS: &str = "fixedNodeInfo.dat";

/// Defines the standard filename for left-edge equal-DOF records
pub const TIE_RECORDS_LEFT: &str = "EqualDOFnodes_01_Info.dat";

/// Defines the standard filename for right-edge equal-DOF records
pub const TIE_RECORDS_RIGHT: &str = "EqualDOFnodes_02_Info.dat";

/// Defines the standard filename for base equal-DOF records
pub const TIE_RECORDS_BASE: &str = "EqualDOFnodes_Base_Info.dat";

/// Defines the standard filename for nodal-mass records
pub const MASS_RECORDS: &str = "massInfo.dat";

/// Holds the raw geometry, boundary, constraint, and mass records of the whole mesh
///
/// This is an append-only arena addressed by tag: collections are read once at
/// startup and may only grow afterwards (e.g. when the absorbing-boundary
/// nodes are synthesized). The store has no partition awareness; worker-visible
/// subsets are sets of tags into this arena.
#[derive(Clone, Debug)]
pub struct GeometryStore {
    /// Water level used to classify surface versus undrained fixes
    pub water_level: f64,

    /// All nodes of the mesh, keyed by tag
    pub nodes: HashMap<usize, Node>,

    /// All coupled solid-fluid elements, keyed by tag
    pub elements: HashMap<usize, QuadUpElement>,

    /// Bottom nodes with the vertical DOF fixed (mask `[0,1,0]`)
    pub fixed_bottom: Vec<FixedNode>,

    /// Surface nodes below the water level with the pore pressure fixed (mask `[0,0,1]`)
    pub fixed_surface: Vec<FixedNode>,

    /// Nodes at or above the water level, undrained (mask `[0,0,1]`)
    pub undrained: Vec<FixedNode>,

    /// Left-edge equal-DOF ties
    pub ties_left: Vec<EqualDofTie>,

    /// Right-edge equal-DOF ties
    pub ties_right: Vec<EqualDofTie>,

    /// Base equal-DOF ties
    pub ties_base: Vec<EqualDofTie>,

    /// Nodal-mass records
    pub masses: Vec<NodalMass>,

    undrained_classified: bool,
}

fn parse_usize(field: &str) -> Result<usize, StrError> {
    field.parse().map_err(|_| "cannot parse integer field")
}

fn parse_f64(field: &str) -> Result<f64, StrError> {
    field.parse().map_err(|_| "cannot parse real field")
}

/// Opens a record file, tolerating a missing path
///
/// Missing input files are deliberately non-fatal: the dependent collection is
/// left empty and callers that require it later fail with a lookup error.
fn open_records(path: &Path) -> Result<Option<BufReader<File>>, StrError> {
    if !path.exists() {
        log::warn!("record file {:?} not found; leaving the collection empty", path);
        return Ok(None);
    }
    let file = File::open(path).map_err(|_| "cannot open record file")?;
    Ok(Some(BufReader::new(file)))
}

impl GeometryStore {
    /// Allocates a new (empty) instance
    pub fn new(water_level: f64) -> Self {
        GeometryStore {
            water_level,
            nodes: HashMap::new(),
            elements: HashMap::new(),
            fixed_bottom: Vec::new(),
            fixed_surface: Vec::new(),
            undrained: Vec::new(),
            ties_left: Vec::new(),
            ties_right: Vec::new(),
            ties_base: Vec::new(),
            masses: Vec::new(),
            undrained_classified: false,
        }
    }

    /// Reads all record files with their standard names from a directory
    pub fn read_dir<P>(dir: &P, water_level: f64) -> Result<Self, StrError>
    where
        P: AsRef<Path> + ?Sized,
    {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            log::error!("data directory {:?} does not exist", dir);
            return Err("data directory does not exist");
        }
        let mut store = GeometryStore::new(water_level);
        store.read_nodes(&dir.join(NODE_RECORDS))?;
        store.read_elements(&dir.join(ELEMENT_RECORDS))?;
        store.read_fixed_nodes(&dir.join(FIXED_NODE_RECORDS))?;
        store.read_ties(TieGroup::LeftEdge, &dir.join(TIE_RECORDS_LEFT))?;
        store.read_ties(TieGroup::RightEdge, &dir.join(TIE_RECORDS_RIGHT))?;
        store.read_ties(TieGroup::Base, &dir.join(TIE_RECORDS_BASE))?;
        store.read_masses(&dir.join(MASS_RECORDS))?;
        store.classify_undrained();
        Ok(store)
    }

    /// Adds a node to the arena
    ///
    /// A repeated tag with identical coordinates is skipped with a warning;
    /// a repeated tag with different coordinates is a data-integrity error.
    pub fn add_node(&mut self, tag: usize, x: f64, y: f64) -> Result<(), StrError> {
        if let Some(existing) = self.nodes.get(&tag) {
            if existing.x == x && existing.y == y {
                log::warn!("{} already exists; not created", existing);
                return Ok(());
            }
            log::error!("node tag {} re-used with different coordinates", tag);
            return Err("node tag re-used with different coordinates");
        }
        self.nodes.insert(tag, Node { tag, x, y });
        Ok(())
    }

    /// Adds an element to the arena (repeated tags are skipped with a warning)
    pub fn add_element(&mut self, tag: usize, nodes: [usize; 4], mat_tag: usize) {
        if let Some(existing) = self.elements.get(&tag) {
            log::warn!("{} already exists; not created", existing);
            return;
        }
        self.elements.insert(tag, QuadUpElement::new(tag, nodes, mat_tag));
    }

    /// Reads node records `(tag, x, y)` from a file
    pub fn read_nodes(&mut self, path: &Path) -> Result<(), StrError> {
        let reader = match open_records(path)? {
            Some(r) => r,
            None => return Ok(()),
        };
        for line in reader.lines() {
            let line = line.map_err(|_| "cannot read line from node records")?;
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 3 {
                return Err("node record must have three fields: tag x y");
            }
            let tag = parse_usize(fields[0])?;
            let x = parse_f64(fields[1])?;
            let y = parse_f64(fields[2])?;
            self.add_node(tag, x, y)?;
        }
        Ok(())
    }

    /// Reads element records `(tag, n1, n2, n3, n4, materialTag)` from a file
    ///
    /// The file must only contain four-node quadrilateral u-p elements.
    pub fn read_elements(&mut self, path: &Path) -> Result<(), StrError> {
        let reader = match open_records(path)? {
            Some(r) => r,
            None => return Ok(()),
        };
        for line in reader.lines() {
            let line = line.map_err(|_| "cannot read line from element records")?;
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 6 {
                return Err("element record must have six fields: tag n1 n2 n3 n4 mat");
            }
            let tag = parse_usize(fields[0])?;
            let n1 = parse_usize(fields[1])?;
            let n2 = parse_usize(fields[2])?;
            let n3 = parse_usize(fields[3])?;
            let n4 = parse_usize(fields[4])?;
            let mat_tag = parse_usize(fields[5])?;
            self.add_element(tag, [n1, n2, n3, n4], mat_tag);
        }
        Ok(())
    }

    /// Reads fixed-DOF records `(tag, flags...)` from a file
    ///
    /// Only the masks `[0,1,0]` (bottom, vertical) and `[0,0,1]` (surface,
    /// pore pressure) are recognized; anything else is a configuration error.
    /// Surface records for nodes at or above the water level are dropped here
    /// because those nodes enter the undrained population instead.
    pub fn read_fixed_nodes(&mut self, path: &Path) -> Result<(), StrError> {
        let reader = match open_records(path)? {
            Some(r) => r,
            None => return Ok(()),
        };
        for line in reader.lines() {
            let line = line.map_err(|_| "cannot read line from fixed-DOF records")?;
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 4 {
                return Err("fixed-DOF record must have four fields: tag fx fy fp");
            }
            let tag = parse_usize(fields[0])?;
            let mask = [
                parse_usize(fields[1])? as u8,
                parse_usize(fields[2])? as u8,
                parse_usize(fields[3])? as u8,
            ];
            match mask {
                [0, 1, 0] => self.fixed_bottom.push(FixedNode { tag, mask }),
                [0, 0, 1] => {
                    let node = self
                        .nodes
                        .get(&tag)
                        .ok_or("fixed-DOF record references a node absent from the global registry")?;
                    if node.y < self.water_level {
                        self.fixed_surface.push(FixedNode { tag, mask });
                    }
                }
                _ => {
                    log::error!("fixed-DOF mask {:?} at node {} is not supported", mask, tag);
                    return Err("fixed-DOF mask is not supported");
                }
            }
        }
        Ok(())
    }

    /// Classifies the nodes at or above the water level as undrained
    ///
    /// The threshold is evaluated once; repeated calls are skipped with a warning.
    pub fn classify_undrained(&mut self) {
        if self.undrained_classified {
            log::warn!("undrained nodes already classified; not re-evaluated");
            return;
        }
        let mut tags: Vec<_> = self
            .nodes
            .values()
            .filter(|node| node.y >= self.water_level)
            .map(|node| node.tag)
            .collect();
        tags.sort();
        self.undrained = tags.into_iter().map(|tag| FixedNode { tag, mask: [0, 0, 1] }).collect();
        self.undrained_classified = true;
    }

    /// Reads equal-DOF tie records `(tagA, tagB, dofs...)` into one family
    pub fn read_ties(&mut self, group: TieGroup, path: &Path) -> Result<(), StrError> {
        let reader = match open_records(path)? {
            Some(r) => r,
            None => return Ok(()),
        };
        for line in reader.lines() {
            let line = line.map_err(|_| "cannot read line from equal-DOF records")?;
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err("equal-DOF record must have at least three fields: tagA tagB dofs...");
            }
            let a = parse_usize(fields[0])?;
            let b = parse_usize(fields[1])?;
            let dofs = fields[2..]
                .iter()
                .map(|f| parse_usize(f))
                .collect::<Result<Vec<_>, _>>()?;
            self.ties_mut(group).push(EqualDofTie { a, b, dofs });
        }
        Ok(())
    }

    /// Reads nodal-mass records `(tag, massX, massY, massP)` from a file
    pub fn read_masses(&mut self, path: &Path) -> Result<(), StrError> {
        let reader = match open_records(path)? {
            Some(r) => r,
            None => return Ok(()),
        };
        for line in reader.lines() {
            let line = line.map_err(|_| "cannot read line from nodal-mass records")?;
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 4 {
                return Err("nodal-mass record must have four fields: tag mx my mp");
            }
            let tag = parse_usize(fields[0])?;
            let mass = [parse_f64(fields[1])?, parse_f64(fields[2])?, parse_f64(fields[3])?];
            if mass.iter().any(|m| *m < 0.0) {
                log::debug!("negative mass component found at node {}", tag);
            }
            self.masses.push(NodalMass { tag, mass });
        }
        Ok(())
    }

    /// Returns one equal-DOF tie family
    pub fn ties(&self, group: TieGroup) -> &Vec<EqualDofTie> {
        match group {
            TieGroup::LeftEdge => &self.ties_left,
            TieGroup::RightEdge => &self.ties_right,
            TieGroup::Base => &self.ties_base,
        }
    }

    fn ties_mut(&mut self, group: TieGroup) -> &mut Vec<EqualDofTie> {
        match group {
            TieGroup::LeftEdge => &mut self.ties_left,
            TieGroup::RightEdge => &mut self.ties_right,
            TieGroup::Base => &mut self.ties_base,
        }
    }

    /// Returns the fixed-DOF mask known for a node, if any
    ///
    /// Searches the global fixed list (bottom and surface populations).
    pub fn fixed_mask_of(&self, tag: usize) -> Option<[u8; 3]> {
        self.fixed_bottom
            .iter()
            .chain(self.fixed_surface.iter())
            .find(|fixed| fixed.tag == tag)
            .map(|fixed| fixed.mask)
    }

    /// Returns the horizontal extent `(min x, max x)` of the node set
    pub fn x_extent(&self) -> Result<(f64, f64), StrError> {
        if self.nodes.is_empty() {
            return Err("the node set is empty");
        }
        let mut xmin = f64::MAX;
        let mut xmax = f64::MIN;
        for node in self.nodes.values() {
            xmin = f64::min(xmin, node.x);
            xmax = f64::max(xmax, node.x);
        }
        Ok((xmin, xmax))
    }

    /// Returns the largest node tag (0 if there are no nodes)
    pub fn max_node_tag(&self) -> usize {
        self.nodes.keys().max().copied().unwrap_or(0)
    }

    /// Returns the largest element tag (0 if there are no elements)
    pub fn max_element_tag(&self) -> usize {
        self.elements.keys().max().copied().unwrap_or(0)
    }

    /// Returns all node tags sorted ascending
    pub fn node_tags_sorted(&self) -> Vec<usize> {
        let mut tags: Vec<_> = self.nodes.keys().copied().collect();
        tags.sort();
        tags
    }

    /// Returns all element tags sorted ascending
    pub fn element_tags_sorted(&self) -> Vec<usize> {
        let mut tags: Vec<_> = self.elements.keys().copied().collect();
        tags.sort();
        tags
    }
}

impl fmt::Display for GeometryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Geometry store\n").unwrap();
        write!(f, "==============\n").unwrap();
        write!(f, "nodes = {}\n", self.nodes.len()).unwrap();
        write!(f, "elements = {}\n", self.elements.len()).unwrap();
        write!(f, "fixed_bottom = {}\n", self.fixed_bottom.len()).unwrap();
        write!(f, "fixed_surface = {}\n", self.fixed_surface.len()).unwrap();
        write!(f, "undrained = {}\n", self.undrained.len()).unwrap();
        write!(f, "ties = {} + {} + {}\n", self.ties_left.len(), self.ties_right.len(), self.ties_base.len()).unwrap();
        write!(f, "masses = {}\n", self.masses.len()).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::GeometryStore;
    use crate::base::{TieGroup, DEFAULT_TEST_DIR};
    use std::fs;
    use std::path::Path;

    fn write_test_file(name: &str, content: &str) -> std::path::PathBuf {
        fs::create_dir_all(DEFAULT_TEST_DIR).unwrap();
        let path = Path::new(DEFAULT_TEST_DIR).join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn add_node_handles_duplicates() {
        let mut store = GeometryStore::new(0.0);
        store.add_node(1, 0.0, 0.0).unwrap();
        store.add_node(1, 0.0, 0.0).unwrap(); // identical: warning only
        assert_eq!(store.nodes.len(), 1);
        assert_eq!(
            store.add_node(1, 2.0, 0.0).err(),
            Some("node tag re-used with different coordinates")
        );
    }

    #[test]
    fn read_nodes_and_elements_work() {
        let np = write_test_file("geom_nodes.dat", "1 0.0 0.0\n2 10.0 0.0\n\n3 0.0 5.0\n4 10.0 5.0\n");
        let ep = write_test_file("geom_elements.dat", "1 1 2 4 3 2\n");
        let mut store = GeometryStore::new(0.0);
        store.read_nodes(&np).unwrap();
        store.read_elements(&ep).unwrap();
        assert_eq!(store.nodes.len(), 4);
        assert_eq!(store.elements.len(), 1);
        assert_eq!(store.elements.get(&1).unwrap().nodes, [1, 2, 4, 3]);
        assert_eq!(store.max_node_tag(), 4);
        assert_eq!(store.max_element_tag(), 1);
        assert_eq!(store.x_extent().unwrap(), (0.0, 10.0));
    }

    #[test]
    fn missing_file_leaves_collection_empty() {
        let mut store = GeometryStore::new(0.0);
        store.read_nodes(Path::new("/no/such/nodeInfo.dat")).unwrap();
        assert!(store.nodes.is_empty());
        assert_eq!(store.x_extent().err(), Some("the node set is empty"));
    }

    #[test]
    fn malformed_records_are_fatal() {
        let path = write_test_file("geom_bad_nodes.dat", "1 0.0\n");
        let mut store = GeometryStore::new(0.0);
        assert_eq!(
            store.read_nodes(&path).err(),
            Some("node record must have three fields: tag x y")
        );
        let path = write_test_file("geom_bad_float.dat", "1 zero 0.0\n");
        assert_eq!(store.read_nodes(&path).err(), Some("cannot parse real field"));
    }

    #[test]
    fn fixed_nodes_are_classified_against_water_level() {
        let mut store = GeometryStore::new(4.0);
        store.add_node(1, 0.0, 0.0).unwrap();
        store.add_node(2, 0.0, 2.0).unwrap();
        store.add_node(3, 0.0, 8.0).unwrap();
        let path = write_test_file("geom_fixed.dat", "1 0 1 0\n2 0 0 1\n3 0 0 1\n");
        store.read_fixed_nodes(&path).unwrap();
        store.classify_undrained();
        // node 1 is bottom; node 2 is surface below water; node 3 is above water
        assert_eq!(store.fixed_bottom.len(), 1);
        assert_eq!(store.fixed_bottom[0].tag, 1);
        assert_eq!(store.fixed_surface.len(), 1);
        assert_eq!(store.fixed_surface[0].tag, 2);
        assert_eq!(store.undrained.len(), 1);
        assert_eq!(store.undrained[0].tag, 3);
        assert_eq!(store.undrained[0].mask, [0, 0, 1]);
        // the global fixed list covers bottom and surface only
        assert_eq!(store.fixed_mask_of(1), Some([0, 1, 0]));
        assert_eq!(store.fixed_mask_of(2), Some([0, 0, 1]));
        assert_eq!(store.fixed_mask_of(3), None);
    }

    #[test]
    fn unsupported_mask_is_fatal() {
        let mut store = GeometryStore::new(0.0);
        store.add_node(1, 0.0, 0.0).unwrap();
        let path = write_test_file("geom_bad_mask.dat", "1 1 1 0\n");
        assert_eq!(
            store.read_fixed_nodes(&path).err(),
            Some("fixed-DOF mask is not supported")
        );
    }

    #[test]
    fn fixed_record_for_unknown_node_is_fatal() {
        let mut store = GeometryStore::new(10.0);
        let path = write_test_file("geom_fixed_unknown.dat", "7 0 0 1\n");
        assert_eq!(
            store.read_fixed_nodes(&path).err(),
            Some("fixed-DOF record references a node absent from the global registry")
        );
    }

    #[test]
    fn read_ties_and_masses_work() {
        let tp = write_test_file("geom_ties.dat", "1 2 1\n6 7 1 2\n");
        let mp = write_test_file("geom_masses.dat", "1 0.5 0.5 0.0\n2 -0.1 0.5 0.0\n");
        let mut store = GeometryStore::new(0.0);
        store.read_ties(TieGroup::Base, &tp).unwrap();
        store.read_masses(&mp).unwrap();
        assert_eq!(store.ties(TieGroup::Base).len(), 2);
        assert_eq!(store.ties(TieGroup::Base)[1].dofs, [1, 2]);
        assert!(store.ties(TieGroup::LeftEdge).is_empty());
        assert_eq!(store.masses.len(), 2); // negative component reported, record kept
    }

    #[test]
    fn display_works() {
        let mut store = GeometryStore::new(0.0);
        store.add_node(1, 0.0, 0.0).unwrap();
        store.classify_undrained();
        assert_eq!(
            format!("{}", store),
            "Geometry store\n\
             ==============\n\
             nodes = 1\n\
             elements = 0\n\
             fixed_bottom = 0\n\
             fixed_surface = 0\n\
             undrained = 1\n\
             ties = 0 + 0 + 0\n\
             masses = 0\n"
        );
    }
}
