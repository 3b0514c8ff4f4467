use srsim::base::{GeometryStore, SampleSite, TieGroup};
use srsim::StrError;

// the on-disk fixture mirrors SampleSite::two_layer_store
#[test]
fn test_read_slope_small() -> Result<(), StrError> {
    let store = GeometryStore::read_dir("data/sites/slope_small", 7.5)?;
    let reference = SampleSite::two_layer_store(7.5);

    assert_eq!(store.nodes.len(), reference.nodes.len());
    for tag in reference.node_tags_sorted() {
        assert_eq!(store.nodes.get(&tag), reference.nodes.get(&tag));
    }

    assert_eq!(store.elements.len(), reference.elements.len());
    for tag in reference.element_tags_sorted() {
        let read = store.elements.get(&tag).unwrap();
        let want = reference.elements.get(&tag).unwrap();
        assert_eq!(read.nodes, want.nodes);
        assert_eq!(read.mat_tag, want.mat_tag);
        assert_eq!(read.vperm_param, None);
        assert_eq!(read.hperm_param, None);
    }

    // water level at 7.5: the surface row is undrained, not surface-fixed
    assert_eq!(store.fixed_bottom.len(), 5);
    assert_eq!(store.fixed_surface.len(), 0);
    assert_eq!(store.undrained.len(), 5);

    assert_eq!(store.ties(TieGroup::LeftEdge).len(), 3);
    assert_eq!(store.ties(TieGroup::RightEdge).len(), 3);
    assert_eq!(store.ties(TieGroup::Base).len(), 4);
    assert_eq!(store.masses.len(), 5);
    Ok(())
}

#[test]
fn test_read_missing_directory_fails() {
    assert_eq!(
        GeometryStore::read_dir("data/sites/no_such_site", 0.0).err(),
        Some("data directory does not exist")
    );
}
