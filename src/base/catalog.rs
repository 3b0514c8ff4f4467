use crate::base::{ParamElement, ParamSoil};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Holds one named soil record of the catalog
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SoilRecord {
    /// Unique material tag
    pub mat_tag: usize,

    /// Constitutive-model parameters
    pub param: ParamSoil,
}

/// Holds the registry of named soil materials and their element properties
///
/// The two derived maps (tag to name and name to tag) stay consistent with the
/// catalog at all times: they are bijective on the tags actually present.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MaterialCatalog {
    records: HashMap<String, SoilRecord>,
    element_props: HashMap<String, ParamElement>,
    tag_to_name: HashMap<usize, String>,
    name_to_tag: HashMap<String, usize>,
}

impl MaterialCatalog {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        MaterialCatalog {
            records: HashMap::new(),
            element_props: HashMap::new(),
            tag_to_name: HashMap::new(),
            name_to_tag: HashMap::new(),
        }
    }

    /// Adds a named soil record
    ///
    /// Duplicate names and duplicate tags are rejected to keep the derived
    /// maps bijective.
    pub fn add(&mut self, name: &str, mat_tag: usize, param: ParamSoil) -> Result<&mut Self, StrError> {
        if self.records.contains_key(name) {
            log::error!("material name {:?} is already in the catalog", name);
            return Err("material name is already in the catalog");
        }
        if self.tag_to_name.contains_key(&mat_tag) {
            log::error!("material tag {} is already in the catalog", mat_tag);
            return Err("material tag is already in the catalog");
        }
        self.records.insert(name.to_string(), SoilRecord { mat_tag, param });
        self.tag_to_name.insert(mat_tag, name.to_string());
        self.name_to_tag.insert(name.to_string(), mat_tag);
        Ok(self)
    }

    /// Attaches element properties to an existing soil record
    pub fn set_element_props(&mut self, name: &str, props: ParamElement) -> Result<&mut Self, StrError> {
        if !self.records.contains_key(name) {
            log::error!("cannot attach element properties: {:?} is not in the catalog", name);
            return Err("cannot attach element properties to an unknown material");
        }
        if self.element_props.insert(name.to_string(), props).is_some() {
            log::warn!("element properties for {:?} already defined; replaced", name);
        }
        Ok(self)
    }

    /// Returns the soil record with the given name
    pub fn soil(&self, name: &str) -> Result<&SoilRecord, StrError> {
        self.records.get(name).ok_or("material name is not in the catalog")
    }

    /// Returns the material name for a given tag
    pub fn name_of(&self, mat_tag: usize) -> Result<&str, StrError> {
        match self.tag_to_name.get(&mat_tag) {
            Some(name) => Ok(name),
            None => {
                log::error!("material tag {} is not in the catalog", mat_tag);
                Err("material tag is not in the catalog")
            }
        }
    }

    /// Returns the material tag for a given name
    pub fn tag_of(&self, name: &str) -> Result<usize, StrError> {
        self.name_to_tag
            .get(name)
            .copied()
            .ok_or("material name is not in the catalog")
    }

    /// Returns the element properties of the material with the given name
    pub fn element_props(&self, name: &str) -> Result<&ParamElement, StrError> {
        self.element_props
            .get(name)
            .ok_or("material has no element properties")
    }

    /// Returns the element properties of the material with the given tag
    pub fn element_props_of_tag(&self, mat_tag: usize) -> Result<&ParamElement, StrError> {
        let name = self.name_of(mat_tag)?;
        self.element_props(name)
    }

    /// Returns the largest material tag in the catalog (0 if empty)
    pub fn max_mat_tag(&self) -> usize {
        self.tag_to_name.keys().max().copied().unwrap_or(0)
    }

    /// Returns the number of soil records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the catalog has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns all material tags sorted ascending
    pub fn tags_sorted(&self) -> Vec<usize> {
        let mut tags: Vec<_> = self.tag_to_name.keys().copied().collect();
        tags.sort();
        tags
    }
}

impl fmt::Display for MaterialCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Material catalog\n").unwrap();
        write!(f, "================\n").unwrap();
        for tag in self.tags_sorted() {
            let name = self.tag_to_name.get(&tag).unwrap();
            let record = self.records.get(name).unwrap();
            write!(f, "{} → {} ({})\n", tag, name, record.param.kind_name()).unwrap();
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::MaterialCatalog;
    use crate::base::{ParamElement, ParamSoil};

    #[test]
    fn add_and_lookup_work() {
        let mut catalog = MaterialCatalog::new();
        catalog
            .add("silt", 1, ParamSoil::sample_silt())
            .unwrap()
            .add("sandy gravel", 2, ParamSoil::sample_sandy_gravel())
            .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.tag_of("silt").unwrap(), 1);
        assert_eq!(catalog.name_of(2).unwrap(), "sandy gravel");
        assert_eq!(catalog.soil("silt").unwrap().mat_tag, 1);
        assert_eq!(catalog.max_mat_tag(), 2);
        assert_eq!(catalog.tags_sorted(), [1, 2]);
    }

    #[test]
    fn maps_stay_bijective() {
        let mut catalog = MaterialCatalog::new();
        catalog.add("silt", 1, ParamSoil::sample_silt()).unwrap();
        for tag in catalog.tags_sorted() {
            let name = catalog.name_of(tag).unwrap().to_string();
            assert_eq!(catalog.tag_of(&name).unwrap(), tag);
        }
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut catalog = MaterialCatalog::new();
        catalog.add("silt", 1, ParamSoil::sample_silt()).unwrap();
        assert_eq!(
            catalog.add("silt", 3, ParamSoil::sample_silt()).err(),
            Some("material name is already in the catalog")
        );
        assert_eq!(
            catalog.add("other", 1, ParamSoil::sample_silt()).err(),
            Some("material tag is already in the catalog")
        );
    }

    #[test]
    fn element_props_require_existing_record() {
        let mut catalog = MaterialCatalog::new();
        assert_eq!(
            catalog.set_element_props("silt", ParamElement::new(2.2e5, 1e-5)).err(),
            Some("cannot attach element properties to an unknown material")
        );
        catalog.add("silt", 1, ParamSoil::sample_silt()).unwrap();
        catalog.set_element_props("silt", ParamElement::new(2.2e5, 1e-5)).unwrap();
        assert_eq!(catalog.element_props("silt").unwrap().bulk, 2.2e5);
        assert_eq!(catalog.element_props_of_tag(1).unwrap().vperm, 1e-5);
        assert_eq!(
            catalog.element_props("sand").err(),
            Some("material has no element properties")
        );
    }

    #[test]
    fn lookup_errors_work() {
        let catalog = MaterialCatalog::new();
        assert_eq!(catalog.name_of(9).err(), Some("material tag is not in the catalog"));
        assert_eq!(catalog.tag_of("x").err(), Some("material name is not in the catalog"));
        assert_eq!(catalog.soil("x").err(), Some("material name is not in the catalog"));
        assert_eq!(catalog.max_mat_tag(), 0);
    }

    #[test]
    fn display_works() {
        let mut catalog = MaterialCatalog::new();
        catalog
            .add("silt", 1, ParamSoil::sample_silt())
            .unwrap()
            .add("sandy gravel", 2, ParamSoil::sample_sandy_gravel())
            .unwrap();
        assert_eq!(
            format!("{}", catalog),
            "Material catalog\n\
             ================\n\
             1 → silt (PressureIndependMultiYield)\n\
             2 → sandy gravel (PressureDependMultiYield02)\n"
        );
    }
}
