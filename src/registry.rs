//! Class registry: type name to factory, plus declared schema lineages.
//!
//! The registry is the importer's only way to turn a class name back into a
//! live object, and the exporter's source for the schema-version vector
//! stamped on every emitted node. A lineage lists a type and its ancestors,
//! most-derived first, each with the schema version currently declared for
//! that level; the stored vector in a document is resolved against it when
//! an object asks which version of an ancestor's layout it was written with.

use std::collections::HashMap;

use crate::error::LoadError;
use crate::object::ObjectRef;

struct ClassEntry {
    factory: fn() -> ObjectRef,
    /// `(type name, declared version)` pairs, most-derived first.
    lineage: Vec<(&'static str, u32)>,
}

/// Name-keyed factory and schema-version table for every serializable type.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<&'static str, ClassEntry>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with no serializable ancestors.
    pub fn register(&mut self, type_name: &'static str, version: u32, factory: fn() -> ObjectRef) {
        self.register_with_lineage(&[(type_name, version)], factory);
    }

    /// Register a type together with its ancestor lineage, most-derived
    /// first. The first entry names the concrete type.
    pub fn register_with_lineage(
        &mut self,
        lineage: &[(&'static str, u32)],
        factory: fn() -> ObjectRef,
    ) {
        let type_name = lineage[0].0;
        self.classes.insert(
            type_name,
            ClassEntry {
                factory,
                lineage: lineage.to_vec(),
            },
        );
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.classes.contains_key(type_name)
    }

    /// Construct a new, empty object of the named type.
    pub fn instantiate(&self, type_name: &str) -> Result<ObjectRef, LoadError> {
        let entry = self
            .classes
            .get(type_name)
            .ok_or_else(|| LoadError::UnknownClass {
                class_name: type_name.to_owned(),
            })?;
        Ok((entry.factory)())
    }

    /// The version vector stamped on nodes of the named type, one entry per
    /// lineage level.
    pub fn declared_versions(&self, type_name: &str) -> Option<Vec<u32>> {
        self.classes
            .get(type_name)
            .map(|entry| entry.lineage.iter().map(|&(_, v)| v).collect())
    }

    /// Resolve the schema version a document stored for one ancestor of a
    /// type.
    ///
    /// A document without a version vector is pre-versioning data: every
    /// ancestor resolves to 0, as does anything written at format version 0.
    /// A stored vector shorter than today's lineage yields 0 for the missing
    /// levels (the ancestor did not exist when the document was written).
    pub fn resolved_version(
        &self,
        type_name: &str,
        ancestor: &str,
        stored: Option<&[u32]>,
        format_version: u32,
    ) -> Result<u32, LoadError> {
        let entry = self
            .classes
            .get(type_name)
            .ok_or_else(|| LoadError::UnknownClass {
                class_name: type_name.to_owned(),
            })?;
        let index = entry
            .lineage
            .iter()
            .position(|&(name, _)| name == ancestor)
            .ok_or_else(|| LoadError::UnknownAncestor {
                class_name: type_name.to_owned(),
                ancestor: ancestor.to_owned(),
            })?;

        let Some(stored) = stored else {
            return Ok(0);
        };
        if format_version == 0 {
            return Ok(0);
        }
        Ok(stored.get(index).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::input_capsule::InputCapsule;
    use crate::object::{object_ref, SceneObject};
    use crate::output_capsule::OutputCapsule;
    use crate::SaveError;
    use std::any::Any;

    struct Probe;

    impl SceneObject for Probe {
        fn type_name(&self) -> &'static str {
            "test.Probe"
        }

        fn write(&self, _out: &mut OutputCapsule<'_, '_>) -> Result<(), SaveError> {
            Ok(())
        }

        fn read(&mut self, _input: &mut InputCapsule<'_, '_>) -> Result<(), LoadError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.register_with_lineage(
            &[("test.Probe", 3), ("test.Base", 1)],
            || object_ref(Probe),
        );
        registry
    }

    #[test]
    fn declared_versions_follow_lineage() {
        assert_eq!(registry().declared_versions("test.Probe"), Some(vec![3, 1]));
        assert_eq!(registry().declared_versions("test.Missing"), None);
    }

    #[test]
    fn instantiate_unknown_class_fails() {
        let err = registry().instantiate("test.Missing").unwrap_err();
        assert!(matches!(err, LoadError::UnknownClass { .. }));
    }

    #[test]
    fn resolved_version_reads_stored_vector() {
        let registry = registry();
        let stored = [4u32, 2];
        assert_eq!(
            registry
                .resolved_version("test.Probe", "test.Base", Some(&stored), 2)
                .unwrap(),
            2
        );
        assert_eq!(
            registry
                .resolved_version("test.Probe", "test.Probe", Some(&stored), 2)
                .unwrap(),
            4
        );
    }

    #[test]
    fn missing_vector_resolves_to_zero() {
        let registry = registry();
        assert_eq!(
            registry
                .resolved_version("test.Probe", "test.Base", None, 2)
                .unwrap(),
            0
        );
        // Short vectors zero-fill the levels they predate.
        assert_eq!(
            registry
                .resolved_version("test.Probe", "test.Base", Some(&[7]), 2)
                .unwrap(),
            0
        );
    }

    #[test]
    fn foreign_ancestor_is_rejected() {
        let err = registry()
            .resolved_version("test.Probe", "test.Stranger", Some(&[1, 1]), 2)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnknownAncestor { .. }));
    }
}
