use std::any::Any;

use scene_codec::{
    downcast_ref, object_ref, ClassRegistry, Exporter, Importer, InputCapsule, LoadError,
    OutputCapsule, SaveError, SceneObject, FORMAT_VERSION, SIGNATURE,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test object with a two-level schema lineage
// ---------------------------------------------------------------------------

/// Records which schema versions its read pass resolved, so tests can see
/// exactly what the document claimed.
#[derive(Default)]
struct Emitter {
    rate: f32,
    seen_emitter_version: u32,
    seen_base_version: u32,
}

impl SceneObject for Emitter {
    fn type_name(&self) -> &'static str {
        "fx.Emitter"
    }

    fn write(&self, out: &mut OutputCapsule<'_, '_>) -> Result<(), SaveError> {
        out.write(self.rate, "rate", 0.0)?;
        Ok(())
    }

    fn read(&mut self, input: &mut InputCapsule<'_, '_>) -> Result<(), LoadError> {
        self.seen_emitter_version = input.version_of("fx.Emitter")?;
        self.seen_base_version = input.version_of("fx.Effect")?;
        self.rate = input.read("rate", 0.0)?;
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
    registry.register_with_lineage(&[("fx.Emitter", 3), ("fx.Effect", 1)], || {
        object_ref(Emitter::default())
    });
    registry
}

// ---------------------------------------------------------------------------
// Metadata and version vectors
// ---------------------------------------------------------------------------

#[test]
fn version_vector_is_stamped_and_resolved() {
    let registry = registry();
    let root = object_ref(Emitter {
        rate: 9.0,
        ..Default::default()
    });

    let document = Exporter::new(&registry).export(&root).unwrap();
    assert_eq!(document["metadata"]["signature"], json!(SIGNATURE));
    assert_eq!(document["metadata"]["formatVersion"], json!(FORMAT_VERSION));
    assert_eq!(document["root"]["versions"], json!([3, 1]));

    let restored = Importer::new(&registry).import(document).unwrap();
    let emitter = downcast_ref::<Emitter>(&restored).unwrap();
    assert_eq!(emitter.rate, 9.0);
    assert_eq!(emitter.seen_emitter_version, 3);
    assert_eq!(emitter.seen_base_version, 1);
}

#[test]
fn unrecognized_signature_reads_as_format_zero() {
    let registry = registry();
    let root = object_ref(Emitter {
        rate: 2.0,
        ..Default::default()
    });

    let mut document = Exporter::new(&registry).export(&root).unwrap();
    document["metadata"]["signature"] = json!(12345);

    // Pre-signature documents also resolve every ancestor to version 0.
    let restored = Importer::new(&registry).import(document).unwrap();
    let emitter = downcast_ref::<Emitter>(&restored).unwrap();
    assert_eq!(emitter.rate, 2.0);
    assert_eq!(emitter.seen_emitter_version, 0);
    assert_eq!(emitter.seen_base_version, 0);
}

#[test]
fn missing_version_vector_resolves_to_zero() {
    let registry = registry();
    let root = object_ref(Emitter::default());

    let mut document = Exporter::new(&registry).export(&root).unwrap();
    document["root"].as_object_mut().unwrap().remove("versions");

    let restored = Importer::new(&registry).import(document).unwrap();
    let emitter = downcast_ref::<Emitter>(&restored).unwrap();
    assert_eq!(emitter.seen_emitter_version, 0);
    assert_eq!(emitter.seen_base_version, 0);
}

#[test]
fn future_format_version_is_rejected() {
    let registry = registry();
    let root = object_ref(Emitter::default());

    let mut document = Exporter::new(&registry).export(&root).unwrap();
    document["metadata"]["formatVersion"] = json!(FORMAT_VERSION + 1);

    let err = Importer::new(&registry).import(document).unwrap_err();
    match err {
        LoadError::FutureVersion { found, supported } => {
            assert_eq!(found, u64::from(FORMAT_VERSION) + 1);
            assert_eq!(supported, FORMAT_VERSION);
        }
        other => panic!("expected FutureVersion, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Structural corruption
// ---------------------------------------------------------------------------

#[test]
fn missing_metadata_is_corrupt() {
    let registry = registry();
    let err = Importer::new(&registry)
        .import(json!({ "root": {} }))
        .unwrap_err();
    assert!(matches!(err, LoadError::Corrupt { node: "metadata" }));
}

#[test]
fn missing_root_is_corrupt() {
    let registry = registry();
    let document = json!({
        "metadata": { "signature": SIGNATURE, "formatVersion": FORMAT_VERSION }
    });
    let err = Importer::new(&registry).import(document).unwrap_err();
    assert!(matches!(err, LoadError::Corrupt { node: "root" }));
}

#[test]
fn object_node_without_class_fails() {
    let registry = registry();
    let document = json!({
        "metadata": { "signature": SIGNATURE, "formatVersion": FORMAT_VERSION },
        "root": { "id": "fx.Emitter@0" }
    });
    let err = Importer::new(&registry).import(document).unwrap_err();
    assert!(matches!(err, LoadError::MissingClass));
}

#[test]
fn object_node_without_id_fails() {
    let registry = registry();
    let document = json!({
        "metadata": { "signature": SIGNATURE, "formatVersion": FORMAT_VERSION },
        "root": { "class": "fx.Emitter" }
    });
    let err = Importer::new(&registry).import(document).unwrap_err();
    assert!(matches!(err, LoadError::MissingId { .. }));
}

#[test]
fn unknown_class_fails() {
    let registry = registry();
    let document = json!({
        "metadata": { "signature": SIGNATURE, "formatVersion": FORMAT_VERSION },
        "root": { "class": "fx.Vanished", "id": "fx.Vanished@0" }
    });
    let err = Importer::new(&registry).import(document).unwrap_err();
    assert!(matches!(err, LoadError::UnknownClass { .. }));
}

#[test]
fn unresolved_reference_fails() {
    let registry = registry();
    let document = json!({
        "metadata": { "signature": SIGNATURE, "formatVersion": FORMAT_VERSION },
        "root": { "reference": "fx.Emitter@99" }
    });
    let err = Importer::new(&registry).import(document).unwrap_err();
    match err {
        LoadError::UnresolvedReference { id } => assert_eq!(id, "fx.Emitter@99"),
        other => panic!("expected UnresolvedReference, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Type mismatches
// ---------------------------------------------------------------------------

#[test]
fn wrong_kind_scalar_fails() {
    let registry = registry();
    let root = object_ref(Emitter {
        rate: 4.0,
        ..Default::default()
    });
    let mut document = Exporter::new(&registry).export(&root).unwrap();
    document["root"]["sc.rate"] = json!("fast");

    let err = Importer::new(&registry).import(document).unwrap_err();
    match err {
        LoadError::TypeMismatch {
            field, expected, ..
        } => {
            assert_eq!(field, "rate");
            assert_eq!(expected, "f32");
        }
        other => panic!("expected TypeMismatch, got {other}"),
    }
}

#[test]
fn unknown_ancestor_fails() {
    let mut registry = registry();
    struct Stray;
    impl SceneObject for Stray {
        fn type_name(&self) -> &'static str {
            "fx.Stray"
        }
        fn write(&self, _out: &mut OutputCapsule<'_, '_>) -> Result<(), SaveError> {
            Ok(())
        }
        fn read(&mut self, input: &mut InputCapsule<'_, '_>) -> Result<(), LoadError> {
            input.version_of("fx.Unrelated")?;
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    registry.register("fx.Stray", 1, || object_ref(Stray));
    let root = object_ref(Stray);
    let document = Exporter::new(&registry).export(&root).unwrap();
    let err = Importer::new(&registry).import(document).unwrap_err();
    assert!(matches!(err, LoadError::UnknownAncestor { .. }));
}

#[test]
fn exporting_an_unregistered_class_fails() {
    let registry = ClassRegistry::new();
    let root = object_ref(Emitter::default());
    let err = Exporter::new(&registry).export(&root).unwrap_err();
    assert!(matches!(err, SaveError::UnknownClass { .. }));
}
