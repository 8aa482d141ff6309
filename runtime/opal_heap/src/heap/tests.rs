use super::*;
use opal_types::{FieldDescriptor, FieldFlags};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

struct Fixture {
    heap: Heap,
    point: TypeIdx,
    probe: TypeIdx,
}

/// A reference class mirroring a runtime probe: flattenable and
/// non-flattenable `Point` fields, in both static and instance forms.
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn fixture() -> Fixture {
    let mut registry = TypeRegistry::new();
    let x = registry.intern("x");
    let y = registry.intern("y");
    let point = registry
        .register_value_type(
            "Point",
            vec![
                FieldDescriptor::new(x, TypeIdx::INT32, FieldFlags::FLATTENABLE),
                FieldDescriptor::new(y, TypeIdx::INT32, FieldFlags::FLATTENABLE),
            ],
            vec![],
        )
        .expect("Point should register");
    let probe = registry
        .register_reference_type(
            "Probe",
            vec![
                FieldDescriptor::new(
                    registry.intern("fsp"),
                    point,
                    FieldFlags::FLATTENABLE | FieldFlags::STATIC,
                ),
                FieldDescriptor::new(registry.intern("nfsp"), point, FieldFlags::STATIC),
                FieldDescriptor::new(registry.intern("fip"), point, FieldFlags::FLATTENABLE),
                FieldDescriptor::new(registry.intern("nfip"), point, FieldFlags::default()),
            ],
            vec![],
        )
        .expect("Probe should register");

    let mut heap = Heap::new(registry);
    heap.prepare(point).expect("Point should prepare");
    heap.prepare(probe).expect("Probe should prepare");
    Fixture { heap, point, probe }
}

impl Fixture {
    #[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
    fn point_value(&self, x: i32, y: i32) -> Value {
        let mut p = self.heap.alloc(self.point).expect("Point should alloc");
        self.heap
            .set_field_named(&mut p, "x", Some(Value::Int32(x)))
            .expect("x should write");
        self.heap
            .set_field_named(&mut p, "y", Some(Value::Int32(y)))
            .expect("y should write");
        Value::composite(p)
    }
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn alloc_requires_preparation() {
    let mut registry = TypeRegistry::new();
    let ty = registry
        .register_value_type("Lonely", vec![], vec![])
        .expect("Lonely should register");
    let heap = Heap::new(registry);
    assert!(matches!(
        heap.alloc(ty),
        Err(AccessError::NotPrepared { .. })
    ));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn preparation_is_idempotent() {
    let mut fx = fixture();
    let again = fx.heap.prepare(fx.point).expect("re-prepare should succeed");
    assert_eq!(again.ty, fx.point);
    assert!(fx.heap.is_prepared(fx.point));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn default_value_is_memoized_and_zero() {
    let fx = fixture();
    let a = fx.heap.default_value(fx.point).expect("default");
    let b = fx.heap.default_value(fx.point).expect("default");
    assert_eq!(a, b);
    assert_eq!(a, fx.point_value(0, 0));
    let (a, b) = (
        a.as_composite().expect("composite").clone(),
        b.as_composite().expect("composite").clone(),
    );
    assert!(Arc::ptr_eq(&a, &b));

    assert_eq!(
        fx.heap.default_value(TypeIdx::INT64).expect("scalar default"),
        Value::Int64(0)
    );
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn named_and_indexed_access_agree() {
    let fx = fixture();
    let mut probe = fx.heap.alloc(fx.probe).expect("Probe should alloc");
    let value = fx.point_value(10, 20);
    fx.heap
        .set_field_named(&mut probe, "fip", Some(value.clone()))
        .expect("fip should write");

    // fip is declaration index 2.
    let by_index = fx.heap.get_field(&probe, 2).expect("indexed read");
    let by_name = fx.heap.get_field_named(&probe, "fip").expect("named read");
    assert_eq!(by_index, by_name);
    assert_eq!(by_index, Some(value));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn statics_are_per_type_storage() {
    let mut fx = fixture();

    // Uninitialized: flattened static reads default, boxed static null.
    let fsp = fx
        .heap
        .get_static(fx.probe, "fsp")
        .expect("fsp should read");
    assert_eq!(fsp, Some(fx.point_value(0, 0)));
    assert_eq!(
        fx.heap.get_static(fx.probe, "nfsp").expect("nfsp should read"),
        None
    );

    let value = fx.point_value(3, 9);
    fx.heap
        .set_static(fx.probe, "fsp", Some(value.clone()))
        .expect("fsp should write");
    assert_eq!(
        fx.heap.get_static(fx.probe, "fsp").expect("fsp should read"),
        Some(value)
    );

    let err = fx
        .heap
        .set_static(fx.probe, "fsp", None)
        .expect_err("null to flattened static must fail");
    assert!(matches!(err, AccessError::NullExclusionViolation { .. }));

    fx.heap
        .set_static(fx.probe, "nfsp", None)
        .expect("null to boxed static must succeed");
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn cross_region_access_is_rejected() {
    let mut fx = fixture();
    let mut probe = fx.heap.alloc(fx.probe).expect("Probe should alloc");

    // fsp is static: instance access paths must refuse it.
    let err = fx
        .heap
        .get_field_named(&probe, "fsp")
        .expect_err("static via instance path");
    assert!(matches!(err, AccessError::StaticField { .. }));
    let err = fx
        .heap
        .set_field_named(&mut probe, "fsp", None)
        .expect_err("static via instance path");
    assert!(matches!(err, AccessError::StaticField { .. }));

    // fip is an instance field: the static path must refuse it.
    let err = fx
        .heap
        .get_static(fx.probe, "fip")
        .expect_err("instance via static path");
    assert!(matches!(err, AccessError::InstanceField { .. }));
    let err = fx
        .heap
        .set_static(fx.probe, "fip", None)
        .expect_err("instance via static path");
    assert!(matches!(err, AccessError::InstanceField { .. }));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn handles_enforce_the_same_contract() {
    let mut fx = fixture();
    let fip = fx.heap.handle(fx.probe, "fip").expect("fip handle");
    let nfip = fx.heap.handle(fx.probe, "nfip").expect("nfip handle");
    let fsp = fx.heap.handle(fx.probe, "fsp").expect("fsp handle");

    assert!(fip.is_flattened() && !fip.is_static());
    assert!(!nfip.is_flattened() && !nfip.is_static());
    assert!(fsp.is_flattened() && fsp.is_static());
    assert_eq!(fip.ty(), fx.point);

    let mut probe = fx.heap.alloc(fx.probe).expect("Probe should alloc");

    // The handle path enforces exactly what the direct path enforces.
    let err = fx
        .heap
        .set_with(&fip, &mut probe, None)
        .expect_err("null through handle must fail");
    assert!(matches!(err, AccessError::NullExclusionViolation { .. }));
    fx.heap
        .set_with(&nfip, &mut probe, None)
        .expect("null through handle to boxed field");

    let value = fx.point_value(7, 7);
    fx.heap
        .set_with(&fip, &mut probe, Some(value.clone()))
        .expect("write through handle");
    assert_eq!(
        fx.heap.get_with(&fip, &probe).expect("read through handle"),
        Some(value.clone())
    );
    assert_eq!(
        fx.heap.get_field_named(&probe, "fip").expect("direct read"),
        Some(value.clone())
    );

    // Static handle round-trip.
    let err = fx
        .heap
        .set_static_with(&fsp, None)
        .expect_err("null through static handle must fail");
    assert!(matches!(err, AccessError::NullExclusionViolation { .. }));
    fx.heap
        .set_static_with(&fsp, Some(value.clone()))
        .expect("static write through handle");
    assert_eq!(
        fx.heap.get_static_with(&fsp).expect("static read"),
        Some(value)
    );

    // Handles refuse the wrong target kind.
    assert!(matches!(
        fx.heap.get_with(&fsp, &probe),
        Err(AccessError::StaticField { .. })
    ));
    assert!(matches!(
        fx.heap.get_static_with(&fip),
        Err(AccessError::InstanceField { .. })
    ));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn handle_rejects_foreign_instances() {
    let fx = fixture();
    let fip = fx.heap.handle(fx.probe, "fip").expect("fip handle");
    let point = fx.heap.alloc(fx.point).expect("Point should alloc");
    assert!(matches!(
        fx.heap.get_with(&fip, &point),
        Err(AccessError::TypeMismatch { .. })
    ));
}

mod props {
    #![expect(clippy::expect_used, reason = "Test code uses expect for clarity")]

    use super::*;

    proptest! {
        /// Writing the same value twice leaves storage byte-for-byte
        /// identical to writing it once.
        #[test]
        fn double_write_idempotent(x in any::<i32>(), y in any::<i32>()) {
            let fx = fixture();
            let value = fx.point_value(x, y);

            let mut once = fx.heap.alloc(fx.probe).expect("alloc");
            fx.heap
                .set_field_named(&mut once, "fip", Some(value.clone()))
                .expect("write");

            let mut twice = fx.heap.alloc(fx.probe).expect("alloc");
            fx.heap
                .set_field_named(&mut twice, "fip", Some(value.clone()))
                .expect("write");
            fx.heap
                .set_field_named(&mut twice, "fip", Some(value))
                .expect("write");

            prop_assert_eq!(once.bytes(), twice.bytes());
        }

        /// A rejected null write never mutates the target cell.
        #[test]
        fn failed_null_write_has_no_effect(x in any::<i32>(), y in any::<i32>()) {
            let fx = fixture();
            let value = fx.point_value(x, y);
            let mut probe = fx.heap.alloc(fx.probe).expect("alloc");
            fx.heap
                .set_field_named(&mut probe, "fip", Some(value.clone()))
                .expect("write");

            let result = fx.heap.set_field_named(&mut probe, "fip", None);
            prop_assert!(result.is_err());
            prop_assert_eq!(
                fx.heap.get_field_named(&probe, "fip").expect("read"),
                Some(value)
            );
        }
    }
}
