use super::*;
use opal_types::FieldFlags;
use pretty_assertions::assert_eq;

fn field(
    registry: &TypeRegistry,
    name: &str,
    ty: TypeIdx,
    flags: FieldFlags,
) -> FieldDescriptor {
    FieldDescriptor::new(registry.intern(name), ty, flags)
}

#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn register_point(registry: &mut TypeRegistry) -> TypeIdx {
    let fields = vec![
        field(registry, "x", TypeIdx::INT32, FieldFlags::FLATTENABLE),
        field(registry, "y", TypeIdx::INT32, FieldFlags::FLATTENABLE),
    ];
    registry
        .register_value_type("Point", fields, vec![])
        .expect("Point should register")
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn scalar_fields_flatten_in_declaration_order() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, point).expect("Point should plan");

    assert_eq!(layout.flat_size, Some(8));
    assert_eq!(layout.flat_align, 4);
    assert_eq!(layout.instance.ref_len, 0);
    assert_eq!(
        layout.instance.slots[0].placement,
        FieldPlacement::Flattened {
            offset: 0,
            size: 4,
            ref_base: 0,
            ref_len: 0
        }
    );
    assert_eq!(
        layout.instance.slots[1].placement,
        FieldPlacement::Flattened {
            offset: 4,
            size: 4,
            ref_base: 0,
            ref_len: 0
        }
    );
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn natural_alignment_pads_offsets() {
    let mut registry = TypeRegistry::new();
    let fields = vec![
        field(&registry, "b", TypeIdx::BYTE, FieldFlags::FLATTENABLE),
        field(&registry, "l", TypeIdx::INT64, FieldFlags::FLATTENABLE),
        field(&registry, "i", TypeIdx::INT32, FieldFlags::FLATTENABLE),
    ];
    let ty = registry
        .register_value_type("Mixed", fields, vec![])
        .expect("Mixed should register");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, ty).expect("Mixed should plan");

    let offsets: Vec<u32> = layout
        .instance
        .slots
        .iter()
        .map(|s| match s.placement {
            FieldPlacement::Flattened { offset, .. } => offset,
            FieldPlacement::Boxed { .. } => u32::MAX,
        })
        .collect();
    assert_eq!(offsets, vec![0, 8, 16]);
    // 20 bytes of fields rounded up to 8-byte alignment.
    assert_eq!(layout.flat_size, Some(24));
    assert_eq!(layout.flat_align, 8);
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn unannotated_field_boxes() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);
    let fields = vec![
        field(&registry, "p", point, FieldFlags::FLATTENABLE),
        field(&registry, "q", point, FieldFlags::default()),
    ];
    let holder = registry
        .register_value_type("Holder", fields, vec![])
        .expect("Holder should register");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, holder).expect("Holder should plan");

    assert_eq!(
        layout.instance.slots[0].placement,
        FieldPlacement::Flattened {
            offset: 0,
            size: 8,
            ref_base: 0,
            ref_len: 0
        }
    );
    assert_eq!(
        layout.instance.slots[1].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
    assert!(layout.instance.slots[0].null_free);
    // No annotation: an ordinary nullable reference slot.
    assert!(!layout.instance.slots[1].null_free);
    assert_eq!(layout.instance.ref_len, 1);
    assert_eq!(layout.flat_size, Some(8));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn oversized_value_boxes_despite_annotation() {
    let mut registry = TypeRegistry::new();
    let jumbo_fields: Vec<FieldDescriptor> = (0..20)
        .map(|i| field(&registry, &format!("v{i}"), TypeIdx::INT64, FieldFlags::FLATTENABLE))
        .collect();
    let jumbo = registry
        .register_value_type("Jumbo", jumbo_fields, vec![])
        .expect("Jumbo should register");
    let holder = registry
        .register_value_type(
            "JumboHolder",
            vec![field(&registry, "j", jumbo, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("JumboHolder should register");

    let mut planner = LayoutPlanner::default();
    let jumbo_layout = planner.plan(&registry, jumbo).expect("Jumbo should plan");
    // The type itself has a flattened size; only fields of it box.
    assert_eq!(jumbo_layout.flat_size, Some(160));
    assert_eq!(
        planner
            .flattenable_size(&registry, jumbo)
            .expect("size query should succeed"),
        None
    );

    let layout = planner.plan(&registry, holder).expect("JumboHolder should plan");
    assert_eq!(
        layout.instance.slots[0].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
    // Physically boxed, but the declared null-free contract survives.
    assert!(layout.instance.slots[0].null_free);
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn nested_flattening_embeds_reference_slots() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);
    let inner = registry
        .register_value_type(
            "Inner",
            vec![
                field(&registry, "v", TypeIdx::INT32, FieldFlags::FLATTENABLE),
                field(&registry, "r", point, FieldFlags::default()),
            ],
            vec![],
        )
        .expect("Inner should register");
    let outer = registry
        .register_value_type(
            "Outer",
            vec![
                field(&registry, "first", inner, FieldFlags::FLATTENABLE),
                field(&registry, "second", inner, FieldFlags::FLATTENABLE),
            ],
            vec![],
        )
        .expect("Outer should register");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, outer).expect("Outer should plan");

    assert_eq!(
        layout.instance.slots[0].placement,
        FieldPlacement::Flattened {
            offset: 0,
            size: 4,
            ref_base: 0,
            ref_len: 1
        }
    );
    assert_eq!(
        layout.instance.slots[1].placement,
        FieldPlacement::Flattened {
            offset: 4,
            size: 4,
            ref_base: 1,
            ref_len: 1
        }
    );
    assert_eq!(layout.instance.ref_len, 2);
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn mutual_cycle_boxes_the_reentrant_link() {
    let mut registry = TypeRegistry::new();
    let a = registry.declare_value_type("A").expect("A should declare");
    let b = registry.declare_value_type("B").expect("B should declare");
    registry
        .define(a, vec![field(&registry, "b", b, FieldFlags::FLATTENABLE)], vec![])
        .expect("A should define");
    registry
        .define(b, vec![field(&registry, "a", a, FieldFlags::FLATTENABLE)], vec![])
        .expect("B should define");

    let mut planner = LayoutPlanner::default();
    let layout_a = planner.plan(&registry, a).expect("A should plan");
    let layout_b = planner.cached(b).expect("B planned during A");

    // B was laid out while A was in progress, so B's `a` field boxed,
    // terminating the cycle; A's `b` field then flattened.
    assert_eq!(
        layout_b.instance.slots[0].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
    assert!(layout_b.instance.slots[0].null_free);
    assert!(layout_a.instance.slots[0].placement.is_flattened());
}

#[test]
fn direct_self_flattening_is_fatal() {
    let mut registry = TypeRegistry::new();
    #[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
    let node = registry.declare_value_type("Node").expect("Node should declare");
    #[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
    registry
        .define(
            node,
            vec![field(&registry, "next", node, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("Node should define");

    let mut planner = LayoutPlanner::default();
    let result = planner.plan(&registry, node);
    assert!(matches!(
        result,
        Err(LayoutError::UnterminatedFlatteningCycle { .. })
    ));
    // Nothing partial was published.
    assert!(planner.cached(node).is_none());
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn static_self_reference_boxes_instead_of_failing() {
    let mut registry = TypeRegistry::new();
    let counter = registry
        .declare_value_type("Counter")
        .expect("Counter should declare");
    registry
        .define(
            counter,
            vec![
                field(
                    &registry,
                    "total",
                    counter,
                    FieldFlags::FLATTENABLE | FieldFlags::STATIC,
                ),
                field(&registry, "value", TypeIdx::INT32, FieldFlags::FLATTENABLE),
            ],
            vec![],
        )
        .expect("Counter should define");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, counter).expect("Counter should plan");
    assert_eq!(
        layout.statics.slots[0].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
    assert_eq!(layout.flat_size, Some(4));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn depth_limit_boxes_deep_chains() {
    let mut registry = TypeRegistry::new();
    let c1 = registry
        .register_value_type(
            "C1",
            vec![field(&registry, "v", TypeIdx::INT32, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("C1 should register");
    let c2 = registry
        .register_value_type(
            "C2",
            vec![field(&registry, "inner", c1, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("C2 should register");
    let c3 = registry
        .register_value_type(
            "C3",
            vec![field(&registry, "inner", c2, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("C3 should register");

    let config = LayoutConfig::default().with_max_flatten_depth(2);
    let mut planner = LayoutPlanner::new(config);
    let layout = planner.plan(&registry, c3).expect("C3 should plan");

    // C3 -> C2 flattens, but C2 -> C1 is past the depth cap and boxes.
    assert!(layout.instance.slots[0].placement.is_flattened());
    let c2_layout = planner.cached(c2).expect("C2 planned during C3");
    assert_eq!(
        c2_layout.instance.slots[0].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn unresolved_field_type_is_fatal() {
    let mut registry = TypeRegistry::new();
    let broken = registry
        .register_value_type(
            "Broken",
            vec![field(&registry, "f", TypeIdx::NONE, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("Broken should register");

    let mut planner = LayoutPlanner::default();
    assert!(matches!(
        planner.plan(&registry, broken),
        Err(LayoutError::UnresolvedFieldType { .. })
    ));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn declared_but_undefined_field_type_is_fatal() {
    let mut registry = TypeRegistry::new();
    let ghost = registry.declare_value_type("Ghost").expect("Ghost should declare");
    let holder = registry
        .register_value_type(
            "GhostHolder",
            vec![field(&registry, "g", ghost, FieldFlags::FLATTENABLE)],
            vec![],
        )
        .expect("GhostHolder should register");

    let mut planner = LayoutPlanner::default();
    assert!(matches!(
        planner.plan(&registry, holder),
        Err(LayoutError::UnresolvedFieldType { .. })
    ));
}

#[test]
fn planning_unknown_type_is_fatal() {
    let registry = TypeRegistry::new();
    let mut planner = LayoutPlanner::default();
    assert!(matches!(
        planner.plan(&registry, TypeIdx::from_raw(4242)),
        Err(LayoutError::TypeNotFinalized { .. })
    ));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn reference_types_plan_but_never_inline() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);
    let class = registry
        .register_reference_type(
            "Probe",
            vec![
                field(&registry, "fp", point, FieldFlags::FLATTENABLE),
                field(&registry, "np", point, FieldFlags::default()),
            ],
            vec![],
        )
        .expect("Probe should register");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, class).expect("Probe should plan");

    assert_eq!(layout.flat_size, None);
    assert!(layout.instance.slots[0].placement.is_flattened());
    assert_eq!(
        layout.instance.slots[1].placement,
        FieldPlacement::Boxed { slot: 0 }
    );
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn planning_is_memoized() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);

    let mut planner = LayoutPlanner::default();
    let first = planner.plan(&registry, point).expect("Point should plan");
    let second = planner.plan(&registry, point).expect("Point should replan");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
#[expect(clippy::expect_used, reason = "Test code uses expect for clarity")]
fn statics_get_their_own_region() {
    let mut registry = TypeRegistry::new();
    let point = register_point(&mut registry);
    let ty = registry
        .register_reference_type(
            "WithStatics",
            vec![
                field(
                    &registry,
                    "shared",
                    point,
                    FieldFlags::FLATTENABLE | FieldFlags::STATIC,
                ),
                field(&registry, "own", point, FieldFlags::FLATTENABLE),
            ],
            vec![],
        )
        .expect("WithStatics should register");

    let mut planner = LayoutPlanner::default();
    let layout = planner.plan(&registry, ty).expect("WithStatics should plan");

    assert_eq!(layout.statics.slots.len(), 1);
    assert_eq!(layout.instance.slots.len(), 1);
    assert_eq!(layout.statics.byte_len, 8);
    assert_eq!(layout.instance.byte_len, 8);
    let (fref, slot) = layout.resolve(0).expect("shared resolves");
    assert!(fref.is_static);
    assert_eq!(slot.ty, point);
}
