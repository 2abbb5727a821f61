use clipweave_core::{
    evaluate_clip_at_local_time, parse_clip_json, Animator, ChangeTarget, ChannelMapper, ChannelMapping,
    Clip, Config, Engine, Interpolation, Joint, JointTransformComponent, MapperId, Skeleton, Value,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn approx_all(a: &[f32], b: &[f32], eps: f32) {
    assert_eq!(a.len(), b.len(), "left={a:?} right={b:?}");
    for (x, y) in a.iter().zip(b) {
        approx(*x, *y, eps);
    }
}

fn load_clips(name: &str) -> Vec<Clip> {
    let json = clipweave_test_fixtures::clips::json(name).expect("load clip fixture");
    parse_clip_json(&json).expect("parse clip fixture")
}

fn clip_named(clips: &[Clip], name: &str) -> Clip {
    clips
        .iter()
        .find(|c| c.name == name)
        .cloned()
        .unwrap_or_else(|| panic!("fixture has no clip '{name}'"))
}

fn cube_mapper(engine: &mut Engine) -> MapperId {
    let mappings: Vec<ChannelMapping> =
        clipweave_test_fixtures::mappings::load("cube").expect("load mapping fixture");
    let handler = engine.handler_mut();
    let ids = mappings.into_iter().map(|m| handler.add_mapping(m)).collect();
    handler.add_mapper(ChannelMapper::new(ids))
}

#[test]
fn every_clip_fixture_parses() {
    for key in clipweave_test_fixtures::clips::keys() {
        let clips = load_clips(&key);
        assert!(!clips.is_empty(), "fixture '{key}' has no clips");
        for clip in &clips {
            assert!(clip.duration > 0.0, "clip '{}' in '{key}'", clip.name);
        }
    }
}

#[test]
fn cube_move_loads_with_inferred_duration() {
    let clips = load_clips("cube-move");
    assert_eq!(clips.len(), 2);

    let mv = clip_named(&clips, "move");
    assert_eq!(mv.duration, 2.0);
    assert_eq!(mv.raw_component_count(), 3);
    let z = &mv.channels[0].components[2];
    assert_eq!(z.name, "Location Z");
    assert_eq!(z.curve.keyframes()[1].interpolation, Interpolation::Bezier);

    let raw = evaluate_clip_at_local_time(&mv, 0.5);
    approx_all(&raw, &[1.0, 1.0, 1.0], 1e-5);
    let raw = evaluate_clip_at_local_time(&mv, 1.0);
    approx_all(&raw, &[2.0, 1.0, 2.0], 1e-3);

    assert_eq!(clip_named(&clips, "spin").duration, 1.0);
}

#[test]
fn cube_mapping_drives_position_and_final_callback() {
    let mut engine = Engine::new(Config::sequential());
    let mapper = cube_mapper(&mut engine);
    let clip = engine
        .handler_mut()
        .add_clip(clip_named(&load_clips("cube-move"), "move"))
        .expect("clip");
    engine.add_animator(Animator::for_clip(clip, mapper));

    let out = engine.update(500_000_000);
    // Rotation and color are not animated by "move" and are left alone.
    assert_eq!(out.changes.len(), 1);
    assert!(matches!(
        &out.changes[0].target,
        ChangeTarget::Property { property, .. } if property == "position"
    ));
    match out.changes[0].value {
        Value::Vec3(v) => approx_all(&v, &[1.0, 1.0, 1.0], 1e-5),
        ref other => panic!("expected vec3, got {other:?}"),
    }
    assert_eq!(out.callbacks.len(), 1);
    assert!(!out.callbacks[0].should_invoke(false));

    let out = engine.update(1_500_000_000);
    assert!(out.changes[0].final_frame);
    match out.changes[0].value {
        Value::Vec3(v) => approx_all(&v, &[4.0, 1.0, 0.0], 1e-4),
        ref other => panic!("expected vec3, got {other:?}"),
    }
    assert!(out.callbacks[0].should_invoke(true));
}

#[test]
fn spin_rotation_is_slerped() {
    let mut engine = Engine::new(Config::sequential());
    let mapper = cube_mapper(&mut engine);
    let clip = engine
        .handler_mut()
        .add_clip(clip_named(&load_clips("cube-move"), "spin"))
        .expect("clip");
    engine.add_animator(Animator::for_clip(clip, mapper));

    let out = engine.update(500_000_000);
    assert_eq!(out.changes.len(), 1);
    assert!(out.callbacks.is_empty());
    let half = std::f32::consts::FRAC_PI_8;
    match out.changes[0].value {
        Value::Quat(q) => approx_all(&q, &[0.0, 0.0, half.sin(), half.cos()], 1e-5),
        ref other => panic!("expected quat, got {other:?}"),
    }
}

#[test]
fn skinned_wave_writes_joint_poses() {
    let mut engine = Engine::new(Config::sequential());
    let handler = engine.handler_mut();
    let skeleton = handler.add_skeleton(Skeleton::new(
        "arm",
        vec![Joint::new("shoulder"), Joint::new("elbow")],
    ));
    let mapping = handler.add_mapping(ChannelMapping::Skeleton { skeleton });
    let mapper = handler.add_mapper(ChannelMapper::new(vec![mapping]));
    let clip = handler
        .add_clip(clip_named(&load_clips("skinned-wave"), "wave"))
        .expect("clip");
    engine.add_animator(Animator::for_clip(clip, mapper));

    let out = engine.update(500_000_000);
    let joints: Vec<(usize, JointTransformComponent, &Value)> = out
        .changes
        .iter()
        .filter_map(|c| match &c.target {
            ChangeTarget::Joint {
                joint_index,
                component,
                ..
            } => Some((*joint_index, *component, &c.value)),
            _ => None,
        })
        .collect();
    assert_eq!(joints.len(), 2);

    assert_eq!((joints[0].0, joints[0].1), (0, JointTransformComponent::Translation));
    match joints[0].2 {
        Value::Vec3(v) => approx_all(v, &[0.25, 0.0, 0.0], 1e-6),
        other => panic!("expected vec3, got {other:?}"),
    }

    assert_eq!((joints[1].0, joints[1].1), (1, JointTransformComponent::Rotation));
    let s = std::f32::consts::FRAC_1_SQRT_2;
    match joints[1].2 {
        Value::Quat(q) => approx_all(q, &[s, 0.0, 0.0, s], 1e-5),
        other => panic!("expected quat, got {other:?}"),
    }
}
