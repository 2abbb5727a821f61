use clipweave_core::time::{final_frame_for_rate, is_final_frame_reversed};
use clipweave_core::{
    evaluation_data_for_animator, evaluation_data_for_clip, is_final_frame,
    local_time_from_elapsed_time, phase_from_elapsed_time, Clip,
};

#[test]
fn finite_loops_end_clamped_on_the_last_frame() {
    for duration in [0.5f64, 1.25, 2.0] {
        for loop_count in 1u32..=4 {
            let mut current_loop = 0;
            let mut local = 0.0;
            for step in 0..loop_count {
                local = local_time_from_elapsed_time(
                    local,
                    duration,
                    1.0,
                    duration,
                    loop_count,
                    &mut current_loop,
                );
                let last = step + 1 == loop_count;
                assert_eq!(
                    is_final_frame(local, duration, current_loop, loop_count),
                    last,
                    "duration={duration} loops={loop_count} step={step}"
                );
                assert!(local <= duration);
            }
            assert_eq!(current_loop, loop_count - 1);
            assert_eq!(local, duration);
        }
    }
}

#[test]
fn infinite_loops_are_never_final() {
    let mut current_loop = 0;
    let mut local = 0.0;
    for elapsed in [0.3, 2.0, 7.75, 100.0, 0.01] {
        local = local_time_from_elapsed_time(local, elapsed, 1.0, 2.0, 0, &mut current_loop);
        assert!(local >= 0.0 && local < 2.0);
        assert!(!is_final_frame(local, 2.0, current_loop, 0));
    }
    assert!(current_loop > 50);
}

#[test]
fn two_loop_scenario() {
    let clip = Clip::new("empty", Vec::new()).with_duration(2.0);

    let data = evaluation_data_for_animator(2, 0, 0.0, 1.0, 2_500_000_000);
    let first = evaluation_data_for_clip(&clip, &data);
    assert_eq!(first.local_time, 0.5);
    assert_eq!(first.current_loop, 1);
    assert!(!first.is_final_frame);

    let data = evaluation_data_for_animator(2, first.current_loop, first.local_time, 1.0, 2_000_000_000);
    let second = evaluation_data_for_clip(&clip, &data);
    assert_eq!(second.local_time, 2.0);
    assert_eq!(second.current_loop, 1);
    assert!(second.is_final_frame);
}

#[test]
fn playback_rate_scales_elapsed_time() {
    let mut current_loop = 0;
    let local = local_time_from_elapsed_time(0.0, 0.25, 4.0, 2.0, 1, &mut current_loop);
    assert_eq!(local, 1.0);

    let mut current_loop = 0;
    let phase = phase_from_elapsed_time(0.0, 0.25, 4.0, 2.0, 1, &mut current_loop);
    assert_eq!(phase, 0.5);
}

#[test]
fn reverse_playback_finishes_at_zero_on_loop_zero() {
    let mut current_loop = 1;
    let mut local = 2.0;
    local = local_time_from_elapsed_time(local, 1.5, -1.0, 2.0, 2, &mut current_loop);
    assert_eq!((local, current_loop), (0.5, 1));
    assert!(!final_frame_for_rate(-1.0, local, 2.0, current_loop, 2));

    local = local_time_from_elapsed_time(local, 1.0, -1.0, 2.0, 2, &mut current_loop);
    assert_eq!((local, current_loop), (1.5, 0));

    local = local_time_from_elapsed_time(local, 10.0, -1.0, 2.0, 2, &mut current_loop);
    assert_eq!((local, current_loop), (0.0, 0));
    assert!(is_final_frame_reversed(local, current_loop, 2));
    assert!(final_frame_for_rate(-1.0, local, 2.0, current_loop, 2));
}

#[test]
fn degenerate_clips_hold_a_static_pose() {
    let clip = Clip::new("static", Vec::new());
    assert_eq!(clip.duration, 0.0);
    let data = evaluation_data_for_animator(0, 3, 0.0, 1.0, 1_000_000_000);
    let eval = evaluation_data_for_clip(&clip, &data);
    assert_eq!(eval.local_time, 0.0);
    assert_eq!(eval.current_loop, 3);
    assert!(!eval.is_final_frame);
}
