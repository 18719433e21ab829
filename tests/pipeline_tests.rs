use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};
use overlay_tracker::config::UiSettings;
use overlay_tracker::engine::SharedState;
use overlay_tracker::math::Matrix4;
use overlay_tracker::memory::MemorySnapshot;
use overlay_tracker::projection::{FrameOutput, FrameParams, ProjectionPipeline};
use overlay_tracker::view::{CameraModel, MatrixKind, MatrixLocation, MatrixOrder, ViewError};

/// Camera at the origin looking down +z with a 90 degree field of view
fn state_at_origin() -> SharedState {
    let mut camera = CameraModel::new(FRAC_PI_2);
    camera.set_matrix(MatrixLocation::Value(Matrix4::IDENTITY), MatrixOrder::ColumnMajor, MatrixKind::View);
    SharedState {
        camera,
        ..SharedState::default()
    }
}

fn run(state: &mut SharedState, now: u32) -> FrameOutput {
    ProjectionPipeline::new().run(state, &MemorySnapshot::new(), now, &FrameParams::centered(800.0, 600.0))
}

#[cfg(test)]
mod selection_tests {
    use super::*;

    #[test]
    fn test_nearest_to_target_is_selected() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(1.25, 0.0, 10.0), 1_000, 0);
        state.registry.upsert(2, Vec3::new(0.25, 0.0, 10.0), 1_000, 0);

        let output = run(&mut state, 0);
        let list = output.draw_list().expect("view resolves");
        assert_eq!(list.markers.len(), 2);

        let selected = list.selected().unwrap();
        assert_eq!(selected.id, 2);
        assert!((selected.screen - Vec2::new(410.0, 300.0)).length() < 1e-2);
        assert!((selected.screen_distance - 10.0).abs() < 1e-2);

        let other = &list.markers[0];
        assert_eq!(other.id, 1);
        assert!(!other.selected);
        assert!((other.screen_distance - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_objects_behind_camera_are_not_drawn() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, -5.0), 1_000, 0);
        state.registry.upsert(2, Vec3::new(3.0, 0.0, 10.0), 1_000, 0);

        let output = run(&mut state, 0);
        let list = output.draw_list().unwrap();
        assert_eq!(list.markers.len(), 1);
        assert_eq!(list.selected().map(|m| m.id), Some(2));
        assert_eq!(list.tracked, 2);

        let cached = state.registry.get(1).and_then(|o| o.projection).unwrap();
        assert!(cached.depth < 0.0);
    }

    #[test]
    fn test_only_object_behind_camera_selects_nothing() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, -5.0), 1_000, 0);

        let output = run(&mut state, 0);
        let list = output.draw_list().unwrap();
        assert!(list.markers.is_empty());
        assert!(list.selected().is_none());
    }

    #[test]
    fn test_settings_control_unselected_decorations() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1_000, 0);
        state.registry.upsert(2, Vec3::new(4.0, 0.0, 10.0), 1_000, 0);

        let list = run(&mut state, 0).draw_list().cloned().unwrap();
        assert!(!list.markers[0].show_label && !list.markers[0].show_line);
        assert!(list.markers[1].show_label && list.markers[1].show_line);

        state.settings = UiSettings {
            always_show_labels: true,
            always_show_lines: true,
        };
        let list = run(&mut state, 0).draw_list().cloned().unwrap();
        assert!(list.markers.iter().all(|m| m.show_label && m.show_line));
    }
}

#[cfg(test)]
mod frame_tests {
    use super::*;

    #[test]
    fn test_expired_objects_are_swept_before_projection() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 100, 0);
        state.registry.upsert(2, Vec3::new(1.0, 0.0, 10.0), 1_000, 0);

        let list = run(&mut state, 150).draw_list().cloned().unwrap();
        assert_eq!(list.tracked, 1);
        assert_eq!(list.selected().map(|m| m.id), Some(2));
    }

    #[test]
    fn test_unresolvable_view_still_sweeps() {
        let mut state = SharedState::default();
        state.registry.upsert(1, Vec3::ZERO, 100, 0);

        let output = run(&mut state, 500);
        assert_eq!(output, FrameOutput::Unavailable(ViewError::NoCameraConfigured));
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_garbage_camera_matrix_reports_unavailable() {
        let mut garbage = Matrix4::IDENTITY;
        garbage.m[3][0] = f32::NAN;

        for kind in [MatrixKind::CameraPose, MatrixKind::View] {
            let mut state = state_at_origin();
            state
                .camera
                .set_matrix(MatrixLocation::Value(garbage), MatrixOrder::ColumnMajor, kind);
            state.registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1_000, 0);

            let output = run(&mut state, 0);
            assert_eq!(output, FrameOutput::Unavailable(ViewError::NonFiniteMatrix), "{kind:?}");
        }
    }

    #[test]
    fn test_unavailable_frame_clears_cached_projections() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1_000, 0);
        run(&mut state, 0);
        assert!(state.registry.get(1).and_then(|o| o.projection).is_some());

        state
            .camera
            .set_matrix(MatrixLocation::Value(Matrix4::ZERO), MatrixOrder::ColumnMajor, MatrixKind::CameraPose);
        assert!(matches!(run(&mut state, 0), FrameOutput::Unavailable(ViewError::SingularMatrix)));
        assert!(state.registry.get(1).and_then(|o| o.projection).is_none());
    }

    #[test]
    fn test_custom_target_changes_selection() {
        let mut state = state_at_origin();
        state.registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1_000, 0);
        state.registry.upsert(2, Vec3::new(5.0, 0.0, 10.0), 1_000, 0);

        let params = FrameParams::centered(800.0, 600.0).with_target(Vec2::new(600.0, 300.0));
        let output = ProjectionPipeline::new().run(&mut state, &MemorySnapshot::new(), 0, &params);
        assert_eq!(output.draw_list().and_then(|l| l.selected()).map(|m| m.id), Some(2));
    }
}
