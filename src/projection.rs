//! Per-frame world-to-screen projection and nearest-marker selection.

use glam::{Vec2, Vec4};
use log::{debug, info, warn};

use crate::config::UiSettings;
use crate::core::timer::EveryNTicks;
use crate::engine::SharedState;
use crate::math::Matrix4;
use crate::memory::MemorySource;
use crate::registry::{CachedProjection, ObjectId, ObjectRegistry};
use crate::view::{ResolvedView, ViewError};

/// Frames between view matrix dumps in the debug log
const MATRIX_LOG_INTERVAL: u64 = 100;

/// Viewport and reference point for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub target: Vec2,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl FrameParams {
    /// Viewport with the target at its centre
    pub fn centered(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            target: Vec2::new(viewport_width / 2.0, viewport_height / 2.0),
            viewport_width,
            viewport_height,
        }
    }

    /// Move the reference point, e.g. to the mouse position
    pub fn with_target(mut self, target: Vec2) -> Self {
        self.target = target;
        self
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f32 {
        self.viewport_width / self.viewport_height
    }
}

/// One visible object, ready for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: ObjectId,
    pub screen: Vec2,
    /// View-space z
    pub depth: f32,
    /// Pixels from the frame target
    pub screen_distance: f32,
    /// World units from the camera
    pub world_distance: f32,
    pub selected: bool,
    pub show_label: bool,
    pub show_line: bool,
}

/// Markers in paint order; the selected marker, if any, is last
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    pub markers: Vec<Marker>,
    pub target: Vec2,
    /// Live objects after the sweep, including ones not drawn
    pub tracked: usize,
}

impl DrawList {
    /// The marker nearest the target, if any object was visible
    pub fn selected(&self) -> Option<&Marker> {
        self.markers.last().filter(|marker| marker.selected)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutput {
    /// The view could not be resolved; nothing was projected
    Unavailable(ViewError),
    Ready(DrawList),
}

impl FrameOutput {
    /// Draw list of a successful frame
    pub fn draw_list(&self) -> Option<&DrawList> {
        match self {
            FrameOutput::Ready(list) => Some(list),
            FrameOutput::Unavailable(_) => None,
        }
    }
}

/// Perspective-style projection of a view-space point.
///
/// Assumes the view matrix puts the camera at the origin looking down +z.
pub fn project_clip(clip: Vec4, fov: f32, width: f32, height: f32) -> Vec2 {
    let aspect = width / height;
    let scale = 1.0 / clip.z / (fov / 2.0).tan();
    Vec2::new(
        (clip.x * scale + 1.0) * width / 2.0,
        (1.0 - clip.y * scale * aspect) * height / 2.0,
    )
}

/// Project every object, cache the results on the objects and build the draw list
pub fn project_objects(
    registry: &mut ObjectRegistry,
    view: &Matrix4,
    fov: f32,
    params: &FrameParams,
    settings: UiSettings,
) -> DrawList {
    let mut markers = Vec::with_capacity(registry.len());
    let mut nearest: Option<(usize, f32)> = None;

    for object in registry.iter_mut() {
        let clip = view.transform(object.position);
        let screen = project_clip(clip, fov, params.viewport_width, params.viewport_height);
        object.projection = Some(CachedProjection {
            screen,
            depth: clip.z,
        });

        if clip.z < 0.0 || !screen.is_finite() {
            continue;
        }

        let distance_sq = screen.distance_squared(params.target);
        if nearest.map_or(true, |(_, best)| distance_sq < best) {
            nearest = Some((markers.len(), distance_sq));
        }

        markers.push(Marker {
            id: object.id,
            screen,
            depth: clip.z,
            screen_distance: distance_sq.sqrt(),
            world_distance: clip.truncate().length(),
            selected: false,
            show_label: settings.always_show_labels,
            show_line: settings.always_show_lines,
        });
    }

    if let Some((slot, _)) = nearest {
        let mut marker = markers.remove(slot);
        marker.selected = true;
        marker.show_label = true;
        marker.show_line = true;
        markers.push(marker);
    }

    DrawList {
        markers,
        target: params.target,
        tracked: registry.len(),
    }
}

/// Frame driver owned by the render thread
#[derive(Debug)]
pub struct ProjectionPipeline {
    frames: u64,
    view_available: Option<bool>,
    matrix_log: EveryNTicks,
}

impl Default for ProjectionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionPipeline {
    pub fn new() -> Self {
        Self {
            frames: 0,
            view_available: None,
            matrix_log: EveryNTicks::new(MATRIX_LOG_INTERVAL),
        }
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame against state the caller has already locked
    pub fn run(
        &mut self,
        state: &mut SharedState,
        memory: &dyn MemorySource,
        now: u32,
        params: &FrameParams,
    ) -> FrameOutput {
        self.frames += 1;

        let evicted = state.registry.sweep(now);
        if evicted > 0 {
            debug!("evicted {evicted} stale objects");
        }

        match state.camera.resolve_view_matrix(memory, params.aspect_ratio()) {
            Ok(resolved) => {
                self.note_available(&resolved);
                FrameOutput::Ready(project_objects(
                    &mut state.registry,
                    &resolved.view,
                    resolved.fov,
                    params,
                    state.settings,
                ))
            }
            Err(err) => {
                self.note_unavailable(&err);
                for object in state.registry.iter_mut() {
                    object.projection = None;
                }
                FrameOutput::Unavailable(err)
            }
        }
    }

    fn note_available(&mut self, resolved: &ResolvedView) {
        if self.view_available == Some(false) {
            info!("camera view available again");
        }
        self.view_available = Some(true);

        if self.matrix_log.tick() {
            debug!("view matrix (fov {:.3}):\n{}", resolved.fov, resolved.view);
        }
    }

    fn note_unavailable(&mut self, err: &ViewError) {
        if self.view_available != Some(false) {
            warn!("camera view unavailable: {err}");
        } else {
            debug!("camera view unavailable: {err}");
        }
        self.view_available = Some(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    fn params() -> FrameParams {
        FrameParams::centered(800.0, 600.0)
    }

    #[test]
    fn test_point_on_axis_lands_at_centre() {
        let screen = project_clip(Vec4::new(0.0, 0.0, 10.0, 1.0), FRAC_PI_2, 800.0, 600.0);
        assert_eq!(screen, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_up_is_screen_up() {
        let screen = project_clip(Vec4::new(1.0, 1.0, 10.0, 1.0), FRAC_PI_2, 800.0, 600.0);
        assert!(screen.x > 400.0);
        assert!(screen.y < 300.0);
    }

    #[test]
    fn test_behind_camera_is_cached_but_not_drawn() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(0.0, 0.0, -5.0), 1000, 0);

        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), UiSettings::default());

        assert!(list.markers.is_empty());
        assert_eq!(list.tracked, 1);
        let cached = registry.get(1).unwrap().projection.unwrap();
        assert_eq!(cached.depth, -5.0);
    }

    #[test]
    fn test_point_on_camera_plane_is_skipped() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(1.0, 0.0, 0.0), 1000, 0);
        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), UiSettings::default());
        assert!(list.selected().is_none());
    }

    #[test]
    fn test_selected_marker_is_painted_last() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1000, 0);
        registry.upsert(2, Vec3::new(3.0, 0.0, 10.0), 1000, 0);

        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), UiSettings::default());

        let ids: Vec<_> = list.markers.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let selected = list.selected().unwrap();
        assert_eq!(selected.id, 1);
        assert!(selected.show_label && selected.show_line);
        assert!(!list.markers[0].show_label && !list.markers[0].show_line);
    }

    #[test]
    fn test_always_show_settings_decorate_everything() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(0.0, 0.0, 10.0), 1000, 0);
        registry.upsert(2, Vec3::new(3.0, 0.0, 10.0), 1000, 0);

        let settings = UiSettings {
            always_show_labels: true,
            always_show_lines: false,
        };
        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), settings);

        let other = &list.markers[0];
        assert!(other.show_label);
        assert!(!other.show_line);
    }

    #[test]
    fn test_ties_go_to_first_inserted() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(5, Vec3::new(1.0, 0.0, 10.0), 1000, 0);
        registry.upsert(6, Vec3::new(1.0, 0.0, 10.0), 1000, 0);

        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), UiSettings::default());
        assert_eq!(list.selected().map(|m| m.id), Some(5));
    }

    #[test]
    fn test_distances() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(0.0, 3.0, 4.0), 1000, 0);

        let list = project_objects(&mut registry, &Matrix4::IDENTITY, FRAC_PI_2, &params(), UiSettings::default());
        let marker = list.selected().unwrap();
        assert!((marker.world_distance - 5.0).abs() < 1e-6);
        // y offset 0.75 in NDC, scaled by aspect 4/3 onto a 300px half-height
        assert!((marker.screen_distance - 300.0).abs() < 1e-3);
    }
}
