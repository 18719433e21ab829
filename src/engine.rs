//! Shared overlay state and the thread-safe API the host calls into.
//!
//! ```text
//!   host threads -- set_camera_* / upsert_tracked_object --+
//!                                                          v
//!                                   +------------ Mutex<SharedState> -----------+
//!                                   | CameraModel   ObjectRegistry   UiSettings |
//!                                   +-------------------------------------------+
//!                                                          ^
//!   render thread -- run_frame: sweep, resolve, project ---+--> FrameOutput (lock released)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use log::debug;
use parking_lot::Mutex;

use crate::config::{OverlayConfig, UiSettings};
use crate::core::clock::MonotonicClock;
use crate::math::Matrix4;
use crate::memory::MemorySource;
use crate::projection::{FrameOutput, FrameParams, ProjectionPipeline};
use crate::registry::{ObjectId, ObjectRegistry, TrackedObject};
use crate::view::{CameraModel, MatrixKind, MatrixLocation, MatrixOrder, TriadAxis, VectorSource};

/// Everything guarded by the engine lock
#[derive(Debug, Default)]
pub struct SharedState {
    pub camera: CameraModel,
    pub registry: ObjectRegistry,
    pub settings: UiSettings,
}

pub struct EngineState {
    shared: Mutex<SharedState>,
    memory: Arc<dyn MemorySource>,
    clock: Arc<dyn MonotonicClock>,
    /// Read by input hooks, which may run while the render thread holds the lock
    interactive: AtomicBool,
    default_ttl_millis: u32,
}

impl EngineState {
    pub fn new(memory: Arc<dyn MemorySource>, clock: Arc<dyn MonotonicClock>) -> Self {
        Self::with_config(memory, clock, &OverlayConfig::default())
    }

    /// Engine seeded from a loaded configuration
    pub fn with_config(
        memory: Arc<dyn MemorySource>,
        clock: Arc<dyn MonotonicClock>,
        config: &OverlayConfig,
    ) -> Self {
        let shared = SharedState {
            camera: CameraModel::new(config.default_fov),
            registry: ObjectRegistry::new(),
            settings: config.ui,
        };
        Self {
            shared: Mutex::new(shared),
            memory,
            clock,
            interactive: AtomicBool::new(false),
            default_ttl_millis: config.default_ttl_millis,
        }
    }

    /// Address space camera and object pointers are read from
    pub fn memory(&self) -> &dyn MemorySource {
        self.memory.as_ref()
    }

    /// TTL for callers that have none of their own
    pub fn default_ttl_millis(&self) -> u32 {
        self.default_ttl_millis
    }

    // ------------------------------------------------------------------
    // Camera
    // ------------------------------------------------------------------

    /// Camera pose matrix at `address`; inverted every frame
    pub fn set_camera_matrix(&self, address: usize, order: MatrixOrder) {
        self.set_matrix(MatrixLocation::Address(address), order, MatrixKind::CameraPose);
    }

    /// Ready-made view matrix at `address`
    pub fn set_view_matrix(&self, address: usize, order: MatrixOrder) {
        self.set_matrix(MatrixLocation::Address(address), order, MatrixKind::View);
    }

    /// Literal matrix instead of an address; handy for hosts that copy it out themselves
    pub fn set_camera_matrix_value(&self, matrix: Matrix4, order: MatrixOrder, kind: MatrixKind) {
        self.set_matrix(MatrixLocation::Value(matrix), order, kind);
    }

    fn set_matrix(&self, location: MatrixLocation, order: MatrixOrder, kind: MatrixKind) {
        debug!("camera source: {kind:?} matrix ({order:?}) at {location:?}");
        self.shared.lock().camera.set_matrix(location, order, kind);
    }

    /// Camera position vector; switches the camera to triad mode
    pub fn set_camera_position_source(&self, address: usize, stride: u32, scale: f32) {
        self.set_triad_axis(TriadAxis::Position, VectorSource::new(address, stride, scale));
    }

    /// Camera forward vector; switches the camera to triad mode
    pub fn set_camera_forward_source(&self, address: usize, stride: u32, scale: f32) {
        self.set_triad_axis(TriadAxis::Forward, VectorSource::new(address, stride, scale));
    }

    /// Camera up vector; switches the camera to triad mode
    pub fn set_camera_up_source(&self, address: usize, stride: u32, scale: f32) {
        self.set_triad_axis(TriadAxis::Up, VectorSource::new(address, stride, scale));
    }

    fn set_triad_axis(&self, axis: TriadAxis, vector: VectorSource) {
        debug!("camera source: {axis:?} vector at {:#x}", vector.address);
        self.shared.lock().camera.set_triad_axis(axis, vector);
    }

    /// FOV address, or `None` to use the configured default
    pub fn set_field_of_view_source(&self, address: Option<usize>) {
        self.shared.lock().camera.set_fov_address(address);
    }

    // ------------------------------------------------------------------
    // Tracked objects
    // ------------------------------------------------------------------

    /// Insert or refresh an object; it expires `ttl_millis` from now
    pub fn upsert_tracked_object(&self, id: ObjectId, position: [f32; 3], ttl_millis: u32) {
        let mut shared = self.shared.lock();
        let now = self.clock.now_millis();
        shared
            .registry
            .upsert(id, Vec3::from_array(position), ttl_millis, now);
    }

    /// Drop an object immediately; false if it was not tracked
    pub fn remove_tracked_object(&self, id: ObjectId) -> bool {
        self.shared.lock().registry.remove(id).is_some()
    }

    /// Copy of every tracked object, in insertion order
    pub fn tracked_objects(&self) -> Vec<TrackedObject> {
        self.shared.lock().registry.iter().copied().collect()
    }

    /// Live objects, including ones already expired but not yet swept
    pub fn tracked_count(&self) -> usize {
        self.shared.lock().registry.len()
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Current label toggles
    pub fn ui_settings(&self) -> UiSettings {
        self.shared.lock().settings
    }

    /// Replace the label toggles; applies from the next frame
    pub fn set_ui_settings(&self, settings: UiSettings) {
        self.shared.lock().settings = settings;
    }

    /// Enter or leave interactive mode (settings window shown, cursor released)
    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::SeqCst);
    }

    /// Lock-free, safe to call from input hooks
    pub fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Sweep, resolve and project under the lock; the lock is released before returning
    pub fn run_frame(&self, pipeline: &mut ProjectionPipeline, params: &FrameParams) -> FrameOutput {
        let mut shared = self.shared.lock();
        let now = self.clock.now_millis();
        pipeline.run(&mut shared, self.memory.as_ref(), now, params)
    }
}
