//! Simulated host for the headless demo: a fake process address space with a
//! triad camera, and producer threads publishing orbiting objects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::EngineState;
use crate::memory::{MemoryError, MemorySnapshot};

pub const CAMERA_POSITION_ADDR: usize = 0x0010_0000;
pub const CAMERA_FORWARD_ADDR: usize = 0x0010_1000;
pub const CAMERA_UP_ADDR: usize = 0x0010_2000;
pub const CAMERA_FOV_ADDR: usize = 0x0010_3000;

/// Camera position is interleaved with padding and stored in centimetres
const POSITION_STRIDE: u32 = 2;
const POSITION_SCALE: f32 = 0.01;

const PUBLISH_INTERVAL: Duration = Duration::from_millis(20);
/// Objects with `id % 4 == 3` go quiet after this long and expire
const QUIET_AFTER: Duration = Duration::from_secs(2);

pub struct DemoHost {
    memory: Arc<MemorySnapshot>,
}

impl Default for DemoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoHost {
    /// Fake address space with the camera triad and FOV mapped
    pub fn new() -> Self {
        let memory = Arc::new(MemorySnapshot::new());
        memory.map_f32s(CAMERA_POSITION_ADDR, &[0.0, 0.0, 250.0, 0.0, -1500.0]);
        memory.map_f32s(CAMERA_FORWARD_ADDR, &[0.0, 0.0, 1.0]);
        memory.map_f32s(CAMERA_UP_ADDR, &[0.0, 1.0, 0.0]);
        memory.map_f32s(CAMERA_FOV_ADDR, &[1.2]);
        Self { memory }
    }

    /// Address space the engine should read from
    pub fn memory(&self) -> Arc<MemorySnapshot> {
        self.memory.clone()
    }

    /// Point the engine at the simulated camera
    pub fn attach(&self, engine: &EngineState) {
        engine.set_camera_position_source(CAMERA_POSITION_ADDR, POSITION_STRIDE, POSITION_SCALE);
        engine.set_camera_forward_source(CAMERA_FORWARD_ADDR, 1, 1.0);
        engine.set_camera_up_source(CAMERA_UP_ADDR, 1, 1.0);
        engine.set_field_of_view_source(Some(CAMERA_FOV_ADDR));
    }

    /// Turn the camera around the vertical axis
    pub fn set_camera_yaw(&self, yaw: f32) -> Result<(), MemoryError> {
        self.memory
            .write_f32s(CAMERA_FORWARD_ADDR, &[yaw.sin(), 0.0, yaw.cos()])
    }

    /// Simulate the host freeing (or restoring) its camera object
    pub fn set_camera_mapped(&self, mapped: bool) {
        if mapped {
            self.memory.map_f32s(CAMERA_FORWARD_ADDR, &[0.0, 0.0, 1.0]);
        } else {
            self.memory.unmap(CAMERA_FORWARD_ADDR);
        }
    }
}

/// Position of object `id` at `t` seconds: rings around the origin at
/// different radii, heights and speeds
pub fn object_position(id: u32, t: f32) -> [f32; 3] {
    let radius = 4.0 + (id % 5) as f32 * 2.0;
    let speed = 0.2 + (id % 3) as f32 * 0.15;
    let phase = id as f32 * 0.7;
    let angle = phase + t * speed;
    [radius * angle.cos(), (id % 4) as f32 - 1.5, radius * angle.sin()]
}

/// Start `producers` threads that publish all `objects` between them until `stop` is set.
/// Each thread returns how many updates it sent.
pub fn spawn_producers(
    engine: Arc<EngineState>,
    objects: u32,
    producers: u32,
    ttl_millis: u32,
    stop: Arc<AtomicBool>,
) -> Vec<JoinHandle<u64>> {
    let producers = producers.max(1);

    (0..producers)
        .map(|worker| {
            let engine = engine.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let mut sent = 0u64;

                while !stop.load(Ordering::Relaxed) {
                    let elapsed = start.elapsed();
                    let t = elapsed.as_secs_f32();

                    for id in (worker..objects).step_by(producers as usize) {
                        if id % 4 == 3 && elapsed > QUIET_AFTER {
                            continue;
                        }
                        engine.upsert_tracked_object(id as u64, object_position(id, t), ttl_millis);
                        sent += 1;
                    }
                    thread::sleep(PUBLISH_INTERVAL);
                }
                sent
            })
        })
        .collect()
}
