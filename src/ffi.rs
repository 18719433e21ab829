//! C ABI for the host process.
//!
//! One process-lifetime [`EngineState`] reads the host's own memory through
//! [`ProcessMemory`]. Pointers are stored as plain addresses and only ever
//! read through the checked memory source.

use std::ffi::c_void;
use std::sync::{Arc, OnceLock};

use log::warn;

use crate::core::clock::SystemClock;
use crate::engine::EngineState;
use crate::memory::{self, ProcessMemory};
use crate::registry::ObjectId;
use crate::view::MatrixOrder;

static ENGINE: OnceLock<Arc<EngineState>> = OnceLock::new();

/// The engine behind the exported functions
pub fn global() -> &'static Arc<EngineState> {
    ENGINE.get_or_init(|| {
        Arc::new(EngineState::new(
            Arc::new(ProcessMemory::new()),
            Arc::new(SystemClock::new()),
        ))
    })
}

/// Read three floats at `position` and upsert them; unreadable positions are dropped
pub fn update_object(engine: &EngineState, id: ObjectId, position: usize, ttl_millis: u32) -> bool {
    match memory::read::<[f32; 3]>(engine.memory(), position) {
        Ok(xyz) => {
            engine.upsert_tracked_object(id, xyz, ttl_millis);
            true
        }
        Err(err) => {
            warn!("ignoring update for object {id}: {err}");
            false
        }
    }
}

fn optional_address(pointer: *const c_void) -> Option<usize> {
    (!pointer.is_null()).then_some(pointer as usize)
}

#[no_mangle]
pub extern "C" fn overlay_update_object(id: usize, position: *const f32, ttl_millis: u32) {
    update_object(global(), id as ObjectId, position as usize, ttl_millis);
}

#[no_mangle]
pub extern "C" fn overlay_set_fov_ptr(pointer: *const f32) {
    global().set_field_of_view_source(optional_address(pointer.cast()));
}

#[no_mangle]
pub extern "C" fn overlay_set_camera_pos_ptr(pointer: *const c_void, stride: u32, scale: f32) {
    global().set_camera_position_source(pointer as usize, stride, scale);
}

#[no_mangle]
pub extern "C" fn overlay_set_camera_forward_ptr(pointer: *const c_void, stride: u32, scale: f32) {
    global().set_camera_forward_source(pointer as usize, stride, scale);
}

#[no_mangle]
pub extern "C" fn overlay_set_camera_up_ptr(pointer: *const c_void, stride: u32, scale: f32) {
    global().set_camera_up_source(pointer as usize, stride, scale);
}

/// `order`: 0 row-major, anything else column-major
#[no_mangle]
pub extern "C" fn overlay_set_camera_matrix(pointer: *const c_void, order: u32) {
    global().set_camera_matrix(pointer as usize, MatrixOrder::from_raw(order));
}

#[no_mangle]
pub extern "C" fn overlay_set_interactive(interactive: bool) {
    global().set_interactive(interactive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::memory::MemorySnapshot;

    #[test]
    fn test_update_object_reads_through_memory_source() {
        let snapshot = Arc::new(MemorySnapshot::new());
        snapshot.map_f32s(0x8000, &[1.0, 2.0, 3.0]);
        let engine = EngineState::new(snapshot, Arc::new(ManualClock::new(0)));

        assert!(update_object(&engine, 9, 0x8000, 100));
        assert!(!update_object(&engine, 10, 0x9000, 100));
        assert!(!update_object(&engine, 11, 0, 100));

        let objects = engine.tracked_objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].position, glam::Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[cfg(any(target_os = "linux", windows))]
    #[test]
    fn test_update_object_from_host_pointer() {
        let engine = EngineState::new(Arc::new(ProcessMemory::new()), Arc::new(ManualClock::new(0)));
        let position = [4.0f32, 5.0, 6.0];
        assert!(update_object(&engine, 1, position.as_ptr() as usize, 100));
        assert_eq!(engine.tracked_objects()[0].position.z, 6.0);
    }

    #[test]
    fn test_null_fov_pointer_clears_source() {
        assert_eq!(optional_address(std::ptr::null()), None);
        let value = 1.0f32;
        let pointer: *const f32 = &value;
        assert_eq!(optional_address(pointer.cast()), Some(pointer as usize));
    }

    #[test]
    fn test_exported_interactive_toggle() {
        overlay_set_interactive(true);
        assert!(global().is_interactive());
        overlay_set_interactive(false);
        assert!(!global().is_interactive());
    }
}
