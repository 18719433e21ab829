pub mod cli;
pub mod config;
pub mod core;
pub mod demo;
pub mod engine;
pub mod ffi;
pub mod input;
pub mod math;
pub mod memory;
pub mod overlay;
pub mod projection;
pub mod registry;
pub mod view;

pub use config::{OverlayConfig, UiSettings};
pub use engine::EngineState;
pub use math::{Matrix4, Vector4};
pub use memory::{MemoryError, MemorySource, ProcessMemory};
pub use projection::{DrawList, FrameOutput, FrameParams, Marker, ProjectionPipeline};
pub use registry::{ObjectId, ObjectRegistry, TrackedObject};
pub use view::{CameraModel, MatrixOrder, ViewError};
