//! Camera model: turns whichever camera encoding the host exposes into one
//! view matrix.

use std::fmt;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Matrix4;
use crate::memory::{self, MemoryError, MemorySource};

/// Field of view used when none is configured or the configured one is unreadable (~70 degrees)
pub const DEFAULT_FOV: f32 = 1.223;

/// Usable vertical field of view in radians: finite and inside (0, pi)
pub fn is_valid_fov(fov: f32) -> bool {
    fov.is_finite() && fov > 0.0 && fov < std::f32::consts::PI
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixOrder {
    RowMajor,
    ColumnMajor,
}

impl MatrixOrder {
    /// Decode the C ABI value: 0 is row-major, anything else column-major
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            MatrixOrder::RowMajor
        } else {
            MatrixOrder::ColumnMajor
        }
    }
}

/// What a camera matrix transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Camera space to world space; its inverse is the view matrix
    CameraPose,
    /// Already maps world space into camera space
    View,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixLocation {
    Value(Matrix4),
    Address(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixSource {
    pub location: MatrixLocation,
    pub order: MatrixOrder,
    pub kind: MatrixKind,
}

/// One vector of a triad: three floats `stride` elements apart, multiplied by `scale`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSource {
    pub address: usize,
    pub stride: u32,
    pub scale: f32,
}

impl Default for VectorSource {
    fn default() -> Self {
        Self {
            address: 0,
            stride: 1,
            scale: 1.0,
        }
    }
}

impl VectorSource {
    pub fn new(address: usize, stride: u32, scale: f32) -> Self {
        Self {
            address,
            stride,
            scale,
        }
    }

    fn read(&self, source: &dyn MemorySource) -> Result<Vec3, MemoryError> {
        let [x, y, z] = memory::read_strided::<3>(source, self.address, self.stride)?;
        Ok(Vec3::new(x, y, z) * self.scale)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VectorTriad {
    pub position: VectorSource,
    pub forward: VectorSource,
    pub up: VectorSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriadAxis {
    Position,
    Forward,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraSource {
    Matrix(MatrixSource),
    Triad(VectorTriad),
}

/// Camera input that could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraInput {
    Matrix,
    Axis(TriadAxis),
}

impl fmt::Display for CameraInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraInput::Matrix => "matrix",
            CameraInput::Axis(TriadAxis::Position) => "position",
            CameraInput::Axis(TriadAxis::Forward) => "forward vector",
            CameraInput::Axis(TriadAxis::Up) => "up vector",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("cannot read camera {what}: {source}")]
    UnreadableMemory { what: CameraInput, source: MemoryError },
    #[error("camera matrix is singular")]
    SingularMatrix,
    #[error("camera matrix has non-finite elements")]
    NonFiniteMatrix,
    #[error("no camera source configured")]
    NoCameraConfigured,
}

/// View matrix and lens parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedView {
    pub view: Matrix4,
    pub fov: f32,
    pub aspect_ratio: f32,
}

impl ResolvedView {
    /// Perspective composed over the view matrix
    pub fn view_projection(&self, near: f32, far: f32) -> Matrix4 {
        Matrix4::perspective(self.fov, self.aspect_ratio, near, far).multiply(&self.view)
    }
}

/// Active camera configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    source: Option<CameraSource>,
    fov_address: Option<usize>,
    default_fov: f32,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::new(DEFAULT_FOV)
    }
}

impl CameraModel {
    /// Camera with no source configured yet
    pub fn new(default_fov: f32) -> Self {
        Self {
            source: None,
            fov_address: None,
            default_fov,
        }
    }

    /// Active source, if any
    pub fn source(&self) -> Option<&CameraSource> {
        self.source.as_ref()
    }

    /// Use a 4x4 matrix, replacing any triad
    pub fn set_matrix(&mut self, location: MatrixLocation, order: MatrixOrder, kind: MatrixKind) {
        self.source = Some(CameraSource::Matrix(MatrixSource {
            location,
            order,
            kind,
        }));
    }

    /// Configure one triad vector, switching to triad mode if needed.
    /// Vectors not configured yet stay null and fail on first read.
    pub fn set_triad_axis(&mut self, axis: TriadAxis, vector: VectorSource) {
        let mut triad = match self.source {
            Some(CameraSource::Triad(triad)) => triad,
            _ => VectorTriad::default(),
        };
        match axis {
            TriadAxis::Position => triad.position = vector,
            TriadAxis::Forward => triad.forward = vector,
            TriadAxis::Up => triad.up = vector,
        }
        self.source = Some(CameraSource::Triad(triad));
    }

    /// Where to read the FOV from; `None` means always use the default
    pub fn set_fov_address(&mut self, address: Option<usize>) {
        self.fov_address = address;
    }

    /// Fallback FOV in radians
    pub fn set_default_fov(&mut self, fov: f32) {
        self.default_fov = fov;
    }

    /// Resolve this frame's view matrix and lens parameters.
    ///
    /// Fails when the source is missing, unreadable, singular or not finite.
    pub fn resolve_view_matrix(
        &self,
        memory: &dyn MemorySource,
        aspect_ratio: f32,
    ) -> Result<ResolvedView, ViewError> {
        let view = match self.source.as_ref().ok_or(ViewError::NoCameraConfigured)? {
            CameraSource::Matrix(source) => resolve_matrix(source, memory)?,
            CameraSource::Triad(triad) => resolve_triad(triad, memory)?,
        };

        Ok(ResolvedView {
            view,
            fov: self.field_of_view(memory),
            aspect_ratio,
        })
    }

    /// FOV in radians, falling back to the default when the host value is unusable
    pub fn field_of_view(&self, memory: &dyn MemorySource) -> f32 {
        let Some(address) = self.fov_address else {
            return self.default_fov;
        };
        match memory::read_f32(memory, address) {
            Ok(fov) if is_valid_fov(fov) => fov,
            Ok(fov) => {
                debug!("ignoring field of view {fov}, using default");
                self.default_fov
            }
            Err(err) => {
                debug!("field of view unavailable ({err}), using default");
                self.default_fov
            }
        }
    }
}

fn load_matrix(location: MatrixLocation, memory: &dyn MemorySource) -> Result<Matrix4, ViewError> {
    match location {
        MatrixLocation::Value(matrix) => Ok(matrix),
        MatrixLocation::Address(address) => {
            memory::read::<Matrix4>(memory, address).map_err(|source| ViewError::UnreadableMemory {
                what: CameraInput::Matrix,
                source,
            })
        }
    }
}

fn to_column_major(matrix: Matrix4, order: MatrixOrder) -> Matrix4 {
    match order {
        MatrixOrder::RowMajor => matrix.transpose(),
        MatrixOrder::ColumnMajor => matrix,
    }
}

fn to_view(matrix: Matrix4, kind: MatrixKind) -> Result<Matrix4, ViewError> {
    match kind {
        MatrixKind::CameraPose => matrix.inverse().ok_or(ViewError::SingularMatrix),
        MatrixKind::View => Ok(matrix),
    }
}

fn resolve_matrix(source: &MatrixSource, memory: &dyn MemorySource) -> Result<Matrix4, ViewError> {
    let raw = load_matrix(source.location, memory)?;
    if !raw.is_finite() {
        return Err(ViewError::NonFiniteMatrix);
    }
    // A near-singular pose can still overflow on inversion
    let view = to_view(to_column_major(raw, source.order), source.kind)?;
    if !view.is_finite() {
        return Err(ViewError::NonFiniteMatrix);
    }
    Ok(view)
}

fn resolve_triad(triad: &VectorTriad, memory: &dyn MemorySource) -> Result<Matrix4, ViewError> {
    let read_axis = |axis: TriadAxis, vector: &VectorSource| {
        vector.read(memory).map_err(|source| {
            debug!("camera {} unreadable at {:#x}", CameraInput::Axis(axis), vector.address);
            ViewError::UnreadableMemory {
                what: CameraInput::Axis(axis),
                source,
            }
        })
    };

    let position = read_axis(TriadAxis::Position, &triad.position)?;
    let forward = read_axis(TriadAxis::Forward, &triad.forward)?;
    let up = read_axis(TriadAxis::Up, &triad.up)?;

    let pose = Matrix4::camera_basis(position, forward, up);
    let det = pose.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(ViewError::SingularMatrix);
    }
    Ok(pose.ortho_inverse())
}
