use glam::{Mat4, Vec3, Vec4};

/// 4x4 matrix stored column-major as `m[column][row]`.
///
/// The layout is `repr(C)` and `Pod` so a matrix can be lifted straight out of
/// a foreign process's memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Matrix4 {
    pub m: [[f32; 4]; 4],
}

impl Matrix4 {
    pub const ZERO: Self = Self { m: [[0.0; 4]; 4] };

    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Build from four columns
    pub const fn from_cols(x: [f32; 4], y: [f32; 4], z: [f32; 4], w: [f32; 4]) -> Self {
        Self { m: [x, y, z, w] }
    }

    /// Build from rows as they would be written on paper
    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        Self { m: rows }.transpose()
    }

    /// Inverse of [`Matrix4::to_cols_array`]
    pub fn from_cols_array(values: &[f32; 16]) -> Self {
        bytemuck::cast(*values)
    }

    /// Flat column-major layout, the order a `repr(C)` matrix has in memory
    pub fn to_cols_array(&self) -> [f32; 16] {
        bytemuck::cast(self.m)
    }

    /// Column `index` as a vector
    pub fn col(&self, index: usize) -> Vec4 {
        Vec4::from_array(self.m[index])
    }

    /// Same matrix as a glam `Mat4`
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.m)
    }

    /// `self * rhs`: the columns of `rhs` are transformed by `self`
    pub fn multiply(&self, rhs: &Matrix4) -> Matrix4 {
        Matrix4::from(self.to_mat4() * rhs.to_mat4())
    }

    /// `self * v` for a column vector
    pub fn transform(&self, v: Vec4) -> Vec4 {
        self.to_mat4() * v
    }

    /// False if any element is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|value| value.is_finite())
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Matrix4 {
        let mut result = Matrix4::ZERO;
        for r in 0..4 {
            for c in 0..4 {
                result.m[r][c] = self.m[c][r];
            }
        }
        result
    }

    /// 2x2 sub-determinants of the top (columns 0, 1) and bottom (columns 2, 3) pairs
    fn sub_determinants(&self) -> [f32; 12] {
        let [[m00, m01, m02, m03], [m10, m11, m12, m13], [m20, m21, m22, m23], [m30, m31, m32, m33]] =
            self.m;

        [
            m00 * m11 - m01 * m10,
            m00 * m12 - m02 * m10,
            m00 * m13 - m03 * m10,
            m01 * m12 - m02 * m11,
            m01 * m13 - m03 * m11,
            m02 * m13 - m03 * m12,
            m20 * m31 - m21 * m30,
            m20 * m32 - m22 * m30,
            m20 * m33 - m23 * m30,
            m21 * m32 - m22 * m31,
            m21 * m33 - m23 * m31,
            m22 * m33 - m23 * m32,
        ]
    }

    /// Determinant using the same expansion as the inverse
    pub fn determinant(&self) -> f32 {
        let [b00, b01, b02, b03, b04, b05, b06, b07, b08, b09, b10, b11] = self.sub_determinants();
        b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06
    }

    /// Cofactor inverse written into `out`.
    ///
    /// Returns false and leaves `out` zeroed when the determinant is exactly zero.
    pub fn inverse_into(&self, out: &mut Matrix4) -> bool {
        *out = Matrix4::ZERO;

        let [[m00, m01, m02, m03], [m10, m11, m12, m13], [m20, m21, m22, m23], [m30, m31, m32, m33]] =
            self.m;
        let [b00, b01, b02, b03, b04, b05, b06, b07, b08, b09, b10, b11] = self.sub_determinants();

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det == 0.0 {
            return false;
        }
        let inv = 1.0 / det;

        out.m[0][0] = (m11 * b11 - m12 * b10 + m13 * b09) * inv;
        out.m[0][1] = (m02 * b10 - m01 * b11 - m03 * b09) * inv;
        out.m[0][2] = (m31 * b05 - m32 * b04 + m33 * b03) * inv;
        out.m[0][3] = (m22 * b04 - m21 * b05 - m23 * b03) * inv;

        out.m[1][0] = (m12 * b08 - m10 * b11 - m13 * b07) * inv;
        out.m[1][1] = (m00 * b11 - m02 * b08 + m03 * b07) * inv;
        out.m[1][2] = (m32 * b02 - m30 * b05 - m33 * b01) * inv;
        out.m[1][3] = (m20 * b05 - m22 * b02 + m23 * b01) * inv;

        out.m[2][0] = (m10 * b10 - m11 * b08 + m13 * b06) * inv;
        out.m[2][1] = (m01 * b08 - m00 * b10 - m03 * b06) * inv;
        out.m[2][2] = (m30 * b04 - m31 * b02 + m33 * b00) * inv;
        out.m[2][3] = (m21 * b02 - m20 * b04 - m23 * b00) * inv;

        out.m[3][0] = (m11 * b07 - m10 * b09 - m12 * b06) * inv;
        out.m[3][1] = (m00 * b09 - m01 * b07 + m02 * b06) * inv;
        out.m[3][2] = (m31 * b01 - m30 * b03 - m32 * b00) * inv;
        out.m[3][3] = (m20 * b03 - m21 * b01 + m22 * b00) * inv;

        true
    }

    /// General inverse, `None` when singular
    pub fn inverse(&self) -> Option<Matrix4> {
        let mut out = Matrix4::ZERO;
        self.inverse_into(&mut out).then_some(out)
    }

    /// Closed-form inverse of a rigid transform (orthonormal rotation + translation).
    /// Only meaningful when the bottom row is `(0, 0, 0, 1)`.
    pub fn ortho_inverse(&self) -> Matrix4 {
        let mut result = Matrix4::IDENTITY;
        let t = Vec3::new(self.m[3][0], self.m[3][1], self.m[3][2]);

        for r in 0..3 {
            for c in 0..3 {
                result.m[c][r] = self.m[r][c];
            }
        }
        for r in 0..3 {
            let axis = Vec3::new(self.m[r][0], self.m[r][1], self.m[r][2]);
            result.m[3][r] = -axis.dot(t);
        }
        result
    }

    /// Camera pose from a position and look direction.
    ///
    /// Columns are (right, up, forward, position) with `right = up x forward`,
    /// so the pose maps camera space (+z forward, +y up) into world space.
    /// Zero-length or parallel inputs produce a singular matrix.
    pub fn camera_basis(position: Vec3, forward: Vec3, up: Vec3) -> Matrix4 {
        let forward = forward.normalize_or_zero();
        let right = up.cross(forward).normalize_or_zero();
        let up = forward.cross(right);

        Matrix4::from_cols(
            right.extend(0.0).to_array(),
            up.extend(0.0).to_array(),
            forward.extend(0.0).to_array(),
            position.extend(1.0).to_array(),
        )
    }

    /// OpenGL-style perspective projection
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let mut result = Matrix4::ZERO;
        let tan_half_fov = (fov / 2.0).tan();
        result.m[0][0] = 1.0 / (aspect * tan_half_fov);
        result.m[1][1] = 1.0 / tan_half_fov;
        result.m[2][2] = -(far + near) / (far - near);
        result.m[2][3] = -1.0;
        result.m[3][2] = -(2.0 * far * near) / (far - near);
        result
    }

    /// Element-wise comparison within `max_abs_diff`
    pub fn abs_diff_eq(&self, other: &Matrix4, max_abs_diff: f32) -> bool {
        self.to_mat4().abs_diff_eq(other.to_mat4(), max_abs_diff)
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Matrix4 {
    fn from(value: Mat4) -> Self {
        Self {
            m: value.to_cols_array_2d(),
        }
    }
}

impl From<Matrix4> for Mat4 {
    fn from(value: Matrix4) -> Self {
        value.to_mat4()
    }
}

impl std::ops::Mul for Matrix4 {
    type Output = Matrix4;

    fn mul(self, rhs: Matrix4) -> Matrix4 {
        self.multiply(&rhs)
    }
}

impl std::ops::Mul<Vec4> for Matrix4 {
    type Output = Vec4;

    fn mul(self, rhs: Vec4) -> Vec4 {
        self.transform(rhs)
    }
}

impl std::fmt::Display for Matrix4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..4 {
            writeln!(
                f,
                "{:.4} {:.4} {:.4} {:.4}",
                self.m[0][r], self.m[1][r], self.m[2][r], self.m[3][r]
            )?;
        }
        Ok(())
    }
}
