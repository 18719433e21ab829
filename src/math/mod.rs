mod matrix;

pub use matrix::Matrix4;

/// Four-component vector used for world positions (w = 1) and view-space results
pub type Vector4 = glam::Vec4;

/// Homogeneous world-space point
pub fn point(x: f32, y: f32, z: f32) -> Vector4 {
    Vector4::new(x, y, z, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_has_unit_w() {
        assert_eq!(point(1.0, 2.0, 3.0).w, 1.0);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector4::new(1.0, 2.0, 2.0, 0.0);
        let b = Vector4::new(0.5, 0.0, 1.0, 2.0);
        assert_eq!(a + b, Vector4::new(1.5, 2.0, 3.0, 2.0));
        assert_eq!(a - b, Vector4::new(0.5, 2.0, 1.0, -2.0));
        assert_eq!(a * 2.0, Vector4::new(2.0, 4.0, 4.0, 0.0));
        assert_eq!(a.dot(b), 2.5);
        assert_eq!(a.length(), 3.0);
    }
}
