use std::time;

use cgmath::{Matrix4, Rad, Vector3};

/// Position-only vertex, laid out as `R32G32B32_SFLOAT`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Vertex {
        Vertex { x, y, z }
    }
}

pub const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new(-0.5, -0.5, 0.0),
    Vertex::new(0.0, 0.5, 0.0),
    Vertex::new(0.5, -0.5, 0.0),
];

pub const TRIANGLE_INDICES: [u16; 3] = [0, 1, 2];

const ICOSAHEDRON_SCALE: f32 = 0.25;

pub fn icosahedron_vertices() -> Vec<Vertex> {
    let s = ICOSAHEDRON_SCALE;
    let d = (1.0 + 5.0f32.sqrt()) * 0.5 * s;

    vec![
        Vertex::new(-s, d, 0.0),
        Vertex::new(s, d, 0.0),
        Vertex::new(-s, -d, 0.0),
        Vertex::new(s, -d, 0.0),
        Vertex::new(0.0, -s, d),
        Vertex::new(0.0, s, d),
        Vertex::new(0.0, -s, -d),
        Vertex::new(0.0, s, -d),
        Vertex::new(d, 0.0, -s),
        Vertex::new(d, 0.0, s),
        Vertex::new(-d, 0.0, -s),
        Vertex::new(-d, 0.0, s),
    ]
}

#[rustfmt::skip]
pub const ICOSAHEDRON_INDICES: [u16; 60] = [
    0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11,
    1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7, 1, 8,
    3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9,
    4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9, 8, 1,
];

/// Animation runs at half of wall clock speed.
pub fn animation_time(elapsed: time::Duration) -> f32 {
    elapsed.as_secs_f32() / 2.0
}

/// Triangle that pulses in size and sways along X.
pub fn animated_triangle(t: f32) -> [Vertex; 3] {
    let scale = (t * 5.0).sin() * 0.5 + 1.0;
    let bias = (t * 3.0).sin() * 0.5;

    [
        Vertex::new(-0.5 * scale + bias, -0.5 * scale, 0.0),
        Vertex::new(bias, 0.5 * scale, 0.0),
        Vertex::new(0.5 * scale + bias, -0.5 * scale, 0.0),
    ]
}

pub fn animated_transform(t: f32) -> Matrix4<f32> {
    Matrix4::from_angle_z(Rad(t))
}

pub const INSTANCE_COUNT: u32 = 3;

pub fn instance_transform(i: u32) -> Matrix4<f32> {
    let i = i as f32;
    Matrix4::from_translation(Vector3::new(-1.5 + 1.5 * i, -0.5 + 0.5 * i, 0.0))
}

pub const INSTANCE_COLORS: [[f32; 3]; INSTANCE_COUNT as usize] = [[0.5, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, 0.0, 0.5]];

/// Colour padded to a vec4, as stored inline in a hit record.
pub fn inline_color(i: u32) -> [f32; 4] {
    let [r, g, b] = INSTANCE_COLORS[i as usize];
    [r, g, b, 0.0]
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use cgmath::SquareMatrix;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn vertex_is_three_floats() {
        assert_eq!(VERTEX_STRIDE, 12);
    }

    #[test]
    fn icosahedron_counts_and_bounds() {
        let vertices = icosahedron_vertices();
        assert_eq!(vertices.len(), 12);
        assert_eq!(ICOSAHEDRON_INDICES.len(), 60);
        assert!(ICOSAHEDRON_INDICES.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn icosahedron_vertices_share_radius() {
        let vertices = icosahedron_vertices();
        let radius = |v: &Vertex| (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
        let r0 = radius(&vertices[0]);
        assert!(vertices.iter().all(|v| close(radius(v), r0)));
    }

    #[test]
    fn triangle_indices_in_bounds() {
        assert!(TRIANGLE_INDICES.iter().all(|&i| (i as usize) < TRIANGLE_VERTICES.len()));
    }

    #[test]
    fn animation_at_rest() {
        assert_eq!(animated_triangle(0.0), TRIANGLE_VERTICES);
        assert!(animated_transform(0.0) == Matrix4::identity());
    }

    #[test]
    fn animation_at_known_time() {
        let t = FRAC_PI_2;
        let scale = (t * 5.0).sin() * 0.5 + 1.0;
        let bias = (t * 3.0).sin() * 0.5;
        assert!(close(scale, 1.5));
        assert!(close(bias, -0.5));

        let vertices = animated_triangle(t);
        assert!(close(vertices[0].x, -1.25));
        assert!(close(vertices[0].y, -0.75));
        assert!(close(vertices[1].x, -0.5));
        assert!(close(vertices[1].y, 0.75));
        assert!(close(vertices[2].x, 0.25));
    }

    #[test]
    fn time_is_half_speed() {
        assert!(close(animation_time(time::Duration::from_secs(3)), 1.5));
    }

    #[test]
    fn instances_spread_diagonally() {
        let translations: Vec<(f32, f32)> = (0..INSTANCE_COUNT)
            .map(|i| {
                let m = instance_transform(i);
                (m.w.x, m.w.y)
            })
            .collect();
        assert_eq!(translations, vec![(-1.5, -0.5), (0.0, 0.0), (1.5, 0.5)]);
    }

    #[test]
    fn inline_colors_are_padded() {
        assert_eq!(inline_color(1), [0.0, 0.5, 0.0, 0.0]);
    }
}
