/// Homogeneous clipping of occlusion triangles against a padded view frustum
///
/// Vertices are `(x, y, w, 1)`: clip-space z is never needed because the tile store keeps
/// reciprocal W. The four side planes are pushed out by one pixel (2/width, 2/height) so
/// that edges exactly on the screen border do not produce slivers.
use glam::Vec4;

/// Planes a triangle can cross
pub const CLIP_PLANE_COUNT: usize = 5;

/// Worst case polygon: a triangle cut by every plane
pub const MAX_CLIP_VERTS: usize = 3 + CLIP_PLANE_COUNT;

/// Triangles that can be queued from one clipped input triangle
pub const CLIP_QUEUE_CAPACITY: usize = 8;

pub type ClipTriangle = [Vec4; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlanes {
    planes: [Vec4; CLIP_PLANE_COUNT],
}

impl ClipPlanes {
    /// Left, right, top, bottom, near
    pub fn new(width: usize, height: usize, near_clip: f32) -> Self {
        let pad_w = 2.0 / width as f32;
        let pad_h = 2.0 / height as f32;

        Self {
            planes: [
                Vec4::new(1.0 - pad_w, 0.0, 1.0, 0.0),
                Vec4::new(-1.0 + pad_w, 0.0, 1.0, 0.0),
                Vec4::new(0.0, -1.0 + pad_h, 1.0, 0.0),
                Vec4::new(0.0, 1.0 - pad_h, 1.0, 0.0),
                Vec4::new(0.0, 0.0, 1.0, -near_clip),
            ],
        }
    }

    #[inline]
    pub fn planes(&self) -> &[Vec4; CLIP_PLANE_COUNT] {
        &self.planes
    }
}

/// What happened to one input triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// All vertices outside one plane
    Rejected,
    /// Entirely inside, pushed as is
    Inside,
    /// Cut by at least one plane; carries the number of triangles queued (may be 0)
    Clipped(usize),
}

/// Bounded FIFO of triangles waiting for rasterization
#[derive(Debug, Clone)]
pub struct ClipQueue {
    tris: [ClipTriangle; CLIP_QUEUE_CAPACITY],
    head: usize,
    len: usize,
}

impl Default for ClipQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipQueue {
    pub const fn new() -> Self {
        Self {
            tris: [[Vec4::ZERO; 3]; CLIP_QUEUE_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn push(&mut self, tri: ClipTriangle) {
        assert!(self.len < CLIP_QUEUE_CAPACITY, "clip queue overflow");
        let tail = (self.head + self.len) % CLIP_QUEUE_CAPACITY;
        self.tris[tail] = tri;
        self.len += 1;
    }

    /// Drop anything still queued
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    #[inline]
    pub fn pop(&mut self) -> Option<ClipTriangle> {
        if self.len == 0 {
            return None;
        }
        let tri = self.tris[self.head];
        self.head = (self.head + 1) % CLIP_QUEUE_CAPACITY;
        self.len -= 1;
        Some(tri)
    }
}

/// Classify a triangle against every plane and queue what survives.
pub fn clip_triangle(planes: &ClipPlanes, tri: ClipTriangle, queue: &mut ClipQueue) -> ClipOutcome {
    let mut crossed = [false; CLIP_PLANE_COUNT];
    let mut any_crossed = false;

    for (plane, crossed) in planes.planes().iter().zip(crossed.iter_mut()) {
        let mut outside = 0;
        for v in &tri {
            if plane.dot(*v) < 0.0 {
                outside += 1;
            }
        }
        if outside == 3 {
            return ClipOutcome::Rejected;
        }
        *crossed = outside > 0;
        any_crossed |= *crossed;
    }

    if !any_crossed {
        queue.push(tri);
        return ClipOutcome::Inside;
    }

    let mut buffers = [[Vec4::ZERO; MAX_CLIP_VERTS]; 2];
    buffers[0][..3].copy_from_slice(&tri);
    let mut count = 3;
    let mut current = 0;

    for (plane, _) in planes.planes().iter().zip(crossed).filter(|(_, c)| *c) {
        let (src, dst) = split_ping_pong(&mut buffers, current);
        count = clip_polygon(&src[..count], *plane, dst);
        current ^= 1;
        if count < 3 {
            return ClipOutcome::Clipped(0);
        }
    }

    let poly = &buffers[current][..count];
    for i in 1..count - 1 {
        queue.push([poly[0], poly[i], poly[i + 1]]);
    }
    ClipOutcome::Clipped(count - 2)
}

#[inline]
fn split_ping_pong(
    buffers: &mut [[Vec4; MAX_CLIP_VERTS]; 2],
    current: usize,
) -> (&[Vec4; MAX_CLIP_VERTS], &mut [Vec4; MAX_CLIP_VERTS]) {
    let (a, b) = buffers.split_at_mut(1);
    if current == 0 {
        (&a[0], &mut b[0])
    } else {
        (&b[0], &mut a[0])
    }
}

/// Clip a convex polygon against one plane (keep `dot(plane, v) >= 0`).
/// Returns the number of vertices written to `output`.
pub fn clip_polygon(input: &[Vec4], plane: Vec4, output: &mut [Vec4; MAX_CLIP_VERTS]) -> usize {
    let Some(&last) = input.last() else {
        return 0;
    };

    let mut out_len = 0usize;
    let mut prev = last;
    let mut prev_dist = plane.dot(prev);

    for &curr in input {
        let curr_dist = plane.dot(curr);
        match (prev_dist >= 0.0, curr_dist >= 0.0) {
            (true, true) => {
                output[out_len] = curr;
                out_len += 1;
            }
            (true, false) => {
                output[out_len] = intersect(prev, prev_dist, curr, curr_dist);
                out_len += 1;
            }
            (false, true) => {
                output[out_len] = intersect(curr, curr_dist, prev, prev_dist);
                out_len += 1;
                output[out_len] = curr;
                out_len += 1;
            }
            (false, false) => {}
        }

        prev = curr;
        prev_dist = curr_dist;
    }

    out_len
}

/// Point where the segment crosses the plane, interpolated from the inside endpoint so the
/// shared edge of two neighbouring triangles produces the same vertex
#[inline]
fn intersect(inside: Vec4, inside_dist: f32, outside: Vec4, outside_dist: f32) -> Vec4 {
    let t = inside_dist / (inside_dist - outside_dist);
    inside + (outside - inside) * t
}
