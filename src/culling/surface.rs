/// Per-draw surface descriptions submitted for occlusion writes and queries
use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Writes its depth into the tile store
    Occluder,
    /// Tested against the tile store, never writes
    Occludee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
}

/// Index source for a surface
#[derive(Debug, Clone, Copy)]
pub enum Indices<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
    /// Vertices are consumed in order
    Sequential,
}

/// Index list of a unit box built by `bbox_corners`, 12 triangles
pub const BBOX_INDICES: [u8; 36] = [
    0, 1, 2, 2, 1, 3, //
    0, 4, 5, 0, 5, 1, //
    0, 2, 4, 4, 2, 6, //
    2, 3, 6, 6, 3, 7, //
    3, 1, 5, 3, 5, 7, //
    4, 6, 5, 5, 6, 7,
];

/// The 8 corners of an axis-aligned box as packed xyz triples, in the order `BBOX_INDICES`
/// expects (bit 0 = x, bit 1 = z, bit 2 = y). Outward faces wind counter-clockwise under a
/// right-handed view (camera looking down -z).
pub fn bbox_corners(min: Vec3, max: Vec3) -> [f32; 24] {
    let mut out = [0f32; 24];
    for (i, corner) in out.chunks_exact_mut(3).enumerate() {
        corner[0] = if i & 1 != 0 { max.x } else { min.x };
        corner[1] = if i & 4 != 0 { max.y } else { min.y };
        corner[2] = if i & 2 != 0 { max.z } else { min.z };
    }
    out
}

/// A borrowed vertex/index stream plus the transform placing it in clip space.
///
/// `vertices` is a packed float buffer; each vertex starts with an object-space position
/// `(x, y, z)` and occupies `stride` floats. `visible` is written by `submit_surfaces`:
/// for occludees it is the query verdict, for occluders it reports whether any triangle
/// reached the tile store.
#[derive(Debug, Clone, Copy)]
pub struct CullSurface<'a> {
    pub kind: SurfaceKind,
    pub primitive: PrimitiveType,
    pub vertices: &'a [f32],
    pub stride: usize,
    pub base_vertex: u32,
    pub indices: Indices<'a>,
    pub xform: Mat4,
    pub visible: bool,
}

impl<'a> CullSurface<'a> {
    /// Indexed triangle list with tightly packed xyz positions
    pub fn triangles(
        kind: SurfaceKind,
        vertices: &'a [f32],
        indices: Indices<'a>,
        xform: Mat4,
    ) -> Self {
        Self {
            kind,
            primitive: PrimitiveType::Triangles,
            vertices,
            stride: 3,
            base_vertex: 0,
            indices,
            xform,
            visible: false,
        }
    }

    pub fn occluder(vertices: &'a [f32], indices: Indices<'a>, xform: Mat4) -> Self {
        Self::triangles(SurfaceKind::Occluder, vertices, indices, xform)
    }

    pub fn occludee(vertices: &'a [f32], indices: Indices<'a>, xform: Mat4) -> Self {
        Self::triangles(SurfaceKind::Occludee, vertices, indices, xform)
    }

    /// Box occludee over corners produced by `bbox_corners`
    pub fn bbox_occludee(corners: &'a [f32; 24], xform: Mat4) -> Self {
        Self::occludee(corners, Indices::U8(&BBOX_INDICES), xform)
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_base_vertex(mut self, base_vertex: u32) -> Self {
        self.base_vertex = base_vertex;
        self
    }

    pub fn with_primitive(mut self, primitive: PrimitiveType) -> Self {
        self.primitive = primitive;
        self
    }

    #[inline]
    pub fn is_occluder(&self) -> bool {
        self.kind == SurfaceKind::Occluder
    }

    /// Number of whole vertices in the buffer
    pub fn vertex_count(&self) -> usize {
        if self.vertices.len() < 3 {
            0
        } else {
            (self.vertices.len() - 3) / self.stride + 1
        }
    }

    fn index_count(&self) -> usize {
        match self.indices {
            Indices::U8(i) => i.len(),
            Indices::U16(i) => i.len(),
            Indices::U32(i) => i.len(),
            Indices::Sequential => self.vertex_count(),
        }
    }

    #[inline]
    fn index(&self, n: usize) -> u32 {
        match self.indices {
            Indices::U8(i) => i[n] as u32,
            Indices::U16(i) => i[n] as u32,
            Indices::U32(i) => i[n],
            Indices::Sequential => n as u32,
        }
    }

    /// Number of triangles the surface assembles to
    pub fn triangle_count(&self) -> usize {
        let count = self.index_count();
        match self.primitive {
            PrimitiveType::Triangles => count / 3,
            PrimitiveType::TriangleStrip => count.saturating_sub(2),
        }
    }

    /// Vertex indices of triangle `t`, with strip winding normalized
    #[inline]
    pub fn triangle_indices(&self, t: usize) -> [u32; 3] {
        match self.primitive {
            PrimitiveType::Triangles => {
                [self.index(3 * t), self.index(3 * t + 1), self.index(3 * t + 2)]
            }
            PrimitiveType::TriangleStrip => {
                let (a, b) = if t % 2 == 0 { (t, t + 1) } else { (t + 1, t) };
                [self.index(a), self.index(b), self.index(t + 2)]
            }
        }
    }

    /// Transform vertex `index` to clip space, keeping `(x, y, w, 1)`
    #[inline]
    pub fn clip_vertex(&self, index: u32) -> Vec4 {
        let base = (index as usize + self.base_vertex as usize) * self.stride;
        assert!(
            base + 3 <= self.vertices.len(),
            "vertex index {} out of range for a buffer of {} floats",
            index,
            self.vertices.len()
        );
        let p = &self.vertices[base..base + 3];
        let clip = self.xform * Vec4::new(p[0], p[1], p[2], 1.0);
        Vec4::new(clip.x, clip.y, clip.w, 1.0)
    }

    /// Asserts the layout invariants the rasterizer relies on
    pub(crate) fn validate(&self) {
        assert!(self.stride >= 3, "vertex stride must be at least 3 floats, got {}", self.stride);
        if self.primitive == PrimitiveType::Triangles {
            let count = self.index_count();
            assert!(
                count % 3 == 0,
                "triangle list index count {} is not a multiple of 3",
                count
            );
        }
    }
}
