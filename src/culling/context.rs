/// Occlusion context: resolution state plus one backend kernel bound at construction
///
/// The kernel is chosen once per resolution from the CPU capability vector and stored as a
/// trait object over `Kernel<B, P>`, so the per-tile loops are monomorphized for the backend
/// and merge policy while the context itself stays a single concrete type per policy.
use std::marker::PhantomData;

use tracing::{debug, trace};

use super::backend::{Backend, BackendKind, CpuFeatures, Scalar, TILE_WIDTH};
use super::clipper::{clip_triangle, ClipOutcome, ClipPlanes, ClipQueue, ClipTriangle};
use super::config::CullConfig;
use super::error::{CullError, Result};
use super::raster::{query_occludee, write_occluder};
use super::setup::{project, signed_area, TriangleSetup};
use super::surface::{CullSurface, SurfaceKind};
use super::tile::{MergePolicy, QuickMerge, Tile, TileGrid};
use super::{debug as depth_debug, rect};
use crate::perf::CullCounters;
use crate::{count, count_add, perf_scope};

#[cfg(target_arch = "x86_64")]
use super::backend::{Avx2, Avx512, Sse2};

#[cfg(target_arch = "aarch64")]
use super::backend::Neon;

/// Resolution-bound operations of one backend/policy pair
trait CullKernel: Send {
    fn kind(&self) -> BackendKind;
    fn tile_dims(&self) -> (usize, usize);
    fn clear(&mut self, clear: Tile);
    fn submit(&mut self, surfaces: &mut [CullSurface<'_>]);
    fn test_rect(&mut self, p_min: [f32; 2], p_max: [f32; 2], w_min: f32) -> bool;
    fn dump_depth(&self, out: &mut [f32]);
    fn counters(&self) -> &CullCounters;
    fn counters_mut(&mut self) -> &mut CullCounters;
}

struct Kernel<B: Backend, P: MergePolicy> {
    backend: B,
    grid: TileGrid,
    width: usize,
    height: usize,
    half_w: f32,
    half_h: f32,
    planes: ClipPlanes,
    queue: ClipQueue,
    counters: CullCounters,
    _policy: PhantomData<P>,
}

impl<B: Backend, P: MergePolicy> Kernel<B, P> {
    fn new(backend: B, config: &CullConfig) -> Self {
        let tiles_x = config.width / TILE_WIDTH;
        let tiles_y = config.height / B::TILE_H;
        let clear = Tile::cleared(config.clear_depth, P::LAYER1_CLEAR);

        Self {
            backend,
            grid: TileGrid::new(tiles_x, tiles_y, B::TILE_H, clear),
            width: config.width,
            height: config.height,
            half_w: config.width as f32 * 0.5,
            half_h: config.height as f32 * 0.5,
            planes: ClipPlanes::new(config.width, config.height, config.near_clip),
            queue: ClipQueue::new(),
            counters: CullCounters::new(),
            _policy: PhantomData,
        }
    }

    /// Rasterize whatever the clipper queued. Returns true as soon as an occludee triangle
    /// passes; occluders always drain the queue.
    fn drain_queue(&mut self, kind: SurfaceKind, rasterized: &mut bool) -> bool {
        while let Some(clipped) = self.queue.pop() {
            let projected = clipped.map(|v| project(v, self.half_w, self.half_h));
            if signed_area(&projected) <= 0.0 {
                count!(self.counters.triangles_backfacing);
                continue;
            }

            let Some(tri) = TriangleSetup::new(projected, self.width as i32, self.height as i32, kind) else {
                continue;
            };
            count!(self.counters.triangles_rasterized);
            *rasterized = true;

            match kind {
                SurfaceKind::Occluder => {
                    write_occluder::<B, P>(&self.backend, &mut self.grid, &tri, &mut self.counters);
                }
                SurfaceKind::Occludee => {
                    if query_occludee::<B, P>(&self.backend, &self.grid, &tri, &mut self.counters) {
                        self.queue.clear();
                        return true;
                    }
                }
            }
        }
        false
    }

    fn submit_one(&mut self, surface: &CullSurface<'_>) -> bool {
        surface.validate();

        let mut rasterized = false;
        for t in 0..surface.triangle_count() {
            let [i0, i1, i2] = surface.triangle_indices(t);
            // reversed so counter-clockwise NDC triangles project to positive screen area
            let tri: ClipTriangle = [
                surface.clip_vertex(i2),
                surface.clip_vertex(i1),
                surface.clip_vertex(i0),
            ];
            count!(self.counters.triangles_submitted);

            match clip_triangle(&self.planes, tri, &mut self.queue) {
                ClipOutcome::Rejected => {
                    count!(self.counters.triangles_rejected);
                    continue;
                }
                ClipOutcome::Inside => {}
                ClipOutcome::Clipped(n) => {
                    count!(self.counters.triangles_clipped);
                    count_add!(self.counters.clip_emitted, n);
                }
            }

            if self.drain_queue(surface.kind, &mut rasterized) {
                count!(self.counters.occludee_early_exits);
                return true;
            }
        }

        surface.is_occluder() && rasterized
    }
}

impl<B: Backend, P: MergePolicy> CullKernel for Kernel<B, P> {
    fn kind(&self) -> BackendKind {
        B::KIND
    }

    fn tile_dims(&self) -> (usize, usize) {
        (self.grid.tiles_x(), self.grid.tiles_y())
    }

    fn clear(&mut self, clear: Tile) {
        count!(self.counters.clears);
        self.grid.clear(clear);
    }

    fn submit(&mut self, surfaces: &mut [CullSurface<'_>]) {
        for surface in surfaces.iter_mut() {
            count!(self.counters.surfaces);
            surface.visible = self.submit_one(surface);
        }
    }

    fn test_rect(&mut self, p_min: [f32; 2], p_max: [f32; 2], w_min: f32) -> bool {
        count!(self.counters.rect_tests);
        rect::test_rect::<P>(&self.grid, p_min, p_max, w_min, self.width, self.height)
    }

    fn dump_depth(&self, out: &mut [f32]) {
        depth_debug::dump_depth(&self.grid, self.width, self.height, out);
    }

    fn counters(&self) -> &CullCounters {
        &self.counters
    }

    fn counters_mut(&mut self) -> &mut CullCounters {
        &mut self.counters
    }
}

fn bind<B: Backend, P: MergePolicy>(features: &CpuFeatures, config: &CullConfig) -> Result<Box<dyn CullKernel>> {
    let backend = B::probe(features).ok_or(CullError::UnsupportedBackend { backend: B::KIND })?;
    Ok(Box::new(Kernel::<B, P>::new(backend, config)))
}

fn build_kernel<P: MergePolicy>(
    kind: BackendKind,
    features: &CpuFeatures,
    config: &CullConfig,
) -> Result<Box<dyn CullKernel>> {
    match kind {
        BackendKind::Scalar => bind::<Scalar, P>(features, config),
        #[cfg(target_arch = "x86_64")]
        BackendKind::Sse2 => bind::<Sse2, P>(features, config),
        #[cfg(target_arch = "x86_64")]
        BackendKind::Avx2 => bind::<Avx2, P>(features, config),
        #[cfg(target_arch = "x86_64")]
        BackendKind::Avx512 => bind::<Avx512, P>(features, config),
        #[cfg(target_arch = "aarch64")]
        BackendKind::Neon => bind::<Neon, P>(features, config),
        #[allow(unreachable_patterns)]
        other => Err(CullError::UnsupportedBackend { backend: other }),
    }
}

/// Software occlusion buffer for one view.
///
/// Typical frame: `clear`, submit occluders, submit occludees (their `visible` flag is
/// written), then any number of `test_rect` queries.
pub struct OcclusionContext<P: MergePolicy = QuickMerge> {
    config: CullConfig,
    features: CpuFeatures,
    kernel: Box<dyn CullKernel>,
    _policy: PhantomData<P>,
}

impl<P: MergePolicy> std::fmt::Debug for OcclusionContext<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcclusionContext")
            .field("policy", &P::NAME)
            .field("backend", &self.kernel.kind())
            .field("config", &self.config)
            .finish()
    }
}

impl<P: MergePolicy> OcclusionContext<P> {
    /// Context with the widest backend this CPU supports for `height`.
    ///
    /// Panics if `width` is not a multiple of 32 or the resolution is otherwise invalid.
    pub fn new(width: usize, height: usize, near_clip: f32) -> Self {
        Self::with_config(CullConfig::new(width, height, near_clip))
    }

    pub fn with_config(config: CullConfig) -> Self {
        Self::try_with_config(config)
            .unwrap_or_else(|e| panic!("invalid occlusion context configuration: {}", e))
    }

    pub fn try_with_config(config: CullConfig) -> Result<Self> {
        let features = CpuFeatures::detect();
        let kernel = Self::bind_kernel(&config, &features)?;

        Ok(Self {
            config,
            features,
            kernel,
            _policy: PhantomData,
        })
    }

    fn bind_kernel(config: &CullConfig, features: &CpuFeatures) -> Result<Box<dyn CullKernel>> {
        let kind = config.validate(features)?;
        let kernel = build_kernel::<P>(kind, features, config)?;

        debug!(
            backend = %kind,
            tile_height = kind.tile_height(),
            policy = P::NAME,
            width = config.width,
            height = config.height,
            near_clip = config.near_clip,
            features = ?features,
            "bound occlusion kernel"
        );
        Ok(kernel)
    }

    /// Change resolution or near clip. Rebuilds and clears the tile store when anything
    /// changed; a no-op otherwise.
    pub fn resize(&mut self, width: usize, height: usize, near_clip: f32) {
        self.try_resize(width, height, near_clip)
            .unwrap_or_else(|e| panic!("invalid occlusion context resize: {}", e))
    }

    pub fn try_resize(&mut self, width: usize, height: usize, near_clip: f32) -> Result<()> {
        if self.config.width == width && self.config.height == height && self.config.near_clip == near_clip {
            trace!(width, height, near_clip, "resize unchanged");
            return Ok(());
        }

        let config = CullConfig {
            width,
            height,
            near_clip,
            ..self.config
        };
        let counters = *self.kernel.counters();
        self.kernel = Self::bind_kernel(&config, &self.features)?;
        *self.kernel.counters_mut() = counters;
        self.config = config;
        self.clear();
        Ok(())
    }

    /// Reset every tile to the clear depth
    pub fn clear(&mut self) {
        self.kernel.clear(Tile::cleared(self.config.clear_depth, P::LAYER1_CLEAR));
    }

    /// Rasterize occluders into the tile store and test occludees against it, in order.
    /// Each surface's `visible` flag is overwritten.
    pub fn submit_surfaces(&mut self, surfaces: &mut [CullSurface<'_>]) {
        perf_scope!("submit_surfaces");
        trace!(
            count = surfaces.len(),
            occluders = surfaces.iter().filter(|s| s.is_occluder()).count(),
            "submit surfaces"
        );
        self.kernel.submit(surfaces);
    }

    /// Conservative visibility of an NDC rectangle whose nearest point has view depth `w_min`
    pub fn test_rect(&mut self, p_min: [f32; 2], p_max: [f32; 2], w_min: f32) -> bool {
        self.kernel.test_rect(p_min, p_max, w_min)
    }

    /// Reconstruct per-pixel reciprocal depth into `out` (at least `width * height` values)
    pub fn debug_dump_depth(&self, out: &mut [f32]) {
        self.kernel.dump_depth(out);
    }

    pub fn backend(&self) -> BackendKind {
        self.kernel.kind()
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    pub fn near_clip(&self) -> f32 {
        self.config.near_clip
    }

    /// Tile grid size in tiles (32 x backend tile height pixels each)
    pub fn tile_dims(&self) -> (usize, usize) {
        self.kernel.tile_dims()
    }

    pub fn config(&self) -> &CullConfig {
        &self.config
    }

    pub fn features(&self) -> &CpuFeatures {
        &self.features
    }

    pub fn counters(&self) -> &CullCounters {
        self.kernel.counters()
    }

    pub fn reset_counters(&mut self) {
        self.kernel.counters_mut().reset();
    }
}

impl<P: MergePolicy> Default for OcclusionContext<P> {
    fn default() -> Self {
        Self::with_config(CullConfig::default())
    }
}
