/*
 * Fluid Module
 *
 * A stable-fluids solver (diffuse, project, advect) over a coarse grid laid
 * under the flock. The field is purely visual: boids sample a color from
 * the local velocity, and mouse drags stir it.
 *
 * The grid has one ring of boundary cells around `nx x ny` interior cells.
 * Velocities are in cells per second. Relaxation passes are Jacobi sweeps,
 * so every row of a pass can be computed independently.
 */

use nannou::prelude::*;
use rayon::prelude::*;

use crate::geometry::{is_degenerate, EPSILON};
use crate::params::SimulationParams;

// Grids with at least this many cells relax their rows on the rayon pool
const PARALLEL_CELLS: usize = 16 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boundary {
    VelocityX,
    VelocityY,
    Scalar,
}

// Solver settings for one step, derived from params
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidSettings {
    pub diffusion: f32,
    pub viscosity: f32,
    pub fade: f32,
    pub iterations: usize,
    pub mouse_strength: f32,
    pub mouse_density: f32,
}

impl FluidSettings {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            diffusion: params.fluid_diffusion.max(0.0),
            viscosity: params.fluid_viscosity.max(0.0),
            fade: params.fluid_fade.max(0.0),
            iterations: params.fluid_iterations.max(1),
            mouse_strength: params.fluid_mouse_strength,
            mouse_density: params.fluid_mouse_density,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FluidField {
    domain: Rect,
    scale: usize,
    width: usize,
    height: usize,
    vx: Vec<f32>,
    vy: Vec<f32>,
    vx0: Vec<f32>,
    vy0: Vec<f32>,
    density: Vec<f32>,
    density0: Vec<f32>,
    scratch: Vec<f32>,
}

impl FluidField {
    /// Allocate a cleared field covering `domain` at one cell per `scale`
    /// world units.
    pub fn new(domain: Rect, scale: usize) -> Self {
        debug_assert!(!is_degenerate(domain), "fluid field over a zero-area domain");
        let scale = scale.max(1);
        let nx = ((domain.w() / scale as f32) as usize).max(1);
        let ny = ((domain.h() / scale as f32) as usize).max(1);
        let width = nx + 2;
        let height = ny + 2;
        let cells = width * height;

        Self {
            domain,
            scale,
            width,
            height,
            vx: vec![0.0; cells],
            vy: vec![0.0; cells],
            vx0: vec![0.0; cells],
            vy0: vec![0.0; cells],
            density: vec![0.0; cells],
            density0: vec![0.0; cells],
            scratch: vec![0.0; cells],
        }
    }

    // Reallocate for a new surface; the field starts over from rest
    pub fn resize(&mut self, domain: Rect, scale: usize) {
        *self = Self::new(domain, scale);
    }

    pub fn clear(&mut self) {
        for buffer in [
            &mut self.vx,
            &mut self.vy,
            &mut self.vx0,
            &mut self.vy0,
            &mut self.density,
            &mut self.density0,
            &mut self.scratch,
        ] {
            buffer.fill(0.0);
        }
    }

    // Grid size including the boundary ring
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn density(&self) -> &[f32] {
        &self.density
    }

    pub fn velocity_x(&self) -> &[f32] {
        &self.vx
    }

    pub fn velocity_y(&self) -> &[f32] {
        &self.vy
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn is_interior(&self, x: i32, y: i32) -> bool {
        x >= 1 && y >= 1 && x <= (self.width - 2) as i32 && y <= (self.height - 2) as i32
    }

    // Continuous grid coordinates; the interior spans [1, n + 1)
    pub fn world_to_cell(&self, position: Vec2) -> Vec2 {
        let nx = (self.width - 2) as f32;
        let ny = (self.height - 2) as f32;
        vec2(
            1.0 + (position.x - self.domain.left()) / self.domain.w() * nx,
            1.0 + (position.y - self.domain.bottom()) / self.domain.h() * ny,
        )
    }

    // World-space size of one grid cell
    pub fn cell_size(&self) -> Vec2 {
        vec2(
            self.domain.w() / (self.width - 2) as f32,
            self.domain.h() / (self.height - 2) as f32,
        )
    }

    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        let size = self.cell_size();
        vec2(
            self.domain.left() + (x as f32 - 0.5) * size.x,
            self.domain.bottom() + (y as f32 - 0.5) * size.y,
        )
    }

    // Interior cell nearest to a world position
    fn nearest_cell(&self, position: Vec2) -> (usize, usize) {
        let cell = self.world_to_cell(position);
        (
            (cell.x.floor() as i32).clamp(1, (self.width - 2) as i32) as usize,
            (cell.y.floor() as i32).clamp(1, (self.height - 2) as i32) as usize,
        )
    }

    // Inject velocity into an interior cell; boundary or outside cells are ignored
    pub fn add_velocity(&mut self, x: usize, y: usize, amount: Vec2) {
        if self.is_interior(x as i32, y as i32) {
            let k = self.index(x, y);
            self.vx[k] += amount.x;
            self.vy[k] += amount.y;
        }
    }

    pub fn add_density(&mut self, x: usize, y: usize, amount: f32) {
        if self.is_interior(x as i32, y as i32) {
            let k = self.index(x, y);
            self.density[k] = (self.density[k] + amount).max(0.0);
        }
    }

    /// Stir the field along a mouse drag from `from` to `to` (world space).
    ///
    /// Every cell on the rasterized line receives a velocity impulse equal to
    /// the drag vector in cells times the mouse strength, plus some density.
    pub fn drag(&mut self, from: Vec2, to: Vec2, settings: &FluidSettings) {
        let start = self.world_to_cell(from);
        let end = self.world_to_cell(to);
        let impulse = (end - start) * settings.mouse_strength;
        if impulse.length_squared() < EPSILON {
            return;
        }

        let cells = line_cells(
            (start.x.floor() as i32, start.y.floor() as i32),
            (end.x.floor() as i32, end.y.floor() as i32),
        );
        for (x, y) in cells {
            if self.is_interior(x, y) {
                self.add_velocity(x as usize, y as usize, impulse);
                self.add_density(x as usize, y as usize, settings.mouse_density);
            }
        }
    }

    /// Advance the field by `dt` seconds.
    ///
    /// Diffuse velocity, project, self-advect, project again, then diffuse
    /// and advect density through the new velocity and fade it. Each pass
    /// reads the fully written output of the previous one.
    pub fn step(&mut self, dt: f32, settings: &FluidSettings) {
        let Self { width, height, vx, vy, vx0, vy0, density, density0, scratch, .. } = self;
        let grid = Grid { width: *width, height: *height };
        let iterations = settings.iterations;

        diffuse(grid, Boundary::VelocityX, vx0, vx, scratch, settings.viscosity, dt, iterations);
        diffuse(grid, Boundary::VelocityY, vy0, vy, scratch, settings.viscosity, dt, iterations);

        // vx / vy are free until the advection below and serve as pressure and divergence
        project(grid, vx0, vy0, vx, vy, scratch, iterations);

        advect(grid, Boundary::VelocityX, vx, vx0, vx0, vy0, dt);
        advect(grid, Boundary::VelocityY, vy, vy0, vx0, vy0, dt);

        project(grid, vx, vy, vx0, vy0, scratch, iterations);

        diffuse(grid, Boundary::Scalar, density0, density, scratch, settings.diffusion, dt, iterations);
        let before = interior_sum(grid, density0);
        advect(grid, Boundary::Scalar, density, density0, vx, vy, dt);

        // Bilinear backtracing is not conservative; never let it add mass
        let after = interior_sum(grid, density);
        if after > before && after > 0.0 {
            let ratio = before / after;
            for d in density.iter_mut() {
                *d *= ratio;
            }
        }

        let fade = settings.fade;
        for d in density.iter_mut() {
            *d = (*d - fade).max(0.0);
        }
    }

    /// Stylized color for a world position, taken straight from the local
    /// velocity components: red from |vx|, green from |vy|, blue from both.
    pub fn sample_color(&self, position: Vec2, gain: f32) -> Vec3 {
        let (x, y) = self.nearest_cell(position);
        let k = self.index(x, y);
        let r = self.vx[k].abs() * gain;
        let g = self.vy[k].abs() * gain;
        vec3(r, g, (r + g) * 0.5).max(Vec3::ZERO).min(Vec3::ONE)
    }

    pub fn velocity_at(&self, position: Vec2) -> Vec2 {
        let (x, y) = self.nearest_cell(position);
        let k = self.index(x, y);
        vec2(self.vx[k], self.vy[k])
    }

    // Sum of density over interior cells
    pub fn total_density(&self) -> f32 {
        interior_sum(Grid { width: self.width, height: self.height }, &self.density)
    }

    pub fn max_speed(&self) -> f32 {
        self.vx
            .iter()
            .zip(&self.vy)
            .map(|(x, y)| (x * x + y * y).sqrt())
            .fold(0.0, f32::max)
    }
}

#[derive(Clone, Copy, Debug)]
struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    // Run `f(y, row)` over every interior row of `out`
    fn for_each_row<F>(self, out: &mut [f32], f: F)
    where
        F: Fn(usize, &mut [f32]) + Sync + Send,
    {
        let interior = self.height - 2;
        if self.width * self.height >= PARALLEL_CELLS {
            out.par_chunks_mut(self.width)
                .enumerate()
                .skip(1)
                .take(interior)
                .for_each(|(y, row)| f(y, row));
        } else {
            out.chunks_mut(self.width)
                .enumerate()
                .skip(1)
                .take(interior)
                .for_each(|(y, row)| f(y, row));
        }
    }
}

fn interior_sum(grid: Grid, x: &[f32]) -> f32 {
    let mut total = 0.0;
    for y in 1..grid.height - 1 {
        let row = y * grid.width;
        total += x[row + 1..row + grid.width - 1].iter().sum::<f32>();
    }
    total
}

/// Reflect velocity across walls and continue scalars into the boundary
/// ring. Corners take the average of their two neighbors.
fn set_boundary(grid: Grid, kind: Boundary, x: &mut [f32]) {
    let (w, h) = (grid.width, grid.height);
    let idx = |i: usize, j: usize| j * w + i;

    for i in 1..w - 1 {
        let sign = if kind == Boundary::VelocityY { -1.0 } else { 1.0 };
        x[idx(i, 0)] = sign * x[idx(i, 1)];
        x[idx(i, h - 1)] = sign * x[idx(i, h - 2)];
    }
    for j in 1..h - 1 {
        let sign = if kind == Boundary::VelocityX { -1.0 } else { 1.0 };
        x[idx(0, j)] = sign * x[idx(1, j)];
        x[idx(w - 1, j)] = sign * x[idx(w - 2, j)];
    }

    x[idx(0, 0)] = 0.5 * (x[idx(1, 0)] + x[idx(0, 1)]);
    x[idx(0, h - 1)] = 0.5 * (x[idx(1, h - 1)] + x[idx(0, h - 2)]);
    x[idx(w - 1, 0)] = 0.5 * (x[idx(w - 2, 0)] + x[idx(w - 1, 1)]);
    x[idx(w - 1, h - 1)] = 0.5 * (x[idx(w - 2, h - 1)] + x[idx(w - 1, h - 2)]);
}

/// Relax `x` toward the solution of `c * x - a * neighbors(x) = x0`.
///
/// Jacobi sweeps starting from the current `x`; the boundary rule is
/// reapplied after every sweep.
#[allow(clippy::too_many_arguments)]
fn lin_solve(
    grid: Grid,
    kind: Boundary,
    x: &mut [f32],
    x0: &[f32],
    scratch: &mut [f32],
    a: f32,
    c: f32,
    iterations: usize,
) {
    let w = grid.width;
    let inv_c = 1.0 / c;

    for _ in 0..iterations {
        {
            let x: &[f32] = x;
            grid.for_each_row(scratch, |j, row| {
                for i in 1..w - 1 {
                    let k = j * w + i;
                    row[i] = (x0[k] + a * (x[k - 1] + x[k + 1] + x[k - w] + x[k + w])) * inv_c;
                }
            });
        }
        set_boundary(grid, kind, scratch);
        x.copy_from_slice(scratch);
    }
}

// Implicit diffusion: stable for any dt
#[allow(clippy::too_many_arguments)]
fn diffuse(
    grid: Grid,
    kind: Boundary,
    x: &mut [f32],
    x0: &[f32],
    scratch: &mut [f32],
    rate: f32,
    dt: f32,
    iterations: usize,
) {
    let a = dt * rate;
    x.copy_from_slice(x0);
    if a <= 0.0 {
        return;
    }
    lin_solve(grid, kind, x, x0, scratch, a, 1.0 + 4.0 * a, iterations);
}

/// Semi-Lagrangian advection: each cell traces back along the velocity
/// field and bilinearly samples `d0` there. Traces are clamped half a cell
/// inside the boundary ring.
fn advect(grid: Grid, kind: Boundary, d: &mut [f32], d0: &[f32], u: &[f32], v: &[f32], dt: f32) {
    let w = grid.width;
    let max_x = (grid.width - 2) as f32 + 0.5;
    let max_y = (grid.height - 2) as f32 + 0.5;

    grid.for_each_row(d, |j, row| {
        for i in 1..w - 1 {
            let k = j * w + i;
            let x = (i as f32 - dt * u[k]).clamp(0.5, max_x);
            let y = (j as f32 - dt * v[k]).clamp(0.5, max_y);

            let i0 = x.floor() as usize;
            let j0 = y.floor() as usize;
            let s1 = x - i0 as f32;
            let t1 = y - j0 as f32;
            let s0 = 1.0 - s1;
            let t0 = 1.0 - t1;

            let k00 = j0 * w + i0;
            row[i] = s0 * (t0 * d0[k00] + t1 * d0[k00 + w]) + s1 * (t0 * d0[k00 + 1] + t1 * d0[k00 + w + 1]);
        }
    });
    set_boundary(grid, kind, d);
}

/// Make (u, v) divergence-free by solving a Poisson equation for pressure
/// and subtracting its gradient. `p` and `div` are scratch buffers.
fn project(
    grid: Grid,
    u: &mut [f32],
    v: &mut [f32],
    p: &mut [f32],
    div: &mut [f32],
    scratch: &mut [f32],
    iterations: usize,
) {
    let w = grid.width;

    {
        let u: &[f32] = u;
        let v: &[f32] = v;
        grid.for_each_row(div, |j, row| {
            for i in 1..w - 1 {
                let k = j * w + i;
                row[i] = -0.5 * (u[k + 1] - u[k - 1] + v[k + w] - v[k - w]);
            }
        });
    }
    set_boundary(grid, Boundary::Scalar, div);
    p.fill(0.0);

    lin_solve(grid, Boundary::Scalar, p, div, scratch, 1.0, 4.0, iterations);

    {
        let p: &[f32] = p;
        grid.for_each_row(u, |j, row| {
            for i in 1..w - 1 {
                let k = j * w + i;
                row[i] -= 0.5 * (p[k + 1] - p[k - 1]);
            }
        });
        grid.for_each_row(v, |j, row| {
            for i in 1..w - 1 {
                let k = j * w + i;
                row[i] -= 0.5 * (p[k + w] - p[k - w]);
            }
        });
    }
    set_boundary(grid, Boundary::VelocityX, u);
    set_boundary(grid, Boundary::VelocityY, v);
}

/// Integer cells on the line between two cells, endpoints included
/// (Bresenham stepping).
pub fn line_cells(from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        cells.push((x, y));
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}
