//! Pad-plane geometry and raster pad lookup.
//!
//! The canonical AT-TPC pad plane tessellates a circular micromegas with
//! triangular pads: an inner hexagonal region of small pads surrounded by
//! large pads of twice the side length, 10240 pads in total. Lookup from a
//! projected (x, y) to a pad id goes through a precomputed raster so the
//! event generator's inner loop stays O(1) per spatial sample.

use ndarray::Array2;
use tpcrec_core::error::ProjectionError;

/// Sentinel id for raster cells not covered by any pad.
pub const NO_PAD: u16 = u16::MAX;

/// Radius of the pad plane, m.
pub const PLANE_RADIUS: f64 = 0.275;

/// Side length of a large pad, m.
pub const LARGE_PAD_SIDE: f64 = 0.0099;

/// Number of large-pad rows (per half-plane) subdivided into small pads.
const HEX_ROWS: i64 = 28;

/// Canonical raster parameters: 0.5 mm cells over [-0.28, 0.28] m.
const LUT_CELL: f64 = 0.0005;
const LUT_MIN: f64 = -0.28;
const LUT_DIM: usize = 1120;

/// One triangular pad as three (x, y) vertices.
pub type PadVertices = [[f64; 2]; 3];

/// Generate the vertices of every pad on the canonical plane, optionally
/// rotated in-plane by `rotation` (rad).
///
/// Pads are laid out in horizontal rows of alternating up/down equilateral
/// triangles; each row's width is set by the circle chord at the row's
/// vertical center. Rows of the inner hexagonal region (shrinking by one
/// pad column per row) are quartered into small pads. Ids follow
/// generation order: upper-half rows from the mid-plane outward, then the
/// mirrored lower half.
#[must_use]
pub fn generate_pad_coordinates(rotation: f64) -> Vec<PadVertices> {
    let side = LARGE_PAD_SIDE;
    let height = side * 3.0_f64.sqrt() / 2.0;
    let nrows = (PLANE_RADIUS / height) as i64;
    let (cos_r, sin_r) = (rotation.cos(), rotation.sin());

    let mut pads = Vec::new();
    for y_sign in [1.0, -1.0] {
        for j in 0..nrows {
            let y_ref = (j as f64 + 0.5) * height;
            if y_ref >= PLANE_RADIUS {
                continue;
            }
            let half_width = (PLANE_RADIUS * PLANE_RADIUS - y_ref * y_ref).sqrt();
            let m = (2.0 * half_width / side).round() as i64 - 1;
            if m < 0 {
                continue;
            }
            let hex_half = if j < HEX_ROWS { HEX_ROWS - 1 - j } else { -1 };
            let y_base = j as f64 * height;
            let y_apex = y_base + height;

            for i in -m..=m {
                let xc = i as f64 * side / 2.0;
                let points_up = i.rem_euclid(2) == 0;
                let tri: PadVertices = if points_up {
                    [
                        [xc - side / 2.0, y_sign * y_base],
                        [xc + side / 2.0, y_sign * y_base],
                        [xc, y_sign * y_apex],
                    ]
                } else {
                    [
                        [xc - side / 2.0, y_sign * y_apex],
                        [xc + side / 2.0, y_sign * y_apex],
                        [xc, y_sign * y_base],
                    ]
                };
                if i.abs() <= hex_half {
                    for sub in quarter(&tri) {
                        pads.push(rotate_pad(&sub, cos_r, sin_r));
                    }
                } else {
                    pads.push(rotate_pad(&tri, cos_r, sin_r));
                }
            }
        }
    }
    pads
}

/// Quarter a triangle into four congruent triangles via edge midpoints.
fn quarter(tri: &PadVertices) -> [PadVertices; 4] {
    let [a, b, c] = *tri;
    let mab = [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0];
    let mac = [(a[0] + c[0]) / 2.0, (a[1] + c[1]) / 2.0];
    let mbc = [(b[0] + c[0]) / 2.0, (b[1] + c[1]) / 2.0];
    [
        [a, mab, mac],
        [mab, b, mbc],
        [mac, mbc, c],
        [mab, mbc, mac],
    ]
}

fn rotate_pad(tri: &PadVertices, cos_r: f64, sin_r: f64) -> PadVertices {
    let rot = |p: [f64; 2]| {
        [
            p[0] * cos_r - p[1] * sin_r,
            p[0] * sin_r + p[1] * cos_r,
        ]
    };
    [rot(tri[0]), rot(tri[1]), rot(tri[2])]
}

/// Signed-area point-in-triangle test, boundary inclusive, winding
/// agnostic.
fn point_in_triangle(px: f64, py: f64, tri: &PadVertices) -> bool {
    let sign = |a: [f64; 2], b: [f64; 2]| (px - b[0]) * (a[1] - b[1]) - (a[0] - b[0]) * (py - b[1]);
    let d1 = sign(tri[0], tri[1]);
    let d2 = sign(tri[1], tri[2]);
    let d3 = sign(tri[2], tri[0]);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Raster lookup from a projected (x, y) to the pad beneath it.
///
/// The lookup table lives in the unrotated pad frame; `pad_at` first
/// counter-rotates its input by the configured plane rotation, then
/// discretizes. Immutable after construction and safe to share across
/// threads.
#[derive(Clone, Debug)]
pub struct PadPlane {
    lut: Array2<u16>,
    x_min: f64,
    dx: f64,
    y_min: f64,
    dy: f64,
    rotation: f64,
    centers: Option<Vec<[f64; 2]>>,
}

impl PadPlane {
    /// Build from a caller-supplied lookup table and grid scalars.
    ///
    /// `lut` is indexed as `[iy, ix]`; `x_min`/`y_min` are the coordinates
    /// of the low edge of cell (0, 0) and `dx`/`dy` the cell pitch.
    pub fn new(
        lut: Array2<u16>,
        x_min: f64,
        dx: f64,
        y_min: f64,
        dy: f64,
        rotation: f64,
    ) -> Result<Self, ProjectionError> {
        if lut.is_empty() {
            return Err(ProjectionError::InvalidArgument(
                "pad lookup table is empty".into(),
            ));
        }
        if !(dx > 0.0) || !(dy > 0.0) {
            return Err(ProjectionError::InvalidArgument(format!(
                "pad lookup cell pitch must be positive, got dx={dx}, dy={dy}"
            )));
        }
        Ok(Self {
            lut,
            x_min,
            dx,
            y_min,
            dy,
            rotation,
            centers: None,
        })
    }

    /// Build the canonical 10240-pad plane with the bundled raster
    /// parameters, rotated in-plane by `rotation` (rad).
    #[must_use]
    pub fn canonical(rotation: f64) -> Self {
        let pads = generate_pad_coordinates(0.0);
        let lut = rasterize(&pads, LUT_MIN, LUT_CELL, LUT_DIM);

        let (cos_r, sin_r) = (rotation.cos(), rotation.sin());
        let centers = pads
            .iter()
            .map(|t| {
                let cx = (t[0][0] + t[1][0] + t[2][0]) / 3.0;
                let cy = (t[0][1] + t[1][1] + t[2][1]) / 3.0;
                [cx * cos_r - cy * sin_r, cx * sin_r + cy * cos_r]
            })
            .collect();

        Self {
            lut,
            x_min: LUT_MIN,
            dx: LUT_CELL,
            y_min: LUT_MIN,
            dy: LUT_CELL,
            rotation,
            centers: Some(centers),
        }
    }

    /// The pad beneath point (x, y), or [`NO_PAD`] for covered-grid cells
    /// that belong to no pad. Points outside the raster grid fail with
    /// [`ProjectionError::LookupMiss`].
    pub fn pad_at(&self, x: f64, y: f64) -> Result<u16, ProjectionError> {
        let (cos_r, sin_r) = (self.rotation.cos(), self.rotation.sin());
        let xr = x * cos_r + y * sin_r;
        let yr = -x * sin_r + y * cos_r;
        let fx = (xr - self.x_min) / self.dx;
        let fy = (yr - self.y_min) / self.dy;
        if fx < 0.0 || fy < 0.0 {
            return Err(ProjectionError::LookupMiss { x, y });
        }
        let (ix, iy) = (fx as usize, fy as usize);
        let (ny, nx) = self.lut.dim();
        if ix >= nx || iy >= ny {
            return Err(ProjectionError::LookupMiss { x, y });
        }
        Ok(self.lut[[iy, ix]])
    }

    /// In-plane rotation of the pad plane, rad.
    #[inline]
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Physical pad centers (rotated frame), available when the plane was
    /// built from the canonical geometry.
    #[must_use]
    pub fn pad_centers(&self) -> Option<&[[f64; 2]]> {
        self.centers.as_deref()
    }

    /// Number of distinct pads the lookup table can return.
    #[must_use]
    pub fn pad_count(&self) -> usize {
        self.centers
            .as_ref()
            .map_or(tpcrec_core::NUM_PADS, Vec::len)
    }
}

/// Rasterize triangles onto a square grid; each cell stores the id of the
/// first triangle containing its center, or [`NO_PAD`].
fn rasterize(pads: &[PadVertices], grid_min: f64, cell: f64, dim: usize) -> Array2<u16> {
    // Coarse bbox bins so each cell only tests nearby triangles.
    const BIN: f64 = 0.01;
    let nbins = ((2.0 * grid_min.abs()) / BIN).ceil() as usize + 1;
    let bin_of = |v: f64| (((v - grid_min) / BIN) as usize).min(nbins - 1);

    let mut bins: Vec<Vec<u16>> = vec![Vec::new(); nbins * nbins];
    for (id, tri) in pads.iter().enumerate() {
        let xs = [tri[0][0], tri[1][0], tri[2][0]];
        let ys = [tri[0][1], tri[1][1], tri[2][1]];
        let (x_lo, x_hi) = (xs.iter().fold(f64::MAX, |a, &b| a.min(b)), xs.iter().fold(f64::MIN, |a, &b| a.max(b)));
        let (y_lo, y_hi) = (ys.iter().fold(f64::MAX, |a, &b| a.min(b)), ys.iter().fold(f64::MIN, |a, &b| a.max(b)));
        for by in bin_of(y_lo)..=bin_of(y_hi) {
            for bx in bin_of(x_lo)..=bin_of(x_hi) {
                bins[by * nbins + bx].push(id as u16);
            }
        }
    }

    let mut lut = Array2::from_elem((dim, dim), NO_PAD);
    for iy in 0..dim {
        let py = grid_min + (iy as f64 + 0.5) * cell;
        for ix in 0..dim {
            let px = grid_min + (ix as f64 + 0.5) * cell;
            let candidates = &bins[bin_of(py) * nbins + bin_of(px)];
            for &id in candidates {
                if point_in_triangle(px, py, &pads[id as usize]) {
                    lut[[iy, ix]] = id;
                    break;
                }
            }
        }
    }
    lut
}
