//! Spherical regions on the sky, used to trim catalogs to a footprint.
//!
//! A [`Region`] is a convex spherical polygon whose east and west sides are
//! placed so that its east-west extent looks constant on the sky: the RA
//! half-width at any declination is scaled by `1/cos(dec)`.

mod error;

pub use error::RegionError;

use log::trace;

/// Centre RA of the DC2 footprint \[degrees\].
pub const DC2_RA_MID: f64 = 61.855;
/// RA of the north-east corner of the DC2 footprint \[degrees\].
pub const DC2_RA_NE: f64 = 71.46;
/// Dec of the north-east corner of the DC2 footprint \[degrees\].
pub const DC2_DEC_NE: f64 = -27.25;
/// Southern Dec limit of the DC2 footprint \[degrees\].
pub const DC2_DEC_S: f64 = -44.33;

/// Padding applied to the DC2 footprint before trimming \[degrees\]. The
/// polygon sides are great circles, so without padding objects near the
/// corners of the nominal footprint would be lost.
pub const DC2_PAD_EW: f64 = 0.2;
pub const DC2_PAD_N: f64 = 0.6;
pub const DC2_PAD_S: f64 = 0.2;

/// Anything that can say whether a sky position belongs to it. Positions are
/// always in degrees.
pub trait SkyFilter {
    fn point_in_region(&self, ra_deg: f64, dec_deg: f64) -> bool;

    /// A membership mask for parallel RA and Dec sequences.
    fn mask(&self, ra_deg: &[f64], dec_deg: &[f64]) -> Result<Vec<bool>, RegionError> {
        if ra_deg.len() != dec_deg.len() {
            return Err(RegionError::LengthMismatch {
                ra: ra_deg.len(),
                dec: dec_deg.len(),
            });
        }
        Ok(ra_deg
            .iter()
            .zip(dec_deg)
            .map(|(&ra, &dec)| self.point_in_region(ra, dec))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
}

#[derive(Debug, Clone)]
pub struct Region {
    ra_mid: f64,

    /// `|ra_ne - ra_mid| * cos(dec_ne)`; divide by `cos(dec)` to get the RA
    /// half-width at `dec`.
    dra_scale: f64,

    /// (south, north) \[degrees\].
    dec_range: (f64, f64),

    /// (ra, dec) \[degrees\]: west then east corner for the first declination
    /// bound, then the same for the second.
    corners: [(f64, f64); 4],

    polygon: ConvexPolygon,
}

impl Region {
    /// Build a region from the centre RA, a reference north-east corner and a
    /// declination range. All angles are in degrees.
    pub fn new(
        ra_mid: f64,
        ne_corner: (f64, f64),
        dec_range: (f64, f64),
    ) -> Result<Region, RegionError> {
        let (ra0, dec0) = ne_corner;
        let dra_scale = (ra0 - ra_mid).abs() * dec0.to_radians().cos();

        let mut corners = [(0.0, 0.0); 4];
        for (i, dec) in [dec_range.0, dec_range.1].into_iter().enumerate() {
            let dra = half_width(dra_scale, dec)?;
            corners[2 * i] = (ra_mid - dra, dec);
            corners[2 * i + 1] = (ra_mid + dra, dec);
        }
        trace!("Region corners: {corners:?}");

        let vertices = corners.map(|(ra, dec)| radec_to_xyz(ra.to_radians(), dec.to_radians()));
        let polygon = ConvexPolygon::new(&vertices)?;

        Ok(Region {
            ra_mid,
            dra_scale,
            dec_range,
            corners,
            polygon,
        })
    }

    /// The nominal DC2 footprint.
    pub fn dc2() -> Result<Region, RegionError> {
        Region::new(DC2_RA_MID, (DC2_RA_NE, DC2_DEC_NE), (DC2_DEC_S, DC2_DEC_NE))
    }

    /// The DC2 footprint grown by the given paddings \[degrees\].
    pub fn dc2_padded(pad_ew: f64, pad_n: f64, pad_s: f64) -> Result<Region, RegionError> {
        Region::new(
            DC2_RA_MID,
            (DC2_RA_NE + pad_ew, DC2_DEC_NE + pad_n),
            (DC2_DEC_S - pad_s, DC2_DEC_NE + pad_n),
        )
    }

    /// The deep-drilling field.
    pub fn ddf() -> Result<Region, RegionError> {
        Region::new(53.125, (53.764, -27.533), (-28.667, -27.533))
    }

    pub fn corners(&self) -> &[(f64, f64); 4] {
        &self.corners
    }

    pub fn dec_range(&self) -> (f64, f64) {
        self.dec_range
    }

    pub fn ra_mid(&self) -> f64 {
        self.ra_mid
    }

    /// The RA half-width of the region at `dec` \[degrees\].
    pub fn half_width(&self, dec: f64) -> Result<f64, RegionError> {
        half_width(self.dra_scale, dec)
    }

    pub fn contains_point(&self, ra: f64, dec: f64, unit: AngleUnit) -> bool {
        let (ra, dec) = match unit {
            AngleUnit::Degrees => (ra.to_radians(), dec.to_radians()),
            AngleUnit::Radians => (ra, dec),
        };
        self.polygon.contains(radec_to_xyz(ra, dec))
    }

    /// Given parallel RA and Dec sequences, return a mask that is `true` for
    /// every point inside the region.
    pub fn contains(
        &self,
        ra: &[f64],
        dec: &[f64],
        unit: AngleUnit,
    ) -> Result<Vec<bool>, RegionError> {
        if ra.len() != dec.len() {
            return Err(RegionError::LengthMismatch {
                ra: ra.len(),
                dec: dec.len(),
            });
        }
        Ok(ra
            .iter()
            .zip(dec)
            .map(|(&r, &d)| self.contains_point(r, d, unit))
            .collect())
    }
}

impl SkyFilter for Region {
    fn point_in_region(&self, ra_deg: f64, dec_deg: f64) -> bool {
        self.contains_point(ra_deg, dec_deg, AngleUnit::Degrees)
    }
}

fn half_width(dra_scale: f64, dec: f64) -> Result<f64, RegionError> {
    let dra = (dra_scale / dec.to_radians().cos()).abs();
    if !dra.is_finite() || dra >= 180.0 {
        return Err(RegionError::BadHalfWidth { dec, dra });
    }
    Ok(dra)
}

/// Convert (RA, Dec) in radians to a unit vector `[x, y, z]`.
pub(crate) fn radec_to_xyz(ra: f64, dec: f64) -> [f64; 3] {
    let cos_dec = dec.cos();
    [cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin()]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalise(a: [f64; 3]) -> Option<[f64; 3]> {
    let norm = dot(a, a).sqrt();
    if norm < 1e-12 {
        None
    } else {
        Some([a[0] / norm, a[1] / norm, a[2] / norm])
    }
}

/// A convex polygon on the unit sphere, with great-circle edges.
#[derive(Debug, Clone)]
struct ConvexPolygon {
    /// `vertices[i] x vertices[i + 1]` around the ring. The inside of the
    /// polygon has a non-negative dot product with every edge normal.
    edge_normals: Vec<[f64; 3]>,
}

impl ConvexPolygon {
    /// Build a polygon from unit vectors in any order.
    fn new(points: &[[f64; 3]]) -> Result<ConvexPolygon, RegionError> {
        const EPS: f64 = 1e-12;

        let mut vertices: Vec<[f64; 3]> = Vec::with_capacity(points.len());
        for &p in points {
            if !vertices.iter().any(|&v| dot(v, p) > 1.0 - EPS) {
                vertices.push(p);
            }
        }
        if vertices.len() < 3 {
            return Err(RegionError::TooFewVertices(vertices.len()));
        }

        let centre = vertices
            .iter()
            .fold([0.0; 3], |acc, v| [acc[0] + v[0], acc[1] + v[1], acc[2] + v[2]]);
        let centre = normalise(centre).ok_or(RegionError::NotConvex)?;
        if vertices.iter().any(|&v| dot(v, centre) <= 0.0) {
            return Err(RegionError::NotConvex);
        }

        // Order the vertices by their angle around the centre.
        let east = normalise(cross([0.0, 0.0, 1.0], centre))
            .or_else(|| normalise(cross([1.0, 0.0, 0.0], centre)))
            .ok_or(RegionError::NotConvex)?;
        let north = cross(centre, east);
        let angle = |v: &[f64; 3]| dot(*v, north).atan2(dot(*v, east));
        vertices.sort_by(|a, b| angle(a).total_cmp(&angle(b)));

        let edges = |vertices: &[[f64; 3]]| -> Vec<[f64; 3]> {
            (0..vertices.len())
                .map(|i| cross(vertices[i], vertices[(i + 1) % vertices.len()]))
                .collect()
        };
        let mut edge_normals = edges(&vertices);
        if dot(edge_normals[0], centre) < 0.0 {
            vertices.reverse();
            edge_normals = edges(&vertices);
        }

        for normal in &edge_normals {
            if dot(*normal, centre) <= 0.0 || vertices.iter().any(|&v| dot(*normal, v) < -EPS) {
                return Err(RegionError::NotConvex);
            }
        }

        Ok(ConvexPolygon { edge_normals })
    }

    fn contains(&self, p: [f64; 3]) -> bool {
        self.edge_normals.iter().all(|&n| dot(n, p) >= 0.0)
    }
}
