//! HEALPix (Hierarchical Equal Area isoLatitude Pixelisation) lookups in the
//! standard nested scheme.
//!
//! The 12 base pixels are laid out as:
//! - 0–3: north polar cap
//! - 4–7: equatorial belt
//! - 8–11: south polar cap
//!
//! Truth catalogs are sharded into one Parquet file per pixel, and full-sky
//! reddening maps are stored as one value per pixel.

use std::f64::consts::{FRAC_PI_2, TAU};

/// Nside for a given depth: 2^depth.
pub fn nside(depth: u8) -> u64 {
    1u64 << depth
}

/// Total number of pixels at a given depth: 12 * nside^2.
pub fn npix(depth: u8) -> u64 {
    12 * nside(depth) * nside(depth)
}

/// The depth corresponding to a total pixel count, if the count is a valid
/// HEALPix map size.
pub fn depth_from_npix(npix_total: u64) -> Option<u8> {
    if npix_total % 12 != 0 {
        return None;
    }
    let ns2 = npix_total / 12;
    (0..30).find(|&depth| nside(depth) * nside(depth) == ns2)
}

/// Convert (lon, lat) in radians to a nested HEALPix pixel index.
///
/// `lon` is right ascension in any range (it is wrapped into [0, 2π)). `lat`
/// is declination in [-π/2, π/2].
pub fn lon_lat_to_nested(lon: f64, lat: f64, depth: u8) -> u64 {
    let ns = nside(depth) as i64;
    let z = lat.sin();
    let za = z.abs();
    let phi = lon.rem_euclid(TAU);
    // In [0, 4).
    let tt = (phi / FRAC_PI_2).min(4.0 - f64::EPSILON);

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        // Equatorial belt. jp and jm index the ascending and descending edge
        // lines.
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp >> depth;
        let ifm = jm >> depth;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        let ix = jm & (ns - 1);
        let iy = ns - (jp & (ns - 1)) - 1;
        (face, ix, iy)
    } else {
        // Polar caps.
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z >= 0.0 {
            (ntt, ns - jm - 1, ns - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    ((face as u64) << (2 * depth)) + spread_bits(ix as u64) + (spread_bits(iy as u64) << 1)
}

/// Spread the bits of `v` onto the even bit positions.
fn spread_bits(v: u64) -> u64 {
    let mut result = 0;
    let mut bit = 0;
    let mut vv = v;
    while vv > 0 {
        result |= (vv & 1) << (2 * bit);
        vv >>= 1;
        bit += 1;
    }
    result
}

/// The name of the truth-summary Parquet shard for a pixel.
pub fn summary_filename(pixel: u32) -> String {
    format!("truth_summary_hp{pixel}.parquet")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_pixels_at_depth_zero() {
        // Equator.
        assert_eq!(lon_lat_to_nested(0.0, 0.0, 0), 4);
        assert_eq!(lon_lat_to_nested(90_f64.to_radians(), 0.0, 0), 5);
        // Caps.
        assert_eq!(
            lon_lat_to_nested(45_f64.to_radians(), 60_f64.to_radians(), 0),
            0
        );
        assert_eq!(
            lon_lat_to_nested(135_f64.to_radians(), 60_f64.to_radians(), 0),
            1
        );
        assert_eq!(lon_lat_to_nested(0.0, -FRAC_PI_2, 0), 8);
        assert_eq!(
            lon_lat_to_nested(300_f64.to_radians(), -60_f64.to_radians(), 0),
            11
        );
    }

    #[test]
    fn nested_children_share_parent() {
        let points = [
            (0.0, 0.0),
            (61.855, -35.0),
            (53.125, -28.1),
            (200.0, 75.0),
            (359.9, -89.0),
        ];
        for (ra, dec) in points {
            let (lon, lat) = (f64::to_radians(ra), f64::to_radians(dec));
            for depth in 1..10 {
                let child = lon_lat_to_nested(lon, lat, depth);
                let parent = lon_lat_to_nested(lon, lat, depth - 1);
                assert!(child < npix(depth));
                assert_eq!(child >> 2, parent, "({ra}, {dec}) at depth {depth}");
            }
        }
    }

    #[test]
    fn every_pixel_is_reachable() {
        let depth = 2;
        let mut seen = vec![false; npix(depth) as usize];
        for i_dec in 0..180 {
            let dec = (-89.5 + i_dec as f64).to_radians();
            for i_ra in 0..360 {
                let ra = (i_ra as f64 + 0.5).to_radians();
                seen[lon_lat_to_nested(ra, dec, depth) as usize] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_depth_from_npix() {
        assert_eq!(depth_from_npix(12), Some(0));
        assert_eq!(depth_from_npix(12 * 1024 * 1024), Some(10));
        assert_eq!(depth_from_npix(13), None);
        assert_eq!(depth_from_npix(36), None);
    }

    #[test]
    fn test_summary_filename() {
        assert_eq!(summary_filename(9556), "truth_summary_hp9556.parquet");
    }
}
