//! Milky Way dust extinction.
//!
//! `Av = Rv * E(B-V)`, where the colour excess E(B-V) comes from a reddening
//! model and Rv is a fixed ratio (3.1 by default).

use std::path::Path;

use log::{debug, info};

use super::ColumnError;
use crate::{
    healpix::{depth_from_npix, lon_lat_to_nested},
    read::{parquet::column_as_f64, RowGroupReader},
};

/// The usual Milky Way ratio of total to selective extinction.
pub const DEFAULT_RV: f64 = 3.1;

/// A source of colour excess E(B-V) at a sky position \[degrees\].
pub trait EbvModel {
    fn ebv(&self, ra_deg: f64, dec_deg: f64) -> f64;
}

/// The same E(B-V) everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantEbv(pub f64);

impl EbvModel for ConstantEbv {
    fn ebv(&self, _ra_deg: f64, _dec_deg: f64) -> f64 {
        self.0
    }
}

/// A full-sky E(B-V) map in the nested HEALPix scheme.
#[derive(Debug, Clone)]
pub struct HealpixEbvMap {
    depth: u8,
    values: Vec<f64>,
}

impl HealpixEbvMap {
    pub fn new(values: Vec<f64>) -> Result<HealpixEbvMap, ColumnError> {
        let depth =
            depth_from_npix(values.len() as u64).ok_or(ColumnError::BadMapSize(values.len()))?;
        debug!("E(B-V) map has nside {}", 1u64 << depth);
        Ok(HealpixEbvMap { depth, values })
    }

    /// Load a map from a Parquet file with an `ebv` column holding one value
    /// per pixel, in pixel order.
    pub fn from_parquet<P: AsRef<Path>>(path: P) -> Result<HealpixEbvMap, ColumnError> {
        let path = path.as_ref();
        info!("Reading E(B-V) map {}", path.display());
        let reader = RowGroupReader::new(path)?;
        let mut values = Vec::with_capacity(reader.num_rows());
        for i_row_group in 0..reader.num_row_groups() {
            let batch = reader.read_row_group(i_row_group)?;
            values.extend(column_as_f64(&batch, "ebv", path)?);
        }
        HealpixEbvMap::new(values)
    }
}

impl EbvModel for HealpixEbvMap {
    fn ebv(&self, ra_deg: f64, dec_deg: f64) -> f64 {
        let pixel = lon_lat_to_nested(ra_deg.to_radians(), dec_deg.to_radians(), self.depth);
        self.values[pixel as usize]
    }
}

/// Extinction estimates from a reddening model.
pub struct Extinction {
    model: Box<dyn EbvModel>,
    rv: f64,
}

impl Extinction {
    pub fn new(model: Box<dyn EbvModel>, rv: f64) -> Extinction {
        Extinction { model, rv }
    }

    pub fn rv(&self) -> f64 {
        self.rv
    }

    /// (Av, Rv) at a sky position \[degrees\].
    pub fn estimate_extinction(&self, ra_deg: f64, dec_deg: f64) -> (f64, f64) {
        (self.rv * self.model.ebv(ra_deg, dec_deg), self.rv)
    }

    /// (Av, Rv) for parallel RA and Dec sequences \[degrees\]. Rv is the same
    /// for every point and is broadcast to match Av.
    pub fn estimate_many(&self, ra_deg: &[f64], dec_deg: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let av: Vec<f64> = ra_deg
            .iter()
            .zip(dec_deg)
            .map(|(&ra, &dec)| self.estimate_extinction(ra, dec).0)
            .collect();
        let rv = vec![self.rv; av.len()];
        (av, rv)
    }
}
