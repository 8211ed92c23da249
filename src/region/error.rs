use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("The region's RA half-width at Dec {dec} deg is unusable ({dra} deg); is the Dec bound at a pole?")]
    BadHalfWidth { dec: f64, dra: f64 },

    #[error("A region polygon needs at least 3 distinct vertices, but only {0} were supplied")]
    TooFewVertices(usize),

    #[error("The region corners do not form a convex polygon smaller than a hemisphere")]
    NotConvex,

    #[error("Got {ra} RA values but {dec} Dec values; these must be the same length")]
    LengthMismatch { ra: usize, dec: usize },
}
