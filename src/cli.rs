//! Command-line interface: one subcommand per conversion.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::{AppSettings, Args, Parser, Subcommand};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    columns::{ConstantEbv, EbvModel, Extinction, HealpixEbvMap, DEFAULT_RV},
    config::{
        chunk_size, dir_or_default, path_or_default, ConfigError, TransformConfig,
        GALTRUTH_SUBDIR, SN_SUBDIR, STAR_SUBDIR,
    },
    jobs::{
        add_avrv::{add_avrv, AddAvRvParams, DEFAULT_PIXELS},
        complete_sn::{self, complete_sn_summary, CompleteSnParams},
        star_summary::{self, star_summary, StarSummaryParams},
        trim_region::{self, trim_region, TrimRegionParams},
        trim_sn::{self, trim_sn_summary, TrimSnParams},
        variability::{self, restrict_variability, Kind, VariabilityParams},
    },
    region::{Region, DC2_PAD_EW, DC2_PAD_N, DC2_PAD_S},
    TruthReorgError,
};

#[derive(Debug, Parser)]
#[clap(version, author, about = "Reorganise DC2 star and supernova truth catalogs")]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
pub struct TruthReorgArgs {
    #[clap(flatten)]
    pub global_opts: GlobalArgs,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    pub verbosity: u8,

    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    pub no_progress_bars: bool,

    /// Go through the motions (read inputs, compute new columns) without
    /// creating any files.
    #[clap(short = 'n', long)]
    #[clap(global = true)]
    pub dry_run: bool,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
pub enum Command {
    /// Copy a table, keeping only rows inside a sky region.
    TrimRegion(TrimRegionArgs),

    /// Drop supernovae outside the DC2 footprint or from the deep drilling
    /// run, and add SALT2 parameters.
    TrimSnSummary(TrimSnArgs),

    /// Add integer ids, extinction and per-band maximum flux changes to a
    /// trimmed supernova summary.
    CompleteSnSummary(CompleteSnArgs),

    /// Make the star summary from the old summary and light-curve statistics.
    StarSummary(StarSummaryArgs),

    /// Restrict star light curves to the stars in a new star summary.
    StarVariability(VariabilityArgs),

    /// Restrict supernova light curves to the supernovae in a new supernova
    /// summary.
    SnVariability(VariabilityArgs),

    /// Append av and rv columns to healpix-sharded Parquet summaries.
    AddAvrv(AddAvRvArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::TrimRegion(_) => "trim-region",
            Command::TrimSnSummary(_) => "trim-sn-summary",
            Command::CompleteSnSummary(_) => "complete-sn-summary",
            Command::StarSummary(_) => "star-summary",
            Command::StarVariability(_) => "star-variability",
            Command::SnVariability(_) => "sn-variability",
            Command::AddAvrv(_) => "add-avrv",
        }
    }
}

#[derive(Debug, Args)]
pub struct ChunkArgs {
    /// The number of rows read, transformed and committed together. Each
    /// conversion has its own default.
    #[clap(long)]
    pub chunk_size: Option<usize>,

    /// Stop after this many chunks. Useful to try a conversion on the start
    /// of a big input.
    #[clap(long)]
    pub max_chunks: Option<NonZeroUsize>,
}

impl ChunkArgs {
    fn into_config(
        self,
        input: PathBuf,
        output: PathBuf,
        table: String,
        default_chunk_size: usize,
        dry_run: bool,
    ) -> Result<TransformConfig, ConfigError> {
        Ok(TransformConfig {
            input,
            output,
            table,
            chunk_size: chunk_size(self.chunk_size.unwrap_or(default_chunk_size))?,
            max_chunks: self.max_chunks,
            dry_run,
        })
    }
}

#[derive(Debug, Args)]
pub struct ExtinctionArgs {
    /// A full-sky E(B-V) map: a Parquet file with an "ebv" column holding a
    /// nested HEALPix map.
    #[clap(long, conflicts_with = "ebv")]
    pub ebv_map: Option<PathBuf>,

    /// Use this E(B-V) everywhere.
    #[clap(long)]
    pub ebv: Option<f64>,

    /// The ratio of total to selective extinction.
    #[clap(long, default_value_t = DEFAULT_RV)]
    pub rv: f64,
}

impl ExtinctionArgs {
    pub fn into_extinction(self) -> Result<Extinction, TruthReorgError> {
        let model: Box<dyn EbvModel> = match (self.ebv_map, self.ebv) {
            (Some(map), _) => Box::new(HealpixEbvMap::from_parquet(map)?),
            (None, Some(ebv)) => Box::new(ConstantEbv(ebv)),
            (None, None) => return Err(ConfigError::NoEbvModel.into()),
        };
        Ok(Extinction::new(model, self.rv))
    }
}

/// The region to trim to. The default is the padded DC2 footprint.
#[derive(Debug, Args)]
pub struct RegionArgs {
    /// Use the DDF region instead of the DC2 footprint.
    #[clap(long)]
    pub ddf: bool,

    /// Padding added to the east and west of the DC2 footprint [degrees].
    #[clap(long, default_value_t = DC2_PAD_EW)]
    pub pad_ew: f64,

    /// Padding added to the north of the DC2 footprint [degrees].
    #[clap(long, default_value_t = DC2_PAD_N)]
    pub pad_n: f64,

    /// Padding added to the south of the DC2 footprint [degrees].
    #[clap(long, default_value_t = DC2_PAD_S)]
    pub pad_s: f64,

    /// Middle RA of an explicit region [degrees].
    #[clap(long, allow_hyphen_values = true)]
    pub ra_mid: Option<f64>,

    /// RA of the north-east corner of an explicit region [degrees].
    #[clap(long, allow_hyphen_values = true)]
    pub ne_ra: Option<f64>,

    /// Dec of the north-east corner (the northern limit) of an explicit
    /// region [degrees].
    #[clap(long, allow_hyphen_values = true)]
    pub ne_dec: Option<f64>,

    /// Southern Dec limit of an explicit region [degrees].
    #[clap(long, allow_hyphen_values = true)]
    pub s_dec: Option<f64>,
}

impl RegionArgs {
    pub fn region(&self) -> Result<Region, TruthReorgError> {
        let region = match (self.ra_mid, self.ne_ra, self.ne_dec, self.s_dec) {
            (Some(ra_mid), Some(ne_ra), Some(ne_dec), Some(s_dec)) => {
                Region::new(ra_mid, (ne_ra, ne_dec), (s_dec, ne_dec))?
            }
            (None, None, None, None) if self.ddf => Region::ddf()?,
            (None, None, None, None) => Region::dc2_padded(self.pad_ew, self.pad_n, self.pad_s)?,
            _ => return Err(ConfigError::IncompleteRegion.into()),
        };
        debug!("Region corners: {:?}", region.corners());
        Ok(region)
    }
}

#[derive(Debug, Args)]
pub struct TrimRegionArgs {
    /// The SQLite file to trim. Defaults to
    /// $SCRATCH/desc/truth/star/truth_star_summary_big.db.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// The SQLite file to create. Defaults to
    /// $SCRATCH/desc/truth/star/truth_star_summary_trimmed.db.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// The table to trim. The output table has the same name and layout.
    #[clap(long, default_value = trim_region::DEFAULT_TABLE)]
    pub table: String,

    /// The name of the RA column [degrees].
    #[clap(long, default_value = "ra")]
    pub ra_name: String,

    /// The name of the Dec column [degrees].
    #[clap(long, default_value = "dec")]
    pub dec_name: String,

    #[clap(flatten)]
    pub region: RegionArgs,

    #[clap(flatten)]
    pub chunks: ChunkArgs,
}

impl TrimRegionArgs {
    pub fn into_params(self, dry_run: bool) -> Result<TrimRegionParams, TruthReorgError> {
        let input = path_or_default(self.input, STAR_SUBDIR, trim_region::DEFAULT_INPUT)?;
        let output = path_or_default(self.output, STAR_SUBDIR, trim_region::DEFAULT_OUTPUT)?;
        Ok(TrimRegionParams {
            config: self.chunks.into_config(
                input,
                output,
                self.table,
                trim_region::DEFAULT_CHUNK_SIZE,
                dry_run,
            )?,
            ra_column: self.ra_name,
            dec_column: self.dec_name,
        })
    }
}

#[derive(Debug, Args)]
pub struct TrimSnArgs {
    /// The old supernova summary. Defaults to
    /// $SCRATCH/desc/truth/sn/sum_variable-31mar.db.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// The summary table.
    #[clap(long, default_value = trim_sn::DEFAULT_TABLE)]
    pub table: String,

    /// The supernova parameters. Defaults to
    /// $SCRATCH/desc/truth/sn/sne_cosmoDC2_v1.1.4_MS_DDF.db.
    #[clap(long)]
    pub sn_params: Option<PathBuf>,

    /// The supernova parameter table.
    #[clap(long, default_value = trim_sn::DEFAULT_PARAMS_TABLE)]
    pub params_table: String,

    /// The SQLite file to create. Defaults to
    /// $SCRATCH/desc/truth/sn/initial_table.db.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub region: RegionArgs,

    #[clap(flatten)]
    pub chunks: ChunkArgs,
}

impl TrimSnArgs {
    pub fn into_params(self, dry_run: bool) -> Result<TrimSnParams, TruthReorgError> {
        let input = path_or_default(self.input, SN_SUBDIR, trim_sn::DEFAULT_INPUT)?;
        let sn_params = path_or_default(self.sn_params, SN_SUBDIR, trim_sn::DEFAULT_PARAMS)?;
        let output = path_or_default(self.output, SN_SUBDIR, trim_sn::DEFAULT_OUTPUT)?;
        Ok(TrimSnParams {
            config: self.chunks.into_config(
                input,
                output,
                self.table,
                trim_sn::DEFAULT_CHUNK_SIZE,
                dry_run,
            )?,
            sn_params,
            params_table: self.params_table,
        })
    }
}

#[derive(Debug, Args)]
pub struct CompleteSnArgs {
    /// The trimmed supernova summary. Defaults to
    /// $SCRATCH/desc/truth/sn/initial_table.db.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// The trimmed summary table.
    #[clap(long, default_value = complete_sn::INPUT_TABLE)]
    pub table: String,

    /// The supernova light curves. Defaults to
    /// $SCRATCH/desc/truth/sn/sum_variable-31mar.db.
    #[clap(long)]
    pub variability: Option<PathBuf>,

    /// The light-curve table.
    #[clap(long, default_value = complete_sn::DEFAULT_VARIABILITY_TABLE)]
    pub variability_table: String,

    /// The SQLite file to create. Defaults to
    /// $SCRATCH/desc/truth/sn/truth_sn_summary.db.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub extinction: ExtinctionArgs,

    #[clap(flatten)]
    pub chunks: ChunkArgs,
}

impl CompleteSnArgs {
    pub fn into_params(
        self,
        dry_run: bool,
    ) -> Result<(CompleteSnParams, Extinction), TruthReorgError> {
        let input = path_or_default(self.input, SN_SUBDIR, complete_sn::DEFAULT_INPUT)?;
        let variability = path_or_default(
            self.variability,
            SN_SUBDIR,
            complete_sn::DEFAULT_VARIABILITY,
        )?;
        let output = path_or_default(self.output, SN_SUBDIR, complete_sn::DEFAULT_OUTPUT)?;
        let params = CompleteSnParams {
            config: self.chunks.into_config(
                input,
                output,
                self.table,
                complete_sn::DEFAULT_CHUNK_SIZE,
                dry_run,
            )?,
            variability,
            variability_table: self.variability_table,
        };
        Ok((params, self.extinction.into_extinction()?))
    }
}

#[derive(Debug, Args)]
pub struct StarSummaryArgs {
    /// The old star summary. Defaults to
    /// $SCRATCH/desc/truth/star/star_truth_summary_trimmed.db.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// The old summary table.
    #[clap(long, default_value = star_summary::DEFAULT_TABLE)]
    pub table: String,

    /// Light-curve statistics, in the same order as the old summary. Defaults
    /// to $SCRATCH/desc/truth/star/star_lc_stats_trimmed.db.
    #[clap(long)]
    pub lc_stats: Option<PathBuf>,

    /// The light-curve statistics table.
    #[clap(long, default_value = star_summary::DEFAULT_LC_STATS_TABLE)]
    pub lc_stats_table: String,

    /// The SQLite file to create. Defaults to
    /// $SCRATCH/desc/truth/star/truth_star_summary.db.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub extinction: ExtinctionArgs,

    #[clap(flatten)]
    pub chunks: ChunkArgs,
}

impl StarSummaryArgs {
    pub fn into_params(
        self,
        dry_run: bool,
    ) -> Result<(StarSummaryParams, Extinction), TruthReorgError> {
        let input = path_or_default(self.input, STAR_SUBDIR, star_summary::DEFAULT_INPUT)?;
        let lc_stats = path_or_default(self.lc_stats, STAR_SUBDIR, star_summary::DEFAULT_LC_STATS)?;
        let output = path_or_default(self.output, STAR_SUBDIR, star_summary::DEFAULT_OUTPUT)?;
        let params = StarSummaryParams {
            config: self.chunks.into_config(
                input,
                output,
                self.table,
                star_summary::DEFAULT_CHUNK_SIZE,
                dry_run,
            )?,
            lc_stats,
            lc_stats_table: self.lc_stats_table,
        };
        Ok((params, self.extinction.into_extinction()?))
    }
}

#[derive(Debug, Args)]
pub struct VariabilityArgs {
    /// The new summary whose objects are kept. Defaults to
    /// truth_{star,sn}_summary_v1-0-0.db in $SCRATCH/desc/truth/{star,sn}.
    #[clap(short, long)]
    pub summary: Option<PathBuf>,

    /// The summary table. Defaults to truth_{star,sn}_summary.
    #[clap(long)]
    pub summary_table: Option<String>,

    /// The light curves. Defaults to star_variability_truth_indexed.db or
    /// sum_variable-31mar.db.
    #[clap(long)]
    pub variability: Option<PathBuf>,

    /// The light-curve table. Defaults to stellar_variability_truth or
    /// sn_variability_truth.
    #[clap(long)]
    pub variability_table: Option<String>,

    /// The SQLite file to create. Defaults to
    /// truth_{star,sn}_variability.db in $SCRATCH/desc/truth/{star,sn}.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub chunks: ChunkArgs,
}

impl VariabilityArgs {
    pub fn into_params(self, kind: Kind, dry_run: bool) -> Result<VariabilityParams, TruthReorgError> {
        let subdir = match kind {
            Kind::Star => STAR_SUBDIR,
            Kind::Sn => SN_SUBDIR,
        };
        let summary = path_or_default(self.summary, subdir, kind.default_summary_file())?;
        let variability =
            path_or_default(self.variability, subdir, kind.default_variability_file())?;
        let output = path_or_default(self.output, subdir, kind.default_output_file())?;
        let table = self
            .summary_table
            .unwrap_or_else(|| kind.default_summary_table().to_string());
        Ok(VariabilityParams {
            kind,
            config: self.chunks.into_config(
                summary,
                output,
                table,
                variability::DEFAULT_CHUNK_SIZE,
                dry_run,
            )?,
            variability,
            variability_table: self
                .variability_table
                .unwrap_or_else(|| kind.default_variability_table().to_string()),
        })
    }
}

#[derive(Debug, Args)]
pub struct AddAvRvArgs {
    /// Where to find truth_summary_hp<N>.parquet files.
    #[clap(long)]
    pub input_dir: PathBuf,

    /// Where to write augmented files, which keep their input names. Defaults
    /// to $SCRATCH/desc/truth/galtruth.
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// The name of the RA column [degrees].
    #[clap(long, default_value = "ra")]
    pub ra_name: String,

    /// The name of the Dec column [degrees].
    #[clap(long, default_value = "dec")]
    pub dec_name: String,

    /// The healpix pixels to process (default 9556). Given with no values,
    /// every summary file in the input directory is processed.
    #[clap(long, multiple_values = true, min_values = 0)]
    pub pixels: Option<Vec<u32>>,

    #[clap(flatten)]
    pub extinction: ExtinctionArgs,
}

impl AddAvRvArgs {
    pub fn into_params(self, dry_run: bool) -> Result<(AddAvRvParams, Extinction), TruthReorgError> {
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            // A dry run writes nothing, so it doesn't need $SCRATCH.
            None if dry_run => dir_or_default(None, GALTRUTH_SUBDIR)
                .unwrap_or_else(|_| PathBuf::from(GALTRUTH_SUBDIR)),
            None => dir_or_default(None, GALTRUTH_SUBDIR)?,
        };
        let params = AddAvRvParams {
            input_dir: self.input_dir,
            output_dir,
            ra_column: self.ra_name,
            dec_column: self.dec_name,
            pixels: self.pixels.unwrap_or_else(|| DEFAULT_PIXELS.to_vec()),
            dry_run,
        };
        Ok((params, self.extinction.into_extinction()?))
    }
}

impl TruthReorgArgs {
    pub fn run(self) -> Result<(), TruthReorgError> {
        let GlobalArgs {
            verbosity: _,
            no_progress_bars,
            dry_run,
        } = self.global_opts;
        let progress_bars = !no_progress_bars;

        info!(
            "truth_reorg {} {}",
            self.command.name(),
            env!("CARGO_PKG_VERSION")
        );
        info!("Invoked as: {}", std::env::args().join(" "));
        debug!("{:#?}", self.command);
        if dry_run {
            info!("Dry run: no files will be created");
        }

        match self.command {
            Command::TrimRegion(args) => {
                let region = args.region.region()?;
                let params = args.into_params(dry_run)?;
                trim_region(&params, &region, progress_bars)?;
            }

            Command::TrimSnSummary(args) => {
                let region = args.region.region()?;
                let params = args.into_params(dry_run)?;
                trim_sn_summary(&params, &region, progress_bars)?;
            }

            Command::CompleteSnSummary(args) => {
                let (params, extinction) = args.into_params(dry_run)?;
                complete_sn_summary(&params, &extinction, progress_bars)?;
            }

            Command::StarSummary(args) => {
                let (params, extinction) = args.into_params(dry_run)?;
                star_summary(&params, &extinction, progress_bars)?;
            }

            Command::StarVariability(args) => {
                let params = args.into_params(Kind::Star, dry_run)?;
                restrict_variability(&params, progress_bars)?;
            }

            Command::SnVariability(args) => {
                let params = args.into_params(Kind::Sn, dry_run)?;
                restrict_variability(&params, progress_bars)?;
            }

            Command::AddAvrv(args) => {
                let (params, extinction) = args.into_params(dry_run)?;
                add_avrv(&params, &extinction, progress_bars)?;
            }
        }

        info!("truth_reorg complete");
        Ok(())
    }
}
