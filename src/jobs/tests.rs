//! End-to-end tests of the conversions on small files built in a temporary
//! directory.

use std::{
    fs::File,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use approx::assert_abs_diff_eq;
use arrow::{
    array::{Float64Array, Int64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};
use rusqlite::{params, types::Value, Connection};
use tempfile::TempDir;

use super::{
    add_avrv::*, complete_sn::*, star_summary::*, trim_region::*, trim_sn::*, variability::*,
};
use crate::{
    columns::{make_sn_int_id, ConstantEbv, Extinction},
    config::TransformConfig,
    read::{parquet::column_as_f64, ReadError, RowGroupReader},
    region::{Region, SkyFilter},
    schema::assemble_create_table,
    write::WriteError,
    Row, TruthReorgError,
};

fn config(input: &Path, output: &Path, table: &str, chunk_size: usize) -> TransformConfig {
    TransformConfig {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        table: table.to_string(),
        chunk_size: NonZeroUsize::new(chunk_size).unwrap(),
        max_chunks: None,
        dry_run: false,
    }
}

fn read_all(path: &Path, sql: &str) -> Vec<Row> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn.prepare(sql).unwrap();
    let n = stmt.column_count();
    let rows = stmt
        .query_map([], |row| (0..n).map(|i| row.get::<_, Value>(i)).collect())
        .unwrap()
        .collect::<Result<Vec<Row>, _>>()
        .unwrap();
    rows
}

fn real(v: &Value) -> f64 {
    match v {
        Value::Real(f) => *f,
        other => panic!("expected a real, got {other:?}"),
    }
}

const STAR_CREATE: &str =
    "CREATE TABLE truth_star_summary(id BIGINT, ra DOUBLE, dec DOUBLE, flux_r FLOAT)";

/// Five stars; the 1st and 3rd are inside the DC2 footprint.
fn make_star_summary(dir: &Path) -> PathBuf {
    let path = dir.join("stars.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute(STAR_CREATE, []).unwrap();
    for (id, ra, dec) in [
        (1, 61.855, -35.0),
        (2, 61.855, 0.0),
        (3, 58.0, -40.0),
        (4, 241.855, -35.0),
        (5, 61.855, -80.0),
    ] {
        conn.execute(
            "INSERT INTO truth_star_summary VALUES (?1, ?2, ?3, ?4)",
            params![id, ra, dec, 100.0 * id as f64],
        )
        .unwrap();
    }
    path
}

fn trim_params(input: &Path, output: &Path, chunk_size: usize) -> TrimRegionParams {
    TrimRegionParams {
        config: config(input, output, "truth_star_summary", chunk_size),
        ra_column: "ra".to_string(),
        dec_column: "dec".to_string(),
    }
}

#[test]
fn test_trim_region_keeps_rows_inside() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let output = tmp.path().join("trimmed.db");

    let stats = trim_region(
        &trim_params(&input, &output, 2),
        &Region::dc2().unwrap(),
        false,
    )
    .unwrap();
    assert_eq!(stats.rows_read, 5);
    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.rows_filtered(), 3);
    assert_eq!(stats.chunks, 3);

    let rows = read_all(&output, "SELECT * FROM truth_star_summary ORDER BY rowid");
    assert_eq!(
        rows,
        vec![
            vec![
                Value::Integer(1),
                Value::Real(61.855),
                Value::Real(-35.0),
                Value::Real(100.0)
            ],
            vec![
                Value::Integer(3),
                Value::Real(58.0),
                Value::Real(-40.0),
                Value::Real(300.0)
            ],
        ]
    );

    // The output table is made by the input's own statement.
    let sql: String = Connection::open(&output)
        .unwrap()
        .query_row(
            "SELECT sql FROM sqlite_master WHERE name = 'truth_star_summary'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(sql, STAR_CREATE);
    assert!(!tmp.path().join("trimmed.db.partial").exists());
}

#[test]
fn test_trim_region_output_does_not_depend_on_chunk_size() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let region = Region::dc2_padded(0.2, 0.6, 0.2).unwrap();
    let small = tmp.path().join("small.db");
    let big = tmp.path().join("big.db");
    trim_region(&trim_params(&input, &small, 1), &region, false).unwrap();
    trim_region(&trim_params(&input, &big, 10000), &region, false).unwrap();

    let sql = "SELECT * FROM truth_star_summary ORDER BY rowid";
    assert_eq!(read_all(&small, sql), read_all(&big, sql));
}

/// Accepts everything east of RA 60.
struct EastOf60;

impl SkyFilter for EastOf60 {
    fn point_in_region(&self, ra_deg: f64, _dec_deg: f64) -> bool {
        ra_deg > 60.0
    }
}

#[test]
fn test_trim_region_with_any_filter() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let output = tmp.path().join("trimmed.db");
    let stats = trim_region(&trim_params(&input, &output, 100), &EastOf60, false).unwrap();
    assert_eq!(stats.rows_written, 4);

    let ids: Vec<Value> = read_all(&output, "SELECT id FROM truth_star_summary")
        .into_iter()
        .map(|mut r| r.remove(0))
        .collect();
    assert_eq!(
        ids,
        vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(4),
            Value::Integer(5)
        ]
    );
}

#[test]
fn test_trim_region_max_chunks() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let output = tmp.path().join("trimmed.db");
    let mut params = trim_params(&input, &output, 2);
    params.config.max_chunks = NonZeroUsize::new(1);
    let stats = trim_region(&params, &EastOf60, false).unwrap();
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.rows_read, 2);
    assert_eq!(read_all(&output, "SELECT * FROM truth_star_summary").len(), 2);
}

#[test]
fn test_trim_region_dry_run_creates_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let output = tmp.path().join("trimmed.db");
    let mut params = trim_params(&input, &output, 2);
    params.config.dry_run = true;
    let stats = trim_region(&params, &Region::dc2().unwrap(), false).unwrap();
    assert_eq!(stats.rows_written, 2);
    assert!(!output.exists());
    assert!(!tmp.path().join("trimmed.db.partial").exists());
}

#[test]
fn test_trim_region_refuses_existing_output() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let result = trim_region(
        &trim_params(&input, &input, 2),
        &Region::dc2().unwrap(),
        false,
    );
    assert!(matches!(
        result,
        Err(TruthReorgError::Write(WriteError::OutputExists(_)))
    ));
    // The input is untouched.
    assert_eq!(read_all(&input, "SELECT * FROM truth_star_summary").len(), 5);
}

#[test]
fn test_trim_region_bad_column_fails_before_output() {
    let tmp = TempDir::new().unwrap();
    let input = make_star_summary(tmp.path());
    let output = tmp.path().join("trimmed.db");
    let mut params = trim_params(&input, &output, 2);
    params.ra_column = "RA_deg".to_string();
    assert!(matches!(
        trim_region(&params, &EastOf60, false),
        Err(TruthReorgError::Read(ReadError::NoSuchColumn { .. }))
    ));
    assert!(!output.exists());
    assert!(!tmp.path().join("trimmed.db.partial").exists());
}

/// An old supernova summary and a parameter file listing the same supernovae
/// in the same order.
fn make_sn_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let summary = dir.join("sum_variable.db");
    let conn = Connection::open(&summary).unwrap();
    conn.execute(
        "CREATE TABLE truth_summary(id TEXT, host_galaxy BIGINT, ra DOUBLE, dec DOUBLE, \
         redshift DOUBLE, is_variable INT, flux_r FLOAT)",
        [],
    )
    .unwrap();
    let params_path = dir.join("sne_params.db");
    let params_conn = Connection::open(&params_path).unwrap();
    params_conn
        .execute(
            "CREATE TABLE sne_params(snid_in TEXT, c_in DOUBLE, mB DOUBLE, t0_in DOUBLE, \
             x0_in DOUBLE, x1_in DOUBLE)",
            [],
        )
        .unwrap();

    for (i, (id, ra, dec)) in [
        ("1001", 61.855, -35.0),
        ("mDDF_7", 58.0, -40.0),
        ("hl_mddf_2", 61.855, -35.0),
        ("1002", 61.855, 0.0),
        ("MS_9940_3", 66.0, -31.0),
    ]
    .into_iter()
    .enumerate()
    {
        let i = i as f64;
        conn.execute(
            "INSERT INTO truth_summary VALUES (?1, ?2, ?3, ?4, ?5, 1, 0.0)",
            params![id, 200000 + i as i64, ra, dec, 0.1 * (i + 1.0)],
        )
        .unwrap();
        params_conn
            .execute(
                "INSERT INTO sne_params VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, -0.1 * i, 20.0 + i, 60000.0 + i, 1e-5 * (i + 1.0), 0.5 * i],
            )
            .unwrap();
    }
    (summary, params_path)
}

#[test]
fn test_trim_sn_summary() {
    let tmp = TempDir::new().unwrap();
    let (summary, sn_params) = make_sn_inputs(tmp.path());
    let output = tmp.path().join("initial_table.db");
    let params = TrimSnParams {
        config: config(&summary, &output, "truth_summary", 2),
        sn_params,
        params_table: "sne_params".to_string(),
    };
    let stats = trim_sn_summary(
        &params,
        &Region::dc2_padded(0.2, 0.6, 0.2).unwrap(),
        false,
    )
    .unwrap();
    assert_eq!(stats.rows_read, 5);
    assert_eq!(stats.rows_written, 2);

    let rows = read_all(&output, "SELECT * FROM initial_summary ORDER BY rowid");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], Value::Text("1001".to_string()));
    assert_eq!(rows[0][1], Value::Integer(200000));
    assert_eq!(rows[1][0], Value::Text("MS_9940_3".to_string()));
    assert_eq!(rows[1][1], Value::Integer(200004));
    // c, mB, t0, x0, x1 come from the parameters of the same row.
    assert_abs_diff_eq!(real(&rows[1][5]), -0.4);
    assert_abs_diff_eq!(real(&rows[1][6]), 24.0);
    assert_abs_diff_eq!(real(&rows[1][7]), 60004.0);
    assert_abs_diff_eq!(real(&rows[1][8]), 5e-5);
    assert_abs_diff_eq!(real(&rows[1][9]), 2.0);

    let conn = Connection::open(&output).unwrap();
    let columns: Vec<String> = conn
        .prepare("SELECT name FROM pragma_table_info('initial_summary')")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        columns,
        vec!["id", "host_galaxy", "ra", "dec", "redshift", "c", "mB", "t0", "x0", "x1"]
    );
}

#[test]
fn test_excluded_ids() {
    assert!(is_kept_id("1001"));
    assert!(is_kept_id("MS_9940_3"));
    assert!(!is_kept_id("mDDF_1"));
    assert!(!is_kept_id("hl_mddf_22"));
    // Case matters.
    assert!(is_kept_id("MDDF_1"));
}

fn make_initial_summary(dir: &Path) -> PathBuf {
    let path = dir.join("initial_table.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        &assemble_create_table(super::trim_sn::OUTPUT_TABLE, &super::trim_sn::COLUMNS),
        [],
    )
    .unwrap();
    for (id, host) in [("1001", 50), ("2002", 200000)] {
        conn.execute(
            "INSERT INTO initial_summary VALUES (?1, ?2, 61.0, -35.0, 0.5, 0.1, 20.0, 60000.0, 1e-5, 0.3)",
            params![id, host],
        )
        .unwrap();
    }
    path
}

fn make_sn_variability(dir: &Path) -> PathBuf {
    let path = dir.join("sn_var.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "CREATE TABLE sn_variability_truth(id TEXT, obsHistID BIGINT, MJD DOUBLE, \
         bandpass TEXT, delta_flux FLOAT)",
        [],
    )
    .unwrap();
    for (id, obs, band, flux) in [
        ("1001", 1, "u", 1.0),
        ("1001", 2, "u", 3.0),
        ("1001", 3, "g", 2.0),
        ("1001", 4, "y", -1.0),
        ("9999", 5, "r", 5.0),
    ] {
        conn.execute(
            "INSERT INTO sn_variability_truth VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, obs, 60000.0 + obs as f64, band, flux],
        )
        .unwrap();
    }
    path
}

#[test]
fn test_complete_sn_summary() {
    let tmp = TempDir::new().unwrap();
    let input = make_initial_summary(tmp.path());
    let variability = make_sn_variability(tmp.path());
    let output = tmp.path().join("truth_sn_summary.db");
    let params = CompleteSnParams {
        config: config(&input, &output, "initial_summary", 1),
        variability,
        variability_table: "sn_variability_truth".to_string(),
    };
    let extinction = Extinction::new(Box::new(ConstantEbv(0.02)), 3.1);
    let stats = complete_sn_summary(&params, &extinction, false).unwrap();
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.rows_written, 2);

    let rows = read_all(&output, "SELECT * FROM truth_sn_summary ORDER BY rowid");
    assert_eq!(rows[0].len(), output_columns().len());
    assert_eq!(rows[0].len(), 19);

    // Input columns are copied.
    assert_eq!(rows[0][0], Value::Text("1001".to_string()));
    assert_eq!(rows[0][9], Value::Real(0.3));

    assert_eq!(rows[0][10], Value::Integer(make_sn_int_id(50)));
    assert_eq!(rows[0][10], Value::Integer(41021613089));
    assert_abs_diff_eq!(real(&rows[0][11]), 0.062, epsilon = 1e-12);
    assert_abs_diff_eq!(real(&rows[0][12]), 3.1);
    // u g r i z y
    assert_eq!(
        rows[0][13..].to_vec(),
        vec![
            Value::Real(3.0),
            Value::Real(2.0),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Real(-1.0)
        ]
    );

    assert_eq!(rows[1][10], Value::Integer(200000 * 1024 + 22));
    assert!(rows[1][13..].iter().all(|v| *v == Value::Null));
}

fn make_star_inputs(dir: &Path, lc_ids: &[&str]) -> (PathBuf, PathBuf) {
    let summary = dir.join("star_truth_summary.db");
    let conn = Connection::open(&summary).unwrap();
    conn.execute(
        "CREATE TABLE truth_summary(id TEXT, host_galaxy BIGINT, ra DOUBLE, dec DOUBLE, \
         redshift DOUBLE, is_variable INT, is_pointsource INT, flux_u FLOAT, flux_g FLOAT, \
         flux_r FLOAT, flux_i FLOAT, flux_z FLOAT, flux_y FLOAT)",
        [],
    )
    .unwrap();
    for (i, id) in ["835183", "31101", "9"].into_iter().enumerate() {
        let f = i as f64;
        conn.execute(
            "INSERT INTO truth_summary VALUES (?1, -1, ?2, ?3, 0.0, 1, 1, ?4, ?4, ?4, ?4, ?4, ?5)",
            params![id, 60.0 + f, -30.0 - f, 10.0 * f, 7.0],
        )
        .unwrap();
    }

    let lc_stats = dir.join("star_lc_stats.db");
    let conn = Connection::open(&lc_stats).unwrap();
    conn.execute(
        "CREATE TABLE stellar_variability_stats(id TEXT, model TEXT, mean_u FLOAT, \
         stdev_u FLOAT, stdev_g FLOAT, stdev_r FLOAT, stdev_i FLOAT, stdev_z FLOAT, stdev_y FLOAT)",
        [],
    )
    .unwrap();
    let stdevs = [
        [0.0, 0.0002, 0.0001, 0.0, 0.0, 0.0],
        [0.0, 0.1, 0.05, 0.0, 0.0, 0.02],
        [0.0011, 0.0, 0.0, 0.0, 0.0, 0.0],
    ];
    for (id, s) in lc_ids.iter().zip(stdevs) {
        conn.execute(
            "INSERT INTO stellar_variability_stats VALUES (?1, 'kurucz', 0.0, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, s[0], s[1], s[2], s[3], s[4], s[5]],
        )
        .unwrap();
    }
    (summary, lc_stats)
}

fn star_params(summary: PathBuf, lc_stats: PathBuf, output: &Path, chunk_size: usize) -> StarSummaryParams {
    StarSummaryParams {
        config: config(&summary, output, "truth_summary", chunk_size),
        lc_stats,
        lc_stats_table: "stellar_variability_stats".to_string(),
    }
}

#[test]
fn test_star_summary() {
    let tmp = TempDir::new().unwrap();
    let (summary, lc_stats) = make_star_inputs(tmp.path(), &["835183", "31101", "9"]);
    let output = tmp.path().join("truth_star_summary.db");
    let extinction = Extinction::new(Box::new(ConstantEbv(0.01)), 3.1);
    let stats = star_summary(
        &star_params(summary, lc_stats, &output, 2),
        &extinction,
        false,
    )
    .unwrap();
    assert_eq!(stats.rows_written, 3);

    let rows = read_all(&output, "SELECT * FROM truth_star_summary ORDER BY rowid");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].len(), super::star_summary::COLUMNS.len());
    assert_eq!(rows[0][0], Value::Integer(835183));
    assert_eq!(rows[1][0], Value::Integer(31101));
    assert_eq!(rows[2][0], Value::Integer(9));

    assert_eq!(rows[1][1], Value::Real(61.0));
    assert_eq!(rows[1][2], Value::Real(-31.0));
    assert_eq!(rows[1][3], Value::Real(10.0));
    assert_eq!(rows[1][8], Value::Real(7.0));
    assert_eq!(rows[1][9], Value::Text("kurucz".to_string()));

    let max_stdev: Vec<f64> = rows.iter().map(|r| real(&r[10])).collect();
    assert_eq!(max_stdev, vec![0.0002, 0.1, 0.0011]);
    let above: Vec<Value> = rows.iter().map(|r| r[11].clone()).collect();
    assert_eq!(
        above,
        vec![Value::Integer(0), Value::Integer(1), Value::Integer(1)]
    );
    assert_abs_diff_eq!(real(&rows[2][12]), 0.031, epsilon = 1e-12);
    assert_abs_diff_eq!(real(&rows[2][13]), 3.1);
}

#[test]
fn test_star_summary_misaligned_inputs() {
    let tmp = TempDir::new().unwrap();
    let (summary, lc_stats) = make_star_inputs(tmp.path(), &["835183", "9", "31101"]);
    let output = tmp.path().join("truth_star_summary.db");
    let extinction = Extinction::new(Box::new(ConstantEbv(0.01)), 3.1);
    let result = star_summary(
        &star_params(summary, lc_stats, &output, 10),
        &extinction,
        false,
    );
    assert!(matches!(
        result,
        Err(TruthReorgError::Read(ReadError::KeyMismatch {
            chunk: 0,
            row: 1,
            ..
        }))
    ));
    // Only the incomplete file is left behind.
    assert!(!output.exists());
}

#[test]
fn test_star_summary_count_mismatch() {
    let tmp = TempDir::new().unwrap();
    let (summary, lc_stats) = make_star_inputs(tmp.path(), &["835183", "31101"]);
    let output = tmp.path().join("truth_star_summary.db");
    let extinction = Extinction::new(Box::new(ConstantEbv(0.01)), 3.1);
    let result = star_summary(
        &star_params(summary, lc_stats, &output, 10),
        &extinction,
        false,
    );
    assert!(matches!(
        result,
        Err(TruthReorgError::Read(ReadError::Misaligned {
            left: 3,
            right: 2,
            ..
        }))
    ));
    assert!(!output.exists());
}

fn make_variability_inputs(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let star_summary = dir.join("truth_star_summary.db");
    let conn = Connection::open(&star_summary).unwrap();
    conn.execute("CREATE TABLE truth_star_summary(id BIGINT, ra DOUBLE)", [])
        .unwrap();
    conn.execute("INSERT INTO truth_star_summary VALUES (1, 0.0), (2, 0.0)", [])
        .unwrap();

    let sn_summary = dir.join("truth_sn_summary.db");
    let conn = Connection::open(&sn_summary).unwrap();
    conn.execute("CREATE TABLE truth_sn_summary(id TEXT, id_int BIGINT)", [])
        .unwrap();
    conn.execute(
        "INSERT INTO truth_sn_summary VALUES ('1001', 41021613089), ('2002', 204800022)",
        [],
    )
    .unwrap();

    let var = dir.join("var.db");
    let conn = Connection::open(&var).unwrap();
    for table in ["stellar_variability_truth", "sn_variability_truth"] {
        conn.execute(
            &format!(
                "CREATE TABLE {table}(id TEXT, obsHistID BIGINT, MJD DOUBLE, bandpass TEXT, \
                 delta_flux FLOAT)"
            ),
            [],
        )
        .unwrap();
    }
    for (i, id) in ["1", "2", "3", "2", "1"].into_iter().enumerate() {
        conn.execute(
            "INSERT INTO stellar_variability_truth VALUES (?1, ?2, 60000.5, 'r', ?3)",
            params![id, i as i64, i as f64],
        )
        .unwrap();
    }
    for (i, id) in ["1001", "3003", "2002"].into_iter().enumerate() {
        conn.execute(
            "INSERT INTO sn_variability_truth VALUES (?1, ?2, 60000.5, 'i', ?3)",
            params![id, i as i64, i as f64],
        )
        .unwrap();
    }
    (star_summary, sn_summary, var)
}

#[test]
fn test_star_variability() {
    let tmp = TempDir::new().unwrap();
    let (summary, _, var) = make_variability_inputs(tmp.path());
    let output = tmp.path().join("truth_star_variability.db");
    let params = VariabilityParams {
        kind: Kind::Star,
        config: config(&summary, &output, "truth_star_summary", 2),
        variability: var,
        variability_table: "stellar_variability_truth".to_string(),
    };
    let stats = restrict_variability(&params, false).unwrap();
    assert_eq!(stats.rows_written, 4);
    assert_eq!(stats.rows_filtered(), 0);

    let rows = read_all(
        &output,
        "SELECT id, obsHistID, delta_flux FROM truth_star_variability ORDER BY obsHistID",
    );
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::Integer(0), Value::Real(0.0)],
            vec![Value::Integer(2), Value::Integer(1), Value::Real(1.0)],
            vec![Value::Integer(2), Value::Integer(3), Value::Real(3.0)],
            vec![Value::Integer(1), Value::Integer(4), Value::Real(4.0)],
        ]
    );
}

#[test]
fn test_sn_variability() {
    let tmp = TempDir::new().unwrap();
    let (_, summary, var) = make_variability_inputs(tmp.path());
    let output = tmp.path().join("truth_sn_variability.db");
    let params = VariabilityParams {
        kind: Kind::Sn,
        config: config(&summary, &output, "truth_sn_summary", 1),
        variability: var,
        variability_table: "sn_variability_truth".to_string(),
    };
    restrict_variability(&params, false).unwrap();

    let rows = read_all(
        &output,
        "SELECT id, obsHistID, id_int FROM truth_sn_variability ORDER BY obsHistID",
    );
    assert_eq!(
        rows,
        vec![
            vec![
                Value::Text("1001".to_string()),
                Value::Integer(0),
                Value::Integer(41021613089)
            ],
            vec![
                Value::Text("2002".to_string()),
                Value::Integer(2),
                Value::Integer(204800022)
            ],
        ]
    );
}

/// A healpix summary with two row groups.
fn write_summary_parquet(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("galaxy_id", DataType::Int64, false),
        Field::new("ra", DataType::Float64, false),
        Field::new("dec", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![10, 11, 12])),
            Arc::new(Float64Array::from(vec![60.0, 61.0, 62.0])),
            Arc::new(Float64Array::from(vec![-30.0, -31.0, -32.0])),
        ],
    )
    .unwrap();
    let props = WriterProperties::builder()
        .set_max_row_group_size(2)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn avrv_params(input_dir: &Path, output_dir: &Path, pixels: Vec<u32>) -> AddAvRvParams {
    AddAvRvParams {
        input_dir: input_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ra_column: "ra".to_string(),
        dec_column: "dec".to_string(),
        pixels,
        dry_run: false,
    }
}

#[test]
fn test_add_avrv() {
    let tmp = TempDir::new().unwrap();
    let input_dir = tmp.path().join("in");
    let output_dir = tmp.path().join("out");
    std::fs::create_dir(&input_dir).unwrap();
    std::fs::create_dir(&output_dir).unwrap();
    write_summary_parquet(&input_dir.join("truth_summary_hp9556.parquet"));

    let extinction = Extinction::new(Box::new(ConstantEbv(0.02)), 3.1);
    let stats = add_avrv(
        &avrv_params(&input_dir, &output_dir, DEFAULT_PIXELS.to_vec()),
        &extinction,
        false,
    )
    .unwrap();
    assert_eq!(
        stats,
        AddAvRvStats {
            files: 1,
            row_groups: 2,
            rows: 3
        }
    );

    let output = output_dir.join("truth_summary_hp9556.parquet");
    let reader = RowGroupReader::new(&output).unwrap();
    assert_eq!(reader.num_row_groups(), 2);
    let schema = reader.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["galaxy_id", "ra", "dec", "av", "rv"]);
    assert_eq!(
        schema.field_with_name("av").unwrap().data_type(),
        &DataType::Float32
    );

    let batch = reader.read_row_group(1).unwrap();
    assert_eq!(batch.num_rows(), 1);
    let av = column_as_f64(&batch, "av", &output).unwrap();
    let rv = column_as_f64(&batch, "rv", &output).unwrap();
    assert_abs_diff_eq!(av[0], 0.062, epsilon = 1e-6);
    assert_abs_diff_eq!(rv[0], 3.1, epsilon = 1e-6);
    let ra = column_as_f64(&batch, "ra", &output).unwrap();
    assert_eq!(ra, vec![62.0]);
}

#[test]
fn test_add_avrv_all_files_and_dry_run() {
    let tmp = TempDir::new().unwrap();
    let input_dir = tmp.path().join("in");
    let output_dir = tmp.path().join("out");
    std::fs::create_dir(&input_dir).unwrap();
    std::fs::create_dir(&output_dir).unwrap();
    for name in [
        "truth_summary_hp1.parquet",
        "truth_summary_hp22.parquet",
        "truth_summary_hpX.parquet",
        "other.parquet",
    ] {
        write_summary_parquet(&input_dir.join(name));
    }
    assert_eq!(
        find_summary_files(&input_dir).unwrap(),
        vec!["truth_summary_hp1.parquet", "truth_summary_hp22.parquet"]
    );

    let extinction = Extinction::new(Box::new(ConstantEbv(0.0)), 3.1);
    let mut params = avrv_params(&input_dir, &output_dir, vec![]);
    params.dry_run = true;
    let stats = add_avrv(&params, &extinction, false).unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.rows, 6);
    assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 0);

    params.dry_run = false;
    add_avrv(&params, &extinction, false).unwrap();
    assert!(output_dir.join("truth_summary_hp1.parquet").exists());
    assert!(output_dir.join("truth_summary_hp22.parquet").exists());
    assert!(!output_dir.join("other.parquet").exists());
}

#[test]
fn test_add_avrv_refuses_existing_columns() {
    let tmp = TempDir::new().unwrap();
    let input_dir = tmp.path().join("in");
    std::fs::create_dir(&input_dir).unwrap();
    write_summary_parquet(&input_dir.join("truth_summary_hp5.parquet"));

    let extinction = Extinction::new(Box::new(ConstantEbv(0.0)), 3.1);
    add_avrv(&avrv_params(&input_dir, tmp.path(), vec![5]), &extinction, false).unwrap();

    // The output already has av and rv.
    let again = tmp.path().join("again");
    std::fs::create_dir(&again).unwrap();
    let result = add_avrv(&avrv_params(tmp.path(), &again, vec![5]), &extinction, false);
    assert!(matches!(
        result,
        Err(TruthReorgError::Parquet(ParquetJobError::ColumnExists { column: "av", .. }))
    ));
}

#[test]
fn test_summary_file_names() {
    assert!(is_summary_file("truth_summary_hp9556.parquet"));
    assert!(!is_summary_file("truth_summary_hp.parquet"));
    assert!(!is_summary_file("truth_summary_hp9556.parquet.partial"));
    assert!(!is_summary_file("old_truth_summary_hp9556.parquet"));
}
