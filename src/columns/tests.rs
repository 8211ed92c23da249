use std::collections::HashSet;

use approx::assert_abs_diff_eq;
use ndarray::array;
use rusqlite::types::Value;

use super::*;
use crate::columns::ids::GALAXY_HOST_THRESHOLD;

#[test]
fn test_sn_int_id_examples() {
    assert_eq!(make_sn_int_id(50), 41021613039 + 50);
    assert_eq!(make_sn_int_id(200000), 200000 * 1024 + 22);
    assert_eq!(make_sn_int_id(0), MAX_STAR_ID + 1);
    assert_eq!(make_sn_int_id(99999), MAX_STAR_ID + 100000);
    assert_eq!(make_sn_int_id(100000), 100000 * 1024 + SN_OBJECT_TYPE);

    assert_eq!(try_make_sn_int_id(50).unwrap(), make_sn_int_id(50));
    assert_eq!(try_make_sn_int_id(200000).unwrap(), make_sn_int_id(200000));
}

#[test]
fn test_non_galaxy_hosts_are_offset_past_star_ids() {
    for host in [0, 1, 500, GALAXY_HOST_THRESHOLD - 1] {
        assert!(make_sn_int_id(host) > MAX_STAR_ID);
    }
}

#[test]
fn test_galaxy_hosts_get_galaxy_derived_ids() {
    for host in [GALAXY_HOST_THRESHOLD, 100001, 123456789] {
        let id = make_sn_int_id(host);
        assert_eq!(id, host * 1024 + SN_OBJECT_TYPE);
        assert_eq!(id % 1024, SN_OBJECT_TYPE);
    }
    // Galaxy-derived ids can be below the largest star id.
    assert!(make_sn_int_id(GALAXY_HOST_THRESHOLD) < MAX_STAR_ID);
}

#[test]
fn test_sn_int_id_is_injective() {
    let star_hosts = 0..GALAXY_HOST_THRESHOLD;
    let galaxy_hosts = (GALAXY_HOST_THRESHOLD..GALAXY_HOST_THRESHOLD + 50000)
        .chain((0..50000).map(|i| 10_000_000_000 + 7 * i));

    let mut seen = HashSet::new();
    for host in star_hosts.chain(galaxy_hosts) {
        let id = try_make_sn_int_id(host).unwrap();
        assert!(seen.insert(id), "id {id} from host {host} was seen before");
    }
}

#[test]
fn test_colliding_galaxy_hosts_are_rejected() {
    // 40060169 * 1024 + 22 == 41021613078 == make_sn_int_id(39).
    let host = 40060169;
    assert_eq!(make_sn_int_id(host), make_sn_int_id(39));
    assert!(matches!(
        try_make_sn_int_id(host),
        Err(ColumnError::IdCollision { host: 40060169, .. })
    ));
    // Just outside the colliding band.
    assert!(try_make_sn_int_id(40060168).is_ok());
    assert!(try_make_sn_int_id(40060267).is_ok());
}

#[test]
fn test_bad_hosts_are_rejected() {
    assert!(matches!(
        try_make_sn_int_id(-1),
        Err(ColumnError::NegativeHost(-1))
    ));
    assert!(matches!(
        try_make_sn_int_id(i64::MAX / 1000),
        Err(ColumnError::HostOverflow(_))
    ));
}

#[test]
fn test_extinction_constant_model() {
    let extinction = Extinction::new(Box::new(ConstantEbv(0.02)), DEFAULT_RV);
    let (av, rv) = extinction.estimate_extinction(61.0, -35.0);
    assert_abs_diff_eq!(av, 0.062, epsilon = 1e-12);
    assert_abs_diff_eq!(rv, 3.1);

    let (av, rv) = extinction.estimate_many(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
    assert_eq!(av.len(), 3);
    assert_eq!(rv, vec![3.1; 3]);
    for av in av {
        assert_abs_diff_eq!(av, 0.062, epsilon = 1e-12);
    }
}

#[test]
fn test_extinction_scales_with_rv() {
    let extinction = Extinction::new(Box::new(ConstantEbv(0.1)), 2.0);
    assert_eq!(extinction.estimate_extinction(0.0, 0.0), (0.2, 2.0));
    assert_eq!(extinction.rv(), 2.0);
}

#[test]
fn test_healpix_ebv_map() {
    // nside 1: one value per base pixel.
    let values = (0..12).map(|i| i as f64 / 100.0).collect();
    let map = HealpixEbvMap::new(values).unwrap();
    assert_abs_diff_eq!(map.ebv(0.0, 0.0), 0.04);
    assert_abs_diff_eq!(map.ebv(90.0, 0.0), 0.05);
    assert_abs_diff_eq!(map.ebv(0.0, -90.0), 0.08);

    assert!(matches!(
        HealpixEbvMap::new(vec![0.0; 13]),
        Err(ColumnError::BadMapSize(13))
    ));
}

#[test]
fn test_max_per_row() {
    let stdevs = array![
        [0.0, 0.1, 0.05, 0.0, 0.0, 0.0],
        [0.0002, 0.0001, 0.0, 0.0, 0.0, 0.0003],
        [0.3, 0.2, 0.1, 0.0, -1.0, 0.4],
    ];
    let max = max_per_row(stdevs.view());
    assert_eq!(max.to_vec(), vec![0.1, 0.0003, 0.4]);

    let above: Vec<i64> = max.iter().map(|&m| above_threshold(m)).collect();
    assert_eq!(above, vec![1, 0, 1]);
    assert_eq!(above_threshold(DMAG_THRESHOLD), 0);
}

#[test]
fn test_value_helpers() {
    assert_eq!(value_as_f64(&Value::Real(1.5), "ra").unwrap(), 1.5);
    assert_eq!(value_as_f64(&Value::Integer(2), "ra").unwrap(), 2.0);
    assert!(matches!(
        value_as_f64(&Value::Null, "ra"),
        Err(ColumnError::Null(_))
    ));
    assert!(matches!(
        value_as_f64(&Value::Text("x".into()), "ra"),
        Err(ColumnError::WrongType { .. })
    ));

    assert_eq!(
        value_as_i64(&Value::Text("835183".into()), "id").unwrap(),
        835183
    );
    assert_eq!(value_as_i64(&Value::Integer(-4), "id").unwrap(), -4);
    assert!(value_as_i64(&Value::Text("MS_9940_3".into()), "id").is_err());
    assert!(value_as_i64(&Value::Real(1.0), "id").is_err());

    assert_eq!(
        value_as_str(&Value::Text("mDDF_1".into()), "id").unwrap(),
        "mDDF_1"
    );
    assert!(value_as_str(&Value::Integer(1), "id").is_err());
}
