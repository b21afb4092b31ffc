use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use hydroseries_core::components::{self, CompletionParams};
use hydroseries_core::series::daily_range;
use hydroseries_core::{
    HomogeneityOptions, LocalStorage, Priorize, StationSeries, TestKind,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hydroseries-{tag}-{}", std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Deterministic sawtooth in half-unit steps, so regression fits are exact.
fn base_value(i: usize) -> f64 {
    ((i * 7) % 10) as f64 * 0.5
}

fn write_precipitation_series(path: &PathBuf, dates: &[NaiveDate]) {
    let mut content = String::from("DATE;TARGET;NEAR;FAR\n");
    for (i, day) in dates.iter().enumerate() {
        let v = base_value(i);
        let target = if i % 5 == 0 {
            String::new()
        } else {
            format!("{v:?}")
        };
        let near = v / 2.0;
        let far = v * 0.4 + ((i * 13) % 7) as f64 * 0.3;
        writeln!(content, "{};{target};{near:?};{far:?}", day.format("%Y-%m-%d")).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn params(tests: Vec<TestKind>) -> CompletionParams {
    CompletionParams {
        start_date: date(1974, 10, 1),
        end_date: date(1978, 9, 30),
        target_station: "TARGET".to_string(),
        analysis_stations: vec!["NEAR".to_string(), "FAR".to_string()],
        priorize: Priorize::R2,
        tests,
        homogeneity: HomogeneityOptions {
            alpha: 0.5,
            simulations: 100,
            seed: Some(11),
        },
    }
}

#[test]
fn reshape_component_writes_series_files() {
    let dir = scratch_dir("reshape");
    let input = dir.join("matrix.csv");

    let mut content = String::from("NOMBRE;AÑO;MES");
    for day in 1..=31 {
        write!(content, ";P{day}").unwrap();
    }
    content.push('\n');
    content.push_str("GALAROZA;1974;10;0;-3;25;-4");
    content.push_str(&";".repeat(27));
    content.push('\n');
    content.push_str("JABUGO;1974;10;5;5;40");
    content.push_str(&";".repeat(28));
    content.push('\n');
    fs::write(&input, content).unwrap();

    let storage = LocalStorage::new(&dir);
    let result = components::reshape_matrix_file(&input, b';', &storage).unwrap();
    assert_eq!(result.files.len(), 1);

    let series_path = dir.join(components::PRECIPITATION_SERIES_FILE);
    let series = StationSeries::read_csv(&series_path, b';').unwrap();
    assert_eq!(series.station_names(), vec!["GALAROZA", "JABUGO"]);

    let dates = series.dates().unwrap();
    assert_eq!(dates.first(), Some(&date(1973, 10, 1)));
    assert_eq!(dates.last(), Some(&date(1975, 9, 30)));

    let values = series.values("GALAROZA").unwrap();
    let oct1 = dates.iter().position(|d| *d == date(1974, 10, 1)).unwrap();
    assert_eq!(values[oct1], Some(0.0));
    assert_eq!(values[oct1 + 1], Some(0.0)); // -3 sentinel
    assert_eq!(values[oct1 + 2], Some(2.5));
    assert_eq!(values[oct1 + 3], Some(0.0)); // -4 sentinel

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn precipitation_completion_end_to_end() {
    let dir = scratch_dir("complete");
    let input = dir.join("PrecipitationTimeSeries.csv");
    let dates = daily_range(date(1974, 10, 1), date(1978, 9, 30));
    write_precipitation_series(&input, &dates);

    let storage = LocalStorage::new(&dir);
    let result = components::complete_precipitation(
        &input,
        b';',
        &params(vec![TestKind::Pettitt, TestKind::Snht, TestKind::BuishandRange]),
        &storage,
    )
    .unwrap();
    assert_eq!(result.files.len(), 3);
    assert!(!serde_json::to_string(&result).unwrap().is_empty());

    // diagnostics are ranked by R2 with the exact station first
    let analysis = fs::read_to_string(dir.join(components::STATIONS_ANALYSIS_FILE)).unwrap();
    let mut lines = analysis.lines();
    assert_eq!(lines.next(), Some(";NEAR;FAR"));
    let r2_line = lines.next().unwrap();
    assert!(r2_line.starts_with("R2;1.0;"));

    // the completed series starts on the first requested day and has no gaps
    let completed_path = dir.join("TARGET_completed.csv");
    let completed_text = fs::read_to_string(&completed_path).unwrap();
    let mut lines = completed_text.lines();
    assert_eq!(lines.next(), Some("DATE;TARGET"));
    assert_eq!(lines.next(), Some("1974-10-01;0.0"));

    let completed = StationSeries::read_csv(&completed_path, b';').unwrap();
    let values = completed.values("TARGET").unwrap();
    assert_eq!(values.len(), dates.len());
    assert!(values.iter().all(|v| v.is_some()));
    // every filled day equals the best-ranked reconstruction
    for (i, value) in values.iter().enumerate() {
        assert_eq!(*value, Some(base_value(i)), "mismatch at row {i}");
    }

    // homogeneity report carries one column per test
    let report = fs::read_to_string(dir.join(components::HOMOGENEITY_TESTS_FILE)).unwrap();
    let mut lines = report.lines();
    assert_eq!(lines.next(), Some(";Pettit Test;SNHT Test;Buishand Test"));
    assert_eq!(report.lines().count(), 6);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn seeded_completion_reports_are_identical() {
    let dir = scratch_dir("seeded");
    let input = dir.join("PrecipitationTimeSeries.csv");
    let dates = daily_range(date(1974, 10, 1), date(1975, 9, 30));
    write_precipitation_series(&input, &dates);

    let first_dir = LocalStorage::new(dir.join("first"));
    let second_dir = LocalStorage::new(dir.join("second"));
    let p = params(vec![TestKind::Pettitt, TestKind::BuishandRange]);
    components::complete_precipitation(&input, b';', &p, &first_dir).unwrap();
    components::complete_precipitation(&input, b';', &p, &second_dir).unwrap();

    let first = fs::read_to_string(
        dir.join("first").join(components::HOMOGENEITY_TESTS_FILE),
    )
    .unwrap();
    let second = fs::read_to_string(
        dir.join("second").join(components::HOMOGENEITY_TESTS_FILE),
    )
    .unwrap();
    assert_eq!(first, second);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn temperature_completion_end_to_end() {
    let dir = scratch_dir("temperature");
    let dates = daily_range(date(1974, 10, 1), date(1975, 9, 30));

    let max_input = dir.join("MaxTempTimeSeries.csv");
    let min_input = dir.join("MinTempTimeSeries.csv");
    let mut max_content = String::from("DATE;TARGET;NEAR\n");
    let mut min_content = String::from("DATE;TARGET;NEAR\n");
    for (i, day) in dates.iter().enumerate() {
        let v = base_value(i);
        let stamp = day.format("%Y-%m-%d");
        // NEAR mirrors the target without gaps, so the fit is the identity
        let max_target = if i % 4 == 0 {
            String::new()
        } else {
            format!("{:?}", 20.0 + v)
        };
        let min_target = if i % 4 == 0 {
            String::new()
        } else {
            format!("{:?}", 5.0 + v)
        };
        writeln!(max_content, "{stamp};{max_target};{:?}", 20.0 + v).unwrap();
        writeln!(min_content, "{stamp};{min_target};{:?}", 5.0 + v).unwrap();
    }
    fs::write(&max_input, max_content).unwrap();
    fs::write(&min_input, min_content).unwrap();

    let mut p = params(vec![TestKind::Pettitt]);
    p.end_date = date(1975, 9, 30);
    p.analysis_stations = vec!["NEAR".to_string()];

    let storage = LocalStorage::new(&dir);
    let result =
        components::complete_temperature(&max_input, &min_input, b';', &p, &storage).unwrap();
    // two diagnostics files, the completed series and the report
    assert_eq!(result.files.len(), 4);
    assert!(dir.join(components::MAX_STATIONS_ANALYSIS_FILE).exists());
    assert!(dir.join(components::MIN_STATIONS_ANALYSIS_FILE).exists());

    let completed = StationSeries::read_csv(&dir.join("TARGET_completed.csv"), b';').unwrap();
    assert_eq!(
        completed.station_names(),
        vec!["TARGET(MAX)", "TARGET(MIN)"]
    );

    let max_values = completed.values("TARGET(MAX)").unwrap();
    let min_values = completed.values("TARGET(MIN)").unwrap();
    assert_eq!(max_values.len(), dates.len());
    for (i, (max, min)) in max_values.iter().zip(&min_values).enumerate() {
        // whole degrees, max above min everywhere
        let (max, min) = (max.unwrap(), min.unwrap());
        assert_eq!(max, max.round(), "max not rounded at row {i}");
        assert_eq!(min, min.round(), "min not rounded at row {i}");
        assert!(max > min, "inverted extremes at row {i}");
        assert_eq!(max, (20.0 + base_value(i)).round());
    }

    let report = fs::read_to_string(dir.join(components::HOMOGENEITY_TESTS_FILE)).unwrap();
    assert!(report
        .lines()
        .next()
        .unwrap()
        .starts_with(";Pettit Test(MAX);Pettit Test(MIN)"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn statistics_extraction_end_to_end() {
    let dir = scratch_dir("stats");
    let input = dir.join("series.csv");
    let dates = daily_range(date(1970, 10, 1), date(1974, 9, 30));
    let mut content = String::from("DATE;A\n");
    for day in &dates {
        writeln!(content, "{};1.0", day.format("%Y-%m-%d")).unwrap();
    }
    fs::write(&input, content).unwrap();

    let storage = LocalStorage::new(&dir);
    let result = components::extract_statistics(&input, b';', &storage).unwrap();
    assert_eq!(result.files.len(), 1);

    let summary = fs::read_to_string(dir.join(components::STATISTICAL_DATA_FILE)).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    // header plus one row per hydrologic year
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Hidrologic Year;Station;"));
    assert!(lines[1].starts_with("1970/1971;A;1.0;1.0;1.0;365;0;100.0;0.0;365.0"));

    fs::remove_dir_all(&dir).ok();
}
