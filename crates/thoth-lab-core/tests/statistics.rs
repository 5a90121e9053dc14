use polars::prelude::*;
use thoth_lab_core::statistics::{
    compare_batches, correlations, evaluate_column, evaluate_statistics, StatisticsError,
};

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn describes_a_small_sample() {
    let stats = evaluate_statistics(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

    assert_eq!(stats.count, 5);
    approx(stats.mean, 3.0);
    approx(stats.std, 2.5f64.sqrt());
    approx(stats.std_error, 2.5f64.sqrt() / 5f64.sqrt());
    approx(stats.cv, 2.5f64.sqrt() / 3.0 * 100.0);
    approx(stats.median, 3.0);
    approx(stats.q1, 2.0);
    approx(stats.q3, 4.0);
    approx(stats.iqr, 2.0);
    approx(stats.min, 1.0);
    approx(stats.max, 5.0);
}

#[test]
fn single_value_has_undefined_spread() {
    let stats = evaluate_statistics(&[7.0]).unwrap();
    approx(stats.mean, 7.0);
    assert!(stats.std.is_nan());
    assert!(stats.cv.is_nan());
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(evaluate_statistics(&[]), Err(StatisticsError::Empty)));
}

#[test]
fn columns_ignore_nulls() -> PolarsResult<()> {
    let frame = df!("duration" => &[Some(10i64), None, Some(20), Some(30)])?;
    let stats = evaluate_column(&frame, "duration").unwrap();
    assert_eq!(stats.count, 3);
    approx(stats.mean, 20.0);

    assert!(matches!(
        evaluate_column(&frame, "missing"),
        Err(StatisticsError::Polars(_))
    ));
    Ok(())
}

#[test]
fn batches_are_compared_side_by_side() -> PolarsResult<()> {
    let batches = vec![
        ("tf-cpu".to_string(), df!("job_duration" => &[10.0f64, 20.0, 30.0])?),
        ("tf-gpu".to_string(), df!("job_duration" => &[1.0f64, 2.0, 3.0, 4.0, 5.0])?),
    ];
    let table = compare_batches(&batches, "job_duration").unwrap();

    assert_eq!(table.height(), 2);
    let names: Vec<Option<&str>> = table.column("batch")?.str()?.into_iter().collect();
    assert_eq!(names, [Some("tf-cpu"), Some("tf-gpu")]);
    let means: Vec<f64> = table.column("mean")?.f64()?.into_no_null_iter().collect();
    assert_eq!(means, [20.0, 3.0]);
    let q3: Vec<f64> = table.column("q3")?.f64()?.into_no_null_iter().collect();
    assert_eq!(q3, [25.0, 4.0]);
    assert_eq!(
        table.get_column_names_str(),
        ["batch", "count", "mean", "std", "std_error", "cv", "median", "q1", "q3", "iqr", "min", "max"]
    );
    Ok(())
}

#[test]
fn comparing_needs_batches_with_the_parameter() -> PolarsResult<()> {
    assert!(matches!(
        compare_batches(&[], "job_duration"),
        Err(StatisticsError::Empty)
    ));

    let batches = vec![("tf".to_string(), df!("build_duration" => &[1.0f64])?)];
    assert!(matches!(
        compare_batches(&batches, "job_duration"),
        Err(StatisticsError::Polars(_))
    ));
    Ok(())
}

#[test]
fn correlations_of_related_columns() -> PolarsResult<()> {
    let frame = df!(
        "job_duration" => &[Some(1.0f64), Some(2.0), Some(3.0), Some(4.0), Some(5.0), None],
        "build_duration" => &[Some(1i64), Some(3), Some(2), Some(4), Some(5), Some(9)],
    )?;
    let result = correlations(&frame, "job_duration", "build_duration").unwrap();

    assert_eq!(result.pairs, 5);
    approx(result.pearson, 0.9);
    approx(result.spearman, 0.9);
    approx(result.kendall, 0.8);

    let reversed = df!(
        "a" => &[1.0f64, 2.0, 3.0, 4.0],
        "b" => &[8.0f64, 6.0, 4.0, 2.0],
    )?;
    let result = correlations(&reversed, "a", "b").unwrap();
    approx(result.pearson, -1.0);
    approx(result.spearman, -1.0);
    approx(result.kendall, -1.0);
    Ok(())
}

#[test]
fn correlation_needs_two_complete_pairs() -> PolarsResult<()> {
    let frame = df!(
        "a" => &[Some(1.0f64), None],
        "b" => &[Some(2.0f64), Some(3.0)],
    )?;
    assert!(matches!(
        correlations(&frame, "a", "b"),
        Err(StatisticsError::TooFewPairs(1))
    ));
    Ok(())
}
