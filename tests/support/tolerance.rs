//! Per-sample tolerance comparison of output buffers.

/// Compare `actual` against `expected` with `|diff| <= atol + rtol * |expected|`.
///
/// A NaN in `expected` only matches a NaN in `actual`. On failure the message
/// names the largest difference and how many samples differ.
pub fn compare_close(actual: &[f32], expected: &[f32], atol: f64, rtol: f64) -> Result<(), String> {
    if actual.len() != expected.len() {
        return Err(format!(
            "length mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }

    let mut max_diff = 0.0f64;
    let mut worst = String::new();
    let mut diff_count = 0usize;
    for (i, (&got, &want)) in actual.iter().zip(expected.iter()).enumerate() {
        let (got, want) = (got as f64, want as f64);
        if want.is_nan() || got.is_nan() {
            if want.is_nan() != got.is_nan() {
                diff_count += 1;
                if !max_diff.is_nan() {
                    max_diff = f64::NAN;
                    worst = format!("[{i}] expected {want}, got {got}");
                }
            }
            continue;
        }
        let diff = (got - want).abs();
        let tol = atol + rtol * want.abs();
        if diff > tol {
            diff_count += 1;
            if !max_diff.is_nan() && diff > max_diff {
                max_diff = diff;
                worst = format!("[{i}] expected {want}, got {got}, diff: {diff}, tol={tol}");
            }
        }
    }

    if diff_count == 0 {
        Ok(())
    } else {
        Err(format!(
            "{worst}. {diff_count} of {} differ",
            expected.len()
        ))
    }
}

#[track_caller]
pub fn assert_close(actual: &[f32], expected: &[f32], atol: f64, rtol: f64) {
    if let Err(msg) = compare_close(actual, expected, atol, rtol) {
        panic!("{msg}");
    }
}
