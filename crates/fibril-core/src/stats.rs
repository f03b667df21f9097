//! Small robust statistics helpers shared by the analysis and tracking crates.

/// Median of `values`, averaging the two middle values for even counts.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Population standard deviation.
pub fn std_dev(values: &[f32]) -> Option<f32> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    Some(var.sqrt())
}

/// Median absolute deviation around `center`.
pub fn median_absolute_deviation(values: &[f32], center: f32) -> Option<f32> {
    let deviations: Vec<f32> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Mean absolute deviation around `center`.
pub fn mean_absolute_deviation(values: &[f32], center: f32) -> Option<f32> {
    let deviations: Vec<f32> = values.iter().map(|v| (v - center).abs()).collect();
    mean(&deviations)
}
