pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (m - v) * (m - v)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Accuracy in percent over a keystroke tally; 100 when nothing was typed.
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (correct as f64 / total as f64) * 100.0
}
