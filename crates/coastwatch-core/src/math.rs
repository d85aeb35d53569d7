//! Shared math utilities.

/// L2-normalize a vector in place so its magnitude is 1.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2-normalize a slice, returning a new vector with unit magnitude.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let mut result = v.to_vec();
    l2_normalize_in_place(&mut result);
    result
}

/// Dot product of two equal-length slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    softmax_with_temperature(logits, 1.0)
}

/// Softmax over `logits / temperature`.
///
/// Temperatures below 1.0 sharpen the distribution. A degenerate input
/// (empty, or all exponentials underflowing) yields a uniform distribution.
pub fn softmax_with_temperature(logits: &[f32], temperature: f32) -> Vec<f32> {
    if logits.is_empty() {
        return vec![];
    }
    let scaled: Vec<f32> = logits.iter().map(|&x| x / temperature).collect();
    let max = scaled.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scaled.iter().map(|&x| (x - max).exp()).collect();
    let total: f32 = exp.iter().sum();

    if total == 0.0 || !total.is_finite() {
        let uniform = 1.0 / logits.len() as f32;
        return vec![uniform; logits.len()];
    }
    exp.into_iter().map(|x| x / total).collect()
}

/// Index and value of the largest element. Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}

/// True when the values already look like a probability distribution.
pub fn is_distribution(values: &[f32]) -> bool {
    let sum: f32 = values.iter().sum();
    values.iter().all(|&v| (0.0..=1.0).contains(&v)) && (sum - 1.0).abs() < 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(&[0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_softmax_uniform() {
        let p = softmax(&[1.0, 1.0, 1.0, 1.0]);
        for x in p {
            assert!((x - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_sums_to_one_with_large_logits() {
        let p = softmax(&[1000.0, 999.0, 10.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn test_temperature_sharpens() {
        let logits = [2.0, 1.0, 0.0];
        let plain = softmax(&logits);
        let sharp = softmax_with_temperature(&logits, 0.5);
        assert!(sharp[0] > plain[0]);
        assert_eq!(argmax(&sharp).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
        // Ties keep the first index
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
    }

    #[test]
    fn test_is_distribution() {
        assert!(is_distribution(&[0.2, 0.3, 0.5]));
        assert!(!is_distribution(&[2.0, -1.0, 0.0]));
        assert!(!is_distribution(&[0.2, 0.2]));
    }
}
