/// Squared Euclidean distance. No square root is taken.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut i = 0usize;
    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;
    let mut acc2 = 0.0f32;
    let mut acc3 = 0.0f32;
    while i + 4 <= a.len() {
        let d0 = a[i] - b[i];
        let d1 = a[i + 1] - b[i + 1];
        let d2 = a[i + 2] - b[i + 2];
        let d3 = a[i + 3] - b[i + 3];
        acc0 += d0 * d0;
        acc1 += d1 * d1;
        acc2 += d2 * d2;
        acc3 += d3 * d3;
        i += 4;
    }
    let mut out = (acc0 + acc1) + (acc2 + acc3);
    while i < a.len() {
        let d = a[i] - b[i];
        out += d * d;
        i += 1;
    }
    out
}

/// Index of the row nearest to `v`; ties resolve to the lower row.
pub fn argmin_l2(v: &[f32], rows: ndarray::ArrayView2<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, row) in rows.outer_iter().enumerate() {
        let Some(row) = row.as_slice() else {
            continue;
        };
        let d = squared_l2(v, row);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((idx, d)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place; the zero vector is left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return;
    }
    for value in v {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn squared_l2_matches_reference() {
        let a: Vec<f32> = (0..11).map(|i| i as f32 * 0.5).collect();
        let b: Vec<f32> = (0..11).map(|i| 1.0 - i as f32).collect();
        let reference: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
        assert!((squared_l2(&a, &b) - reference).abs() < 1e-3);
        assert_eq!(squared_l2(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(squared_l2(&[0.0, 0.0], &[5.0, 5.0]), 50.0);
    }

    #[test]
    fn argmin_prefers_lower_row_on_tie() {
        let rows = array![[1.0f32, 0.0], [-1.0, 0.0], [4.0, 4.0]];
        assert_eq!(argmin_l2(&[0.0, 0.0], rows.view()), Some(0));
        assert_eq!(argmin_l2(&[3.0, 3.0], rows.view()), Some(2));
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0f32, 4.0];
        normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        let mut zero = vec![0.0f32; 3];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);
    }
}
