//! Manufacturer-style spine charts.
//!
//! Each chart is indexed by draw weight (rows) and arrow length (columns).
//! Lookups snap to the nearest row and column, then interpolate linearly
//! toward the neighbouring row (or column) when the request sits too far
//! from the snapped value.

/// A draw-weight by arrow-length spine table.
#[derive(Debug)]
pub struct SpineChart {
    /// Column headers, inches.
    pub lengths: &'static [f64],
    /// `(draw_weight, values)` with one value per column.
    pub rows: &'static [(f64, &'static [f64])],
}

/// Carbon spine for compound bows.
pub static COMPOUND: SpineChart = SpineChart {
    lengths: &[26.0, 27.0, 28.0, 29.0, 30.0, 31.0],
    rows: &[
        (50.0, &[500.0, 500.0, 400.0, 400.0, 340.0, 340.0]),
        (55.0, &[500.0, 400.0, 400.0, 340.0, 340.0, 300.0]),
        (60.0, &[400.0, 400.0, 340.0, 340.0, 300.0, 300.0]),
        (65.0, &[400.0, 340.0, 340.0, 300.0, 300.0, 250.0]),
        (70.0, &[340.0, 340.0, 300.0, 300.0, 250.0, 250.0]),
        (75.0, &[340.0, 300.0, 300.0, 250.0, 250.0, 200.0]),
    ],
};

/// Carbon spine for recurve bows; weaker than compound at equal draw weight.
pub static RECURVE: SpineChart = SpineChart {
    lengths: &[24.0, 25.0, 26.0, 27.0, 28.0, 29.0, 30.0, 31.0, 32.0],
    rows: &[
        (20.0, &[2000.0, 1900.0, 1800.0, 1700.0, 1600.0, 1500.0, 1400.0, 1300.0, 1200.0]),
        (25.0, &[1800.0, 1700.0, 1600.0, 1500.0, 1400.0, 1300.0, 1200.0, 1100.0, 1000.0]),
        (30.0, &[1400.0, 1300.0, 1200.0, 1100.0, 1000.0, 900.0, 800.0, 750.0, 700.0]),
        (35.0, &[1000.0, 900.0, 800.0, 750.0, 700.0, 650.0, 600.0, 550.0, 500.0]),
        (40.0, &[800.0, 750.0, 700.0, 650.0, 600.0, 550.0, 500.0, 450.0, 400.0]),
        (45.0, &[700.0, 650.0, 600.0, 550.0, 500.0, 450.0, 400.0, 370.0, 340.0]),
        (50.0, &[600.0, 550.0, 500.0, 450.0, 400.0, 370.0, 340.0, 320.0, 300.0]),
        (55.0, &[500.0, 450.0, 400.0, 370.0, 340.0, 320.0, 300.0, 280.0, 260.0]),
        (60.0, &[450.0, 400.0, 370.0, 340.0, 320.0, 300.0, 280.0, 260.0, 240.0]),
        (65.0, &[400.0, 370.0, 340.0, 320.0, 300.0, 280.0, 260.0, 240.0, 220.0]),
    ],
};

/// Wood arrow spine in pounds. Values are the midpoints of the published
/// ranges (30-35# is stored as 32.5).
pub static WOOD: SpineChart = SpineChart {
    lengths: &[26.0, 27.0, 28.0, 29.0, 30.0, 31.0, 32.0],
    rows: &[
        (30.0, &[32.5, 32.5, 35.0, 37.5, 42.5, 47.5, 47.5]),
        (35.0, &[35.0, 35.0, 37.5, 42.5, 47.5, 52.5, 52.5]),
        (40.0, &[37.5, 37.5, 42.5, 47.5, 52.5, 57.5, 62.5]),
        (45.0, &[42.5, 42.5, 47.5, 52.5, 57.5, 62.5, 67.5]),
        (50.0, &[47.5, 47.5, 52.5, 57.5, 62.5, 67.5, 77.5]),
        (55.0, &[52.5, 52.5, 57.5, 62.5, 67.5, 72.5, 77.5]),
        (60.0, &[57.5, 57.5, 62.5, 67.5, 72.5, 77.5, 82.5]),
        (65.0, &[62.5, 62.5, 67.5, 72.5, 77.5, 82.5, 87.5]),
    ],
};

impl SpineChart {
    /// Chart value for `draw_weight` and `arrow_length`.
    ///
    /// Interpolates between rows when `draw_weight` is more than
    /// `weight_threshold` from the nearest row. With `length_threshold` set,
    /// also interpolates between columns of the (weight-interpolated) row.
    pub fn lookup(
        &self,
        draw_weight: f64,
        arrow_length: f64,
        weight_threshold: f64,
        length_threshold: Option<f64>,
    ) -> f64 {
        let weights: Vec<f64> = self.rows.iter().map(|(w, _)| *w).collect();
        let wi = nearest(&weights, draw_weight);
        let li = nearest(self.lengths, arrow_length);

        let row_neighbour = neighbour(&weights, wi, draw_weight, weight_threshold);
        let at = |col: usize| -> f64 {
            let here = self.rows[wi].1[col];
            match row_neighbour {
                Some(ni) => {
                    let ratio = (draw_weight - weights[wi]) / (weights[ni] - weights[wi]);
                    here + (self.rows[ni].1[col] - here) * ratio
                }
                None => here,
            }
        };

        let Some(threshold) = length_threshold else {
            return at(li);
        };
        match neighbour(self.lengths, li, arrow_length, threshold) {
            Some(nl) => {
                let ratio =
                    (arrow_length - self.lengths[li]) / (self.lengths[nl] - self.lengths[li]);
                at(li) + (at(nl) - at(li)) * ratio
            }
            None => at(li),
        }
    }
}

/// Index of the header closest to `value`; the first one wins a tie.
fn nearest(headers: &[f64], value: f64) -> usize {
    let mut best = 0;
    for (i, h) in headers.iter().enumerate() {
        if (h - value).abs() < (headers[best] - value).abs() {
            best = i;
        }
    }
    best
}

/// Adjacent header on the side of `value`, if `value` is beyond `threshold`
/// from `headers[at]` and such a header exists.
fn neighbour(headers: &[f64], at: usize, value: f64, threshold: f64) -> Option<usize> {
    if (value - headers[at]).abs() <= threshold {
        return None;
    }
    if value > headers[at] {
        (at + 1 < headers.len()).then_some(at + 1)
    } else {
        at.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn every_row_has_one_value_per_column() {
        for chart in [&COMPOUND, &RECURVE, &WOOD] {
            for (weight, values) in chart.rows {
                assert_eq!(values.len(), chart.lengths.len(), "row {weight}");
            }
        }
    }

    #[test]
    fn exact_row_and_column() {
        assert_close(COMPOUND.lookup(70.0, 29.0, 2.5, None), 300.0);
        assert_close(RECURVE.lookup(45.0, 29.0, 2.5, Some(0.5)), 450.0);
        assert_close(WOOD.lookup(50.0, 28.0, 2.5, None), 52.5);
    }

    #[test]
    fn near_row_snaps_without_interpolating() {
        // 62 is within 2.5 of the 60 row.
        assert_close(COMPOUND.lookup(62.0, 28.0, 2.5, None), 340.0);
    }

    #[test]
    fn far_from_row_interpolates_toward_neighbour() {
        // 42.5 ties between 40 and 45; first row (40) wins, 2.5 is not > 2.5.
        assert_close(RECURVE.lookup(42.5, 28.0, 2.5, None), 600.0);
        // Below the first row there is no neighbour to interpolate toward.
        assert_close(RECURVE.lookup(15.0, 28.0, 2.5, None), 1600.0);
        // 27 lb -> nearest 25 (row 1400 @ 28"), neighbour 30 (1000): 1400 - 400 * 0.4.
        assert_close(RECURVE.lookup(27.0, 28.0, 1.0, None), 1240.0);
    }

    #[test]
    fn recurve_interpolates_length() {
        // 28.8" snaps to the 29 column; 28.2" snaps to 28.
        assert_close(RECURVE.lookup(40.0, 28.8, 2.5, Some(0.5)), 550.0);
        assert_close(RECURVE.lookup(40.0, 28.2, 2.5, Some(0.5)), 600.0);
        // Above the last column there is no neighbour.
        assert_close(RECURVE.lookup(40.0, 33.0, 2.5, Some(0.5)), 400.0);
    }

    #[test]
    fn nearest_prefers_first_on_tie() {
        assert_eq!(nearest(&[30.0, 35.0], 32.5), 0);
        assert_eq!(nearest(&[30.0, 35.0], 33.0), 1);
    }
}
