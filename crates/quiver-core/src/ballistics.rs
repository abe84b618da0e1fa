//! Arrow ballistics: balance point, FOC, speed, kinetic energy, momentum.
//!
//! Component positions are measured in inches from the nock groove:
//!
//! | component | position |
//! |-----------|----------|
//! | nock      | 0        |
//! | fletching | `fletching_offset` |
//! | shaft     | L / 2    |
//! | wrap      | `wrap_fraction` · L |
//! | insert    | L − `insert_offset` |
//! | point     | L        |
//! | outsert   | L        |

use serde::Serialize;

use crate::config::BallisticsConfig;
use crate::error::{TuningError, require_positive};
use crate::model::ArrowComponents;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocMeasurement {
    pub foc_percentage: f64,
    /// Inches from the nock.
    pub balance_point: f64,
    pub physical_center: f64,
    pub total_weight: f64,
}

pub fn foc(
    cfg: &BallisticsConfig,
    components: &ArrowComponents,
    arrow_length: f64,
) -> Result<FocMeasurement, TuningError> {
    let length = require_positive("arrow_length", arrow_length)?;
    components.validate()?;
    let total_weight = require_positive("total_weight", components.total_weight())?;

    let moment = components.fletching_weight * cfg.fletching_offset
        + components.shaft_weight * (length / 2.0)
        + components.wrap_weight * (length * cfg.wrap_fraction)
        + components.insert_weight * (length - cfg.insert_offset)
        + components.point_weight * length
        + components.outsert_weight * length;

    let balance_point = moment / total_weight;
    let physical_center = length / 2.0;
    Ok(FocMeasurement {
        foc_percentage: (balance_point - physical_center) / length * 100.0,
        balance_point,
        physical_center,
        total_weight,
    })
}

/// Launch speed in fps, clamped to the configured band.
///
/// The base is the speed of a reference-weight arrow; a compound bow with an
/// IBO rating uses that rating scaled by draw weight instead of the linear
/// draw-weight model.
pub fn estimate_speed(
    cfg: &BallisticsConfig,
    total_weight: f64,
    draw_weight: f64,
    ibo_speed: Option<f64>,
) -> Result<f64, TuningError> {
    let weight = require_positive("total_weight", total_weight)?;
    let draw = require_positive("bow_weight", draw_weight)?;

    let base = match ibo_speed {
        Some(ibo) => require_positive("ibo_speed", ibo)? * draw / cfg.ibo_reference_draw_weight,
        None => draw * cfg.speed_per_pound + cfg.speed_base,
    };
    let speed = base * (cfg.speed_reference_weight / weight).sqrt();
    Ok(speed.clamp(cfg.min_speed, cfg.max_speed))
}

/// Foot-pounds.
pub fn kinetic_energy(cfg: &BallisticsConfig, total_weight: f64, speed: f64) -> f64 {
    let mass = total_weight / cfg.grains_per_pound;
    0.5 * mass * speed * speed / cfg.gravity
}

/// Pound-feet per second.
pub fn momentum(cfg: &BallisticsConfig, total_weight: f64, speed: f64) -> f64 {
    total_weight / cfg.grains_per_pound * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_arrow() -> ArrowComponents {
        ArrowComponents::new(300.0, 100.0, 10.0, 15.0, 15.0)
    }

    #[test]
    fn reference_arrow_foc() {
        let m = foc(&BallisticsConfig::default(), &reference_arrow(), 29.0).unwrap();
        assert_eq!(m.total_weight, 440.0);
        assert_eq!(m.physical_center, 14.5);
        // (15 + 4350 + 427.5 + 2900) / 440
        assert!((m.balance_point - 7692.5 / 440.0).abs() < 1e-9);
        assert!(m.balance_point > 14.5);
        assert!((m.foc_percentage - 10.2859).abs() < 1e-3);
    }

    #[test]
    fn wrap_and_outsert_move_balance() {
        let cfg = BallisticsConfig::default();
        let plain = foc(&cfg, &reference_arrow(), 29.0).unwrap();
        let mut with_outsert = reference_arrow();
        with_outsert.outsert_weight = 20.0;
        assert!(foc(&cfg, &with_outsert, 29.0).unwrap().foc_percentage > plain.foc_percentage);

        let mut with_wrap = reference_arrow();
        with_wrap.wrap_weight = 10.0;
        // 0.75 L sits forward of centre.
        assert!(foc(&cfg, &with_wrap, 29.0).unwrap().foc_percentage > plain.foc_percentage);
    }

    #[test]
    fn degenerate_foc_inputs_are_rejected() {
        let cfg = BallisticsConfig::default();
        assert!(matches!(
            foc(&cfg, &reference_arrow(), 0.0),
            Err(TuningError::Validation { field: "arrow_length", .. })
        ));
        assert!(matches!(
            foc(&cfg, &ArrowComponents::new(0.0, 0.0, 0.0, 0.0, 0.0), 29.0),
            Err(TuningError::Validation { field: "total_weight", .. })
        ));
    }

    #[test]
    fn speed_model() {
        let cfg = BallisticsConfig::default();
        // 60 * 3.5 + 180 = 390 at the 350 gr reference.
        assert!((estimate_speed(&cfg, 350.0, 60.0, None).unwrap() - 390.0).abs() < 1e-9);
        // Heavier arrow, slower.
        let heavy = estimate_speed(&cfg, 500.0, 60.0, None).unwrap();
        assert!((heavy - 390.0 * (0.7f64).sqrt()).abs() < 1e-9);
        // Clamped both ways.
        assert_eq!(estimate_speed(&cfg, 100.0, 80.0, None).unwrap(), 400.0);
        assert_eq!(estimate_speed(&cfg, 2000.0, 20.0, None).unwrap(), 150.0);
    }

    #[test]
    fn ibo_rating_replaces_draw_model() {
        let cfg = BallisticsConfig::default();
        // 340 * 70 / 70 at 350 gr.
        assert!((estimate_speed(&cfg, 350.0, 70.0, Some(340.0)).unwrap() - 340.0).abs() < 1e-9);
        assert!((estimate_speed(&cfg, 350.0, 60.0, Some(350.0)).unwrap() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn speed_rejects_bad_inputs() {
        let cfg = BallisticsConfig::default();
        assert!(estimate_speed(&cfg, 0.0, 60.0, None).is_err());
        assert!(matches!(
            estimate_speed(&cfg, 400.0, -5.0, None),
            Err(TuningError::Validation { field: "bow_weight", .. })
        ));
    }

    #[test]
    fn energy_and_momentum() {
        let cfg = BallisticsConfig::default();
        // 7000 gr at 32.174 fps: 0.5 * 1 * 32.174^2 / 32.174
        assert!((kinetic_energy(&cfg, 7000.0, 32.174) - 16.087).abs() < 1e-9);
        assert!((momentum(&cfg, 420.0, 280.0) - 16.8).abs() < 1e-9);
    }

    fn components() -> impl Strategy<Value = ArrowComponents> {
        (
            1.0f64..600.0,
            0.0f64..300.0,
            0.0f64..30.0,
            0.0f64..40.0,
            0.0f64..60.0,
            0.0f64..20.0,
            0.0f64..80.0,
        )
            .prop_map(|(shaft, point, nock, fletching, insert, wrap, outsert)| {
                ArrowComponents {
                    shaft_weight: shaft,
                    point_weight: point,
                    nock_weight: nock,
                    fletching_weight: fletching,
                    insert_weight: insert,
                    wrap_weight: wrap,
                    outsert_weight: outsert,
                }
            })
    }

    proptest! {
        #[test]
        fn foc_is_scale_invariant(c in components(), length in 20.0f64..34.0, k in 0.01f64..50.0) {
            let cfg = BallisticsConfig::default();
            let a = foc(&cfg, &c, length).unwrap().foc_percentage;
            let b = foc(&cfg, &c.scaled(k), length).unwrap().foc_percentage;
            prop_assert!((a - b).abs() < 1e-6);
        }

        #[test]
        fn foc_stays_within_half_length(c in components(), length in 20.0f64..34.0) {
            let m = foc(&BallisticsConfig::default(), &c, length).unwrap();
            prop_assert!((-50.0..=50.0).contains(&m.foc_percentage));
        }

        #[test]
        fn heavy_point_moves_balance_forward(
            shaft in 1.0f64..600.0,
            nock in 0.0f64..30.0,
            extra in 0.1f64..200.0,
            length in 20.0f64..34.0,
        ) {
            // Fletching and insert cancel about the centre; point outweighs nock.
            let c = ArrowComponents::new(shaft, nock + extra, nock, 0.0, 0.0);
            let m = foc(&BallisticsConfig::default(), &c, length).unwrap();
            prop_assert!(m.foc_percentage > 0.0);
        }

        #[test]
        fn speed_stays_in_band(w in 1.0f64..5000.0, dw in 1.0f64..120.0) {
            let s = estimate_speed(&BallisticsConfig::default(), w, dw, None).unwrap();
            prop_assert!((150.0..=400.0).contains(&s));
        }
    }
}
