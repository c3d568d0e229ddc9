//! Admission checks run before a movement touches the store.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;
use crate::models::{Direction, MovementFigures};

/// How the declared piece count is checked against the big-unit quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityRule {
    /// Only require a positive piece count.
    #[default]
    Positive,
    /// Also require `big × small_per_big × raw_per_small == pieces` to two decimals.
    Multiplicative,
}

impl FromStr for QuantityRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "multiplicative" => Ok(Self::Multiplicative),
            other => Err(format!("unknown quantity rule '{other}'")),
        }
    }
}

/// Runs the content, quantity and value checks in that order.
pub fn validate_movement(figures: &MovementFigures, rule: QuantityRule) -> Result<(), ValidationFailure> {
    check_content(figures)?;
    check_quantity(figures, rule)?;
    check_value(figures)
}

fn check_content(figures: &MovementFigures) -> Result<(), ValidationFailure> {
    let MovementFigures {
        prior_value: prior,
        change_value: change,
        result_value: result,
        ..
    } = *figures;

    if prior.checked_add(change) != Some(result) {
        return Err(ValidationFailure::BalanceArithmetic { prior, change, result });
    }

    match figures.direction {
        Direction::Out if result > prior => Err(ValidationFailure::OutflowIncreasesStock { prior, result }),
        Direction::In if result < prior => Err(ValidationFailure::InflowDecreasesStock { prior, result }),
        _ => Ok(()),
    }
}

fn check_quantity(figures: &MovementFigures, rule: QuantityRule) -> Result<(), ValidationFailure> {
    if figures.total_pieces <= Decimal::ZERO {
        return Err(ValidationFailure::NonPositivePieces(figures.total_pieces));
    }

    if rule == QuantityRule::Multiplicative {
        let expected = round_cents(
            figures.big_quantity * figures.rates.small_per_big * figures.rates.raw_per_small,
        );
        let declared = round_cents(figures.total_pieces);
        if expected != declared {
            return Err(ValidationFailure::PiecesMismatch { expected, declared });
        }
    }

    Ok(())
}

fn check_value(figures: &MovementFigures) -> Result<(), ValidationFailure> {
    let values = &figures.values;
    let components_cents = floor_cents(values.assessed) + floor_cents(values.duty) + floor_cents(values.gst);
    let total_cents = floor_cents(values.total);

    if components_cents != total_cents {
        return Err(ValidationFailure::ValueMismatch {
            components_cents,
            total_cents,
        });
    }
    Ok(())
}

/// Whole cents, rounded toward negative infinity.
fn floor_cents(amount: Decimal) -> Decimal {
    (amount * Decimal::ONE_HUNDRED).floor()
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversionRates, MovementValues};
    use proptest::prelude::*;

    fn figures(direction: Direction, prior: i64, change: i64, result: i64) -> MovementFigures {
        MovementFigures {
            direction,
            prior_value: prior,
            change_value: change,
            result_value: result,
            big_quantity: Decimal::from(change.abs()),
            rates: ConversionRates {
                small_per_big: Decimal::from(12),
                raw_per_small: Decimal::from(10),
            },
            total_pieces: Decimal::from(change.abs() * 120),
            values: MovementValues {
                assessed: Decimal::new(10000, 2),
                duty: Decimal::new(1050, 2),
                gst: Decimal::new(1890, 2),
                total: Decimal::new(12940, 2),
            },
        }
    }

    #[test]
    fn balanced_inbound_passes() {
        assert_eq!(validate_movement(&figures(Direction::In, 0, 5, 5), QuantityRule::Positive), Ok(()));
    }

    #[test]
    fn arithmetic_must_close() {
        let err = validate_movement(&figures(Direction::In, 0, 5, 6), QuantityRule::Positive).unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::BalanceArithmetic {
                prior: 0,
                change: 5,
                result: 6
            }
        );
        assert_eq!(err.check(), "content");
    }

    #[test]
    fn outbound_cannot_raise_stock() {
        let err = validate_movement(&figures(Direction::Out, 10, 2, 12), QuantityRule::Positive).unwrap_err();
        assert_eq!(err, ValidationFailure::OutflowIncreasesStock { prior: 10, result: 12 });
    }

    #[test]
    fn inbound_cannot_lower_stock() {
        let err = validate_movement(&figures(Direction::In, 10, -2, 8), QuantityRule::Positive).unwrap_err();
        assert_eq!(err, ValidationFailure::InflowDecreasesStock { prior: 10, result: 8 });
    }

    #[test]
    fn outbound_drawing_down_passes() {
        assert!(validate_movement(&figures(Direction::Out, 10, -2, 8), QuantityRule::Positive).is_ok());
    }

    #[test]
    fn pieces_must_be_positive() {
        let mut f = figures(Direction::In, 0, 5, 5);
        f.total_pieces = Decimal::ZERO;
        let err = validate_movement(&f, QuantityRule::Positive).unwrap_err();
        assert_eq!(err.check(), "quantity");
    }

    #[test]
    fn positive_rule_ignores_conversion() {
        let mut f = figures(Direction::In, 0, 5, 5);
        f.total_pieces = Decimal::from(7);
        assert!(validate_movement(&f, QuantityRule::Positive).is_ok());
        assert_eq!(
            validate_movement(&f, QuantityRule::Multiplicative),
            Err(ValidationFailure::PiecesMismatch {
                expected: Decimal::new(60000, 2),
                declared: Decimal::new(700, 2),
            })
        );
    }

    #[test]
    fn multiplicative_rule_accepts_exact_conversion() {
        assert!(validate_movement(&figures(Direction::In, 0, 5, 5), QuantityRule::Multiplicative).is_ok());
    }

    #[test]
    fn value_components_are_floored_separately() {
        let mut f = figures(Direction::In, 0, 5, 5);
        f.values = MovementValues {
            assessed: Decimal::new(10009, 3),
            duty: Decimal::new(10009, 3),
            gst: Decimal::ZERO,
            total: Decimal::new(2001, 2),
        };
        // 10.00 + 10.00 floored, against 20.01
        let err = validate_movement(&f, QuantityRule::Positive).unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::ValueMismatch {
                components_cents: Decimal::from(2000),
                total_cents: Decimal::from(2001),
            }
        );

        f.values.total = Decimal::new(20009, 3);
        assert!(validate_movement(&f, QuantityRule::Positive).is_ok());
    }

    #[test]
    fn quantity_rule_parses_from_config() {
        assert_eq!("Multiplicative".parse::<QuantityRule>(), Ok(QuantityRule::Multiplicative));
        assert_eq!(" positive".parse::<QuantityRule>(), Ok(QuantityRule::Positive));
        assert!("strict".parse::<QuantityRule>().is_err());
    }

    proptest! {
        #[test]
        fn accepted_movements_close_both_equations(
            prior in -10_000i64..10_000,
            change in -10_000i64..10_000,
            result in -20_000i64..20_000,
            inbound in any::<bool>(),
            assessed in 0i64..1_000_000,
            duty in 0i64..1_000_000,
            gst in 0i64..1_000_000,
            total in 0i64..3_000_000,
        ) {
            let direction = if inbound { Direction::In } else { Direction::Out };
            let mut f = figures(direction, prior, change, result);
            f.total_pieces = Decimal::ONE;
            f.values = MovementValues {
                assessed: Decimal::new(assessed, 3),
                duty: Decimal::new(duty, 3),
                gst: Decimal::new(gst, 3),
                total: Decimal::new(total, 3),
            };

            if validate_movement(&f, QuantityRule::Positive).is_ok() {
                prop_assert_eq!(prior + change, result);
                prop_assert_eq!(
                    floor_cents(f.values.assessed) + floor_cents(f.values.duty) + floor_cents(f.values.gst),
                    floor_cents(f.values.total)
                );
                match direction {
                    Direction::In => {
                        prop_assert!(result >= prior);
                    }
                    Direction::Out => {
                        prop_assert!(result <= prior);
                    }
                }
            }
        }

        #[test]
        fn consistent_movements_are_accepted(
            prior in -10_000i64..10_000,
            change in 0i64..10_000,
            assessed in 0i64..100_000,
            duty in 0i64..100_000,
            gst in 0i64..100_000,
        ) {
            let mut f = figures(Direction::In, prior, change, prior + change);
            f.total_pieces = Decimal::ONE;
            f.values = MovementValues {
                assessed: Decimal::new(assessed, 2),
                duty: Decimal::new(duty, 2),
                gst: Decimal::new(gst, 2),
                total: Decimal::new(assessed + duty + gst, 2),
            };
            prop_assert!(validate_movement(&f, QuantityRule::Positive).is_ok());
        }
    }
}
