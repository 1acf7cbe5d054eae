//! Money arithmetic shared by carts and orders.
//!
//! Line totals are clamped one line at a time: a line with a non-positive
//! quantity or a negative price contributes nothing instead of discounting
//! the rest of the cart.

use rust_decimal::Decimal;

/// 5 % fee applied on top of the cart subtotal.
pub const DEFAULT_FEE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Flat shipping charge for a new order.
pub const DEFAULT_SHIPPING_TOTAL: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// Decimal places kept on stored totals.
pub const MONEY_SCALE: u32 = 2;

pub fn line_total(quantity: i32, price: Decimal) -> Decimal {
    if quantity <= 0 || price.is_sign_negative() {
        return Decimal::ZERO;
    }
    Decimal::from(quantity) * price
}

pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    lines
        .into_iter()
        .map(|(quantity, price)| line_total(quantity, price))
        .sum()
}

pub fn apply_fee(subtotal: Decimal, fee_rate: Decimal) -> Decimal {
    round_money(subtotal + subtotal * fee_rate)
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// Largest magnitude the `NUMERIC(10, 2)` money columns hold.
pub fn max_stored_amount() -> Decimal {
    Decimal::new(9_999_999_999, MONEY_SCALE)
}

pub fn is_storable(amount: Decimal) -> bool {
    amount.abs() <= max_stored_amount()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_lines_do_not_discount_positive_ones() {
        let lines = vec![(2, Decimal::from(10)), (-3, Decimal::from(10))];
        assert_eq!(subtotal(lines), Decimal::from(20));
    }

    #[test]
    fn negative_quantity_times_negative_price_adds_nothing() {
        assert_eq!(line_total(-3, Decimal::new(-500, 2)), Decimal::ZERO);
        let lines = vec![(1, Decimal::new(1500, 2)), (-3, Decimal::new(-500, 2))];
        assert_eq!(subtotal(lines), Decimal::new(1500, 2));
    }

    #[test]
    fn defaults_are_five_percent_and_five_units() {
        assert_eq!(DEFAULT_FEE_RATE, Decimal::new(5, 2));
        assert_eq!(DEFAULT_SHIPPING_TOTAL, Decimal::new(500, 2));
    }

    #[test]
    fn amounts_past_the_column_width_are_not_storable() {
        assert!(is_storable(Decimal::new(9_999_999_999, 2)));
        assert!(!is_storable(Decimal::new(10_000_000_000, 2)));
    }

    #[test]
    fn fee_is_rounded_to_cents() {
        assert_eq!(
            apply_fee(Decimal::new(1999, 2), DEFAULT_FEE_RATE),
            Decimal::new(2099, 2)
        );
    }
}
