use crate::models::TaxBracket;
use rust_decimal::Decimal;

impl TaxBracket {
    /// Fixed bracket table: none 0%, low 9%, high 19%
    pub fn rate(&self) -> Decimal {
        match self {
            TaxBracket::None => Decimal::ZERO,
            TaxBracket::Low => Decimal::new(9, 2),
            TaxBracket::High => Decimal::new(19, 2),
        }
    }
}

/// Untaxed amount and tax of a line: the billed price plus the negotiated
/// difference, taxed as one base
pub fn line_amounts(base_price: Decimal, difference: Decimal, tax: TaxBracket) -> (Decimal, Decimal) {
    let amount = base_price + difference;
    (amount, amount * tax.rate())
}

/// Doctor's share of a line
///
/// Computed on the catalog list price, not the billed convention price, so
/// negotiated discounts stay on the clinic's side of the split.
pub fn cote_part(list_price: Decimal, difference: Decimal, percentage: Decimal) -> Decimal {
    (list_price + difference) * percentage / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_brackets() {
        let (amount, tax) = line_amounts(dec!(1000), Decimal::ZERO, TaxBracket::High);
        assert_eq!(amount, dec!(1000));
        assert_eq!(tax, dec!(190));

        let (_, tax) = line_amounts(dec!(1000), Decimal::ZERO, TaxBracket::Low);
        assert_eq!(tax, dec!(90));

        let (_, tax) = line_amounts(dec!(1000), Decimal::ZERO, TaxBracket::None);
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_difference_is_taxed_with_the_price() {
        let (amount, tax) = line_amounts(dec!(1000), dec!(200), TaxBracket::High);
        assert_eq!(amount, dec!(1200));
        assert_eq!(tax, dec!(228));
    }

    #[test]
    fn test_cote_part_is_a_percentage_of_list_price_plus_difference() {
        assert_eq!(cote_part(dec!(2000), dec!(0), dec!(30)), dec!(600));
        assert_eq!(cote_part(dec!(2000), dec!(500), dec!(30)), dec!(750));
        assert_eq!(cote_part(dec!(2000), dec!(0), Decimal::ZERO), Decimal::ZERO);
    }
}
