use crate::models::{CashEntryLine, PaymentState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived amounts of a cash entry, recomputed at every write boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAmounts {
    pub montant: Decimal,
    pub tax_amount: Decimal,
    pub amount_total: Decimal,
    pub amount_residual: Decimal,
    pub payment_state: PaymentState,
}

/// Compute an entry's totals and payment state from its inputs
///
/// The total depends on the rest/supplement flags:
/// - plain entry: lines plus their taxes
/// - rest only: the residual carried from the previous entry
/// - rest with supplement: carried residual plus the new lines
///
/// The payment state follows a fixed precedence; a bare rest entry reports
/// paid regardless of its residual (see DESIGN.md).
pub fn compute_amounts(
    lines: &[CashEntryLine],
    amount_payed: Decimal,
    rest: bool,
    supplement: bool,
    left_to_pay: Decimal,
) -> EntryAmounts {
    let montant: Decimal = lines.iter().map(|line| line.amount).sum();
    let tax_amount: Decimal = lines.iter().map(|line| line.tax_amount).sum();

    let amount_total = if !rest {
        montant + tax_amount
    } else if !supplement {
        left_to_pay
    } else {
        left_to_pay + montant + tax_amount
    };
    let amount_residual = amount_total - amount_payed;

    let payment_state = if amount_residual != Decimal::ZERO
        && amount_payed != Decimal::ZERO
        && amount_payed != amount_total
    {
        PaymentState::Partial
    } else if amount_payed == amount_total && amount_total != Decimal::ZERO {
        PaymentState::Paid
    } else if rest {
        PaymentState::Paid
    } else {
        PaymentState::Unpaid
    };

    EntryAmounts {
        montant,
        tax_amount,
        amount_total,
        amount_residual,
        payment_state,
    }
}
