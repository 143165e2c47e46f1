use crate::models::{CashEntry, CashExit, ExitMotif};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Doctor's revenue share reconciled against disbursements
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DoctorShare {
    pub doctor_id: Uuid,
    pub total_cote_part: Decimal,
    pub total_cote_recue: Decimal,
    pub total_cote_rest: Decimal,
}

/// Aggregate a doctor's share over all their lines, against the
/// revenue-share exits disbursed to them
pub fn doctor_share<'a, E, X>(entries: E, exits: X, doctor_id: Uuid) -> DoctorShare
where
    E: IntoIterator<Item = &'a CashEntry>,
    X: IntoIterator<Item = &'a CashExit>,
{
    let total_cote_part: Decimal = entries
        .into_iter()
        .flat_map(|entry| entry.lines.iter())
        .filter(|line| line.doctor_id == Some(doctor_id))
        .map(|line| line.cote_part)
        .sum();
    let total_cote_recue: Decimal = exits
        .into_iter()
        .filter(|exit| exit.motif == ExitMotif::RevenueShare && exit.recipient_id == doctor_id)
        .map(|exit| exit.amount)
        .sum();
    DoctorShare {
        doctor_id,
        total_cote_part,
        total_cote_recue,
        total_cote_rest: total_cote_part - total_cote_recue,
    }
}

/// Outstanding amount owed by a patient across their entries
///
/// Sum of residuals, corrected for rest entries: a payment on a bare rest
/// entry settles the carried residual counted on the original entry, and a
/// supplemented rest entry settles whatever was paid beyond its own lines.
pub fn patient_outstanding<'a, E>(entries: E, patient_id: Uuid) -> Decimal
where
    E: IntoIterator<Item = &'a CashEntry>,
{
    let mut total_residual = Decimal::ZERO;
    let mut payed_rests = Decimal::ZERO;
    let mut payed_supplements = Decimal::ZERO;

    for entry in entries.into_iter().filter(|entry| entry.patient_id == patient_id) {
        total_residual += entry.amount_residual;
        if entry.rest && !entry.supplement {
            payed_rests += entry.amount_payed;
        } else if entry.rest && entry.supplement {
            payed_supplements += entry.amount_payed - (entry.montant + entry.tax_amount);
        }
    }
    total_residual - payed_rests - payed_supplements
}
