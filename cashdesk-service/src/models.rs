use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Statement lifecycle: closing is one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementState {
    Draft,
    Open,
    Closed,
}

impl std::fmt::Display for StatementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StatementState::Draft => "draft",
            StatementState::Open => "open",
            StatementState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// A dated cash period chained to its predecessor
///
/// `number` is monotonic across the ledger and breaks ties between
/// statements sharing a date, giving the chain a strict total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: Uuid,
    pub number: u64,
    pub reference: String,
    pub date: NaiveDate,
    pub state: StatementState,
    pub balance_start: Decimal,
    /// Running balance, frozen at close
    pub balance: Decimal,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// Derived sums over a statement's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTotals {
    pub entries_total: Decimal,
    pub exits_total: Decimal,
    pub balance: Decimal,
}

/// Payment state derived from the entry's amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    Partial,
    Unpaid,
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PaymentState::Paid => "paid",
            PaymentState::Partial => "partial",
            PaymentState::Unpaid => "unpaid",
        };
        f.write_str(label)
    }
}

/// Which price grid a line is billed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Public,
    Convention,
}

/// Fixed tax brackets applied per line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBracket {
    None,
    Low,
    High,
}

/// Who settled the bill at the desk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidBy {
    Himself,
    Spouse,
    Father,
    Mother,
    Other,
}

/// One billed act on a cash entry
///
/// Amounts and the revenue-share percentage are snapshots taken when the
/// line is written; later catalog or rate changes do not flow back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntryLine {
    pub id: Uuid,
    pub act_id: Uuid,
    pub designation: String,
    pub rate_type: RateType,
    pub tax: TaxBracket,
    pub difference_amount: Decimal,
    pub doctor_id: Option<Uuid>,
    /// Doctor's share percentage at line-write time
    pub per_cote_part: Decimal,
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub cote_part: Decimal,
}

/// A billing document inside a statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntry {
    pub id: Uuid,
    pub reference: String,
    pub statement_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub paid_by: Option<PaidBy>,
    pub lines: Vec<CashEntryLine>,
    pub montant: Decimal,
    pub tax_amount: Decimal,
    pub amount_total: Decimal,
    pub amount_payed: Decimal,
    pub amount_residual: Decimal,
    pub payment_state: PaymentState,
    /// Entry settles the remainder of a previous one
    pub rest: bool,
    /// Rest entry that also bills new acts
    pub supplement: bool,
    pub previous_entry_id: Option<Uuid>,
    /// Residual carried over from the previous entry in the chain
    pub left_to_pay: Decimal,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Cash leaving the desk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitMotif {
    Refund,
    Disbursement,
    RevenueShare,
    Purchase,
    Other,
}

/// Disbursement from a statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashExit {
    pub id: Uuid,
    pub reference: String,
    pub statement_id: Uuid,
    pub recipient_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub motif: ExitMotif,
    pub note: Option<String>,
    pub created_by: Uuid,
}

/// Result of registering a payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub amount_residual: Decimal,
    pub payment_state: PaymentState,
}

/// Line as submitted by the desk, before pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntryLineDraft {
    pub act_id: Uuid,
    pub rate_type: RateType,
    pub tax: TaxBracket,
    pub difference_amount: Decimal,
    /// Defaults to the entry's doctor
    pub doctor_id: Option<Uuid>,
}

impl CashEntryLineDraft {
    pub fn new(act_id: Uuid) -> Self {
        Self {
            act_id,
            rate_type: RateType::Public,
            tax: TaxBracket::None,
            difference_amount: Decimal::ZERO,
            doctor_id: None,
        }
    }

    pub fn on_convention(mut self) -> Self {
        self.rate_type = RateType::Convention;
        self
    }

    pub fn taxed(mut self, tax: TaxBracket) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_difference(mut self, difference: Decimal) -> Self {
        self.difference_amount = difference;
        self
    }

    pub fn for_doctor(mut self, doctor_id: Uuid) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }
}

/// Cash entry creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntryRequest {
    pub statement_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub paid_by: Option<PaidBy>,
    pub lines: Vec<CashEntryLineDraft>,
    pub rest: bool,
    pub supplement: bool,
    pub previous_entry_id: Option<Uuid>,
    pub note: Option<String>,
}

impl CashEntryRequest {
    pub fn new(statement_id: Uuid, patient_id: Uuid, date: NaiveDate) -> Self {
        Self {
            statement_id,
            patient_id,
            doctor_id: None,
            date,
            paid_by: None,
            lines: Vec::new(),
            rest: false,
            supplement: false,
            previous_entry_id: None,
            note: None,
        }
    }

    pub fn with_doctor(mut self, doctor_id: Uuid) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    pub fn with_line(mut self, line: CashEntryLineDraft) -> Self {
        self.lines.push(line);
        self
    }

    pub fn paid_by(mut self, payer: PaidBy) -> Self {
        self.paid_by = Some(payer);
        self
    }

    /// Settle the remainder of `previous_entry_id`
    pub fn rest_of(mut self, previous_entry_id: Uuid) -> Self {
        self.rest = true;
        self.previous_entry_id = Some(previous_entry_id);
        self
    }

    /// Rest entry that also bills its own lines
    pub fn with_supplement(mut self) -> Self {
        self.supplement = true;
        self
    }
}
