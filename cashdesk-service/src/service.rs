use crate::entry::compute_amounts;
use crate::error::{CashdeskError, CashdeskResult};
use crate::models::{
    CashEntry, CashEntryLine, CashEntryRequest, CashExit, ExitMotif, PaymentReceipt, PaymentState,
    RateType, Statement, StatementState, StatementTotals,
};
use crate::pricing;
use crate::revenue::{self, DoctorShare};
use crate::statement::{compute_totals, resolve_previous, resolve_successor};
use chrono::{NaiveDate, Utc};
use clinic_core::{ConventionDirectory, DocumentKind, PricingCatalog, SequenceGenerator, SessionContext};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Default)]
struct LedgerBook {
    statements: HashMap<Uuid, Statement>,
    entries: HashMap<Uuid, CashEntry>,
    exits: HashMap<Uuid, CashExit>,
    next_number: u64,
}

impl LedgerBook {
    /// A statement's running balance: frozen once closed, live otherwise
    fn current_balance(&self, statement: &Statement) -> Decimal {
        if statement.state == StatementState::Closed {
            statement.balance
        } else {
            compute_totals(statement, self.entries.values(), self.exits.values()).balance
        }
    }
}

/// Cash desk: the statement chain, its entries and exits
///
/// One lock spans the whole book, so a close re-validates and commits
/// against the statement and its immediate successor atomically, and entry
/// writes observe the statement state they commit under.
pub struct CashdeskService {
    book: Arc<RwLock<LedgerBook>>,
    sequences: Arc<dyn SequenceGenerator>,
    catalog: Arc<dyn PricingCatalog>,
    directory: Arc<ConventionDirectory>,
}

impl CashdeskService {
    pub fn new(
        sequences: Arc<dyn SequenceGenerator>,
        catalog: Arc<dyn PricingCatalog>,
        directory: Arc<ConventionDirectory>,
    ) -> Self {
        Self {
            book: Arc::new(RwLock::new(LedgerBook::default())),
            sequences,
            catalog,
            directory,
        }
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    /// Create a draft statement chained after its predecessor
    pub async fn create_statement(
        &self,
        date: NaiveDate,
        ctx: &SessionContext,
    ) -> CashdeskResult<Statement> {
        let reference = self.sequences.next_reference(DocumentKind::Statement).await;
        let mut book = self.book.write().await;
        book.next_number += 1;
        let mut statement = Statement {
            id: Uuid::new_v4(),
            number: book.next_number,
            reference,
            date,
            state: StatementState::Draft,
            balance_start: Decimal::ZERO,
            balance: Decimal::ZERO,
            closed_at: None,
            created_by: ctx.user_id,
        };
        if let Some(previous) = resolve_previous(book.statements.values(), &statement) {
            statement.balance_start = book.current_balance(previous);
        }
        book.statements.insert(statement.id, statement.clone());
        info!(reference = %statement.reference, date = %statement.date, "statement created");
        Ok(statement)
    }

    /// Draft → open
    pub async fn open_statement(
        &self,
        statement_id: Uuid,
        _ctx: &SessionContext,
    ) -> CashdeskResult<Statement> {
        let mut book = self.book.write().await;
        let statement = book
            .statements
            .get_mut(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?;
        if statement.state != StatementState::Draft {
            return Err(CashdeskError::illegal_transition("open", statement.state));
        }
        statement.state = StatementState::Open;
        Ok(statement.clone())
    }

    /// Manual opening balance, only while the period is still writable
    pub async fn set_opening_balance(
        &self,
        statement_id: Uuid,
        balance_start: Decimal,
        _ctx: &SessionContext,
    ) -> CashdeskResult<Statement> {
        let mut book = self.book.write().await;
        let statement = book
            .statements
            .get_mut(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?;
        if statement.state == StatementState::Closed {
            return Err(CashdeskError::LockedPeriod {
                reference: statement.reference.clone(),
            });
        }
        statement.balance_start = balance_start;
        Ok(statement.clone())
    }

    /// Close the statement and push its balance one hop down the chain
    ///
    /// One-way: closing a closed statement is an error, never a second
    /// recomputation. The successor's opening balance is only written when
    /// it actually differs.
    pub async fn close_statement(
        &self,
        statement_id: Uuid,
        _ctx: &SessionContext,
    ) -> CashdeskResult<Statement> {
        let mut book = self.book.write().await;
        let statement = book
            .statements
            .get(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?
            .clone();
        if statement.state != StatementState::Open {
            return Err(CashdeskError::illegal_transition("close", statement.state));
        }

        // Lazy re-derivation from the predecessor, idempotent on equal values
        let derived_start = resolve_previous(book.statements.values(), &statement)
            .map(|previous| book.current_balance(previous));
        let balance_start = match derived_start {
            Some(derived) if derived != statement.balance_start => derived,
            _ => statement.balance_start,
        };

        let mut closing = statement.clone();
        closing.balance_start = balance_start;
        let totals = compute_totals(&closing, book.entries.values(), book.exits.values());

        let successor_id = resolve_successor(book.statements.values(), &closing).map(|s| s.id);

        let stored = book
            .statements
            .get_mut(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?;
        stored.balance_start = balance_start;
        stored.balance = totals.balance;
        stored.state = StatementState::Closed;
        stored.closed_at = Some(Utc::now());
        let closed = stored.clone();
        info!(reference = %closed.reference, balance = %closed.balance, "statement closed");

        if let Some(successor_id) = successor_id {
            if let Some(successor) = book.statements.get_mut(&successor_id) {
                if successor.state == StatementState::Closed {
                    warn!(
                        reference = %successor.reference,
                        "successor already closed, opening balance left frozen"
                    );
                } else if successor.balance_start != closed.balance {
                    successor.balance_start = closed.balance;
                    info!(
                        reference = %successor.reference,
                        balance_start = %successor.balance_start,
                        "successor opening balance re-derived"
                    );
                }
            }
        }
        Ok(closed)
    }

    pub async fn statement(&self, statement_id: Uuid) -> CashdeskResult<Statement> {
        let book = self.book.read().await;
        book.statements
            .get(&statement_id)
            .cloned()
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))
    }

    /// Live totals of a statement
    pub async fn statement_totals(&self, statement_id: Uuid) -> CashdeskResult<StatementTotals> {
        let book = self.book.read().await;
        let statement = book
            .statements
            .get(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?;
        Ok(compute_totals(statement, book.entries.values(), book.exits.values()))
    }

    // ========================================================================
    // CASH ENTRIES
    // ========================================================================

    /// Create a cash entry in a statement
    ///
    /// Lines are priced against the catalog (convention grid when the
    /// patient's coverage applies on the entry date) before the book lock is
    /// taken; the statement-state guard and the insert commit together.
    pub async fn create_cash_entry(
        &self,
        request: CashEntryRequest,
        ctx: &SessionContext,
    ) -> CashdeskResult<CashEntry> {
        if !request.rest && request.lines.is_empty() {
            return Err(CashdeskError::validation(
                "lines",
                "a cash entry bills at least one act",
            ));
        }
        if request.rest && request.previous_entry_id.is_none() {
            return Err(CashdeskError::validation(
                "previous_entry_id",
                "a rest entry references the entry it settles",
            ));
        }
        let lines = self.price_lines(&request).await?;
        let reference = self.sequences.next_reference(DocumentKind::CashEntry).await;

        let mut book = self.book.write().await;
        let statement = book
            .statements
            .get(&request.statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", request.statement_id)))?
            .clone();

        let left_to_pay = match request.previous_entry_id {
            Some(previous_id) if request.rest => {
                let previous = book.entries.get(&previous_id).ok_or_else(|| {
                    CashdeskError::NotFound(format!("cash entry {}", previous_id))
                })?;
                if previous.patient_id != request.patient_id {
                    return Err(CashdeskError::validation(
                        "previous_entry_id",
                        "a rest entry settles an entry of the same patient",
                    ));
                }
                previous.amount_residual
            }
            _ => Decimal::ZERO,
        };

        let amounts = compute_amounts(
            &lines,
            Decimal::ZERO,
            request.rest,
            request.supplement,
            left_to_pay,
        );
        Self::statement_write_guard(&statement, amounts.payment_state)?;

        let entry = CashEntry {
            id: Uuid::new_v4(),
            reference,
            statement_id: request.statement_id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            date: request.date,
            paid_by: request.paid_by,
            lines,
            montant: amounts.montant,
            tax_amount: amounts.tax_amount,
            amount_total: amounts.amount_total,
            amount_payed: Decimal::ZERO,
            amount_residual: amounts.amount_residual,
            payment_state: amounts.payment_state,
            rest: request.rest,
            supplement: request.supplement,
            previous_entry_id: request.previous_entry_id,
            left_to_pay,
            note: request.note,
            created_by: ctx.user_id,
            created_at: Utc::now(),
        };
        book.entries.insert(entry.id, entry.clone());
        info!(
            reference = %entry.reference,
            total = %entry.amount_total,
            state = %entry.payment_state,
            "cash entry created"
        );
        Ok(entry)
    }

    /// Register a payment against an entry and re-derive its state
    pub async fn register_payment(
        &self,
        entry_id: Uuid,
        amount: Decimal,
        _ctx: &SessionContext,
    ) -> CashdeskResult<PaymentReceipt> {
        if amount <= Decimal::ZERO {
            return Err(CashdeskError::validation(
                "amount",
                "a payment is strictly positive",
            ));
        }
        let mut book = self.book.write().await;
        let entry = book
            .entries
            .get(&entry_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("cash entry {}", entry_id)))?;
        let statement = book
            .statements
            .get(&entry.statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", entry.statement_id)))?
            .clone();

        let amount_payed = entry.amount_payed + amount;
        let amounts = compute_amounts(
            &entry.lines,
            amount_payed,
            entry.rest,
            entry.supplement,
            entry.left_to_pay,
        );
        Self::statement_write_guard(&statement, amounts.payment_state)?;

        let entry = book
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("cash entry {}", entry_id)))?;
        entry.amount_payed = amount_payed;
        entry.montant = amounts.montant;
        entry.tax_amount = amounts.tax_amount;
        entry.amount_total = amounts.amount_total;
        entry.amount_residual = amounts.amount_residual;
        entry.payment_state = amounts.payment_state;
        info!(
            reference = %entry.reference,
            payed = %entry.amount_payed,
            state = %entry.payment_state,
            "payment registered"
        );
        Ok(PaymentReceipt {
            amount_residual: entry.amount_residual,
            payment_state: entry.payment_state,
        })
    }

    pub async fn entry(&self, entry_id: Uuid) -> CashdeskResult<CashEntry> {
        let book = self.book.read().await;
        book.entries
            .get(&entry_id)
            .cloned()
            .ok_or_else(|| CashdeskError::NotFound(format!("cash entry {}", entry_id)))
    }

    /// Entries of a statement, oldest first
    pub async fn entries_of(&self, statement_id: Uuid) -> Vec<CashEntry> {
        let book = self.book.read().await;
        let mut entries: Vec<CashEntry> = book
            .entries
            .values()
            .filter(|entry| entry.statement_id == statement_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }

    // ========================================================================
    // CASH EXITS
    // ========================================================================

    /// Record cash leaving the desk
    pub async fn create_cash_exit(
        &self,
        statement_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
        motif: ExitMotif,
        note: Option<String>,
        ctx: &SessionContext,
    ) -> CashdeskResult<CashExit> {
        if amount <= Decimal::ZERO {
            return Err(CashdeskError::validation(
                "amount",
                "a disbursement is strictly positive",
            ));
        }
        let reference = self.sequences.next_reference(DocumentKind::CashExit).await;
        let mut book = self.book.write().await;
        let statement = book
            .statements
            .get(&statement_id)
            .ok_or_else(|| CashdeskError::NotFound(format!("statement {}", statement_id)))?;
        match statement.state {
            StatementState::Open => {}
            StatementState::Closed => {
                return Err(CashdeskError::LockedPeriod {
                    reference: statement.reference.clone(),
                });
            }
            StatementState::Draft => {
                return Err(CashdeskError::validation(
                    "statement_id",
                    "the statement is not open",
                ));
            }
        }
        let exit = CashExit {
            id: Uuid::new_v4(),
            reference,
            statement_id,
            recipient_id,
            date: statement.date,
            amount,
            motif,
            note,
            created_by: ctx.user_id,
        };
        book.exits.insert(exit.id, exit.clone());
        info!(reference = %exit.reference, amount = %exit.amount, motif = ?exit.motif, "cash exit created");
        Ok(exit)
    }

    /// Exits of a statement
    pub async fn exits_of(&self, statement_id: Uuid) -> Vec<CashExit> {
        let book = self.book.read().await;
        book.exits
            .values()
            .filter(|exit| exit.statement_id == statement_id)
            .cloned()
            .collect()
    }

    // ========================================================================
    // AGGREGATES
    // ========================================================================

    /// Doctor's revenue share versus disbursed revenue-share exits
    pub async fn revenue_share(&self, doctor_id: Uuid) -> DoctorShare {
        let book = self.book.read().await;
        revenue::doctor_share(book.entries.values(), book.exits.values(), doctor_id)
    }

    /// Patient's outstanding amount across all their entries
    pub async fn patient_outstanding(&self, patient_id: Uuid) -> Decimal {
        let book = self.book.read().await;
        revenue::patient_outstanding(book.entries.values(), patient_id)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    /// Writes into a closed statement only pass when they reach paid
    fn statement_write_guard(
        statement: &Statement,
        resulting_state: PaymentState,
    ) -> CashdeskResult<()> {
        match statement.state {
            StatementState::Open => Ok(()),
            StatementState::Closed if resulting_state == PaymentState::Paid => Ok(()),
            StatementState::Closed => Err(CashdeskError::LockedPeriod {
                reference: statement.reference.clone(),
            }),
            StatementState::Draft => Err(CashdeskError::validation(
                "statement_id",
                "the statement is not open",
            )),
        }
    }

    /// Price the request's lines against catalog and convention grid
    async fn price_lines(&self, request: &CashEntryRequest) -> CashdeskResult<Vec<CashEntryLine>> {
        let coverage = self
            .directory
            .active_coverage(request.patient_id, request.date)
            .await;
        let mut lines = Vec::with_capacity(request.lines.len());
        for draft in &request.lines {
            let act = self.catalog.act(draft.act_id).await?;
            let base_price = match (&draft.rate_type, &coverage) {
                (RateType::Convention, Some(coverage)) => {
                    self.catalog
                        .convention_price(draft.act_id, coverage.convention_id)
                        .await?
                }
                _ => act.list_price,
            };
            let (amount, tax_amount) =
                pricing::line_amounts(base_price, draft.difference_amount, draft.tax);
            let doctor_id = draft.doctor_id.or(request.doctor_id);
            let per_cote_part = match doctor_id {
                Some(doctor_id) => self.directory.doctor_share_rate(doctor_id).await,
                None => Decimal::ZERO,
            };
            let cote_part =
                pricing::cote_part(act.list_price, draft.difference_amount, per_cote_part);
            lines.push(CashEntryLine {
                id: Uuid::new_v4(),
                act_id: draft.act_id,
                designation: act.name,
                rate_type: draft.rate_type,
                tax: draft.tax,
                difference_amount: draft.difference_amount,
                doctor_id,
                per_cote_part,
                amount,
                tax_amount,
                cote_part,
            });
        }
        Ok(lines)
    }
}
