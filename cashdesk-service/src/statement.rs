use crate::models::{CashEntry, CashExit, Statement, StatementTotals};
use rust_decimal::Decimal;

/// The statement immediately before `target` in the chain
///
/// Most recent statement dated on or before the target, with the ledger
/// number breaking ties on equal dates. A strict total order, so every
/// statement except the first has exactly one predecessor.
pub fn resolve_previous<'a, I>(statements: I, target: &Statement) -> Option<&'a Statement>
where
    I: IntoIterator<Item = &'a Statement>,
{
    statements
        .into_iter()
        .filter(|statement| statement.id != target.id)
        .filter(|statement| {
            statement.date < target.date
                || (statement.date == target.date && statement.number < target.number)
        })
        .max_by_key(|statement| (statement.date, statement.number))
}

/// The statement immediately after `target` in the chain
pub fn resolve_successor<'a, I>(statements: I, target: &Statement) -> Option<&'a Statement>
where
    I: IntoIterator<Item = &'a Statement>,
{
    statements
        .into_iter()
        .filter(|statement| statement.id != target.id)
        .filter(|statement| {
            statement.date > target.date
                || (statement.date == target.date && statement.number > target.number)
        })
        .min_by_key(|statement| (statement.date, statement.number))
}

/// Sums over the statement's children:
/// `balance = balance_start + entries_total − exits_total`
pub fn compute_totals<'a, E, X>(statement: &Statement, entries: E, exits: X) -> StatementTotals
where
    E: IntoIterator<Item = &'a CashEntry>,
    X: IntoIterator<Item = &'a CashExit>,
{
    let entries_total: Decimal = entries
        .into_iter()
        .filter(|entry| entry.statement_id == statement.id)
        .map(|entry| entry.amount_total)
        .sum();
    let exits_total: Decimal = exits
        .into_iter()
        .filter(|exit| exit.statement_id == statement.id)
        .map(|exit| exit.amount)
        .sum();
    StatementTotals {
        entries_total,
        exits_total,
        balance: statement.balance_start + entries_total - exits_total,
    }
}
