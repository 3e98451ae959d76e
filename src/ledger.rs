//! Wallet ledger
//!
//! `StoreInner::credit` and `StoreInner::debit` are the only code paths
//! that touch a wallet balance, and each appends the explaining
//! transaction record in the same mutation, so balance and history can
//! never drift apart. [`WalletLedger`] wraps them for the standalone
//! deposit/withdraw operations; the escrow controller calls the same
//! primitives inside its own transaction scope.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::{Amount, Transaction, TransactionKind};
use crate::store::{MarketStore, StoreInner};
use crate::EscrowResult;

impl StoreInner {
    /// Credit a wallet and record the explaining transaction.
    pub(crate) fn credit(
        &mut self,
        user_id: Uuid,
        amount: Amount,
        kind: TransactionKind,
        related_request_id: Option<Uuid>,
        description: String,
    ) -> EscrowResult<Transaction> {
        let wallet = self.wallet_mut(user_id)?;
        wallet.balance += amount.value();
        wallet.updated_at = Utc::now();

        let tx = Transaction::new(user_id, amount.value(), kind, related_request_id, description);
        self.transactions.push(tx.clone());
        Ok(tx)
    }

    /// Debit a wallet and record the explaining transaction. Fails with
    /// `InsufficientFunds` before any mutation if the balance is short.
    pub(crate) fn debit(
        &mut self,
        user_id: Uuid,
        amount: Amount,
        kind: TransactionKind,
        related_request_id: Option<Uuid>,
        description: String,
    ) -> EscrowResult<Transaction> {
        let wallet = self.wallet_mut(user_id)?;
        if !wallet.has_sufficient_balance(amount.value()) {
            return Err(EscrowError::insufficient_funds(
                amount.value(),
                wallet.balance,
            ));
        }

        // Last-resort invariant guard on the prospective balance, checked
        // before any mutation; the sufficiency check above is the control
        // path and normal flow can never reach this.
        let remaining = wallet.balance - amount.value();
        if remaining < Decimal::ZERO {
            return Err(EscrowError::internal(format!(
                "debit would drive wallet {user_id} balance negative"
            )));
        }

        wallet.balance = remaining;
        wallet.updated_at = Utc::now();

        let tx = Transaction::new(
            user_id,
            -amount.value(),
            kind,
            related_request_id,
            description,
        );
        self.transactions.push(tx.clone());
        Ok(tx)
    }
}

/// Public ledger operations on a user's wallet
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<MarketStore>,
}

impl WalletLedger {
    pub fn new(store: Arc<MarketStore>) -> Self {
        Self { store }
    }

    /// Deposit funds. Credits the balance and appends a `DEPOSIT` record
    /// in the same storage transaction.
    pub async fn deposit(&self, user_id: Uuid, amount: Amount) -> EscrowResult<Transaction> {
        let mut store = self.store.write().await;
        let tx = store.credit(
            user_id,
            amount,
            TransactionKind::Deposit,
            None,
            format!("Wallet deposit of {} EGP", amount.value()),
        )?;

        info!(user = %user_id, amount = %amount, "deposit recorded");
        Ok(tx)
    }

    /// Withdraw funds. Fails with `InsufficientFunds` leaving balance and
    /// history untouched, otherwise debits and appends a `WITHDRAWAL`
    /// record in the same storage transaction.
    pub async fn withdraw(&self, user_id: Uuid, amount: Amount) -> EscrowResult<Transaction> {
        let mut store = self.store.write().await;
        let tx = store.debit(
            user_id,
            amount,
            TransactionKind::Withdrawal,
            None,
            format!("Wallet withdrawal of {} EGP", amount.value()),
        )?;

        info!(user = %user_id, amount = %amount, "withdrawal recorded");
        Ok(tx)
    }

    /// Current balance
    pub async fn balance(&self, user_id: Uuid) -> EscrowResult<Decimal> {
        let store = self.store.read().await;
        Ok(store.wallet(user_id)?.balance)
    }

    /// Pure sufficiency predicate, no side effect
    pub async fn has_sufficient_balance(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> EscrowResult<bool> {
        let store = self.store.read().await;
        Ok(store.wallet(user_id)?.has_sufficient_balance(amount))
    }

    /// Transaction history, newest first
    pub async fn history(&self, user_id: Uuid) -> EscrowResult<Vec<Transaction>> {
        let store = self.store.read().await;
        store.wallet(user_id)?;
        Ok(store.transactions_for(user_id))
    }
}
