//! Assembles funded, unsigned transactions.
//!
//! Custom messages become an `OP_RETURN` output in front of any caller
//! outputs. Prevouts are chosen, the fee is estimated for the final shape, and
//! whatever is left over goes to a change output.

pub mod fee;
mod prevout;
mod txn;

pub use fee::{estimate_vsize, FeeEstimator, FeeRate};
pub use prevout::{select_prevouts, Prevout, PrevoutSelection};

use serde::Deserialize;
use tracing::debug;

use crate::address::Address;
use crate::dftx::{
    AccountToAccount, AccountToUtxos, AppointOracle, CreateCfp, DfTx, PoolAddLiquidity,
    PoolRemoveLiquidity, PoolSwap, RemoveOracle, UtxosToAccount,
};
use crate::error::DfiError;
use crate::script::Script;
use crate::sighash::SigHashType;
use crate::signer::{sign_transaction, SignInput, Signer};
use crate::transaction::{RawTransaction, Transaction, Vout};

/// Fields stamped on every built transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub version: u32,
    pub sequence: u32,
    pub lock_time: u32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            version: 4,
            sequence: 0xffff_ffff,
            lock_time: 0,
        }
    }
}

/// A transaction ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// The prevouts being spent, in input order.
    pub prevouts: Vec<Prevout>,
    /// Satoshis left for the miner.
    pub fee: u64,
}

impl UnsignedTransaction {
    pub fn spent_outputs(&self) -> Vec<Vout> {
        self.prevouts.iter().map(Prevout::spent_output).collect()
    }

    /// Sign every input with `signer` using `SIGHASH_ALL`.
    pub async fn sign<S: Signer>(&self, signer: &S) -> Result<RawTransaction, DfiError> {
        let spent = self.spent_outputs();
        let inputs: Vec<SignInput<'_, S>> = spent
            .iter()
            .map(|prevout| SignInput::new(prevout, signer))
            .collect();
        sign_transaction(&self.tx, &inputs, SigHashType::ALL).await
    }
}

/// Builds transactions funded from a set of caller-supplied prevouts.
#[derive(Debug, Clone)]
pub struct TransactionBuilder<F> {
    estimator: F,
    config: BuilderConfig,
    pinned: Vec<Prevout>,
    pool: Vec<Prevout>,
}

impl<F: FeeEstimator> TransactionBuilder<F> {
    pub fn new(estimator: F) -> Self {
        Self {
            estimator,
            config: BuilderConfig::default(),
            pinned: Vec::new(),
            pool: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Prevouts spent by every transaction this builder produces.
    pub fn pin_prevouts(mut self, prevouts: Vec<Prevout>) -> Self {
        self.pinned = prevouts;
        self
    }

    /// Prevouts the builder may pick from, largest first, to cover the rest.
    pub fn candidate_prevouts(mut self, prevouts: Vec<Prevout>) -> Self {
        self.pool = prevouts;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Fund `outputs`, sending anything left over to `change_script`.
    pub fn build(
        &self,
        outputs: Vec<Vout>,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.assemble(outputs, Vec::new(), change_script)
    }

    /// Pay `amount` to `to`.
    pub fn send(
        &self,
        to: &Address,
        amount: u64,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        let output = Vout::new(amount, to.script()?, 0)?;
        self.build(vec![output], change_script)
    }

    pub fn account_to_account(
        &self,
        msg: AccountToAccount,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::AccountToAccount(msg), 0, Vec::new(), change_script)
    }

    /// The carrying output holds the converted amount.
    pub fn utxos_to_account(
        &self,
        msg: UtxosToAccount,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        let tx = DfTx::UtxosToAccount(msg);
        txn::validate(&tx)?;
        let DfTx::UtxosToAccount(msg) = &tx else {
            return Err(DfiError::Structural("expected UtxosToAccount".into()));
        };
        let total = msg
            .total_amount()
            .and_then(|amount| u64::try_from(amount).ok())
            .ok_or_else(|| DfiError::Structural("`utxosToAccount.to` amounts overflow".into()))?;
        self.custom(tx, total, Vec::new(), change_script)
    }

    /// Minted outputs pay `destination` and follow the message output
    /// directly, so `minting_outputs_start` is always 1.
    pub fn account_to_utxos(
        &self,
        mut msg: AccountToUtxos,
        destination: &Script,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        msg.minting_outputs_start = 1;
        let tx = DfTx::AccountToUtxos(msg);
        txn::validate(&tx)?;
        let DfTx::AccountToUtxos(msg) = &tx else {
            return Err(DfiError::Structural("expected AccountToUtxos".into()));
        };
        let minted = msg
            .balances
            .iter()
            .map(|balance| {
                let value = u64::try_from(balance.amount)
                    .map_err(|_| DfiError::Structural("negative minted amount".into()))?;
                let token_id = u8::try_from(balance.token).map_err(|_| {
                    DfiError::Structural(format!("token {} cannot be minted", balance.token))
                })?;
                Vout::new(value, destination.clone(), token_id)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.custom(tx, 0, minted, change_script)
    }

    pub fn pool_add_liquidity(
        &self,
        msg: PoolAddLiquidity,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::PoolAddLiquidity(msg), 0, Vec::new(), change_script)
    }

    pub fn pool_remove_liquidity(
        &self,
        msg: PoolRemoveLiquidity,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::PoolRemoveLiquidity(msg), 0, Vec::new(), change_script)
    }

    pub fn pool_swap(
        &self,
        msg: PoolSwap,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::PoolSwap(msg), 0, Vec::new(), change_script)
    }

    pub fn appoint_oracle(
        &self,
        msg: AppointOracle,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::AppointOracle(msg), 0, Vec::new(), change_script)
    }

    pub fn remove_oracle(
        &self,
        msg: RemoveOracle,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::RemoveOracle(msg), 0, Vec::new(), change_script)
    }

    /// `proposal_fee` is burned through the message output.
    pub fn create_cfp(
        &self,
        msg: CreateCfp,
        proposal_fee: u64,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        self.custom(DfTx::CreateCfp(msg), proposal_fee, Vec::new(), change_script)
    }

    fn custom(
        &self,
        tx: DfTx,
        value: u64,
        minted: Vec<Vout>,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        txn::validate(&tx)?;
        debug!(kind = tx.name(), value, "building custom transaction");
        let output = Vout::new(value, Script::defi_tx(tx), 0)?;
        self.assemble(vec![output], minted, change_script)
    }

    /// `funded` outputs are paid from the prevouts; `minted` outputs are
    /// created by the chain and only cost their size.
    fn assemble(
        &self,
        funded: Vec<Vout>,
        minted: Vec<Vout>,
        change_script: &Script,
    ) -> Result<UnsignedTransaction, DfiError> {
        let version = self.config.version;
        let mut sized: Vec<Vout> = funded.clone();
        sized.extend(minted.iter().map(|vout| Vout {
            value: 0,
            ..vout.clone()
        }));
        let change_template = Vout {
            value: 0,
            script: change_script.clone(),
            token_id: 0,
        };

        let selection = select_prevouts(
            &self.pinned,
            &self.pool,
            &sized,
            &change_template,
            version,
            &self.estimator,
        )?;

        let target = funded
            .iter()
            .try_fold(0u64, |acc, vout| acc.checked_add(vout.value))
            .ok_or_else(|| DfiError::Structural("output values overflow u64".into()))?;
        let change = selection
            .total
            .checked_sub(target)
            .and_then(|rest| rest.checked_sub(selection.fee))
            .ok_or(DfiError::InsufficientFunds {
                needed: target.saturating_add(selection.fee),
                available: selection.total,
            })?;

        let mut vout = funded;
        vout.extend(minted);
        let fee = if change > self.estimator.dust_threshold() {
            vout.push(Vout::new(change, change_script.clone(), 0)?);
            selection.fee
        } else {
            selection.fee + change
        };
        debug!(
            inputs = selection.selected.len(),
            outputs = vout.len(),
            change,
            fee,
            "transaction assembled"
        );

        let tx = Transaction {
            version,
            vin: selection
                .selected
                .iter()
                .map(|prevout| prevout.to_vin(self.config.sequence))
                .collect(),
            vout,
            lock_time: self.config.lock_time,
        };
        Ok(UnsignedTransaction {
            tx,
            prevouts: selection.selected,
            fee,
        })
    }
}
