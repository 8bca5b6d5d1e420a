//! Structural checks for custom transactions, run before anything is funded
//! or signed.

use crate::dftx::{
    AccountToAccount, AccountToUtxos, AppointOracle, DfTx, PoolAddLiquidity, UtxosToAccount,
};
use crate::error::DfiError;

pub(super) fn validate(tx: &DfTx) -> Result<(), DfiError> {
    match tx {
        DfTx::AccountToAccount(msg) => account_to_account(msg),
        DfTx::UtxosToAccount(msg) => utxos_to_account(msg),
        DfTx::AccountToUtxos(msg) => account_to_utxos(msg),
        DfTx::PoolAddLiquidity(msg) => add_liquidity(msg),
        DfTx::AppointOracle(msg) => appoint_oracle(msg),
        _ => Ok(()),
    }
}

fn account_to_account(msg: &AccountToAccount) -> Result<(), DfiError> {
    if msg.to.is_empty() {
        return Err(DfiError::Structural(
            "`accountToAccount.to` must have at least one entry".into(),
        ));
    }
    Ok(())
}

fn utxos_to_account(msg: &UtxosToAccount) -> Result<(), DfiError> {
    if msg.to.is_empty() {
        return Err(DfiError::Structural(
            "`utxosToAccount.to` must have at least one entry".into(),
        ));
    }
    if msg.to.iter().flat_map(|e| &e.balances).any(|b| b.amount < 0) {
        return Err(DfiError::Structural(
            "`utxosToAccount.to` amounts must not be negative".into(),
        ));
    }
    Ok(())
}

fn account_to_utxos(msg: &AccountToUtxos) -> Result<(), DfiError> {
    if msg.balances.is_empty() {
        return Err(DfiError::Structural(
            "`accountToUtxos.balances` must have at least one entry".into(),
        ));
    }
    for balance in &msg.balances {
        if balance.amount <= 0 {
            return Err(DfiError::Structural(
                "`accountToUtxos.balances` amounts must be positive".into(),
            ));
        }
        if u8::try_from(balance.token).is_err() {
            return Err(DfiError::Structural(format!(
                "token {} cannot be minted into an output",
                balance.token
            )));
        }
    }
    Ok(())
}

fn add_liquidity(msg: &PoolAddLiquidity) -> Result<(), DfiError> {
    let [from] = msg.from.as_slice() else {
        return Err(DfiError::Structural(
            "`addLiquidity.from` array length must be ONE".into(),
        ));
    };
    let [a, b] = from.balances.as_slice() else {
        return Err(DfiError::Structural(
            "`addLiquidity.from[0].balances` array length must be TWO".into(),
        ));
    };
    if a.token == b.token {
        return Err(DfiError::Structural(
            "`addLiquidity.from[0].balances` must consists of TWO different token".into(),
        ));
    }
    Ok(())
}

fn appoint_oracle(msg: &AppointOracle) -> Result<(), DfiError> {
    if msg.price_feeds.is_empty() {
        return Err(DfiError::Structural(
            "`appointOracle.priceFeeds` must have at least one entry".into(),
        ));
    }
    Ok(())
}
