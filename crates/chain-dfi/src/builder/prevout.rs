use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::DfiError;
use crate::script::Script;
use crate::transaction::{Txid, Vin, Vout};

use super::fee::{estimate_vsize, FeeEstimator};

/// An unspent output supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prevout {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    pub script: Script,
    pub token_id: u8,
}

impl Prevout {
    /// The `(txid, vout)` pair this prevout spends.
    pub fn outpoint(&self) -> (Txid, u32) {
        (self.txid, self.vout)
    }

    pub fn to_vin(&self, sequence: u32) -> Vin {
        Vin {
            txid: self.txid,
            index: self.vout,
            script: Script::empty(),
            sequence,
        }
    }

    /// The output being spent, as the signer needs it.
    pub fn spent_output(&self) -> Vout {
        Vout {
            value: self.value,
            script: self.script.clone(),
            token_id: self.token_id,
        }
    }
}

/// Prevouts chosen to fund a transaction.
#[derive(Debug, Clone)]
pub struct PrevoutSelection {
    pub selected: Vec<Prevout>,
    pub total: u64,
    /// Fee for the selection with a change output included.
    pub fee: u64,
}

fn sum_values(prevouts: &[Prevout]) -> Result<u64, DfiError> {
    prevouts.iter().try_fold(0u64, |acc, p| {
        acc.checked_add(p.value)
            .ok_or_else(|| DfiError::Structural("prevout values overflow u64".into()))
    })
}

/// Select prevouts covering `outputs` plus fee.
///
/// `pinned` prevouts are always spent. Candidates from `pool` are then added
/// largest-first until the target is met. The fee is estimated with
/// `change_output` present.
///
/// Each outpoint is spent at most once: pinning one twice is a `Structural`
/// error, and pool entries repeating an already chosen outpoint are skipped.
pub fn select_prevouts<F: FeeEstimator>(
    pinned: &[Prevout],
    pool: &[Prevout],
    outputs: &[Vout],
    change_output: &Vout,
    version: u32,
    estimator: &F,
) -> Result<PrevoutSelection, DfiError> {
    let target = outputs.iter().try_fold(0u64, |acc, vout| {
        acc.checked_add(vout.value)
            .ok_or_else(|| DfiError::Structural("output values overflow u64".into()))
    })?;

    let mut with_change = outputs.to_vec();
    with_change.push(change_output.clone());
    let fee_for = |selected: &[Prevout]| estimator.fee(estimate_vsize(selected, &with_change, version));

    let mut spent = HashSet::new();
    for prevout in pinned {
        if !spent.insert(prevout.outpoint()) {
            return Err(DfiError::Structural(format!(
                "prevout {}:{} is pinned more than once",
                prevout.txid, prevout.vout
            )));
        }
    }

    let mut selected = pinned.to_vec();
    let mut total = sum_values(&selected)?;
    let mut fee = fee_for(&selected);

    let mut candidates: Vec<&Prevout> = pool.iter().collect();
    candidates.sort_by(|a, b| b.value.cmp(&a.value));
    let mut candidates = candidates
        .into_iter()
        .filter(|p| spent.insert(p.outpoint()));

    while total < target.saturating_add(fee) {
        let Some(next) = candidates.next() else {
            break;
        };
        trace!(txid = %next.txid, vout = next.vout, value = next.value, "selecting prevout");
        selected.push(next.clone());
        total = total.checked_add(next.value).ok_or_else(|| {
            DfiError::Structural("prevout values overflow u64".into())
        })?;
        fee = fee_for(&selected);
    }

    let needed = target.saturating_add(fee);
    if selected.is_empty() || total < needed {
        return Err(DfiError::InsufficientFunds {
            needed,
            available: total,
        });
    }

    debug!(
        inputs = selected.len(),
        total,
        target,
        fee,
        "prevouts selected"
    );
    Ok(PrevoutSelection {
        selected,
        total,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fee::FeeRate;

    fn prevout(fill: u8, value: u64) -> Prevout {
        Prevout {
            txid: Txid::from_wire([fill; 32]),
            vout: 0,
            value,
            script: Script::p2wpkh(&[0x01; 20]),
            token_id: 0,
        }
    }

    fn output(value: u64) -> Vout {
        Vout {
            value,
            script: Script::p2wpkh(&[0x02; 20]),
            token_id: 0,
        }
    }

    fn change() -> Vout {
        output(0)
    }

    #[test]
    fn selects_single_large_prevout() {
        let pool = vec![prevout(1, 100_000), prevout(2, 50_000)];
        let selection =
            select_prevouts(&[], &pool, &[output(40_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.total, 100_000);
    }

    #[test]
    fn selects_multiple_when_needed() {
        let pool = vec![prevout(1, 30_000), prevout(2, 30_000), prevout(3, 30_000)];
        let selection =
            select_prevouts(&[], &pool, &[output(55_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        assert_eq!(selection.selected.len(), 2);
        assert!(selection.total >= 55_000 + selection.fee);
    }

    #[test]
    fn pinned_prevouts_always_spent() {
        let pinned = vec![prevout(9, 1_000)];
        let pool = vec![prevout(1, 100_000)];
        let selection =
            select_prevouts(&pinned, &pool, &[output(50_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        assert_eq!(selection.selected[0], pinned[0]);
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.total, 101_000);
    }

    #[test]
    fn pinned_alone_when_sufficient() {
        let pinned = vec![prevout(9, 100_000)];
        let pool = vec![prevout(1, 100_000)];
        let selection =
            select_prevouts(&pinned, &pool, &[output(1_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        assert_eq!(selection.selected, pinned);
    }

    #[test]
    fn insufficient_funds() {
        let pool = vec![prevout(1, 1_000)];
        let err = select_prevouts(&[], &pool, &[output(500_000)], &change(), 4, &FeeRate::new(1))
            .unwrap_err();
        assert!(matches!(
            err,
            DfiError::InsufficientFunds {
                available: 1_000,
                ..
            }
        ));
    }

    #[test]
    fn empty_pool_is_insufficient() {
        let err =
            select_prevouts(&[], &[], &[output(0)], &change(), 4, &FeeRate::new(0)).unwrap_err();
        assert!(matches!(err, DfiError::InsufficientFunds { .. }));
    }

    #[test]
    fn pool_entry_for_pinned_outpoint_not_spent_again() {
        let pinned = vec![prevout(1, 1_000)];
        let pool = vec![prevout(1, 100_000), prevout(2, 80_000)];
        let selection =
            select_prevouts(&pinned, &pool, &[output(50_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        let outpoints: Vec<_> = selection.selected.iter().map(Prevout::outpoint).collect();
        assert_eq!(
            outpoints,
            vec![(Txid::from_wire([1; 32]), 0), (Txid::from_wire([2; 32]), 0)]
        );
        assert_eq!(selection.total, 81_000);
    }

    #[test]
    fn duplicate_pool_outpoints_spent_once() {
        let pool = vec![prevout(3, 30_000), prevout(3, 30_000), prevout(4, 20_000)];
        let selection =
            select_prevouts(&[], &pool, &[output(45_000)], &change(), 4, &FeeRate::new(1)).unwrap();
        let outpoints: HashSet<_> = selection.selected.iter().map(Prevout::outpoint).collect();
        assert_eq!(outpoints.len(), selection.selected.len());
        assert_eq!(selection.total, 50_000);
    }

    #[test]
    fn outpoint_pinned_twice_rejected() {
        let pinned = vec![prevout(5, 1_000), prevout(5, 2_000)];
        let err = select_prevouts(&pinned, &[], &[output(0)], &change(), 4, &FeeRate::new(0))
            .unwrap_err();
        assert!(matches!(err, DfiError::Structural(_)));
    }

    #[test]
    fn spent_output_copies_value_script_and_token() {
        let p = Prevout {
            token_id: 3,
            ..prevout(1, 42)
        };
        let out = p.spent_output();
        assert_eq!(out.value, 42);
        assert_eq!(out.token_id, 3);
        assert_eq!(out.script, p.script);
        assert_eq!(p.to_vin(7).sequence, 7);
    }
}
