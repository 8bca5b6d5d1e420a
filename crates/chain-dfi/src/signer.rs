//! Signing orchestration over an async key capability.
//!
//! Every input is hashed up front, then all signature requests run
//! concurrently. Each returned signature is checked against the digest and
//! public key before the witness or scriptSig is assembled.

use std::future::Future;

use crypto_utils::hash160;
use futures::future::try_join_all;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use tracing::{debug, trace};

use crate::error::DfiError;
use crate::script::{Opcode, Script};
use crate::sighash::{SigHashType, SigHasher};
use crate::transaction::{RawTransaction, Transaction, TransactionSegWit, Vout, Witness};

/// A key that can produce a compressed public key and sign 32-byte digests.
pub trait Signer {
    fn public_key(&self) -> impl Future<Output = Result<[u8; 33], DfiError>>;

    /// DER-encoded ECDSA signature over `digest`, without a sighash byte.
    fn sign(&self, digest: [u8; 32]) -> impl Future<Output = Result<Vec<u8>, DfiError>>;
}

/// One input to sign: the output it spends and the key that owns it.
#[derive(Debug)]
pub struct SignInput<'a, S> {
    pub prevout: &'a Vout,
    pub signer: &'a S,
}

impl<'a, S> SignInput<'a, S> {
    pub fn new(prevout: &'a Vout, signer: &'a S) -> Self {
        Self { prevout, signer }
    }
}

enum Unlock {
    Witness(Witness),
    ScriptSig(Script),
}

/// Sign every input of `tx`. `inputs[i]` describes `tx.vin[i]`.
///
/// Returns a SegWit transaction when any input carries witness data,
/// otherwise a legacy one.
pub async fn sign_transaction<S: Signer>(
    tx: &Transaction,
    inputs: &[SignInput<'_, S>],
    sighash: SigHashType,
) -> Result<RawTransaction, DfiError> {
    if inputs.len() != tx.vin.len() {
        return Err(DfiError::SigningError(format!(
            "{} signing inputs for {} transaction inputs",
            inputs.len(),
            tx.vin.len()
        )));
    }
    debug!(
        inputs = inputs.len(),
        sighash = sighash.byte(),
        "signing transaction"
    );

    let hasher = SigHasher::new(tx);
    let unlocks = try_join_all(
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| sign_input(&hasher, index, input, sighash)),
    )
    .await?;

    let mut signed = tx.clone();
    let mut witnesses = Vec::with_capacity(unlocks.len());
    for (vin, unlock) in signed.vin.iter_mut().zip(unlocks) {
        match unlock {
            Unlock::Witness(witness) => witnesses.push(witness),
            Unlock::ScriptSig(script) => {
                vin.script = script;
                witnesses.push(Witness::default());
            }
        }
    }

    if witnesses.iter().all(Witness::is_empty) {
        return Ok(RawTransaction::Legacy(signed));
    }
    Ok(RawTransaction::SegWit(TransactionSegWit::new(signed, witnesses)?))
}

async fn sign_input<S: Signer>(
    hasher: &SigHasher<'_>,
    index: usize,
    input: &SignInput<'_, S>,
    sighash: SigHashType,
) -> Result<Unlock, DfiError> {
    let pubkey = input.signer.public_key().await?;
    let pubkey_hash = hash160(&pubkey);
    let script = &input.prevout.script;

    if let Some(hash) = script.as_p2wpkh() {
        check_owner(index, &hash, &pubkey_hash)?;
        let script_code = Script::p2pkh(&hash);
        let digest = hasher.witness_digest(index, &script_code, input.prevout.value, sighash)?;
        let signature = request_signature(input.signer, &pubkey, digest, sighash).await?;
        trace!(index, "signed p2wpkh input");
        return Ok(Unlock::Witness(Witness::new(vec![
            signature,
            pubkey.to_vec(),
        ])));
    }

    if let Some(hash) = script.as_p2pkh() {
        check_owner(index, &hash, &pubkey_hash)?;
        let digest = hasher.legacy_digest(index, script, sighash)?;
        let signature = request_signature(input.signer, &pubkey, digest, sighash).await?;
        trace!(index, "signed p2pkh input");
        return Ok(Unlock::ScriptSig(Script::new(vec![
            Opcode::push(signature),
            Opcode::push(pubkey.to_vec()),
        ])));
    }

    Err(DfiError::SigningError(format!(
        "input {index}: unsupported prevout script {script}"
    )))
}

fn check_owner(index: usize, expected: &[u8; 20], actual: &[u8; 20]) -> Result<(), DfiError> {
    if expected != actual {
        return Err(DfiError::SigningError(format!(
            "input {index}: public key hash {} does not match prevout {}",
            hex::encode(actual),
            hex::encode(expected)
        )));
    }
    Ok(())
}

/// Ask the capability for a signature, verify it, and append the sighash byte.
async fn request_signature<S: Signer>(
    signer: &S,
    pubkey: &[u8; 33],
    digest: [u8; 32],
    sighash: SigHashType,
) -> Result<Vec<u8>, DfiError> {
    let mut der = signer.sign(digest).await?;
    verify_signature(pubkey, &digest, &der)?;
    der.push(sighash.byte());
    Ok(der)
}

/// Check a DER signature over `digest`. High-S signatures are rejected.
pub fn verify_signature(pubkey: &[u8], digest: &[u8; 32], der: &[u8]) -> Result<(), DfiError> {
    let key = VerifyingKey::from_sec1_bytes(pubkey)
        .map_err(|e| DfiError::SigningError(format!("invalid public key: {e}")))?;
    let signature = Signature::from_der(der)
        .map_err(|e| DfiError::SigningError(format!("invalid DER signature: {e}")))?;
    if signature.normalize_s().is_some() {
        return Err(DfiError::SigningError("signature has a high S value".into()));
    }
    key.verify_prehash(digest, &signature)
        .map_err(|_| DfiError::SigningError("signature does not verify against digest".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Txid, Vin};
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    struct KeySigner(SigningKey);

    impl KeySigner {
        fn new(fill: u8) -> Self {
            Self(SigningKey::from_slice(&[fill; 32]).unwrap())
        }

        fn pubkey(&self) -> [u8; 33] {
            self.0
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .try_into()
                .unwrap()
        }
    }

    impl Signer for KeySigner {
        async fn public_key(&self) -> Result<[u8; 33], DfiError> {
            Ok(self.pubkey())
        }

        async fn sign(&self, digest: [u8; 32]) -> Result<Vec<u8>, DfiError> {
            let signature: Signature = self
                .0
                .sign_prehash(&digest)
                .map_err(|e| DfiError::SigningError(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
    }

    /// Reports a valid key but returns junk signatures.
    struct BrokenSigner(KeySigner);

    impl Signer for BrokenSigner {
        async fn public_key(&self) -> Result<[u8; 33], DfiError> {
            Ok(self.0.pubkey())
        }

        async fn sign(&self, digest: [u8; 32]) -> Result<Vec<u8>, DfiError> {
            let mut other = digest;
            other[0] ^= 0xff;
            self.0.sign(other).await
        }
    }

    struct FailingSigner;

    impl Signer for FailingSigner {
        async fn public_key(&self) -> Result<[u8; 33], DfiError> {
            Err(DfiError::SigningError("device locked".into()))
        }

        async fn sign(&self, _digest: [u8; 32]) -> Result<Vec<u8>, DfiError> {
            Err(DfiError::SigningError("device locked".into()))
        }
    }

    fn unsigned(inputs: usize) -> Transaction {
        Transaction {
            version: 4,
            vin: (0..inputs)
                .map(|i| Vin {
                    txid: Txid::from_wire([0x10 + i as u8; 32]),
                    index: 0,
                    script: Script::empty(),
                    sequence: 0xffff_ffff,
                })
                .collect(),
            vout: vec![Vout {
                value: 90_000,
                script: Script::p2wpkh(&[0x77; 20]),
                token_id: 0,
            }],
            lock_time: 0,
        }
    }

    fn p2wpkh_prevout(signer: &KeySigner) -> Vout {
        Vout {
            value: 100_000,
            script: Script::p2wpkh(&hash160(&signer.pubkey())),
            token_id: 0,
        }
    }

    #[tokio::test]
    async fn p2wpkh_produces_segwit() {
        let signer = KeySigner::new(1);
        let prevout = p2wpkh_prevout(&signer);
        let tx = unsigned(1);
        let signed = sign_transaction(&tx, &[SignInput::new(&prevout, &signer)], SigHashType::ALL)
            .await
            .unwrap();

        let RawTransaction::SegWit(segwit) = &signed else {
            panic!("expected segwit");
        };
        let items = &segwit.witness()[0].items;
        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].last().unwrap(), 0x01);
        assert_eq!(items[1], signer.pubkey().to_vec());
        assert_eq!(signed.txid(), tx.txid());
    }

    #[tokio::test]
    async fn p2pkh_produces_legacy_script_sig() {
        let signer = KeySigner::new(2);
        let prevout = Vout {
            value: 100_000,
            script: Script::p2pkh(&hash160(&signer.pubkey())),
            token_id: 0,
        };
        let tx = unsigned(1);
        let signed = sign_transaction(&tx, &[SignInput::new(&prevout, &signer)], SigHashType::ALL)
            .await
            .unwrap();

        let RawTransaction::Legacy(legacy) = &signed else {
            panic!("expected legacy");
        };
        let ops = legacy.vin[0].script.ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[1], Opcode::PushData(p) if p.len() == 33));
    }

    #[tokio::test]
    async fn signing_twice_is_deterministic() {
        let signer = KeySigner::new(3);
        let prevout = p2wpkh_prevout(&signer);
        let tx = unsigned(2);
        let inputs = [
            SignInput::new(&prevout, &signer),
            SignInput::new(&prevout, &signer),
        ];
        let a = sign_transaction(&tx, &inputs, SigHashType::ALL).await.unwrap();
        let b = sign_transaction(&tx, &inputs, SigHashType::ALL).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn wrong_key_for_prevout_rejected() {
        let owner = KeySigner::new(4);
        let other = KeySigner::new(5);
        let prevout = p2wpkh_prevout(&owner);
        let err = sign_transaction(&unsigned(1), &[SignInput::new(&prevout, &other)], SigHashType::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, DfiError::SigningError(_)));
    }

    #[tokio::test]
    async fn bad_signature_rejected() {
        let signer = BrokenSigner(KeySigner::new(6));
        let prevout = p2wpkh_prevout(&signer.0);
        let err = sign_transaction(&unsigned(1), &[SignInput::new(&prevout, &signer)], SigHashType::ALL)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DfiError::SigningError("signature does not verify against digest".into())
        );
    }

    #[tokio::test]
    async fn capability_error_fails_whole_attempt() {
        let prevout = Vout {
            value: 1,
            script: Script::p2wpkh(&[0; 20]),
            token_id: 0,
        };
        let err = sign_transaction(
            &unsigned(1),
            &[SignInput::new(&prevout, &FailingSigner)],
            SigHashType::ALL,
        )
        .await
        .unwrap_err();
        assert_eq!(err, DfiError::SigningError("device locked".into()));
    }

    #[tokio::test]
    async fn input_count_mismatch() {
        let signer = KeySigner::new(7);
        let prevout = p2wpkh_prevout(&signer);
        let err = sign_transaction(&unsigned(2), &[SignInput::new(&prevout, &signer)], SigHashType::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, DfiError::SigningError(_)));
    }

    #[tokio::test]
    async fn unsupported_prevout_script() {
        let signer = KeySigner::new(8);
        let prevout = Vout {
            value: 1,
            script: Script::p2sh(&hash160(&signer.pubkey())),
            token_id: 0,
        };
        assert!(sign_transaction(&unsigned(1), &[SignInput::new(&prevout, &signer)], SigHashType::ALL)
            .await
            .is_err());
    }

    #[test]
    fn verify_rejects_garbage_der() {
        let signer = KeySigner::new(9);
        assert!(verify_signature(&signer.pubkey(), &[0u8; 32], &[0x30, 0x00]).is_err());
    }
}
