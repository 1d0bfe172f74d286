//! Foreign deposit evidence. The same checks apply to every asset; only the
//! endpoint pool, the maturity and the accepted payees differ.

use entangle_types::{Amount, AssetType, ForeignTxHash};
use tracing::debug;

use crate::error::VerifyError;
use crate::verifier::Verifier;

impl Verifier {
    /// Confirm that output `index` of foreign tx `hash`, mined at `height`,
    /// deposited exactly `amount` into one of the `payees` scripts and is
    /// mature. Returns the public key that signed input 0, which owns the
    /// deposit.
    pub fn verify_foreign_deposit(
        &self,
        asset: AssetType,
        hash: &ForeignTxHash,
        index: u32,
        height: u64,
        amount: Amount,
        payees: &[Vec<u8>],
    ) -> Result<Vec<u8>, VerifyError> {
        let pool = self.clients().pool(asset)?;
        let tx = pool.call("get_transaction", |c| c.get_transaction(hash))?;

        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return Err(VerifyError::ForeignShape {
                hash: hash.clone(),
                inputs: tx.inputs.len(),
                outputs: tx.outputs.len(),
            });
        }
        let out = tx
            .outputs
            .get(index as usize)
            .ok_or(VerifyError::OutputIndex {
                index: index as u64,
                outputs: tx.outputs.len(),
            })?;

        let pubkey = self.script().signer_pubkey(&tx.inputs[0])?;

        let block_hash = pool.call("get_block_hash", |c| c.get_block_hash(height))?;
        let block = pool.call("get_block", |c| c.get_block(&block_hash))?;
        if !block.contains(hash) {
            return Err(VerifyError::NotInBlock {
                hash: hash.clone(),
                height,
            });
        }

        if Amount::from(out.value) != amount {
            return Err(VerifyError::AmountMismatch {
                claimed: amount.to_string(),
                actual: out.value,
            });
        }

        let class = self.script().classify(&out.script);
        if !class.is_deposit_class() {
            return Err(VerifyError::WrongScriptClass(class));
        }
        if !payees.iter().any(|p| p == &out.script) {
            return Err(VerifyError::WrongPayee { asset, hash: hash.clone() });
        }

        let best = pool.call("get_best_height", |c| c.get_best_height())?;
        let maturity = self.params().maturity(asset);
        let confirmations = best.saturating_sub(height);
        if confirmations <= maturity {
            return Err(VerifyError::Immature {
                height,
                confirmations,
                maturity,
            });
        }

        debug!(%asset, %hash, index, height, %amount, "foreign deposit verified");
        Ok(pubkey)
    }
}
