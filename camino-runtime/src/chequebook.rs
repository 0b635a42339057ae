//! Cumulative cheques and the paid-out ledger they advance.

use crate::fx::Fx;
use camino_core::cheque::ChequeRecord;
use camino_core::error::ChequeError;
use camino_storage_impl::{Chain, ChainReader};
use camino_transaction::Cheque;
use log::debug;

/// Check `cheque` against the last accepted cheque of its key.
///
/// The serial must grow, the amount must not shrink, the increment must
/// equal `paid` (the value the enclosing tx moves to the beneficiary) and
/// the issuer must have signed the cheque fields.
///
/// # Returns
/// The increment over the last accepted amount
pub fn verify_cheque<R: ChainReader + ?Sized>(
    chain: &R,
    fx: &dyn Fx,
    cheque: &Cheque,
    paid: u64,
) -> Result<u64, ChequeError> {
    let last = chain.cheque(&cheque.key())?.unwrap_or_default();
    if cheque.serial <= last.serial {
        return Err(ChequeError::StaleSerial {
            last: last.serial,
            got: cheque.serial,
        });
    }
    if cheque.amount < last.amount {
        return Err(ChequeError::AmountBelowLast {
            last: last.amount,
            got: cheque.amount,
        });
    }
    let delta = cheque.amount - last.amount;
    if delta != paid {
        return Err(ChequeError::PayoutMismatch {
            expected: delta,
            actual: paid,
        });
    }

    let signer = fx
        .recover_address(&cheque.message_hash(), &cheque.signature)
        .map_err(|e| ChequeError::BadSignature(e.to_string()))?;
    if signer != cheque.issuer {
        return Err(ChequeError::BadSignature(format!(
            "signed by {}, issuer is {}",
            signer, cheque.issuer
        )));
    }
    Ok(delta)
}

/// Paid-out total of the cheque's issuer and beneficiary once `delta` is
/// added
pub fn paid_out_after<R: ChainReader + ?Sized>(
    chain: &R,
    cheque: &Cheque,
    delta: u64,
) -> Result<u64, ChequeError> {
    chain
        .paid_out(&cheque.issuer, &cheque.beneficiary)?
        .checked_add(delta)
        .ok_or(ChequeError::LedgerOverflow)
}

/// Record `cheque` as the last accepted one and set the paid-out ledger of
/// its issuer and beneficiary to `paid`, as computed by [`paid_out_after`]
pub fn apply_cheque<C: Chain + ?Sized>(chain: &mut C, cheque: &Cheque, paid: u64) {
    chain.set_paid_out(cheque.issuer, cheque.beneficiary, paid);
    chain.set_cheque(
        cheque.key(),
        ChequeRecord {
            amount: cheque.amount,
            serial: cheque.serial,
        },
    );
    debug!(
        "cheque {} -> {} serial {} (paid out {})",
        cheque.issuer, cheque.beneficiary, cheque.serial, paid
    );
}

#[cfg(test)]
pub(crate) mod test_cheques {
    use super::*;
    use crate::keychain::test_keys::*;
    use camino_core::id::ShortId;

    pub fn signed(issuer: u8, beneficiary: ShortId, amount: u64, serial: u64) -> Cheque {
        let mut cheque = Cheque {
            issuer: address(issuer),
            agent: ShortId::new([0xee; 20]),
            beneficiary,
            amount,
            serial,
            signature: vec![],
        };
        cheque.signature = keychain(&[issuer])
            .sign_hash(&address(issuer), &cheque.message_hash())
            .unwrap();
        cheque
    }
}
