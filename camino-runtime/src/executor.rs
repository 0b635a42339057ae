//! Execution of signed txs against a mutable chain view.

use crate::chequebook::{apply_cheque, paid_out_after, verify_cheque};
use crate::fx::{is_authorized, Fx};
use crate::verifier::TransitionVerifier;
use camino_core::error::{TxError, VerifyError};
use camino_core::id::{Id, ShortId};
use camino_core::lock::LockState;
use camino_core::owner::{MultisigAlias, OutputOwners, MAX_ALIAS_DEPTH};
use camino_core::roles::{AddressRole, AddressRoles};
use camino_core::utxo::{Utxo, UtxoId};
use camino_storage_impl::{Chain, ChainReader};
use camino_transaction::{BaseTx, Cheque, SignedTx, TxStatus, UnsignedTx, MAX_MEMO_SIZE};
use log::debug;
use serde::{Deserialize, Serialize};

/// Network parameters every executor of a chain must agree on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub network_id: u32,
    /// The fee and staking asset
    pub asset_id: Id,
    /// Burned by every tx except unlocks
    pub tx_fee: u64,
    /// Burned by alias registration instead of `tx_fee`
    pub multisig_alias_fee: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            network_id: 1,
            asset_id: Id::EMPTY,
            tx_fee: 1_000_000,
            multisig_alias_fee: 1_000_000,
        }
    }
}

/// State change applied after a tx's value flow has verified
enum Effect<'t> {
    None,
    Cheque(&'t Cheque, u64),
    Roles(ShortId, AddressRoles),
    Alias(MultisigAlias),
}

pub struct Executor<'a> {
    config: &'a ExecutionConfig,
    fx: &'a dyn Fx,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a ExecutionConfig, fx: &'a dyn Fx) -> Self {
        Self { config, fx }
    }

    /// Value `tx` must burn
    pub fn fee(&self, tx: &UnsignedTx) -> u64 {
        match tx {
            UnsignedTx::Unlock(_) => 0,
            UnsignedTx::RegisterMultisigAlias(_) => self.config.multisig_alias_fee,
            _ => self.config.tx_fee,
        }
    }

    /// Verify `tx` against `chain` and apply it: consume its inputs, add
    /// its outputs with self references resolved to the tx ID, apply the
    /// tx-specific state rule and record the tx as committed.
    ///
    /// Nothing is written to `chain` when verification fails.
    pub fn execute<C: Chain>(&self, chain: &mut C, tx: &SignedTx) -> Result<(), TxError> {
        let unsigned = &tx.unsigned;
        let base = unsigned.base();
        self.syntactic_verify(tx)?;

        let hash = unsigned.hash()?;
        let in_creds = &tx.creds[..base.ins.len()];
        let fee = self.fee(unsigned);
        let asset_id = self.config.asset_id;
        let verifier = TransitionVerifier::new(self.fx);
        let view: &dyn ChainReader = &*chain;

        let effect = match unsigned {
            UnsignedTx::Transfer(base) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::UNLOCKED)?;
                Effect::None
            }
            UnsignedTx::Bond(bond) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::BONDED)?;
                check_locked_amount(base, LockState::BONDED, bond.amount)?;
                Effect::None
            }
            UnsignedTx::Deposit(deposit) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::DEPOSITED)?;
                check_locked_amount(base, LockState::DEPOSITED, deposit.amount)?;
                Effect::None
            }
            UnsignedTx::Unlock(unlock) => {
                verifier.verify_unlock(view, &hash, &base.ins, &base.outs, in_creds, fee, asset_id, unlock.amount)?;
                Effect::None
            }
            UnsignedTx::CashOut(cash_out) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::UNLOCKED)?;
                let paid = paid_to(view, base, &cash_out.cheque.beneficiary)?;
                let delta = verify_cheque(view, self.fx, &cash_out.cheque, paid)?;
                let total = paid_out_after(view, &cash_out.cheque, delta)?;
                Effect::Cheque(&cash_out.cheque, total)
            }
            UnsignedTx::AddressState(change) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::UNLOCKED)?;
                let role = AddressRole::from_bit(change.role_bit)?;
                let cred = &tx.creds[base.ins.len()];
                self.fx.verify_credential(cred)?;
                let signers = self.fx.recover_signers(&hash, cred)?;
                let now = view.timestamp()?;
                if !is_authorized(view, &change.executor, &signers, now, 0)? {
                    return Err(VerifyError::Unauthorized(format!(
                        "executor {} did not sign",
                        change.executor
                    ))
                    .into());
                }
                if !view.address_roles(&change.executor)?.may_manage(role) {
                    return Err(TxError::MissingRole {
                        address: change.executor,
                        bit: change.role_bit,
                    });
                }
                let current = view.address_roles(&change.address)?;
                let updated = if change.remove {
                    current.without(role)
                } else {
                    current.with(role)
                };
                Effect::Roles(change.address, updated)
            }
            UnsignedTx::RegisterMultisigAlias(register) => {
                verifier.verify_lock(view, &hash, &base.ins, &base.outs, in_creds, 0, fee, asset_id, LockState::UNLOCKED)?;
                let alias = register.alias(tx.id());
                check_alias(view, &alias)?;
                Effect::Alias(alias)
            }
        };

        let tx_id = tx.id();
        for input in &base.ins {
            chain.delete_utxo(&input.input_id())?;
        }
        for (index, output) in base.outs.iter().enumerate() {
            chain.add_utxo(Utxo {
                utxo_id: UtxoId::new(tx_id, index as u32),
                asset_id: output.asset_id,
                out: output.out.finalize(tx_id),
            })?;
        }
        match effect {
            Effect::None => {}
            Effect::Cheque(cheque, paid) => apply_cheque(chain, cheque, paid),
            Effect::Roles(address, roles) => chain.set_address_roles(address, roles),
            Effect::Alias(alias) => chain.set_multisig_alias(alias),
        }
        chain.add_tx(tx.clone(), TxStatus::Committed);

        debug!("executed {} tx {}", unsigned.name(), tx_id);
        Ok(())
    }

    fn syntactic_verify(&self, tx: &SignedTx) -> Result<(), TxError> {
        let unsigned = &tx.unsigned;
        let base = unsigned.base();
        if base.network_id != self.config.network_id {
            return Err(TxError::Syntactic(format!(
                "network id {} differs from {}",
                base.network_id, self.config.network_id
            )));
        }
        base.syntactic_verify()?;
        let expected = base.ins.len() + unsigned.extra_credentials();
        if tx.creds.len() != expected {
            return Err(VerifyError::CredentialCountMismatch {
                inputs: expected,
                credentials: tx.creds.len(),
            }
            .into());
        }
        match unsigned {
            UnsignedTx::Bond(bond) if bond.amount == 0 => {
                Err(TxError::Syntactic("zero bond amount".to_string()))
            }
            UnsignedTx::Deposit(deposit) if deposit.amount == 0 || deposit.duration == 0 => Err(
                TxError::Syntactic("deposit needs a non-zero amount and duration".to_string()),
            ),
            UnsignedTx::Unlock(unlock) if unlock.amount == 0 => {
                Err(TxError::Syntactic("zero unlock amount".to_string()))
            }
            UnsignedTx::RegisterMultisigAlias(register) if register.memo.len() > MAX_MEMO_SIZE => {
                Err(TxError::InvalidAlias(format!(
                    "memo of {} bytes exceeds {}",
                    register.memo.len(),
                    MAX_MEMO_SIZE
                )))
            }
            _ => Ok(()),
        }
    }
}

fn check_locked_amount(base: &BaseTx, state: LockState, expected: u64) -> Result<(), TxError> {
    let mut actual = 0u64;
    for output in &base.outs {
        if output.out.is_newly_locked_with(state) {
            actual = actual
                .checked_add(output.out.amount()?)
                .ok_or(VerifyError::Overflow("summing locked outputs"))?;
        }
    }
    if actual != expected {
        return Err(TxError::LockAmountMismatch { expected, actual });
    }
    Ok(())
}

/// Net unlocked value `base` moves to the single-key owner `beneficiary`
fn paid_to(chain: &dyn ChainReader, base: &BaseTx, beneficiary: &ShortId) -> Result<u64, TxError> {
    let owners = OutputOwners::single(*beneficiary);
    let mut received = 0u64;
    for output in &base.outs {
        if output.out.lock_ids().is_none() && output.out.owners()? == &owners {
            received = received
                .checked_add(output.out.amount()?)
                .ok_or(VerifyError::Overflow("summing payout"))?;
        }
    }
    let mut spent = 0u64;
    for input in &base.ins {
        let utxo_id = input.input_id();
        let utxo = chain
            .get_utxo(&utxo_id)?
            .ok_or(VerifyError::MissingUtxo(utxo_id))?;
        if utxo.out.lock_ids().is_none() && utxo.out.owners()? == &owners {
            spent = spent
                .checked_add(utxo.out.amount()?)
                .ok_or(VerifyError::Overflow("summing payout"))?;
        }
    }
    Ok(received.saturating_sub(spent))
}

/// Reject a new alias that already exists, needs no signatures, or whose
/// owners lead into a cycle or nest deeper than [`MAX_ALIAS_DEPTH`]
fn check_alias<R: ChainReader + ?Sized>(chain: &R, alias: &MultisigAlias) -> Result<(), TxError> {
    alias.owners.verify()?;
    if alias.owners.threshold == 0 {
        return Err(TxError::InvalidAlias("zero threshold".to_string()));
    }
    if chain.multisig_alias(&alias.id)?.is_some() {
        return Err(TxError::InvalidAlias(format!("{} already registered", alias.id)));
    }
    let depth = alias_depth(chain, &alias.owners, &mut vec![alias.id])?;
    if depth > MAX_ALIAS_DEPTH {
        return Err(TxError::InvalidAlias(format!(
            "nesting depth {} exceeds {}",
            depth, MAX_ALIAS_DEPTH
        )));
    }
    Ok(())
}

// Levels of alias expansion below and including the owner set's holder
fn alias_depth<R: ChainReader + ?Sized>(
    chain: &R,
    owners: &OutputOwners,
    path: &mut Vec<ShortId>,
) -> Result<usize, TxError> {
    let mut deepest = 0;
    for address in &owners.addrs {
        if path.contains(address) {
            return Err(TxError::InvalidAlias(format!("cycle through {}", address)));
        }
        if let Some(nested) = chain.multisig_alias(address)? {
            if path.len() > MAX_ALIAS_DEPTH {
                return Err(TxError::InvalidAlias(format!(
                    "nesting deeper than {}",
                    MAX_ALIAS_DEPTH
                )));
            }
            path.push(*address);
            deepest = deepest.max(alias_depth(chain, &nested.owners, path)?);
            path.pop();
        }
    }
    Ok(deepest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chequebook::test_cheques::signed;
    use crate::fx::Secp256k1Fx;
    use crate::keychain::test_keys::*;
    use crate::keychain::Keychain;
    use crate::lock_planner::test_utils::*;
    use crate::lock_planner::{lock, LockRequest, SpendPlan};
    use crate::unlock_planner::unlock;
    use camino_core::error::{ChequeError, ErrorKind};
    use camino_core::lock::LockIds;
    use camino_storage_impl::{MemoryStore, State};
    use camino_transaction::{AddressStateTx, BondTx, CashOutTx, RegisterMultisigAliasTx, UnlockTx};

    const FEE: u64 = 1;

    fn config() -> ExecutionConfig {
        ExecutionConfig {
            network_id: 5,
            asset_id: ASSET,
            tx_fee: FEE,
            multisig_alias_fee: FEE,
        }
    }

    fn base(plan: &SpendPlan) -> BaseTx {
        BaseTx {
            network_id: 5,
            ins: plan.ins.clone(),
            outs: plan.outs.clone(),
            ..Default::default()
        }
    }

    fn funded(keys: &[u8], amount: u64) -> (State<MemoryStore>, Keychain) {
        let mut state = State::open(MemoryStore::new()).unwrap();
        for (seed, key) in keys.iter().enumerate() {
            put_utxo(&mut state, seed as u8, amount, OutputOwners::single(address(*key)), LockIds::UNLOCKED);
        }
        (state, keychain(keys))
    }

    fn bond(state: &State<MemoryStore>, keys: &Keychain, amount: u64) -> SignedTx {
        let plan = lock(state, keys, &LockRequest::new(ASSET, amount, FEE, LockState::BONDED)).unwrap();
        let tx = UnsignedTx::Bond(BondTx {
            base: base(&plan),
            node_id: ShortId::new([0x0d; 20]),
            amount,
            reward_owner: OutputOwners::single(address(1)),
        });
        keys.sign_tx(tx, &plan.signers).unwrap()
    }

    #[test]
    fn test_bond_resolves_self_reference() {
        let (mut state, keys) = funded(&[1], 200);
        let fx = Secp256k1Fx::new();
        let config = config();
        let tx = bond(&state, &keys, 100);

        Executor::new(&config, &fx).execute(&mut state, &tx).unwrap();

        let bonded = state.get_utxo(&UtxoId::new(tx.id(), 0).input_id()).unwrap().unwrap();
        assert_eq!(bonded.out.lock_ids(), Some(&LockIds::bonded(tx.id())));
        assert_eq!(bonded.out.amount().unwrap(), 100);
        let change = state.get_utxo(&UtxoId::new(tx.id(), 1).input_id()).unwrap().unwrap();
        assert_eq!(change.out.lock_ids(), None);
        assert_eq!(change.out.amount().unwrap(), 99);
        assert!(state.get_utxo(&tx.unsigned.base().ins[0].input_id()).unwrap().is_none());
        assert_eq!(state.get_tx(&tx.id()).unwrap().unwrap().1, TxStatus::Committed);

        // replaying the tx finds its inputs gone
        let err = Executor::new(&config, &fx).execute(&mut state, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_bond_amount_must_match_outputs() {
        let (mut state, keys) = funded(&[1], 200);
        let fx = Secp256k1Fx::new();
        let config = config();
        let plan = lock(&state, &keys, &LockRequest::new(ASSET, 100, FEE, LockState::BONDED)).unwrap();
        let tx = UnsignedTx::Bond(BondTx {
            base: base(&plan),
            node_id: ShortId::new([0x0d; 20]),
            amount: 90,
            reward_owner: OutputOwners::single(address(1)),
        });
        let tx = keys.sign_tx(tx, &plan.signers).unwrap();
        assert!(matches!(
            Executor::new(&config, &fx).execute(&mut state, &tx),
            Err(TxError::LockAmountMismatch { expected: 90, actual: 100 })
        ));
    }

    #[test]
    fn test_unlock_after_bond() {
        let (mut state, keys) = funded(&[1], 200);
        let fx = Secp256k1Fx::new();
        let config = config();
        let bond_tx = bond(&state, &keys, 100);
        let executor = Executor::new(&config, &fx);
        executor.execute(&mut state, &bond_tx).unwrap();

        let plan = unlock(&state, &keys, ASSET, &address(1), 30, 0).unwrap();
        let tx = UnsignedTx::Unlock(UnlockTx { base: base(&plan), amount: 30 });
        let tx = keys.sign_tx(tx, &plan.signers).unwrap();
        executor.execute(&mut state, &tx).unwrap();

        let kept = state.get_utxo(&UtxoId::new(tx.id(), 0).input_id()).unwrap().unwrap();
        assert_eq!(kept.out.lock_ids(), Some(&LockIds::bonded(bond_tx.id())));
        assert_eq!(kept.out.amount().unwrap(), 70);
        let freed = state.get_utxo(&UtxoId::new(tx.id(), 1).input_id()).unwrap().unwrap();
        assert_eq!(freed.out.lock_ids(), None);
        assert_eq!(freed.out.amount().unwrap(), 30);
    }

    #[test]
    fn test_wrong_network_rejected() {
        let (mut state, keys) = funded(&[1], 200);
        let fx = Secp256k1Fx::new();
        let mut config = config();
        let tx = bond(&state, &keys, 100);
        config.network_id = 6;
        assert!(matches!(
            Executor::new(&config, &fx).execute(&mut state, &tx),
            Err(TxError::Syntactic(_))
        ));
    }

    #[test]
    fn test_cash_out() {
        let (mut state, keys) = funded(&[1], 1_000);
        let fx = Secp256k1Fx::new();
        let config = config();
        let executor = Executor::new(&config, &fx);
        let beneficiary = address(2);

        let cash_out = |state: &State<MemoryStore>, amount: u64, pay: u64, serial: u64| {
            let mut req = LockRequest::new(ASSET, pay, FEE, LockState::UNLOCKED);
            req.to = Some(OutputOwners::single(beneficiary));
            let plan = lock(state, &keys, &req).unwrap();
            let tx = UnsignedTx::CashOut(CashOutTx {
                base: base(&plan),
                cheque: signed(1, beneficiary, amount, serial),
            });
            keys.sign_tx(tx, &plan.signers).unwrap()
        };

        let tx = cash_out(&state, 500, 500, 7);
        executor.execute(&mut state, &tx).unwrap();
        assert_eq!(state.paid_out(&address(1), &beneficiary).unwrap(), 500);

        let tx = cash_out(&state, 600, 100, 6);
        let err = executor.execute(&mut state, &tx).unwrap_err();
        assert!(err.to_string().contains("stale serial"));

        let tx = cash_out(&state, 700, 150, 8);
        let err = executor.execute(&mut state, &tx).unwrap_err();
        assert!(matches!(err, TxError::Cheque(_)));
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

        let tx = cash_out(&state, 700, 200, 8);
        executor.execute(&mut state, &tx).unwrap();
        assert_eq!(state.paid_out(&address(1), &beneficiary).unwrap(), 700);
    }

    #[test]
    fn test_cash_out_overflow_writes_nothing() {
        let (mut state, keys) = funded(&[1], 1_000);
        let fx = Secp256k1Fx::new();
        let config = config();
        let beneficiary = address(2);
        state.set_paid_out(address(1), beneficiary, u64::MAX - 10);
        state.commit().unwrap();

        let mut req = LockRequest::new(ASSET, 500, FEE, LockState::UNLOCKED);
        req.to = Some(OutputOwners::single(beneficiary));
        let plan = lock(&state, &keys, &req).unwrap();
        let tx = UnsignedTx::CashOut(CashOutTx {
            base: base(&plan),
            cheque: signed(1, beneficiary, 500, 1),
        });
        let tx = keys.sign_tx(tx, &plan.signers).unwrap();

        let err = Executor::new(&config, &fx).execute(&mut state, &tx).unwrap_err();
        assert!(matches!(err, TxError::Cheque(ChequeError::LedgerOverflow)));
        assert!(!state.has_pending_writes());
        assert!(state.get_utxo(&plan.ins[0].input_id()).unwrap().is_some());
        assert_eq!(state.paid_out(&address(1), &beneficiary).unwrap(), u64::MAX - 10);
    }

    #[test]
    fn test_address_state_needs_managing_role() {
        let (mut state, keys) = funded(&[1], 100);
        let admin = keychain(&[1, 5]);
        let fx = Secp256k1Fx::new();
        let config = config();
        let executor = Executor::new(&config, &fx);
        let target = address(9);

        let change = |state: &State<MemoryStore>, executor_key: u8, bit: u8| {
            let plan = lock(state, &keys, &LockRequest::new(ASSET, 0, FEE, LockState::UNLOCKED)).unwrap();
            let tx = UnsignedTx::AddressState(AddressStateTx {
                base: base(&plan),
                address: target,
                role_bit: bit,
                remove: false,
                executor: address(executor_key),
            });
            let mut signers = plan.signers.clone();
            signers.push(vec![address(executor_key)]);
            admin.sign_tx(tx, &signers).unwrap()
        };

        let verified = AddressRole::KycVerified.bit();
        let tx = change(&state, 5, verified);
        let err = executor.execute(&mut state, &tx).unwrap_err();
        assert!(matches!(err, TxError::MissingRole { .. }));

        state.set_address_roles(address(5), AddressRoles::NONE.with(AddressRole::Kyc));
        let tx = change(&state, 5, verified);
        executor.execute(&mut state, &tx).unwrap();
        assert!(state.address_roles(&target).unwrap().contains(AddressRole::KycVerified));

        // a kyc officer cannot grant admin
        let tx = change(&state, 5, AddressRole::Admin.bit());
        let err = executor.execute(&mut state, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_register_alias_depth_limit() {
        let (mut state, keys) = funded(&[1], 100);
        let fx = Secp256k1Fx::new();
        let config = config();
        let executor = Executor::new(&config, &fx);

        let mut previous = address(1);
        let mut chain = Vec::new();
        for n in 1..=4u8 {
            let id = ShortId::new([0xa0 + n; 20]);
            state.set_multisig_alias(MultisigAlias {
                id,
                memo: vec![],
                owners: OutputOwners::single(previous),
            });
            chain.push(id);
            previous = id;
        }

        let register = |state: &State<MemoryStore>, owner: ShortId| {
            let plan = lock(state, &keys, &LockRequest::new(ASSET, 0, FEE, LockState::UNLOCKED)).unwrap();
            let tx = UnsignedTx::RegisterMultisigAlias(RegisterMultisigAliasTx {
                base: base(&plan),
                memo: b"ops".to_vec(),
                owners: OutputOwners::single(owner),
            });
            keys.sign_tx(tx, &plan.signers).unwrap()
        };

        let tx = register(&state, chain[3]);
        let err = executor.execute(&mut state, &tx).unwrap_err();
        assert!(matches!(err, TxError::InvalidAlias(_)));

        let tx = register(&state, chain[2]);
        executor.execute(&mut state, &tx).unwrap();
        if let UnsignedTx::RegisterMultisigAlias(register) = &tx.unsigned {
            let alias = register.alias(tx.id());
            assert_eq!(state.multisig_alias(&alias.id).unwrap(), Some(alias));
        }
    }
}
