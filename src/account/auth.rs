//! Authentication of callers against an account

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use super::types::{Account, Address, Identity};
use crate::crypto::SignatureVerifier;
use crate::encoding::CanonicalSerialize;
use crate::error::WalletError;

const OPERATION_TAG: &str = "creso-wallet/op/v1";

/// Who is invoking an operation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    /// Already authenticated by the surrounding session.
    Session(Identity),
    /// Abstracted-account call: the signature must cover [`signing_payload`].
    Signed { signer: Identity, signature: Vec<u8> },
}

impl Caller {
    pub fn claimed(&self) -> Identity {
        match self {
            Caller::Session(id) => *id,
            Caller::Signed { signer, .. } => *signer,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Caller::Signed { .. })
    }
}

/// Every state-changing account operation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Execute {
        target: Address,
        value: u64,
        data: Vec<u8>,
    },
    AddGuardian(Identity),
    RemoveGuardian(Identity),
    StartRecovery { proposed_owner: Identity },
    ConfirmRecovery,
    CancelRecovery,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Execute { .. } => "execute",
            Operation::AddGuardian(_) => "add_guardian",
            Operation::RemoveGuardian(_) => "remove_guardian",
            Operation::StartRecovery { .. } => "start_recovery",
            Operation::ConfirmRecovery => "confirm_recovery",
            Operation::CancelRecovery => "cancel_recovery",
        }
    }

    fn code(&self) -> u8 {
        match self {
            Operation::Execute { .. } => 0,
            Operation::AddGuardian(_) => 1,
            Operation::RemoveGuardian(_) => 2,
            Operation::StartRecovery { .. } => 3,
            Operation::ConfirmRecovery => 4,
            Operation::CancelRecovery => 5,
        }
    }
}

impl CanonicalSerialize for Operation {
    fn canonical_serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.code().canonical_serialize(writer)?;
        match self {
            Operation::Execute {
                target,
                value,
                data,
            } => {
                target.canonical_serialize(writer)?;
                value.canonical_serialize(writer)?;
                data.canonical_serialize(writer)
            }
            Operation::AddGuardian(id) | Operation::RemoveGuardian(id) => {
                id.canonical_serialize(writer)
            }
            Operation::StartRecovery { proposed_owner } => proposed_owner.canonical_serialize(writer),
            Operation::ConfirmRecovery | Operation::CancelRecovery => Ok(()),
        }
    }
}

/// Bytes a signer must sign to authorize `operation` on `account` at `nonce`.
pub fn signing_payload(account: &Address, nonce: u64, operation: &Operation) -> Vec<u8> {
    let mut buf = Vec::new();
    // Vec writes are infallible
    let _ = OPERATION_TAG.canonical_serialize(&mut buf);
    let _ = account.canonical_serialize(&mut buf);
    let _ = nonce.canonical_serialize(&mut buf);
    let _ = operation.canonical_serialize(&mut buf);
    buf
}

/// Resolve the caller to a principal. Signed callers must cover the account's current nonce.
pub fn authenticate(
    account: &Account,
    caller: &Caller,
    operation: &Operation,
    verifier: &dyn SignatureVerifier,
) -> Result<Identity, WalletError> {
    match caller {
        Caller::Session(id) => Ok(*id),
        Caller::Signed { signer, signature } => {
            let payload = signing_payload(&account.address, account.nonce, operation);
            if verifier.verify(signer, &payload, signature) {
                Ok(*signer)
            } else {
                Err(WalletError::Unauthorized)
            }
        }
    }
}
