use crate::error::TxError;
use serde::{Deserialize, Serialize};

/// Named bits of the per-address role set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRole {
    Admin,
    Kyc,
    OffersAdmin,
    KycVerified,
    KycExpired,
    Consortium,
    NodeDeferred,
    OffersCreator,
    Proposer,
}

impl AddressRole {
    pub const ALL: [AddressRole; 9] = [
        AddressRole::Admin,
        AddressRole::Kyc,
        AddressRole::OffersAdmin,
        AddressRole::KycVerified,
        AddressRole::KycExpired,
        AddressRole::Consortium,
        AddressRole::NodeDeferred,
        AddressRole::OffersCreator,
        AddressRole::Proposer,
    ];

    pub fn bit(&self) -> u8 {
        match self {
            AddressRole::Admin => 0,
            AddressRole::Kyc => 1,
            AddressRole::OffersAdmin => 2,
            AddressRole::KycVerified => 32,
            AddressRole::KycExpired => 33,
            AddressRole::Consortium => 38,
            AddressRole::NodeDeferred => 39,
            AddressRole::OffersCreator => 50,
            AddressRole::Proposer => 51,
        }
    }

    pub fn from_bit(bit: u8) -> Result<Self, TxError> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.bit() == bit)
            .ok_or(TxError::InvalidRoleBit(bit))
    }

    /// Roles that may set or clear this role on another address
    pub fn managed_by(&self) -> &'static [AddressRole] {
        match self {
            AddressRole::KycVerified | AddressRole::KycExpired => {
                &[AddressRole::Admin, AddressRole::Kyc]
            }
            AddressRole::OffersCreator => &[AddressRole::Admin, AddressRole::OffersAdmin],
            _ => &[AddressRole::Admin],
        }
    }

    fn mask(&self) -> u64 {
        1u64 << self.bit()
    }
}

/// Role bitset of one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AddressRoles(u64);

impl AddressRoles {
    pub const NONE: AddressRoles = AddressRoles(0);

    pub fn from_bits(bits: u64) -> Self {
        AddressRoles(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn contains(&self, role: AddressRole) -> bool {
        self.0 & role.mask() != 0
    }

    /// Set a role; the two KYC states replace each other
    pub fn with(&self, role: AddressRole) -> Self {
        let mut bits = self.0 | role.mask();
        match role {
            AddressRole::KycVerified => bits &= !AddressRole::KycExpired.mask(),
            AddressRole::KycExpired => bits &= !AddressRole::KycVerified.mask(),
            _ => {}
        }
        AddressRoles(bits)
    }

    pub fn without(&self, role: AddressRole) -> Self {
        AddressRoles(self.0 & !role.mask())
    }

    /// Whether this holder may change `role` on some address
    pub fn may_manage(&self, role: AddressRole) -> bool {
        role.managed_by().iter().any(|r| self.contains(*r))
    }

    pub fn is_consistent(&self) -> bool {
        !(self.contains(AddressRole::KycVerified) && self.contains(AddressRole::KycExpired))
    }
}
