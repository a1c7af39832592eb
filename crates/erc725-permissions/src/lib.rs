//! LSP6 permissions
//!
//! A controller's permissions are stored as a 32-byte big-endian bitmask with one
//! bit per permission. `ALL_PERMISSIONS` is a shorthand for every bit except
//! `REENTRANCY`, `SUPER_DELEGATECALL` and `DELEGATECALL`, which must always be
//! granted by name.
//!
//! ```
//! use erc725_permissions::{Permission, Permissions, decode_permissions, encode_permissions};
//!
//! // grant everything except CHANGEOWNER
//! let requested = Permissions::new()
//!     .with(Permission::AllPermissions, true)
//!     .with(Permission::ChangeOwner, false);
//! let mask = encode_permissions(&requested);
//! assert!(!decode_permissions(&mask).get(Permission::ChangeOwner));
//! ```

pub mod error;

pub use error::{PermissionError, Result};

use alloy_primitives::{B256, U256, hex};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One LSP6 permission, or the `ALL_PERMISSIONS` shorthand
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub enum Permission {
    ChangeOwner,
    AddController,
    EditPermissions,
    AddExtensions,
    ChangeExtensions,
    AddUniversalReceiverDelegate,
    ChangeUniversalReceiverDelegate,
    Reentrancy,
    SuperTransferValue,
    TransferValue,
    SuperCall,
    Call,
    SuperStaticCall,
    StaticCall,
    SuperDelegateCall,
    DelegateCall,
    Deploy,
    SuperSetData,
    SetData,
    Encrypt,
    Decrypt,
    Sign,
    ExecuteRelayCall,
    /// Every bit of [`ALL_PERMISSIONS`]
    AllPermissions,
}

/// Mask granted by `ALL_PERMISSIONS`
pub const ALL_PERMISSIONS: B256 = B256::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x7f,
    0x3f, 0x7f,
]);

impl Permission {
    /// The 23 single-bit permissions, in bit order
    pub const FLAGS: [Permission; 23] = [
        Self::ChangeOwner,
        Self::AddController,
        Self::EditPermissions,
        Self::AddExtensions,
        Self::ChangeExtensions,
        Self::AddUniversalReceiverDelegate,
        Self::ChangeUniversalReceiverDelegate,
        Self::Reentrancy,
        Self::SuperTransferValue,
        Self::TransferValue,
        Self::SuperCall,
        Self::Call,
        Self::SuperStaticCall,
        Self::StaticCall,
        Self::SuperDelegateCall,
        Self::DelegateCall,
        Self::Deploy,
        Self::SuperSetData,
        Self::SetData,
        Self::Encrypt,
        Self::Decrypt,
        Self::Sign,
        Self::ExecuteRelayCall,
    ];

    /// Bit position, `None` for the shorthand
    pub fn bit(&self) -> Option<usize> {
        Self::FLAGS.iter().position(|flag| flag == self)
    }

    /// The permission's mask
    pub fn mask(&self) -> U256 {
        match self.bit() {
            Some(bit) => U256::from(1u8) << bit,
            None => U256::from_be_bytes(ALL_PERMISSIONS.0),
        }
    }

    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeOwner => "CHANGEOWNER",
            Self::AddController => "ADDCONTROLLER",
            Self::EditPermissions => "EDITPERMISSIONS",
            Self::AddExtensions => "ADDEXTENSIONS",
            Self::ChangeExtensions => "CHANGEEXTENSIONS",
            Self::AddUniversalReceiverDelegate => "ADDUNIVERSALRECEIVERDELEGATE",
            Self::ChangeUniversalReceiverDelegate => "CHANGEUNIVERSALRECEIVERDELEGATE",
            Self::Reentrancy => "REENTRANCY",
            Self::SuperTransferValue => "SUPER_TRANSFERVALUE",
            Self::TransferValue => "TRANSFERVALUE",
            Self::SuperCall => "SUPER_CALL",
            Self::Call => "CALL",
            Self::SuperStaticCall => "SUPER_STATICCALL",
            Self::StaticCall => "STATICCALL",
            Self::SuperDelegateCall => "SUPER_DELEGATECALL",
            Self::DelegateCall => "DELEGATECALL",
            Self::Deploy => "DEPLOY",
            Self::SuperSetData => "SUPER_SETDATA",
            Self::SetData => "SETDATA",
            Self::Encrypt => "ENCRYPT",
            Self::Decrypt => "DECRYPT",
            Self::Sign => "SIGN",
            Self::ExecuteRelayCall => "EXECUTE_RELAY_CALL",
            Self::AllPermissions => "ALL_PERMISSIONS",
        }
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::FLAGS
            .iter()
            .chain(std::iter::once(&Self::AllPermissions))
            .find(|p| p.name() == s)
            .copied()
            .ok_or_else(|| PermissionError::UnknownPermission(SmolStr::new(s)))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of permission flags. Flags absent from the set are left untouched when
/// encoding, which is what lets `ALL_PERMISSIONS` be combined with revocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<Permission, bool>);

impl Permissions {
    /// An empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one flag, builder style
    pub fn with(mut self, permission: Permission, granted: bool) -> Self {
        self.0.insert(permission, granted);
        self
    }

    /// Set one flag
    pub fn set(&mut self, permission: Permission, granted: bool) {
        self.0.insert(permission, granted);
    }

    /// Whether a flag is explicitly set to true
    pub fn get(&self, permission: Permission) -> bool {
        self.0.get(&permission).copied().unwrap_or(false)
    }

    /// Iterate over explicitly set flags
    pub fn iter(&self) -> impl Iterator<Item = (Permission, bool)> + '_ {
        self.0.iter().map(|(p, granted)| (*p, *granted))
    }
}

impl FromIterator<(Permission, bool)> for Permissions {
    fn from_iter<T: IntoIterator<Item = (Permission, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Encode a permission request.
///
/// The base is [`ALL_PERMISSIONS`] when requested, zero otherwise. Each other flag
/// set to true is added, each set to false removed.
pub fn encode_permissions(permissions: &Permissions) -> B256 {
    let mut mask = if permissions.get(Permission::AllPermissions) {
        Permission::AllPermissions.mask()
    } else {
        U256::ZERO
    };
    for (permission, granted) in permissions.iter() {
        if permission == Permission::AllPermissions {
            continue;
        }
        if granted {
            mask |= permission.mask();
        } else {
            mask &= !permission.mask();
        }
    }
    B256::from(mask.to_be_bytes::<32>())
}

/// Decode a mask into every flag, plus `ALL_PERMISSIONS` when the mask contains
/// the whole shorthand. Bits outside the registry are ignored.
pub fn decode_permissions(mask: &B256) -> Permissions {
    let mask = U256::from_be_bytes(mask.0);
    let all = Permission::AllPermissions.mask();
    Permission::FLAGS
        .iter()
        .map(|p| (*p, mask & p.mask() != U256::ZERO))
        .chain(std::iter::once((Permission::AllPermissions, mask & all == all)))
        .collect()
}

/// Parse a 32-byte mask, with or without `0x`
pub fn parse_mask(input: &str) -> Result<B256> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    let bytes =
        hex::decode(digits).map_err(|e| PermissionError::invalid_mask(input, e.to_string()))?;
    if bytes.len() != 32 {
        return Err(PermissionError::invalid_mask(
            input,
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    Ok(B256::from_slice(&bytes))
}

/// A required permission given by name or as a mask
fn parse_token(token: &str) -> Result<U256> {
    if token.starts_with("0x") {
        parse_mask(token).map(|mask| U256::from_be_bytes(mask.0))
    } else {
        token.parse::<Permission>().map(|p| p.mask())
    }
}

/// Whether `granted` contains every permission in `required`.
///
/// Each token is a permission name or a 32-byte hex mask. All tokens are
/// validated before anything is tested.
pub fn check_permissions<'a>(
    required: impl IntoIterator<Item = &'a str>,
    granted: &str,
) -> Result<bool> {
    let required = required
        .into_iter()
        .map(parse_token)
        .collect::<Result<Vec<_>>>()?;
    let granted = U256::from_be_bytes(parse_mask(granted)?.0);
    Ok(required.iter().all(|mask| granted & *mask == *mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_positions() {
        assert_eq!(Permission::ChangeOwner.bit(), Some(0));
        assert_eq!(Permission::Reentrancy.bit(), Some(7));
        assert_eq!(Permission::SetData.bit(), Some(18));
        assert_eq!(Permission::ExecuteRelayCall.bit(), Some(22));
        assert_eq!(Permission::AllPermissions.bit(), None);
    }

    #[test]
    fn shorthand_excludes_dangerous_bits() {
        let all = Permission::AllPermissions.mask();
        for excluded in [
            Permission::Reentrancy,
            Permission::SuperDelegateCall,
            Permission::DelegateCall,
        ] {
            assert_eq!(all & excluded.mask(), U256::ZERO, "{excluded}");
        }
        let with_reentrancy = encode_permissions(
            &Permissions::new()
                .with(Permission::AllPermissions, true)
                .with(Permission::Reentrancy, true),
        );
        assert_eq!(with_reentrancy[31], 0xff);
        assert_eq!(with_reentrancy[30], 0x3f);
        assert_eq!(with_reentrancy[29], 0x7f);
        assert!(decode_permissions(&with_reentrancy).get(Permission::Reentrancy));
        assert_eq!(encode_permissions(&Permissions::new()), B256::ZERO);
    }

    #[test]
    fn names_round_trip() {
        for p in Permission::FLAGS {
            assert_eq!(p.name().parse::<Permission>().unwrap(), p);
        }
        assert!("changeowner".parse::<Permission>().is_err());
    }

    #[test]
    fn serializes_as_name_map() {
        let json =
            serde_json::to_value(Permissions::new().with(Permission::SuperSetData, true)).unwrap();
        assert_eq!(json, serde_json::json!({"SUPER_SETDATA": true}));
    }
}
