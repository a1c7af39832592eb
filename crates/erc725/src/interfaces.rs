//! ERC165 interface ids of the LSP standards

use crate::error::{Error, Result};
use alloy_primitives::FixedBytes;
use smol_str::SmolStr;

/// Registry names and their interface ids
pub const INTERFACE_IDS: &[(&str, [u8; 4])] = &[
    ("ERC1271", [0x16, 0x26, 0xba, 0x7e]),
    ("ERC725X", [0x75, 0x45, 0xac, 0xac]),
    ("ERC725Y", [0x62, 0x9a, 0xa6, 0x94]),
    ("LSP0ERC725Account", [0x24, 0x87, 0x1b, 0x3d]),
    ("LSP1UniversalReceiver", [0x6b, 0xb5, 0x6a, 0x14]),
    ("LSP6KeyManager", [0x23, 0xf3, 0x4c, 0x62]),
    ("LSP7DigitalAsset", [0xc5, 0x2d, 0x60, 0x08]),
    ("LSP8IdentifiableDigitalAsset", [0x3a, 0x27, 0x17, 0x06]),
    ("LSP9Vault", [0x28, 0xaf, 0x17, 0xe6]),
];

/// Interface id for a registry name or a `0x` 4-byte id
pub fn interface_id(name_or_id: &str) -> Result<FixedBytes<4>> {
    if name_or_id.starts_with("0x") {
        return name_or_id
            .parse()
            .map_err(|_| Error::UnknownInterface(SmolStr::new(name_or_id)));
    }
    INTERFACE_IDS
        .iter()
        .find(|(name, _)| *name == name_or_id)
        .map(|(_, id)| FixedBytes::new(*id))
        .ok_or_else(|| Error::UnknownInterface(SmolStr::new(name_or_id)))
}
