//! Compiled-in LSP schemas

use crate::corpus::SchemaSet;
use std::path::Path;
use std::sync::LazyLock;

const SOURCES: &[(&str, &str)] = &[
    (
        "LSP1UniversalReceiverDelegate.json",
        include_str!("../schemas/LSP1UniversalReceiverDelegate.json"),
    ),
    (
        "LSP3UniversalProfile.json",
        include_str!("../schemas/LSP3UniversalProfile.json"),
    ),
    (
        "LSP4DigitalAsset.json",
        include_str!("../schemas/LSP4DigitalAsset.json"),
    ),
    (
        "LSP5ReceivedAssets.json",
        include_str!("../schemas/LSP5ReceivedAssets.json"),
    ),
    (
        "LSP6KeyManager.json",
        include_str!("../schemas/LSP6KeyManager.json"),
    ),
    ("LSP9Vault.json", include_str!("../schemas/LSP9Vault.json")),
    (
        "LSP10ReceivedVaults.json",
        include_str!("../schemas/LSP10ReceivedVaults.json"),
    ),
    (
        "LSP12IssuedAssets.json",
        include_str!("../schemas/LSP12IssuedAssets.json"),
    ),
];

static BUILTIN: LazyLock<SchemaSet> = LazyLock::new(|| {
    let mut set = SchemaSet::new();
    for (name, src) in SOURCES {
        let parsed = SchemaSet::parse_source(Path::new(name), src)
            .unwrap_or_else(|e| panic!("compiled-in schema {name} is invalid: {e}"));
        set.extend(parsed);
    }
    set
});

pub(crate) fn schemas() -> &'static SchemaSet {
    &BUILTIN
}

/// Source text of a compiled-in schema file, by file name
pub fn source(file: &str) -> Option<&'static str> {
    SOURCES
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, src)| *src)
}

/// File names of the compiled-in schemas
pub fn files() -> impl Iterator<Item = &'static str> {
    SOURCES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schemas_load() {
        let set = schemas();
        assert!(set.len() > 20, "only {} builtin schemas", set.len());
        for name in [
            "LSP3Profile",
            "LSP3IssuedAssets[]",
            "LSP4TokenName",
            "AddressPermissions:Permissions:<address>",
            "SupportedStandards:LSP9Vault",
        ] {
            assert!(set.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn every_file_is_listed() {
        assert_eq!(files().count(), 8);
        assert!(source("LSP6KeyManager.json").unwrap().contains("AllowedCalls"));
    }
}
