use alloy_primitives::B256;
use erc725_permissions::{
    ALL_PERMISSIONS, Permission, PermissionError, Permissions, check_permissions,
    decode_permissions, encode_permissions, parse_mask,
};

const ALL_ONES: &str = "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

#[test]
fn test_all_permissions_normalizes() {
    let requested = Permissions::new().with(Permission::AllPermissions, true);
    let encoded = encode_permissions(&requested);
    assert_eq!(encoded, ALL_PERMISSIONS);
    assert_eq!(decode_permissions(&encoded), decode_permissions(&ALL_PERMISSIONS));

    let decoded = decode_permissions(&ALL_PERMISSIONS);
    assert!(decoded.get(Permission::AllPermissions));
    assert!(!decoded.get(Permission::Reentrancy));
    assert_eq!(encode_permissions(&decoded), ALL_PERMISSIONS);
}

#[test]
fn test_revocation_overrides_shorthand() {
    let requested = Permissions::new()
        .with(Permission::AllPermissions, true)
        .with(Permission::ChangeOwner, false);
    let decoded = decode_permissions(&encode_permissions(&requested));
    assert!(!decoded.get(Permission::ChangeOwner));
    assert!(decoded.get(Permission::AddController));
    assert!(!decoded.get(Permission::AllPermissions));
}

#[test]
fn test_extra_bits_are_dropped() {
    let decoded = decode_permissions(&parse_mask(ALL_ONES).unwrap());
    assert!(Permission::FLAGS.iter().all(|p| decoded.get(*p)));
    assert!(decoded.get(Permission::AllPermissions));

    let reencoded = encode_permissions(&decoded);
    let mut expected = [0u8; 32];
    expected[29..].copy_from_slice(&[0x7f, 0xff, 0xff]);
    assert_eq!(reencoded, B256::from(expected));
}

#[test]
fn test_json_request() {
    let requested: Permissions = serde_json::from_value(serde_json::json!({
        "SETDATA": true,
        "CALL": true,
        "SIGN": false
    }))
    .unwrap();
    let mask = encode_permissions(&requested);
    assert_eq!(mask[31], 0x00);
    assert_eq!(mask[30], 0x08);
    assert_eq!(mask[29], 0x04);

    let unknown = serde_json::from_value::<Permissions>(serde_json::json!({"FLY": true}));
    assert!(unknown.is_err());
}

#[test]
fn test_check_permissions() {
    let granted = encode_permissions(
        &Permissions::new()
            .with(Permission::SetData, true)
            .with(Permission::Call, true),
    )
    .to_string();
    assert!(check_permissions(["SETDATA"], &granted).unwrap());
    assert!(check_permissions(["SETDATA", "CALL"], &granted).unwrap());
    assert!(!check_permissions(["SETDATA", "DEPLOY"], &granted).unwrap());
    assert!(check_permissions([granted.as_str()], &granted).unwrap());
    assert!(!check_permissions(["ALL_PERMISSIONS"], &granted).unwrap());
    assert!(check_permissions(["ALL_PERMISSIONS"], ALL_ONES).unwrap());
}

#[test]
fn test_check_permissions_validates_every_token() {
    // a grant the first token passes does not hide a bad second token
    let err = check_permissions(["SETDATA", "NOT_A_PERMISSION"], ALL_ONES).unwrap_err();
    assert!(matches!(
        err,
        PermissionError::UnknownPermission(ref name) if name == "NOT_A_PERMISSION"
    ));
    assert!(matches!(
        check_permissions(["0x1234"], ALL_ONES),
        Err(PermissionError::InvalidMask { .. })
    ));
    assert!(check_permissions(["SETDATA"], "0xnothex").is_err());
}
