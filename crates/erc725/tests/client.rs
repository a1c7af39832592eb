//! End-to-end reads through the in-memory data source

use alloy_primitives::{Address, B256, Bytes, keccak256};
use erc725::common::{HashMethod, UrlValue, Value};
use erc725::permissions::{Permission, Permissions, decode_permissions, encode_permissions};
use erc725::schema::{EncodeInput, encode_array_key};
use erc725::{ContentFetcher, DataRequest, Erc725, Erc725Options, Error, MemoryDataSource};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

const ASSET_A: &str = "0xcafecafecafecafecafecafecafecafecafecafe";
const ASSET_B: &str = "0xbeefbeefbeefbeefbeefbeefbeefbeefbeefbeef";
const CONTROLLER: &str = "0x1111111111111111111111111111111111111111";
const PROFILE_URL: &str = "https://api.universalprofile.cloud/ipfs/QmProfile";

fn profile_json() -> &'static [u8] {
    include_bytes!("fixtures/profile.json")
}

#[derive(Debug, Clone, Default)]
struct StaticFetcher(Arc<HashMap<String, Bytes>>);

impl StaticFetcher {
    fn with(url: &str, body: &[u8]) -> Self {
        Self(Arc::new(HashMap::from([(
            url.to_owned(),
            Bytes::copy_from_slice(body),
        )])))
    }
}

impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> erc725::Result<Bytes> {
        self.0
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::fetch(url.as_str(), "404 Not Found"))
    }
}

fn profile_client(body: &[u8], hash: B256) -> Erc725<MemoryDataSource, StaticFetcher> {
    let source = MemoryDataSource::new();
    let client = Erc725::new(source.clone()).with_fetcher(StaticFetcher::with(PROFILE_URL, body));
    let url = UrlValue::verified("ipfs://QmProfile", HashMethod::Keccak256Utf8, hash);
    source.insert_entries(
        client
            .encode_data(&[EncodeInput::new("LSP3Profile", Value::Url(url)).build()])
            .unwrap(),
    );
    client
}

#[tokio::test]
async fn test_arrays_are_completed() {
    let source = MemoryDataSource::new();
    let client = Erc725::new(source.clone());
    let encoded = client
        .encode_data(&[
            EncodeInput::new("LSP5ReceivedAssets[]", Value::from(vec![ASSET_A, ASSET_B])).build(),
            EncodeInput::new("LSP4TokenName", "Token").build(),
        ])
        .unwrap();
    source.insert_entries(encoded);

    let data = client
        .get_data(&["LSP5ReceivedAssets[]".into(), "LSP4TokenName".into()])
        .await
        .unwrap();
    let assets: Vec<Address> = data[0]
        .value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.to_address().unwrap())
        .collect();
    assert_eq!(assets, vec![ASSET_A.parse::<Address>().unwrap(), ASSET_B.parse().unwrap()]);
    assert_eq!(data[1].value.as_str(), Some("Token"));

    // a hole in the array decodes as null, the rest is kept
    let base = data[0].key;
    source.remove(&encode_array_key(&base, 0));
    let data = client.get_data(&["LSP5ReceivedAssets[]".into()]).await.unwrap();
    let items = data[0].value.as_array().unwrap();
    assert!(items[0].is_null());
    assert_eq!(items[1].to_address(), Some(ASSET_B.parse().unwrap()));
}

#[tokio::test]
async fn test_unset_keys_decode_empty() {
    let client = Erc725::new(MemoryDataSource::new());
    let data = client
        .get_data(&["LSP4TokenSymbol".into(), "LSP12IssuedAssets[]".into()])
        .await
        .unwrap();
    assert!(data[0].value.is_null());
    assert_eq!(data[1].value, Value::Array(vec![]));

    let all = client.get_all_data().await.unwrap();
    assert!(!all.is_empty());
    assert!(all.iter().all(|e| !e.name.contains('<')));
}

#[tokio::test]
async fn test_dynamic_keys_and_permissions() {
    let source = MemoryDataSource::new();
    let client = Erc725::new(source.clone());
    let granted = encode_permissions(
        &Permissions::new()
            .with(Permission::SetData, true)
            .with(Permission::Call, true),
    );
    let request = DataRequest::new("AddressPermissions:Permissions:<address>")
        .dynamic_key_parts(vec![Value::from(CONTROLLER)])
        .build();
    source.insert_entries(
        client
            .encode_data(&[EncodeInput::new(request.key_name.clone(), Value::from(granted))
                .dynamic_key_parts(request.dynamic_key_parts.clone())
                .build()])
            .unwrap(),
    );

    let data = client.get_data(&[request]).await.unwrap();
    assert_eq!(
        data[0].name.to_lowercase(),
        format!("addresspermissions:permissions:{CONTROLLER}")
    );
    let mask = B256::from_slice(&data[0].value.to_bytes().unwrap());
    let permissions = decode_permissions(&mask);
    assert!(permissions.get(Permission::SetData));
    assert!(!permissions.get(Permission::ChangeOwner));
}

#[tokio::test]
async fn test_fetch_data_verifies_content() {
    let client = profile_client(profile_json(), keccak256(profile_json()));
    let data = client.fetch_data(&["LSP3Profile".into()]).await.unwrap();
    let expected: serde_json::Value = serde_json::from_slice(profile_json()).unwrap();
    assert_eq!(data[0].value, Value::Json(expected.clone()));

    // reformatted documents verify against the compact hash
    let compact = serde_json::to_vec(&expected).unwrap();
    let client = profile_client(profile_json(), keccak256(&compact));
    assert!(client.fetch_data(&["LSP3Profile".into()]).await.is_ok());
}

#[tokio::test]
async fn test_fetch_data_rejects_tampered_content() {
    let client =
        profile_client(br#"{"LSP3Profile":{"name":"mallory"}}"#, keccak256(profile_json()));
    let err = client.fetch_data(&["LSP3Profile".into()]).await.unwrap_err();
    assert!(
        matches!(err, Error::Verification { ref url, .. } if url == "ipfs://QmProfile"),
        "{err}"
    );

    let client = client.with_options(Erc725Options::builder().verify(false).build());
    let data = client.fetch_data(&["LSP3Profile".into()]).await.unwrap();
    assert!(data[0].value.to_string().contains("mallory"));
}

#[tokio::test]
async fn test_fetch_requires_a_fetcher() {
    let source = MemoryDataSource::new();
    let client = Erc725::new(source.clone());
    let url =
        UrlValue::verified("https://cdn.example/p.json", HashMethod::Keccak256Utf8, B256::ZERO);
    source.insert_entries(
        client
            .encode_data(&[EncodeInput::new("LSP3Profile", Value::Url(url)).build()])
            .unwrap(),
    );
    assert!(matches!(
        client.fetch_data(&["LSP3Profile".into()]).await,
        Err(Error::NoFetcher(_))
    ));
    // unset urls are not fetched
    let empty = Erc725::new(MemoryDataSource::new());
    assert!(empty.fetch_data(&["LSP3Profile".into()]).await.unwrap()[0].value.is_null());
}

#[tokio::test]
async fn test_supports_interface() {
    let source = MemoryDataSource::new();
    source.add_interface(erc725::interface_id("LSP0ERC725Account").unwrap());
    let client = Erc725::new(source);
    assert!(client.supports_interface("LSP0ERC725Account").await.unwrap());
    assert!(client.supports_interface("0x24871b3d").await.unwrap());
    assert!(!client.supports_interface("LSP9Vault").await.unwrap());
    assert!(matches!(
        client.supports_interface("LSP42").await,
        Err(Error::UnknownInterface(_))
    ));
}

#[test]
fn test_is_data_authentic() {
    let hash = keccak256(profile_json());
    assert!(Erc725::<MemoryDataSource>::is_data_authentic(
        profile_json(),
        HashMethod::Keccak256Utf8,
        &hash
    ));
    assert!(!Erc725::<MemoryDataSource>::is_data_authentic(
        b"other",
        HashMethod::Keccak256Utf8,
        &hash
    ));
}
