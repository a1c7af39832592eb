//! The `Erc725` client: schema-driven reads over a [`DataSource`]

use crate::error::{Error, Result};
use crate::fetch::{ContentFetcher, NoFetcher, resolve_url};
use crate::interfaces::interface_id;
use crate::options::Erc725Options;
use crate::source::DataSource;
use alloy_primitives::{B256, Bytes};
use erc725_common::{ContentTag, HashMethod, KeyType, UrlValue, Value, ValueContent};
use erc725_schema::decode::{array_element_keys, decode_count};
use erc725_schema::{
    DecodeInput, DecodeValue, DecodedEntry, EncodeInput, EncodedEntry, SchemaEntry, SchemaError,
    SchemaSet, decode_entry,
};
use smol_str::SmolStr;

/// A key to read, addressed like [`EncodeInput`]
#[derive(Debug, Clone, PartialEq, bon::Builder)]
#[builder(start_fn = new)]
pub struct DataRequest {
    /// Schema name, `0x` key, or dynamic template
    #[builder(start_fn, into)]
    pub key_name: SmolStr,
    #[builder(default)]
    pub dynamic_key_parts: Vec<Value>,
}

impl From<&str> for DataRequest {
    fn from(key_name: &str) -> Self {
        Self::new(key_name).build()
    }
}

/// Reads and decodes the ERC725Y data of one contract.
///
/// ```
/// use erc725::{Erc725, MemoryDataSource};
/// use erc725::schema::EncodeInput;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> erc725::Result<()> {
/// let source = MemoryDataSource::new();
/// let client = Erc725::new(source.clone());
/// source.insert_entries(client.encode_data(&[EncodeInput::new("LSP4TokenSymbol", "TKN").build()])?);
///
/// let data = client.get_data(&["LSP4TokenSymbol".into()]).await?;
/// assert_eq!(data[0].value.as_str(), Some("TKN"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Erc725<S, F = NoFetcher> {
    schemas: SchemaSet,
    source: S,
    fetcher: F,
    options: Erc725Options,
}

impl<S> Erc725<S> {
    /// Client over the built-in schemas, without a content fetcher
    pub fn new(source: S) -> Self {
        Self {
            schemas: SchemaSet::builtin(),
            source,
            fetcher: NoFetcher,
            options: Erc725Options::default(),
        }
    }
}

impl<S, F> Erc725<S, F> {
    /// Replace the schema set
    pub fn with_schemas(mut self, schemas: SchemaSet) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_options(mut self, options: Erc725Options) -> Self {
        self.options = options;
        self
    }

    /// Attach a fetcher for remote content
    pub fn with_fetcher<G>(self, fetcher: G) -> Erc725<S, G> {
        Erc725 {
            schemas: self.schemas,
            source: self.source,
            fetcher,
            options: self.options,
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn options(&self) -> &Erc725Options {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Encode values against this client's schemas
    pub fn encode_data(&self, inputs: &[EncodeInput]) -> Result<Vec<EncodedEntry>> {
        Ok(self.schemas.encode_data(inputs)?)
    }

    /// Decode already fetched values against this client's schemas
    pub fn decode_data(&self, inputs: &[DecodeInput]) -> Result<Vec<DecodedEntry>> {
        Ok(self.schemas.decode_data(inputs)?)
    }

    /// Whether `content` hashes to `hash` under `method`
    pub fn is_data_authentic(content: impl AsRef<[u8]>, method: HashMethod, hash: &B256) -> bool {
        method.verify(content, hash)
    }

    fn resolve(&self, requests: &[DataRequest]) -> Result<Vec<SchemaEntry>> {
        let entries = requests
            .iter()
            .map(|r| self.schemas.lookup(&r.key_name, &r.dynamic_key_parts))
            .collect::<std::result::Result<Vec<_>, SchemaError>>()?;
        Ok(entries)
    }
}

impl<S: DataSource + Sync, F: Sync> Erc725<S, F> {
    /// Read and decode the requested keys.
    ///
    /// Arrays are completed: their count cell is read first, then every element
    /// key in one more batch. Unset keys decode to [`Value::Null`].
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(count = requests.len())))]
    pub async fn get_data(&self, requests: &[DataRequest]) -> Result<Vec<DecodedEntry>> {
        let entries = self.resolve(requests)?;
        self.read_entries(&entries).await
    }

    /// Read every non-dynamic key of the schema set
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub async fn get_all_data(&self) -> Result<Vec<DecodedEntry>> {
        let entries: Vec<SchemaEntry> = self
            .schemas
            .iter()
            .filter(|e| !e.is_dynamic())
            .cloned()
            .collect();
        self.read_entries(&entries).await
    }

    /// ERC165 check by registry name or `0x` id
    pub async fn supports_interface(&self, name_or_id: &str) -> Result<bool> {
        let id = interface_id(name_or_id)?;
        self.source.supports_interface(id).await
    }

    async fn read(&self, keys: &[B256]) -> Result<Vec<Option<Bytes>>> {
        let values = self.source.get_values(keys).await?;
        if values.len() != keys.len() {
            return Err(Error::DataSourceLength {
                expected: keys.len(),
                got: values.len(),
            });
        }
        Ok(values)
    }

    async fn read_entries(&self, entries: &[SchemaEntry]) -> Result<Vec<DecodedEntry>> {
        let keys: Vec<B256> = entries.iter().map(|e| e.key).collect();
        let values = self.read(&keys).await?;

        let mut lengths = Vec::with_capacity(entries.len());
        let mut element_keys = Vec::new();
        for (entry, value) in entries.iter().zip(&values) {
            let len = match entry.key_type {
                KeyType::Array => {
                    decode_count(entry, value.as_ref().map(|b| &b[..]).unwrap_or_default())?
                }
                _ => 0,
            };
            element_keys.extend(array_element_keys(entry, len));
            lengths.push(len);
        }
        let element_values = if element_keys.is_empty() {
            Vec::new()
        } else {
            self.read(&element_keys).await?
        };
        let mut elements = element_keys.into_iter().zip(element_values);

        let mut out = Vec::with_capacity(entries.len());
        for ((entry, value), len) in entries.iter().zip(values).zip(lengths) {
            let data = match entry.key_type {
                KeyType::Array => {
                    let mut fetched: Vec<EncodedEntry> = value
                        .map(|count| EncodedEntry::new(entry.key, count))
                        .into_iter()
                        .collect();
                    for (key, element) in elements.by_ref().take(len) {
                        match element {
                            Some(element) => fetched.push(EncodedEntry::new(key, element)),
                            None => {
                                #[cfg(feature = "tracing")]
                                tracing::debug!(schema = %entry.name, %key, "array element not set");
                            }
                        }
                    }
                    DecodeValue::Entries(fetched)
                }
                _ => DecodeValue::Raw(value.unwrap_or_default()),
            };
            out.push(decode_entry(entry, &data)?);
        }
        Ok(out)
    }
}

impl<S: DataSource + Sync, F: ContentFetcher + Sync> Erc725<S, F> {
    /// Like [`Erc725::get_data`], then retrieve the content behind every
    /// `JSONURL`, `AssetURL` and `VerifiableURI` value.
    ///
    /// JSON content replaces the URL value with [`Value::Json`], `AssetURL`
    /// content with [`Value::Bytes`]. Content is checked against its stored hash
    /// unless verification is turned off in the options.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(count = requests.len())))]
    pub async fn fetch_data(&self, requests: &[DataRequest]) -> Result<Vec<DecodedEntry>> {
        let entries = self.resolve(requests)?;
        let decoded = self.read_entries(&entries).await?;

        let mut out = Vec::with_capacity(decoded.len());
        for (entry, mut data) in entries.iter().zip(decoded) {
            let tag = match entry.value_content {
                ValueContent::Named(
                    tag @ (ContentTag::JsonUrl | ContentTag::AssetUrl | ContentTag::VerifiableUri),
                ) => tag,
                _ => {
                    out.push(data);
                    continue;
                }
            };
            data.value = match data.value {
                Value::Url(url) => self.fetch_url(tag, &url).await?,
                Value::Array(items) => {
                    let mut fetched = Vec::with_capacity(items.len());
                    for item in items {
                        fetched.push(match item {
                            Value::Url(url) => self.fetch_url(tag, &url).await?,
                            other => other,
                        });
                    }
                    Value::Array(fetched)
                }
                other => other,
            };
            out.push(data);
        }
        Ok(out)
    }

    async fn fetch_url(&self, tag: ContentTag, url: &UrlValue) -> Result<Value> {
        let target = resolve_url(&url.url, &self.options.ipfs_gateway)?;
        let body = self.fetcher.fetch(&target).await?;
        #[cfg(feature = "tracing")]
        tracing::debug!(url = %target, len = body.len(), "fetched content");

        let json = serde_json::from_slice::<serde_json::Value>(&body);
        if self.options.verify {
            if let Some(verification) = url.verification() {
                // JSON is hashed as compact text, so a reformatted document still verifies
                let authentic = verification.method.verify(&body, &verification.data)
                    || json
                        .as_ref()
                        .is_ok_and(|j| verification.method.verify_json(j, &verification.data));
                if !authentic {
                    return Err(Error::Verification {
                        url: url.url.clone(),
                        method: verification.method.name(),
                        expected: verification.data,
                    });
                }
            }
        }

        match tag {
            ContentTag::AssetUrl => Ok(Value::Bytes(body)),
            _ => json.map(Value::Json).map_err(|source| Error::InvalidJson {
                url: url.url.clone(),
                source,
            }),
        }
    }
}
