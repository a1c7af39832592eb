//! Retrieval of content referenced by `JSONURL`, `AssetURL` and `VerifiableURI` values

use crate::error::{Error, Result};
use alloy_primitives::Bytes;
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// Fetches the bytes behind a URL
#[trait_variant::make(Send)]
pub trait ContentFetcher {
    /// Fetch the body at `url`. Non-success responses are errors.
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// Placeholder fetcher for clients that only read on-chain data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl ContentFetcher for NoFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        Err(Error::NoFetcher(url.to_string()))
    }
}

#[cfg(feature = "reqwest-client")]
impl ContentFetcher for reqwest::Client {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let resp = self
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::fetch(url.as_str(), e))?;
        let body = resp.bytes().await.map_err(|e| Error::fetch(url.as_str(), e))?;
        Ok(Bytes::from(body))
    }
}

impl<T: ContentFetcher + Sync> ContentFetcher for Arc<T> {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Bytes>> + Send {
        self.as_ref().fetch(url)
    }
}

/// Turn a stored URL into a fetchable one. `ipfs://<cid>/<path>` is resolved
/// against `gateway`, anything else must already be absolute.
pub fn resolve_url(url: &str, gateway: &Url) -> Result<Url> {
    let invalid = |source| Error::InvalidUrl {
        url: url.to_owned(),
        source,
    };
    match url.strip_prefix("ipfs://") {
        Some(path) => gateway.join(path.trim_start_matches('/')).map_err(invalid),
        None => Url::parse(url).map_err(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipfs_urls_use_the_gateway() {
        let gateway = Url::parse("https://gateway.example/ipfs/").unwrap();
        assert_eq!(
            resolve_url("ipfs://QmHash/profile.json", &gateway).unwrap().as_str(),
            "https://gateway.example/ipfs/QmHash/profile.json"
        );
        assert_eq!(
            resolve_url("https://cdn.example/a.json", &gateway).unwrap().as_str(),
            "https://cdn.example/a.json"
        );
        assert!(matches!(
            resolve_url("not a url", &gateway),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn no_fetcher_refuses() {
        let url = Url::parse("https://cdn.example/a.json").unwrap();
        assert!(matches!(NoFetcher.fetch(&url).await, Err(Error::NoFetcher(_))));
    }
}
