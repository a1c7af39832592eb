//! Client configuration

use std::sync::LazyLock;
use url::Url;

/// Gateway used for `ipfs://` URLs unless configured otherwise
pub const DEFAULT_IPFS_GATEWAY: &str = "https://api.universalprofile.cloud/ipfs/";

static DEFAULT_GATEWAY: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(DEFAULT_IPFS_GATEWAY).expect("default gateway is a valid URL")
});

/// Options for [`crate::Erc725`]
///
/// ```
/// use erc725::Erc725Options;
///
/// let options = Erc725Options::builder().verify(false).build();
/// assert_eq!(options.ipfs_gateway.as_str(), "https://api.universalprofile.cloud/ipfs/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct Erc725Options {
    /// Base URL `ipfs://` paths are joined onto. Keep the trailing slash.
    #[builder(default = DEFAULT_GATEWAY.clone())]
    pub ipfs_gateway: Url,
    /// Whether `fetch_data` checks fetched content against its stored hash
    #[builder(default = true)]
    pub verify: bool,
}

impl Default for Erc725Options {
    fn default() -> Self {
        Self::builder().build()
    }
}
