use anyhow::{Context, Result};
use chanmap_commit::HttpTransport;
use chanmap_config::{AvailableFilterSetting, Config};
use chanmap_views::AvailableFilter;

/// The available-revisions filter a fresh console starts with.
pub fn default_available_filter(config: &Config) -> AvailableFilter {
    match config.available.default_filter {
        AvailableFilterSetting::Recent => AvailableFilter::Recent,
        AvailableFilterSetting::Unreleased => AvailableFilter::Unreleased,
        AvailableFilterSetting::All => AvailableFilter::All,
    }
}

/// HTTP commit transport from the `[commit]` section.
pub fn http_transport(config: &Config) -> Result<HttpTransport> {
    let endpoint = config
        .commit
        .endpoint
        .as_deref()
        .context("commit.endpoint is not configured")?;
    let snap = config
        .commit
        .snap
        .as_deref()
        .context("commit.snap is not configured")?;
    HttpTransport::new(endpoint, snap)
        .and_then(|transport| transport.with_timeout(config.commit.timeout))
        .context("failed to create HTTP client")
}
