use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use folio_core::DocumentSource;
use tracing::{debug, instrument};
use url::Url;

/// Upper bound on documents downloaded over HTTP.
const MAX_DOWNLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Document bytes the engine can open, after any download has finished.
#[derive(Clone)]
pub enum SourceData {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// Turns a [`DocumentSource`] into something the engine can read locally.
/// `http(s)` URLs are fetched on the blocking pool.
#[instrument]
pub async fn resolve(source: &DocumentSource) -> Result<SourceData> {
    match source {
        DocumentSource::Path(path) => {
            let absolute = path
                .canonicalize()
                .with_context(|| format!("failed to resolve path for {:?}", path))?;
            Ok(SourceData::File(absolute))
        }
        DocumentSource::Bytes(bytes) => Ok(SourceData::Memory(Arc::clone(bytes))),
        DocumentSource::Url(raw) => {
            let url = Url::parse(raw).with_context(|| format!("invalid document URL {raw}"))?;
            match url.scheme() {
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|_| anyhow!("URL {url} does not name a local file"))?;
                    let absolute = path
                        .canonicalize()
                        .with_context(|| format!("failed to resolve path for {:?}", path))?;
                    Ok(SourceData::File(absolute))
                }
                "http" | "https" => {
                    let bytes = tokio::task::spawn_blocking(move || download(&url))
                        .await
                        .context("download task did not complete")??;
                    Ok(SourceData::Memory(bytes.into()))
                }
                other => bail!("unsupported URL scheme `{other}`"),
            }
        }
    }
}

fn download(url: &Url) -> Result<Vec<u8>> {
    debug!(%url, "downloading document");
    let response = ureq::get(url.as_str())
        .call()
        .with_context(|| format!("failed to fetch {url}"))?;
    let bytes = read_capped(response.into_reader(), MAX_DOWNLOAD_BYTES)
        .with_context(|| format!("failed to read response body from {url}"))?;
    if bytes.is_empty() {
        bail!("{url} returned an empty body");
    }
    Ok(bytes)
}

/// Reads `reader` to the end, failing once it yields more than `limit` bytes.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        bail!("document exceeds {limit} bytes");
    }
    Ok(bytes)
}
