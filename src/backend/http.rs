use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Entry, EntryKind, split_path};

use super::Backend;

/// Talks to the proof server's `/api/v1/files` endpoints.
pub struct HttpBackend {
    client: Client,
    base: Url,
    include_hidden: bool,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    #[serde(rename = "type")]
    kind: EntryKind,
    path: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

impl HttpBackend {
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("Invalid backend url: {base}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            base,
            include_hidden: false,
        })
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    fn files_url(&self) -> Result<Url> {
        self.base
            .join("api/v1/files")
            .context("Invalid files endpoint")
    }

    /// The whole path travels as one encoded segment.
    fn file_url(&self, path: &str) -> Result<Url> {
        split_path(path)?;
        self.base
            .join(&format!("api/v1/files/{}", urlencoding::encode(path)))
            .with_context(|| format!("Invalid file url for '{path}'"))
    }
}

/// Turn a non-success response into an error carrying the server's `detail`.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => status.to_string(),
    };
    bail!("{detail}")
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list(&self) -> Result<Vec<Entry>> {
        let url = self.files_url()?;
        info!(%url, "fetching directory listing");

        let response = self
            .client
            .get(url)
            .query(&[("include_hidden", self.include_hidden)])
            .send()
            .await
            .context("Failed to fetch directory listing")?;
        let entries: Vec<Entry> = check(response)
            .await?
            .json()
            .await
            .context("Malformed directory listing")?;

        debug!(entries = entries.len(), "received directory listing");
        Ok(entries)
    }

    async fn create(&self, path: &str, kind: EntryKind) -> Result<()> {
        info!(path, kind = kind.as_str(), "creating entry");
        let response = self
            .client
            .post(self.files_url()?)
            .json(&CreateRequest { kind, path })
            .send()
            .await
            .context("Failed to create file/folder")?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        info!(path, "deleting entry");
        let response = self
            .client
            .delete(self.file_url(path)?)
            .send()
            .await
            .context("Failed to delete file/folder")?;
        check(response).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(self.file_url(path)?)
            .send()
            .await
            .with_context(|| format!("Failed to fetch '{path}'"))?;
        Ok(check(response).await?.text().await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        info!(path, bytes = content.len(), "saving file");
        let response = self
            .client
            .put(self.file_url(path)?)
            .body(content.to_owned())
            .send()
            .await
            .with_context(|| format!("Failed to save '{path}'"))?;
        check(response).await?;
        Ok(())
    }
}
