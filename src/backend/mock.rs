use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::{Entry, EntryKind};

use super::Backend;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    List,
    Create(String, EntryKind),
    Delete(String),
    Read(String),
    Write(String),
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    listing: Vec<Entry>,
    files: HashMap<String, String>,
    failure: Option<String>,
    calls: Vec<Call>,
}

impl MockBackend {
    pub fn with_listing(listing: Vec<Entry>) -> Self {
        let backend = Self::default();
        backend.inner.lock().expect("mock backend lock").listing = listing;
        backend
    }

    pub fn set_file(&self, path: impl Into<String>, content: impl Into<String>) {
        let mut inner = self.inner.lock().expect("mock backend lock");
        inner.files.insert(path.into(), content.into());
    }

    /// Make every following call fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().expect("mock backend lock");
        inner.failure = Some(message.into());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        let inner = self.inner.lock().expect("mock backend lock");
        inner.files.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        let inner = self.inner.lock().expect("mock backend lock");
        inner.calls.clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut inner = self.inner.lock().expect("mock backend lock");
        inner.calls.push(call);
        match &inner.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list(&self) -> Result<Vec<Entry>> {
        self.record(Call::List)?;
        let inner = self.inner.lock().expect("mock backend lock");
        Ok(inner.listing.clone())
    }

    async fn create(&self, path: &str, kind: EntryKind) -> Result<()> {
        self.record(Call::Create(path.to_owned(), kind))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(Call::Delete(path.to_owned()))
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.record(Call::Read(path.to_owned()))?;
        let inner = self.inner.lock().expect("mock backend lock");
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found"))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.record(Call::Write(path.to_owned()))?;
        let mut inner = self.inner.lock().expect("mock backend lock");
        match inner.files.get_mut(path) {
            Some(file) => {
                *file = content.to_owned();
                Ok(())
            }
            None => Err(anyhow!("File not found")),
        }
    }
}
