use crate::api::{Backend, DocumentKind};
use crate::error::TransportError;
use crate::protocol::StatusReport;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// When local edits are pushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SaveMode {
    /// Save when the editor loses focus.
    #[default]
    OnBlur,
    /// Save on every edit.
    OnInput,
}

/// Cached copy of a backend-owned text buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedDocument {
    pub content: String,
    /// Bumped on every local edit or remote refresh.
    pub version: u64,
    /// A local edit not yet written back.
    pub dirty: bool,
}

impl SharedDocument {
    fn set(&mut self, content: String, dirty: bool) {
        self.content = content;
        self.version += 1;
        self.dirty = dirty;
    }
}

#[derive(Debug, Default)]
struct Cache {
    scratchpad: SharedDocument,
    main_plan: SharedDocument,
}

impl Cache {
    fn get_mut(&mut self, kind: DocumentKind) -> &mut SharedDocument {
        match kind {
            DocumentKind::Scratchpad => &mut self.scratchpad,
            DocumentKind::MainPlan => &mut self.main_plan,
        }
    }
}

/// Scratchpad and main plan caches. Last writer wins in both directions.
pub struct SharedDocuments<T: ?Sized> {
    backend: Backend<T>,
    save_mode: SaveMode,
    cache: Arc<Mutex<Cache>>,
}

impl<T: ?Sized> Clone for SharedDocuments<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            save_mode: self.save_mode,
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<T: Transport + ?Sized> SharedDocuments<T> {
    pub fn new(backend: Backend<T>, save_mode: SaveMode) -> Self {
        Self {
            backend,
            save_mode,
            cache: Arc::new(Mutex::new(Cache::default())),
        }
    }

    pub fn save_mode(&self) -> SaveMode {
        self.save_mode
    }

    pub fn get(&self, kind: DocumentKind) -> SharedDocument {
        self.lock().get_mut(kind).clone()
    }

    /// Initial fetch of both documents.
    pub async fn load(&self) -> Result<(), TransportError> {
        let scratchpad = self.backend.document(DocumentKind::Scratchpad).await?;
        let main_plan = self.backend.document(DocumentKind::MainPlan).await?;
        let mut cache = self.lock();
        cache.scratchpad.set(scratchpad, false);
        cache.main_plan.set(main_plan, false);
        Ok(())
    }

    /// Record a local edit, saving right away in `OnInput` mode.
    pub async fn edit(
        &self,
        kind: DocumentKind,
        content: impl Into<String>,
    ) -> Result<(), TransportError> {
        self.lock().get_mut(kind).set(content.into(), true);
        if self.save_mode == SaveMode::OnInput {
            self.save(kind).await?;
        }
        Ok(())
    }

    /// The editor for `kind` lost focus.
    pub async fn blur(&self, kind: DocumentKind) -> Result<(), TransportError> {
        let dirty = self.lock().get_mut(kind).dirty;
        if self.save_mode == SaveMode::OnBlur && dirty {
            self.save(kind).await?;
        }
        Ok(())
    }

    pub async fn save(&self, kind: DocumentKind) -> Result<(), TransportError> {
        let (content, version) = {
            let mut cache = self.lock();
            let document = cache.get_mut(kind);
            (document.content.clone(), document.version)
        };
        debug!(?kind, version, "saving document");
        self.backend.save_document(kind, &content).await?;

        let mut cache = self.lock();
        let document = cache.get_mut(kind);
        if document.version == version {
            document.dirty = false;
        }
        Ok(())
    }

    /// Push both cached documents in one request.
    pub async fn push_all(&self) -> Result<(), TransportError> {
        let (main_plan, scratchpad) = {
            let cache = self.lock();
            (cache.main_plan.content.clone(), cache.scratchpad.content.clone())
        };
        self.backend.update_state(&main_plan, &scratchpad).await?;

        let mut cache = self.lock();
        cache.main_plan.dirty = false;
        cache.scratchpad.dirty = false;
        Ok(())
    }

    /// Overwrite the caches with whatever a status poll carried.
    pub fn refresh(&self, report: &StatusReport) {
        let mut cache = self.lock();
        if let Some(scratchpad) = &report.scratchpad {
            cache.scratchpad.set(scratchpad.clone(), false);
        }
        if let Some(main_plan) = &report.main_plan {
            cache.main_plan.set(main_plan.clone(), false);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
