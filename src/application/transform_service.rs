// Transform service - Session copy of the display transform with background persistence
use crate::application::meter_repository::MeterRepository;
use crate::domain::transform::{TransformError, TransformField, TransformSettings};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

#[derive(Debug, thiserror::Error)]
pub enum TransformUpdateError {
    #[error(transparent)]
    Invalid(#[from] TransformError),

    #[error("stored transform settings unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

#[derive(Clone)]
pub struct TransformService {
    repository: Arc<dyn MeterRepository>,
    current: Arc<RwLock<Option<TransformSettings>>>,
    persist: Arc<watch::Sender<Option<TransformSettings>>>,
}

impl TransformService {
    /// Must be called inside a tokio runtime; spawns the persistence task.
    pub fn new(repository: Arc<dyn MeterRepository>) -> Self {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(persist_changes(repository.clone(), rx));

        Self {
            repository,
            current: Arc::new(RwLock::new(None)),
            persist: Arc::new(tx),
        }
    }

    /// Loaded from the backend on first use, then served from memory.
    pub async fn current(&self) -> TransformSettings {
        if let Some(settings) = *self.current.read().await {
            return settings;
        }

        let mut guard = self.current.write().await;
        if let Some(settings) = *guard {
            return settings;
        }

        match self.load_stored().await {
            Ok(settings) => {
                *guard = Some(settings);
                settings
            }
            Err(e) => {
                // not cached, so the next call tries again
                tracing::warn!("Failed to load transform settings, using defaults: {:#}", e);
                TransformSettings::default()
            }
        }
    }

    /// Applies one validated change and queues it for saving without waiting.
    /// Fails when the stored settings were never loaded and still cannot be, since
    /// saving on top of defaults would overwrite them.
    pub async fn update(&self, field: TransformField, value: f64) -> Result<TransformSettings, TransformUpdateError> {
        let snapshot = {
            let mut guard = self.current.write().await;
            let mut settings = match *guard {
                Some(settings) => settings,
                None => {
                    let loaded = self
                        .load_stored()
                        .await
                        .map_err(TransformUpdateError::Unavailable)?;
                    *guard = Some(loaded);
                    loaded
                }
            };
            settings.set(field, value)?;
            *guard = Some(settings);
            settings
        };

        tracing::info!("Transform {} set to {}", field, value);
        self.persist.send_replace(Some(snapshot));
        Ok(snapshot)
    }

    async fn load_stored(&self) -> anyhow::Result<TransformSettings> {
        let stored = self.repository.fetch_transform().await?;
        let settings = stored.map(TransformSettings::sanitized).unwrap_or_default();
        tracing::debug!("Loaded transform settings (active: {})", settings.is_active());
        Ok(settings)
    }
}

/// Saves the latest queued settings. Intermediate values queued while a save is in
/// flight are skipped; only the newest one is written.
async fn persist_changes(
    repository: Arc<dyn MeterRepository>,
    mut rx: watch::Receiver<Option<TransformSettings>>,
) {
    while rx.changed().await.is_ok() {
        let pending = *rx.borrow_and_update();
        if let Some(settings) = pending {
            if let Err(e) = repository.save_transform(&settings).await {
                tracing::error!("Failed to save transform settings: {:#}", e);
            }
        }
    }
}
