use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::{AssetError, Model, Texture, import_model, import_texture};

/// Something that can be imported from a file on a worker thread.
pub trait Asset: Send + Sync + Sized + 'static {
    /// Lowercase kind used in logs and thread names.
    const KIND: &'static str;

    fn import(path: &Path) -> Result<Self, AssetError>;

    fn name(&self) -> &str;
}

impl Asset for Model {
    const KIND: &'static str = "model";

    fn import(path: &Path) -> Result<Self, AssetError> {
        import_model(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Asset for Texture {
    const KIND: &'static str = "texture";

    fn import(path: &Path) -> Result<Self, AssetError> {
        import_texture(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Where an asset load currently stands.
#[derive(Debug)]
pub enum LoadState<T> {
    Pending,
    Loaded(Arc<T>),
    Failed(AssetError),
}

impl<T> LoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

pub type PendingModel = Pending<Model>;
pub type PendingTexture = Pending<Texture>;

/// Starts asset imports on worker threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetLoader;

impl AssetLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load_model(&self, path: impl AsRef<Path>) -> PendingModel {
        self.load(path)
    }

    pub fn load_texture(&self, path: impl AsRef<Path>) -> PendingTexture {
        self.load(path)
    }

    /// Begin loading `path`. The returned handle is polled by its owner; the
    /// worker never touches anything but its channel.
    pub fn load<T: Asset>(&self, path: impl AsRef<Path>) -> Pending<T> {
        let path = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{}-loader", T::KIND))
            .spawn(move || {
                let result = T::import(&worker_path);
                // The receiver may already be gone if the app shut down.
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => {
                tracing::info!(kind = T::KIND, path = %path.display(), "asset load started");
                Pending {
                    path,
                    rx: Some(rx),
                    state: LoadState::Pending,
                }
            }
            Err(e) => Pending {
                path,
                rx: None,
                state: LoadState::Failed(AssetError::Io(e)),
            },
        }
    }
}

/// Handle to an in-flight asset load.
#[derive(Debug)]
pub struct Pending<T> {
    path: PathBuf,
    rx: Option<Receiver<Result<T, AssetError>>>,
    state: LoadState<T>,
}

impl<T: Asset> Pending<T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check for a result without blocking.
    pub fn poll(&mut self) -> &LoadState<T> {
        let received = self.rx.as_ref().map(|rx| rx.try_recv());
        match received {
            Some(Ok(result)) => self.resolve(result),
            Some(Err(TryRecvError::Disconnected)) => self.resolve(Err(AssetError::LoaderLost)),
            Some(Err(TryRecvError::Empty)) | None => {}
        }
        &self.state
    }

    /// Block until the load resolves.
    pub fn wait(&mut self) -> &LoadState<T> {
        if let Some(rx) = self.rx.take() {
            let result = rx.recv().unwrap_or(Err(AssetError::LoaderLost));
            self.resolve(result);
        }
        &self.state
    }

    fn resolve(&mut self, result: Result<T, AssetError>) {
        self.rx = None;
        self.state = match result {
            Ok(asset) => {
                tracing::info!(kind = T::KIND, path = %self.path.display(), name = asset.name(), "asset loaded");
                LoadState::Loaded(Arc::new(asset))
            }
            Err(e) => {
                tracing::warn!(kind = T::KIND, path = %self.path.display(), error = %e, "asset failed to load");
                LoadState::Failed(e)
            }
        };
    }
}
