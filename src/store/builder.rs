//! Store builder and handles.

use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use std::thread::JoinHandle;

use crate::store::actor::{Command, StoreActor};
use crate::store::facades::{StoreReader, StoreWriter};
use crate::store::StoreError;

/// Default channel capacity for writer commands.
///
/// Records are small and written immediately; this comfortably buffers
/// bursts from many concurrent workers.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Builder for constructing the store layer.
pub struct StoreBuilder {
    dir: PathBuf,
    channel_capacity: usize,
}

impl StoreBuilder {
    /// Create a new store builder over the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the channel capacity for writer commands.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the store layer and return handles.
    pub fn build(self) -> Result<StoreHandles, StoreError> {
        let (actor_handle, tx) = StoreActor::spawn(&self.dir, self.channel_capacity)?;

        Ok(StoreHandles {
            writer: StoreWriter::new(tx.clone()),
            reader: StoreReader::new(&self.dir),
            tx,
            actor_handle: Some(actor_handle),
        })
    }
}

/// Handles to the store layer facades.
pub struct StoreHandles {
    /// Non-blocking writer for state transitions and results.
    pub writer: StoreWriter,
    /// Reader over the mirrored files.
    pub reader: StoreReader,
    tx: SyncSender<Command>,
    actor_handle: Option<JoinHandle<()>>,
}

impl StoreHandles {
    /// Gracefully shutdown the store layer.
    ///
    /// Drains queued commands, then joins the actor thread.
    pub fn shutdown(mut self) -> Result<(), StoreError> {
        self.tx
            .send(Command::Shutdown)
            .map_err(|_| StoreError::ChannelSend)?;
        if let Some(handle) = self.actor_handle.take() {
            handle
                .join()
                .map_err(|_| StoreError::Internal("store actor panicked".to_string()))?;
        }
        Ok(())
    }
}
