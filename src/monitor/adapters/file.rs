//! JSON file history persistence inside a capability-scoped directory.

use crate::monitor::ports::{
    HistoryDump, HistoryPersistence, HistoryPersistenceError, HistoryPersistenceResult,
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::Arc;

/// Stores the history dump as one JSON document.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never observe a partially written dump.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryPersistence {
    dir: Arc<Dir>,
    file_name: String,
}

impl JsonFileHistoryPersistence {
    /// Opens (creating if needed) `data_dir` and targets `file_name` in it.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryPersistenceError::Storage`] when the directory cannot
    /// be created or opened, or when `file_name` is not a plain file name.
    pub fn open(data_dir: &Utf8Path, file_name: &str) -> HistoryPersistenceResult<Self> {
        let is_plain_name = !file_name.is_empty()
            && Utf8Path::new(file_name).file_name() == Some(file_name);
        if !is_plain_name {
            return Err(HistoryPersistenceError::storage(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("history file name must be a plain file name: {file_name}"),
            )));
        }

        Dir::create_ambient_dir_all(data_dir, ambient_authority())
            .map_err(HistoryPersistenceError::storage)?;
        let dir = Dir::open_ambient_dir(data_dir, ambient_authority())
            .map_err(HistoryPersistenceError::storage)?;
        Ok(Self {
            dir: Arc::new(dir),
            file_name: file_name.to_owned(),
        })
    }

    fn temp_name(&self) -> String {
        format!(".{}.tmp", self.file_name)
    }
}

/// Runs a blocking filesystem operation off the async executor.
async fn run_blocking<F, T>(operation: F) -> HistoryPersistenceResult<T>
where
    F: FnOnce() -> HistoryPersistenceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(HistoryPersistenceError::storage)?
}

#[async_trait]
impl HistoryPersistence for JsonFileHistoryPersistence {
    async fn read(&self) -> HistoryPersistenceResult<Option<HistoryDump>> {
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        run_blocking(move || {
            let contents = match dir.read_to_string(&file_name) {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(HistoryPersistenceError::storage(err)),
            };
            serde_json::from_str(&contents)
                .map(Some)
                .map_err(HistoryPersistenceError::invalid_persisted_data)
        })
        .await
    }

    async fn write(&self, dump: &HistoryDump) -> HistoryPersistenceResult<()> {
        let encoded = serde_json::to_vec(dump).map_err(HistoryPersistenceError::storage)?;
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        let temp_name = self.temp_name();
        run_blocking(move || {
            dir.write(&temp_name, &encoded)
                .map_err(HistoryPersistenceError::storage)?;
            dir.rename(&temp_name, &dir, &file_name)
                .map_err(HistoryPersistenceError::storage)
        })
        .await
    }
}
