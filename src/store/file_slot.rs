use crate::error::app_error::AppError;
use crate::store::SlotStore;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed slot store: each key maps to one JSON file under the data
/// directory. Writes go through a temp file plus rename so a crashed write
/// leaves the previous contents intact rather than a truncated slot.
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| AppError::storage(format!("Failed to create data directory {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait::async_trait]
impl SlotStore for FileSlotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(format!("Failed to read slot {key}"), e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        fs::write(&tmp, value)
            .await
            .map_err(|e| AppError::storage(format!("Failed to write slot {key}"), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::storage(format!("Failed to commit slot {key}"), e))?;

        Ok(())
    }
}
