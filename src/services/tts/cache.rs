//! Модуль для кэширования результатов TTS
//!
//! Content-addressed store of synthesized audio. Key derivation is a pure
//! function; the store itself only does file I/O.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::AppResult;

const CACHE_EXTENSION: &str = "mp3";

/// Fingerprint of the synthesis inputs
pub fn cache_key(text: &str, engine: &str, language: &str, rate: f32) -> String {
    let fingerprint = format!("{}_{}_{}_{:?}", text, engine, language, rate);
    format!("{:x}", md5::compute(fingerprint.as_bytes()))
}

/// Структура для управления кэшем
#[derive(Debug, Clone)]
pub struct TtsCache {
    /// Директория для кэша
    cache_dir: PathBuf,
    /// Максимальный размер кэша в байтах
    max_size: Option<u64>,
}

impl TtsCache {
    pub fn new(cache_dir: impl Into<PathBuf>, max_size: Option<u64>) -> AppResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;

        Ok(Self { cache_dir, max_size })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, CACHE_EXTENSION))
    }

    /// Cached artifact for the key, if a non-empty one exists
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        let path = self.entry_path(key);
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Store a copy of `artifact` under `key`. An existing entry is kept
    /// as is; entries are written once.
    pub fn put(&self, key: &str, artifact: &Path) -> AppResult<PathBuf> {
        if let Some(existing) = self.get(key) {
            debug!("Cache entry {} already present", key);
            return Ok(existing);
        }

        let target = self.entry_path(key);
        // Читатели никогда не видят частично записанную запись
        let mut partial = NamedTempFile::new_in(&self.cache_dir)?;
        io::copy(&mut File::open(artifact)?, partial.as_file_mut())?;
        if let Err(e) = partial.persist_noclobber(&target) {
            if e.error.kind() != io::ErrorKind::AlreadyExists {
                return Err(e.error.into());
            }
            debug!("Cache entry {} written concurrently, keeping it", key);
            return Ok(target);
        }
        debug!("Cached {} as {}", artifact.display(), key);

        self.check_cache_size()?;

        Ok(target)
    }

    /// Очистить кэш
    pub fn clear(&self) -> AppResult<usize> {
        let mut removed = 0;
        for entry in self.entries() {
            fs::remove_file(&entry.0)?;
            removed += 1;
        }
        info!("Cleared {} cached audio files", removed);
        Ok(removed)
    }

    /// Total size of all entries, bytes
    pub fn size(&self) -> u64 {
        self.entries().iter().map(|e| e.1).sum()
    }

    fn entries(&self) -> Vec<(PathBuf, u64, std::time::SystemTime)> {
        WalkDir::new(&self.cache_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str()) == Some(CACHE_EXTENSION)
            })
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                let modified = metadata.modified().ok()?;
                Some((entry.into_path(), metadata.len(), modified))
            })
            .collect()
    }

    /// Удаляем самые старые файлы, пока кэш не уложится в лимит
    fn check_cache_size(&self) -> AppResult<()> {
        let Some(max_size) = self.max_size else {
            return Ok(());
        };

        let mut files = self.entries();
        let mut total_size: u64 = files.iter().map(|f| f.1).sum();
        if total_size <= max_size {
            return Ok(());
        }

        files.sort_by(|a, b| a.2.cmp(&b.2));
        for (path, len, _) in files {
            if total_size <= max_size {
                break;
            }
            match fs::remove_file(&path) {
                Ok(()) => total_size = total_size.saturating_sub(len),
                Err(e) => warn!("Failed to evict {}: {}", path.display(), e),
            }
        }
        info!("TTS cache trimmed to {} bytes", total_size);

        Ok(())
    }
}
