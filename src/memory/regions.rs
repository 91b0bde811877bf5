//! Shared memory region implementation

use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    os::fd::OwnedFd,
    os::unix::fs::OpenOptionsExt,
    ptr::NonNull,
    time::SystemTime,
};

use log::debug;
use memmap2::{MmapMut, MmapOptions};
#[cfg(target_os = "linux")]
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    unistd::ftruncate,
};
use serde::{Deserialize, Serialize};

use crate::error::{HandwaveError, Result};

use super::config::{BackingType, RegionConfig};

/// Descriptive metadata for a mapped region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMetadata {
    /// Name of the region
    pub name: String,
    /// Size in bytes
    pub size: usize,
    /// Type of backing storage
    pub backing_type: BackingType,
    /// Creation timestamp
    pub created_at: SystemTime,
}

/// A mapped memory region that can be shared between a producer and a consumer.
///
/// The mapping is created eagerly and zero-filled; construction fails if the platform
/// cannot provide it.
#[derive(Debug)]
pub struct SharedMemoryRegion {
    metadata: RegionMetadata,
    mmap: MmapMut,
    /// Base address captured once from the mapping; stable for the life of `mmap`
    base: NonNull<u8>,
    _file: Option<File>,
    _owned_fd: Option<OwnedFd>,
}

impl SharedMemoryRegion {
    /// Create or open a shared memory region
    pub fn new(config: RegionConfig) -> Result<Self> {
        config.validate()?;

        let (file, owned_fd, mut mmap) = match config.backing_type {
            BackingType::Anonymous => (None, None, Self::create_anonymous(config.size)?),
            BackingType::FileBacked => {
                let file = Self::create_file_backing(&config)?;
                let mmap = unsafe {
                    MmapOptions::new()
                        .len(config.size)
                        .map_mut(&file)
                        .map_err(|e| HandwaveError::from_io(e, "Failed to create memory mapping"))?
                };
                (Some(file), None, mmap)
            }
            #[cfg(target_os = "linux")]
            BackingType::MemFd => {
                let fd = Self::create_memfd_backing(&config)?;
                let mmap = unsafe {
                    MmapOptions::new()
                        .len(config.size)
                        .map_mut(&fd)
                        .map_err(|e| HandwaveError::from_io(e, "Failed to create memory mapping"))?
                };
                (None, Some(fd), mmap)
            }
        };

        if mmap.len() < config.size {
            return Err(HandwaveError::memory(format!(
                "Mapping for {} is {} bytes, {} requested",
                config.name,
                mmap.len(),
                config.size
            )));
        }

        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| HandwaveError::memory("Mapping returned a null base address"))?;

        debug!(
            "mapped region {} ({} bytes, {})",
            config.name,
            config.size,
            config.backing_type
        );

        Ok(Self {
            metadata: RegionMetadata {
                name: config.name,
                size: config.size,
                backing_type: config.backing_type,
                created_at: SystemTime::now(),
            },
            mmap,
            base,
            _file: file,
            _owned_fd: owned_fd,
        })
    }

    fn create_anonymous(size: usize) -> Result<MmapMut> {
        MmapOptions::new()
            .len(size)
            .map_anon()
            .map_err(|e| HandwaveError::from_io(e, "Failed to create anonymous mapping"))
    }

    fn create_file_backing(config: &RegionConfig) -> Result<File> {
        let path = config.default_file_path();

        let file = if config.create {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .mode(config.permissions)
                .open(&path)
                .map_err(|e| HandwaveError::from_io(e, "Failed to create/open file"))?
        } else {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| HandwaveError::from_io(e, "Failed to open existing file"))?
        };

        if config.create {
            file.set_len(config.size as u64)
                .map_err(|e| HandwaveError::from_io(e, "Failed to set file size"))?;
        } else {
            let existing = file
                .metadata()
                .map_err(|e| HandwaveError::from_io(e, "Failed to stat existing file"))?
                .len() as usize;
            if existing < config.size {
                return Err(HandwaveError::capacity("attached region bytes", config.size, existing));
            }
        }

        Ok(file)
    }

    #[cfg(target_os = "linux")]
    fn create_memfd_backing(config: &RegionConfig) -> Result<OwnedFd> {
        let name_cstr = CString::new(config.name.clone())
            .map_err(|_| HandwaveError::invalid_parameter("name", "Name contains null bytes"))?;

        let owned_fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| HandwaveError::platform(format!("Failed to create memfd: {}", e)))?;

        ftruncate(&owned_fd, config.size as i64)
            .map_err(|e| HandwaveError::platform(format!("Failed to set memfd size: {}", e)))?;

        Ok(owned_fd)
    }

    /// Get the region metadata
    pub fn metadata(&self) -> &RegionMetadata {
        &self.metadata
    }

    /// Get the raw memory slice (read-only)
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Base address of the mapping.
    ///
    /// # Safety
    /// Writes through this pointer must be coordinated by the caller; the region itself
    /// performs no synchronisation.
    pub unsafe fn base_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Get the size of the region
    pub fn size(&self) -> usize {
        self.metadata.size
    }

    /// Get the name of the region
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Flush changes to persistent storage (for file-backed regions)
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| HandwaveError::from_io(e, "Failed to flush memory mapping"))
    }

    /// Check if the region is file-backed
    pub fn is_file_backed(&self) -> bool {
        matches!(self.metadata.backing_type, BackingType::FileBacked)
    }
}

unsafe impl Send for SharedMemoryRegion {}
unsafe impl Sync for SharedMemoryRegion {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_anonymous_region_is_zeroed() {
        let region = SharedMemoryRegion::new(RegionConfig::new("anon_test", 4096)).unwrap();
        assert_eq!(region.size(), 4096);
        assert!(region.as_slice().iter().all(|&b| b == 0));
        assert!(!region.is_file_backed());
    }

    #[test]
    fn test_file_backed_region() {
        let temp_dir = TempDir::new().unwrap();
        let config = RegionConfig::new("file_test", 8192)
            .with_backing_type(BackingType::FileBacked)
            .with_file_path(temp_dir.path().join("frames.shm"));

        let region = SharedMemoryRegion::new(config).unwrap();
        assert!(region.is_file_backed());
        assert_eq!(region.as_slice().len(), 8192);
        region.flush().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memfd_region() {
        let config =
            RegionConfig::new("memfd_test", 4096).with_backing_type(BackingType::MemFd);
        let region = SharedMemoryRegion::new(config).unwrap();
        assert_eq!(region.metadata().backing_type, BackingType::MemFd);
    }

    #[test]
    fn test_attach_rejects_short_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short.shm");
        std::fs::write(&path, [0u8; 16]).unwrap();
        let config = RegionConfig::new("short", 4096)
            .with_backing_type(BackingType::FileBacked)
            .with_file_path(&path)
            .attach_existing();
        assert!(matches!(
            SharedMemoryRegion::new(config),
            Err(HandwaveError::Capacity { .. })
        ));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        assert!(SharedMemoryRegion::new(RegionConfig::new("zero", 0)).is_err());
    }
}
