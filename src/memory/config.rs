//! Configuration of the region that backs a frame channel

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HandwaveError, Result};

/// Default Unix mode for file-backed channel regions
pub const DEFAULT_REGION_PERMISSIONS: u32 = 0o600;

/// Where the channel's two frame slots live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackingType {
    /// Private shared mapping; producer and consumer threads of one process
    #[default]
    Anonymous,
    /// Mapped file, so another process can attach to the same frames
    FileBacked,
    /// Sealed-size memory file descriptor
    #[cfg(target_os = "linux")]
    MemFd,
}

impl BackingType {
    /// Whether this platform can provide the backing
    pub fn is_supported(&self) -> bool {
        match self {
            BackingType::Anonymous => true,
            BackingType::FileBacked => cfg!(unix),
            #[cfg(target_os = "linux")]
            BackingType::MemFd => true,
        }
    }
}

impl fmt::Display for BackingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackingType::Anonymous => "anonymous",
            BackingType::FileBacked => "file-backed",
            #[cfg(target_os = "linux")]
            BackingType::MemFd => "memfd",
        };
        f.write_str(name)
    }
}

/// Size, backing and ownership of one mapped region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    /// Bytes, header and both slots included
    pub size: usize,
    pub backing_type: BackingType,
    /// File for file-backed regions; a temp-dir path derived from `name` otherwise
    pub file_path: Option<PathBuf>,
    /// Create and size the file. When false an existing file is attached as is.
    pub create: bool,
    /// Unix mode of a created file
    pub permissions: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            backing_type: BackingType::default(),
            file_path: None,
            create: true,
            permissions: DEFAULT_REGION_PERMISSIONS,
        }
    }
}

impl RegionConfig {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            ..Default::default()
        }
    }

    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Attach to a file another process already created
    pub fn attach_existing(mut self) -> Self {
        self.create = false;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HandwaveError::invalid_parameter("name", "Region name cannot be empty"));
        }
        if self.size == 0 {
            return Err(HandwaveError::invalid_parameter(
                "size",
                "Region must hold at least the channel header",
            ));
        }
        if !self.backing_type.is_supported() {
            return Err(HandwaveError::platform(format!(
                "{} regions are not available on this platform",
                self.backing_type
            )));
        }
        if self.permissions > 0o777 {
            return Err(HandwaveError::invalid_parameter(
                "permissions",
                format!("{:o} is not a Unix file mode", self.permissions),
            ));
        }
        if self.backing_type == BackingType::FileBacked && !self.create && self.file_path.is_none() {
            return Err(HandwaveError::invalid_parameter(
                "file_path",
                "Attaching to an existing region needs its file path",
            ));
        }
        Ok(())
    }

    /// File used for file-backed regions
    pub fn default_file_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("handwave_{}", self.name)))
    }
}
