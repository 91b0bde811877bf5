//! Frame channel configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::{HandwaveError, Result},
    memory::{BackingType, RegionConfig, DEFAULT_REGION_PERMISSIONS},
};

/// Default maximum number of hands per frame
pub const DEFAULT_MAX_HANDS: usize = 4;
/// Default maximum number of faces per frame
pub const DEFAULT_MAX_FACES: usize = 2;
/// Default maximum number of landmarks per face (dense face mesh with irises)
pub const DEFAULT_MAX_FACE_LANDMARKS: usize = 478;
/// Default number of attempts a reader makes before giving up on a poll
pub const DEFAULT_READ_ATTEMPTS: usize = 4;

/// Configuration for a double-buffered frame channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Name of the backing region
    pub name: String,
    /// Maximum hands stored per slot
    pub max_hands: usize,
    /// Maximum faces stored per slot
    pub max_faces: usize,
    /// Maximum landmarks stored per face
    pub max_face_landmarks: usize,
    /// Backing for the mapped region
    pub backing_type: BackingType,
    /// Path for file-backed channels
    pub file_path: Option<PathBuf>,
    /// Create (and zero) the region. When false an existing file-backed channel is attached.
    pub create: bool,
    /// Unix mode of a created channel file
    pub permissions: u32,
    /// Attempts per read before reporting no consistent frame
    pub read_attempts: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "handwave_frames".to_string(),
            max_hands: DEFAULT_MAX_HANDS,
            max_faces: DEFAULT_MAX_FACES,
            max_face_landmarks: DEFAULT_MAX_FACE_LANDMARKS,
            backing_type: BackingType::Anonymous,
            file_path: None,
            create: true,
            permissions: DEFAULT_REGION_PERMISSIONS,
            read_attempts: DEFAULT_READ_ATTEMPTS,
        }
    }
}

impl ChannelConfig {
    /// Create a configuration with a custom region name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of hands per frame
    pub fn with_max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands;
        self
    }

    /// Set the maximum number of faces per frame
    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = max_faces;
        self
    }

    /// Set the maximum number of landmarks per face
    pub fn with_max_face_landmarks(mut self, count: usize) -> Self {
        self.max_face_landmarks = count;
        self
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path (implies file-backed storage)
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self.backing_type = BackingType::FileBacked;
        self
    }

    /// Attach to a channel file another process created, keeping its contents
    pub fn attach_existing(mut self) -> Self {
        self.create = false;
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HandwaveError::invalid_parameter("name", "Channel name cannot be empty"));
        }
        if self.max_hands == 0 || self.max_hands > u8::MAX as usize {
            return Err(HandwaveError::invalid_parameter(
                "max_hands",
                "Must be between 1 and 255",
            ));
        }
        if self.max_faces > u8::MAX as usize {
            return Err(HandwaveError::invalid_parameter("max_faces", "Must be at most 255"));
        }
        if self.max_face_landmarks > u16::MAX as usize {
            return Err(HandwaveError::invalid_parameter(
                "max_face_landmarks",
                "Must fit in 16 bits",
            ));
        }
        if self.read_attempts == 0 {
            return Err(HandwaveError::invalid_parameter(
                "read_attempts",
                "At least one read attempt is required",
            ));
        }
        Ok(())
    }

    /// Region configuration for a channel of `size` bytes
    pub fn region_config(&self, size: usize) -> RegionConfig {
        let mut region = RegionConfig::new(self.name.clone(), size)
            .with_backing_type(self.backing_type)
            .with_permissions(self.permissions);
        if let Some(path) = &self.file_path {
            region = region.with_file_path(path.clone());
        }
        if !self.create {
            region = region.attach_existing();
        }
        region
    }
}
