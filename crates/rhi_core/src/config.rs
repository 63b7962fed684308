//! Render system configuration
//!
//! [`RenderConfig`] collects every start-up tunable: surface parameters,
//! the frame buffering depth, and the fixed capacities of the resource
//! pools. Configurations load from TOML or RON files and validate their
//! structural invariants before the system accepts them.

use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Structural invariant violated
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed capacities for the resource pools.
///
/// These are capacity-planning inputs: exceeding one at runtime is a fatal
/// assertion, not a recoverable error, so size them for the worst frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    /// Vertex buffer pool size
    pub vertex_buffers: usize,
    /// Index buffer pool size
    pub index_buffers: usize,
    /// Constant buffer pool size
    pub const_buffers: usize,
    /// Texture pool size
    pub textures: usize,
    /// Pipeline state pool size
    pub pipeline_states: usize,
    /// Depth/stencil state pool size
    pub depth_stencil_states: usize,
    /// Sampler state pool size
    pub sampler_states: usize,
    /// Texture set pool size
    pub texture_sets: usize,
    /// Packet list pool size
    pub packet_lists: usize,
    /// Render pass pool size
    pub render_passes: usize,
    /// Command buffer pool size
    pub command_buffers: usize,
    /// Sync object pool size
    pub sync_objects: usize,
    /// Query buffer pool size
    pub query_buffers: usize,
    /// Performance query pool size
    pub perf_queries: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            vertex_buffers: 2048,
            index_buffers: 2048,
            const_buffers: 4096,
            textures: 2048,
            pipeline_states: 512,
            depth_stencil_states: 128,
            sampler_states: 128,
            texture_sets: 1024,
            packet_lists: 256,
            render_passes: 128,
            command_buffers: 512,
            sync_objects: 256,
            query_buffers: 64,
            perf_queries: 256,
        }
    }
}

/// Start-up configuration for [`crate::RenderSystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Initial surface width
    pub width: u32,
    /// Initial surface height
    pub height: u32,
    /// Whether the surface is fullscreen
    pub fullscreen: bool,
    /// Whether presentation waits for vertical sync
    pub vsync: bool,
    /// Number of frame slots in the frame ring (also the scheduled-deletion
    /// bucket count)
    pub frame_pool_size: u32,
    /// Frame buffering depth for the dedicated render thread; 0 selects
    /// inline execution on the presenting thread
    pub render_thread_frame_count: u32,
    /// Resource pool capacities
    pub pools: PoolCapacities,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            fullscreen: false,
            vsync: true,
            frame_pool_size: 16,
            render_thread_frame_count: 0,
            pools: PoolCapacities::default(),
        }
    }
}

impl RenderConfig {
    /// Configuration for inline (single-threaded) execution.
    #[must_use]
    pub fn inline() -> Self {
        Self::default()
    }

    /// Configuration for a dedicated render thread buffering `frame_count`
    /// frames.
    #[must_use]
    pub fn threaded(frame_count: u32) -> Self {
        Self {
            render_thread_frame_count: frame_count,
            ..Self::default()
        }
    }

    /// Set the initial surface size.
    #[must_use]
    pub fn with_surface(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the frame ring size.
    #[must_use]
    pub fn with_frame_pool_size(mut self, size: u32) -> Self {
        self.frame_pool_size = size;
        self
    }

    /// Load configuration from a `.toml` or `.ron` file.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        let config: Self = if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a `.toml` or `.ron` file.
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check structural invariants.
    ///
    /// The frame ring must exist, and the buffering depth can never exceed
    /// it: the scheduled-deletion buckets are allocated one per ring slot,
    /// and a bucket must not be re-armed while the frame that fences it is
    /// still in flight. The ring also needs one slack slot so the frame
    /// being recorded never aliases the frame being executed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "frame_pool_size must be at least 1".to_string(),
            ));
        }
        if self.render_thread_frame_count >= self.frame_pool_size {
            return Err(ConfigError::Invalid(format!(
                "render_thread_frame_count ({}) must be less than frame_pool_size ({})",
                self.render_thread_frame_count, self.frame_pool_size
            )));
        }
        if self.pools.packet_lists == 0 || self.pools.texture_sets == 0 {
            return Err(ConfigError::Invalid(
                "pool capacities must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
        assert!(RenderConfig::threaded(2).validate().is_ok());
    }

    #[test]
    fn test_buffering_depth_must_fit_frame_ring() {
        let config = RenderConfig::threaded(16); // equals default ring size
        assert!(config.validate().is_err());

        let config = RenderConfig::threaded(3).with_frame_pool_size(4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_frame_pool_rejected() {
        let config = RenderConfig::default().with_frame_pool_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = std::env::temp_dir().join("rhi_core_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("render.toml");
        let path = path.to_str().unwrap();

        let config = RenderConfig::threaded(2)
            .with_surface(1280, 720)
            .with_frame_pool_size(8);
        config.save_to_file(path).unwrap();

        let loaded = RenderConfig::load_from_file(path).unwrap();
        assert_eq!(loaded.width, 1280);
        assert_eq!(loaded.height, 720);
        assert_eq!(loaded.frame_pool_size, 8);
        assert_eq!(loaded.render_thread_frame_count, 2);
    }

    #[test]
    fn test_unsupported_format_rejected() {
        assert!(matches!(
            RenderConfig::load_from_file("render.yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
