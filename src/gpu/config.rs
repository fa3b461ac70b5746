#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

/// Overrides [`DeviceInfo::validate_layouts`] when set to `0` or `1`.
pub const VALIDATION_ENV: &str = "TESSERA_VALIDATION";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "tessera-serde", serde(default))]
pub struct DeviceInfo {
    pub debug_name: String,
    pub backbuffer_size: [u32; 2],
    /// Check primitive buffers against the pipeline's attribute layout
    /// before every draw.
    pub validate_layouts: bool,
    /// Slots reserved up front in every resource pool.
    pub initial_pool_capacity: usize,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            debug_name: "tessera".to_string(),
            backbuffer_size: [1280, 720],
            validate_layouts: true,
            initial_pool_capacity: 64,
        }
    }
}

impl DeviceInfo {
    /// Applies overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var(VALIDATION_ENV) {
            match v.trim() {
                "0" => self.validate_layouts = false,
                "1" => self.validate_layouts = true,
                other => log::warn!("ignoring {VALIDATION_ENV}={other}, expected 0 or 1"),
            }
        }
        self
    }
}

#[cfg(feature = "tessera-serde")]
mod serde_support {
    use anyhow::Context as _;

    use super::DeviceInfo;

    impl DeviceInfo {
        pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
            serde_yaml::from_str(s)
        }

        pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading device config '{path}'"))?;
            Self::from_yaml(&text).with_context(|| format!("parsing device config '{path}'"))
        }
    }
}
