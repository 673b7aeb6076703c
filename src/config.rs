//! Algebra configuration.
//!
//! [`AlgebraConfig`] collects the knobs collaborators tune when they build
//! vectors in bulk: which accelerator a sparse vector gets and which dense
//! kernel runs the fast paths. It is TOML-loadable so pipelines can keep it
//! next to their own settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simd::{self, DenseKernel};
use crate::vector::sparse::AcceleratorKind;

/// Dense kernel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelChoice {
    /// Best kernel detected for the running CPU.
    #[default]
    Auto,
    /// Scalar reference kernel (reproducible summation order).
    Generic,
}

/// Accelerator policy for new sparse vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorPolicy {
    /// Plain binary search, no accelerator.
    None,
    /// Always the dense index → location array.
    Array,
    /// Always the index → location hash map.
    Hash,
    /// Array when the index domain is dense enough, hash otherwise.
    #[default]
    Auto,
}

/// Configuration for vector construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgebraConfig {
    /// Accelerator policy for vectors built through this config.
    pub default_accelerator: AcceleratorPolicy,
    /// Minimum `present / (max_index + 1)` ratio at which `Auto` picks the
    /// array accelerator.
    pub hash_density_threshold: f64,
    /// Dense kernel selection, handed to the `*_with` operations through
    /// [`AlgebraConfig::dense_kernel`].
    pub kernel: KernelChoice,
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            default_accelerator: AcceleratorPolicy::Auto,
            hash_density_threshold: 0.05,
            kernel: KernelChoice::Auto,
        }
    }
}

impl AlgebraConfig {
    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        if !(0.0..=1.0).contains(&config.hash_density_threshold) {
            return Err(ConfigError::Parse {
                message: format!(
                    "hash_density_threshold must lie in [0, 1], got {}",
                    config.hash_density_threshold
                ),
            });
        }
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// The dense kernel selected by `kernel`.
    pub fn dense_kernel(&self) -> &'static dyn DenseKernel {
        simd::kernel_for(self.kernel)
    }

    /// Pick the accelerator for a vector with `present` entries whose largest
    /// index is `max_index`.
    pub fn choose_accelerator(&self, max_index: Option<usize>, present: usize) -> AcceleratorKind {
        match self.default_accelerator {
            AcceleratorPolicy::None => AcceleratorKind::None,
            AcceleratorPolicy::Array => AcceleratorKind::Array,
            AcceleratorPolicy::Hash => AcceleratorKind::Hash,
            AcceleratorPolicy::Auto => {
                let Some(max_index) = max_index else {
                    return AcceleratorKind::None;
                };
                let density = present as f64 / (max_index as f64 + 1.0);
                if density >= self.hash_density_threshold {
                    AcceleratorKind::Array
                } else {
                    AcceleratorKind::Hash
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_toml() {
        let config = AlgebraConfig::from_toml_str("").unwrap();
        assert_eq!(config, AlgebraConfig::default());
    }

    #[test]
    fn parse_overrides() {
        let config = AlgebraConfig::from_toml_str(
            "default_accelerator = \"hash\"\nkernel = \"generic\"\nhash_density_threshold = 0.5\n",
        )
        .unwrap();
        assert_eq!(config.default_accelerator, AcceleratorPolicy::Hash);
        assert_eq!(config.kernel, KernelChoice::Generic);
        assert!((config.hash_density_threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let err = AlgebraConfig::from_toml_str("hash_density_threshold = 2.0").unwrap_err();
        assert!(err.to_string().contains("hash_density_threshold"));
    }

    #[test]
    fn toml_roundtrip() {
        let config = AlgebraConfig {
            default_accelerator: AcceleratorPolicy::Array,
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(AlgebraConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn generic_kernel_selected() {
        let config = AlgebraConfig {
            kernel: KernelChoice::Generic,
            ..Default::default()
        };
        assert_eq!(config.dense_kernel().dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
    }

    #[test]
    fn auto_policy_by_density() {
        let config = AlgebraConfig::default();
        // 10 present out of 20 possible: dense enough for an array.
        assert_eq!(config.choose_accelerator(Some(19), 10), AcceleratorKind::Array);
        // 10 present out of a million: hash.
        assert_eq!(config.choose_accelerator(Some(999_999), 10), AcceleratorKind::Hash);
        assert_eq!(config.choose_accelerator(None, 0), AcceleratorKind::None);
    }
}
