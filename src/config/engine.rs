// src/config/engine.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::calibration::DEFAULT_RIDGE_LAMBDA;
use crate::revenue::{DEFAULT_MAX_BENCHMARK, DEFAULT_MIN_BENCHMARK};

// --- env defaults & names ---
pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/engine.toml";

pub const ENV_ENGINE_CONFIG_PATH: &str = "VALUE_ENGINE_CONFIG_PATH";
pub const ENV_RIDGE_LAMBDA: &str = "VALUE_ENGINE_RIDGE_LAMBDA";
pub const ENV_DEFAULT_MIN_BENCHMARK: &str = "VALUE_ENGINE_DEFAULT_MIN_BENCHMARK";
pub const ENV_DEFAULT_MAX_BENCHMARK: &str = "VALUE_ENGINE_DEFAULT_MAX_BENCHMARK";

fn default_min_benchmark() -> f64 {
    DEFAULT_MIN_BENCHMARK
}
fn default_max_benchmark() -> f64 {
    DEFAULT_MAX_BENCHMARK
}
fn default_ridge_lambda() -> f64 {
    DEFAULT_RIDGE_LAMBDA
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSection {
    #[serde(default = "default_min_benchmark")]
    pub default_min_benchmark: f64,
    #[serde(default = "default_max_benchmark")]
    pub default_max_benchmark: f64,
    #[serde(default = "default_ridge_lambda")]
    pub ridge_lambda: f64,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            default_min_benchmark: default_min_benchmark(),
            default_max_benchmark: default_max_benchmark(),
            ridge_lambda: default_ridge_lambda(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringSection,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s).context("parsing engine config TOML")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// `$VALUE_ENGINE_CONFIG_PATH` or `config/engine.toml`, then env overrides.
    /// A missing default file yields defaults; a missing explicit path is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = match env::var(ENV_ENGINE_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(&p)?,
            Err(_) if Path::new(DEFAULT_ENGINE_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_ENGINE_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_env_f64(ENV_RIDGE_LAMBDA).filter(|v| *v >= 0.0) {
            self.scoring.ridge_lambda = v;
        }
        if let Some(v) = parse_env_f64(ENV_DEFAULT_MIN_BENCHMARK).filter(|v| *v >= 0.0) {
            self.scoring.default_min_benchmark = v;
        }
        if let Some(v) = parse_env_f64(ENV_DEFAULT_MAX_BENCHMARK).filter(|v| *v >= 0.0) {
            self.scoring.default_max_benchmark = v;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        let s = &mut self.scoring;
        if !s.ridge_lambda.is_finite() || s.ridge_lambda < 0.0 {
            s.ridge_lambda = default_ridge_lambda();
        }
        if !s.default_min_benchmark.is_finite() || s.default_min_benchmark < 0.0 {
            s.default_min_benchmark = default_min_benchmark();
        }
        if !s.default_max_benchmark.is_finite() || s.default_max_benchmark < 0.0 {
            s.default_max_benchmark = default_max_benchmark();
        }
        if s.default_min_benchmark > s.default_max_benchmark {
            std::mem::swap(&mut s.default_min_benchmark, &mut s.default_max_benchmark);
        }
    }
}

// parse optional float env; unparsable or non-finite values are ignored
fn parse_env_f64(name: &str) -> Option<f64> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
