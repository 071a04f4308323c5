use super::types::Config;
use crate::error::{EstimatorError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the config at `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Config::load(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the azcost home directory (~/.azcost/)
    pub fn get_home_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            home.join(".azcost")
        } else {
            PathBuf::from(".azcost")
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Config> {
        let config_path = Self::get_config_path();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        ConfigLoader::load_from_path(config_path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path (~/.azcost/config.toml)
    pub fn get_config_path() -> PathBuf {
        ConfigLoader::get_home_path().join("config.toml")
    }

    /// Default pricing cache location (~/.azcost/pricing_cache.json)
    pub fn pricing_cache_path(&self) -> PathBuf {
        self.pricing
            .cache_file
            .clone()
            .unwrap_or_else(|| ConfigLoader::get_home_path().join("pricing_cache.json"))
    }

    /// Initialize config directory and create default config
    pub fn init(path: Option<&Path>) -> Result<()> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);

        if !config_path.exists() {
            Config::default().save_to(&config_path)?;
            println!("Created config at {}", config_path.display());
        } else {
            println!("Config already exists at {}", config_path.display());
        }

        Ok(())
    }

    /// Validate configuration
    pub fn check(&self) -> Result<()> {
        let fail = |msg: String| Err(EstimatorError::Config(msg));

        if self.sampling.days_to_analyze == 0 {
            return fail("sampling.days_to_analyze must be greater than 0".to_string());
        }
        if self.sampling.sample_size == 0 {
            return fail("sampling.sample_size must be greater than 0".to_string());
        }

        let est = &self.estimation;
        if est.default_entry_size_kb <= 0.0 {
            return fail("estimation.default_entry_size_kb must be positive".to_string());
        }
        if est.throughput_unit_mb_per_sec <= 0.0
            || est.throughput_unit_events_per_sec <= 0.0
            || est.instance_events_per_sec <= 0.0
        {
            return fail("estimation capacities must be positive".to_string());
        }
        if est.min_throughput_units > est.max_throughput_units {
            return fail(format!(
                "estimation.min_throughput_units ({}) exceeds max_throughput_units ({})",
                est.min_throughput_units, est.max_throughput_units
            ));
        }
        if est.min_instances > est.max_instances {
            return fail(format!(
                "estimation.min_instances ({}) exceeds max_instances ({})",
                est.min_instances, est.max_instances
            ));
        }
        if self.pricing.cache_ttl_hours < 0 {
            return fail("pricing.cache_ttl_hours must not be negative".to_string());
        }
        if self.pricing.default_region.trim().is_empty() {
            return fail("pricing.default_region must not be empty".to_string());
        }
        if self.execution.parallel && self.execution.max_parallel_jobs == 0 {
            return fail("execution.max_parallel_jobs must be greater than 0".to_string());
        }

        let classification = &self.classification;
        for (kind, rules) in [
            ("environments", &classification.environments),
            ("business_units", &classification.business_units),
        ] {
            let mut seen = HashSet::new();
            for rule in rules {
                if rule.name.trim().is_empty() {
                    return fail(format!("classification.{} has a rule without a name", kind));
                }
                if !seen.insert(rule.name.as_str()) {
                    return fail(format!(
                        "classification.{} has duplicate rule: {}",
                        kind, rule.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Print configuration as TOML
    pub fn print(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        println!("{}", content);
        Ok(())
    }
}
