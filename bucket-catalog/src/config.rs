use crate::error::{Error, Result};
use bucket_layout::ScanConfig;
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_SERVICE_NAME: &str = "s3_catalog";
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const MAX_WORKERS_LIMIT: usize = 64;

pub mod options {
    pub const BUCKET_NAME: &str = "bucketName";
    pub const SERVICE_NAME: &str = "serviceName";
    pub const MAX_WORKERS: &str = "maxWorkers";
}

/// Settings for one ingestion pass over a bucket.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    bucket_name: String,
    service_name: String,
    max_workers: usize,
    scan: ScanConfig,
}

impl IngestConfig {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            scan: ScanConfig::default(),
        }
    }

    /// Load from a string option map.
    ///
    /// `bucketName` is required. Scan options are read from the same map, see
    /// [`ScanConfig::from_options`].
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Self> {
        let bucket_name = opts
            .get(options::BUCKET_NAME)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config(format!("{} is a required field", options::BUCKET_NAME)))?;

        let mut config = Self::new(bucket_name).with_scan(ScanConfig::from_options(opts)?);

        if let Some(service) = opts
            .get(options::SERVICE_NAME)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            config.service_name = service.to_string();
        }

        if let Some(raw) = opts.get(options::MAX_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(workers) => config = config.with_max_workers(workers),
                Err(_) => warn!(
                    option = options::MAX_WORKERS,
                    value = %raw,
                    default = DEFAULT_MAX_WORKERS,
                    "Unparseable option, using default"
                ),
            }
        }

        Ok(config)
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        let clamped = workers.clamp(1, MAX_WORKERS_LIMIT);
        if clamped != workers {
            warn!(
                option = options::MAX_WORKERS,
                value = workers,
                clamped = clamped,
                "Option out of range, clamping"
            );
        }
        self.max_workers = clamped;
        self
    }

    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Fail on anything that would make a pass meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} is a required field",
                options::BUCKET_NAME
            )));
        }
        self.scan.validate()?;
        Ok(())
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn scan(&self) -> &ScanConfig {
        &self.scan
    }
}
