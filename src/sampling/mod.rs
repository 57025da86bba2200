//! Batch source sampling
//!
//! Batch ingestion requests carry a directory path in their body. The sampler
//! holds the candidate paths and picks one at random per request, so a run can
//! spread load across several mailbox folders.

use anyhow::{Context, Result};
use rand::Rng;
use std::fs;
use std::path::Path;

/// Sampler over batch source directory paths (never empty)
#[derive(Debug, Clone)]
pub struct SourceSampler {
    sources: Vec<String>,
}

impl SourceSampler {
    /// Load source paths from a file, one per line
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sources file: {}", path.display()))?;

        let sources: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        if sources.is_empty() {
            anyhow::bail!("No batch sources found in file: {}", path.display());
        }

        Ok(Self { sources })
    }

    /// Create a sampler from a list of paths
    pub fn from_sources(sources: Vec<String>) -> Result<Self> {
        if sources.is_empty() {
            anyhow::bail!("At least one batch source is required");
        }
        Ok(Self { sources })
    }

    /// Create a sampler with a single path
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
        }
    }

    /// Sample a random source path
    pub fn sample(&self) -> &str {
        if self.sources.len() == 1 {
            return &self.sources[0];
        }
        let idx = rand::thread_rng().gen_range(0..self.sources.len());
        &self.sources[idx]
    }

    /// Get a specific source by index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.sources.get(index).map(|s| s.as_str())
    }

    /// All source paths
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Get the number of sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sampler_from_source() {
        let sampler = SourceSampler::from_source("C:/TestEmails");
        assert_eq!(sampler.len(), 1);
        assert_eq!(sampler.sample(), "C:/TestEmails");
    }

    #[test]
    fn test_sampler_from_file_skips_blanks_and_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# mailbox folders").unwrap();
        writeln!(file, "/data/inbox-small").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  /data/inbox-large  ").unwrap();

        let sampler = SourceSampler::from_file(file.path()).unwrap();
        assert_eq!(sampler.len(), 2);
        assert_eq!(sampler.get(1), Some("/data/inbox-large"));

        let sample = sampler.sample();
        assert!(sample == "/data/inbox-small" || sample == "/data/inbox-large");
    }

    #[test]
    fn test_sampler_from_empty_file_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        assert!(SourceSampler::from_file(file.path()).is_err());
    }

    #[test]
    fn test_sampler_from_empty_list_fails() {
        assert!(SourceSampler::from_sources(vec![]).is_err());
    }
}
