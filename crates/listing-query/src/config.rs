//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

use crate::listing::{DEFAULT_LIMIT, ListingKind, MAX_LIMIT, PageLimits, PercentagePolicy};

/// Translation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Largest page size accepted (default: 100).
    pub max_limit: u32,

    /// Page size when the caller omits one (default: 10).
    pub default_limit: u32,

    /// Skill-share denominator (default: grand_total).
    pub percentage_policy: PercentagePolicy,

    /// Listing kind used when none is given (default: job).
    pub kind: ListingKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_limit: MAX_LIMIT,
            default_limit: DEFAULT_LIMIT,
            percentage_policy: PercentagePolicy::default(),
            kind: ListingKind::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Page size bounds for parsing incoming requests.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_limit = match lookup("LISTING_MAX_LIMIT") {
            Some(v) => v
                .trim()
                .parse()
                .context("LISTING_MAX_LIMIT must be a valid u32")?,
            None => MAX_LIMIT,
        };

        let default_limit = match lookup("LISTING_DEFAULT_LIMIT") {
            Some(v) => v
                .trim()
                .parse()
                .context("LISTING_DEFAULT_LIMIT must be a valid u32")?,
            None => DEFAULT_LIMIT,
        };

        let percentage_policy = match lookup("LISTING_PERCENTAGE_POLICY") {
            Some(v) => v
                .parse()
                .context("LISTING_PERCENTAGE_POLICY must be grand_total or per_group")?,
            None => PercentagePolicy::default(),
        };

        let kind = match lookup("LISTING_KIND") {
            Some(v) => v.parse().context("LISTING_KIND must be job or program")?,
            None => ListingKind::default(),
        };

        if max_limit < 1 {
            bail!("LISTING_MAX_LIMIT must be at least 1");
        }
        if default_limit < 1 || default_limit > max_limit {
            bail!("LISTING_DEFAULT_LIMIT must be between 1 and LISTING_MAX_LIMIT ({max_limit})");
        }

        Ok(Self {
            max_limit,
            default_limit,
            percentage_policy,
            kind,
        })
    }
}
