//! URL handling module for Site-Sync
//!
//! This module provides URL normalization, site-root handling with
//! same-site checks, and exclude-pattern matching.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, SiteRoot};
pub use matcher::ExcludeMatcher;
pub use normalize::{
    has_binary_extension, normalize_url, normalize_url_with, parse_normalized, NormalizeOptions,
};
