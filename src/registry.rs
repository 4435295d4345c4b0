//! Strategy registry: ordered capability matching over converters.
//!
//! Strategies are registered once at service construction and the list is
//! immutable afterwards. Resolution returns the **first** strategy whose
//! capability predicate matches, so registration order is configuration:
//! specific matchers go in before generic ones. Given the same registry and
//! the same `(media_type, filename)` pair, resolution always selects the
//! same strategy.
//!
//! PDF passthrough never reaches the registry; the service short-circuits
//! it with a byte copy.

use crate::error::DocpressError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A single conversion strategy.
///
/// `convert` must uphold the atomicity invariant: the destination path only
/// ever becomes visible as a complete PDF. Implementations write to a
/// temporary location and rename into place on success.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Stable identifier, used in logs and error causes.
    fn name(&self) -> &'static str;

    /// Capability predicate. `media_type` is the content-sniffed type;
    /// `filename` is the caller's declared name, usable only as a secondary
    /// hint for ambiguous content.
    fn supports(&self, media_type: &str, filename: &str) -> bool;

    /// Produce a PDF at `dest` from the document at `source`.
    async fn convert(&self, source: &Path, dest: &Path) -> Result<(), DocpressError>;
}

/// Ordered, immutable set of conversion strategies.
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new(converters: Vec<Arc<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// First registered strategy whose predicate matches, or `None`.
    pub fn resolve(&self, media_type: &str, filename: &str) -> Option<Arc<dyn Converter>> {
        let found = self
            .converters
            .iter()
            .find(|c| c.supports(media_type, filename))
            .cloned();
        match &found {
            Some(c) => debug!(strategy = c.name(), media_type, "strategy resolved"),
            None => debug!(media_type, filename, "no strategy matched"),
        }
        found
    }

    /// Names of the registered strategies, in resolution order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeConverter {
        name: &'static str,
        matches: &'static str,
    }

    #[async_trait]
    impl Converter for FakeConverter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, media_type: &str, _filename: &str) -> bool {
            media_type.starts_with(self.matches)
        }

        async fn convert(&self, _source: &Path, _dest: &Path) -> Result<(), DocpressError> {
            Ok(())
        }
    }

    fn registry() -> ConverterRegistry {
        ConverterRegistry::new(vec![
            Arc::new(FakeConverter {
                name: "specific",
                matches: "text/csv",
            }),
            Arc::new(FakeConverter {
                name: "generic",
                matches: "text/",
            }),
        ])
    }

    #[test]
    fn first_match_wins() {
        let r = registry();
        assert_eq!(r.resolve("text/csv", "data.csv").unwrap().name(), "specific");
        assert_eq!(r.resolve("text/plain", "a.txt").unwrap().name(), "generic");
    }

    #[test]
    fn resolution_is_deterministic() {
        let r = registry();
        for _ in 0..10 {
            assert_eq!(r.resolve("text/csv", "data.csv").unwrap().name(), "specific");
        }
    }

    #[test]
    fn no_match_is_none() {
        let r = registry();
        assert!(r.resolve("application/zip", "a.zip").is_none());
    }

    #[test]
    fn names_follow_registration_order() {
        assert_eq!(registry().strategy_names(), vec!["specific", "generic"]);
    }
}
