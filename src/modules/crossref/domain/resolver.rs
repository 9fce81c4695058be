//! Per-worker municipality and street resolution with memoization.
//!
//! Failures are cached too, so a name that cannot be resolved costs at most
//! one similarity query per worker run.

use super::repository::RegistryLookup;
use super::similarity::{best_candidate, JaroWinklerStrategy, SimilarityStrategy};
use super::street_normalizer::StreetNormalizer;
use crate::log_debug;
use crate::shared::errors::AppResult;
use std::collections::{HashMap, HashSet};

/// Minimum trigram similarity accepted from the registry.
pub const SIMILARITY_THRESHOLD: f32 = 0.3;

pub struct NameResolver<L: RegistryLookup> {
    lookup: L,
    known_munis: Option<HashSet<String>>,
    munis: HashMap<String, String>,
    missing_munis: HashSet<String>,
    streets: HashMap<(String, String), Option<String>>,
    normalizer: StreetNormalizer,
    strategy: Box<dyn SimilarityStrategy>,
    similarity_queries: u64,
}

impl<L: RegistryLookup> NameResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            known_munis: None,
            munis: HashMap::new(),
            missing_munis: HashSet::new(),
            streets: HashMap::new(),
            normalizer: StreetNormalizer::for_lookup(),
            strategy: Box::new(JaroWinklerStrategy),
            similarity_queries: 0,
        }
    }

    /// Trigram queries issued so far.
    pub fn similarity_queries(&self) -> u64 {
        self.similarity_queries
    }

    pub async fn resolve_municipality(&mut self, name: &str) -> AppResult<Option<String>> {
        if self.known_munis.is_none() {
            let known = self.lookup.known_municipalities().await?;
            self.known_munis = Some(known.into_iter().collect());
        }
        if self
            .known_munis
            .as_ref()
            .is_some_and(|known| known.contains(name))
        {
            return Ok(Some(name.to_string()));
        }
        if let Some(resolved) = self.munis.get(name) {
            return Ok(Some(resolved.clone()));
        }
        if self.missing_munis.contains(name) {
            return Ok(None);
        }

        self.similarity_queries += 1;
        let candidates = self.accepted(self.lookup.similar_municipalities(name).await?);
        match best_candidate(name, &candidates, self.strategy.as_ref()) {
            Some(resolved) => {
                log_debug!("municipality '{}' resolved to '{}'", name, resolved);
                self.munis.insert(name.to_string(), resolved.to_string());
                Ok(Some(resolved.to_string()))
            }
            None => {
                self.missing_munis.insert(name.to_string());
                Ok(None)
            }
        }
    }

    /// Full registry spelling of a possibly truncated street name, scoped
    /// to a resolved municipality.
    pub async fn resolve_street(&mut self, muni: &str, street: &str) -> AppResult<Option<String>> {
        let key = (muni.to_string(), street.to_string());
        if let Some(cached) = self.streets.get(&key) {
            return Ok(cached.clone());
        }

        let resolved = self.lookup_street(muni, street).await?;
        if resolved.is_none() {
            log_debug!("street '{}' not found in {}", street, muni);
        }
        self.streets.insert(key, resolved.clone());
        Ok(resolved)
    }

    async fn lookup_street(&mut self, muni: &str, street: &str) -> AppResult<Option<String>> {
        if let Some(found) = self.lookup.street_with_prefix(muni, street).await? {
            return Ok(Some(found));
        }

        let stripped = self.normalizer.normalize(street);
        if !stripped.is_empty() {
            if let Some(found) = self.lookup.street_containing(muni, &stripped).await? {
                return Ok(Some(found));
            }
        }

        self.similarity_queries += 1;
        let candidates = self.accepted(self.lookup.similar_streets(muni, street).await?);
        Ok(best_candidate(street, &candidates, self.strategy.as_ref()).map(str::to_string))
    }

    fn accepted(&self, candidates: Vec<(String, f32)>) -> Vec<(String, f32)> {
        candidates
            .into_iter()
            .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
            .collect()
    }
}
