use crate::modules::roll::domain::codes::{CARDINAL_POINTS, WAY_LINKS, WAY_TYPES};
use deunicode::deunicode;
use std::collections::HashSet;

/// Transformation applied to a street name before a fuzzy lookup
pub trait StreetTransformation: Send + Sync {
    fn transform(&self, street: &str) -> String;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct LowercaseTransform;

impl StreetTransformation for LowercaseTransform {
    fn transform(&self, street: &str) -> String {
        street.to_lowercase()
    }

    fn name(&self) -> &'static str {
        "Lowercase"
    }
}

/// Drops elided articles (`l'`, `d'`) glued to the next word
#[derive(Debug, Clone)]
pub struct StripElisionsTransform;

impl StreetTransformation for StripElisionsTransform {
    fn transform(&self, street: &str) -> String {
        street
            .split_whitespace()
            .map(|word| {
                ["l'", "d'", "l’", "d’"]
                    .iter()
                    .find_map(|prefix| word.strip_prefix(prefix))
                    .unwrap_or(word)
            })
            .filter(|word| !word.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }

    fn name(&self) -> &'static str {
        "StripElisions"
    }
}

/// Removes whole words found in a lowercase word set
#[derive(Debug, Clone)]
pub struct RemoveWordsTransform {
    words: HashSet<String>,
}

impl RemoveWordsTransform {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .flat_map(|w| {
                    w.as_ref()
                        .split_whitespace()
                        .map(|part| part.trim_end_matches('\'').to_lowercase())
                        .collect::<Vec<_>>()
                })
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Way types and way links of the roll's code tables.
    pub fn way_words() -> Self {
        Self::new(
            WAY_TYPES
                .iter()
                .chain(WAY_LINKS.iter())
                .map(|(_, value)| *value),
        )
    }
}

impl StreetTransformation for RemoveWordsTransform {
    fn transform(&self, street: &str) -> String {
        street
            .split_whitespace()
            .filter(|word| !self.words.contains(*word))
            .collect::<Vec<&str>>()
            .join(" ")
    }

    fn name(&self) -> &'static str {
        "RemoveWords"
    }
}

/// Drops a trailing cardinal point, coded (`e`) or spelled out (`est`)
#[derive(Debug, Clone)]
pub struct DropTrailingCardinalTransform;

impl StreetTransformation for DropTrailingCardinalTransform {
    fn transform(&self, street: &str) -> String {
        let mut words: Vec<&str> = street.split_whitespace().collect();
        let is_cardinal = words.last().is_some_and(|last| {
            CARDINAL_POINTS
                .iter()
                .any(|(code, name)| code.eq_ignore_ascii_case(last) || name.eq_ignore_ascii_case(last))
        });
        if is_cardinal && words.len() > 1 {
            words.pop();
        }
        words.join(" ")
    }

    fn name(&self) -> &'static str {
        "DropTrailingCardinal"
    }
}

#[derive(Debug, Clone)]
pub struct StripAccentsTransform;

impl StreetTransformation for StripAccentsTransform {
    fn transform(&self, street: &str) -> String {
        deunicode(street)
    }

    fn name(&self) -> &'static str {
        "StripAccents"
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeWhitespaceTransform;

impl StreetTransformation for NormalizeWhitespaceTransform {
    fn transform(&self, street: &str) -> String {
        street.split_whitespace().collect::<Vec<&str>>().join(" ")
    }

    fn name(&self) -> &'static str {
        "NormalizeWhitespace"
    }
}

/// Pipeline of street transformations, applied in insertion order.
pub struct StreetNormalizer {
    transformations: Vec<Box<dyn StreetTransformation>>,
}

impl StreetNormalizer {
    pub fn new() -> Self {
        Self {
            transformations: Vec::new(),
        }
    }

    /// Reduces a street to its distinctive words, e.g.
    /// `Rue de l'Église Est` to `eglise`.
    pub fn for_lookup() -> Self {
        Self::new()
            .with(LowercaseTransform)
            .with(StripElisionsTransform)
            .with(RemoveWordsTransform::way_words())
            .with(DropTrailingCardinalTransform)
            .with(StripAccentsTransform)
            .with(NormalizeWhitespaceTransform)
    }

    pub fn with(mut self, transformation: impl StreetTransformation + 'static) -> Self {
        self.transformations.push(Box::new(transformation));
        self
    }

    pub fn normalize(&self, street: &str) -> String {
        let mut result = street.to_string();

        for transformation in &self.transformations {
            result = transformation.transform(&result);
            log::trace!("After {}: '{}'", transformation.name(), result);
        }

        result
    }

    pub fn transformation_count(&self) -> usize {
        self.transformations.len()
    }
}

impl Default for StreetNormalizer {
    fn default() -> Self {
        Self::for_lookup()
    }
}
