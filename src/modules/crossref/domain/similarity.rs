use strsim::{jaro_winkler, normalized_levenshtein};

/// Similarity between two names, from 0.0 (unrelated) to 1.0 (identical).
pub trait SimilarityStrategy: Send + Sync {
    fn calculate(&self, query: &str, target: &str) -> f64;
    fn name(&self) -> &'static str;
}

/// Weighs shared prefixes, which suits municipality and street names.
#[derive(Debug, Clone)]
pub struct JaroWinklerStrategy;

impl SimilarityStrategy for JaroWinklerStrategy {
    fn calculate(&self, query: &str, target: &str) -> f64 {
        jaro_winkler(&query.to_lowercase(), &target.to_lowercase())
    }

    fn name(&self) -> &'static str {
        "JaroWinkler"
    }
}

#[derive(Debug, Clone)]
pub struct LevenshteinStrategy;

impl SimilarityStrategy for LevenshteinStrategy {
    fn calculate(&self, query: &str, target: &str) -> f64 {
        normalized_levenshtein(&query.to_lowercase(), &target.to_lowercase())
    }

    fn name(&self) -> &'static str {
        "Levenshtein"
    }
}

/// Best candidate among database suggestions ranked by trigram score.
///
/// Candidates tied on the database score are ordered by `strategy`; an
/// empty list yields `None`.
pub fn best_candidate<'a>(
    query: &str,
    candidates: &'a [(String, f32)],
    strategy: &dyn SimilarityStrategy,
) -> Option<&'a str> {
    candidates
        .iter()
        .max_by(|(a_name, a_score), (b_name, b_score)| {
            a_score.total_cmp(b_score).then_with(|| {
                strategy
                    .calculate(query, a_name)
                    .total_cmp(&strategy.calculate(query, b_name))
            })
        })
        .map(|(name, _)| name.as_str())
}
