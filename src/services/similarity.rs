/// Similarity ranking for the discovery fallback pass
///
/// The score combines two set-intersection cardinalities with two absolute
/// distances. It is an opaque ordering key: the fallback pass iterates score
/// groups from highest to lowest, and that direction is part of the contract.
use std::collections::HashSet;

use crate::models::{DiscoveryCriteria, FilmCandidate};

/// The four features similarity is computed over
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTuple {
    pub genres: HashSet<i64>,
    pub year: i64,
    pub cast: HashSet<String>,
    pub runtime: i64,
}

impl FeatureTuple {
    /// Target features from discovery criteria.
    ///
    /// Absent fields degrade to the empty set or zero so scoring stays total;
    /// `actor_name` is the resolved canonical cast name, so the cast-overlap
    /// term compares names to names.
    pub fn from_criteria(
        criteria: &DiscoveryCriteria,
        genre_id: Option<i64>,
        actor_name: Option<&str>,
    ) -> Self {
        Self {
            genres: genre_id.into_iter().collect(),
            year: criteria.release_year.unwrap_or(0) as i64,
            cast: actor_name.map(str::to_string).into_iter().collect(),
            runtime: criteria.min_runtime.unwrap_or(0),
        }
    }

    pub fn from_candidate(candidate: &FilmCandidate) -> Self {
        Self {
            genres: candidate.genre_ids.iter().copied().collect(),
            year: candidate.release_year as i64,
            cast: candidate.cast.iter().cloned().collect(),
            runtime: candidate.runtime_minutes,
        }
    }
}

/// Scores a candidate against the target features.
///
/// score = |genre intersection| + |year distance| + |cast intersection|
///       + |runtime distance|
///
/// Pure and deterministic; every term is invariant to argument order, so
/// score(a, b) == score(b, a).
pub fn score(target: &FeatureTuple, candidate: &FeatureTuple) -> i64 {
    let genre_overlap = target.genres.intersection(&candidate.genres).count() as i64;
    let year_distance = (target.year - candidate.year).abs();
    let cast_overlap = target.cast.intersection(&candidate.cast).count() as i64;
    let runtime_distance = (target.runtime - candidate.runtime).abs();

    genre_overlap + year_distance + cast_overlap + runtime_distance
}
