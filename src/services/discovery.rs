/// Discovery engine
///
/// Collects up to a fixed quota of films from the paginated discover endpoint,
/// enriching each row with runtime and cast. When pagination under-delivers,
/// a fallback pass ranks the collected candidates by similarity score and
/// re-adds them, highest score group first, until the quota is met or the
/// groups run out.
use std::collections::{BTreeMap, HashMap};

use crate::{
    error::AppResult,
    models::{DiscoveryCriteria, FilmCandidate, MovieSummary},
    services::{
        similarity::{score, FeatureTuple},
        tmdb::{DiscoverFilters, MetadataProvider},
    },
};

/// Target number of films a single discovery call attempts to return
pub const CANDIDATE_QUOTA: usize = 10;

/// Highest page the discover endpoint is ever asked for
pub const MAX_PAGE: u32 = 500;

const CAST_LIMIT: usize = 2;

/// What one discovery call produced
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub candidates: Vec<FilmCandidate>,
    /// Pagination stopped on a remote error; the candidates gathered before
    /// the failure are still present.
    pub aborted: bool,
    /// The similarity fallback pass ran because pagination under-delivered.
    pub fallback_ran: bool,
}

/// Candidates keyed by title: a title already present is never added twice,
/// and insertion order is preserved.
#[derive(Debug, Default)]
struct CandidateSet {
    items: Vec<FilmCandidate>,
    titles: std::collections::HashSet<String>,
}

impl CandidateSet {
    fn insert(&mut self, candidate: FilmCandidate) -> bool {
        if !self.titles.insert(candidate.title.clone()) {
            return false;
        }
        self.items.push(candidate);
        true
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn iter(&self) -> impl Iterator<Item = &FilmCandidate> {
        self.items.iter()
    }

    fn into_vec(self) -> Vec<FilmCandidate> {
        self.items
    }
}

pub struct DiscoveryEngine<'a> {
    provider: &'a dyn MetadataProvider,
    genres: &'a HashMap<String, i64>,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, genres: &'a HashMap<String, i64>) -> Self {
        Self { provider, genres }
    }

    /// Runs one discovery call for the given criteria.
    ///
    /// Absent criteria fields simply drop the corresponding remote filter; an
    /// actor or genre name with no match resolves to no filter rather than an
    /// error.
    pub async fn discover(&self, criteria: &DiscoveryCriteria) -> AppResult<DiscoveryOutcome> {
        let actor = match criteria.actor.as_deref() {
            Some(name) => self.provider.search_person(name).await?,
            None => None,
        };
        let genre_id = criteria.genre.as_deref().and_then(|name| self.lookup_genre(name));

        let filters = DiscoverFilters {
            genre_id,
            actor_id: actor.as_ref().map(|person| person.id),
            primary_release_year: criteria.release_year,
            min_runtime: criteria.min_runtime,
        };

        let mut collected = CandidateSet::default();
        let mut aborted = false;

        let mut page = 1;
        while collected.len() < CANDIDATE_QUOTA && page <= MAX_PAGE {
            let rows = match self.provider.discover(page, &filters).await {
                Ok(rows) => rows,
                Err(error) => {
                    tracing::error!(page, %error, "Error fetching data from discover endpoint");
                    aborted = true;
                    break;
                }
            };

            for row in rows {
                if collected.len() >= CANDIDATE_QUOTA {
                    break;
                }
                if let Some(candidate) = self.enrich(row).await {
                    collected.insert(candidate);
                }
            }

            page += 1;
        }

        let mut fallback_ran = false;
        if collected.len() < CANDIDATE_QUOTA {
            fallback_ran = true;
            let target = FeatureTuple::from_criteria(
                criteria,
                genre_id,
                actor.as_ref().map(|person| person.name.as_str()),
            );
            backfill_closest(&mut collected, &target);
        }

        tracing::info!(
            candidates = collected.len(),
            aborted,
            fallback_ran,
            "Discovery completed"
        );

        Ok(DiscoveryOutcome {
            candidates: collected.into_vec(),
            aborted,
            fallback_ran,
        })
    }

    /// Genre names are matched exactly first, then case-insensitively
    fn lookup_genre(&self, name: &str) -> Option<i64> {
        self.genres.get(name).copied().or_else(|| {
            self.genres
                .iter()
                .find(|(genre, _)| genre.eq_ignore_ascii_case(name))
                .map(|(_, id)| *id)
        })
    }

    /// Turns one discover row into a candidate.
    ///
    /// A failed runtime or credits lookup, or an unparseable release date,
    /// skips the film instead of failing the whole run.
    async fn enrich(&self, row: MovieSummary) -> Option<FilmCandidate> {
        let Some(release_year) = row.release_year() else {
            tracing::warn!(movie_id = row.id, title = %row.title, "Skipping film without a release date");
            return None;
        };

        let details = match self.provider.movie_details(row.id).await {
            Ok(details) => details,
            Err(error) => {
                tracing::warn!(movie_id = row.id, %error, "Skipping film after details lookup failed");
                return None;
            }
        };

        let cast = match self.provider.movie_credits(row.id, CAST_LIMIT).await {
            Ok(cast) => cast,
            Err(error) => {
                tracing::warn!(movie_id = row.id, %error, "Skipping film after credits lookup failed");
                return None;
            }
        };

        Some(FilmCandidate {
            movie_id: row.id,
            title: row.title,
            genre_ids: row.genre_ids,
            release_year,
            runtime_minutes: details.runtime.unwrap_or(0),
            cast,
        })
    }
}

/// The fallback pass: group collected candidates by similarity score and
/// re-add them from the highest score group down until the quota is met.
///
/// Candidates are keyed by title, so re-adding one already present cannot grow
/// the set; the slot counter still advances toward the quota either way.
fn backfill_closest(collected: &mut CandidateSet, target: &FeatureTuple) {
    let mut groups: BTreeMap<i64, Vec<FilmCandidate>> = BTreeMap::new();
    for candidate in collected.iter() {
        let similarity = score(target, &FeatureTuple::from_candidate(candidate));
        groups.entry(similarity).or_default().push(candidate.clone());
    }

    let mut slots_filled = collected.len();
    for (_, group) in groups.iter().rev() {
        for candidate in group {
            if slots_filled >= CANDIDATE_QUOTA {
                return;
            }
            collected.insert(candidate.clone());
            slots_filled += 1;
        }
    }
}
