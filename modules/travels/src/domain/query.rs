//! The two derived-view operations, built as lazy filter pipelines over the
//! store's back-reference collections. Filters run in a fixed, documented
//! order and never materialize intermediate collections.

use crate::contract::model::Gender;
use crate::domain::agg;
use crate::domain::error::{DomainError, Kind};
use crate::domain::store::Store;

/// Typed filter set for a user's visit history. Parameter parsing and
/// validation happen at the REST edge; by this point every bound is typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitsQuery {
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
    /// Only ever set to a non-empty country name.
    pub country: Option<String>,
    pub to_distance: Option<i32>,
}

/// Typed filter set for a location's average rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvgQuery {
    pub from_date: Option<i64>,
    pub to_date: Option<i64>,
    pub from_age: Option<i64>,
    pub to_age: Option<i64>,
    pub gender: Option<Gender>,
}

/// One row of a visit-history response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitView {
    pub mark: i32,
    pub visited_at: i64,
    pub place: String,
}

/// Visit history for a user, ordered by `visited_at` ascending.
///
/// The back-reference collection is already in that order and filtering
/// never changes relative order, so the output needs no sort. Filter order:
/// `fromDate` (strictly greater), `toDate` (strictly less), `country`
/// (exact), `toDistance` (strictly less). Predicates that need the visit's
/// location treat a dangling reference as non-matching.
pub fn visits_of(
    store: &Store,
    user_id: u32,
    query: &VisitsQuery,
) -> Result<Vec<VisitView>, DomainError> {
    let user = store
        .user(user_id)
        .ok_or_else(|| DomainError::not_found(Kind::Users, user_id))?;

    let views = user
        .visits
        .iter()
        .filter_map(|r| store.visit(r.visit))
        .filter(|v| query.from_date.map_or(true, |d| v.visited_at > d))
        .filter(|v| query.to_date.map_or(true, |d| v.visited_at < d))
        .map(|v| {
            let location = store.location(v.location);
            (v, location)
        })
        .filter(|(_, location)| match &query.country {
            Some(country) => location.as_ref().is_some_and(|l| &l.country == country),
            None => true,
        })
        .filter(|(_, location)| {
            query
                .to_distance
                .map_or(true, |d| location.as_ref().is_some_and(|l| l.distance < d))
        })
        .map(|(v, location)| VisitView {
            mark: v.mark,
            visited_at: v.visited_at,
            place: location.map(|l| l.place.clone()).unwrap_or_default(),
        })
        .collect();
    Ok(views)
}

/// Average mark of a location's visits, rounded to 5 fractional digits;
/// exactly 0 when nothing survives the filters.
///
/// Filter order: `fromDate`, `toDate`, `gender`, then the age window. The
/// age bounds are asymmetric on purpose: `age >= fromAge` but `age < toAge`.
/// Ages come precomputed from the store, so the pipeline does no date
/// arithmetic.
pub fn avg_of(store: &Store, location_id: u32, query: &AvgQuery) -> Result<f64, DomainError> {
    let location = store
        .location(location_id)
        .ok_or_else(|| DomainError::not_found(Kind::Locations, location_id))?;

    let needs_user =
        query.gender.is_some() || query.from_age.is_some() || query.to_age.is_some();

    let marks = location
        .visits
        .iter()
        .filter_map(|id| store.visit(*id))
        .filter(|v| query.from_date.map_or(true, |d| v.visited_at > d))
        .filter(|v| query.to_date.map_or(true, |d| v.visited_at < d))
        .filter(|v| {
            if !needs_user {
                return true;
            }
            let Some(user) = store.user(v.user) else {
                return false;
            };
            if query.gender.is_some_and(|g| user.gender != g) {
                return false;
            }
            if query.from_age.is_some_and(|a| user.age < a) {
                return false;
            }
            if query.to_age.is_some_and(|a| user.age >= a) {
                return false;
            }
            true
        })
        .map(|v| i64::from(v.mark));

    Ok(agg::average(marks))
}
