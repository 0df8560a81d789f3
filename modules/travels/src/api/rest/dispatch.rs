//! Request dispatch: a decoded `{method, path, query, body}` in, a
//! `{status, body}` out.
//!
//! This sits on the hot path of every request, so classification is done on
//! the shape of the path and leading characters of its segments: no routing
//! table, no pattern matching. The transport layer only decodes and
//! re-encodes around this function.

use url::form_urlencoded;

use crate::api::rest::dto::{
    decode_create, decode_patch, AvgDto, LocationDto, LocationPatchDto, StatsDto, UserDto,
    UserPatchDto, VisitDto, VisitPatchDto, VisitRowDto, VisitsViewDto,
};
use crate::contract::model::Gender;
use crate::domain::error::{DomainError, Kind};
use crate::domain::query::{self, AvgQuery, VisitsQuery};
use crate::domain::store::Store;

/// A transport-agnostic response: status plus body bytes. Success bodies are
/// JSON; error bodies are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json<T: serde::Serialize>(value: &T) -> Reply {
        match serde_json::to_vec(value) {
            Ok(body) => Reply { status: 200, body },
            Err(err) => {
                tracing::error!(error = %err, "response serialization failed");
                Reply::bad_request()
            }
        }
    }

    pub fn empty_json() -> Reply {
        Reply {
            status: 200,
            body: b"{}".to_vec(),
        }
    }

    pub fn not_found() -> Reply {
        Reply {
            status: 404,
            body: Vec::new(),
        }
    }

    pub fn bad_request() -> Reply {
        Reply {
            status: 400,
            body: Vec::new(),
        }
    }

    /// Successful replies carry a JSON body; errors are status-only.
    pub fn is_json(&self) -> bool {
        self.status == 200
    }
}

pub fn dispatch(
    store: &Store,
    method: &str,
    path: &str,
    raw_query: Option<&str>,
    body: &[u8],
) -> Reply {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut segments = trimmed.split('/');
    let first = segments.next().unwrap_or("");
    let second = segments.next();
    let third = segments.next();
    if segments.next().is_some() {
        return Reply::not_found();
    }

    let result = match (method, second, third) {
        ("GET", None, None) if leading(first) == Some(b's') => stats(store),
        ("GET", Some(id), None) => entity_by_id(store, first, id),
        ("GET", Some(id), Some(op)) => derived_view(store, first, id, op, raw_query),
        ("POST", Some("new"), None) => create(store, first, body),
        ("POST", Some(id), None) => update(store, first, id, body),
        _ => Ok(Reply::not_found()),
    };
    into_reply(result)
}

/// Operation-level errors become statuses here; nothing propagates past this
/// boundary, so a failing request can never take a worker down with it.
fn into_reply(result: Result<Reply, DomainError>) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(DomainError::NotFound { .. }) => Reply::not_found(),
        Err(err) => {
            tracing::debug!(error = %err, "request rejected");
            Reply::bad_request()
        }
    }
}

fn leading(segment: &str) -> Option<u8> {
    segment.as_bytes().first().copied()
}

/// Entity kind from the leading character of the first path segment.
fn kind_of(segment: &str) -> Option<Kind> {
    match leading(segment) {
        Some(b'u') => Some(Kind::Users),
        Some(b'l') => Some(Kind::Locations),
        Some(b'v') => Some(Kind::Visits),
        _ => None,
    }
}

fn stats(store: &Store) -> Result<Reply, DomainError> {
    Ok(Reply::json(&StatsDto::from(store.counts())))
}

fn entity_by_id(store: &Store, kind_seg: &str, id_seg: &str) -> Result<Reply, DomainError> {
    let Some(kind) = kind_of(kind_seg) else {
        return Ok(Reply::not_found());
    };
    let Ok(id) = id_seg.parse::<u32>() else {
        return Ok(Reply::not_found());
    };
    let reply = match kind {
        Kind::Users => store.user(id).map(|u| Reply::json(&UserDto::from(&*u))),
        Kind::Locations => store
            .location(id)
            .map(|l| Reply::json(&LocationDto::from(&*l))),
        Kind::Visits => store.visit(id).map(|v| Reply::json(&VisitDto::from(&*v))),
    };
    Ok(reply.unwrap_or_else(Reply::not_found))
}

fn derived_view(
    store: &Store,
    kind_seg: &str,
    id_seg: &str,
    op_seg: &str,
    raw_query: Option<&str>,
) -> Result<Reply, DomainError> {
    let Ok(id) = id_seg.parse::<u32>() else {
        return Ok(Reply::not_found());
    };
    match (leading(kind_seg), leading(op_seg)) {
        (Some(b'u'), Some(b'v')) => {
            // resolve before parsing filters: an unknown user is NotFound
            // even when the query string is malformed
            if store.user(id).is_none() {
                return Ok(Reply::not_found());
            }
            let filters = parse_visits_query(raw_query)?;
            let views = query::visits_of(store, id, &filters)?;
            Ok(Reply::json(&VisitsViewDto {
                visits: views.into_iter().map(VisitRowDto::from).collect(),
            }))
        }
        (Some(b'l'), Some(b'a')) => {
            if store.location(id).is_none() {
                return Ok(Reply::not_found());
            }
            let filters = parse_avg_query(raw_query)?;
            let avg = query::avg_of(store, id, &filters)?;
            Ok(Reply::json(&AvgDto { avg }))
        }
        _ => Ok(Reply::not_found()),
    }
}

fn create(store: &Store, kind_seg: &str, body: &[u8]) -> Result<Reply, DomainError> {
    let Some(kind) = kind_of(kind_seg) else {
        return Ok(Reply::not_found());
    };
    match kind {
        Kind::Users => {
            let dto: UserDto = decode_create(body)?;
            store.create_user(dto.into())?;
        }
        Kind::Locations => {
            let dto: LocationDto = decode_create(body)?;
            store.create_location(dto.into())?;
        }
        Kind::Visits => {
            let dto: VisitDto = decode_create(body)?;
            store.create_visit(dto.into())?;
        }
    }
    Ok(Reply::empty_json())
}

fn update(store: &Store, kind_seg: &str, id_seg: &str, body: &[u8]) -> Result<Reply, DomainError> {
    let Some(kind) = kind_of(kind_seg) else {
        return Ok(Reply::not_found());
    };
    let id: u32 = id_seg
        .parse()
        .map_err(|_| DomainError::invalid(format!("{id_seg} is not an identifier")))?;
    // decode (and null-reject) before resolving the target: a malformed
    // payload is a bad request even against an unknown id
    match kind {
        Kind::Users => {
            let dto: UserPatchDto = decode_patch(body)?;
            store.update_user(id, dto.into())?;
        }
        Kind::Locations => {
            let dto: LocationPatchDto = decode_patch(body)?;
            store.update_location(id, dto.into())?;
        }
        Kind::Visits => {
            let dto: VisitPatchDto = decode_patch(body)?;
            store.update_visit(id, dto.into())?;
        }
    }
    Ok(Reply::empty_json())
}

fn parse_visits_query(raw: Option<&str>) -> Result<VisitsQuery, DomainError> {
    let mut filters = VisitsQuery::default();
    for (key, value) in form_urlencoded::parse(raw.unwrap_or("").as_bytes()) {
        match key.as_ref() {
            "fromDate" => filters.from_date = Some(parse_number(&value, "fromDate")?),
            "toDate" => filters.to_date = Some(parse_number(&value, "toDate")?),
            "country" => {
                // an empty country is not a filter
                if !value.is_empty() {
                    filters.country = Some(value.into_owned());
                }
            }
            "toDistance" => filters.to_distance = Some(parse_number(&value, "toDistance")?),
            _ => {}
        }
    }
    Ok(filters)
}

fn parse_avg_query(raw: Option<&str>) -> Result<AvgQuery, DomainError> {
    let mut filters = AvgQuery::default();
    for (key, value) in form_urlencoded::parse(raw.unwrap_or("").as_bytes()) {
        match key.as_ref() {
            "fromDate" => filters.from_date = Some(parse_number(&value, "fromDate")?),
            "toDate" => filters.to_date = Some(parse_number(&value, "toDate")?),
            "fromAge" => filters.from_age = Some(parse_number(&value, "fromAge")?),
            "toAge" => filters.to_age = Some(parse_number(&value, "toAge")?),
            "gender" => {
                filters.gender = Some(Gender::from_symbol(&value).ok_or_else(|| {
                    DomainError::invalid(format!("gender must be m or f, got {value}"))
                })?);
            }
            _ => {}
        }
    }
    Ok(filters)
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::invalid(format!("query parameter {name} is not an integer")))
}
