//! REST wire shapes and their conversions to the pure contract models.
//!
//! Entity DTOs mirror the public fields exactly; derived values and
//! back-reference collections never cross the wire. Patch DTOs are typed
//! field masks: absent fields stay `None`, and explicit nulls are rejected
//! during decoding, before any mutation can happen.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::contract::model::{
    Gender, Location, LocationPatch, LocationRecord, User, UserPatch, UserRecord, Visit,
    VisitPatch, VisitRecord,
};
use crate::domain::error::DomainError;
use crate::domain::query::VisitView;
use crate::domain::store::Counts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenderDto {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl From<Gender> for GenderDto {
    fn from(g: Gender) -> Self {
        match g {
            Gender::Male => GenderDto::Male,
            Gender::Female => GenderDto::Female,
        }
    }
}

impl From<GenderDto> for Gender {
    fn from(g: GenderDto) -> Self {
        match g {
            GenderDto::Male => Gender::Male,
            GenderDto::Female => Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: u32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: GenderDto,
    pub birth_date: i64,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            gender: user.gender.into(),
            birth_date: user.birth_date,
        }
    }
}

impl From<UserDto> for UserRecord {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            gender: dto.gender.into(),
            birth_date: dto.birth_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDto {
    pub id: u32,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: i32,
}

impl From<&Location> for LocationDto {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            place: location.place.clone(),
            country: location.country.clone(),
            city: location.city.clone(),
            distance: location.distance,
        }
    }
}

impl From<LocationDto> for LocationRecord {
    fn from(dto: LocationDto) -> Self {
        Self {
            id: dto.id,
            place: dto.place,
            country: dto.country,
            city: dto.city,
            distance: dto.distance,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisitDto {
    pub id: u32,
    pub location: u32,
    pub user: u32,
    pub visited_at: i64,
    pub mark: i32,
}

impl From<&Visit> for VisitDto {
    fn from(visit: &Visit) -> Self {
        Self {
            id: visit.id,
            location: visit.location,
            user: visit.user,
            visited_at: visit.visited_at,
            mark: visit.mark,
        }
    }
}

impl From<VisitDto> for VisitRecord {
    fn from(dto: VisitDto) -> Self {
        Self {
            id: dto.id,
            location: dto.location,
            user: dto.user,
            visited_at: dto.visited_at,
            mark: dto.mark,
        }
    }
}

/// Partial-update wire shape for a user. Fields left out of the payload
/// deserialize to `None` and keep their prior values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatchDto {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<GenderDto>,
    #[serde(default)]
    pub birth_date: Option<i64>,
}

impl From<UserPatchDto> for UserPatch {
    fn from(dto: UserPatchDto) -> Self {
        Self {
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            gender: dto.gender.map(Into::into),
            birth_date: dto.birth_date,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatchDto {
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub distance: Option<i32>,
}

impl From<LocationPatchDto> for LocationPatch {
    fn from(dto: LocationPatchDto) -> Self {
        Self {
            place: dto.place,
            country: dto.country,
            city: dto.city,
            distance: dto.distance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VisitPatchDto {
    #[serde(default)]
    pub location: Option<u32>,
    #[serde(default)]
    pub user: Option<u32>,
    #[serde(default)]
    pub visited_at: Option<i64>,
    #[serde(default)]
    pub mark: Option<i32>,
}

impl From<VisitPatchDto> for VisitPatch {
    fn from(dto: VisitPatchDto) -> Self {
        Self {
            location: dto.location,
            user: dto.user,
            visited_at: dto.visited_at,
            mark: dto.mark,
        }
    }
}

/// Visit-history response: `{"visits": [{"mark", "visited_at", "place"}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitsViewDto {
    pub visits: Vec<VisitRowDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRowDto {
    pub mark: i32,
    pub visited_at: i64,
    pub place: String,
}

impl From<VisitView> for VisitRowDto {
    fn from(view: VisitView) -> Self {
        Self {
            mark: view.mark,
            visited_at: view.visited_at,
            place: view.place,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvgDto {
    pub avg: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsDto {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
}

impl From<Counts> for StatsDto {
    fn from(counts: Counts) -> Self {
        Self {
            users: counts.users,
            locations: counts.locations,
            visits: counts.visits,
        }
    }
}

/// Decode a full-entity creation payload. Missing or null required fields
/// fail here, before the store sees anything.
pub fn decode_create<T: DeserializeOwned>(body: &[u8]) -> Result<T, DomainError> {
    serde_json::from_slice(body)
        .map_err(|e| DomainError::invalid(format!("invalid create payload: {e}")))
}

/// Decode a partial-update payload into a typed field mask.
///
/// The payload is scanned once as a JSON object first: an explicit null
/// under *any* key, known or unknown, rejects the whole request. Unknown
/// non-null keys are ignored.
pub fn decode_patch<T: DeserializeOwned>(body: &[u8]) -> Result<T, DomainError> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| DomainError::invalid(format!("invalid update payload: {e}")))?;
    if map.values().any(serde_json::Value::is_null) {
        return Err(DomainError::invalid("null value in update payload"));
    }
    serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| DomainError::invalid(format!("invalid update payload: {e}")))
}
