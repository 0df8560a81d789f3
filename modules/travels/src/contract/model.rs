/// Mean seconds per year, used for whole-year age arithmetic.
pub const SECONDS_PER_YEAR: i64 = 31_557_600;

/// Whole years elapsed between `birth_date` and `reference_time`,
/// truncated toward zero.
pub fn age_at(reference_time: i64, birth_date: i64) -> i64 {
    (reference_time - birth_date) / SECONDS_PER_YEAR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_symbol(self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
        }
    }

    /// Accepts exactly "m" or "f", nothing else.
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Pure user model (no serde). Wire shapes live in the REST DTO layer.
///
/// `age` is derived from `birth_date` against the store's fixed reference
/// time and kept current by the store so the query engine never recomputes
/// it per request. `visits` holds back-references by visit id, ordered by
/// `visited_at` ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: i64,
    pub age: i64,
    pub visits: Vec<VisitRef>,
}

/// Back-reference entry in a user's ordered visit collection.
///
/// Carries the timestamp the entry was sorted under so the ordering is
/// self-contained; the referenced visit remains the authority on its own
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitRef {
    pub visited_at: i64,
    pub visit: u32,
}

impl User {
    /// Insert a back-reference in sorted position, after any entries with an
    /// equal timestamp.
    pub fn link_visit(&mut self, visited_at: i64, visit: u32) {
        let at = self
            .visits
            .partition_point(|r| r.visited_at <= visited_at);
        self.visits.insert(at, VisitRef { visited_at, visit });
    }

    /// Remove a back-reference by visit identity (two visits may share a
    /// timestamp and mark, so value comparison would be ambiguous).
    pub fn unlink_visit(&mut self, visit: u32) {
        if let Some(at) = self.visits.iter().position(|r| r.visit == visit) {
            self.visits.remove(at);
        }
    }
}

/// Pure location model. `visits` is the unordered back-reference collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: u32,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: i32,
    pub visits: Vec<u32>,
}

impl Location {
    pub fn link_visit(&mut self, visit: u32) {
        self.visits.push(visit);
    }

    pub fn unlink_visit(&mut self, visit: u32) {
        if let Some(at) = self.visits.iter().position(|v| *v == visit) {
            self.visits.swap_remove(at);
        }
    }
}

/// Pure visit model. `location` and `user` are identifiers into the store's
/// arrays, not owning references; the store maintains the corresponding
/// back-reference collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub id: u32,
    pub location: u32,
    pub user: u32,
    pub visited_at: i64,
    pub mark: i32,
}

/// Full user payload for creation and bulk load (no derived fields, no
/// back-references; those are the store's to compute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub birth_date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub id: u32,
    pub place: String,
    pub country: String,
    pub city: String,
    pub distance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitRecord {
    pub id: u32,
    pub location: u32,
    pub user: u32,
    pub visited_at: i64,
    pub mark: i32,
}

/// Partial update data for a user. Absent fields keep their prior values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPatch {
    pub place: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub distance: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub location: Option<u32>,
    pub user: Option<u32>,
    pub visited_at: Option<i64>,
    pub mark: Option<i32>,
}
