use thiserror::Error;

/// Entity kind, as addressed by the wire surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Users,
    Locations,
    Visits,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Users => "users",
            Kind::Locations => "locations",
            Kind::Visits => "visits",
        }
    }
}

/// Domain-level failures. Absence is routine and signalled, never raised;
/// the REST edge maps these to statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{} {id} not found", .kind.as_str())]
    NotFound { kind: Kind, id: u32 },

    #[error("{message}")]
    Invalid { message: String },

    /// An identifier at or beyond the presized bound on a create. Reads fold
    /// this case into NotFound instead (an over-bound id can never have been
    /// created).
    #[error("{} {id} is beyond the store capacity {capacity}", .kind.as_str())]
    CapacityExceeded {
        kind: Kind,
        id: u32,
        capacity: usize,
    },
}

impl DomainError {
    pub fn not_found(kind: Kind, id: u32) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn capacity_exceeded(kind: Kind, id: u32, capacity: usize) -> Self {
        Self::CapacityExceeded { kind, id, capacity }
    }
}
