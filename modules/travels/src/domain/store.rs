//! The entity store: three presized, identifier-indexed slot collections
//! sharing one fixed reference time.
//!
//! Concurrency model: single writer, lock-free readers. Every slot is an
//! atomically published immutable snapshot (`ArcSwapOption`); readers load
//! slots with no locks and never observe a torn entity. All mutations
//! serialize through one `parking_lot` gate and publish copy-on-write
//! snapshots. Read-after-write ordering between independent concurrent
//! requests is unspecified.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::contract::model::{
    age_at, Location, LocationPatch, LocationRecord, User, UserPatch, UserRecord, Visit,
    VisitPatch, VisitRecord,
};
use crate::domain::error::{DomainError, Kind};

/// A presized array of atomically published entity slots with a live count.
#[derive(Debug)]
struct Slots<T> {
    slots: Box<[ArcSwapOption<T>]>,
    live: AtomicUsize,
}

impl<T> Slots<T> {
    fn from_vec(values: Vec<Option<T>>) -> Self {
        let mut live = 0;
        let slots: Vec<ArcSwapOption<T>> = values
            .into_iter()
            .map(|v| {
                if v.is_some() {
                    live += 1;
                }
                ArcSwapOption::new(v.map(Arc::new))
            })
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
            live: AtomicUsize::new(live),
        }
    }

    /// Out-of-range and empty are the same answer: the entity does not exist.
    fn get(&self, id: u32) -> Option<Arc<T>> {
        self.slots.get(id as usize).and_then(|s| s.load_full())
    }

    fn publish(&self, id: u32, value: Arc<T>) {
        let Some(slot) = self.slots.get(id as usize) else {
            return;
        };
        let prev = slot.swap(Some(value));
        if prev.is_none() {
            self.live.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn len(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Live entity counts, O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub users: usize,
    pub locations: usize,
    pub visits: usize,
}

#[derive(Debug)]
pub struct Store {
    users: Slots<User>,
    locations: Slots<Location>,
    visits: Slots<Visit>,
    reference_time: i64,
    write_gate: Mutex<()>,
}

impl Store {
    pub fn builder(
        user_capacity: usize,
        location_capacity: usize,
        visit_capacity: usize,
        reference_time: i64,
    ) -> StoreBuilder {
        StoreBuilder::new(
            user_capacity,
            location_capacity,
            visit_capacity,
            reference_time,
        )
    }

    /// The fixed point in time all age computations use, set at build time.
    pub fn reference_time(&self) -> i64 {
        self.reference_time
    }

    pub fn user(&self, id: u32) -> Option<Arc<User>> {
        self.users.get(id)
    }

    pub fn location(&self, id: u32) -> Option<Arc<Location>> {
        self.locations.get(id)
    }

    pub fn visit(&self, id: u32) -> Option<Arc<Visit>> {
        self.visits.get(id)
    }

    pub fn counts(&self) -> Counts {
        Counts {
            users: self.users.len(),
            locations: self.locations.len(),
            visits: self.visits.len(),
        }
    }

    /// Insert a user at its own declared identifier. Overwriting an occupied
    /// slot is accepted (idempotent re-creation); the slot's back-reference
    /// collection survives the overwrite so existing visits stay linked.
    pub fn create_user(&self, rec: UserRecord) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        self.check_capacity(Kind::Users, rec.id, self.users.capacity())?;

        let visits = self
            .users
            .get(rec.id)
            .map(|prev| prev.visits.clone())
            .unwrap_or_default();
        let user = User {
            id: rec.id,
            email: rec.email,
            first_name: rec.first_name,
            last_name: rec.last_name,
            gender: rec.gender,
            birth_date: rec.birth_date,
            age: age_at(self.reference_time, rec.birth_date),
            visits,
        };
        self.users.publish(rec.id, Arc::new(user));
        Ok(())
    }

    pub fn create_location(&self, rec: LocationRecord) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        self.check_capacity(Kind::Locations, rec.id, self.locations.capacity())?;

        let visits = self
            .locations
            .get(rec.id)
            .map(|prev| prev.visits.clone())
            .unwrap_or_default();
        let location = Location {
            id: rec.id,
            place: rec.place,
            country: rec.country,
            city: rec.city,
            distance: rec.distance,
            visits,
        };
        self.locations.publish(rec.id, Arc::new(location));
        Ok(())
    }

    /// Insert a visit and link it into its owners' back-reference
    /// collections. A missing owner id leaves that link out, matching bulk
    /// load. Overwriting an occupied slot relinks from the old owners to the
    /// new ones.
    pub fn create_visit(&self, rec: VisitRecord) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        self.check_capacity(Kind::Visits, rec.id, self.visits.capacity())?;

        let prev = self.visits.get(rec.id);
        let visit = Visit {
            id: rec.id,
            location: rec.location,
            user: rec.user,
            visited_at: rec.visited_at,
            mark: rec.mark,
        };
        self.visits.publish(rec.id, Arc::new(visit));
        self.relink_user(
            rec.id,
            prev.as_deref().map(|p| p.user),
            Some((rec.user, rec.visited_at)),
        );
        self.relink_location(rec.id, prev.as_deref().map(|p| p.location), Some(rec.location));
        Ok(())
    }

    /// Apply a partial update. A `birth_date` change recomputes the cached
    /// age immediately so subsequent average-rating filters need no
    /// per-query arithmetic.
    pub fn update_user(&self, id: u32, patch: UserPatch) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        let cur = self
            .users
            .get(id)
            .ok_or_else(|| DomainError::not_found(Kind::Users, id))?;

        let mut next = (*cur).clone();
        if let Some(email) = patch.email {
            next.email = email;
        }
        if let Some(first_name) = patch.first_name {
            next.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            next.last_name = last_name;
        }
        if let Some(gender) = patch.gender {
            next.gender = gender;
        }
        if let Some(birth_date) = patch.birth_date {
            next.birth_date = birth_date;
            next.age = age_at(self.reference_time, birth_date);
        }
        self.users.publish(id, Arc::new(next));
        Ok(())
    }

    pub fn update_location(&self, id: u32, patch: LocationPatch) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        let cur = self
            .locations
            .get(id)
            .ok_or_else(|| DomainError::not_found(Kind::Locations, id))?;

        let mut next = (*cur).clone();
        if let Some(place) = patch.place {
            next.place = place;
        }
        if let Some(country) = patch.country {
            next.country = country;
        }
        if let Some(city) = patch.city {
            next.city = city;
        }
        if let Some(distance) = patch.distance {
            next.distance = distance;
        }
        self.locations.publish(id, Arc::new(next));
        Ok(())
    }

    /// Apply a partial update to a visit. Scalar fields are applied first;
    /// relinking then runs with the final field values, so a visit whose
    /// `user` and `visited_at` both change is resorted into the new owner's
    /// collection under the new timestamp.
    pub fn update_visit(&self, id: u32, patch: VisitPatch) -> Result<(), DomainError> {
        let _write = self.write_gate.lock();
        let cur = self
            .visits
            .get(id)
            .ok_or_else(|| DomainError::not_found(Kind::Visits, id))?;

        let mut next = *cur;
        if let Some(location) = patch.location {
            next.location = location;
        }
        if let Some(user) = patch.user {
            next.user = user;
        }
        if let Some(visited_at) = patch.visited_at {
            next.visited_at = visited_at;
        }
        if let Some(mark) = patch.mark {
            next.mark = mark;
        }
        self.visits.publish(id, Arc::new(next));

        if next.user != cur.user || next.visited_at != cur.visited_at {
            self.relink_user(id, Some(cur.user), Some((next.user, next.visited_at)));
        }
        if next.location != cur.location {
            self.relink_location(id, Some(cur.location), Some(next.location));
        }
        Ok(())
    }

    fn check_capacity(&self, kind: Kind, id: u32, capacity: usize) -> Result<(), DomainError> {
        if (id as usize) < capacity {
            Ok(())
        } else {
            Err(DomainError::capacity_exceeded(kind, id, capacity))
        }
    }

    /// Move a visit's back-reference between user collections.
    ///
    /// Caller holds the write gate. When the owner changes, the insertion
    /// into the new collection is published before the removal from the old
    /// one: a concurrent reader may briefly see the visit in both, never in
    /// neither. A same-owner reposition is a single publish.
    fn relink_user(&self, visit_id: u32, old: Option<u32>, new: Option<(u32, i64)>) {
        if let (Some(old_id), Some((new_id, visited_at))) = (old, new) {
            if old_id == new_id {
                if let Some(user) = self.users.get(old_id) {
                    let mut next = (*user).clone();
                    next.unlink_visit(visit_id);
                    next.link_visit(visited_at, visit_id);
                    self.users.publish(old_id, Arc::new(next));
                }
                return;
            }
        }
        if let Some((new_id, visited_at)) = new {
            if let Some(user) = self.users.get(new_id) {
                let mut next = (*user).clone();
                next.link_visit(visited_at, visit_id);
                self.users.publish(new_id, Arc::new(next));
            }
        }
        if let Some(old_id) = old {
            if let Some(user) = self.users.get(old_id) {
                let mut next = (*user).clone();
                next.unlink_visit(visit_id);
                self.users.publish(old_id, Arc::new(next));
            }
        }
    }

    /// Same discipline as `relink_user` for the unordered location side.
    fn relink_location(&self, visit_id: u32, old: Option<u32>, new: Option<u32>) {
        if old == new {
            return;
        }
        if let Some(new_id) = new {
            if let Some(location) = self.locations.get(new_id) {
                let mut next = (*location).clone();
                next.link_visit(visit_id);
                self.locations.publish(new_id, Arc::new(next));
            }
        }
        if let Some(old_id) = old {
            if let Some(location) = self.locations.get(old_id) {
                let mut next = (*location).clone();
                next.unlink_visit(visit_id);
                self.locations.publish(old_id, Arc::new(next));
            }
        }
    }
}

/// Pre-serving bulk population: plain vectors, in-place linking, ages
/// computed, frozen into the lock-free `Store` once complete. This is the
/// loader's half of the collaborator contract: the store starts serving
/// with every back-reference already linked.
pub struct StoreBuilder {
    users: Vec<Option<User>>,
    locations: Vec<Option<Location>>,
    visits: Vec<Option<Visit>>,
    reference_time: i64,
}

impl StoreBuilder {
    pub fn new(
        user_capacity: usize,
        location_capacity: usize,
        visit_capacity: usize,
        reference_time: i64,
    ) -> Self {
        let mut users = Vec::new();
        users.resize_with(user_capacity, || None);
        let mut locations = Vec::new();
        locations.resize_with(location_capacity, || None);
        let mut visits = Vec::new();
        visits.resize_with(visit_capacity, || None);
        Self {
            users,
            locations,
            visits,
            reference_time,
        }
    }

    pub fn put_user(&mut self, rec: UserRecord) -> Result<(), DomainError> {
        let capacity = self.users.len();
        let slot = self
            .users
            .get_mut(rec.id as usize)
            .ok_or_else(|| DomainError::capacity_exceeded(Kind::Users, rec.id, capacity))?;
        *slot = Some(User {
            id: rec.id,
            email: rec.email,
            first_name: rec.first_name,
            last_name: rec.last_name,
            gender: rec.gender,
            birth_date: rec.birth_date,
            age: age_at(self.reference_time, rec.birth_date),
            visits: Vec::new(),
        });
        Ok(())
    }

    pub fn put_location(&mut self, rec: LocationRecord) -> Result<(), DomainError> {
        let capacity = self.locations.len();
        let slot = self
            .locations
            .get_mut(rec.id as usize)
            .ok_or_else(|| DomainError::capacity_exceeded(Kind::Locations, rec.id, capacity))?;
        *slot = Some(Location {
            id: rec.id,
            place: rec.place,
            country: rec.country,
            city: rec.city,
            distance: rec.distance,
            visits: Vec::new(),
        });
        Ok(())
    }

    /// Users and locations must be in place before their visits arrive; the
    /// load order is users → locations → visits for exactly that reason.
    pub fn put_visit(&mut self, rec: VisitRecord) -> Result<(), DomainError> {
        let capacity = self.visits.len();
        if rec.id as usize >= capacity {
            return Err(DomainError::capacity_exceeded(Kind::Visits, rec.id, capacity));
        }
        if let Some(Some(location)) = self.locations.get_mut(rec.location as usize) {
            location.link_visit(rec.id);
        }
        if let Some(Some(user)) = self.users.get_mut(rec.user as usize) {
            user.link_visit(rec.visited_at, rec.id);
        }
        self.visits[rec.id as usize] = Some(Visit {
            id: rec.id,
            location: rec.location,
            user: rec.user,
            visited_at: rec.visited_at,
            mark: rec.mark,
        });
        Ok(())
    }

    pub fn finish(self) -> Store {
        Store {
            users: Slots::from_vec(self.users),
            locations: Slots::from_vec(self.locations),
            visits: Slots::from_vec(self.visits),
            reference_time: self.reference_time,
            write_gate: Mutex::new(()),
        }
    }
}
