use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::base::resource_id;
use crate::domain::datatype::patch::Patch;

use super::{impl_entity, state_ref, EntityData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
    pub(in crate::domain) name: String,
    pub(in crate::domain) birth: Option<NaiveDate>,
    pub(in crate::domain) email: Option<String>,
    pub(in crate::domain) location: Option<String>,
    pub(in crate::domain) active: bool,
}

impl UserState {
    pub fn new(
        name: String,
        birth: Option<NaiveDate>,
        email: Option<String>,
        location: Option<String>,
        active: bool,
    ) -> Self {
        Self {
            name,
            birth,
            email,
            location,
            active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(in crate::domain) data: EntityData,
    pub(in crate::domain) state: UserState,
}

impl_entity!(User);

resource_id!(User, "users::User");

impl User {
    state_ref!(name, String);
    state_ref!(birth, Option<NaiveDate>);
    state_ref!(email, Option<String>);
    state_ref!(location, Option<String>);

    pub fn active(&self) -> bool {
        self.state.active
    }

    /// A new active user with a fresh id and creation timestamps.
    pub fn new(
        name: String,
        birth: Option<NaiveDate>,
        email: Option<String>,
        location: Option<String>,
    ) -> Self {
        Self::restore(
            EntityData::new(),
            UserState::new(name, birth, email, location, true),
        )
    }

    pub fn restore(data: EntityData, state: UserState) -> Self {
        Self { data, state }
    }

    /// Applies a partial update in memory, as the store does on update.
    /// Changes targeting another user are ignored.
    #[cfg(test)]
    pub fn apply(&mut self, changes: UserChanges) {
        if changes.id != self.data.id {
            return;
        }

        if let Some(name) = changes.name {
            self.state.name = name;
        }
        changes.birth.apply_to(&mut self.state.birth);
        changes.email.apply_to(&mut self.state.email);
        changes.location.apply_to(&mut self.state.location);
        if let Some(active) = changes.active {
            self.state.active = active;
        }
        self.data.updated = changes.updated;
    }
}

/// Validated partial update of a [`User`].
///
/// `name` and `active` are not nullable, so they only distinguish between
/// left untouched (`None`) and set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub id: Uuid,
    pub name: Option<String>,
    pub birth: Patch<NaiveDate>,
    pub email: Patch<String>,
    pub location: Patch<String>,
    pub active: Option<bool>,
    pub updated: DateTime<Utc>,
}
