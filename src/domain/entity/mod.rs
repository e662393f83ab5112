pub mod user;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

pub trait Entity {
    fn ident(&self) -> Uuid;
    fn created(&self) -> DateTime<Utc>;
    fn updated(&self) -> DateTime<Utc>;
}

/// Data used to restore a entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityData {
    pub(in crate::domain) id: Uuid,
    pub(in crate::domain) created: DateTime<Utc>,
    pub(in crate::domain) updated: DateTime<Utc>,
}

impl EntityData {
    pub fn new() -> Self {
        let now = timestamp();
        Self {
            id: Uuid::new_v4(),
            created: now,
            updated: now,
        }
    }

    pub fn restore(id: Uuid, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        Self {
            id,
            created,
            updated,
        }
    }
}

/// Current time at the precision kept by the store.
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

macro_rules! impl_entity {
    ($entity:ty) => {
        impl crate::domain::entity::Entity for $entity {
            fn ident(&self) -> uuid::Uuid {
                self.data.id
            }

            fn created(&self) -> chrono::DateTime<chrono::Utc> {
                self.data.created
            }

            fn updated(&self) -> chrono::DateTime<chrono::Utc> {
                self.data.updated
            }
        }
    };
}

macro_rules! state_ref {
    ($prop:ident, $rtrn:ty) => {
        pub fn $prop(&self) -> &$rtrn {
            &self.state.$prop
        }
    };
}

pub(self) use impl_entity;
pub(self) use state_ref;
