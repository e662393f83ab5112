use chrono::NaiveDate;
use derive_more::Display;
use uuid::Uuid;

use super::datatype::{date::parse_display_date, patch::Patch, JsonPointer};
use super::entity::{
    timestamp,
    user::{User, UserChanges, UserState},
    EntityData,
};
use crate::app::resource::user::UpdateUser;
use crate::error::{
    persistence::PersistenceError,
    resource::{ValidationError, ValidationErrorKind, ValidationFieldError},
};
use crate::infra::database::row::UserRow;

/// Stored row that can not be restored as an entity.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[display(fmt = "user row {_0} has an empty name")]
    EmptyName(Uuid),
}

impl std::error::Error for MapperError {}

impl From<MapperError> for PersistenceError {
    fn from(err: MapperError) -> Self {
        PersistenceError::DecodeData(err.to_string())
    }
}

impl TryFrom<UserRow> for User {
    type Error = MapperError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        if row.name.is_empty() {
            return Err(MapperError::EmptyName(row.id));
        }

        Ok(Self::restore(
            EntityData::restore(row.id, row.created_at, row.updated_at),
            UserState::new(row.name, row.birth, row.email, row.location, row.active),
        ))
    }
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.data.id,
            name: user.state.name.clone(),
            birth: user.state.birth,
            email: user.state.email.clone(),
            location: user.state.location.clone(),
            active: user.state.active,
            created_at: user.data.created,
            updated_at: user.data.updated,
        }
    }
}

pub fn row_to_user(row: UserRow) -> Result<User, MapperError> {
    User::try_from(row)
}

/// Maps every row, keeping order. A single invalid row fails the whole list.
pub fn rows_to_user_list<I>(rows: I) -> Result<Vec<User>, MapperError>
where
    I: IntoIterator<Item = UserRow>,
{
    rows.into_iter().map(row_to_user).collect()
}

pub fn user_to_row(user: &User) -> UserRow {
    UserRow::from(user)
}

/// Converts the fields of an update request into the changes to store.
///
/// Absent fields are left untouched, `updated` is always stamped. Every
/// invalid field is reported with its raw value.
pub fn build_update_params(id: Uuid, fields: UpdateUser) -> Result<UserChanges, ValidationError> {
    let mut errors = Vec::new();

    let name = match fields.name {
        Patch::Unset => None,
        Patch::Null => {
            errors.push(field_error::<String>("name", "null", ValidationErrorKind::Required));
            None
        }
        Patch::Value(name) if name.is_empty() => {
            errors.push(field_error::<String>("name", "", ValidationErrorKind::MinLength(1)));
            None
        }
        Patch::Value(name) => Some(name),
    };

    let birth = match non_empty(fields.birth) {
        Patch::Value(raw) => match parse_display_date(&raw) {
            Ok(date) => Patch::Value(date),
            Err(kind) => {
                errors.push(field_error::<NaiveDate>("birth", &raw, kind));
                Patch::Unset
            }
        },
        Patch::Null => Patch::Null,
        Patch::Unset => Patch::Unset,
    };

    let active = match fields.active {
        Patch::Unset => None,
        Patch::Null => {
            errors.push(field_error::<bool>("active", "null", ValidationErrorKind::Required));
            None
        }
        Patch::Value(flag) => match flag.as_bool() {
            Some(active) => Some(active),
            None => {
                errors.push(field_error::<bool>(
                    "active",
                    &flag.raw(),
                    ValidationErrorKind::InvalidType,
                ));
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(ValidationError::from_resource::<UpdateUser>(errors));
    }

    Ok(UserChanges {
        id,
        name,
        birth,
        email: non_empty(fields.email),
        location: non_empty(fields.location),
        active,
        updated: timestamp(),
    })
}

/// An empty string clears a nullable field.
fn non_empty(patch: Patch<String>) -> Patch<String> {
    match patch {
        Patch::Value(value) if value.is_empty() => Patch::Null,
        patch => patch,
    }
}

pub(crate) fn field_error<T: crate::base::ResourceID>(
    field: &str,
    raw: &str,
    kind: ValidationErrorKind,
) -> ValidationFieldError {
    ValidationFieldError::from_resource::<T>(
        raw.into(),
        JsonPointer::field(field).into(),
        vec![kind],
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::domain::datatype::flag::Flag;
    use crate::domain::entity::Entity;

    fn row(name: &str) -> UserRow {
        let created_at = Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap();
        UserRow {
            id: Uuid::new_v4(),
            name: name.into(),
            birth: NaiveDate::from_ymd_opt(1992, 9, 23),
            email: None,
            location: Some("Paris".into()),
            active: true,
            created_at,
            updated_at: created_at + Duration::hours(1),
        }
    }

    #[test]
    fn restores_user_from_row() {
        let row = row("Ana");
        let user = row_to_user(row.clone()).unwrap();

        assert_eq!(user.ident(), row.id);
        assert_eq!(user.name(), "Ana");
        assert_eq!(user.birth(), &row.birth);
        assert_eq!(user.email(), &None);
        assert_eq!(user.location().as_deref(), Some("Paris"));
        assert!(user.active());
        assert_eq!(user.created(), row.created_at);
        assert_eq!(user.updated(), row.updated_at);
    }

    #[test]
    fn rejects_row_with_empty_name() {
        let row = row("");
        let id = row.id;

        assert_eq!(row_to_user(row), Err(MapperError::EmptyName(id)));
    }

    #[test]
    fn maps_row_lists_in_order() {
        let rows = vec![row("a"), row("b"), row("c")];
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let users = rows_to_user_list(rows).unwrap();

        assert_eq!(users.iter().map(|u| u.ident()).collect::<Vec<_>>(), ids);
        assert_eq!(rows_to_user_list(Vec::new()).unwrap(), Vec::<User>::new());
        assert!(rows_to_user_list(vec![row("a"), row("")]).is_err());
    }

    #[test]
    fn user_survives_row_round_trip() {
        let users = [
            User::new("Ana".into(), None, None, None),
            User::new(
                "Bob".into(),
                NaiveDate::from_ymd_opt(2000, 2, 29),
                Some("bob@mail.com".into()),
                Some("Lyon".into()),
            ),
        ];

        for user in users {
            assert_eq!(row_to_user(user_to_row(&user)).unwrap(), user);
        }
    }

    #[test]
    fn absent_fields_are_left_untouched() {
        let id = Uuid::new_v4();
        let changes = build_update_params(
            id,
            UpdateUser {
                name: Patch::Value("Ana".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(changes.id, id);
        assert_eq!(changes.name.as_deref(), Some("Ana"));
        assert_eq!(changes.birth, Patch::Unset);
        assert_eq!(changes.email, Patch::Unset);
        assert_eq!(changes.location, Patch::Unset);
        assert_eq!(changes.active, None);
    }

    #[test]
    fn empty_and_null_values_clear_nullable_fields() {
        let changes = build_update_params(
            Uuid::new_v4(),
            UpdateUser {
                birth: Patch::Value("".into()),
                email: Patch::Null,
                location: Patch::Value("".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(changes.birth, Patch::Null);
        assert_eq!(changes.email, Patch::Null);
        assert_eq!(changes.location, Patch::Null);
    }

    #[test]
    fn converts_present_values() {
        let changes = build_update_params(
            Uuid::new_v4(),
            UpdateUser {
                birth: Patch::Value("01/12/1980".into()),
                email: Patch::Value("ana@mail.com".into()),
                active: Patch::Value(Flag::Text("false".into())),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(changes.birth, Patch::Value(NaiveDate::from_ymd_opt(1980, 12, 1).unwrap()));
        assert_eq!(changes.email, Patch::Value("ana@mail.com".into()));
        assert_eq!(changes.active, Some(false));
    }

    #[test]
    fn always_stamps_updated_time() {
        let before = timestamp();
        let changes = build_update_params(
            Uuid::new_v4(),
            UpdateUser {
                active: Patch::Value(Flag::Bool(true)),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(changes.updated >= before);
    }

    #[test]
    fn reports_every_invalid_field_with_raw_value() {
        let err = build_update_params(
            Uuid::new_v4(),
            UpdateUser {
                name: Patch::Value("".into()),
                birth: Patch::Value("23/09/92".into()),
                active: Patch::Value(Flag::Text("maybe".into())),
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(err.fields.len(), 3);
        assert!(err.has_field("/name"));
        assert!(err.has_field("/birth"));
        assert!(err.has_field("/active"));

        let message = err.to_string();
        assert!(message.contains("23/09/92"), "{message}");
        assert!(message.contains("maybe"), "{message}");
    }

    #[test]
    fn rejects_null_for_non_nullable_fields() {
        let err = build_update_params(
            Uuid::new_v4(),
            UpdateUser {
                name: Patch::Null,
                active: Patch::Null,
                ..Default::default()
            },
        )
        .unwrap_err();

        assert!(err
            .fields
            .iter()
            .all(|field| field.kinds == vec![ValidationErrorKind::Required]));
    }
}
