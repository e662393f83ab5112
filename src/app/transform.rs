pub mod user {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::{
        app::resource::user::{CreateUser, SearchUsers, UpdateUser, UserResponse},
        domain::{
            datatype::{
                date::{format_display_date, format_display_datetime, parse_display_date},
                JsonPointer,
            },
            entity::{
                user::{User, UserChanges},
                Entity,
            },
            transform::{build_update_params, field_error},
        },
        error::resource::{ValidationError, ValidationErrorKind, ValidationFieldError},
    };

    impl TryFrom<CreateUser> for User {
        type Error = ValidationError;

        fn try_from(dto: CreateUser) -> Result<Self, Self::Error> {
            let mut errors = Vec::new();

            if dto.name.is_empty() {
                errors.push(field_error::<String>("name", "", ValidationErrorKind::MinLength(1)));
            }

            let birth = match non_empty(dto.birth) {
                Some(raw) => match parse_display_date(&raw) {
                    Ok(date) => Some(date),
                    Err(kind) => {
                        errors.push(field_error::<NaiveDate>("birth", &raw, kind));
                        None
                    }
                },
                None => None,
            };

            if !errors.is_empty() {
                return Err(ValidationError::from_resource::<CreateUser>(errors));
            }

            Ok(User::new(
                dto.name,
                birth,
                non_empty(dto.email),
                non_empty(dto.location),
            ))
        }
    }

    impl From<&User> for UserResponse {
        fn from(user: &User) -> Self {
            Self {
                id: user.ident(),
                name: user.name().clone(),
                birth: user
                    .birth()
                    .as_ref()
                    .map(format_display_date)
                    .unwrap_or_default(),
                email: user.email().clone().unwrap_or_default(),
                location: user.location().clone(),
                created_at: format_display_datetime(&user.created()),
                updated_at: format_display_datetime(&user.updated()),
                active: user.active(),
            }
        }
    }

    impl From<User> for UserResponse {
        fn from(user: User) -> Self {
            Self::from(&user)
        }
    }

    pub fn user_list_response(users: Vec<User>) -> Vec<UserResponse> {
        users.iter().map(UserResponse::from).collect()
    }

    /// Parses every requested id, reporting all the malformed ones.
    pub fn search_ids(dto: SearchUsers) -> Result<Vec<Uuid>, ValidationError> {
        let mut ids = Vec::with_capacity(dto.users.len());
        let mut errors = Vec::new();

        for (index, raw) in dto.users.iter().enumerate() {
            match raw.parse::<Uuid>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    errors.push(ValidationFieldError::from_resource::<Uuid>(
                        raw.clone(),
                        JsonPointer::field("users").push(index).into(),
                        vec![ValidationErrorKind::InvalidType],
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(ValidationError::from_resource::<SearchUsers>(errors));
        }

        Ok(ids)
    }

    /// Changes requested by an update body. The body must carry at least one field.
    pub fn update_changes(id: Uuid, dto: UpdateUser) -> Result<UserChanges, ValidationError> {
        if dto.is_empty() {
            return Err(ValidationError::from_resource::<UpdateUser>(vec![
                ValidationFieldError::from_resource::<UpdateUser>(
                    "{}".into(),
                    JsonPointer::default().into(),
                    vec![ValidationErrorKind::MinProperties(1)],
                ),
            ]));
        }

        build_update_params(id, dto)
    }

    fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|value| !value.is_empty())
    }

}
