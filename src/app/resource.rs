pub mod user {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use crate::base::resource_id;
    use crate::domain::datatype::{flag::Flag, patch::Patch};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CreateUser {
        pub name: String,
        pub birth: Option<String>,
        pub email: Option<String>,
        pub location: Option<String>,
    }

    resource_id!(CreateUser, "users::CreateUser");

    /// Partial update body. Every field distinguishes absent, null and value.
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct UpdateUser {
        #[serde(default)]
        pub name: Patch<String>,
        #[serde(default)]
        pub birth: Patch<String>,
        #[serde(default)]
        pub email: Patch<String>,
        #[serde(default)]
        pub location: Patch<String>,
        #[serde(default)]
        pub active: Patch<Flag>,
    }

    resource_id!(UpdateUser, "users::UpdateUser");

    impl UpdateUser {
        /// Number of fields present in the request.
        pub fn len(&self) -> usize {
            [
                self.name.is_unset(),
                self.birth.is_unset(),
                self.email.is_unset(),
                self.location.is_unset(),
                self.active.is_unset(),
            ]
            .into_iter()
            .filter(|unset| !unset)
            .count()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SearchUsers {
        pub users: Vec<String>,
    }

    resource_id!(SearchUsers, "users::SearchUsers");

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserResponse {
        pub id: Uuid,
        pub name: String,
        pub birth: String,
        pub email: String,
        pub location: Option<String>,
        pub created_at: String,
        pub updated_at: String,
        pub active: bool,
    }
}

pub mod envelope {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct DataResource<T> {
        pub data: T,
    }

    impl<T> From<T> for DataResource<T> {
        fn from(data: T) -> Self {
            Self { data }
        }
    }

    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct HealthResponse {
        pub status: String,
    }
}
