pub mod connection {
    use std::time::Duration;

    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    use crate::config::env_var::DatabaseConfig;
    use crate::error::persistence::PersistenceError;

    pub async fn create_sqlx_pool(config: &DatabaseConfig) -> Result<sqlx::PgPool, PersistenceError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password)
            .application_name("users_api");

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Duration::from_millis(1000 * 30))
            .max_lifetime(Duration::from_millis(1000 * 60 * 30))
            .connect_with(options)
            .await?;

        Ok(pool)
    }
}

pub mod migration {
    use sqlx::PgPool;

    use crate::error::persistence::PersistenceError;

    /// Applies pending migrations from `migrations/`. A no-op when the schema is current.
    pub async fn run(pool: &PgPool) -> Result<(), PersistenceError> {
        sqlx::migrate!().run(pool).await?;
        Ok(())
    }
}

pub mod sql {
    use sqlx::{Database, Encode, QueryBuilder, Type};

    use crate::domain::datatype::patch::Patch;

    pub fn push_list<'args, I, T, DB>(qb: &mut QueryBuilder<'args, DB>, list: I)
    where
        I: IntoIterator<Item = T>,
        T: 'args + Encode<'args, DB> + Send + Type<DB>,
        DB: Database,
    {
        qb.push("(");
        let mut sep = qb.separated(", ");
        for item in list {
            sep.push_bind(item);
        }
        sep.push_unseparated(")");
    }

    /// Pushes `, column = value` to an `UPDATE ... SET` list, or nothing when unset.
    pub fn push_patch<'args, T, DB>(qb: &mut QueryBuilder<'args, DB>, column: &str, patch: Patch<T>)
    where
        T: 'args + Encode<'args, DB> + Send + Type<DB>,
        DB: Database,
    {
        match patch {
            Patch::Unset => {}
            Patch::Null => {
                qb.push(", ").push(column).push(" = NULL");
            }
            Patch::Value(value) => {
                qb.push(", ").push(column).push(" = ").push_bind(value);
            }
        }
    }
}

pub mod row {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    pub const USER_COLUMNS: &str =
        "id, name, birth, email, location, active, created_at, updated_at";

    /// A `users` table row.
    #[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
    pub struct UserRow {
        pub id: Uuid,
        pub name: String,
        pub birth: Option<NaiveDate>,
        pub email: Option<String>,
        pub location: Option<String>,
        pub active: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod statement {
    use sqlx::{Postgres, QueryBuilder};
    use uuid::Uuid;

    use super::{row::USER_COLUMNS, sql};
    use crate::domain::{
        entity::user::{User, UserChanges},
        transform::user_to_row,
    };

    pub fn select_active() -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(USER_COLUMNS).push(" FROM users WHERE active = TRUE");
        qb
    }

    pub fn select_by_ids(ids: &[Uuid]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(USER_COLUMNS).push(" FROM users WHERE id IN ");
        sql::push_list(&mut qb, ids.iter().copied());
        qb
    }

    /// Insert returning no row when the id is already taken.
    pub fn insert(user: &User) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(
            "INSERT INTO users (id, name, birth, email, location, active, created_at, updated_at) ",
        );

        qb.push_values([user_to_row(user)], |mut qb, row| {
            qb.push_bind(row.id);
            qb.push_bind(row.name);
            qb.push_bind(row.birth);
            qb.push_bind(row.email);
            qb.push_bind(row.location);
            qb.push_bind(row.active);
            qb.push_bind(row.created_at);
            qb.push_bind(row.updated_at);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING RETURNING ")
            .push(USER_COLUMNS);
        qb
    }

    /// Update of the present fields only, returning no row when the id is unknown.
    pub fn update(changes: &UserChanges) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("UPDATE users SET updated_at = ");
        qb.push_bind(changes.updated);

        if let Some(name) = &changes.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        sql::push_patch(&mut qb, "birth", changes.birth.clone());
        sql::push_patch(&mut qb, "email", changes.email.clone());
        sql::push_patch(&mut qb, "location", changes.location.clone());
        if let Some(active) = changes.active {
            qb.push(", active = ").push_bind(active);
        }

        qb.push(" WHERE id = ").push_bind(changes.id);
        qb.push(" RETURNING ").push(USER_COLUMNS);
        qb
    }

}

pub mod repository {
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use sqlx::{PgPool, Postgres, QueryBuilder};
    use tracing::instrument;
    use uuid::Uuid;

    use super::{row::UserRow, statement};
    use crate::{
        domain::{
            entity::{
                user::{User, UserChanges},
                Entity,
            },
            repository::UserRepository,
            transform::{row_to_user, rows_to_user_list},
        },
        error::persistence::PersistenceError,
    };

    #[derive(Debug, Clone)]
    pub struct PgUserRepository {
        pool: PgPool,
    }

    impl PgUserRepository {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        async fn fetch_users(
            &self,
            mut qb: QueryBuilder<'_, Postgres>,
        ) -> Result<Vec<User>, PersistenceError> {
            let rows: Vec<UserRow> = qb
                .build_query_as::<UserRow>()
                .fetch(&self.pool)
                .try_collect()
                .await?;
            let users = rows_to_user_list(rows)?;

            tracing::Span::current().record("rows", users.len() as u64);
            Ok(users)
        }

        async fn fetch_returning(
            &self,
            mut qb: QueryBuilder<'_, Postgres>,
            missing: PersistenceError,
        ) -> Result<User, PersistenceError> {
            let row = qb
                .build_query_as::<UserRow>()
                .fetch_optional(&self.pool)
                .await?
                .ok_or(missing)?;

            Ok(row_to_user(row)?)
        }
    }

    #[async_trait]
    impl UserRepository for PgUserRepository {
        #[instrument(name = "repository.list", skip(self), fields(rows = tracing::field::Empty))]
        async fn list(&self) -> Result<Vec<User>, PersistenceError> {
            self.fetch_users(statement::select_active()).await
        }

        #[instrument(name = "repository.get_by_ids", skip(self), fields(rows = tracing::field::Empty))]
        async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, PersistenceError> {
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            self.fetch_users(statement::select_by_ids(ids)).await
        }

        #[instrument(name = "repository.save", skip_all, fields(user.id = %user.ident()))]
        async fn save(&self, user: &User) -> Result<User, PersistenceError> {
            self.fetch_returning(statement::insert(user), PersistenceError::Conflict)
                .await
        }

        #[instrument(name = "repository.update", skip_all, fields(user.id = %changes.id))]
        async fn update(&self, changes: &UserChanges) -> Result<User, PersistenceError> {
            self.fetch_returning(statement::update(changes), PersistenceError::NotFound)
                .await
        }

        #[instrument(name = "repository.remove", skip(self))]
        async fn remove(&self, id: Uuid) -> Result<bool, PersistenceError> {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() > 0)
        }
    }
}
