pub mod user {
    use tracing::instrument;
    use uuid::Uuid;

    use crate::{
        domain::{
            entity::{
                user::{User, UserChanges},
                Entity,
            },
            repository::UserRepository,
        },
        error::{
            app::ApplicationError,
            persistence::PersistenceError,
            resource::{ConflictError, NotFoundError},
        },
    };

    mod guard {
        use super::*;

        pub async fn user_absent<R>(repo: &R, id: Uuid) -> Result<(), ApplicationError>
        where
            R: UserRepository + ?Sized,
        {
            if !repo.get_by_ids(&[id]).await?.is_empty() {
                return Err(ConflictError::from_resource::<User>(id).into());
            }
            Ok(())
        }

        pub async fn user_present<R>(repo: &R, id: Uuid) -> Result<(), ApplicationError>
        where
            R: UserRepository + ?Sized,
        {
            if repo.get_by_ids(&[id]).await?.len() != 1 {
                return Err(NotFoundError::from_resource::<User>(id).into());
            }
            Ok(())
        }
    }

    #[instrument(name = "use_case.get_users", skip_all)]
    pub async fn get_users<R>(repo: &R) -> Result<Vec<User>, ApplicationError>
    where
        R: UserRepository + ?Sized,
    {
        Ok(repo.list().await?)
    }

    /// Users with the given ids. Unknown ids are skipped and repeated ids yield a single user.
    #[instrument(name = "use_case.get_users_by_id", skip(repo))]
    pub async fn get_users_by_id<R>(repo: &R, ids: &[Uuid]) -> Result<Vec<User>, ApplicationError>
    where
        R: UserRepository + ?Sized,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        Ok(repo.get_by_ids(&unique).await?)
    }

    #[instrument(name = "use_case.save_user", skip_all, fields(user.id = %user.ident()))]
    pub async fn save_user<R>(repo: &R, user: User) -> Result<User, ApplicationError>
    where
        R: UserRepository + ?Sized,
    {
        let id = user.ident();
        guard::user_absent(repo, id).await?;

        repo.save(&user).await.map_err(|err| -> ApplicationError {
            match err {
                PersistenceError::Conflict => ConflictError::from_resource::<User>(id).into(),
                err => err.into(),
            }
        })
    }

    #[instrument(name = "use_case.update_user", skip_all, fields(user.id = %changes.id))]
    pub async fn update_user<R>(repo: &R, changes: UserChanges) -> Result<User, ApplicationError>
    where
        R: UserRepository + ?Sized,
    {
        let id = changes.id;
        guard::user_present(repo, id).await?;

        repo.update(&changes).await.map_err(|err| -> ApplicationError {
            match err {
                PersistenceError::NotFound => NotFoundError::from_resource::<User>(id).into(),
                err => err.into(),
            }
        })
    }

    #[instrument(name = "use_case.remove_user", skip(repo))]
    pub async fn remove_user<R>(repo: &R, id: Uuid) -> Result<(), ApplicationError>
    where
        R: UserRepository + ?Sized,
    {
        guard::user_present(repo, id).await?;

        if !repo.remove(id).await? {
            return Err(NotFoundError::from_resource::<User>(id).into());
        }
        Ok(())
    }

}
