//! Store trait implementations generated for each Diesel connection type.
//!
//! The query code is identical across dialects except for upserts, so the
//! implementations are stamped out per connection type with the upsert
//! flavour passed in: `on_conflict` (SQLite, PostgreSQL) or `duplicate_key`
//! (MySQL). SQLite also takes its write lock when the cascade transaction
//! begins (`immediate`), so concurrent cascades wait on `busy_timeout`
//! instead of failing on lock upgrade.

/// Open a transaction in the requested mode.
macro_rules! transaction {
    (deferred, $conn:expr, $body:expr) => {
        $conn.transaction::<_, $crate::error::StoreError, _>($body)
    };
    (immediate, $conn:expr, $body:expr) => {
        $conn.immediate_transaction::<_, $crate::error::StoreError, _>($body)
    };
}

/// Insert-or-update in the syntax of the target dialect.
macro_rules! upsert {
    (on_conflict, $insert:expr, $target:expr, $changes:expr) => {
        $insert.on_conflict($target).do_update().set($changes)
    };
    (duplicate_key, $insert:expr, $target:expr, $changes:expr) => {
        $insert
            .on_conflict(diesel::dsl::DuplicatedKeys)
            .do_update()
            .set($changes)
    };
}

/// Implement every store port for `SqlStorage<$conn>`.
macro_rules! impl_sql_stores {
    ($conn:ty, $dialect:ident, $begin:ident) => {
        const _: () = {
            use std::collections::BTreeSet;

            use async_trait::async_trait;
            use diesel::prelude::*;
            use tokio_util::sync::CancellationToken;
            use tracing::{debug, trace};

            use $crate::adapter::outbound::sql::model::{
                AllocationRow, PresenceRow, ResourceRow, UserRow,
            };
            use $crate::adapter::outbound::sql::schema::{allocations, presences, resources, users};
            use $crate::adapter::outbound::sql::{checkpoint, SqlStorage};
            use $crate::domain::{
                timestamp_now, Allocation, AllocationId, CascadeStep, Presence, Resource, User,
            };
            use $crate::error::{Error, Result, StoreError};
            use $crate::port::outbound::store::{
                AllocationStore, PresenceStore, ResourceStore, UserStore,
            };

            impl SqlStorage<$conn> {
                /// Delete everything `allocation_id` owns, then the allocation,
                /// in one transaction.
                pub(crate) fn unregister_cascade(
                    conn: &mut $conn,
                    allocation_id: &str,
                    cancel: &CancellationToken,
                ) -> std::result::Result<(), StoreError> {
                    Self::unregister_cascade_observed(conn, allocation_id, cancel, |_, _| Ok(()))
                }

                /// [`Self::unregister_cascade`] calling `after_step` inside the
                /// transaction once each step's delete has run. An error from
                /// `after_step` rolls the whole cascade back.
                pub(crate) fn unregister_cascade_observed<F>(
                    conn: &mut $conn,
                    allocation_id: &str,
                    cancel: &CancellationToken,
                    mut after_step: F,
                ) -> std::result::Result<(), StoreError>
                where
                    F: FnMut(CascadeStep, &mut $conn) -> std::result::Result<(), StoreError>,
                {
                    $crate::adapter::outbound::sql::stores::transaction!($begin, conn, |conn| {
                        for step in CascadeStep::ORDER {
                            checkpoint(cancel)?;
                            let deleted = match step {
                                CascadeStep::Presences => diesel::delete(
                                    presences::table
                                        .filter(presences::allocation_id.eq(allocation_id)),
                                )
                                .execute(conn)?,
                                CascadeStep::Resources => diesel::delete(
                                    resources::table
                                        .filter(resources::allocation_id.eq(allocation_id)),
                                )
                                .execute(conn)?,
                                CascadeStep::Allocation => diesel::delete(
                                    allocations::table.filter(allocations::id.eq(allocation_id)),
                                )
                                .execute(conn)?,
                            };
                            trace!(allocation_id, %step, deleted, "cascade step");
                            after_step(step, conn)?;
                        }
                        checkpoint(cancel)
                    })
                }
            }

            #[async_trait]
            impl AllocationStore for SqlStorage<$conn> {
                async fn register_allocation(&self, id: &AllocationId) -> Result<()> {
                    const OP: &str = "register_allocation";
                    id.ensure_valid()
                        .map_err(|e| Error::store(OP, id.as_str(), e))?;

                    let key = id.to_string();
                    self.run(OP, id.as_str(), move |conn, _| {
                        let now = timestamp_now();
                        let row = AllocationRow {
                            id: key,
                            created_at: now,
                            updated_at: now,
                        };
                        $crate::adapter::outbound::sql::stores::upsert!(
                            $dialect,
                            diesel::insert_into(allocations::table).values(&row),
                            allocations::id,
                            allocations::updated_at.eq(now)
                        )
                        .execute(conn)?;
                        Ok(())
                    })
                    .await?;
                    debug!(allocation_id = %id, "allocation registered");
                    Ok(())
                }

                async fn unregister_allocation(&self, id: &AllocationId) -> Result<()> {
                    const OP: &str = "unregister_allocation";
                    id.ensure_valid()
                        .map_err(|e| Error::store(OP, id.as_str(), e))?;

                    let key = id.to_string();
                    self.run(OP, id.as_str(), move |conn, cancel| {
                        Self::unregister_cascade(conn, &key, cancel)
                    })
                    .await?;
                    debug!(allocation_id = %id, "allocation unregistered");
                    Ok(())
                }

                async fn fetch_allocations(&self) -> Result<BTreeSet<AllocationId>> {
                    self.run("fetch_allocations", "", |conn, _| {
                        let ids: Vec<String> = allocations::table
                            .select(allocations::id)
                            .distinct()
                            .load(conn)?;
                        Ok(ids.into_iter().map(AllocationId::from).collect())
                    })
                    .await
                }

                async fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>> {
                    let key = id.to_string();
                    self.run("fetch_allocation", id.as_str(), move |conn, _| {
                        let row: Option<AllocationRow> = allocations::table
                            .filter(allocations::id.eq(&key))
                            .select(AllocationRow::as_select())
                            .first(conn)
                            .optional()?;
                        Ok(row.map(Allocation::from))
                    })
                    .await
                }
            }

            #[async_trait]
            impl PresenceStore for SqlStorage<$conn> {
                async fn upsert_presence(&self, presence: &Presence) -> Result<()> {
                    let record = presence.clone();
                    self.run("upsert_presence", &presence.username, move |conn, _| {
                        let row = PresenceRow::stamped(&record, timestamp_now());
                        $crate::adapter::outbound::sql::stores::upsert!(
                            $dialect,
                            diesel::insert_into(presences::table).values(&row),
                            (presences::username, presences::resource),
                            (
                                presences::allocation_id.eq(&row.allocation_id),
                                presences::available.eq(row.available),
                                presences::priority.eq(row.priority),
                                presences::status.eq(&row.status),
                                presences::updated_at.eq(row.updated_at),
                            )
                        )
                        .execute(conn)?;
                        Ok(())
                    })
                    .await
                }

                async fn fetch_presence(
                    &self,
                    username: &str,
                    resource: &str,
                ) -> Result<Option<Presence>> {
                    let (username_key, resource_key) = (username.to_string(), resource.to_string());
                    self.run("fetch_presence", username, move |conn, _| {
                        let row: Option<PresenceRow> = presences::table
                            .filter(presences::username.eq(&username_key))
                            .filter(presences::resource.eq(&resource_key))
                            .select(PresenceRow::as_select())
                            .first(conn)
                            .optional()?;
                        Ok(row.map(Presence::from))
                    })
                    .await
                }

                async fn fetch_presences(&self, username: &str) -> Result<Vec<Presence>> {
                    let key = username.to_string();
                    self.run("fetch_presences", username, move |conn, _| {
                        let rows: Vec<PresenceRow> = presences::table
                            .filter(presences::username.eq(&key))
                            .order(presences::resource.asc())
                            .select(PresenceRow::as_select())
                            .load(conn)?;
                        Ok(rows.into_iter().map(Presence::from).collect())
                    })
                    .await
                }

                async fn delete_presence(&self, username: &str, resource: &str) -> Result<bool> {
                    let (username_key, resource_key) = (username.to_string(), resource.to_string());
                    self.run("delete_presence", username, move |conn, _| {
                        let deleted = diesel::delete(
                            presences::table
                                .filter(presences::username.eq(&username_key))
                                .filter(presences::resource.eq(&resource_key)),
                        )
                        .execute(conn)?;
                        Ok(deleted > 0)
                    })
                    .await
                }

                async fn fetch_allocation_presences(
                    &self,
                    allocation_id: &AllocationId,
                ) -> Result<Vec<Presence>> {
                    let key = allocation_id.to_string();
                    self.run("fetch_allocation_presences", allocation_id.as_str(), move |conn, _| {
                        let rows: Vec<PresenceRow> = presences::table
                            .filter(presences::allocation_id.eq(&key))
                            .order((presences::username.asc(), presences::resource.asc()))
                            .select(PresenceRow::as_select())
                            .load(conn)?;
                        Ok(rows.into_iter().map(Presence::from).collect())
                    })
                    .await
                }
            }

            #[async_trait]
            impl ResourceStore for SqlStorage<$conn> {
                async fn upsert_resource(&self, resource: &Resource) -> Result<()> {
                    let record = resource.clone();
                    self.run("upsert_resource", &resource.username, move |conn, _| {
                        let row = ResourceRow::stamped(&record, timestamp_now());
                        $crate::adapter::outbound::sql::stores::upsert!(
                            $dialect,
                            diesel::insert_into(resources::table).values(&row),
                            (resources::username, resources::resource),
                            (
                                resources::allocation_id.eq(&row.allocation_id),
                                resources::priority.eq(row.priority),
                                resources::updated_at.eq(row.updated_at),
                            )
                        )
                        .execute(conn)?;
                        Ok(())
                    })
                    .await
                }

                async fn fetch_resource(
                    &self,
                    username: &str,
                    resource: &str,
                ) -> Result<Option<Resource>> {
                    let (username_key, resource_key) = (username.to_string(), resource.to_string());
                    self.run("fetch_resource", username, move |conn, _| {
                        let row: Option<ResourceRow> = resources::table
                            .filter(resources::username.eq(&username_key))
                            .filter(resources::resource.eq(&resource_key))
                            .select(ResourceRow::as_select())
                            .first(conn)
                            .optional()?;
                        Ok(row.map(Resource::from))
                    })
                    .await
                }

                async fn fetch_resources(&self, username: &str) -> Result<Vec<Resource>> {
                    let key = username.to_string();
                    self.run("fetch_resources", username, move |conn, _| {
                        let rows: Vec<ResourceRow> = resources::table
                            .filter(resources::username.eq(&key))
                            .order(resources::resource.asc())
                            .select(ResourceRow::as_select())
                            .load(conn)?;
                        Ok(rows.into_iter().map(Resource::from).collect())
                    })
                    .await
                }

                async fn delete_resource(&self, username: &str, resource: &str) -> Result<bool> {
                    let (username_key, resource_key) = (username.to_string(), resource.to_string());
                    self.run("delete_resource", username, move |conn, _| {
                        let deleted = diesel::delete(
                            resources::table
                                .filter(resources::username.eq(&username_key))
                                .filter(resources::resource.eq(&resource_key)),
                        )
                        .execute(conn)?;
                        Ok(deleted > 0)
                    })
                    .await
                }

                async fn fetch_allocation_resources(
                    &self,
                    allocation_id: &AllocationId,
                ) -> Result<Vec<Resource>> {
                    let key = allocation_id.to_string();
                    self.run("fetch_allocation_resources", allocation_id.as_str(), move |conn, _| {
                        let rows: Vec<ResourceRow> = resources::table
                            .filter(resources::allocation_id.eq(&key))
                            .order((resources::username.asc(), resources::resource.asc()))
                            .select(ResourceRow::as_select())
                            .load(conn)?;
                        Ok(rows.into_iter().map(Resource::from).collect())
                    })
                    .await
                }
            }

            #[async_trait]
            impl UserStore for SqlStorage<$conn> {
                async fn upsert_user(&self, user: &User) -> Result<()> {
                    let (username, password_hash) =
                        (user.username.clone(), user.password_hash.clone());
                    self.run("upsert_user", &user.username, move |conn, _| {
                        let now = timestamp_now();
                        let row = UserRow {
                            username,
                            password_hash,
                            created_at: now,
                            updated_at: now,
                        };
                        $crate::adapter::outbound::sql::stores::upsert!(
                            $dialect,
                            diesel::insert_into(users::table).values(&row),
                            users::username,
                            (
                                users::password_hash.eq(&row.password_hash),
                                users::updated_at.eq(now),
                            )
                        )
                        .execute(conn)?;
                        Ok(())
                    })
                    .await
                }

                async fn fetch_user(&self, username: &str) -> Result<Option<User>> {
                    let key = username.to_string();
                    self.run("fetch_user", username, move |conn, _| {
                        let row: Option<UserRow> = users::table
                            .filter(users::username.eq(&key))
                            .select(UserRow::as_select())
                            .first(conn)
                            .optional()?;
                        Ok(row.map(User::from))
                    })
                    .await
                }

                async fn delete_user(&self, username: &str) -> Result<bool> {
                    let key = username.to_string();
                    self.run("delete_user", username, move |conn, _| {
                        let deleted =
                            diesel::delete(users::table.filter(users::username.eq(&key)))
                                .execute(conn)?;
                        Ok(deleted > 0)
                    })
                    .await
                }

                async fn user_exists(&self, username: &str) -> Result<bool> {
                    let key = username.to_string();
                    self.run("user_exists", username, move |conn, _| {
                        let exists = diesel::select(diesel::dsl::exists(
                            users::table.filter(users::username.eq(&key)),
                        ))
                        .get_result::<bool>(conn)?;
                        Ok(exists)
                    })
                    .await
                }
            }
        };
    };
}

pub(crate) use impl_sql_stores;
pub(crate) use transaction;
pub(crate) use upsert;
