//! SQLite storage implementation.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use push_core::{Device, Provider};

use crate::models::*;
use crate::schema::devices;
use crate::traits::DeviceStore;

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based device store.
#[derive(Clone)]
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    /// Create a new SQLite device store from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        let applied = conn
            .run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;
        tracing::info!(applied = applied.len(), "ran pending migrations");

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl DeviceStore for SqliteDeviceStore {
    fn register(&self, device: &Device) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();
        let id = device.id.to_string();

        let updated = diesel::update(
            devices::table
                .filter(devices::provider.eq(device.provider.as_str()))
                .filter(devices::registration_token.eq(&device.registration_token)),
        )
        .set((
            devices::application_id.eq(&device.application_id),
            devices::active.eq(device.active),
        ))
        .execute(&mut conn)
        .wrap_err("failed to update device")?;

        if updated == 0 {
            tracing::debug!(
                provider = %device.provider,
                token = %device.registration_token,
                "registering new device"
            );
            let new_device = NewDevice {
                id: &id,
                registration_token: &device.registration_token,
                provider: device.provider.as_str(),
                application_id: &device.application_id,
                name: None,
                active: device.active,
                created_at: now,
            };

            diesel::insert_into(devices::table)
                .values(&new_device)
                .execute(&mut conn)
                .wrap_err("failed to register device")?;
        }

        Ok(())
    }

    fn active_devices(
        &self,
        provider: Provider,
        application_id: &str,
    ) -> color_eyre::eyre::Result<Vec<Device>> {
        let mut conn = self.conn()?;

        let rows: Vec<DeviceRow> = devices::table
            .filter(devices::provider.eq(provider.as_str()))
            .filter(devices::application_id.eq(application_id))
            .filter(devices::active.eq(true))
            .order(devices::created_at.asc())
            .load(&mut conn)
            .wrap_err("failed to list active devices")?;

        rows.into_iter().map(DeviceRow::into_device).collect()
    }

    fn find_by_token(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<Option<Device>> {
        let mut conn = self.conn()?;

        let row: Option<DeviceRow> = devices::table
            .filter(devices::provider.eq(provider.as_str()))
            .filter(devices::registration_token.eq(registration_token))
            .first(&mut conn)
            .optional()
            .wrap_err("failed to look up device by token")?;

        row.map(DeviceRow::into_device).transpose()
    }

    fn deactivate(
        &self,
        provider: Provider,
        registration_token: &str,
    ) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        diesel::update(
            devices::table
                .filter(devices::provider.eq(provider.as_str()))
                .filter(devices::registration_token.eq(registration_token)),
        )
        .set(devices::active.eq(false))
        .execute(&mut conn)
        .wrap_err("failed to deactivate device")?;

        Ok(())
    }

    fn update_token(
        &self,
        device_id: uuid::Uuid,
        new_token: &str,
    ) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        diesel::update(devices::table.filter(devices::id.eq(device_id.to_string())))
            .set(devices::registration_token.eq(new_token))
            .execute(&mut conn)
            .wrap_err("failed to update registration token")?;

        Ok(())
    }
}
