//! Database models.

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use push_core::{Device, Provider};

use crate::schema::devices;

/// Device record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = devices)]
pub struct DeviceRow {
    pub id: String,
    pub registration_token: String,
    pub provider: String,
    pub application_id: String,
    pub name: Option<String>,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl DeviceRow {
    pub fn into_device(self) -> color_eyre::eyre::Result<Device> {
        Ok(Device {
            id: self.id.parse().wrap_err("invalid device id")?,
            registration_token: self.registration_token,
            application_id: self.application_id,
            provider: self
                .provider
                .parse::<Provider>()
                .map_err(|e| color_eyre::eyre::eyre!(e))?,
            active: self.active,
        })
    }
}

/// New device for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub id: &'a str,
    pub registration_token: &'a str,
    pub provider: &'a str,
    pub application_id: &'a str,
    pub name: Option<&'a str>,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}
