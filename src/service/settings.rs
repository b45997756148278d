use std::sync::Arc;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::settings::{CompanySettings, SettingsUpdate},
    store::SettingsStore,
};

pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Stored policy, seeding the defaults on first use.
    pub async fn current(&self) -> AppResult<CompanySettings> {
        if let Some(settings) = self.store.load_settings().await? {
            return Ok(settings);
        }
        let defaults = CompanySettings::default();
        self.store.save_settings(&defaults).await?;
        tracing::info!("Seeded default company settings");
        Ok(defaults)
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        update: SettingsUpdate,
    ) -> AppResult<CompanySettings> {
        actor.require_admin()?;
        let next = self.current().await?.apply(update)?;
        self.store.save_settings(&next).await?;
        tracing::info!(user_id = %actor.user_id, "Company settings updated");
        Ok(next)
    }
}
