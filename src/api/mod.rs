pub mod absence;
pub mod analytics;
pub mod approval;
pub mod holiday;
pub mod settings;

use crate::error::AppError;
use actix_web::web;

/// Malformed JSON bodies surface as validation errors with the usual error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use actix_web::{
        App, Error,
        body::MessageBody,
        dev::{ServiceFactory, ServiceRequest, ServiceResponse},
        middleware::from_fn,
        web::{self, Data},
    };

    use crate::{
        auth::{jwt::generate_token, middleware::auth_middleware},
        config::{AnalyticsCache, Config},
        integrations::Integrations,
        model::role::Role,
        models::TokenType,
        routes,
        service::{absences::AbsenceService, analytics::AnalyticsService, settings::SettingsService},
        store::memory::MemoryStore,
    };

    pub const TEST_SECRET: &str = "test-secret";

    #[derive(Clone)]
    pub struct TestState {
        pub store: Arc<MemoryStore>,
        config: Config,
        absences: Data<AbsenceService>,
        analytics: Data<AnalyticsService>,
        settings: Data<SettingsService>,
    }

    impl TestState {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let settings = Arc::new(SettingsService::new(store.clone()));
            let absences = AbsenceService::new(
                store.clone(),
                store.clone(),
                settings.clone(),
                Integrations::disabled(),
            );
            let analytics = AnalyticsService::new(store.clone(), store.clone(), store.clone());
            Self {
                config: Config {
                    database_url: "mysql://unused".into(),
                    jwt_secret: TEST_SECRET.into(),
                    server_addr: "127.0.0.1:0".into(),
                    api_prefix: "/api".into(),
                    rate_protected_per_min: 1000,
                    log_dir: "logs".into(),
                    log_level: tracing::Level::DEBUG,
                    graph: None,
                    analytics_cache: AnalyticsCache::Memory,
                },
                absences: Data::new(absences),
                analytics: Data::new(analytics),
                settings: Data::from(settings),
                store,
            }
        }
    }

    /// The protected API without the rate limiter, which needs a peer address.
    pub fn app(
        state: TestState,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(Data::new(state.config))
            .app_data(state.absences)
            .app_data(state.analytics)
            .app_data(state.settings)
            .app_data(super::json_config())
            .app_data(super::query_config())
            .service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .configure(routes::api_routes),
            )
    }

    pub fn bearer(user_id: &str, role: Role) -> (&'static str, String) {
        let token = generate_token(
            user_id,
            &format!("{user_id}@company.com"),
            &format!("Name {user_id}"),
            role.id(),
            TokenType::Access,
            TEST_SECRET,
            900,
        );
        ("Authorization", format!("Bearer {token}"))
    }
}
