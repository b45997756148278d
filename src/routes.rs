use crate::{
    api::{absence, analytics, approval, holiday, settings},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Governor::new(&cfg))
}

/// Mounts the protected API under `API_PREFIX` with authentication and rate limiting.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: &Limiter) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(limiter.clone()) // rate limiting
            .configure(api_routes),
    );
}

/// Built once so every worker shares the same quota.
pub fn protected_limiter(config: &Config) -> anyhow::Result<Limiter> {
    Ok(Arc::new(build_limiter(config.rate_protected_per_min)?))
}

pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/absences")
            // /absences
            .service(
                web::resource("")
                    .route(web::get().to(absence::list_absences))
                    .route(web::post().to(absence::create_absence)),
            )
            // /absences/stats, registered ahead of /{id}
            .service(web::resource("/stats").route(web::get().to(absence::absence_stats)))
            // /absences/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(absence::get_absence))
                    .route(web::put().to(absence::update_absence))
                    .route(web::delete().to(absence::cancel_absence)),
            ),
    )
    .service(
        web::scope("/approvals")
            .service(web::resource("").route(web::get().to(approval::approval_queue)))
            .service(
                web::resource("/{id}/approve").route(web::post().to(approval::approve_absence)),
            )
            .service(
                web::resource("/{id}/reject").route(web::post().to(approval::reject_absence)),
            ),
    )
    .service(
        web::scope("/analytics")
            .service(web::resource("").route(web::get().to(analytics::get_analytics)))
            .service(
                web::resource("/departments")
                    .route(web::get().to(analytics::department_analytics)),
            )
            .service(web::resource("/sick-trends").route(web::get().to(analytics::sick_trends))),
    )
    .service(
        web::scope("/holidays")
            .service(web::resource("").route(web::get().to(holiday::list_holidays)))
            .service(web::resource("/upcoming").route(web::get().to(holiday::upcoming)))
            .service(web::resource("/bridge-days").route(web::get().to(holiday::bridge_days))),
    )
    .service(
        web::resource("/settings/company")
            .route(web::get().to(settings::get_company_settings))
            .route(web::put().to(settings::update_company_settings)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_edge_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
