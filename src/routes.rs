use crate::{
    api::{balance, leave_request},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

// Helper to build the per-scope limiter; `None` if the quota cannot be built
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / u64::from(requests_per_min)).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

fn leave_scope() -> actix_web::Scope {
    web::scope("/leave")
        // /leave
        .service(
            web::resource("")
                .route(web::get().to(leave_request::leave_list))
                .route(web::post().to(leave_request::create_leave)),
        )
        // /leave/{id}
        .service(
            web::resource("/{id}")
                .route(web::get().to(leave_request::get_leave))
                .route(web::put().to(leave_request::update_leave)),
        )
        .service(
            web::resource("/{id}/documents")
                .route(web::post().to(leave_request::attach_document)),
        )
        .service(web::resource("/{id}/submit").route(web::put().to(leave_request::submit_leave)))
        .service(web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)))
        .service(web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)))
        .service(web::resource("/{id}/cancel").route(web::put().to(leave_request::cancel_leave)))
        .service(web::resource("/{id}/post").route(web::put().to(leave_request::post_leave)))
}

fn balance_scope() -> actix_web::Scope {
    web::scope("/balance")
        .service(web::resource("").route(web::get().to(balance::get_balance)))
        .service(
            web::resource("/adjustments").route(web::post().to(balance::adjust_balance)),
        )
}

/// Mounts the protected API under `config.api_prefix`. Every handler
/// authenticates through the `AuthUser` extractor.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let scope = web::scope(&config.api_prefix);
    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => cfg.service(
            scope
                .wrap(limiter) // rate limiting
                .service(leave_scope())
                .service(balance_scope()),
        ),
        None => {
            tracing::warn!(
                rate = config.rate_protected_per_min,
                "Invalid rate limit; serving without limiter"
            );
            cfg.service(scope.service(leave_scope()).service(balance_scope()))
        }
    };
}
