use crate::{
    api::{leave_request, leave_type, substitute_grant},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Limiter shared by every worker; one instance keeps a single quota per client IP.
pub type ProtectedLimiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

pub fn configure(
    cfg: &mut web::ServiceConfig,
    config: &Config,
    limiter: ProtectedLimiter,
) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("/types").route(web::get().to(leave_type::list_leave_types)),
                    )
                    .service(
                        web::resource("/balances").route(web::get().to(leave_type::list_balances)),
                    )
                    .service(
                        web::resource("/holidays").route(web::get().to(leave_type::list_holidays)),
                    )
                    // /leave/requests
                    .service(
                        web::resource("/requests")
                            .route(web::post().to(leave_request::create_leave_request))
                            .route(web::get().to(leave_request::list_leave_requests)),
                    )
                    .service(
                        web::resource("/requests/mine")
                            .route(web::get().to(leave_request::my_leave_requests)),
                    )
                    .service(
                        web::resource("/requests/{id}")
                            .route(web::get().to(leave_request::get_leave_request)),
                    )
                    .service(
                        web::resource("/requests/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave_request)),
                    )
                    .service(
                        web::resource("/requests/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave_request)),
                    )
                    // /leave/substitute-grants
                    .service(
                        web::resource("/substitute-grants")
                            .route(web::get().to(substitute_grant::list_grants))
                            .route(web::post().to(substitute_grant::create_grant)),
                    )
                    .service(
                        web::resource("/substitute-grants/summary")
                            .route(web::get().to(substitute_grant::grant_summary)),
                    )
                    .service(
                        web::resource("/substitute-grants/reconcile")
                            .route(web::post().to(substitute_grant::reconcile_grants)),
                    )
                    .service(
                        web::resource("/substitute-grants/{id}")
                            .route(web::put().to(substitute_grant::update_grant))
                            .route(web::delete().to(substitute_grant::delete_grant)),
                    ),
            ),
    );
}

/// Builds the per-IP limiter for the protected scope.
pub fn protected_limiter(config: &Config) -> anyhow::Result<ProtectedLimiter> {
    Ok(Arc::new(build_limiter(config.rate_protected_per_min)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_accepts_zero_rate() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1000).is_ok());
    }

    #[actix_web::test]
    async fn test_shared_limiter_serves_several_apps() {
        use actix_web::{App, test};

        let limiter: ProtectedLimiter = Arc::new(build_limiter(60).unwrap());
        for _ in 0..2 {
            let limiter = limiter.clone();
            let app = test::init_service(
                App::new().service(
                    web::scope("/api")
                        .wrap(limiter)
                        .route("/ping", web::get().to(|| async { "pong" })),
                ),
            )
            .await;
            let req = test::TestRequest::get()
                .uri("/api/ping")
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }
    }
}
