use crate::{api::attendance, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let write_limiter = Arc::new(build_limiter(config.rate_write_per_min));
    let read_limiter = Arc::new(build_limiter(config.rate_read_per_min));

    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/attendance")
                // Mutations: debounced single records, bulk marks, reset
                .service(
                    web::resource("/record")
                        .wrap(write_limiter.clone())
                        .route(web::post().to(attendance::record)),
                )
                .service(
                    web::resource("/record-batch")
                        .wrap(write_limiter.clone())
                        .route(web::post().to(attendance::record_batch)),
                )
                .service(
                    web::resource("/reset")
                        .wrap(write_limiter)
                        .route(web::post().to(attendance::reset)),
                )
                // Reads: unit-leader roster view and admin aggregates
                .service(
                    web::resource("/campers/{program}/{week}")
                        .wrap(read_limiter.clone())
                        .route(web::get().to(attendance::campers)),
                )
                .service(
                    web::resource("/summary")
                        .wrap(read_limiter.clone())
                        .route(web::get().to(attendance::summary)),
                )
                .service(
                    web::resource("/detail/{program}")
                        .wrap(read_limiter.clone())
                        .route(web::get().to(attendance::detail)),
                )
                .service(
                    web::resource("/checkpoints")
                        .wrap(read_limiter.clone())
                        .route(web::get().to(attendance::checkpoints)),
                )
                .service(
                    web::resource("/week-info")
                        .wrap(read_limiter)
                        .route(web::get().to(attendance::week_info)),
                ),
        ),
    );
}
