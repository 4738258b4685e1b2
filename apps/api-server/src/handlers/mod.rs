//! HTTP handlers and route configuration.

mod health;
mod ops;
mod posts;
mod users;

use actix_web::{http::Method, web};

use crate::middleware::{Admission, BasicAuth};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Operational routes, basic auth only
            .service(
                web::scope("/debug")
                    .wrap(BasicAuth)
                    .route("/vars", web::get().to(ops::debug_vars)),
            )
            // Authenticated routes
            .service(
                web::scope("/users")
                    .wrap(Admission::authenticated())
                    .route("/me", web::get().to(users::me))
                    .route("/{user_id}", web::get().to(users::get_user)),
            )
            .service(
                web::resource("/posts/{post_id}")
                    .wrap(
                        Admission::authenticated()
                            .owner_or_role(Method::PATCH, "moderator")
                            .owner_or_role(Method::DELETE, "admin"),
                    )
                    .route(web::get().to(posts::get_post))
                    .route(web::patch().to(posts::update_post))
                    .route(web::delete().to(posts::delete_post)),
            ),
    );
}
