use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::configuration::Settings;
use crate::identity::IdentityStore;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{health_check, login, logout, me, refresh};
use crate::session::SessionCookies;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn IdentityStore>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let issuer = web::Data::new(TokenIssuer::new(settings.jwt.clone()));
    let cookies = web::Data::new(SessionCookies::new(
        settings.application.environment,
        &settings.jwt,
    ));
    let store = web::Data::from(store);
    let jwt_config = settings.jwt;

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(store.clone())
            .app_data(issuer.clone())
            .app_data(cookies.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/auth")
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout)),
            )

            // Protected routes (require a valid access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(me)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
