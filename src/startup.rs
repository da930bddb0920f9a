use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    edit_user, get_me, get_user_donations, get_users, health_check, logout, make_donation,
    refresh, signin, signup,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/signin", web::post().to(signin))

            // Refresh-token guarded: the Bearer token must be a refresh
            // token; the guard keeps the raw token for the orchestrator
            .service(
                web::scope("/auth/refresh")
                    .wrap(JwtMiddleware::refresh(jwt_config.clone()))
                    .route("", web::post().to(refresh)),
            )

            // Access-token guarded routes
            .service(
                web::scope("/auth/logout")
                    .wrap(JwtMiddleware::access(jwt_config.clone()))
                    .route("", web::post().to(logout)),
            )
            .service(
                web::scope("/users")
                    .wrap(JwtMiddleware::access(jwt_config.clone()))
                    .route("", web::get().to(get_users))
                    .route("", web::patch().to(edit_user))
                    .route("/me", web::get().to(get_me)),
            )
            .service(
                web::scope("/donations")
                    .wrap(JwtMiddleware::access(jwt_config.clone()))
                    .route("", web::post().to(make_donation))
                    .route("", web::get().to(get_user_donations)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
