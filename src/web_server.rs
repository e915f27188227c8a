use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::Config;
use crate::grader::Grader;
use crate::routes::{get_logs_handler, submit_handler};

pub fn build_server(config: Config) -> std::io::Result<Server> {
    let Config {
        server: server_config,
        grading,
    } = config;
    let grader = web::Data::new(Grader::new(grading));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(grader.clone())
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .service(web::resource("/api/submit").route(web::post().to(submit_handler)))
            .service(web::resource("/api/logs").route(web::get().to(get_logs_handler)))
    })
    .bind((
        server_config
            .bind_address
            .unwrap_or("127.0.0.1".to_string()),
        server_config.bind_port.unwrap_or(8000),
    ))?
    .run();

    Ok(server)
}
