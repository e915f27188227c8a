use actix_web::{HttpResponse, Responder, web};

use crate::grader::Grader;

/// Cumulative failure log across every submission ever graded.
pub async fn get_logs_handler(grader: web::Data<Grader>) -> impl Responder {
    HttpResponse::Ok().json(grader.ledger().load())
}
