use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use actix_web::{HttpResponse, Responder, web};

use super::{ErrorResponse, ErrorResponseWithMessage};
use crate::grader::{GradeError, Grader};

#[derive(Debug, MultipartForm)]
pub struct SubmitForm {
    pub student_name: Text<String>,
    pub file: TempFile,
}

/// Accepts one submission and runs a full grading cycle against it.
pub async fn submit_handler(
    grader: web::Data<Grader>,
    MultipartForm(form): MultipartForm<SubmitForm>,
) -> impl Responder {
    let file_name = form.file.file_name.clone().unwrap_or_default();

    let content = match std::fs::read(form.file.file.path()) {
        Ok(content) => content,
        Err(e) => {
            log::error!("Failed to read uploaded file: {e}");
            return HttpResponse::InternalServerError().json(ErrorResponse {
                reason: "ERR_INTERNAL",
                code: 6,
            });
        }
    };

    log::info!(
        "Received submission '{file_name}' from '{}'",
        form.student_name.as_str()
    );

    match grader.grade(&form.student_name, &file_name, &content).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e @ GradeError::UnsupportedExtension(_)) => {
            HttpResponse::BadRequest().json(ErrorResponseWithMessage {
                reason: "ERR_INVALID_ARGUMENT",
                code: 1,
                message: e.to_string(),
            })
        }
        Err(e @ GradeError::TestSuiteMissing) => {
            HttpResponse::InternalServerError().json(ErrorResponseWithMessage {
                reason: "ERR_EXTERNAL",
                code: 5,
                message: e.to_string(),
            })
        }
        Err(GradeError::Internal(e)) => {
            log::error!("Grading failed: {e:#}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                reason: "ERR_INTERNAL",
                code: 6,
            })
        }
    }
}
