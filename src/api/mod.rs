pub mod metrics;

pub use metrics::get_metrics;

use actix_web::{HttpResponse, Responder};

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().body("Not Found")
}
