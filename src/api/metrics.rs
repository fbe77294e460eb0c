use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::metrics::render;
use crate::services::poll;
use crate::state::AppState;

/// 每次请求都重新轮询 supervisord，不缓存
pub async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let snapshot = Arc::new(poll(data.upstream.as_ref(), data.timeout).await);

    // 整体替换，不存在清空后再填充的中间状态
    let previous = data.published.swap(Arc::clone(&snapshot));
    if previous.connectivity != snapshot.connectivity {
        if snapshot.is_up() {
            log::info!("✅ supervisord at {} is reachable", data.upstream.endpoint());
        } else {
            log::warn!("❌ Lost connection to supervisord at {}", data.upstream.endpoint());
        }
    }

    match render(&snapshot) {
        Ok(metrics_text) => HttpResponse::Ok()
            .content_type(prometheus::TEXT_FORMAT)
            .body(metrics_text),
        Err(e) => {
            log::error!("Failed to render metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to render metrics")
        }
    }
}
