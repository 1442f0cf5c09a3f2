use axum::Json;

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pharma-intel-aggregator",
    }))
}
