//! JSON HTTP surface over [`CostService`].
//!
//! Authentication happens upstream; every route here assumes an already
//! authorized caller. Store calls are blocking, so each handler hops onto
//! the blocking pool.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{CostError, CostResult, FailureKind};
use crate::model::{
    BreakdownItem, BreakdownItemInput, Header, HeaderPatch, RequisitionToOrder, RtoInput,
    SummaryPatch, VariationOrder, VariationOrderInput,
};
use crate::service::CostService;
use crate::summary::ContractSummary;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl CostError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CostError::Locked(_) => StatusCode::LOCKED,
            CostError::NotFound(_) => StatusCode::NOT_FOUND,
            CostError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CostError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();
        match kind {
            FailureKind::System => error!(%kind, error = %self, "request failed"),
            FailureKind::Policy => debug!(%kind, code = self.code(), error = %self, "request rejected"),
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for CostError {
    fn from(rejection: JsonRejection) -> Self {
        CostError::validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, CostError>;

pub fn router(service: CostService) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/work-packages/:wp_id/cost",
            delete(delete_record),
        )
        .route(
            "/work-packages/:wp_id/cost/header",
            get(get_header).put(update_header),
        )
        .route(
            "/work-packages/:wp_id/cost/summary",
            get(get_summary).put(update_summary),
        )
        .route(
            "/work-packages/:wp_id/cost/breakdown",
            get(list_breakdown).post(add_breakdown),
        )
        .route(
            "/work-packages/:wp_id/cost/breakdown/:item_id",
            put(update_breakdown).delete(delete_breakdown),
        )
        .route(
            "/work-packages/:wp_id/cost/variations",
            get(list_variations).post(add_variation),
        )
        .route(
            "/work-packages/:wp_id/cost/variations/:vo_id",
            put(update_variation).delete(delete_variation),
        )
        .route(
            "/work-packages/:wp_id/cost/rto",
            get(get_rto).put(save_rto).delete(delete_rto),
        )
        .with_state(service)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(service: CostService, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "wpcost listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn blocking<T, F>(service: CostService, f: F) -> CostResult<T>
where
    T: Send + 'static,
    F: FnOnce(&CostService) -> CostResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| CostError::Internal(format!("worker task failed: {e}")))?
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn healthz() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn delete_record(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<StatusCode> {
    blocking(service, move |svc| svc.delete_cost_record(&wp_id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
}

// --- Header ---

async fn get_header(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<Json<Header>> {
    blocking(service, move |svc| svc.get_header(&wp_id)).await.map(Json)
}

async fn update_header(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
    body: Result<Json<HeaderPatch>, JsonRejection>,
) -> ApiResult<Json<Header>> {
    let Json(patch) = body?;
    blocking(service, move |svc| svc.update_header(&wp_id, patch))
        .await
        .map(Json)
}

// --- Summary ---

async fn get_summary(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<Json<ContractSummary>> {
    blocking(service, move |svc| svc.get_summary(&wp_id)).await.map(Json)
}

async fn update_summary(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
    body: Result<Json<SummaryPatch>, JsonRejection>,
) -> ApiResult<Json<ContractSummary>> {
    let Json(patch) = body?;
    blocking(service, move |svc| svc.update_summary(&wp_id, patch))
        .await
        .map(Json)
}

// --- Breakdown items ---

async fn list_breakdown(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<Json<Vec<BreakdownItem>>> {
    blocking(service, move |svc| svc.list_breakdown_items(&wp_id))
        .await
        .map(Json)
}

async fn add_breakdown(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
    body: Result<Json<BreakdownItemInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BreakdownItem>)> {
    let Json(input) = body?;
    blocking(service, move |svc| svc.add_breakdown_item(&wp_id, input))
        .await
        .map(|item| (StatusCode::CREATED, Json(item)))
}

async fn update_breakdown(
    State(service): State<CostService>,
    Path((wp_id, item_id)): Path<(String, String)>,
    body: Result<Json<BreakdownItemInput>, JsonRejection>,
) -> ApiResult<Json<BreakdownItem>> {
    let Json(input) = body?;
    blocking(service, move |svc| {
        svc.update_breakdown_item(&wp_id, &item_id, input)
    })
    .await
    .map(Json)
}

async fn delete_breakdown(
    State(service): State<CostService>,
    Path((wp_id, item_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    blocking(service, move |svc| svc.delete_breakdown_item(&wp_id, &item_id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
}

// --- Variation orders ---

async fn list_variations(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<Json<Vec<VariationOrder>>> {
    blocking(service, move |svc| svc.list_variation_orders(&wp_id))
        .await
        .map(Json)
}

async fn add_variation(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
    body: Result<Json<VariationOrderInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VariationOrder>)> {
    let Json(input) = body?;
    blocking(service, move |svc| svc.add_variation_order(&wp_id, input))
        .await
        .map(|vo| (StatusCode::CREATED, Json(vo)))
}

async fn update_variation(
    State(service): State<CostService>,
    Path((wp_id, vo_id)): Path<(String, String)>,
    body: Result<Json<VariationOrderInput>, JsonRejection>,
) -> ApiResult<Json<VariationOrder>> {
    let Json(input) = body?;
    blocking(service, move |svc| {
        svc.update_variation_order(&wp_id, &vo_id, input)
    })
    .await
    .map(Json)
}

async fn delete_variation(
    State(service): State<CostService>,
    Path((wp_id, vo_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    blocking(service, move |svc| svc.delete_variation_order(&wp_id, &vo_id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
}

// --- Requisition to order ---

async fn get_rto(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<Json<RequisitionToOrder>> {
    blocking(service, move |svc| svc.get_rto(&wp_id)).await.map(Json)
}

async fn save_rto(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
    body: Result<Json<RtoInput>, JsonRejection>,
) -> ApiResult<Json<RequisitionToOrder>> {
    let Json(input) = body?;
    blocking(service, move |svc| svc.save_rto(&wp_id, input))
        .await
        .map(Json)
}

async fn delete_rto(
    State(service): State<CostService>,
    Path(wp_id): Path<String>,
) -> ApiResult<StatusCode> {
    blocking(service, move |svc| svc.delete_rto(&wp_id))
        .await
        .map(|()| StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        router(CostService::in_memory().unwrap())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(CostError::Locked("x".into()).status_code(), StatusCode::LOCKED);
        assert_eq!(CostError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            CostError::validation("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CostError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let (status, body) = send(&app(), "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn header_defaults_on_first_get() {
        let (status, body) = send(&app(), "GET", "/work-packages/wp-1/cost/header", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "rto_number": null,
                "po_number": null,
                "status": "Awaiting Scoping",
                "locked": false
            })
        );
    }

    #[tokio::test]
    async fn locked_summary_put_returns_423() {
        let app = app();
        let (status, body) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/header",
            Some(json!({"locked": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locked"], true);

        let (status, body) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/summary",
            Some(json!({"allowances": "10.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["code"], "LOCKED");

        let (status, _) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/header",
            Some(json!({"locked": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/summary",
            Some(json!({"allowances": "10.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowances"], "10.00");
    }

    #[tokio::test]
    async fn summary_scenario_over_http() {
        let app = app();
        send(
            &app,
            "PUT",
            "/work-packages/wp-9/cost/summary",
            Some(json!({"original_contract_price": 100000, "allowances": "5000"})),
        )
        .await;
        for (number, amount, status) in [
            ("VO-01", "2000.00", "Approved"),
            ("VO-02", "500.00", "Pending"),
            ("VO-03", "9999.00", "Rejected"),
        ] {
            let (code, _) = send(
                &app,
                "POST",
                "/work-packages/wp-9/cost/variations",
                Some(json!({
                    "vo_number": number,
                    "value_amount": amount,
                    "status": status,
                    "date_raised": "2025-07-10"
                })),
            )
            .await;
            assert_eq!(code, StatusCode::CREATED);
        }

        let (status, body) = send(&app, "GET", "/work-packages/wp-9/cost/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "original_contract_price": "100000.00",
                "allowances": "5000.00",
                "approved_variations": "2000.00",
                "pending_variations": "500.00",
                "revised_contract_price": "102000.00",
                "estimate_final_contract_price": "102500.00"
            })
        );
    }

    #[tokio::test]
    async fn negative_breakdown_value_is_422() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/work-packages/wp-1/cost/breakdown",
            Some(json!({"item": "Scaffolding", "value_amount": "-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (_, list) = send(&app, "GET", "/work-packages/wp-1/cost/breakdown", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn unparseable_bodies_are_json_422() {
        let app = app();
        let (status, body) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/header",
            Some(json!({"status": "Bogus"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("Bogus"));

        let malformed = Request::builder()
            .method("POST")
            .uri("/work-packages/wp-1/cost/variations")
            .header("content-type", "application/json")
            .body(Body::from("{\"vo_number\": "))
            .unwrap();
        let resp = app.clone().oneshot(malformed).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let untyped = Request::builder()
            .method("PUT")
            .uri("/work-packages/wp-1/cost/summary")
            .body(Body::from("{\"allowances\": \"1.00\"}"))
            .unwrap();
        let resp = app.clone().oneshot(untyped).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (_, summary) = send(&app, "GET", "/work-packages/wp-1/cost/summary", None).await;
        assert_eq!(summary["allowances"], "0.00");
    }

    #[tokio::test]
    async fn amount_past_the_limit_is_422() {
        let (status, body) = send(
            &app(),
            "PUT",
            "/work-packages/wp-1/cost/summary",
            Some(json!({"original_contract_price": "50000000000000000000000000000"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_children_are_404() {
        let app = app();
        let (status, body) =
            send(&app, "DELETE", "/work-packages/wp-1/cost/variations/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = send(&app, "GET", "/work-packages/wp-1/cost/rto", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_record_respects_lock() {
        let app = app();
        let (status, _) = send(&app, "DELETE", "/work-packages/wp-1/cost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/header",
            Some(json!({"locked": true})),
        )
        .await;
        let (status, _) = send(&app, "DELETE", "/work-packages/wp-1/cost", None).await;
        assert_eq!(status, StatusCode::LOCKED);

        send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/header",
            Some(json!({"locked": false})),
        )
        .await;
        let (status, _) = send(&app, "DELETE", "/work-packages/wp-1/cost", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn breakdown_and_rto_round_trip() {
        let app = app();
        let (status, item) = send(
            &app,
            "POST",
            "/work-packages/wp-1/cost/breakdown",
            Some(json!({"item": "Scaffolding", "value_amount": 150000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_str().unwrap().to_string();

        let (status, rto) = send(
            &app,
            "PUT",
            "/work-packages/wp-1/cost/rto",
            Some(json!({
                "rto_number": "RTO-55",
                "supplier": "Acme",
                "items": [{"breakdown_item_id": item_id}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rto["subtotal_amount"], "150000.00");

        let (_, header) = send(&app, "GET", "/work-packages/wp-1/cost/header", None).await;
        assert_eq!(header["rto_number"], "RTO-55");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/work-packages/wp-1/cost/breakdown/{item_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, rto) = send(&app, "GET", "/work-packages/wp-1/cost/rto", None).await;
        assert_eq!(rto["items"][0]["breakdown_item_id"], Value::Null);
        assert_eq!(rto["subtotal_amount"], "0.00");
    }
}
