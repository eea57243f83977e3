// 入金下单API处理器
// 处理前端发起的收银台下单与订单状态查询

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;
use crate::errors::ApiError;
use crate::models::{
    ApiResponse, CheckoutRequest, CheckoutResponse, DepositStatus, PaymentOrderRequest,
    PaymentOrderResult, PendingDeposit,
};
use crate::state::AppState;
use crate::utils::extract_bearer_token;

/// 创建入金收银台订单
///
/// POST /api/v1/deposits/checkout
///
/// 请求体: CheckoutRequest
/// 响应: CheckoutResponse
pub async fn create_checkout(
    data: web::Data<AppState>,
    request: web::Json<CheckoutRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let gateway = &data.config.gateway;

    let order_request = PaymentOrderRequest {
        order_id: generate_third_party_id(),
        order_amount: request.amount_text(),
        order_currency: request.order_currency.clone(),
        callback_url: gateway.callback_url.clone(),
        success_url: gateway.success_url.clone(),
        cancel_url: gateway.cancel_url.clone(),
        payer_id: request.account_number.clone(),
        valid_time: None,
    };

    let order = into_order_data(data.gateway.create_order(&order_request).await?)?;

    if data.backend.is_configured() {
        let pending = PendingDeposit {
            third_party_id: order.order_id.clone(),
            cregis_id: order.cregis_id.clone(),
            account_number: request.account_number.clone(),
            amount: order_request.order_amount.clone().unwrap_or_default(),
            currency: order_request.order_currency.clone().unwrap_or_default(),
            status: DepositStatus::Pending,
            payment_url: order.payment_url.clone(),
        };
        let token = extract_bearer_token(&req);
        data.backend
            .notify_pending_deposit(&pending, token.as_deref())
            .await;
    }

    let response = CheckoutResponse::from_order(order, request.network.as_deref());
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// 查询收银台订单状态
///
/// GET /api/v1/deposits/checkout/{cregis_id}
///
/// 响应: CheckoutResponse (含 status 与 deposit_status)
pub async fn get_checkout(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let cregis_id = path.into_inner();
    let order = into_order_data(data.gateway.query_order(&cregis_id).await?)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(CheckoutResponse::from_order(order, None))))
}

/// 网关失败结果转换为上游错误
fn into_order_data(
    result: PaymentOrderResult,
) -> Result<crate::models::PaymentOrderData, ApiError> {
    match (result.data, result.error) {
        (Some(order), _) if result.success => Ok(order),
        (_, error) => Err(ApiError::Upstream {
            status: result.upstream_status,
            message: error.unwrap_or_else(|| "Payment initiation failed".to_string()),
        }),
    }
}

/// 生成第三方订单号: DEP + 24位大写十六进制
fn generate_third_party_id() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("DEP{}", &id[..24])
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use mockito::Matcher;
    use serde_json::{json, Value};
    use crate::routes::api_v1_routes;

    #[test]
    fn test_generate_third_party_id() {
        let id = generate_third_party_id();
        assert_eq!(id.len(), 27);
        assert!(id.starts_with("DEP"));
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(id, generate_third_party_id());
    }

    #[actix_web::test]
    async fn test_create_checkout_success() {
        let mut gateway = mockito::Server::new_async().await;
        let gateway_mock = gateway
            .mock("POST", "/api/v2/checkout")
            .match_body(Matcher::PartialJson(json!({
                "order_amount": "100",
                "order_currency": "USDT",
                "payer_id": "500123"
            })))
            .with_status(200)
            .with_body(
                r#"{"code":"00000","msg":"ok","data":{"cregis_id":"C1","order_currency":"USDT","expire_time":1700000600000,"payment_url":"https://checkout.example/C1","qr_code":"data:image/png;base64,AAA","payment_info":[{"blockchain":"TRON"},{"blockchain":"Ethereum"}]}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let mut backend = mockito::Server::new_async().await;
        let backend_mock = backend
            .mock("POST", "/api/deposits/pending")
            .match_header("authorization", "Bearer user-token")
            .match_body(Matcher::PartialJson(json!({ "cregisId": "C1", "accountNumber": "500123" })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let state = AppState::new_for_test(Some(gateway.url()), Some(backend.url()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/deposits/checkout")
            .insert_header(("Authorization", "Bearer user-token"))
            .set_json(json!({
                "order_amount": 100,
                "order_currency": "USDT",
                "account_number": "500123",
                "network": "tron"
            }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "00000");
        assert_eq!(body["data"]["cregis_id"], "C1");
        assert_eq!(body["data"]["payment_url"], "https://checkout.example/C1");
        assert_eq!(body["data"]["expire_time"], 1_700_000_600_000i64);
        assert_eq!(body["data"]["payment_info"].as_array().unwrap().len(), 1);
        assert!(body["data"]["order_id"].as_str().unwrap().starts_with("DEP"));

        gateway_mock.assert_async().await;
        backend_mock.assert_async().await;
    }

    #[actix_web::test]
    async fn test_create_checkout_validation_error() {
        let mut gateway = mockito::Server::new_async().await;
        let gateway_mock = gateway
            .mock("POST", "/api/v2/checkout")
            .expect(0)
            .create_async()
            .await;

        let state = AppState::new_for_test(Some(gateway.url()), None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/deposits/checkout")
            .set_json(json!({ "order_amount": "0" }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "40000");
        let msg = body["msg"].as_str().unwrap();
        assert!(msg.contains("order_amount"));
        assert!(msg.contains("order_currency"));

        gateway_mock.assert_async().await;
    }

    #[actix_web::test]
    async fn test_create_checkout_gateway_not_configured() {
        let state = AppState::new_for_test(None, None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/deposits/checkout")
            .set_json(json!({ "order_amount": "50", "order_currency": "USDT" }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "50000");
        assert!(body["msg"].as_str().unwrap().contains("CREGIS_GATEWAY_URL"));
    }

    #[actix_web::test]
    async fn test_create_checkout_upstream_error_passthrough() {
        let mut gateway = mockito::Server::new_async().await;
        let _mock = gateway
            .mock("POST", "/api/v2/checkout")
            .with_status(422)
            .with_body(r#"{"error":"currency not supported"}"#)
            .create_async()
            .await;

        let state = AppState::new_for_test(Some(gateway.url()), None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/deposits/checkout")
            .set_json(json!({ "order_amount": "50", "order_currency": "XYZ" }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "50200");
        assert!(body["msg"].as_str().unwrap().contains("currency not supported"));
    }

    #[actix_web::test]
    async fn test_create_checkout_malformed_json() {
        let state = AppState::new_for_test(None, None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/deposits/checkout")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "40000");
    }

    #[actix_web::test]
    async fn test_get_checkout_status() {
        let mut gateway = mockito::Server::new_async().await;
        let _mock = gateway
            .mock("POST", "/api/v2/checkout/query")
            .match_body(Matcher::PartialJson(json!({ "cregis_id": "C7" })))
            .with_status(200)
            .with_body(
                r#"{"code":"00000","msg":"ok","data":{"order_id":"DEP7","payment_url":"https://checkout.example/C7","status":"complete","expire_time":1700000600000}}"#,
            )
            .create_async()
            .await;

        let state = AppState::new_for_test(Some(gateway.url()), None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(api_v1_routes()),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/deposits/checkout/C7")
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "complete");
        assert_eq!(body["data"]["deposit_status"], "approved");
        assert_eq!(body["data"]["cregis_id"], "C7");
    }
}
