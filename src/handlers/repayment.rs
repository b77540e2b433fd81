//! Repayment handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{ApiResponse, FiatCurrency};
use crate::repayment::{
    Payment, RepaymentInput, RepaymentRequest, RepaymentResult, RepaymentService,
};

pub async fn create_repayment(
    user: AuthenticatedUser,
    State(service): State<Arc<RepaymentService>>,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<RepaymentRequest>,
) -> Result<Json<ApiResponse<RepaymentResult>>, ApiError> {
    request.validate()?;

    let input = RepaymentInput {
        amount: request.amount,
        currency: FiatCurrency::normalize(request.currency.as_deref())?,
        method: request.method,
        reference: request.reference,
    };

    let result = service.record_repayment(user.user_id, loan_id, input).await?;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn list_repayments(
    user: AuthenticatedUser,
    State(service): State<Arc<RepaymentService>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, ApiError> {
    let payments = service.list_repayments(user.user_id, loan_id).await?;
    Ok(Json(ApiResponse::ok(payments)))
}
