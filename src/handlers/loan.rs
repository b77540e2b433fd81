//! Loan handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::loan::{ApproveLoanRequest, Loan, LoanService};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::ApiResponse;

pub async fn list_my_loans(
    user: AuthenticatedUser,
    State(service): State<Arc<LoanService>>,
) -> Result<Json<ApiResponse<Vec<Loan>>>, ApiError> {
    let loans = service.list_user_loans(user.user_id).await?;
    Ok(Json(ApiResponse::ok(loans)))
}

pub async fn get_loan(
    user: AuthenticatedUser,
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = service.get_user_loan(user.user_id, id).await?;
    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn list_all_loans(
    _admin: AdminUser,
    State(service): State<Arc<LoanService>>,
) -> Result<Json<ApiResponse<Vec<Loan>>>, ApiError> {
    let loans = service.list_all_loans().await?;
    Ok(Json(ApiResponse::ok(loans)))
}

/// Approve a pending loan, optionally at a different amount
pub async fn approve_loan(
    AdminUser(admin): AdminUser,
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveLoanRequest>>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let loan = service.approve_loan(id, request.amount).await?;
    tracing::info!(
        loan_id = %id,
        admin_id = %admin.user_id,
        amount = %loan.amount_approved,
        "Loan approved"
    );

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn disburse_loan(
    AdminUser(admin): AdminUser,
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = service.disburse_loan(id).await?;
    tracing::info!(loan_id = %id, admin_id = %admin.user_id, "Loan disbursed");

    Ok(Json(ApiResponse::ok(loan)))
}
