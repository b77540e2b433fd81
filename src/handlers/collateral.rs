//! Collateral handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::collateral::{
    Collateral, CollateralQuote, CollateralService, CreateCollateralRequest,
    LockCollateralRequest, PreviewQuery, RejectReleaseRequest, VerifyCollateralRequest,
};
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, FiatCurrency};

pub async fn preview_collateral(
    State(service): State<Arc<CollateralService>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<ApiResponse<Vec<CollateralQuote>>>, ApiError> {
    let fiat = FiatCurrency::normalize(query.fiat.as_deref())?;
    let quotes = service.preview_collateral(query.loan_amount, fiat).await?;

    Ok(Json(ApiResponse::ok(quotes)))
}

pub async fn create_collateral(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
    Json(request): Json<CreateCollateralRequest>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    request.validate()?;
    let fiat = FiatCurrency::normalize(request.fiat_currency.as_deref())?;

    let collateral = service
        .create_collateral_request(user.user_id, request.loan_amount, fiat, request.asset_symbol)
        .await?;

    Ok(Json(ApiResponse::ok(collateral)))
}

pub async fn lock_collateral(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
    Json(request): Json<LockCollateralRequest>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    request.validate()?;
    let fiat = FiatCurrency::normalize(request.fiat_currency.as_deref())?;

    let collateral = service
        .lock_collateral(
            user.user_id,
            request.asset_symbol,
            &request.tx_hash,
            request.amount,
            request.wallet_address,
            fiat,
        )
        .await?;

    Ok(Json(ApiResponse::ok(collateral)))
}

pub async fn verify_collateral(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<VerifyCollateralRequest>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    request.validate()?;

    let collateral = service
        .verify_collateral(
            user.user_id,
            id,
            &request.tx_hash,
            request.wallet_address.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::ok(collateral)))
}

pub async fn list_my_collaterals(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let collaterals = service.list_user_collaterals(user.user_id).await?;
    Ok(Json(ApiResponse::ok(collaterals)))
}

pub async fn get_collateral(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    let collateral = service.get_collateral(user.user_id, id).await?;
    Ok(Json(ApiResponse::ok(collateral)))
}

pub async fn request_release(
    user: AuthenticatedUser,
    State(service): State<Arc<CollateralService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    let collateral = service.request_release(user.user_id, id).await?;
    Ok(Json(ApiResponse::ok(collateral)))
}

pub async fn list_all_collaterals(
    _admin: AdminUser,
    State(service): State<Arc<CollateralService>>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let collaterals = service.list_all_collaterals().await?;
    Ok(Json(ApiResponse::ok(collaterals)))
}

pub async fn approve_release(
    AdminUser(admin): AdminUser,
    State(service): State<Arc<CollateralService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    let collateral = service.approve_release(id).await?;
    tracing::info!(collateral_id = %id, admin_id = %admin.user_id, "Collateral release approved");

    Ok(Json(ApiResponse::ok(collateral)))
}

/// The body is optional; an empty request rejects without a reason
pub async fn reject_release(
    AdminUser(admin): AdminUser,
    State(service): State<Arc<CollateralService>>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectReleaseRequest>>,
) -> Result<Json<ApiResponse<Collateral>>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let collateral = service.reject_release(id, request.reason).await?;
    tracing::info!(collateral_id = %id, admin_id = %admin.user_id, "Collateral release rejected");

    Ok(Json(ApiResponse::ok(collateral)))
}
