use uuid::Uuid;

use crate::{
    dto::products::ProductList,
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let (items, total) = state
        .products
        .list(limit as u64, offset as u64)
        .await?;

    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success("OK", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = match state.products.find_by_id(id).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("OK", product, Some(Meta::empty())))
}
