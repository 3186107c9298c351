use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::response::{ApiResponse, ListMeta};
use crate::error::ApiResult;
use crate::ledger::{Ledger, Transaction, TransactionQuery};

pub fn transactions_routes() -> Router<Arc<dyn Ledger>> {
    Router::new().route("/", get(list_transactions))
}

#[tracing::instrument(skip(ledger))]
async fn list_transactions(
    State(ledger): State<Arc<dyn Ledger>>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<ApiResponse<Vec<Transaction>>> {
    let (limit, offset) = query.bounds();
    let transactions = ledger.list(query).await?;

    let meta = ListMeta {
        limit,
        offset,
        count: transactions.len(),
    };

    Ok(ApiResponse::success_with_meta(transactions, json!(meta)))
}
