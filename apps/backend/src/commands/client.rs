//! # Client and Credit Commands
//!
//! `clients.add` answers a conflict with the existing record in the error
//! `details`, so the shell can offer "select existing" or resubmit through
//! `clients.forceAdd` after a similarity warning.

use serde::Deserialize;

use super::{Done, IdArgs, PageArgs, SearchArgs};
use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::{Client, ClientInput, CreditEntry, CreditPaymentRequest};

pub async fn add_client(state: &AppState, input: ClientInput) -> Result<Client, ApiError> {
    Ok(state.db().clients().add(&input).await?)
}

/// Skips the similar-name check; ICE and phone uniqueness still apply.
pub async fn force_add_client(state: &AppState, input: ClientInput) -> Result<Client, ApiError> {
    Ok(state.db().clients().force_add(&input).await?)
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientArgs {
    pub id: i64,
    pub client: ClientInput,
}

pub async fn update_client(state: &AppState, args: UpdateClientArgs) -> Result<Client, ApiError> {
    Ok(state.db().clients().update(args.id, &args.client).await?)
}

pub async fn get_client(state: &AppState, args: IdArgs) -> Result<Client, ApiError> {
    state
        .db()
        .clients()
        .get(args.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", args.id))
}

pub async fn list_clients(state: &AppState, args: PageArgs) -> Result<Vec<Client>, ApiError> {
    Ok(state.db().clients().list(args.limit(), args.offset()).await?)
}

pub async fn search_clients(state: &AppState, args: SearchArgs) -> Result<Vec<Client>, ApiError> {
    Ok(state.db().clients().search(&args.query, args.limit()).await?)
}

pub async fn debtors(state: &AppState) -> Result<Vec<Client>, ApiError> {
    Ok(state.db().clients().debtors().await?)
}

pub async fn delete_client(state: &AppState, args: IdArgs) -> Result<Done, ApiError> {
    state.db().clients().delete(args.id).await?;
    Ok(Done::OK)
}

pub async fn record_payment(
    state: &AppState,
    req: CreditPaymentRequest,
) -> Result<CreditEntry, ApiError> {
    Ok(state.db().credits().record_payment(&req).await?)
}

pub async fn add_manual_credit(
    state: &AppState,
    req: CreditPaymentRequest,
) -> Result<CreditEntry, ApiError> {
    Ok(state.db().credits().add_manual_credit(&req).await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdArgs {
    pub client_id: i64,
}

pub async fn credit_history(
    state: &AppState,
    args: ClientIdArgs,
) -> Result<Vec<CreditEntry>, ApiError> {
    Ok(state.db().credits().history(args.client_id).await?)
}
