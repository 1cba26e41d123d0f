use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use metrics::counter;
use serde::{Deserialize, Serialize};

use denywatch_domain::model::ProfileId;
use denywatch_monitor::{MonitorPhase, STOP_GRACE};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub started: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverviewResponse {
    pub running: bool,
    pub accounts: Vec<AccountOverview>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountOverview {
    pub profile_id: String,
    pub name: String,
    pub active: bool,
    pub phase: Option<String>,
    pub denylist_size: usize,
    pub recent_block_count: u64,
}

pub async fn start_monitoring_handler(
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let started = state.supervisor().start_all(state.accounts()).await?;
    counter!("api_monitor_commands_total", "command" => "start").increment(1);
    Ok(HttpResponse::Ok().json(StartResponse { started }))
}

pub async fn stop_monitoring_handler(state: web::Data<AppState>) -> HttpResponse {
    state.supervisor().stop_all(STOP_GRACE).await;
    counter!("api_monitor_commands_total", "command" => "stop").increment(1);
    HttpResponse::Ok().json(StopResponse { running: false })
}

pub async fn overview_handler(state: web::Data<AppState>) -> HttpResponse {
    let running = state.supervisor().is_running().await;
    let phases: HashMap<ProfileId, MonitorPhase> = state
        .supervisor()
        .workers()
        .await
        .into_iter()
        .map(|view| (view.profile_id, view.phase))
        .collect();

    let accounts = state
        .accounts()
        .iter()
        .map(|account| {
            let status = state.supervisor().status(&account.profile_id);
            AccountOverview {
                profile_id: account.profile_id.as_str().to_string(),
                name: account.name.clone(),
                active: account.active,
                phase: phases
                    .get(&account.profile_id)
                    .map(|phase| phase.to_string()),
                denylist_size: status.denylist_size,
                recent_block_count: status.recent_block_count,
            }
        })
        .collect();

    HttpResponse::Ok().json(OverviewResponse { running, accounts })
}

pub async fn account_status_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let profile = ProfileId::new(path.into_inner());
    if !state
        .accounts()
        .iter()
        .any(|account| account.profile_id == profile)
    {
        return Err(ApiError::UnknownAccount);
    }

    Ok(HttpResponse::Ok().json(state.supervisor().status(&profile)))
}
