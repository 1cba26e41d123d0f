use std::sync::Arc;

use denywatch_domain::model::Account;
use denywatch_domain::telemetry::TelemetryGuard;
use denywatch_monitor::MonitorSupervisor;

#[derive(Clone)]
pub struct AppState {
    supervisor: Arc<MonitorSupervisor>,
    accounts: Arc<Vec<Account>>,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(
        supervisor: Arc<MonitorSupervisor>,
        accounts: Arc<Vec<Account>>,
        telemetry: TelemetryGuard,
    ) -> Self {
        Self {
            supervisor,
            accounts,
            telemetry,
        }
    }

    pub fn supervisor(&self) -> &MonitorSupervisor {
        self.supervisor.as_ref()
    }

    pub fn accounts(&self) -> &[Account] {
        self.accounts.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
