// Scripted in-memory data client for store and handler tests
use crate::application::data_client::BatteryDataClient;
use crate::application::errors::ApiError;
use crate::domain::battery::fixtures::{cycle_list, snapshot};
use crate::domain::battery::{BatterySummary, CycleSnapshot, CycleSummary, DeviceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub const IMEI_A: &str = "865044073967657";
pub const IMEI_B: &str = "865044073949366";

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Server(u16),
    NotFound,
    Decode,
}

impl Failure {
    fn into_error(self, imei: &DeviceId, cycle: Option<u32>) -> ApiError {
        match self {
            Failure::Server(status) => ApiError::Server {
                status,
                body: "internal error".to_string(),
            },
            Failure::NotFound => ApiError::NotFound {
                imei: imei.clone(),
                cycle,
            },
            Failure::Decode => ApiError::Decode(serde_json::from_str::<u32>("\"x\"").unwrap_err()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Summary,
    CycleList(DeviceId),
    Latest(DeviceId),
    Detail(DeviceId, u32),
}

/// Serves cycle lists per battery and a fixture snapshot for every listed
/// cycle. Individual requests can be failed or held behind a gate.
#[derive(Default)]
pub struct ScriptedClient {
    summary: Mutex<Option<Result<Vec<BatterySummary>, Failure>>>,
    cycle_lists: Mutex<HashMap<DeviceId, Result<Vec<CycleSummary>, Failure>>>,
    detail_failures: Mutex<HashMap<(DeviceId, u32), Failure>>,
    list_gates: Mutex<HashMap<DeviceId, oneshot::Receiver<()>>>,
    detail_gates: Mutex<HashMap<(DeviceId, u32), oneshot::Receiver<()>>>,
    calls: Mutex<Vec<Call>>,
    answered: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cycles(self, imei: &str, numbers: &[u32]) -> Self {
        self.set_cycles(imei, numbers);
        self
    }

    pub fn set_cycles(&self, imei: &str, numbers: &[u32]) {
        self.cycle_lists
            .lock()
            .unwrap()
            .insert(DeviceId::new(imei), Ok(cycle_list(imei, numbers)));
    }

    pub fn with_failing_cycles(self, imei: &str, failure: Failure) -> Self {
        self.fail_cycles(imei, failure);
        self
    }

    pub fn fail_cycles(&self, imei: &str, failure: Failure) {
        self.cycle_lists
            .lock()
            .unwrap()
            .insert(DeviceId::new(imei), Err(failure));
    }

    pub fn set_summary(&self, summary: Result<Vec<BatterySummary>, Failure>) {
        *self.summary.lock().unwrap() = Some(summary);
    }

    pub fn fail_detail(&self, imei: &str, cycle: u32, failure: Failure) {
        self.detail_failures
            .lock()
            .unwrap()
            .insert((DeviceId::new(imei), cycle), failure);
    }

    /// Hold the next detail request for (imei, cycle) until the sender fires.
    pub fn gate_detail(&self, imei: &str, cycle: u32) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.detail_gates
            .lock()
            .unwrap()
            .insert((DeviceId::new(imei), cycle), rx);
        tx
    }

    pub fn gate_cycle_list(&self, imei: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().unwrap().insert(DeviceId::new(imei), rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Detail requests that ran to completion, in completion order.
    pub fn answered(&self) -> Vec<Call> {
        self.answered.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn listed(&self, imei: &DeviceId, cycle: u32) -> bool {
        matches!(
            self.cycle_lists.lock().unwrap().get(imei),
            Some(Ok(cycles)) if cycles.iter().any(|c| c.cycle_number == cycle)
        )
    }
}

#[async_trait]
impl BatteryDataClient for ScriptedClient {
    async fn fetch_summary(&self, _imei: Option<&DeviceId>) -> Result<Vec<BatterySummary>, ApiError> {
        self.record(Call::Summary);
        let scripted = self.summary.lock().unwrap().clone();
        match scripted {
            Some(Ok(summary)) => Ok(summary),
            Some(Err(failure)) => Err(failure.into_error(&DeviceId::new(IMEI_A), None)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_cycle_list(
        &self,
        imei: &DeviceId,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<CycleSummary>, ApiError> {
        self.record(Call::CycleList(imei.clone()));
        let gate = self.list_gates.lock().unwrap().remove(imei);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let scripted = self.cycle_lists.lock().unwrap().get(imei).cloned();
        match scripted {
            Some(Ok(cycles)) => Ok(cycles),
            Some(Err(failure)) => Err(failure.into_error(imei, None)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_latest_cycle(&self, imei: &DeviceId) -> Result<CycleSnapshot, ApiError> {
        self.record(Call::Latest(imei.clone()));
        let latest = self.cycle_lists.lock().unwrap().get(imei).and_then(|listed| {
            listed
                .as_ref()
                .ok()
                .and_then(|cycles| cycles.iter().map(|c| c.cycle_number).max())
        });
        match latest {
            Some(cycle) => Ok(snapshot(imei.as_str(), cycle)),
            None => Err(Failure::NotFound.into_error(imei, None)),
        }
    }

    async fn fetch_cycle_detail(
        &self,
        imei: &DeviceId,
        cycle_number: u32,
    ) -> Result<CycleSnapshot, ApiError> {
        self.record(Call::Detail(imei.clone(), cycle_number));
        let key = (imei.clone(), cycle_number);
        let gate = self.detail_gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.answered
            .lock()
            .unwrap()
            .push(Call::Detail(imei.clone(), cycle_number));
        let failure = self.detail_failures.lock().unwrap().get(&key).copied();
        if let Some(failure) = failure {
            return Err(failure.into_error(imei, Some(cycle_number)));
        }
        if self.listed(imei, cycle_number) {
            Ok(snapshot(imei.as_str(), cycle_number))
        } else {
            Err(Failure::NotFound.into_error(imei, Some(cycle_number)))
        }
    }
}
