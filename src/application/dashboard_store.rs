// Dashboard store - Selection state and fetch orchestration
use crate::application::data_client::BatteryDataClient;
use crate::application::errors::{ApiError, DashboardError};
use crate::domain::battery::{BatterySummary, CycleSnapshot, CycleSummary, DeviceId, Selection};
use crate::domain::cycles::{
    closest_cycle, contains_cycle, first_cycle, neighbour, sorted_cycle_numbers, Direction,
};
use crate::domain::temperature::BucketWidth;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

const CYCLE_LIST_FAILED: &str = "Failed to fetch cycle history. Please try again.";
const SUMMARY_FAILED: &str = "Failed to fetch battery summary. Please try again.";

/// Read model published to every observer after each mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub selection: Selection,
    pub summary: Vec<BatterySummary>,
    pub cycles: Vec<CycleSummary>,
    pub detail: Option<CycleSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
    pub bucket_width: BucketWidth,
}

impl DashboardState {
    pub fn new(imei: DeviceId, bucket_width: BucketWidth) -> Self {
        Self {
            selection: Selection::new(imei),
            summary: Vec::new(),
            cycles: Vec::new(),
            detail: None,
            loading: false,
            error: None,
            bucket_width,
        }
    }

    pub fn sorted_cycles(&self) -> Vec<u32> {
        sorted_cycle_numbers(&self.cycles)
    }

    /// Detail snapshot only if it belongs to the current selection.
    pub fn selected_detail(&self) -> Option<&CycleSnapshot> {
        self.detail.as_ref().filter(|detail| {
            detail.imei == self.selection.imei && Some(detail.cycle_number) == self.selection.cycle
        })
    }
}

/// How a freshly loaded cycle list anchors the selected cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Device switch: always the lowest cycle number.
    First,
    /// List refresh: keep the selection while it is still listed.
    KeepIfPresent,
}

struct Inner {
    state: DashboardState,
    generation: u64,
}

/// Single owner of the dashboard state.
///
/// Every intent that retargets the detail view bumps a generation counter.
/// Fetches started under an older generation are cancelled as soon as the
/// counter moves, and a result that still completes is dropped at apply time,
/// so the state only ever reflects the latest selection.
///
/// The fetch chain of an intent runs on its own task: dropping the caller
/// (an aborted HTTP request, say) never strands `loading`.
pub struct DashboardStore {
    authorized: Vec<DeviceId>,
    core: Arc<StoreCore>,
}

struct StoreCore {
    client: Arc<dyn BatteryDataClient>,
    page_limit: u32,
    inner: Mutex<Inner>,
    published: watch::Sender<DashboardState>,
    generation: watch::Sender<u64>,
}

impl DashboardStore {
    pub fn new(
        client: Arc<dyn BatteryDataClient>,
        authorized: Vec<DeviceId>,
        page_limit: u32,
        bucket_width: BucketWidth,
    ) -> Result<Self, DashboardError> {
        let default_device = authorized
            .first()
            .cloned()
            .ok_or(DashboardError::NoAuthorizedDevices)?;
        let state = DashboardState::new(default_device, bucket_width);
        let (published, _) = watch::channel(state.clone());
        let (generation, _) = watch::channel(0);

        Ok(Self {
            authorized,
            core: Arc::new(StoreCore {
                client,
                page_limit,
                inner: Mutex::new(Inner { state, generation: 0 }),
                published,
                generation,
            }),
        })
    }

    pub fn authorized_devices(&self) -> &[DeviceId] {
        &self.authorized
    }

    pub fn is_authorized(&self, imei: &DeviceId) -> bool {
        self.authorized.contains(imei)
    }

    pub fn snapshot(&self) -> DashboardState {
        self.core.published.borrow().clone()
    }

    /// Observers receive an immutable snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.core.published.subscribe()
    }

    /// Switch battery: reset the view, load its cycle list, then the detail of
    /// its lowest cycle. The detail request is never issued before the list.
    pub async fn select_device(&self, imei: DeviceId) -> Result<(), DashboardError> {
        self.ensure_authorized(&imei)?;
        tracing::info!("Selecting battery {}", imei);

        let (generation, ()) = self.core.begin(|state| {
            state.selection = Selection::new(imei.clone());
            state.cycles.clear();
            state.detail = None;
            state.loading = true;
            state.error = None;
        });

        self.settle(move |core| async move {
            core.load_cycles(generation, &imei, Anchor::First).await
        })
        .await;
        Ok(())
    }

    /// Switch cycle on the current battery. Out-of-list numbers are not
    /// rejected here; the fetch reports them as not found.
    pub async fn select_cycle(&self, cycle_number: u32) {
        let (generation, imei) = self.core.begin(|state| {
            state.selection.cycle = Some(cycle_number);
            state.loading = true;
            state.error = None;
            state.selection.imei.clone()
        });

        tracing::debug!("Selecting cycle {} of battery {}", cycle_number, imei);
        self.settle(move |core| async move {
            core.load_detail(generation, &imei, cycle_number).await
        })
        .await;
    }

    /// Select the listed cycle closest to `requested` (ties go low).
    pub async fn select_nearest_cycle(&self, requested: u32) -> Option<u32> {
        let target = closest_cycle(&self.snapshot().sorted_cycles(), requested)?;
        self.select_cycle(target).await;
        Some(target)
    }

    /// Move to the previous/next listed cycle by rank.
    pub async fn step_cycle(&self, direction: Direction) -> Option<u32> {
        let state = self.snapshot();
        let target = neighbour(&state.sorted_cycles(), state.selection.cycle, direction)?;
        self.select_cycle(target).await;
        Some(target)
    }

    /// Reload the cycle list of the current battery. A selection that is no
    /// longer listed is re-anchored to the lowest cycle and its detail fetched.
    pub async fn refresh_cycles(&self) {
        let (generation, imei) = self.core.begin(|state| {
            state.loading = true;
            state.error = None;
            state.selection.imei.clone()
        });

        self.settle(move |core| async move {
            core.load_cycles(generation, &imei, Anchor::KeepIfPresent).await
        })
        .await;
    }

    /// Refresh the all-batteries summary. Never touches the cycle list or
    /// the detail view.
    pub async fn refresh_summary(&self) {
        match self.core.client.fetch_summary(None).await {
            Ok(summary) => {
                tracing::debug!("Loaded summary for {} batteries", summary.len());
                self.core.update(|state| state.summary = summary);
            }
            Err(e) => {
                tracing::warn!("Failed to fetch battery summary: {}", e);
                self.core
                    .update(|state| state.error = Some(SUMMARY_FAILED.to_string()));
            }
        }
    }

    pub async fn fetch_latest(&self, imei: &DeviceId) -> Result<CycleSnapshot, DashboardError> {
        self.ensure_authorized(imei)?;
        Ok(self.core.client.fetch_latest_cycle(imei).await?)
    }

    pub fn set_bucket_width(&self, width: BucketWidth) {
        self.core.update(|state| state.bucket_width = width);
    }

    pub fn clear_error(&self) {
        self.core.update(|state| state.error = None);
    }

    fn ensure_authorized(&self, imei: &DeviceId) -> Result<(), DashboardError> {
        if self.is_authorized(imei) {
            Ok(())
        } else {
            Err(DashboardError::UnauthorizedDevice(imei.clone()))
        }
    }

    /// Run a fetch chain on a detached task and wait for it. The task keeps
    /// going if this future is dropped.
    async fn settle<F, Fut>(&self, chain: F)
    where
        F: FnOnce(Arc<StoreCore>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(chain(self.core.clone()));
        if let Err(e) = task.await {
            tracing::error!("Dashboard fetch task failed: {}", e);
            self.core.update(|state| state.loading = false);
        }
    }
}

impl StoreCore {
    async fn load_cycles(&self, generation: u64, imei: &DeviceId, anchor: Anchor) {
        let request = self.client.fetch_cycle_list(imei, self.page_limit, 0);
        let Some(result) = self.unless_superseded(generation, request).await else {
            tracing::debug!("Cycle list request for {} superseded", imei);
            return;
        };

        let cycles = match result {
            Ok(cycles) => cycles,
            Err(e) => {
                tracing::warn!("Failed to fetch cycle list for {}: {}", imei, e);
                self.apply(generation, |state| {
                    // A detail left over from a cancelled cycle switch would
                    // otherwise sit under the new cycle's label.
                    if state.selected_detail().is_none() {
                        state.detail = None;
                    }
                    state.loading = false;
                    state.error = Some(CYCLE_LIST_FAILED.to_string());
                });
                return;
            }
        };

        tracing::debug!("Loaded {} cycles for {}", cycles.len(), imei);
        let mut target = None;
        let applied = self.apply(generation, |state| {
            target = reconcile(state, cycles, anchor);
        });

        if let (true, Some(cycle_number)) = (applied, target) {
            self.load_detail(generation, imei, cycle_number).await;
        }
    }

    async fn load_detail(&self, generation: u64, imei: &DeviceId, cycle_number: u32) {
        let request = self.client.fetch_cycle_detail(imei, cycle_number);
        let Some(result) = self.unless_superseded(generation, request).await else {
            tracing::debug!("Detail request for {} cycle {} superseded", imei, cycle_number);
            return;
        };

        match result {
            Ok(snapshot) => {
                self.apply(generation, |state| {
                    state.detail = Some(snapshot);
                    state.loading = false;
                    state.error = None;
                });
            }
            Err(e) => {
                tracing::warn!("Failed to fetch cycle {} for {}: {}", cycle_number, imei, e);
                let message = detail_failure_message(imei, cycle_number, &e);
                self.apply(generation, |state| {
                    state.detail = None;
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }

    /// Drive `request` unless the generation moves on first, in which case the
    /// request is dropped (cancelling it) and `None` is returned. A response
    /// that is already in hand wins and is left to `apply` to discard.
    async fn unless_superseded<F>(&self, generation: u64, request: F) -> Option<F::Output>
    where
        F: Future,
    {
        let watcher = self.generation.subscribe();
        tokio::select! {
            biased;
            output = request => Some(output),
            _ = superseded(watcher, generation) => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new intent: bump the generation and mutate under one lock.
    fn begin<R>(&self, mutate: impl FnOnce(&mut DashboardState) -> R) -> (u64, R) {
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        let out = mutate(&mut inner.state);
        self.generation.send_replace(generation);
        self.published.send_replace(inner.state.clone());
        (generation, out)
    }

    /// Apply a fetch result if its generation is still current.
    fn apply(&self, generation: u64, mutate: impl FnOnce(&mut DashboardState)) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(
                "Discarding result of generation {} (current {})",
                generation,
                inner.generation
            );
            return false;
        }
        mutate(&mut inner.state);
        self.published.send_replace(inner.state.clone());
        true
    }

    /// Mutations that do not retarget the detail view.
    fn update(&self, mutate: impl FnOnce(&mut DashboardState)) {
        let mut inner = self.lock();
        mutate(&mut inner.state);
        self.published.send_replace(inner.state.clone());
    }
}

async fn superseded(mut watcher: watch::Receiver<u64>, generation: u64) {
    // Only errors once the store is gone, which also ends the request.
    let _ = watcher.wait_for(|current| *current != generation).await;
}

/// Install a freshly loaded cycle list and return the cycle whose detail must
/// be fetched, if any.
fn reconcile(state: &mut DashboardState, cycles: Vec<CycleSummary>, anchor: Anchor) -> Option<u32> {
    state.cycles = cycles;

    let Some(first) = first_cycle(&state.cycles) else {
        state.selection.cycle = None;
        state.detail = None;
        state.loading = false;
        state.error = Some(format!("No cycles found for battery {}.", state.selection.imei));
        return None;
    };

    let kept = match (anchor, state.selection.cycle) {
        (Anchor::KeepIfPresent, Some(current)) if contains_cycle(&state.cycles, current) => {
            Some(current)
        }
        _ => None,
    };

    match kept {
        Some(current) if state.selected_detail().is_some() => {
            tracing::debug!("Cycle {} still listed, keeping detail", current);
            state.loading = false;
            None
        }
        Some(current) => Some(current),
        None => {
            state.selection.cycle = Some(first);
            state.detail = None;
            Some(first)
        }
    }
}

fn detail_failure_message(imei: &DeviceId, cycle_number: u32, error: &ApiError) -> String {
    if error.is_not_found() {
        format!("Cycle {} was not found for battery {}.", cycle_number, imei)
    } else {
        format!("Failed to fetch data for cycle {}. Please try again.", cycle_number)
    }
}
