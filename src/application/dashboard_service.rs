// Dashboard service - Use case for building dashboards
use crate::application::meter_repository::MeterRepository;
use crate::application::transform_service::TransformService;
use crate::domain::calculation_table::{CalculationView, build_calculation_table};
use crate::domain::dashboard::{Dashboard, DashboardInputs};
use crate::domain::reading::{DeletionScope, PeriodRange, Utility};
use crate::domain::reset_merge::ReadingsTable;
use anyhow::Context;
use futures::future::{try_join, try_join_all};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn MeterRepository>,
    transforms: TransformService,
    generation: Arc<AtomicU64>,
    /// Loads with a generation at or below this started before a deletion.
    invalidated: Arc<AtomicU64>,
    latest: Arc<RwLock<HashMap<PeriodRange, (u64, Arc<Dashboard>)>>>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn MeterRepository>, transforms: TransformService) -> Self {
        Self {
            repository,
            transforms,
            generation: Arc::new(AtomicU64::new(0)),
            invalidated: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetches everything for `range` and composes a fresh dashboard. If a load that
    /// started later has already completed for the same range, its result wins and
    /// this one is dropped.
    pub async fn get_dashboard(&self, range: PeriodRange) -> anyhow::Result<Arc<Dashboard>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let inputs = self.fetch_inputs(&range).await?;
        let transform = self.transforms.current().await;
        let dashboard = Arc::new(Dashboard::compose(range.clone(), &inputs, &transform));

        Ok(self.publish(range, generation, dashboard).await)
    }

    pub async fn get_readings_table(&self, utility: Utility, range: &PeriodRange) -> anyhow::Result<ReadingsTable> {
        let readings = self
            .repository
            .fetch_readings(utility, range)
            .await
            .with_context(|| format!("Failed to fetch {} readings", utility))?;
        Ok(ReadingsTable::build(utility, &readings))
    }

    pub async fn get_calculation_table(
        &self,
        utility: Utility,
        range: &PeriodRange,
    ) -> anyhow::Result<CalculationView> {
        let data = self
            .repository
            .fetch_calculations(utility, range)
            .await
            .with_context(|| format!("Failed to fetch {} calculations", utility))?;
        Ok(build_calculation_table(utility, &data))
    }

    /// Forwards a deletion to the backend and forgets every stored dashboard. Loads
    /// already in flight are not published afterwards.
    pub async fn delete_readings(&self, scope: &DeletionScope) -> anyhow::Result<u64> {
        let deleted = self
            .repository
            .delete_readings(scope)
            .await
            .with_context(|| format!("Failed to delete readings for {}", scope.date))?;

        tracing::info!("Deleted {} readings for {:?}", deleted, scope);
        let mut latest = self.latest.write().await;
        let floor = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.invalidated.fetch_max(floor, Ordering::SeqCst);
        latest.clear();
        Ok(deleted)
    }

    pub async fn latest(&self, range: &PeriodRange) -> Option<Arc<Dashboard>> {
        self.latest.read().await.get(range).map(|(_, d)| d.clone())
    }

    async fn fetch_inputs(&self, range: &PeriodRange) -> anyhow::Result<DashboardInputs> {
        let readings = try_join_all(Utility::ALL.into_iter().map(|utility| async move {
            self.repository
                .fetch_readings(utility, range)
                .await
                .with_context(|| format!("Failed to fetch {} readings", utility))
                .map(|r| (utility, r))
        }));
        let calculations = try_join_all(Utility::ALL.into_iter().map(|utility| async move {
            self.repository
                .fetch_calculations(utility, range)
                .await
                .with_context(|| format!("Failed to fetch {} calculations", utility))
                .map(|c| (utility, c))
        }));

        let (readings, calculations) = try_join(readings, calculations).await?;

        tracing::debug!(
            "Fetched {} readings and {} calculation periods",
            readings.iter().map(|(_, r)| r.len()).sum::<usize>(),
            calculations.iter().map(|(_, c)| c.periods.len()).sum::<usize>()
        );

        Ok(DashboardInputs {
            readings: readings.into_iter().collect(),
            calculations: calculations.into_iter().collect(),
        })
    }

    async fn publish(&self, range: PeriodRange, generation: u64, dashboard: Arc<Dashboard>) -> Arc<Dashboard> {
        let mut latest = self.latest.write().await;
        if generation <= self.invalidated.load(Ordering::SeqCst) {
            tracing::warn!("Not publishing dashboard load {}, readings were deleted meanwhile", generation);
            return dashboard;
        }
        match latest.get(&range) {
            Some((stored, newer)) if *stored > generation => {
                tracing::warn!(
                    "Discarding stale dashboard load {} (newer load {} already applied)",
                    generation,
                    stored
                );
                newer.clone()
            }
            _ => {
                latest.insert(range, (generation, dashboard.clone()));
                dashboard
            }
        }
    }
}
