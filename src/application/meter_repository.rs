// Repository trait for the backend that stores readings and computes consumption
use crate::domain::reading::{CalculationData, DeletionScope, PeriodRange, Reading, Utility};
use crate::domain::transform::TransformSettings;
use async_trait::async_trait;

#[async_trait]
pub trait MeterRepository: Send + Sync {
    /// Raw cumulative readings of one utility, optionally limited to a period range
    async fn fetch_readings(&self, utility: Utility, range: &PeriodRange) -> anyhow::Result<Vec<Reading>>;

    /// Backend-aggregated consumption per period and meter
    async fn fetch_calculations(
        &self,
        utility: Utility,
        range: &PeriodRange,
    ) -> anyhow::Result<CalculationData>;

    /// Stored display transform, `None` if nothing was saved yet
    async fn fetch_transform(&self) -> anyhow::Result<Option<TransformSettings>>;

    /// Upsert of all six transform settings
    async fn save_transform(&self, settings: &TransformSettings) -> anyhow::Result<()>;

    /// Returns the number of deleted readings
    async fn delete_readings(&self, scope: &DeletionScope) -> anyhow::Result<u64>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory repository for service tests.
    #[derive(Default)]
    pub struct FakeRepository {
        pub readings: Vec<Reading>,
        pub calculations: Vec<(Utility, CalculationData)>,
        pub transform: Option<TransformSettings>,
        pub saved: Mutex<Vec<TransformSettings>>,
        pub deleted: Mutex<Vec<DeletionScope>>,
        /// Delays for successive electricity reading fetches.
        pub fetch_delay: Mutex<Vec<Duration>>,
        /// Delays for successive electricity calculation fetches.
        pub calculation_delay: Mutex<Vec<Duration>>,
        pub fail_calculations: bool,
        /// Number of upcoming transform fetches that fail.
        pub transform_failures: AtomicUsize,
    }

    fn next_delay(delays: &Mutex<Vec<Duration>>) -> Option<Duration> {
        let mut delays = delays.lock().unwrap();
        if delays.is_empty() { None } else { Some(delays.remove(0)) }
    }

    #[async_trait]
    impl MeterRepository for FakeRepository {
        async fn fetch_readings(&self, utility: Utility, _range: &PeriodRange) -> anyhow::Result<Vec<Reading>> {
            if utility == Utility::Electricity {
                if let Some(delay) = next_delay(&self.fetch_delay) {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(self.readings.iter().filter(|r| r.utility == utility).cloned().collect())
        }

        async fn fetch_calculations(
            &self,
            utility: Utility,
            _range: &PeriodRange,
        ) -> anyhow::Result<CalculationData> {
            if utility == Utility::Electricity {
                if let Some(delay) = next_delay(&self.calculation_delay) {
                    tokio::time::sleep(delay).await;
                }
            }
            if self.fail_calculations {
                anyhow::bail!("backend unavailable");
            }
            Ok(self
                .calculations
                .iter()
                .find(|(u, _)| *u == utility)
                .map(|(_, data)| data.clone())
                .unwrap_or_default())
        }

        async fn fetch_transform(&self) -> anyhow::Result<Option<TransformSettings>> {
            let failing = self
                .transform_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                anyhow::bail!("settings store unavailable");
            }
            Ok(self.transform)
        }

        async fn save_transform(&self, settings: &TransformSettings) -> anyhow::Result<()> {
            self.saved.lock().unwrap().push(*settings);
            Ok(())
        }

        async fn delete_readings(&self, scope: &DeletionScope) -> anyhow::Result<u64> {
            self.deleted.lock().unwrap().push(scope.clone());
            Ok(1)
        }
    }
}
