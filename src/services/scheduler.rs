use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::cache::CacheStore;
use crate::models::api_responses::LastFetchInfo;
use crate::models::{PrecipitationBounds, PrecipitationPayload, WindBounds, WindPayload};
use crate::services::opendap_downloader::{
    download_precipitation_data_opendap, download_wind_data_opendap, select_run,
};

pub const WIND_POINTS_KEY: &str = "wind:points";
pub const WIND_PNG_KEY: &str = "wind:png";
pub const WIND_METADATA_KEY: &str = "wind:metadata";
pub const PRECIPITATION_POINTS_KEY: &str = "precipitation:points";
pub const LAST_UPDATE_KEY: &str = "wind:last_update";

const MAX_HISTORY: usize = 20;

#[derive(Debug, Clone)]
struct ForecastTarget {
    run_age: i64,
    offset: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_fetch: Option<LastFetchInfo>,
}

pub struct Scheduler {
    cache: Arc<CacheStore>,
    status: Arc<RwLock<SchedulerStatus>>,
    tick_in_progress: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self {
            cache,
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            tick_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the bootstrap backfill, then start the 5-minute recurring tick.
    pub async fn start(&self) {
        info!("Starting wind data scheduler...");
        info!("Schedule: every 5 minutes");
        info!("Initial: fetch last 24h | recurring: check for latest forecast");

        {
            let mut status = self.status.write().await;
            status.running = true;
        }

        info!("Running initial 24h historical data fetch...");
        if let Err(e) = self.fetch_historical_24h().await {
            error!("Initial 24h fetch failed: {}", e);
        }

        let cache = self.cache.clone();
        let status = self.status.clone();
        let tick_in_progress = self.tick_in_progress.clone();

        tokio::spawn(async move {
            use tokio_cron_scheduler::{Job, JobScheduler};

            let sched = JobScheduler::new().await.unwrap();

            let job = Job::new_async("0 */5 * * * *", move |_uuid, _l| {
                let cache = cache.clone();
                let status = status.clone();
                let tick_in_progress = tick_in_progress.clone();

                Box::pin(async move {
                    if tick_in_progress
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        info!("Scheduled tick skipped: previous tick still in progress");
                        return;
                    }

                    info!("[{}] Scheduled latest forecast check triggered", Utc::now());
                    let scheduler = Scheduler {
                        cache,
                        status,
                        tick_in_progress: Arc::new(AtomicBool::new(true)),
                    };
                    if let Err(e) = scheduler.fetch_latest_forecast().await {
                        error!("Latest forecast fetch failed: {}", e);
                    }

                    scheduler.tick_in_progress.store(false, Ordering::SeqCst);
                })
            })
            .unwrap();

            sched.add(job).await.unwrap();
            sched.start().await.unwrap();

            loop {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });

        info!("Wind data scheduler started successfully");
    }

    /// `fetch_single` (§4.5): fetch wind (and, best-effort, precipitation) for
    /// one `(run_age, forecast_offset)` target, skipping if already stored.
    pub async fn fetch_single(&self, forecast_offset: i32, run_age: i64) -> anyhow::Result<bool> {
        let effective_hours_back = run_age - forecast_offset as i64;
        let run = select_run(run_age);
        let run_name = run.run_name();
        let data_time = Utc::now() - chrono::Duration::hours(effective_hours_back);

        let existing = self.cache.list_indices(WIND_POINTS_KEY).await?;
        let already_exists = existing
            .iter()
            .any(|idx| idx.run_name.as_deref() == Some(run_name.as_str()) && idx.forecast_offset == Some(forecast_offset));

        if already_exists {
            info!(
                "fetch_single: {} + f+{} already exists, skipping",
                run_name, forecast_offset
            );
            return Ok(true);
        }

        info!(
            "fetch_single: downloading wind for {} + f+{} ({}h ago)",
            run_name, forecast_offset, effective_hours_back
        );

        let wind_data = download_wind_data_opendap(forecast_offset, run_age, -90.0, 90.0, -180.0, 180.0).await?;

        info!("fetch_single: fetched {} wind points", wind_data.wind_points.len());

        let bounds = WindBounds {
            lat: [-90.0, 90.0],
            lon: [-180.0, 180.0],
        };

        let wind_payload = WindPayload {
            timestamp: Utc::now().to_rfc3339(),
            run_name: run_name.clone(),
            forecast_offset: forecast_offset as i64,
            run_age,
            data_time: data_time.to_rfc3339(),
            hours_back: effective_hours_back,
            source: wind_data.metadata.source.clone(),
            resolution: 0.5,
            points: wind_data.wind_points,
            region: "Global".to_string(),
            bounds,
        };
        let wind_payload = serde_json::to_value(&wind_payload)?;

        let idx = self
            .cache
            .set_versioned(WIND_POINTS_KEY, &wind_payload, MAX_HISTORY)
            .await?;

        info!("fetch_single: stored wind points at index {}", idx);

        self.cache
            .set_binary_versioned(WIND_PNG_KEY, &wind_data.png_buffer, idx)
            .await?;

        let metadata_json = serde_json::to_value(&wind_data.metadata)?;
        self.cache
            .set_json(&format!("{WIND_METADATA_KEY}:{idx}"), &metadata_json)
            .await?;

        let is_latest = run_age == 0 && forecast_offset == 0;
        if is_latest {
            self.cache.set_json(WIND_METADATA_KEY, &metadata_json).await?;
            self.cache.set_json(WIND_POINTS_KEY, &wind_payload).await?;
        }

        info!("fetch_single: downloading precipitation for {} + f+{}", run_name, forecast_offset);

        match download_precipitation_data_opendap(forecast_offset, run_age, -90.0, 90.0, -180.0, 180.0).await {
            Ok(precip_data) => {
                info!("fetch_single: fetched {} precipitation points", precip_data.precip_points.len());

                let precip_payload = PrecipitationPayload {
                    timestamp: Utc::now().to_rfc3339(),
                    run_name: run_name.clone(),
                    forecast_offset: forecast_offset as i64,
                    run_age,
                    data_time: data_time.to_rfc3339(),
                    hours_back: effective_hours_back,
                    source: "NOAA GFS 0.5° via OpenDAP".to_string(),
                    resolution: 0.5,
                    points: precip_data.precip_points,
                    region: "Global".to_string(),
                    unit: "mm/3h".to_string(),
                    bounds: PrecipitationBounds {
                        lat: bounds.lat,
                        lon: bounds.lon,
                    },
                };
                let precip_payload = serde_json::to_value(&precip_payload)?;

                self.cache
                    .set_versioned(PRECIPITATION_POINTS_KEY, &precip_payload, MAX_HISTORY)
                    .await?;

                if is_latest {
                    self.cache
                        .set_json(PRECIPITATION_POINTS_KEY, &precip_payload)
                        .await?;
                }
            }
            Err(e) => {
                error!("fetch_single: precipitation fetch failed for f+{}: {}", forecast_offset, e);
            }
        }

        Ok(true)
    }

    fn calculate_historical_forecast_targets() -> Vec<ForecastTarget> {
        let mut targets = Vec::new();

        for hours_back in [0, 3, 6, 9, 12, 15, 18, 21] {
            let mut found = false;

            for run_age in [6, 12, 18, 24] {
                let offset = run_age - hours_back;
                if offset >= 0 && offset % 3 == 0 && offset <= 24 {
                    targets.push(ForecastTarget {
                        run_age: run_age as i64,
                        offset,
                    });
                    found = true;
                    break;
                }
            }

            if !found {
                error!("Could not find GFS run/offset for {}h ago", hours_back);
            }
        }

        targets
    }

    /// `fetch_historical_24h` (§4.5): bootstrap backfill over the last 21 hours.
    pub async fn fetch_historical_24h(&self) -> anyhow::Result<bool> {
        info!("=== Starting 24h historical data fetch ===");

        let targets = Self::calculate_historical_forecast_targets();
        let mut success_count = 0;
        let mut failure_count = 0;

        for target in &targets {
            match self.fetch_single(target.offset, target.run_age).await {
                Ok(true) => success_count += 1,
                _ => failure_count += 1,
            }

            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }

        let summary = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "success": success_count > 0,
            "successCount": success_count,
            "failureCount": failure_count,
            "totalForecasts": targets.len(),
        });

        self.cache.set_json(LAST_UPDATE_KEY, &summary).await?;

        {
            let mut status = self.status.write().await;
            status.last_fetch = Some(LastFetchInfo {
                success: success_count > 0,
                timestamp: Utc::now().to_rfc3339(),
                error: None,
                success_count: Some(success_count),
                failure_count: Some(failure_count),
            });
        }

        info!(
            "=== Fetch complete: {} success, {} failures ===",
            success_count, failure_count
        );

        Ok(success_count > 0)
    }

    /// `fetch_single(0, 0)` wrapper for the 5-minute steady-state tick.
    pub async fn fetch_latest_forecast(&self) -> anyhow::Result<bool> {
        info!("Checking for latest forecast...");
        let success = self.fetch_single(0, 0).await?;

        let mut status = self.status.write().await;
        status.last_fetch = Some(LastFetchInfo {
            success,
            timestamp: Utc::now().to_rfc3339(),
            error: None,
            success_count: None,
            failure_count: None,
        });

        Ok(success)
    }

    pub async fn get_status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_targets_cover_21_hours_in_3h_steps() {
        let targets = Scheduler::calculate_historical_forecast_targets();
        let covered: Vec<i64> = targets.iter().map(|t| t.run_age - t.offset as i64).collect();
        assert_eq!(covered, vec![0, 3, 6, 9, 12, 15, 18, 21]);

        for target in &targets {
            assert!([6, 12, 18, 24].contains(&target.run_age));
            assert_eq!(target.offset % 3, 0);
            assert!(target.offset >= 0 && target.offset <= 24);
        }
    }

    #[test]
    fn test_historical_targets_prefer_smallest_run_age() {
        let targets = Scheduler::calculate_historical_forecast_targets();
        // hours_back = 0 should resolve to the smallest eligible run_age (6).
        let zero_target = targets.iter().find(|t| t.run_age - t.offset as i64 == 0).unwrap();
        assert_eq!(zero_target.run_age, 6);
        assert_eq!(zero_target.offset, 6);
    }
}
