use super::client::{ApiClient, ApiError};
use super::fallback;
use crate::types::{
    DashboardStats, DefectReport, DefectReportPage, DefectTrend, ExecutiveSummary, KpiData,
    MachineStatus,
};
use chrono::Local;
use tracing::warn;

const STATS_PATH: &str = "/stats";
const DEFECT_REPORTS_PATH: &str = "/api/defect-reports";
const KPIS_PATH: &str = "/api/manufacturing/kpis";
const EXECUTIVE_SUMMARY_PATH: &str = "/api/manufacturing/executive-summary";
const DEFECT_TRENDS_PATH: &str = "/api/manufacturing/defects/trends";
const MACHINE_STATUS_PATH: &str = "/api/manufacturing/machines";

pub const DEFAULT_RECENT_DEFECTS: u32 = 10;
pub const DEFAULT_TREND_DAYS: u32 = 7;

impl ApiClient {
    /// Serves sample data in place of a failed call when offline fallback is on.
    /// Auth failures always propagate so the caller can send the user to sign in.
    pub(crate) fn or_sample<T>(
        &self,
        what: &str,
        result: Result<T, ApiError>,
        sample: impl FnOnce() -> T,
    ) -> Result<T, ApiError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.offline_fallback() && !e.is_auth_failure() => {
                warn!(what, error = %e, "backend unavailable; serving sample data");
                Ok(sample())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_json(STATS_PATH).await
    }

    pub async fn recent_defects(&self, limit: u32) -> Result<Vec<DefectReport>, ApiError> {
        let path = format!("{DEFECT_REPORTS_PATH}?limit={limit}&sort=-created_at");
        let page: DefectReportPage = self.get_json(&path).await?;
        Ok(page.results.unwrap_or_default())
    }

    pub async fn manufacturing_kpis(&self) -> Result<KpiData, ApiError> {
        let result = self.get_json::<KpiData>(KPIS_PATH).await;
        self.or_sample("kpis", result, fallback::sample_kpis)
    }

    pub async fn executive_summary(&self) -> Result<ExecutiveSummary, ApiError> {
        let result = self.get_json::<ExecutiveSummary>(EXECUTIVE_SUMMARY_PATH).await;
        self.or_sample("executive summary", result, fallback::sample_executive_summary)
    }

    pub async fn defect_trends(&self, days: u32) -> Result<Vec<DefectTrend>, ApiError> {
        let path = format!("{DEFECT_TRENDS_PATH}?days={days}");
        let result = self.get_json::<Vec<DefectTrend>>(&path).await;
        self.or_sample("defect trends", result, || {
            fallback::sample_defect_trends(days, Local::now().date_naive())
        })
    }

    pub async fn machine_status(&self) -> Result<Vec<MachineStatus>, ApiError> {
        let result = self.get_json::<Vec<MachineStatus>>(MACHINE_STATUS_PATH).await;
        self.or_sample("machine status", result, fallback::sample_machine_status)
    }
}
