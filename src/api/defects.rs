use super::client::{ApiClient, ApiError};
use super::fallback;
use crate::types::{DefectInputData, DefectReport, Machine};
use tracing::info;

const DEFECT_REPORTS_PATH: &str = "/api/defect-reports";
const MACHINES_PATH: &str = "/api/machines";

impl ApiClient {
    pub async fn create_defect_report(&self, data: &DefectInputData) -> Result<DefectReport, ApiError> {
        let report: DefectReport = self.post_json(DEFECT_REPORTS_PATH, data).await?;
        info!(report_id = %report.report_id, "defect report submitted");
        Ok(report)
    }

    pub async fn machines(&self) -> Result<Vec<Machine>, ApiError> {
        let result = self
            .get_json::<Option<Vec<Machine>>>(MACHINES_PATH)
            .await
            .map(Option::unwrap_or_default);
        self.or_sample("machines", result, fallback::sample_machines)
    }
}
