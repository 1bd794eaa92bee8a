use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Operator,
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
}

/// Token pair issued by the mobile login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// What callers of `login` get back. The refresh token never leaves the session layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl From<&TokenPair> for TokenResponse {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            token_type: pair.token_type.clone(),
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectReport {
    pub id: String,
    pub report_id: String,
    pub status: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    pub defect_description: String,
    #[serde(default)]
    pub root_cause: Option<String>,
    pub severity: ReportSeverity,
    pub created_at: String,
    #[serde(default)]
    pub operator_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct DefectReportPage {
    #[serde(default)]
    pub(crate) results: Option<Vec<DefectReport>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_defects: u64,
    pub critical_defects: u64,
    pub defects_this_month: u64,
    pub trend_percentage: f64,
    pub machines_affected: u64,
    #[serde(default)]
    pub avg_resolution_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUpload {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputSeverity {
    Critical,
    Major,
    Minor,
}

/// 4M root-cause category. The intake form allows leaving it blank.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category4m {
    Man,
    Machine,
    Material,
    Method,
    #[default]
    #[serde(rename = "")]
    Unset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectInputData {
    pub occurrence_date: String,
    pub part_name: String,
    pub part_number: String,
    pub process_name: String,
    pub machine_name: String,
    pub discoverer_name: String,

    pub phenomenon: String,
    pub defect_type: String,
    pub severity: InputSeverity,

    #[serde(default)]
    pub category_4m: Category4m,
    #[serde(default)]
    pub factor: String,
    #[serde(default)]
    pub root_cause: String,

    #[serde(default)]
    pub countermeasure: String,
    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_image: Option<ImageUpload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_image: Option<ImageUpload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_image: Option<ImageUpload>,

    // Older backends still read these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Machine {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MachineHealth {
    Good,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    pub name: String,
    pub defect_rate: f64,
    pub incidents: u32,
    pub status: MachineHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefectTrend {
    pub date: String,
    pub defects: u32,
    pub target: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiData {
    pub total_defects: u64,
    pub total_machines: u64,
    pub total_operators: u64,
    pub total_customers: u64,
    pub avg_defect_rate: f64,
    pub critical_machines: u64,
    #[serde(default)]
    pub critical_defects: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootCauseCount {
    pub cause: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefectTypeCount {
    #[serde(rename = "type")]
    pub defect_type: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCount {
    pub severity: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub top_root_causes: Vec<RootCauseCount>,
    pub defect_types: Vec<DefectTypeCount>,
    pub severity_distribution: Vec<SeverityCount>,
    pub last_updated: String,
}
