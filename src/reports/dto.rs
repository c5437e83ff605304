use serde::{Deserialize, Serialize};

use super::repo_types::Report;

/// Body of `POST /reports`. Fields are optional so that missing values turn
/// into validation errors rather than extractor rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "street")]
    pub location: Option<String>,
    pub bus_number: Option<String>,
    pub direction: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    pub city: Option<String>,
    pub since_minutes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
