// dtos/jobdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::jobmodel::{
    AcademicLevel, Bid, BidWithWriter, CitationStyle, Job, Language, Spacing, Submission,
    SubmissionStatus, SubmissionWithContext, Urgency,
};
use crate::utils::upload::{from_form_str, opt_from_form_str};

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct CreateJobDto {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(deserialize_with = "from_form_str")]
    pub client_bid_amount: f64,

    #[serde(deserialize_with = "from_form_str")]
    pub expected_return_date: DateTime<Utc>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub urgency: Option<Urgency>,

    pub subject: Option<String>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub quantity: Option<f64>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub spacing: Option<Spacing>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub level: Option<AcademicLevel>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub language: Option<Language>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub citation_style: Option<CitationStyle>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub number_of_sources: Option<i32>,
}

/// Partial update while a job is still posted; absent fields keep their
/// stored values.
#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct UpdateJobDto {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "opt_from_form_str")]
    pub expected_return_date: Option<DateTime<Utc>>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SetJobTermsDto {
    pub admin_bid_amount: f64,
    pub expected_return_date: DateTime<Utc>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidDto {
    pub amount: f64,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmissionDto {
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobData {
    pub job: Job,
}

#[derive(Debug, Serialize)]
pub struct JobResponseDto {
    pub status: String,
    pub message: String,
    pub data: JobData,
}

#[derive(Debug, Serialize)]
pub struct JobListResponseDto {
    pub status: String,
    pub results: usize,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct BidResponseDto {
    pub status: String,
    pub message: String,
    pub bid: Bid,
}

#[derive(Debug, Serialize)]
pub struct JobBidsResponseDto {
    pub status: String,
    pub job: Job,
    pub bids: Vec<BidWithWriter>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponseDto {
    pub status: String,
    pub message: String,
    pub submission: Submission,
    pub job: Job,
}

#[derive(Debug, Serialize)]
pub struct SubmissionListResponseDto {
    pub status: String,
    pub results: usize,
    pub submissions: Vec<SubmissionWithContext>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_job_parses_stringly_form_fields() {
        let dto: CreateJobDto = serde_json::from_value(json!({
            "description": "2000 word essay on borrow checking",
            "client_bid_amount": "150.50",
            "expected_return_date": "2025-06-01T12:00:00Z",
            "urgency": "urgent",
            "quantity": "8",
            "citation_style": "harvard"
        }))
        .unwrap();

        assert_eq!(dto.client_bid_amount, 150.50);
        assert_eq!(dto.urgency, Some(Urgency::Urgent));
        assert_eq!(dto.quantity, Some(8.0));
        assert_eq!(dto.citation_style, Some(CitationStyle::Harvard));
        assert_eq!(dto.level, None);
    }

    #[test]
    fn create_job_rejects_a_malformed_amount() {
        let result = serde_json::from_value::<CreateJobDto>(json!({
            "description": "essay",
            "client_bid_amount": "a lot",
            "expected_return_date": "2025-06-01T12:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn review_dto_accepts_wire_statuses() {
        let dto: ReviewSubmissionDto =
            serde_json::from_value(json!({"status": "rejected", "feedback": "missing sources"}))
                .unwrap();
        assert_eq!(dto.status, SubmissionStatus::Rejected);
    }
}
