// models/jobmodel.rs
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How close to the deadline an assigned job is flagged as due.
pub const DUE_WINDOW_DAYS: i64 = 2;

/// Window in which a client re-posting the same description is treated
/// as an accidental double submit.
pub const DUPLICATE_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Posted,
    Assigned,
    Due,
    Late,
    PendingApproval,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Posted => "posted",
            JobStatus::Assigned => "assigned",
            JobStatus::Due => "due",
            JobStatus::Late => "late",
            JobStatus::PendingApproval => "pending_approval",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// States in which the assigned writer may upload work.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::Due | JobStatus::Late)
    }

    /// Validated edge set of the lifecycle. Every status change in the
    /// system goes through this check; there is no string comparison
    /// anywhere in the transition logic.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Posted, Assigned) | (Posted, Cancelled) => true,
            (Assigned, Due) | (Assigned, Late) | (Assigned, PendingApproval) => true,
            (Due, Late) | (Due, PendingApproval) => true,
            (Late, PendingApproval) => true,
            // approval, or rejection back into a resubmittable state
            (PendingApproval, Completed) => true,
            (PendingApproval, Assigned) | (PendingApproval, Due) | (PendingApproval, Late) => true,
            _ => false,
        }
    }

    /// Lazy, read-time status derivation. Returns the status the job
    /// should move to, or `None` when nothing changes. Idempotent:
    /// calling it again on the result with the same clock yields `None`.
    /// Never fires for posted, under-review or terminal jobs and never
    /// downgrades `due`/`late` back to `assigned`. A job awaiting
    /// approval keeps that status until the review verdict; lateness is
    /// reapplied on rejection by [`resubmittable_status`].
    pub fn derive(&self, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<JobStatus> {
        if *self == JobStatus::Posted
            || *self == JobStatus::PendingApproval
            || self.is_terminal()
        {
            return None;
        }
        let deadline = deadline?;

        if now > deadline {
            if *self != JobStatus::Late {
                return Some(JobStatus::Late);
            }
            None
        } else if now >= deadline - Duration::days(DUE_WINDOW_DAYS) && *self == JobStatus::Assigned
        {
            Some(JobStatus::Due)
        } else {
            None
        }
    }
}

/// State a job returns to when its pending submission is rejected, so the
/// writer can resubmit. Placed relative to the deadline the same way the
/// derivation step would place it.
pub fn resubmittable_status(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> JobStatus {
    match deadline {
        Some(d) if now > d => JobStatus::Late,
        Some(d) if now >= d - Duration::days(DUE_WINDOW_DAYS) => JobStatus::Due,
        _ => JobStatus::Assigned,
    }
}

/// The writer payout is fixed at creation as a third of the client budget,
/// rounded to cents, and is never recomputed afterwards.
pub fn writer_share(client_bid_amount: f64) -> f64 {
    (client_bid_amount / 3.0 * 100.0).round() / 100.0
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn to_str(&self) -> &str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("unknown submission status '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_urgency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Urgency::Normal),
            "urgent" => Ok(Urgency::Urgent),
            other => Err(format!("unknown urgency '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "line_spacing", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    Single,
    #[default]
    Double,
}

impl FromStr for Spacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Spacing::Single),
            "double" => Ok(Spacing::Double),
            other => Err(format!("unknown spacing '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "academic_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    HighSchool,
    #[default]
    Undergraduate,
    Masters,
    Phd,
}

impl FromStr for AcademicLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high_school" => Ok(AcademicLevel::HighSchool),
            "undergraduate" => Ok(AcademicLevel::Undergraduate),
            "masters" => Ok(AcademicLevel::Masters),
            "phd" => Ok(AcademicLevel::Phd),
            other => Err(format!("unknown academic level '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "paper_language", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    EnglishUs,
    EnglishUk,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "english_us" => Ok(Language::EnglishUs),
            "english_uk" => Ok(Language::EnglishUk),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "citation_style", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Harvard,
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apa" => Ok(CitationStyle::Apa),
            "mla" => Ok(CitationStyle::Mla),
            "chicago" => Ok(CitationStyle::Chicago),
            "harvard" => Ok(CitationStyle::Harvard),
            other => Err(format!("unknown citation style '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Job {
    pub id: Uuid,
    pub client_id: Uuid,
    pub writer_id: Option<Uuid>,
    pub description: String,
    pub file_url: Option<String>,
    pub file_extension: Option<String>,
    pub status: JobStatus,
    pub client_bid_amount: f64,
    pub writer_share: f64,
    pub admin_bid_amount: Option<f64>,
    pub expected_return_date: Option<DateTime<Utc>>,
    pub urgency: Urgency,
    pub subject: Option<String>,
    pub quantity: Option<f64>,
    pub spacing: Spacing,
    pub level: AcademicLevel,
    pub language: Language,
    pub citation_style: CitationStyle,
    pub number_of_sources: Option<i32>,
    pub pending_submission_id: Option<Uuid>,
    pub submission_id: Option<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A writer may upload work only while the status allows it and no
    /// earlier submission is still awaiting review. At most one pending
    /// submission exists per job at any time.
    pub fn open_for_submission(&self) -> bool {
        self.status.accepts_submission() && self.pending_submission_id.is_none()
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: Uuid,
    pub job_id: Uuid,
    pub writer_id: Uuid,
    pub amount: f64,
    pub status: BidStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Submission {
    pub id: Uuid,
    pub job_id: Uuid,
    pub writer_id: Uuid,
    pub file_url: Option<String>,
    pub file_extension: String,
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
}

/// Bid row joined with its writer, for the admin bid-review listing.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct BidWithWriter {
    pub id: Uuid,
    pub job_id: Uuid,
    pub writer_id: Uuid,
    pub amount: f64,
    pub status: BidStatus,
    pub writer_name: String,
    pub writer_email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Pending submission joined with its job and writer, for admin review.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct SubmissionWithContext {
    pub id: Uuid,
    pub job_id: Uuid,
    pub writer_id: Uuid,
    pub file_url: Option<String>,
    pub file_extension: String,
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
    pub job_description: String,
    pub writer_name: String,
    pub writer_email: String,
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2025-01-01T00:00:00Z".parse().unwrap()
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    #[test]
    fn legal_edges_are_accepted() {
        use JobStatus::*;
        for (from, to) in [
            (Posted, Assigned),
            (Posted, Cancelled),
            (Assigned, Due),
            (Assigned, Late),
            (Assigned, PendingApproval),
            (Due, Late),
            (Due, PendingApproval),
            (Late, PendingApproval),
            (PendingApproval, Completed),
            (PendingApproval, Assigned),
            (PendingApproval, Due),
            (PendingApproval, Late),
        ] {
            assert!(from.can_transition_to(to), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn illegal_edges_are_rejected() {
        use JobStatus::*;
        for (from, to) in [
            (Posted, Completed),
            (Posted, Due),
            (Posted, Late),
            (Posted, PendingApproval),
            (Assigned, Cancelled),
            (Assigned, Posted),
            (Due, Assigned),
            (Late, Due),
            (PendingApproval, Cancelled),
            (Completed, Posted),
            (Completed, Assigned),
            (Cancelled, Posted),
            (Cancelled, Completed),
        ] {
            assert!(!from.can_transition_to(to), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use JobStatus::*;
        let all = [Posted, Assigned, Due, Late, PendingApproval, Completed, Cancelled];
        for next in all {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn derive_flags_due_inside_the_window() {
        let deadline = t0() + days(10);
        let now = t0() + days(8);
        assert_eq!(
            JobStatus::Assigned.derive(Some(deadline), now),
            Some(JobStatus::Due)
        );
    }

    #[test]
    fn derive_flags_late_past_the_deadline() {
        let deadline = t0() + days(10);
        let now = t0() + days(11);
        assert_eq!(
            JobStatus::Assigned.derive(Some(deadline), now),
            Some(JobStatus::Late)
        );
        assert_eq!(
            JobStatus::Due.derive(Some(deadline), now),
            Some(JobStatus::Late)
        );
    }

    #[test]
    fn derive_is_idempotent() {
        let deadline = t0() + days(10);
        let now = t0() + days(8);
        let next = JobStatus::Assigned.derive(Some(deadline), now).unwrap();
        assert_eq!(next.derive(Some(deadline), now), None);

        let now = t0() + days(11);
        let next = JobStatus::Due.derive(Some(deadline), now).unwrap();
        assert_eq!(next.derive(Some(deadline), now), None);
    }

    #[test]
    fn derive_skips_posted_under_review_terminal_and_undated_jobs() {
        let deadline = t0() - days(1);
        let now = t0();
        assert_eq!(JobStatus::Posted.derive(Some(deadline), now), None);
        assert_eq!(JobStatus::PendingApproval.derive(Some(deadline), now), None);
        assert_eq!(JobStatus::Completed.derive(Some(deadline), now), None);
        assert_eq!(JobStatus::Cancelled.derive(Some(deadline), now), None);
        assert_eq!(JobStatus::Assigned.derive(None, now), None);
    }

    #[test]
    fn overdue_jobs_under_review_stay_under_review() {
        // the deadline passing must not reopen a job whose submission is
        // awaiting a verdict; the review flow owns that status
        let deadline = t0() + days(10);
        let now = t0() + days(11);
        assert_eq!(JobStatus::PendingApproval.derive(Some(deadline), now), None);
        assert!(!JobStatus::PendingApproval.accepts_submission());
        // rejection may still place the job straight into late
        assert!(JobStatus::PendingApproval.can_transition_to(JobStatus::Late));
    }

    #[test]
    fn duplicate_window_covers_the_last_five_minutes() {
        let now = t0();
        let window_start = now - Duration::minutes(DUPLICATE_WINDOW_MINUTES);
        // a post 4m59s ago falls inside the window, 5m01s ago falls out
        assert!(now - Duration::seconds(299) >= window_start);
        assert!(now - Duration::seconds(301) < window_start);
    }

    #[test]
    fn derive_never_downgrades() {
        // well before the window again (deadline moved out by an edit
        // cannot happen post-assignment, but the derivation itself must
        // not walk a job back)
        let deadline = t0() + days(30);
        let now = t0();
        assert_eq!(JobStatus::Due.derive(Some(deadline), now), None);
        assert_eq!(JobStatus::Late.derive(Some(deadline), now), None);
    }

    #[test]
    fn resubmittable_status_tracks_the_deadline() {
        let deadline = t0() + days(10);
        assert_eq!(
            resubmittable_status(Some(deadline), t0() + days(3)),
            JobStatus::Assigned
        );
        assert_eq!(
            resubmittable_status(Some(deadline), t0() + days(9)),
            JobStatus::Due
        );
        assert_eq!(
            resubmittable_status(Some(deadline), t0() + days(12)),
            JobStatus::Late
        );
        assert_eq!(resubmittable_status(None, t0()), JobStatus::Assigned);
    }

    #[test]
    fn writer_share_is_a_third_rounded_to_cents() {
        assert_eq!(writer_share(300.0), 100.0);
        assert_eq!(writer_share(100.0), 33.33);
        assert_eq!(writer_share(50.0), 16.67);
    }

    #[test]
    fn classification_enums_parse_their_wire_names() {
        assert_eq!("urgent".parse::<Urgency>().unwrap(), Urgency::Urgent);
        assert_eq!("single".parse::<Spacing>().unwrap(), Spacing::Single);
        assert_eq!(
            "high_school".parse::<AcademicLevel>().unwrap(),
            AcademicLevel::HighSchool
        );
        assert_eq!("english_uk".parse::<Language>().unwrap(), Language::EnglishUk);
        assert_eq!("mla".parse::<CitationStyle>().unwrap(), CitationStyle::Mla);
        assert!("APA".parse::<CitationStyle>().is_err());
    }
}
