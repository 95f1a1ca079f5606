// service/job_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt},
    dtos::jobdtos::{CreateJobDto, ReviewSubmissionDto, UpdateJobDto},
    models::{
        jobmodel::*,
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        storage::{object_name, ObjectStorage},
    },
    utils::upload::FilePayload,
};

/// The lifecycle engine. Owns every job/bid/submission transition; the
/// handlers above it only validate input shape and shape responses.
#[derive(Clone)]
pub struct JobService {
    db_client: Arc<DBClient>,
    storage: Arc<dyn ObjectStorage>,
    signed_url_ttl: u64,
}

/// Every status write funnels through this check; a write that is not a
/// legal edge of the lifecycle never reaches the database.
fn ensure_transition(from: JobStatus, to: JobStatus) -> Result<(), ServiceError> {
    if !from.can_transition_to(to) {
        return Err(ServiceError::Precondition(format!(
            "Job cannot move from {} to {}",
            from.to_str(),
            to.to_str()
        )));
    }
    Ok(())
}

impl JobService {
    pub fn new(
        db_client: Arc<DBClient>,
        storage: Arc<dyn ObjectStorage>,
        signed_url_ttl: u64,
    ) -> Self {
        Self {
            db_client,
            storage,
            signed_url_ttl,
        }
    }

    // ----- job transitions -------------------------------------------------

    pub async fn create_job(
        &self,
        client_id: Uuid,
        dto: CreateJobDto,
        file: Option<FilePayload>,
    ) -> Result<Job, ServiceError> {
        if dto.client_bid_amount <= 0.0 {
            return Err(ServiceError::Validation(
                "Invalid budget amount. Must be a number greater than 0.".to_string(),
            ));
        }

        let now = Utc::now();
        if dto.expected_return_date < now {
            return Err(ServiceError::Validation(
                "Expected return date cannot be in the past".to_string(),
            ));
        }

        let window_start = now - Duration::minutes(DUPLICATE_WINDOW_MINUTES);
        if self
            .db_client
            .find_recent_duplicate(client_id, &dto.description, window_start)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateJob);
        }

        // Upload only after every validation has passed, so a rejected
        // request never leaves an orphan object behind.
        let stored = match file {
            Some(file) => Some(self.store_file(file).await?),
            None => None,
        };

        let share = writer_share(dto.client_bid_amount);
        let result = self
            .db_client
            .save_job(
                client_id,
                dto.description,
                dto.client_bid_amount,
                share,
                dto.expected_return_date,
                dto.urgency.unwrap_or_default(),
                dto.subject,
                dto.quantity,
                dto.spacing.unwrap_or_default(),
                dto.level.unwrap_or_default(),
                dto.language.unwrap_or_default(),
                dto.citation_style.unwrap_or_default(),
                dto.number_of_sources,
                stored.clone(),
            )
            .await;

        match result {
            Ok(job) => Ok(job),
            Err(err) => {
                if let Some((url, _)) = stored {
                    self.remove_object_best_effort(&url).await;
                }
                Err(err.into())
            }
        }
    }

    pub async fn edit_job(
        &self,
        client_id: Uuid,
        job_id: Uuid,
        dto: UpdateJobDto,
        file: Option<FilePayload>,
    ) -> Result<Job, ServiceError> {
        let job = self
            .db_client
            .get_job_for_client(job_id, client_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Posted {
            return Err(ServiceError::Precondition(
                "Only posted jobs can be edited".to_string(),
            ));
        }

        if let Some(date) = dto.expected_return_date {
            if date < Utc::now() {
                return Err(ServiceError::Validation(
                    "Expected return date cannot be in the past".to_string(),
                ));
            }
        }

        let stored = match file {
            Some(file) => Some(self.store_file(file).await?),
            None => None,
        };

        let result = self
            .db_client
            .update_job_fields(
                job_id,
                dto.description,
                dto.expected_return_date,
                stored.clone(),
            )
            .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(err) => {
                if let Some((url, _)) = stored {
                    self.remove_object_best_effort(&url).await;
                }
                return Err(err.into());
            }
        };

        // The previous object goes away only once the replacement is
        // confirmed stored and referenced.
        if stored.is_some() {
            if let Some(old_url) = job.file_url {
                self.remove_object_best_effort(&old_url).await;
            }
        }

        Ok(updated)
    }

    pub async fn cancel_job(&self, actor: &User, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = match actor.role {
            UserRole::Admin => self.db_client.get_job(job_id).await?,
            _ => self.db_client.get_job_for_client(job_id, actor.id).await?,
        }
        .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Posted {
            return Err(ServiceError::Precondition(
                "Only posted jobs can be cancelled".to_string(),
            ));
        }

        ensure_transition(job.status, JobStatus::Cancelled)?;

        if let Some(url) = &job.file_url {
            self.storage.delete(object_name(url)).await?;
        }

        let cancelled = self
            .db_client
            .update_job_status(job_id, JobStatus::Cancelled)
            .await?;
        Ok(cancelled)
    }

    /// Admin opens bidding: sets the writer-facing reference amount and
    /// the writer deadline, which must not fall after the client's
    /// expected return date.
    pub async fn set_job_terms(
        &self,
        job_id: Uuid,
        admin_bid_amount: f64,
        writer_deadline: chrono::DateTime<Utc>,
    ) -> Result<Job, ServiceError> {
        if admin_bid_amount <= 0.0 {
            return Err(ServiceError::Validation(
                "Invalid bid amount. Must be a number greater than 0.".to_string(),
            ));
        }

        let job = self
            .db_client
            .get_job(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Posted {
            return Err(ServiceError::Precondition(
                "Only posted jobs can be opened for bidding".to_string(),
            ));
        }

        if let Some(client_deadline) = job.expected_return_date {
            if writer_deadline > client_deadline {
                return Err(ServiceError::Validation(
                    "Writer return date cannot be after the client's expected return date"
                        .to_string(),
                ));
            }
        }

        let updated = self
            .db_client
            .set_job_terms(job_id, admin_bid_amount, writer_deadline)
            .await?;
        Ok(updated)
    }

    // ----- bid arbitration -------------------------------------------------

    pub async fn place_bid(
        &self,
        job_id: Uuid,
        writer_id: Uuid,
        amount: f64,
    ) -> Result<Bid, ServiceError> {
        if amount <= 0.0 {
            return Err(ServiceError::Validation(
                "Invalid bid amount. Must be a number greater than 0.".to_string(),
            ));
        }

        let job = self
            .db_client
            .get_job(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Posted || job.admin_bid_amount.is_none() {
            return Err(ServiceError::JobNotOpen(job_id));
        }

        if self
            .db_client
            .get_bid_for_writer(job_id, writer_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyApplied(job_id, writer_id));
        }

        // The unique constraint still backs the pre-check against races.
        match self.db_client.save_bid(job_id, writer_id, amount).await {
            Ok(bid) => Ok(bid),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(ServiceError::AlreadyApplied(job_id, writer_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Accepts one pending bid and settles its siblings in a single
    /// transaction: the chosen bid becomes accepted, the job assigned to
    /// that writer, and every other pending bid on the job rejected.
    /// Concurrent assignments of sibling bids serialize on the job row
    /// lock; only one commits.
    pub async fn assign_writer(&self, bid_id: Uuid) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1 FOR UPDATE")
            .bind(bid_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))?;

        if bid.status != BidStatus::Pending {
            return Err(ServiceError::BidNotPending(bid_id));
        }

        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(bid.job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::JobNotFound(bid.job_id))?;

        if job.status != JobStatus::Posted {
            return Err(ServiceError::Precondition(
                "Job is no longer open for assignment".to_string(),
            ));
        }
        ensure_transition(job.status, JobStatus::Assigned)?;

        sqlx::query("UPDATE bids SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(bid.id)
            .bind(BidStatus::Accepted)
            .execute(&mut *tx)
            .await?;

        let assigned = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = $2, writer_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(JobStatus::Assigned)
        .bind(bid.writer_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE bids SET status = $3, updated_at = NOW()
            WHERE job_id = $1 AND id <> $2 AND status = $4
            "#,
        )
        .bind(job.id)
        .bind(bid.id)
        .bind(BidStatus::Rejected)
        .bind(BidStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(assigned)
    }

    // ----- submissions -----------------------------------------------------

    pub async fn submit_work(
        &self,
        writer_id: Uuid,
        job_id: Uuid,
        file: FilePayload,
    ) -> Result<(Submission, Job), ServiceError> {
        let job = self
            .db_client
            .get_job(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if !job.status.accepts_submission() {
            return Err(ServiceError::Precondition(
                "Job is not accepting submissions".to_string(),
            ));
        }
        if !job.open_for_submission() {
            return Err(ServiceError::Precondition(
                "An earlier submission is still awaiting review".to_string(),
            ));
        }
        ensure_transition(job.status, JobStatus::PendingApproval)?;

        let bid = self
            .db_client
            .get_bid_for_writer(job_id, writer_id)
            .await?
            .filter(|bid| bid.status == BidStatus::Accepted);
        if bid.is_none() {
            return Err(ServiceError::Forbidden(
                "You are not the assigned writer for this job".to_string(),
            ));
        }

        let extension = file.extension().unwrap_or_else(|| "bin".to_string());
        let (file_url, _) = self.store_file(file).await?;

        let result: Result<(Submission, Job), sqlx::Error> = async {
            let mut tx = self.db_client.pool.begin().await?;

            let submission = sqlx::query_as::<_, Submission>(
                r#"
                INSERT INTO submissions (job_id, writer_id, file_url, file_extension)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(job_id)
            .bind(writer_id)
            .bind(&file_url)
            .bind(&extension)
            .fetch_one(&mut *tx)
            .await?;

            let job = sqlx::query_as::<_, Job>(
                r#"
                UPDATE jobs SET status = $2, pending_submission_id = $3, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(job_id)
            .bind(JobStatus::PendingApproval)
            .bind(submission.id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok((submission, job))
        }
        .await;

        match result {
            Ok(pair) => Ok(pair),
            Err(err) => {
                self.remove_object_best_effort(&file_url).await;
                Err(err.into())
            }
        }
    }

    /// Admin verdict on a pending submission. Approval completes the job
    /// and records the submission as its delivered artifact; rejection
    /// stores feedback and returns the job to a resubmittable state
    /// placed by its deadline.
    pub async fn review_submission(
        &self,
        submission_id: Uuid,
        dto: ReviewSubmissionDto,
    ) -> Result<(Submission, Job), ServiceError> {
        let verdict = dto.status;
        if verdict == SubmissionStatus::Pending {
            return Err(ServiceError::Validation(
                "Review status must be approved or rejected".to_string(),
            ));
        }

        if verdict == SubmissionStatus::Rejected
            && dto.feedback.as_deref().map_or(true, |f| f.trim().is_empty())
        {
            return Err(ServiceError::Validation(
                "Feedback is required when rejecting a submission".to_string(),
            ));
        }

        let mut tx = self.db_client.pool.begin().await?;

        let submission = sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE id = $1 FOR UPDATE",
        )
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::SubmissionNotFound(submission_id))?;

        if submission.status != SubmissionStatus::Pending {
            return Err(ServiceError::Precondition(
                "Only pending submissions can be reviewed".to_string(),
            ));
        }

        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(submission.job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::JobNotFound(submission.job_id))?;

        // only the submission the job is currently waiting on can be
        // reviewed; anything else is a stale row
        if job.pending_submission_id != Some(submission.id) {
            return Err(ServiceError::Precondition(
                "Submission is no longer the job's pending submission".to_string(),
            ));
        }

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions SET status = $2, feedback = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(submission.id)
        .bind(verdict)
        .bind(dto.feedback)
        .fetch_one(&mut *tx)
        .await?;

        let job = if verdict == SubmissionStatus::Approved {
            ensure_transition(job.status, JobStatus::Completed)?;
            sqlx::query_as::<_, Job>(
                r#"
                UPDATE jobs SET status = $2, submission_id = $3,
                       pending_submission_id = NULL, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(job.id)
            .bind(JobStatus::Completed)
            .bind(submission.id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            let next = resubmittable_status(job.expected_return_date, Utc::now());
            ensure_transition(job.status, next)?;
            sqlx::query_as::<_, Job>(
                r#"
                UPDATE jobs SET status = $2, pending_submission_id = NULL, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(job.id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        Ok((submission, job))
    }

    // ----- read-side: derivation and signed URLs ---------------------------

    /// Applies the lazy status derivation to a freshly read job, persisting
    /// the transition when the clock has moved it.
    pub async fn refresh_status(&self, job: Job) -> Result<Job, ServiceError> {
        match job.status.derive(job.expected_return_date, Utc::now()) {
            Some(next) => {
                ensure_transition(job.status, next)?;
                let updated = self.db_client.update_job_status(job.id, next).await?;
                Ok(updated)
            }
            None => Ok(job),
        }
    }

    pub async fn refresh_statuses(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ServiceError> {
        let mut refreshed = Vec::with_capacity(jobs.len());
        for job in jobs {
            refreshed.push(self.refresh_status(job).await?);
        }
        Ok(refreshed)
    }

    /// Swaps the stored object URL for a short-lived signed URL. A signing
    /// failure is downgraded: the file reference is nulled and the rest of
    /// the record still goes out.
    pub async fn with_signed_url(&self, mut job: Job) -> Job {
        if let Some(url) = job.file_url.take() {
            match self
                .storage
                .sign(object_name(&url), self.signed_url_ttl)
                .await
            {
                Ok(signed) => job.file_url = Some(signed),
                Err(err) => {
                    tracing::warn!("failed to sign object for job {}: {}", job.id, err);
                }
            }
        }
        job
    }

    pub async fn with_signed_urls(&self, jobs: Vec<Job>) -> Vec<Job> {
        futures::future::join_all(jobs.into_iter().map(|job| self.with_signed_url(job))).await
    }

    /// Derivation plus signing, the standard read path for every job list.
    pub async fn present_jobs(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ServiceError> {
        let jobs = self.refresh_statuses(jobs).await?;
        Ok(self.with_signed_urls(jobs).await)
    }

    pub async fn present_job(&self, job: Job) -> Result<Job, ServiceError> {
        let job = self.refresh_status(job).await?;
        Ok(self.with_signed_url(job).await)
    }

    pub async fn sign_submission(
        &self,
        mut submission: SubmissionWithContext,
    ) -> SubmissionWithContext {
        if let Some(url) = submission.file_url.take() {
            match self
                .storage
                .sign(object_name(&url), self.signed_url_ttl)
                .await
            {
                Ok(signed) => submission.file_url = Some(signed),
                Err(err) => {
                    tracing::warn!(
                        "failed to sign object for submission {}: {}",
                        submission.id,
                        err
                    );
                }
            }
        }
        submission
    }

    pub async fn sign_submissions(
        &self,
        submissions: Vec<SubmissionWithContext>,
    ) -> Vec<SubmissionWithContext> {
        futures::future::join_all(submissions.into_iter().map(|s| self.sign_submission(s))).await
    }

    // ----- storage helpers -------------------------------------------------

    async fn store_file(&self, file: FilePayload) -> Result<(String, Option<String>), ServiceError> {
        let extension = file.extension();
        let name = format!(
            "{}-{:08x}-{}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>(),
            sanitize_file_name(&file.file_name)
        );
        let url = self
            .storage
            .upload(&name, file.bytes, &file.content_type)
            .await?;
        Ok((url, extension))
    }

    async fn remove_object_best_effort(&self, url: &str) {
        if let Err(err) = self.storage.delete(object_name(url)).await {
            tracing::error!("failed to delete object {}: {}", object_name(url), err);
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::storage::memory::MemoryStorage;
    use sqlx::postgres::PgPoolOptions;

    fn service(storage: Arc<MemoryStorage>) -> JobService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/scribe_market")
            .unwrap();
        JobService::new(Arc::new(DBClient::new(pool)), storage, 3600)
    }

    fn sample_job(file_url: Option<String>) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            writer_id: None,
            description: "sample".to_string(),
            file_extension: file_url.as_deref().map(|_| "pdf".to_string()),
            file_url,
            status: JobStatus::Posted,
            client_bid_amount: 90.0,
            writer_share: 30.0,
            admin_bid_amount: None,
            expected_return_date: Some(now + Duration::days(10)),
            urgency: Urgency::Normal,
            subject: None,
            quantity: None,
            spacing: Spacing::Double,
            level: AcademicLevel::Undergraduate,
            language: Language::EnglishUs,
            citation_style: CitationStyle::Apa,
            number_of_sources: None,
            pending_submission_id: None,
            submission_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn store_file_uploads_and_keeps_the_extension() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage.clone());

        let (url, extension) = svc
            .store_file(FilePayload {
                file_name: "final draft (v2).PDF".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();

        assert_eq!(extension, Some("pdf".to_string()));
        assert_eq!(storage.object_count(), 1);
        assert!(object_name(&url).ends_with("final_draft__v2_.PDF"));
    }

    #[tokio::test]
    async fn signing_replaces_the_raw_object_url() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage.clone());

        let url = storage
            .upload("123-abc-essay.pdf", vec![1], "application/pdf")
            .await
            .unwrap();
        let job = svc.with_signed_url(sample_job(Some(url))).await;

        let signed = job.file_url.unwrap();
        assert!(signed.contains("expires="));
    }

    #[tokio::test]
    async fn signing_failure_nulls_the_file_but_returns_the_job() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage.clone());

        let url = storage
            .upload("123-abc-essay.pdf", vec![1], "application/pdf")
            .await
            .unwrap();
        storage.set_fail_sign(true);

        let job = svc.with_signed_url(sample_job(Some(url))).await;
        assert_eq!(job.file_url, None);
        // the rest of the record is intact, extension included
        assert_eq!(job.file_extension, Some("pdf".to_string()));
    }

    #[tokio::test]
    async fn jobs_without_files_pass_through_signing_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage);

        let job = svc.with_signed_url(sample_job(None)).await;
        assert_eq!(job.file_url, None);
    }

    #[tokio::test]
    async fn replacing_a_file_removes_the_previous_object() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage.clone());

        let old_url = storage
            .upload("111-aaaa-draft.pdf", vec![1], "application/pdf")
            .await
            .unwrap();
        let (new_url, _) = svc
            .store_file(FilePayload {
                file_name: "final.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: vec![2],
            })
            .await
            .unwrap();
        svc.remove_object_best_effort(&old_url).await;

        assert!(!storage.contains("111-aaaa-draft.pdf"));
        assert!(storage.contains(object_name(&new_url)));
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn best_effort_delete_tolerates_missing_objects() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(storage.clone());

        svc.remove_object_best_effort("memory://bucket/ghost.pdf")
            .await;
        assert_eq!(storage.object_count(), 0);
    }

    #[test]
    fn a_job_with_a_pending_submission_is_closed_for_uploads() {
        let mut job = sample_job(None);
        job.status = JobStatus::Late;
        assert!(job.open_for_submission());

        // a second upload must wait for the verdict on the first
        job.pending_submission_id = Some(Uuid::new_v4());
        assert!(!job.open_for_submission());

        job.status = JobStatus::PendingApproval;
        assert!(!job.open_for_submission());
    }

    #[test]
    fn status_writes_refuse_illegal_edges() {
        assert!(ensure_transition(JobStatus::Posted, JobStatus::Assigned).is_ok());
        assert!(ensure_transition(JobStatus::PendingApproval, JobStatus::Completed).is_ok());
        assert!(ensure_transition(JobStatus::Late, JobStatus::Completed).is_err());
        assert!(ensure_transition(JobStatus::Completed, JobStatus::Assigned).is_err());
    }

    #[test]
    fn file_names_are_sanitized_for_storage() {
        assert_eq!(
            sanitize_file_name("my essay (draft).pdf"),
            "my_essay__draft_.pdf".to_string()
        );
        assert_eq!(sanitize_file_name("a/b\\c?.pdf"), "a_b_c_.pdf".to_string());
    }
}
