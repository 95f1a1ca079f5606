// db/jobdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

#[async_trait]
pub trait JobExt {
    async fn save_job(
        &self,
        client_id: Uuid,
        description: String,
        client_bid_amount: f64,
        writer_share: f64,
        expected_return_date: DateTime<Utc>,
        urgency: Urgency,
        subject: Option<String>,
        quantity: Option<f64>,
        spacing: Spacing,
        level: AcademicLevel,
        language: Language,
        citation_style: CitationStyle,
        number_of_sources: Option<i32>,
        file: Option<(String, Option<String>)>,
    ) -> Result<Job, sqlx::Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error>;

    async fn get_job_for_client(
        &self,
        job_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Job>, sqlx::Error>;

    /// Anti double-submit guard: most recent job by the same client with
    /// the identical description, created after `since`.
    async fn find_recent_duplicate(
        &self,
        client_id: Uuid,
        description: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Job>, sqlx::Error>;

    async fn update_job_fields(
        &self,
        job_id: Uuid,
        description: Option<String>,
        expected_return_date: Option<DateTime<Utc>>,
        file: Option<(String, Option<String>)>,
    ) -> Result<Job, sqlx::Error>;

    async fn update_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<Job, sqlx::Error>;

    async fn set_job_terms(
        &self,
        job_id: Uuid,
        admin_bid_amount: f64,
        expected_return_date: DateTime<Utc>,
    ) -> Result<Job, sqlx::Error>;

    async fn get_client_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, sqlx::Error>;

    async fn get_client_completed_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, sqlx::Error>;

    /// Posted jobs still waiting for the admin to set a reference amount.
    async fn get_unpriced_jobs(&self) -> Result<Vec<Job>, sqlx::Error>;

    /// Priced posted jobs that have at least one pending bid.
    async fn get_jobs_with_pending_bids(&self) -> Result<Vec<Job>, sqlx::Error>;

    /// Priced posted jobs the given writer has not bid on yet.
    async fn get_available_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error>;

    async fn get_writer_active_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error>;

    async fn get_writer_completed_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error>;

    async fn save_bid(
        &self,
        job_id: Uuid,
        writer_id: Uuid,
        amount: f64,
    ) -> Result<Bid, sqlx::Error>;

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, sqlx::Error>;

    async fn get_bid_for_writer(
        &self,
        job_id: Uuid,
        writer_id: Uuid,
    ) -> Result<Option<Bid>, sqlx::Error>;

    async fn get_job_bids(&self, job_id: Uuid) -> Result<Vec<BidWithWriter>, sqlx::Error>;

    async fn get_pending_submissions(&self) -> Result<Vec<SubmissionWithContext>, sqlx::Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn save_job(
        &self,
        client_id: Uuid,
        description: String,
        client_bid_amount: f64,
        writer_share: f64,
        expected_return_date: DateTime<Utc>,
        urgency: Urgency,
        subject: Option<String>,
        quantity: Option<f64>,
        spacing: Spacing,
        level: AcademicLevel,
        language: Language,
        citation_style: CitationStyle,
        number_of_sources: Option<i32>,
        file: Option<(String, Option<String>)>,
    ) -> Result<Job, sqlx::Error> {
        let (file_url, file_extension) = match file {
            Some((url, ext)) => (Some(url), ext),
            None => (None, None),
        };

        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (
                client_id, description, client_bid_amount, writer_share,
                expected_return_date, urgency, subject, quantity, spacing,
                level, language, citation_style, number_of_sources,
                file_url, file_extension
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(description)
        .bind(client_bid_amount)
        .bind(writer_share)
        .bind(expected_return_date)
        .bind(urgency)
        .bind(subject)
        .bind(quantity)
        .bind(spacing)
        .bind(level)
        .bind(language)
        .bind(citation_style)
        .bind(number_of_sources)
        .bind(file_url)
        .bind(file_extension)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_job_for_client(
        &self,
        job_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 AND client_id = $2")
            .bind(job_id)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_recent_duplicate(
        &self,
        client_id: Uuid,
        description: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE client_id = $1 AND description = $2 AND created_at >= $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(description)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_job_fields(
        &self,
        job_id: Uuid,
        description: Option<String>,
        expected_return_date: Option<DateTime<Utc>>,
        file: Option<(String, Option<String>)>,
    ) -> Result<Job, sqlx::Error> {
        let has_file = file.is_some();
        let (file_url, file_extension) = match file {
            Some((url, ext)) => (Some(url), ext),
            None => (None, None),
        };

        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                description = COALESCE($2, description),
                expected_return_date = COALESCE($3, expected_return_date),
                file_url = CASE WHEN $4 THEN $5 ELSE file_url END,
                file_extension = CASE WHEN $4 THEN $6 ELSE file_extension END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(description)
        .bind(expected_return_date)
        .bind(has_file)
        .bind(file_url)
        .bind(file_extension)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_job_terms(
        &self,
        job_id: Uuid,
        admin_bid_amount: f64,
        expected_return_date: DateTime<Utc>,
    ) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET admin_bid_amount = $2, expected_return_date = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(admin_bid_amount)
        .bind(expected_return_date)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_client_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE client_id = $1 AND status <> 'cancelled'::job_status
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_client_completed_jobs(&self, client_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE client_id = $1 AND status = 'completed'::job_status
            ORDER BY updated_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_unpriced_jobs(&self) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'posted'::job_status AND admin_bid_amount IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_jobs_with_pending_bids(&self) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            WHERE j.status = 'posted'::job_status
              AND j.admin_bid_amount IS NOT NULL
              AND EXISTS (
                  SELECT 1 FROM bids b
                  WHERE b.job_id = j.id AND b.status = 'pending'::bid_status
              )
            ORDER BY j.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_available_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            WHERE j.status = 'posted'::job_status
              AND j.admin_bid_amount IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM bids b
                  WHERE b.job_id = j.id AND b.writer_id = $1
              )
            ORDER BY j.created_at DESC
            "#,
        )
        .bind(writer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_writer_active_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            JOIN bids b ON b.job_id = j.id
            WHERE b.writer_id = $1
              AND b.status = 'accepted'::bid_status
              AND j.status IN ('assigned'::job_status, 'due'::job_status, 'late'::job_status)
            ORDER BY j.expected_return_date ASC NULLS LAST
            "#,
        )
        .bind(writer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_writer_completed_jobs(&self, writer_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            JOIN bids b ON b.job_id = j.id
            WHERE b.writer_id = $1
              AND b.status = 'accepted'::bid_status
              AND j.status = 'completed'::job_status
            ORDER BY j.updated_at DESC
            "#,
        )
        .bind(writer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn save_bid(
        &self,
        job_id: Uuid,
        writer_id: Uuid,
        amount: f64,
    ) -> Result<Bid, sqlx::Error> {
        sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids (job_id, writer_id, amount)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(writer_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, sqlx::Error> {
        sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1")
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_bid_for_writer(
        &self,
        job_id: Uuid,
        writer_id: Uuid,
    ) -> Result<Option<Bid>, sqlx::Error> {
        sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE job_id = $1 AND writer_id = $2")
            .bind(job_id)
            .bind(writer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_job_bids(&self, job_id: Uuid) -> Result<Vec<BidWithWriter>, sqlx::Error> {
        sqlx::query_as::<_, BidWithWriter>(
            r#"
            SELECT b.id, b.job_id, b.writer_id, b.amount, b.status,
                   u.name AS writer_name, u.email AS writer_email,
                   b.created_at, b.updated_at
            FROM bids b
            JOIN users u ON u.id = b.writer_id
            WHERE b.job_id = $1
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_pending_submissions(&self) -> Result<Vec<SubmissionWithContext>, sqlx::Error> {
        sqlx::query_as::<_, SubmissionWithContext>(
            r#"
            SELECT s.id, s.job_id, s.writer_id, s.file_url, s.file_extension,
                   s.status, s.feedback, j.description AS job_description,
                   u.name AS writer_name, u.email AS writer_email, s.submitted_at
            FROM submissions s
            JOIN jobs j ON j.id = s.job_id
            JOIN users u ON u.id = s.writer_id
            WHERE s.status = 'pending'::submission_status
            ORDER BY s.submitted_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
