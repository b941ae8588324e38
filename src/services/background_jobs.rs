use chrono::{NaiveDate, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::db::models::Booking;
use crate::db::DbClient;
use crate::errors::ApiError;
use crate::services::booking_flow;
use crate::services::whatsapp::{self, WhatsAppClient};
use crate::Result;

const HEARTBEAT_KEY: &str = "background_job:last_execution";
const HEARTBEAT_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const MAX_CONCURRENT_SENDS: usize = 4;
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Background job manager for periodic tasks
#[derive(Clone)]
pub struct BackgroundJobManager {
    db_client: DbClient,
    whatsapp: WhatsAppClient,
    interval_seconds: u64,
}

impl BackgroundJobManager {
    pub fn new(db_client: DbClient, whatsapp: WhatsAppClient, interval_seconds: u64) -> Self {
        Self {
            db_client,
            whatsapp,
            interval_seconds,
        }
    }

    /// Get background job health status
    pub async fn get_health_status(&self) -> BackgroundJobHealth {
        match self.get_last_job_execution_time().await {
            Ok(Some(last_run)) => {
                let since = Utc::now().naive_utc() - last_run;
                classify(since.num_seconds(), self.interval_seconds, last_run)
            }
            Ok(None) => BackgroundJobHealth {
                status: JobState::Unknown,
                last_reminder_sweep: None,
                message: "The reminder sweep has not run yet".to_string(),
            },
            Err(_) => BackgroundJobHealth {
                status: JobState::Unknown,
                last_reminder_sweep: None,
                message: "Unable to determine when the reminder sweep last ran".to_string(),
            },
        }
    }

    async fn store_job_execution_time(&self, execution_time: NaiveDateTime) -> Result<()> {
        let timestamp = execution_time.format(TIMESTAMP_FORMAT).to_string();
        self.db_client
            .set_cache_ex(HEARTBEAT_KEY, &timestamp, HEARTBEAT_TTL_SECONDS)
            .await
    }

    async fn get_last_job_execution_time(&self) -> Result<Option<NaiveDateTime>> {
        let Some(raw) = self.db_client.get_cache(HEARTBEAT_KEY).await? else {
            return Ok(None);
        };
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(Some)
            .map_err(|e| ApiError::Custom(format!("Failed to parse timestamp: {e}")))
    }

    /// Start all background jobs
    pub async fn start_all_jobs(&self) {
        info!("Starting background job manager");

        let reminders = self.clone();
        tokio::spawn(async move {
            reminders.checkout_reminder_job().await;
        });

        let health = self.clone();
        tokio::spawn(async move {
            health.health_monitoring_job().await;
        });

        info!("All background jobs started successfully");
    }

    /// Periodically logs background job status
    async fn health_monitoring_job(&self) {
        let mut interval = time::interval(Duration::from_secs(1800));
        info!("Health monitoring job started with 30-minute intervals");

        loop {
            interval.tick().await;

            let health = self.get_health_status().await;
            match health.status {
                JobState::Active => info!("Background jobs health check: {}", health.message),
                JobState::Inactive => warn!(
                    "Background jobs health check INACTIVE: {}",
                    health.message
                ),
                JobState::Unknown => warn!(
                    "Background jobs health check UNKNOWN: {}",
                    health.message
                ),
            }
        }
    }

    /// Sends checkout-day reminders that have not gone out yet
    async fn checkout_reminder_job(&self) {
        let mut interval = time::interval(Duration::from_secs(self.interval_seconds));
        let mut consecutive_errors = 0u32;

        info!(
            "Checkout reminder job started with interval: {} seconds",
            self.interval_seconds
        );

        loop {
            interval.tick().await;

            let execution_time = Utc::now().naive_utc();
            if let Err(e) = self.store_job_execution_time(execution_time).await {
                warn!("Failed to store job execution time: {:?}", e);
            }

            match send_due_checkout_reminders(&self.db_client, &self.whatsapp, execution_time.date())
                .await
            {
                Ok(sent) => {
                    if sent > 0 {
                        info!("Checkout reminder sweep sent {} reminder(s)", sent);
                    }
                    consecutive_errors = 0;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    error!(
                        "Checkout reminder sweep failed (attempt {}/{}): {:?}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );

                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!(
                            "Too many consecutive failures ({}), pausing the reminder sweep",
                            consecutive_errors
                        );
                        time::sleep(Duration::from_secs(300)).await;
                        consecutive_errors = 0;
                    }
                }
            }
        }
    }
}

fn classify(seconds_since: i64, interval_seconds: u64, last_run: NaiveDateTime) -> BackgroundJobHealth {
    let expected = interval_seconds as i64;
    if seconds_since > expected * 2 {
        BackgroundJobHealth {
            status: JobState::Inactive,
            last_reminder_sweep: Some(last_run),
            message: format!(
                "Last reminder sweep was {seconds_since} seconds ago, expected interval is {expected} seconds"
            ),
        }
    } else {
        BackgroundJobHealth {
            status: JobState::Active,
            last_reminder_sweep: Some(last_run),
            message: "Background jobs are running normally".to_string(),
        }
    }
}

/// Claims the reminder on the booking row, then sends it. A reminder that
/// was already claimed is reported as a conflict and never sent twice. A
/// failed send gives the claim back so the next sweep retries it.
pub async fn send_checkout_reminder(
    db_client: &DbClient,
    whatsapp: &WhatsAppClient,
    booking: &Booking,
    today: NaiveDate,
) -> Result<bool> {
    booking_flow::check_checkout_reminder(booking, today)?;

    if !db_client.mark_checkout_reminder_sent(booking.id).await? {
        return Err(ApiError::Conflict(
            "Checkout reminder was already sent for this booking".to_string(),
        ));
    }

    let sent = whatsapp
        .send_text(&booking.guest_phone, &whatsapp::checkout_reminder(booking))
        .await;
    if sent.is_err() {
        if let Err(e) = db_client.release_checkout_reminder(booking.id).await {
            error!(
                "Failed to release checkout reminder for booking {}: {}",
                booking.id, e
            );
        }
    }
    sent
}

/// Returns how many reminders the relay accepted; messages only logged
/// because no relay is configured are not counted
pub async fn send_due_checkout_reminders(
    db_client: &DbClient,
    whatsapp: &WhatsAppClient,
    today: NaiveDate,
) -> Result<usize> {
    let due = db_client.due_checkout_reminders(today).await?;
    if due.is_empty() {
        return Ok(0);
    }
    info!("Found {} booking(s) due a checkout reminder", due.len());

    let sent = stream::iter(due)
        .map(|booking| async move {
            match send_checkout_reminder(db_client, whatsapp, &booking, today).await {
                Ok(sent) => sent,
                Err(e) => {
                    warn!("Checkout reminder for booking {} failed: {}", booking.id, e);
                    false
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_SENDS)
        .fold(0usize, |total, sent| async move { total + usize::from(sent) })
        .await;

    Ok(sent)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum JobState {
    Active,
    Inactive,
    #[serde(rename = "unknown")]
    Unknown,
}

/// Background job health status
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackgroundJobHealth {
    pub status: JobState,
    pub last_reminder_sweep: Option<NaiveDateTime>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_classify_by_interval() {
        let last = Utc::now().naive_utc();
        assert_eq!(classify(100, 900, last).status, JobState::Active);
        assert_eq!(classify(1800, 900, last).status, JobState::Active);
        assert_eq!(classify(1801, 900, last).status, JobState::Inactive);
    }

    #[tokio::test]
    async fn test_health_is_unknown_without_redis() {
        let config = Config::for_tests();
        let db = DbClient::new(&config.database_url, &config.redis_url).unwrap();
        let whatsapp = WhatsAppClient::from_config(&config).unwrap();
        let manager = BackgroundJobManager::new(db, whatsapp, 900);

        let health = manager.get_health_status().await;
        assert_eq!(health.status, JobState::Unknown);
        assert!(health.last_reminder_sweep.is_none());
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL with migrations applied"]
    async fn test_failed_checkout_reminder_is_released() {
        use crate::db::models::PlaceBooking;
        use crate::schema::room_types;
        use diesel::ExpressionMethods;
        use diesel_async::RunQueryDsl;

        dotenv::dotenv().ok();
        let db_url = std::env::var("TEST_DATABASE_URL").unwrap();
        let db = DbClient::new(&db_url, "redis://127.0.0.1:1").unwrap();

        let mut config = Config::for_tests();
        config.whatsapp_api_url = Some("http://127.0.0.1:1".to_string());
        config.whatsapp_phone_number_id = Some("1000".to_string());
        config.whatsapp_token = Some("token".to_string());
        let whatsapp = WhatsAppClient::from_config(&config).unwrap();
        assert!(whatsapp.is_configured());

        let name = format!("Twin-{}", uuid::Uuid::new_v4());
        {
            let conn = &mut db.get_db_conn().await.unwrap();
            diesel::insert_into(room_types::table)
                .values((
                    room_types::type_name.eq(name.as_str()),
                    room_types::price.eq(800.0),
                    room_types::total_rooms.eq(2),
                ))
                .execute(conn)
                .await
                .unwrap();
        }

        let today = Utc::now().date_naive();
        let stay = PlaceBooking {
            guest_name: "Reminder Guest".to_string(),
            guest_phone: "9000000003".to_string(),
            room_type: name,
            check_in_date: today - chrono::Duration::days(1),
            check_in_time: "14:00".to_string(),
            check_out_date: today,
            check_out_time: "11:00".to_string(),
            guest_count: 1,
            notes: None,
        };
        let booking = db.create_booking(stay.clone()).await.unwrap();
        let swept = db.create_booking(stay).await.unwrap();

        assert!(send_checkout_reminder(&db, &whatsapp, &booking, today)
            .await
            .is_err());
        let stored = db.get_booking(booking.id).await.unwrap();
        assert!(!stored.checkout_reminder_sent);

        // Nothing configured: the message is only logged and the claim stays
        let offline = WhatsAppClient::from_config(&Config::for_tests()).unwrap();
        assert!(!send_checkout_reminder(&db, &offline, &stored, today)
            .await
            .unwrap());
        assert!(db.get_booking(booking.id).await.unwrap().checkout_reminder_sent);

        // Logged-only messages are not counted as sent
        assert_eq!(
            send_due_checkout_reminders(&db, &offline, today).await.unwrap(),
            0
        );
        assert!(db.get_booking(swept.id).await.unwrap().checkout_reminder_sent);
    }
}
