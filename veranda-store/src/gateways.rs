//! Mock collaborator implementations: a payment gateway that records
//! charges, a notifier that records deliveries, a static property
//! directory, and a canned feed fetcher. Tests flip the failure
//! switches to exercise the error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use veranda_core::{FeedFetcher, Notifier, PaymentGateway, PropertyDirectory, PropertyInfo};

#[derive(Default)]
pub struct MockPaymentGateway {
    pub fail_payments: AtomicBool,
    charges: Mutex<Vec<(Uuid, i64)>>,
    refunds: Mutex<Vec<(Uuid, i64)>>,
    released_deposits: Mutex<Vec<Uuid>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn charges(&self) -> Vec<(Uuid, i64)> {
        self.charges.lock().await.clone()
    }

    pub async fn refunds(&self) -> Vec<(Uuid, i64)> {
        self.refunds.lock().await.clone()
    }

    pub async fn released_deposits(&self) -> Vec<Uuid> {
        self.released_deposits.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn process_payment(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        _currency: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_payments.load(Ordering::SeqCst) {
            return Err("Simulated payment gateway failure".into());
        }
        self.charges.lock().await.push((booking_id, amount_cents));
        Ok(format!("mock_pi_{}", booking_id.simple()))
    }

    async fn release_security_deposit(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        self.released_deposits.lock().await.push(booking_id);
        Ok(true)
    }

    async fn issue_refund(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_payments.load(Ordering::SeqCst) {
            return Err("Simulated payment gateway failure".into());
        }
        self.refunds.lock().await.push((booking_id, amount_cents));
        Ok(true)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: AtomicBool,
    events: Mutex<Vec<(Uuid, String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<(Uuid, String, String)> {
        self.events.lock().await.clone()
    }

    pub async fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(_, t, _)| t == event_type)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        booking_id: Uuid,
        event_type: &str,
        message: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("Simulated notification outage".into());
        }
        self.events
            .lock()
            .await
            .push((booking_id, event_type.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticPropertyDirectory {
    rows: RwLock<HashMap<Uuid, PropertyInfo>>,
}

impl StaticPropertyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, property: PropertyInfo) {
        self.rows.write().await.insert(property.id, property);
    }
}

#[async_trait]
impl PropertyDirectory for StaticPropertyDirectory {
    async fn get_property(
        &self,
        property_id: Uuid,
    ) -> Result<Option<PropertyInfo>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.read().await.get(&property_id).cloned())
    }
}

/// Serves canned feed bodies by url; unknown urls and the failure
/// switch behave like a dead remote server.
#[derive(Default)]
pub struct StaticFeedFetcher {
    pub fail: AtomicBool,
    feeds: RwLock<HashMap<String, String>>,
}

impl StaticFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_feed(&self, url: &str, body: &str) {
        self.feeds.write().await.insert(url.to_string(), body.to_string());
    }
}

#[async_trait]
impl FeedFetcher for StaticFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }
        self.feeds
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| format!("feed not found: {url}").into())
    }
}
