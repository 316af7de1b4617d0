//! In-memory stand-ins for the store, identity provider, mailer, and clock.

use async_trait::async_trait;
use lettre::message::Mailbox;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::db::DaoError;
use crate::email::{EmailError, EmailMessage, SendEmail};
use crate::identity::{
    IdentityDeletion, IdentityError, IdentityGateway, IdentityRecord, LinkedIdentity,
    NewIdentity, PASSWORD_PROVIDER,
};
use crate::lifecycle::{
    Clock, DeletionRequestStore, DeletionSettings, SweepSettings, DEFAULT_GRACE_PERIOD,
};
use crate::models::deletion_request::{DeletionRequest, NewDeletionRequest};

pub const TEST_SWEEP_SECRET: &str = "test-sweep-secret";
pub const TEST_RESTORATION_URL: &str = "https://roam.test/account/restore";

pub fn deletion_settings() -> DeletionSettings {
    DeletionSettings {
        grace_period: DEFAULT_GRACE_PERIOD,
        restoration_url: String::from(TEST_RESTORATION_URL),
        email_from_address: "Roam <no-reply@roam.test>".parse().unwrap(),
        email_reply_to_address: "Roam Support <support@roam.test>".parse().unwrap(),
    }
}

pub fn sweep_settings() -> SweepSettings {
    SweepSettings {
        trigger_secret: Zeroizing::new(String::from(TEST_SWEEP_SECRET)),
        max_concurrent_deletions: 4,
        claim_ttl: Duration::from_secs(15 * 60),
        item_timeout: Duration::from_secs(5),
    }
}

fn injected_failure() -> DaoError {
    DaoError::DbAsyncPoolFailure(String::from("Injected store failure"))
}

#[derive(Default)]
pub struct MemoryDeletionStore {
    requests: Mutex<Vec<DeletionRequest>>,
    profiles: Mutex<HashMap<Uuid, Option<SystemTime>>>,
    clear_deactivation_calls: Mutex<HashMap<Uuid, usize>>,
    accesses: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryDeletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, user_id: Uuid) {
        self.profiles.lock().unwrap().insert(user_id, None);
    }

    pub fn requests_for_user(&self, user_id: Uuid) -> Vec<DeletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn all_requests(&self) -> Vec<DeletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Inserts a request as-is, bypassing the open-request and profile checks.
    pub fn insert_request(&self, request: DeletionRequest) {
        self.requests.lock().unwrap().push(request);
    }

    /// Number of trait calls made against the store.
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    pub fn clear_deactivation_calls(&self, user_id: Uuid) -> usize {
        self.clear_deactivation_calls
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn record_access(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), DaoError> {
        self.record_access();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        Ok(())
    }

    fn check_writes(&self) -> Result<(), DaoError> {
        self.record_access();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        Ok(())
    }

    fn is_claimable(request: &DeletionRequest, stale_claim_before: SystemTime) -> bool {
        !request.is_restored
            && request
                .claimed_at
                .map_or(true, |claimed_at| claimed_at < stale_claim_before)
    }
}

#[async_trait]
impl DeletionRequestStore for MemoryDeletionStore {
    async fn create_request(&self, request: &NewDeletionRequest) -> Result<(), DaoError> {
        self.check_writes()?;

        let mut profiles = self.profiles.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();

        let Some(deactivated_at) = profiles.get_mut(&request.user_id) else {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        };

        if requests
            .iter()
            .any(|r| r.user_id == request.user_id && !r.is_restored)
        {
            return Err(DaoError::Conflict("User already has an open deletion request"));
        }

        *deactivated_at = Some(request.created_at);
        requests.push(request.clone().into());

        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        restoration_token_hash: &[u8],
    ) -> Result<Option<DeletionRequest>, DaoError> {
        self.check_reads()?;

        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.restoration_token_hash == restoration_token_hash)
            .cloned())
    }

    async fn find_open_request_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DeletionRequest>, DaoError> {
        self.check_reads()?;

        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && !r.is_restored)
            .cloned())
    }

    async fn restore_request(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        restored_at: SystemTime,
    ) -> Result<bool, DaoError> {
        self.check_writes()?;

        let mut profiles = self.profiles.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();

        let Some(request) = requests
            .iter_mut()
            .find(|r| r.id == request_id && !r.is_restored && r.claimed_at.is_none())
        else {
            return Ok(false);
        };

        request.is_restored = true;
        request.restored_at = Some(restored_at);

        if let Some(deactivated_at) = profiles.get_mut(&user_id) {
            *deactivated_at = None;
        }

        *self
            .clear_deactivation_calls
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert(0) += 1;

        Ok(true)
    }

    async fn find_overdue(
        &self,
        now: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<Vec<DeletionRequest>, DaoError> {
        self.check_reads()?;

        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_overdue(now) && Self::is_claimable(r, stale_claim_before))
            .cloned()
            .collect())
    }

    async fn claim(
        &self,
        request_id: Uuid,
        claimed_at: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<bool, DaoError> {
        self.check_writes()?;

        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.id == request_id && Self::is_claimable(r, stale_claim_before))
        {
            Some(request) => {
                request.claimed_at = Some(claimed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release_claim(&self, request_id: Uuid) -> Result<(), DaoError> {
        self.check_writes()?;

        if let Some(request) = self
            .requests
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.id == request_id)
        {
            request.claimed_at = None;
        }

        Ok(())
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<(), DaoError> {
        self.record_access();
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        self.requests.lock().unwrap().retain(|r| r.id != request_id);
        Ok(())
    }

    async fn delete_restored_before(&self, cutoff: SystemTime) -> Result<usize, DaoError> {
        self.record_access();
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut requests = self.requests.lock().unwrap();
        let count_before = requests.len();
        requests.retain(|r| !(r.is_restored && r.restored_at.is_some_and(|at| at < cutoff)));

        Ok(count_before - requests.len())
    }

    async fn profile_deactivated_at(&self, user_id: Uuid) -> Result<Option<SystemTime>, DaoError> {
        self.check_reads()?;

        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .ok_or(DaoError::QueryFailure(diesel::result::Error::NotFound))
    }
}

#[derive(Default)]
struct DeletionTracking {
    calls: HashMap<Uuid, usize>,
    failing: HashSet<Uuid>,
    delays: HashMap<Uuid, Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

#[derive(Default)]
pub struct MockIdentityGateway {
    users: Mutex<HashMap<Uuid, IdentityRecord>>,
    access_tokens: Mutex<HashMap<String, Uuid>>,
    deletions: Mutex<DeletionTracking>,
    get_calls: AtomicUsize,
    unlink_calls: AtomicUsize,
    fail_unlinks: AtomicBool,
}

impl MockIdentityGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_user(&self, email: &str, provider: &str) -> Uuid {
        let user_id = Uuid::now_v7();
        let record = IdentityRecord {
            user_id,
            email: email.to_string(),
            identities: vec![LinkedIdentity {
                identity_id: Uuid::now_v7().to_string(),
                provider: provider.to_string(),
            }],
        };

        self.users.lock().unwrap().insert(user_id, record);
        user_id
    }

    pub fn add_password_user(&self, email: &str) -> Uuid {
        self.add_user(email, PASSWORD_PROVIDER)
    }

    pub fn add_social_user(&self, email: &str, provider: &str) -> Uuid {
        self.add_user(email, provider)
    }

    pub fn link_provider(&self, user_id: Uuid, provider: &str) {
        if let Some(record) = self.users.lock().unwrap().get_mut(&user_id) {
            record.identities.push(LinkedIdentity {
                identity_id: Uuid::now_v7().to_string(),
                provider: provider.to_string(),
            });
        }
    }

    pub fn linked_providers(&self, user_id: Uuid) -> Vec<String> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|r| r.identities.iter().map(|i| i.provider.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_user(&self, user_id: Uuid) -> bool {
        self.users.lock().unwrap().contains_key(&user_id)
    }

    pub fn remove_user(&self, user_id: Uuid) {
        self.users.lock().unwrap().remove(&user_id);
    }

    pub fn add_access_token(&self, access_token: &str, user_id: Uuid) {
        self.access_tokens
            .lock()
            .unwrap()
            .insert(access_token.to_string(), user_id);
    }

    pub fn fail_deletion_of(&self, user_id: Uuid) {
        self.deletions.lock().unwrap().failing.insert(user_id);
    }

    pub fn allow_deletion_of(&self, user_id: Uuid) {
        self.deletions.lock().unwrap().failing.remove(&user_id);
    }

    pub fn delay_deletion_of(&self, user_id: Uuid, delay: Duration) {
        self.deletions.lock().unwrap().delays.insert(user_id, delay);
    }

    pub fn fail_unlinks(&self, fail: bool) {
        self.fail_unlinks.store(fail, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> usize {
        self.deletions.lock().unwrap().calls.values().sum()
    }

    pub fn delete_calls_for(&self, user_id: Uuid) -> usize {
        self.deletions
            .lock()
            .unwrap()
            .calls
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_concurrent_deletions(&self) -> usize {
        self.deletions.lock().unwrap().max_in_flight
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn unlink_calls(&self) -> usize {
        self.unlink_calls.load(Ordering::SeqCst)
    }
}

// Decrements the in-flight count even when a timeout drops the deletion future
struct InFlight<'a>(&'a Mutex<DeletionTracking>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut tracking) = self.0.lock() {
            tracking.in_flight -= 1;
        }
    }
}

#[async_trait]
impl IdentityGateway for MockIdentityGateway {
    async fn authenticate(&self, access_token: &str) -> Result<Uuid, IdentityError> {
        self.access_tokens
            .lock()
            .unwrap()
            .get(access_token)
            .copied()
            .ok_or(IdentityError::CredentialRejected)
    }

    async fn create_identity(&self, new_identity: &NewIdentity<'_>) -> Result<Uuid, IdentityError> {
        Ok(match new_identity.password {
            Some(_) => self.add_password_user(new_identity.email),
            None => {
                let user_id = self.add_password_user(new_identity.email);
                if let Some(record) = self.users.lock().unwrap().get_mut(&user_id) {
                    record.identities.clear();
                }
                user_id
            }
        })
    }

    async fn get_identity(&self, user_id: Uuid) -> Result<IdentityRecord, IdentityError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<IdentityDeletion, IdentityError> {
        let delay = {
            let mut tracking = self.deletions.lock().unwrap();
            *tracking.calls.entry(user_id).or_insert(0) += 1;

            if tracking.failing.contains(&user_id) {
                return Err(IdentityError::UnexpectedStatus(
                    500,
                    String::from("Injected deletion failure"),
                ));
            }

            tracking.in_flight += 1;
            tracking.max_in_flight = tracking.max_in_flight.max(tracking.in_flight);
            tracking.delays.get(&user_id).copied()
        };

        let _in_flight = InFlight(&self.deletions);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(match self.users.lock().unwrap().remove(&user_id) {
            Some(_) => IdentityDeletion::Deleted,
            None => IdentityDeletion::AlreadyGone,
        })
    }

    async fn unlink_identity(
        &self,
        user_id: Uuid,
        identity: &LinkedIdentity,
    ) -> Result<(), IdentityError> {
        self.unlink_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_unlinks.load(Ordering::SeqCst) {
            return Err(IdentityError::UnexpectedStatus(
                502,
                String::from("Injected unlink failure"),
            ));
        }

        let mut users = self.users.lock().unwrap();
        let record = users.get_mut(&user_id).ok_or(IdentityError::NotFound)?;
        record
            .identities
            .retain(|i| i.identity_id != identity.identity_id);

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub destination: String,
    pub subject: String,
    pub body: String,
    pub from: Mailbox,
    pub reply_to: Mailbox,
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentEmail>>,
    attempts: AtomicUsize,
    fail_sends: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Lets detached notification tasks on the current runtime finish before counting.
    pub async fn attempts_after_settling(&self) -> usize {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        self.attempts()
    }

    pub fn last_restoration_token(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .and_then(|m| Self::restoration_token_in(&m.body))
    }

    pub fn restoration_token_in(body: &str) -> Option<String> {
        let start = body.find("token=")? + "token=".len();
        let token = body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>();

        (!token.is_empty()).then_some(token)
    }
}

#[async_trait]
impl SendEmail for RecordingSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(EmailError::RelayConnectionFailed(String::from(
                "Injected send failure",
            )));
        }

        self.sent.lock().unwrap().push(SentEmail {
            destination: message.destination.to_string(),
            subject: message.subject.to_string(),
            body: message.body,
            from: message.from,
            reply_to: message.reply_to,
        });

        Ok(())
    }
}

pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(1_780_000_000))
    }

    pub fn starting_at(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}
