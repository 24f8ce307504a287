#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use lead_crm::{
    AccessGate, GateError, GateState, RoleCache,
    auth::{Claims, SessionResolver},
    directory::UserDirectory,
    error::DirectoryError,
    models::{DirectoryRecord, Role, Session},
    repository::Repository,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_AUDIENCE: &str = "authenticated";
pub const TEST_TIMEOUT: Duration = Duration::from_millis(200);

// --- Builders ---

pub fn record(email: &str, role: Option<&str>, is_approved: bool) -> DirectoryRecord {
    let now = Utc::now();
    DirectoryRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: None,
        role: role.map(str::to_string),
        is_approved,
        created_at: now,
        updated_at: now,
    }
}

pub fn session(email: &str) -> Session {
    Session {
        user_id: Some(Uuid::new_v4()),
        email: Some(email.to_string()),
    }
}

pub fn mint_token(email: Option<&str>, exp_offset: i64, audience: &str, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: Uuid::new_v4(),
        email: email.map(str::to_string),
        aud: audience.to_string(),
        exp: (now + exp_offset) as usize,
        iat: Some(now as usize),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

// --- Mock Session Resolver ---

/// Returns a canned session, or fails when `fail` is set.
#[derive(Default)]
pub struct MockSessions {
    pub session: Option<Session>,
    pub fail: bool,
}

impl MockSessions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(session: Session) -> Self {
        Self {
            session: Some(session),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            session: None,
            fail: true,
        }
    }
}

#[async_trait]
impl SessionResolver for MockSessions {
    async fn resolve(&self, _headers: &HeaderMap) -> Result<Option<Session>, GateError> {
        if self.fail {
            return Err(GateError::Session("identity provider unavailable".to_string()));
        }
        Ok(self.session.clone())
    }
}

// --- Mock Directory ---

/// Canned directory answer that counts how often it was asked.
pub struct MockDirectory {
    pub records: Vec<DirectoryRecord>,
    pub error_status: Option<u16>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl MockDirectory {
    pub fn returning(records: Vec<DirectoryRecord>) -> Self {
        Self {
            records,
            error_status: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            error_status: Some(status),
            ..Self::returning(vec![])
        }
    }

    pub fn slow(records: Vec<DirectoryRecord>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(records)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn find_by_email(&self, _email: &str) -> Result<Vec<DirectoryRecord>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.error_status {
            Some(status) => Err(DirectoryError::Status(status)),
            None => Ok(self.records.clone()),
        }
    }
}

/// Gate over mock collaborators, with the cache turned off.
pub fn gate(sessions: MockSessions, directory: Arc<MockDirectory>) -> GateState {
    gate_with_cache(sessions, directory, Arc::new(RoleCache::disabled()))
}

pub fn gate_with_cache(
    sessions: MockSessions,
    directory: Arc<MockDirectory>,
    cache: Arc<RoleCache>,
) -> GateState {
    Arc::new(AccessGate::new(
        Arc::new(sessions),
        directory,
        cache,
        TEST_TIMEOUT,
    ))
}

// --- Mock Repository ---

/// In-memory `Repository`. `fail` makes every call return a database error.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<Vec<DirectoryRecord>>,
    pub fail: bool,
}

impl MockRepo {
    pub fn with_users(users: Vec<DirectoryRecord>) -> Self {
        Self {
            users: Mutex::new(users),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            users: Mutex::new(vec![]),
            fail: true,
        }
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.fail {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        Ok(self.users.lock().await.clone())
    }

    async fn list_pending_users(&self) -> Result<Vec<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        let users = self.users.lock().await;
        Ok(users.iter().filter(|u| !u.is_approved).cloned().collect())
    }

    async fn set_user_approval(
        &self,
        id: Uuid,
        is_approved: bool,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.is_approved = is_approved;
            u.clone()
        }))
    }

    async fn set_user_role(
        &self,
        id: Uuid,
        role: Option<Role>,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role.map(|r| r.as_str().to_string());
            u.clone()
        }))
    }
}
