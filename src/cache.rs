//! In-process TTL cache keyed by a closed set of typed keys.
//!
//! Every key belongs to one [`CacheDomain`]; writers drop a whole domain
//! through [`TypedCache::invalidate`] instead of forgetting keys one by one.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use crate::config::CacheConfig;
use crate::constants::{TTL_DYNAMIC_SECS, TTL_FREQUENT_SECS, TTL_HEAVY_SECS, TTL_STATIC_SECS};

/// How long a class of data stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Academic structure and subjects
    Static,
    /// Profiles, preferences, course trees
    Dynamic,
    /// Daily sessions, notification counters, dashboard
    Frequent,
    /// Expensive aggregates
    Heavy,
}

impl TtlClass {
    pub fn ttl(self) -> Duration {
        Duration::seconds(match self {
            Self::Static => TTL_STATIC_SECS,
            Self::Dynamic => TTL_DYNAMIC_SECS,
            Self::Frequent => TTL_FREQUENT_SECS,
            Self::Heavy => TTL_HEAVY_SECS,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    AcademicStructure,
    AllSubjects,
    Subject(u64),
    SubjectContents(u64),
    Content(u64),
    UserProfile(u64),
    UserPreferences(u64),
    UserSessionsToday(u64),
    UserUnreadNotifications(u64),
    UserStats(u64),
    UserBacPerformance(u64),
    CourseFull(u64),
    CourseModules(u64),
    CourseStats(u64),
    DashboardStats,
}

impl CacheKey {
    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Self::AcademicStructure | Self::AllSubjects | Self::Subject(_) => TtlClass::Static,
            Self::SubjectContents(_)
            | Self::Content(_)
            | Self::UserProfile(_)
            | Self::UserPreferences(_)
            | Self::CourseFull(_)
            | Self::CourseModules(_) => TtlClass::Dynamic,
            Self::UserSessionsToday(_) | Self::UserUnreadNotifications(_) | Self::DashboardStats => {
                TtlClass::Frequent
            }
            Self::UserStats(_) | Self::UserBacPerformance(_) | Self::CourseStats(_) => TtlClass::Heavy,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcademicStructure => f.write_str("academic.structure"),
            Self::AllSubjects => f.write_str("subjects.all"),
            Self::Subject(id) => write!(f, "subject.{id}"),
            Self::SubjectContents(id) => write!(f, "subject.{id}.contents"),
            Self::Content(id) => write!(f, "content.{id}"),
            Self::UserProfile(id) => write!(f, "user.{id}.profile"),
            Self::UserPreferences(id) => write!(f, "user.{id}.preferences"),
            Self::UserSessionsToday(id) => write!(f, "user.{id}.sessions.today"),
            Self::UserUnreadNotifications(id) => write!(f, "user.{id}.notifications.unread"),
            Self::UserStats(id) => write!(f, "user.{id}.stats"),
            Self::UserBacPerformance(id) => write!(f, "user.{id}.bac_performance"),
            Self::CourseFull(id) => write!(f, "course.{id}.full"),
            Self::CourseModules(id) => write!(f, "course.{id}.modules"),
            Self::CourseStats(id) => write!(f, "course.{id}.stats"),
            Self::DashboardStats => f.write_str("dashboard.stats"),
        }
    }
}

/// Unit of invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    User(u64),
    /// A subject, its contents and the subject list
    Subject(u64),
    Content {
        content_id: u64,
        subject_id: Option<u64>,
    },
    Course(u64),
    AcademicStructure,
    Dashboard,
}

impl CacheDomain {
    pub fn covers(&self, key: &CacheKey) -> bool {
        match (*self, *key) {
            (
                Self::User(user),
                CacheKey::UserProfile(id)
                | CacheKey::UserPreferences(id)
                | CacheKey::UserSessionsToday(id)
                | CacheKey::UserUnreadNotifications(id)
                | CacheKey::UserStats(id)
                | CacheKey::UserBacPerformance(id),
            ) => user == id,
            (Self::Subject(subject), CacheKey::Subject(id) | CacheKey::SubjectContents(id)) => subject == id,
            (Self::Subject(_), CacheKey::AllSubjects) => true,
            (Self::Content { content_id, .. }, CacheKey::Content(id)) => content_id == id,
            (Self::Content { subject_id, .. }, CacheKey::SubjectContents(id)) => subject_id == Some(id),
            (Self::Course(course), CacheKey::CourseFull(id) | CacheKey::CourseModules(id) | CacheKey::CourseStats(id)) => {
                course == id
            }
            (Self::AcademicStructure, CacheKey::AcademicStructure) => true,
            (Self::Dashboard, CacheKey::DashboardStats) => true,
            _ => false,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// LRU-bounded cache with per-key TTLs. Time is always passed in.
pub struct TypedCache<V> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    enabled: bool,
}

impl<V: Clone> TypedCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            enabled: true,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(config.capacity);
        cache.enabled = config.enabled;
        cache
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries.get(key).map(|entry| (entry.expires_at > now, entry.value.clone()));
        match fresh {
            Some((true, value)) => {
                tracing::debug!(key = %key, "cache hit");
                Some(value)
            }
            Some((false, _)) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, value: V, now: DateTime<Utc>) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            let expires_at = now + key.ttl_class().ttl();
            entries.put(key, CacheEntry { value, expires_at });
        }
    }

    /// Returns the cached value or stores the result of `load`. Load errors
    /// are passed through and nothing is cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: CacheKey, now: DateTime<Utc>, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key, now) {
            return Ok(value);
        }
        let value = load()?;
        self.insert(key, value.clone(), now);
        Ok(value)
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.pop(key).is_some())
            .unwrap_or(false)
    }

    /// Drops every key of `domain`; returns how many entries went away.
    pub fn invalidate(&self, domain: CacheDomain) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let doomed: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| domain.covers(key))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        if !doomed.is_empty() {
            tracing::debug!(?domain, removed = doomed.len(), "cache domain invalidated");
        }
        doomed.len()
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
