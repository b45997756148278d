use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    model::{
        absence::{Absence, AbsenceStatus, Decision},
        analytics::{AnalyticsSnapshot, SnapshotKey},
        settings::CompanySettings,
        user::User,
    },
    store::{
        AbsenceFilter, AbsenceStore, ListOrder, SettingsStore, SnapshotStore, StoreResult,
        UserFilter, UserStore, VacationDebit,
    },
};

#[derive(Default)]
struct State {
    absences: Vec<Absence>,
    users: HashMap<String, User>,
    settings: Option<CompanySettings>,
    snapshots: HashMap<SnapshotKey, AnalyticsSnapshot>,
}

/// Mutex-guarded store for service tests. Counts absence range queries so
/// tests can tell cached reads from recomputation.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    absence_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.put_user(user);
        }
        store
    }

    pub fn put_user(&self, user: User) {
        self.state.lock().unwrap().users.insert(user.id.clone(), user);
    }

    pub fn put_absence(&self, absence: Absence) {
        self.state.lock().unwrap().absences.push(absence);
    }

    pub fn user(&self, id: &str) -> User {
        self.state.lock().unwrap().users[id].clone()
    }

    pub fn absence(&self, id: &str) -> Absence {
        let state = self.state.lock().unwrap();
        state
            .absences
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .unwrap()
    }

    pub fn absence_queries(&self) -> usize {
        self.absence_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AbsenceStore for MemoryStore {
    async fn insert_absence(&self, absence: &Absence) -> StoreResult<()> {
        self.put_absence(absence.clone());
        Ok(())
    }

    async fn find_absence(&self, id: &str) -> StoreResult<Option<Absence>> {
        let state = self.state.lock().unwrap();
        Ok(state.absences.iter().find(|a| a.id == id).cloned())
    }

    async fn list_absences(&self, filter: &AbsenceFilter) -> StoreResult<Vec<Absence>> {
        self.absence_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let mut found: Vec<Absence> = state
            .absences
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        match filter.order {
            ListOrder::NewestFirst => found.sort_by(|a, b| {
                b.start_date
                    .cmp(&a.start_date)
                    .then(b.created_at.cmp(&a.created_at))
            }),
            ListOrder::OldestFirst => found.sort_by(|a, b| {
                a.start_date
                    .cmp(&b.start_date)
                    .then(a.created_at.cmp(&b.created_at))
            }),
        }
        if let Some(limit) = filter.limit {
            found.truncate(limit as usize);
        }
        Ok(found)
    }

    async fn update_pending(&self, absence: &Absence) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .absences
            .iter_mut()
            .find(|a| a.id == absence.id && a.status == AbsenceStatus::Pending)
        {
            Some(slot) => {
                // same columns as the SQL update
                slot.kind = absence.kind;
                slot.start_date = absence.start_date;
                slot.end_date = absence.end_date;
                slot.is_half_day = absence.is_half_day;
                slot.half_day_period = absence.half_day_period;
                slot.total_days = absence.total_days;
                slot.reason = absence.reason.clone();
                slot.substitute = absence.substitute.clone();
                slot.auto_reply = absence.auto_reply.clone();
                slot.conflict_warning = absence.conflict_warning;
                slot.updated_at = absence.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn decide(
        &self,
        id: &str,
        status: AbsenceStatus,
        decision: &Decision,
        debit: Option<&VacationDebit>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(absence) = state
            .absences
            .iter_mut()
            .find(|a| a.id == id && a.status == AbsenceStatus::Pending)
        else {
            return Ok(false);
        };
        absence.status = status;
        absence.decision = Some(decision.clone());
        absence.updated_at = decision.decided_at;

        if let Some(debit) = debit {
            if let Some(user) = state.users.get_mut(&debit.user_id) {
                user.vacation.debit(debit.days);
            }
        }
        Ok(true)
    }

    async fn cancel(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .absences
            .iter_mut()
            .find(|a| a.id == id && a.status.is_active())
        {
            Some(absence) => {
                absence.status = AbsenceStatus::Cancelled;
                absence.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.state.lock().unwrap().users.get(id).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn departments(&self) -> StoreResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut departments: Vec<String> = state
            .users
            .values()
            .filter(|u| u.is_active)
            .filter_map(|u| u.department.clone())
            .filter(|d| !d.is_empty())
            .collect();
        departments.sort();
        departments.dedup();
        Ok(departments)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self) -> StoreResult<Option<CompanySettings>> {
        Ok(self.state.lock().unwrap().settings.clone())
    }

    async fn save_settings(&self, settings: &CompanySettings) -> StoreResult<()> {
        self.state.lock().unwrap().settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn find_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<AnalyticsSnapshot>> {
        Ok(self.state.lock().unwrap().snapshots.get(key).cloned())
    }

    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .insert(snapshot.key(), snapshot.clone());
        Ok(())
    }
}
