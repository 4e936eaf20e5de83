//! Persistence backend used while no identity is present.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use shared::PersistenceMode;

use super::local_repository::LocalStateRepository;
use crate::domain::models::AppData;
use crate::domain::state::Mutation;
use crate::storage::traits::{Attachment, CommitOutcome, EventSink, PersistenceBackend, Subscription};

/// Applies mutations in memory and writes the full state to local storage
#[derive(Clone)]
pub struct LocalBackend {
    repository: LocalStateRepository,
}

impl LocalBackend {
    pub fn new(repository: LocalStateRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl PersistenceBackend for LocalBackend {
    fn mode(&self) -> PersistenceMode {
        PersistenceMode::Local
    }

    async fn attach(&self, _sink: EventSink) -> Result<Attachment> {
        let data = self.repository.load_data()?;
        Ok(Attachment {
            initial: Some(data),
            subscription: Subscription::none(),
        })
    }

    async fn commit(&self, mutation: &Mutation, current: &AppData) -> Result<CommitOutcome> {
        let mut next = current.clone();
        mutation.apply_to(&mut next);
        next.settings.last_local_save = Some(Utc::now());

        self.repository.save_data(&next)?;
        debug!("💾 Local commit '{}' persisted", mutation.label());

        Ok(CommitOutcome::Applied(next))
    }
}
