//! Merchant catalog operations.
use anyhow::Result;
use log::info;

use crate::domain::errors::{DomainError, FieldErrors};
use crate::domain::models::Merchant;
use crate::domain::state::{Mutation, StateManager};

#[derive(Clone)]
pub struct MerchantService {
    state: StateManager,
}

impl MerchantService {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    /// Explicitly add a merchant. An existing (name, location) pair is rejected.
    pub async fn add_merchant(&self, name: &str, location: Option<&str>) -> Result<Merchant> {
        let mut errors = FieldErrors::new();
        if name.trim().is_empty() {
            errors.push("name", "is required");
        }
        errors.into_result()?;

        let merchant = Merchant::new(name, location);
        let candidate = merchant.clone();
        self.state
            .commit_with(move |current| match current.find_merchant(name, location) {
                Some(existing) => Err(DomainError::DuplicateMerchant {
                    name: existing.name.clone(),
                    location: existing.location.clone(),
                }
                .into()),
                None => Ok(Some(Mutation::EnsureMerchant(candidate))),
            })
            .await?;
        info!("🏪 Added merchant '{}' ({})", merchant.name, merchant.id);
        Ok(merchant)
    }

    /// Make sure a merchant exists for this pair. Returns true when one was created.
    ///
    /// The lookup and the insert happen under the session lock, so concurrent
    /// purchases for a new merchant create it once.
    pub async fn ensure_merchant(&self, name: &str, location: Option<&str>) -> Result<bool> {
        let created = self
            .state
            .commit_with(|current| {
                Ok(match current.find_merchant(name, location) {
                    Some(_) => None,
                    None => Some(Mutation::EnsureMerchant(Merchant::new(name, location))),
                })
            })
            .await?;
        if created {
            info!("🏪 Registered new merchant '{}' from a purchase", name.trim());
        }
        Ok(created)
    }

    /// Merchants ordered by name
    pub fn list_merchants(&self) -> Vec<Merchant> {
        self.state.data().merchants_by_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notifications::NotificationCenter;
    use crate::storage::cloud::InMemoryDocumentStore;
    use crate::storage::test_utils::TestEnvironment;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(env: &TestEnvironment) -> MerchantService {
        let state = StateManager::new(
            env.repository(),
            Arc::new(InMemoryDocumentStore::new()),
            NotificationCenter::new(),
            Duration::from_secs(2),
        );
        state.start_local().await.unwrap();
        MerchantService::new(state)
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected_other_location_accepted() {
        let env = TestEnvironment::new().unwrap();
        let service = setup(&env).await;

        service.add_merchant("La Farola", Some("Centro")).await.unwrap();
        let err = service.add_merchant("la farola ", Some("centro")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::DuplicateMerchant { .. })
        ));

        service.add_merchant("La Farola", Some("Norte")).await.unwrap();
        assert_eq!(service.list_merchants().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_name_is_validation_error() {
        let env = TestEnvironment::new().unwrap();
        let service = setup(&env).await;
        let err = service.add_merchant("   ", None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_merchant_creates_once() {
        let env = TestEnvironment::new().unwrap();
        let service = setup(&env).await;
        assert!(service.ensure_merchant("Pizza Uno", None).await.unwrap());
        assert!(!service.ensure_merchant("PIZZA UNO", Some("")).await.unwrap());
        assert_eq!(service.list_merchants().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_creates_single_merchant() {
        let env = TestEnvironment::new().unwrap();
        let service = setup(&env).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.ensure_merchant("Café Norte", Some("Puerto")).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(service.list_merchants().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_rejects_all_but_one() {
        let env = TestEnvironment::new().unwrap();
        let service = setup(&env).await;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.add_merchant("Sushi Bar", None).await })
            })
            .collect();

        let mut added = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => added += 1,
                Err(e) => assert!(matches!(
                    e.downcast_ref::<DomainError>(),
                    Some(DomainError::DuplicateMerchant { .. })
                )),
            }
        }

        assert_eq!(added, 1);
        assert_eq!(service.list_merchants().len(), 1);
    }
}
