//! In-memory routing backend
//!
//! Used for local development and tests where no routing account is available.
//! Destinations live in process memory and every operation is counted, so tests can
//! assert on exactly which remote calls a workflow made.

use super::{Destination, RoutingApi, RoutingError, RoutingResult};
use crate::signature::SigningSecret;
use base64::{Engine, engine::general_purpose::STANDARD};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const CREATE_DESTINATION: &str = "create_destination";
pub const LIST_DESTINATIONS: &str = "list_destinations";
pub const SET_TRANSFORMATION: &str = "set_transformation";
pub const GET_SECRET: &str = "get_secret";
pub const DISABLE_DESTINATION: &str = "disable_destination";
pub const DELETE_DESTINATION: &str = "delete_destination";
pub const GET_DESTINATION: &str = "get_destination";

#[derive(Debug, Clone)]
struct StoredDestination {
    source_id: String,
    destination: Destination,
    transformation: Option<String>,
    secret: SigningSecret,
}

#[derive(Default)]
struct State {
    destinations: Vec<StoredDestination>,
    next_id: u64,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
}

/// In-memory routing backend implementation
#[derive(Clone, Default)]
pub struct InMemoryRoutingApi {
    state: Arc<RwLock<State>>,
}

impl InMemoryRoutingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.state.read().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.read().calls.values().sum()
    }

    /// Make every subsequent call of `operation` fail with a 500 response
    pub fn fail_operation(&self, operation: &'static str) {
        self.state.write().failing.insert(operation);
    }

    pub fn transformation(&self, destination_id: &str) -> Option<String> {
        self.state
            .read()
            .destinations
            .iter()
            .find(|d| d.destination.id == destination_id)
            .and_then(|d| d.transformation.clone())
    }

    /// Every stored destination of a source, in creation order
    pub fn destinations(&self, source_id: &str) -> Vec<Destination> {
        self.state
            .read()
            .destinations
            .iter()
            .filter(|d| d.source_id == source_id)
            .map(|d| d.destination.clone())
            .collect()
    }

    fn record(&self, operation: &'static str) -> RoutingResult<()> {
        let mut state = self.state.write();
        *state.calls.entry(operation).or_insert(0) += 1;

        if state.failing.contains(operation) {
            return Err(RoutingError::Response {
                status: 500,
                message: format!("{} failed", operation),
            });
        }

        Ok(())
    }

    fn with_destination<T>(
        &self,
        source_id: &str,
        destination_id: &str,
        f: impl FnOnce(&mut StoredDestination) -> T,
    ) -> Option<T> {
        let mut state = self.state.write();
        state
            .destinations
            .iter_mut()
            .find(|d| d.source_id == source_id && d.destination.id == destination_id)
            .map(f)
    }
}

#[async_trait::async_trait]
impl RoutingApi for InMemoryRoutingApi {
    async fn create_destination(
        &self,
        source_id: &str,
        url: &str,
        description: &str,
    ) -> RoutingResult<Destination> {
        self.record(CREATE_DESTINATION)?;

        let mut state = self.state.write();
        state.next_id += 1;
        let id = format!("ep_{}", state.next_id);

        let destination = Destination {
            id: id.clone(),
            url: url.to_string(),
            description: description.to_string(),
            disabled: false,
            created_at: Some(chrono::Utc::now()),
        };

        state.destinations.push(StoredDestination {
            source_id: source_id.to_string(),
            destination: destination.clone(),
            transformation: None,
            secret: SigningSecret::new(format!(
                "whsec_{}",
                STANDARD.encode(format!("memory-secret-{}", id))
            )),
        });

        Ok(destination)
    }

    async fn list_destinations(&self, source_id: &str) -> RoutingResult<Vec<Destination>> {
        self.record(LIST_DESTINATIONS)?;
        Ok(self.destinations(source_id))
    }

    async fn set_transformation(
        &self,
        source_id: &str,
        destination_id: &str,
        script: &str,
    ) -> RoutingResult<()> {
        self.record(SET_TRANSFORMATION)?;
        self.with_destination(source_id, destination_id, |d| {
            d.transformation = Some(script.to_string());
        })
        .ok_or_else(|| RoutingError::NotFound(destination_id.to_string()))
    }

    async fn get_secret(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<SigningSecret> {
        self.record(GET_SECRET)?;
        self.with_destination(source_id, destination_id, |d| d.secret.clone())
            .ok_or_else(|| RoutingError::NotFound(destination_id.to_string()))
    }

    async fn disable_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool> {
        self.record(DISABLE_DESTINATION)?;
        Ok(self
            .with_destination(source_id, destination_id, |d| {
                d.destination.disabled = true;
            })
            .is_some())
    }

    async fn delete_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<bool> {
        self.record(DELETE_DESTINATION)?;

        let mut state = self.state.write();
        let before = state.destinations.len();
        state
            .destinations
            .retain(|d| !(d.source_id == source_id && d.destination.id == destination_id));
        Ok(state.destinations.len() < before)
    }

    async fn get_destination(
        &self,
        source_id: &str,
        destination_id: &str,
    ) -> RoutingResult<Option<Destination>> {
        self.record(GET_DESTINATION)?;
        Ok(self.with_destination(source_id, destination_id, |d| d.destination.clone()))
    }
}
