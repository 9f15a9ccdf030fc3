//! Initial panorama loading.
//!
//! Owns the shared graph client and the channel plumbing for the first fetch
//! of a session: pick a destination, resolve the nearest panorama, and hand
//! it to the surface. A watchdog turns a stalled request into a user-visible
//! error after ten seconds.

use std::sync::Arc;

use bevy::prelude::*;
use panograph::{Client, FetchOptions, MemoryCache, NodeSelector};
use web_time::{Duration, Instant};

use crate::{
    async_runtime::TaskSpawner,
    launch_params::LaunchParams,
    locations::GameLocation,
    modes::GameModeState,
    profile::ProfileStore,
    surface::PanoSurface,
    traversal::TraversalState,
};

/// How long a load may run before it is declared dead.
const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared handle to the panorama metadata client.
#[derive(Resource, Clone)]
pub struct GraphClient(pub Arc<Client<MemoryCache>>);

impl GraphClient {
    fn build(params: &LaunchParams, profile: &ProfileStore) -> Self {
        let mut client = Client::with_cache(MemoryCache::new());
        if let Some(base_url) = &params.base_url {
            client = client.with_base_url(base_url.clone());
        }
        let key = params
            .api_key
            .clone()
            .or_else(|| profile.profile.api_key.clone());
        if let Some(key) = key {
            client = client.with_api_key(key);
        }
        Self(Arc::new(client))
    }

    /// Swap in a client carrying a new API key, keeping any base URL
    /// override. The cache starts empty: old entries may have been fetched
    /// under a different key.
    pub fn rebuild_with_key(&mut self, params: &LaunchParams, key: Option<String>) {
        let mut client = Client::with_cache(MemoryCache::new());
        if let Some(base_url) = &params.base_url {
            client = client.with_base_url(base_url.clone());
        }
        if let Some(key) = key {
            client = client.with_api_key(key);
        }
        self.0 = Arc::new(client);
    }
}

type LoadResult = panograph::Result<panograph::PanoramaNode>;

/// In-flight state of the initial load.
///
/// Each request carries a generation number; only the result of the latest
/// generation is accepted at drain time, so abandoning one destination and
/// picking another can never start the drive at the abandoned one.
#[derive(Resource)]
pub struct InitialLoad {
    tx: async_channel::Sender<(u64, LoadResult)>,
    rx: async_channel::Receiver<(u64, LoadResult)>,
    generation: u64,
    /// Destination picked in the menu, shown on the loading screen.
    pub destination: Option<GameLocation>,
    /// When the current request started. None when idle.
    started: Option<Instant>,
    /// Last failure, shown until the next attempt.
    pub error: Option<String>,
}

impl Default for InitialLoad {
    fn default() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self {
            tx,
            rx,
            generation: 0,
            destination: None,
            started: None,
            error: None,
        }
    }
}

impl InitialLoad {
    /// Kick off a fetch for `location`. Any request already in flight is
    /// superseded: its result fails the generation check when it arrives.
    pub fn begin(
        &mut self,
        location: GameLocation,
        client: &GraphClient,
        spawner: &TaskSpawner,
    ) {
        let generation = self.next_generation();
        let selector = NodeSelector::coordinate(location.lat, location.lon);
        self.destination = Some(location);
        self.started = Some(Instant::now());
        self.error = None;

        let client = Arc::clone(&client.0);
        let tx = self.tx.clone();
        spawner.spawn(async move {
            let result = client.fetch_node(&selector, &FetchOptions::default()).await;
            // Receiver dropped means the app is shutting down.
            let _ = tx.send((generation, result)).await;
        });
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

/// Plugin wiring the client and the initial-load systems.
pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InitialLoad>()
            .add_systems(Startup, insert_client)
            .add_systems(Update, (poll_initial_load, watch_load_timeout));
    }
}

fn insert_client(mut commands: Commands, params: Res<LaunchParams>, profile: Res<ProfileStore>) {
    commands.insert_resource(GraphClient::build(&params, &profile));
}

/// Drain the load channel. Success hands the node to the surface (the mode
/// machine promotes to driving from there); failure records a message for
/// the loading screen.
fn poll_initial_load(
    mut load: ResMut<InitialLoad>,
    mode: Res<GameModeState>,
    mut surface: ResMut<PanoSurface>,
    mut traversal: ResMut<TraversalState>,
) {
    let Ok((generation, result)) = load.rx.try_recv() else {
        return;
    };
    // A superseded request's late result is dropped on the floor.
    if !load.is_current(generation) {
        tracing::debug!("Discarding result from a superseded load request");
        return;
    }
    load.started = None;

    // Same for a cancelled load.
    if !mode.is_loading() {
        return;
    }

    match result {
        Ok(node) => {
            tracing::info!(pano = %node.id, "Initial panorama resolved");
            // Progress and preloads from a previous drive are meaningless
            // against the new graph position.
            traversal.reset();
            surface.set_node(node);
        }
        Err(err) => {
            let message = match err.service_status() {
                Some(status) => status.user_message().to_string(),
                None => format!("Network error: {err}"),
            };
            tracing::warn!("Initial load failed: {message}");
            load.error = Some(message);
        }
    }
}

/// Turn a request that outlives [`LOAD_TIMEOUT`] into an error. The eventual
/// late result is discarded by the mode check in the poll system once the
/// user cancels, or overwrites the error if it does arrive while still
/// loading.
fn watch_load_timeout(mut load: ResMut<InitialLoad>, mode: Res<GameModeState>) {
    if !mode.is_loading() {
        return;
    }
    if let Some(started) = load.started
        && started.elapsed() >= LOAD_TIMEOUT
    {
        load.started = None;
        load.error = Some("Connection timed out. Check your network and try again.".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panograph::{PanoId, PanoramaNode};

    fn node(id: &str) -> PanoramaNode {
        PanoramaNode {
            id: PanoId::from(id),
            links: Vec::new(),
            heading: 0.0,
            pitch: 0.0,
            location_name: None,
        }
    }

    #[test]
    fn test_superseded_request_is_not_current() {
        let mut load = InitialLoad::default();
        let first = load.next_generation();
        assert!(load.is_current(first));

        // Starting a second request invalidates the first one's result.
        let second = load.next_generation();
        assert!(!load.is_current(first));
        assert!(load.is_current(second));
    }

    #[test]
    fn test_only_latest_result_survives_the_drain() {
        let mut load = InitialLoad::default();
        let stale = load.next_generation();
        let current = load.next_generation();

        // Results arrive in request order; the stale one is recognizable.
        load.tx.try_send((stale, Ok(node("shibuya")))).unwrap();
        let (generation, _) = load.rx.try_recv().unwrap();
        assert!(!load.is_current(generation));

        load.tx.try_send((current, Ok(node("monaco")))).unwrap();
        let (generation, result) = load.rx.try_recv().unwrap();
        assert!(load.is_current(generation));
        assert_eq!(result.unwrap().id, PanoId::from("monaco"));
    }
}
