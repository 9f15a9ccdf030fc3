//! Graph traversal and predictive prefetch.
//!
//! Tracks how far the vehicle has moved toward the next panorama, picks which
//! outgoing link it is heading for, speculatively fetches that neighbor at the
//! halfway point, and commits the transition at the node boundary. The
//! decision logic is a pure state machine returning [`TraversalAction`]s; the
//! systems below only execute them.

use bevy::prelude::*;
use panograph::{FetchOptions, Link, NodeSelector, PanoId, PanoramaNode};

use crate::{
    DriveSet,
    async_runtime::TaskSpawner,
    loader::GraphClient,
    modes::GameModeState,
    profile::ProfileStore,
    surface::PanoSurface,
    vehicle::{MAX_FRAME_DT, VehicleState},
};

/// Assumed spacing between adjacent panoramas, meters. An approximation: the
/// graph does not expose true edge lengths.
pub const NODE_DISTANCE_M: f32 = 20.0;
/// At or below this speed the vehicle never accrues progress, km/h.
pub const TRAVERSAL_MIN_SPEED_KMH: f32 = 5.0;
/// A link is reachable only within this cone either side of the vehicle's
/// heading, degrees.
pub const FORWARD_CONE_DEG: f32 = 60.0;
/// Progress fraction at which the speculative fetch fires.
const PREFETCH_PROGRESS: f32 = 0.5;
/// Fraction of the remaining angular error corrected per transition.
const HEADING_SNAP_FACTOR: f32 = 0.1;

/// What the systems must do after a traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalAction {
    /// Speculatively fetch this node.
    StartPrefetch(PanoId),
    /// Cross into the node behind `link`. `preloaded` carries the prefetched
    /// node when its id matched at commit time; otherwise a fresh fetch is
    /// needed.
    Commit {
        link: Link,
        preloaded: Option<PanoramaNode>,
    },
    /// Report driven distance, kilometers.
    RecordDistance(f32),
}

/// Progress toward the next node and the speculative-fetch bookkeeping.
#[derive(Resource, Debug, Default)]
pub struct TraversalState {
    /// Fraction of [`NODE_DISTANCE_M`] covered since entering the current
    /// node, in [0, 1].
    pub progress: f32,
    /// Result of a completed prefetch, awaiting the identity check at commit.
    pub preloaded: Option<PanoramaNode>,
    /// A prefetch request is outstanding.
    pub prefetch_in_flight: bool,
}

impl TraversalState {
    /// Forget everything from the previous node. Used when a new session
    /// starts or the surface is replaced wholesale.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.preloaded = None;
    }

    /// Advance by one frame. Pure apart from mutating `self`.
    ///
    /// No-ops on out-of-range `dt`, below the minimum traverse speed, or on a
    /// node with no links.
    pub fn step(
        &mut self,
        speed_kmh: f32,
        heading_deg: f32,
        dt: f32,
        links: &[Link],
    ) -> Vec<TraversalAction> {
        let mut actions = Vec::new();
        if dt <= 0.0 || dt > MAX_FRAME_DT {
            return actions;
        }
        if speed_kmh <= TRAVERSAL_MIN_SPEED_KMH || links.is_empty() {
            return actions;
        }

        let meters_moved = speed_kmh / 3.6 * dt;
        self.progress += meters_moved / NODE_DISTANCE_M;

        // Halfway point: start fetching the node we appear to be heading for.
        if self.progress > PREFETCH_PROGRESS
            && self.progress < 1.0
            && !self.prefetch_in_flight
            && let Some(link) = find_best_link(heading_deg, links)
        {
            let already_held = self
                .preloaded
                .as_ref()
                .is_some_and(|node| node.id == link.target);
            if !already_held {
                self.prefetch_in_flight = true;
                actions.push(TraversalAction::StartPrefetch(link.target.clone()));
            }
        }

        // Node boundary: re-select against the current heading, which may
        // have drifted since the prefetch was issued.
        if self.progress >= 1.0 {
            match find_best_link(heading_deg, links) {
                Some(link) => {
                    let preloaded = match self.preloaded.take() {
                        Some(node) if node.id == link.target => Some(node),
                        // Stale or absent: discarded, the executor fetches.
                        _ => None,
                    };
                    self.progress = 0.0;
                    actions.push(TraversalAction::Commit {
                        link: link.clone(),
                        preloaded,
                    });
                    actions.push(TraversalAction::RecordDistance(NODE_DISTANCE_M / 1000.0));
                }
                // Dead end. Progress stays pinned until the heading changes.
                None => self.progress = 1.0,
            }
        }
        actions
    }
}

/// Absolute angular difference, wrapped to [0, 180].
pub fn angle_diff(a_deg: f32, b_deg: f32) -> f32 {
    let diff = (a_deg - b_deg).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// The link whose heading is nearest the vehicle's, restricted to the
/// forward cone. Deterministic for a given heading and link order.
pub fn find_best_link<'a>(heading_deg: f32, links: &'a [Link]) -> Option<&'a Link> {
    links
        .iter()
        .filter(|link| angle_diff(heading_deg, link.heading) < FORWARD_CONE_DEG)
        .min_by(|a, b| {
            angle_diff(heading_deg, a.heading).total_cmp(&angle_diff(heading_deg, b.heading))
        })
}

/// Move `current_deg` a tenth of the way toward `target_deg`, wrapped. A
/// hard jump to the edge's canonical heading is visually jarring; drift is
/// instead corrected a little on every transition.
pub fn snap_heading(current_deg: f32, target_deg: f32) -> f32 {
    let delta = {
        let raw = (target_deg - current_deg).rem_euclid(360.0);
        if raw > 180.0 { raw - 360.0 } else { raw }
    };
    (current_deg + delta * HEADING_SNAP_FACTOR).rem_euclid(360.0)
}

type FetchResult = panograph::Result<PanoramaNode>;

/// Channel pair for speculative fetch results.
#[derive(Resource)]
struct PrefetchChannel {
    tx: async_channel::Sender<FetchResult>,
    rx: async_channel::Receiver<FetchResult>,
}

/// Channel pair for commit-time fetches, plus the id the commit is waiting
/// on so late or mismatched results can be dropped.
#[derive(Resource)]
struct CommitChannel {
    tx: async_channel::Sender<FetchResult>,
    rx: async_channel::Receiver<FetchResult>,
    pending: Option<PanoId>,
}

fn channel_pair() -> (
    async_channel::Sender<FetchResult>,
    async_channel::Receiver<FetchResult>,
) {
    async_channel::bounded(1)
}

impl Default for PrefetchChannel {
    fn default() -> Self {
        let (tx, rx) = channel_pair();
        Self { tx, rx }
    }
}

impl Default for CommitChannel {
    fn default() -> Self {
        let (tx, rx) = channel_pair();
        Self {
            tx,
            rx,
            pending: None,
        }
    }
}

/// Plugin running traversal after physics each frame.
pub struct TraversalPlugin;

impl Plugin for TraversalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TraversalState>()
            .init_resource::<PrefetchChannel>()
            .init_resource::<CommitChannel>()
            .add_systems(
                Update,
                (poll_prefetch, poll_commit, run_traversal)
                    .chain()
                    .in_set(DriveSet::Traversal),
            );
    }
}

fn spawn_fetch(
    spawner: &TaskSpawner,
    client: &GraphClient,
    id: PanoId,
    tx: async_channel::Sender<FetchResult>,
) {
    let client = std::sync::Arc::clone(&client.0);
    spawner.spawn(async move {
        let result = client
            .fetch_node(&NodeSelector::Id(id), &FetchOptions::default())
            .await;
        let _ = tx.send(result).await;
    });
}

/// Run the decision step and execute its actions.
#[allow(clippy::too_many_arguments)]
fn run_traversal(
    time: Res<Time>,
    mode: Res<GameModeState>,
    client: Option<Res<GraphClient>>,
    spawner: TaskSpawner,
    mut traversal: ResMut<TraversalState>,
    mut vehicle: ResMut<VehicleState>,
    mut surface: ResMut<PanoSurface>,
    mut commit: ResMut<CommitChannel>,
    prefetch: Res<PrefetchChannel>,
    mut profile: ResMut<ProfileStore>,
) {
    if !mode.is_driving() {
        return;
    }
    let Some(client) = client else {
        return;
    };

    let links = surface.links().to_vec();
    let actions = traversal.step(
        vehicle.speed_kmh,
        vehicle.heading_deg,
        time.delta_secs(),
        &links,
    );

    for action in actions {
        match action {
            TraversalAction::StartPrefetch(id) => {
                tracing::debug!(pano = %id, "Prefetching next panorama");
                spawn_fetch(&spawner, &client, id, prefetch.tx.clone());
            }
            TraversalAction::Commit { link, preloaded } => {
                vehicle.heading_deg = snap_heading(vehicle.heading_deg, link.heading);
                match preloaded {
                    Some(node) => {
                        tracing::debug!(pano = %node.id, "Transition served from prefetch");
                        commit.pending = None;
                        surface.set_node(node);
                    }
                    None => {
                        tracing::debug!(pano = %link.target, "Transition needs a fetch");
                        commit.pending = Some(link.target.clone());
                        spawn_fetch(&spawner, &client, link.target, commit.tx.clone());
                    }
                }
            }
            TraversalAction::RecordDistance(km) => {
                profile.record_distance(f64::from(km));
                // Occasional reload picks up edits made outside the session.
                if rand::random::<f32>() > 0.95 {
                    profile.reload();
                }
            }
        }
    }
}

/// Store a finished prefetch for the commit-time identity check. Failures
/// just clear the guard; the commit falls back to a fresh fetch.
fn poll_prefetch(prefetch: Res<PrefetchChannel>, mut traversal: ResMut<TraversalState>) {
    let Ok(result) = prefetch.rx.try_recv() else {
        return;
    };
    traversal.prefetch_in_flight = false;
    match result {
        Ok(node) => traversal.preloaded = Some(node),
        Err(err) => {
            tracing::debug!("Prefetch failed, will fetch at the boundary: {err}");
            traversal.preloaded = None;
        }
    }
}

/// Apply the result of a commit-time fetch to the surface.
fn poll_commit(mut commit: ResMut<CommitChannel>, mut surface: ResMut<PanoSurface>) {
    let Ok(result) = commit.rx.try_recv() else {
        return;
    };
    match result {
        Ok(node) => {
            // A newer transition may have superseded this one.
            if commit.pending.as_ref() == Some(&node.id) {
                commit.pending = None;
                surface.set_node(node);
            }
        }
        Err(err) => {
            tracing::warn!("Transition fetch failed: {err}");
            commit.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(target: &str, heading: f32) -> Link {
        Link {
            target: PanoId::from(target),
            heading,
            label: String::new(),
        }
    }

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
    fn test_angle_diff_wraps() {
        assert_eq!(angle_diff(350.0, 10.0), 20.0);
        assert_eq!(angle_diff(10.0, 350.0), 20.0);
        assert_eq!(angle_diff(0.0, 180.0), 180.0);
        assert_eq!(angle_diff(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_best_link_respects_forward_cone() {
        let links = [link("B", 10.0), link("C", 170.0)];

        let best = find_best_link(0.0, &links).unwrap();
        assert_eq!(best.target, PanoId::from("B"));

        let best = find_best_link(180.0, &links).unwrap();
        assert_eq!(best.target, PanoId::from("C"));

        // Sideways: nothing within 60 degrees.
        assert!(find_best_link(90.0, &links).is_none());
    }

    #[test]
    fn test_best_link_is_deterministic() {
        let links = [link("B", 30.0), link("C", 330.0)];
        let first = find_best_link(0.0, &links).unwrap().target.clone();
        for _ in 0..100 {
            assert_eq!(find_best_link(0.0, &links).unwrap().target, first);
        }
    }

    #[test]
    fn test_commit_after_twenty_meters() {
        let mut state = TraversalState::default();
        let links = [link("B", 10.0), link("C", 170.0)];

        // 36 km/h is 10 m/s; 20 m takes 2 s. Tick at 10 Hz with one spare
        // tick for float accumulation error.
        let mut committed = None;
        for _ in 0..21 {
            for action in state.step(36.0, 0.0, 0.1, &links) {
                if let TraversalAction::Commit { link, .. } = action {
                    committed = Some(link.target);
                }
            }
            if committed.is_some() {
                break;
            }
        }
        assert_eq!(committed, Some(PanoId::from("B")));
        assert_eq!(state.progress, 0.0);
    }

    #[test]
    fn test_prefetch_fires_once_past_halfway() {
        let mut state = TraversalState::default();
        let links = [link("B", 0.0)];

        let mut prefetches = 0;
        for _ in 0..12 {
            for action in state.step(36.0, 0.0, 0.1, &links) {
                if matches!(action, TraversalAction::StartPrefetch(_)) {
                    prefetches += 1;
                }
            }
        }
        // Past 0.5 but the in-flight guard holds it to one request.
        assert!(state.progress > 0.5 && state.progress < 1.0);
        assert_eq!(prefetches, 1);
    }

    #[test]
    fn test_stale_preload_is_discarded() {
        let mut state = TraversalState {
            progress: 0.99,
            preloaded: Some(node("WRONG")),
            prefetch_in_flight: false,
        };
        let links = [link("B", 0.0)];
        let actions = state.step(36.0, 0.0, 0.1, &links);
        let commit = actions
            .iter()
            .find_map(|a| match a {
                TraversalAction::Commit { link, preloaded } => Some((link, preloaded)),
                _ => None,
            })
            .unwrap();
        assert_eq!(commit.0.target, PanoId::from("B"));
        assert!(commit.1.is_none());
        assert!(state.preloaded.is_none());
    }

    #[test]
    fn test_matching_preload_is_consumed() {
        let mut state = TraversalState {
            progress: 0.99,
            preloaded: Some(node("B")),
            prefetch_in_flight: false,
        };
        let links = [link("B", 0.0)];
        let actions = state.step(36.0, 0.0, 0.1, &links);
        let preloaded = actions
            .iter()
            .find_map(|a| match a {
                TraversalAction::Commit { preloaded, .. } => Some(preloaded.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(preloaded.unwrap().id, PanoId::from("B"));
    }

    #[test]
    fn test_dead_end_pins_progress() {
        let mut state = TraversalState {
            progress: 0.99,
            ..Default::default()
        };
        // Only link is behind the vehicle.
        let links = [link("B", 180.0)];
        for _ in 0..10 {
            let actions = state.step(36.0, 0.0, 0.1, &links);
            assert!(actions.is_empty());
        }
        assert_eq!(state.progress, 1.0);
    }

    #[test]
    fn test_slow_vehicle_never_traverses() {
        let mut state = TraversalState::default();
        let links = [link("B", 0.0)];
        // The threshold itself does not count as moving.
        for speed in [4.9, TRAVERSAL_MIN_SPEED_KMH] {
            for _ in 0..1000 {
                assert!(state.step(speed, 0.0, 0.1, &links).is_empty());
            }
        }
        assert_eq!(state.progress, 0.0);
    }

    #[test]
    fn test_oversized_frame_is_no_op() {
        let mut state = TraversalState {
            progress: 0.7,
            ..Default::default()
        };
        let links = [link("B", 0.0)];
        assert!(state.step(36.0, 0.0, 0.8, &links).is_empty());
        assert!(state.step(36.0, 0.0, 0.0, &links).is_empty());
        assert_eq!(state.progress, 0.7);
    }

    #[test]
    fn test_distance_recorded_per_transition() {
        let mut state = TraversalState {
            progress: 0.99,
            ..Default::default()
        };
        let links = [link("B", 0.0)];
        let actions = state.step(36.0, 0.0, 0.1, &links);
        assert!(
            actions
                .iter()
                .any(|a| *a == TraversalAction::RecordDistance(0.02))
        );
    }

    #[test]
    fn test_snap_heading_moves_a_tenth_across_zero() {
        // From 350 toward 10: shortest path is +20, a tenth is +2.
        let snapped = snap_heading(350.0, 10.0);
        assert!((snapped - 352.0).abs() < 1e-4);

        // From 10 toward 350: shortest path is -20.
        let snapped = snap_heading(10.0, 350.0);
        assert!((snapped - 8.0).abs() < 1e-4);
    }
}
