//! Panorama rendering surface state.
//!
//! [`PanoSurface`] is the boundary between the simulation and whatever draws
//! the imagery: the engine writes the current node and view orientation here,
//! and a renderer reads them. Node changes raise a one-shot flag that the mode
//! machine drains to detect when the first panorama of a session is in.

use bevy::prelude::*;
use panograph::{Link, PanoramaNode};

use crate::{DriveSet, modes::GameModeState, vehicle::VehicleState};

/// Current panorama and view orientation.
#[derive(Resource, Debug, Default)]
pub struct PanoSurface {
    current: Option<PanoramaNode>,
    /// View heading, degrees in [0, 360).
    pub heading_deg: f32,
    /// View pitch, degrees.
    pub pitch_deg: f32,
    links_changed: bool,
}

impl PanoSurface {
    /// Replace the displayed panorama. Raises the links-changed flag.
    pub fn set_node(&mut self, node: PanoramaNode) {
        self.current = Some(node);
        self.links_changed = true;
    }

    /// Point the view.
    pub fn set_orientation(&mut self, heading_deg: f32, pitch_deg: f32) {
        self.heading_deg = heading_deg.rem_euclid(360.0);
        self.pitch_deg = pitch_deg;
    }

    /// The node currently on screen, if any.
    pub fn current(&self) -> Option<&PanoramaNode> {
        self.current.as_ref()
    }

    /// Links leaving the current node. Empty when nothing is loaded.
    pub fn links(&self) -> &[Link] {
        self.current.as_ref().map_or(&[], |node| &node.links)
    }

    /// Human-readable name for the current position: the node's own name,
    /// falling back to the first labelled link.
    pub fn location_name(&self) -> Option<&str> {
        let node = self.current.as_ref()?;
        node.location_name
            .as_deref()
            .or_else(|| node.links.iter().map(|l| l.label.as_str()).find(|l| !l.is_empty()))
    }

    /// Take the links-changed flag, clearing it. True at most once per
    /// [`set_node`](Self::set_node) call.
    pub fn take_links_changed(&mut self) -> bool {
        std::mem::take(&mut self.links_changed)
    }
}

/// Plugin publishing the vehicle's orientation to the surface each frame.
pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PanoSurface>()
            .add_systems(Update, publish_orientation.in_set(DriveSet::Publish));
    }
}

/// Keep the view aligned with the vehicle while driving. Parked and menu
/// modes leave the surface alone so free look stays possible.
fn publish_orientation(
    mode: Res<GameModeState>,
    vehicle: Res<VehicleState>,
    mut surface: ResMut<PanoSurface>,
) {
    if mode.is_driving() {
        surface.set_orientation(vehicle.heading_deg, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panograph::PanoId;

    fn node(id: &str, labels: &[&str]) -> PanoramaNode {
        PanoramaNode {
            id: PanoId::from(id),
            links: labels
                .iter()
                .map(|label| Link {
                    target: PanoId::from("x"),
                    heading: 0.0,
                    label: (*label).to_string(),
                })
                .collect(),
            heading: 0.0,
            pitch: 0.0,
            location_name: None,
        }
    }

    #[test]
    fn test_links_changed_is_single_shot() {
        let mut surface = PanoSurface::default();
        assert!(!surface.take_links_changed());

        surface.set_node(node("a", &[]));
        assert!(surface.take_links_changed());
        assert!(!surface.take_links_changed());
    }

    #[test]
    fn test_location_name_falls_back_to_link_label() {
        let mut surface = PanoSurface::default();
        assert_eq!(surface.location_name(), None);

        surface.set_node(node("a", &["", "Market St"]));
        assert_eq!(surface.location_name(), Some("Market St"));

        let mut named = node("b", &["Elsewhere"]);
        named.location_name = Some("Union Square".to_string());
        surface.set_node(named);
        assert_eq!(surface.location_name(), Some("Union Square"));
    }

    #[test]
    fn test_orientation_wraps() {
        let mut surface = PanoSurface::default();
        surface.set_orientation(-90.0, 5.0);
        assert_eq!(surface.heading_deg, 270.0);
        assert_eq!(surface.pitch_deg, 5.0);
    }
}
