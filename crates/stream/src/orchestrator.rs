use std::time::Instant;

use glam::DVec3;
use tilestream_assets::{BuildingModels, FloorTextures, GLTF_LOAD, TEXTURE_LOAD};
use tilestream_bus::{BusError, EventBus, Subscription};
use tilestream_common::{GridKey, TileId, neighbor_position};
use tilestream_render::Renderer;
use tilestream_tile::{FlexRowWrap, LayoutSolver, SimplexField, Tile, TileError};

use crate::config::{ConfigError, StreamConfig};
use crate::events::{DISPOSE_REQUEST, DisposeRequest, EDGE_VIEW, EdgeView};
use crate::grid::LiveTiles;
use crate::stats::StreamStats;
use crate::watch::TileWatchers;

/// Errors surfaced by the streamer.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Signals driving the builder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderEvent {
    LoadAssets,
    LoadAssetsComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderPhase {
    Inactive,
    Loading,
    Active,
}

/// Resources held only while active. Dropping it ends both subscriptions.
#[derive(Debug)]
pub struct ActiveState {
    edge_views: Subscription<EdgeView>,
    disposals: Subscription<DisposeRequest>,
    textures: FloorTextures,
    models: BuildingModels,
}

#[derive(Debug)]
pub enum BuilderState {
    Inactive,
    Loading,
    Active(ActiveState),
}

impl BuilderState {
    pub fn phase(&self) -> BuilderPhase {
        match self {
            Self::Inactive => BuilderPhase::Inactive,
            Self::Loading => BuilderPhase::Loading,
            Self::Active(_) => BuilderPhase::Active,
        }
    }
}

/// Turns the first payload on each asset topic into builder signals.
///
/// Each first payload yields `LoadAssets`; once both have arrived a single
/// `LoadAssetsComplete` follows. Later payloads are never read.
#[derive(Debug)]
pub struct AssetGate {
    texture_feed: Option<Subscription<FloorTextures>>,
    model_feed: Option<Subscription<BuildingModels>>,
    textures: Option<FloorTextures>,
    models: Option<BuildingModels>,
    completed: bool,
}

impl AssetGate {
    pub fn new(bus: &mut EventBus) -> Result<Self, BusError> {
        Ok(Self {
            texture_feed: Some(bus.subscribe(TEXTURE_LOAD)?),
            model_feed: Some(bus.subscribe(GLTF_LOAD)?),
            textures: None,
            models: None,
            completed: false,
        })
    }

    /// Signals for payloads delivered since the last poll.
    pub fn poll(&mut self) -> Vec<BuilderEvent> {
        let mut signals = Vec::new();
        if let Some(textures) = self.texture_feed.as_ref().and_then(Subscription::try_next) {
            self.textures = Some(textures);
            self.texture_feed = None;
            signals.push(BuilderEvent::LoadAssets);
        }
        if let Some(models) = self.model_feed.as_ref().and_then(Subscription::try_next) {
            self.models = Some(models);
            self.model_feed = None;
            signals.push(BuilderEvent::LoadAssets);
        }
        if !self.completed && self.textures.is_some() && self.models.is_some() {
            self.completed = true;
            signals.push(BuilderEvent::LoadAssetsComplete);
        }
        signals
    }

    pub fn assets(&self) -> Option<(&FloorTextures, &BuildingModels)> {
        Some((self.textures.as_ref()?, self.models.as_ref()?))
    }
}

/// A live tile and the handles that keep it reacting to the camera.
#[derive(Debug)]
pub struct StreamedTile {
    tile: Tile,
    watchers: TileWatchers,
}

impl StreamedTile {
    pub fn tile(&self) -> &Tile {
        &self.tile
    }
}

/// Owns the live tiles and applies spawn and disposal events.
///
/// # Invariants
/// - At most one live tile per lattice cell.
/// - The live set is mutated only here, inside [`TileStreamer::update`].
/// - Every spawn is attached to the renderer; every removal is detached.
pub struct TileStreamer<R> {
    config: StreamConfig,
    noise: SimplexField,
    layout: Box<dyn LayoutSolver>,
    renderer: R,
    state: BuilderState,
    gate: AssetGate,
    tiles: LiveTiles<StreamedTile>,
    stats: StreamStats,
}

impl<R: Renderer> TileStreamer<R> {
    pub fn new(config: StreamConfig, renderer: R, bus: &mut EventBus) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            noise: SimplexField::new(config.seed),
            layout: Box::new(FlexRowWrap),
            config,
            renderer,
            state: BuilderState::Inactive,
            gate: AssetGate::new(bus)?,
            tiles: LiveTiles::new(),
            stats: StreamStats::default(),
        })
    }

    /// Replace the default [`FlexRowWrap`] solver used for new tiles.
    pub fn with_layout(mut self, layout: impl LayoutSolver + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn phase(&self) -> BuilderPhase {
        self.state.phase()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Live tiles in lattice order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().map(|(_, entry)| entry.tile())
    }

    pub fn tile_at(&self, position: DVec3) -> Option<&Tile> {
        let key = GridKey::from_position(position, self.config.tile.size());
        self.tiles.get(key).map(StreamedTile::tile)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Counters from the most recent update.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Feed a builder signal directly. Returns the phase afterwards.
    pub fn send(&mut self, event: BuilderEvent, bus: &mut EventBus) -> Result<BuilderPhase, StreamError> {
        let mut stats = StreamStats::default();
        self.transition(event, bus, &mut stats)?;
        Ok(self.phase())
    }

    fn transition(
        &mut self,
        event: BuilderEvent,
        bus: &mut EventBus,
        stats: &mut StreamStats,
    ) -> Result<(), StreamError> {
        match (self.state.phase(), event) {
            (BuilderPhase::Inactive, BuilderEvent::LoadAssets) => {
                self.state = BuilderState::Loading;
                tracing::debug!("builder loading");
            }
            (BuilderPhase::Loading, BuilderEvent::LoadAssets) => {
                tracing::trace!("asset set arrived while loading");
            }
            (BuilderPhase::Loading, BuilderEvent::LoadAssetsComplete) => {
                let Some((textures, models)) = self.gate.assets() else {
                    tracing::warn!("load complete signalled before both asset sets arrived");
                    return Ok(());
                };
                self.state = BuilderState::Active(ActiveState {
                    edge_views: bus.subscribe(EDGE_VIEW)?,
                    disposals: bus.subscribe(DISPOSE_REQUEST)?,
                    textures: textures.clone(),
                    models: models.clone(),
                });
                tracing::debug!("builder active");
                if self.spawn_at(DVec3::ZERO, bus)?.is_some() {
                    stats.tiles_spawned += 1;
                }
            }
            (phase, event) => {
                tracing::warn!(?phase, ?event, "builder event ignored");
            }
        }
        Ok(())
    }

    /// Run one stimulus round: asset signals, tile watchers, then spawns
    /// and disposals.
    pub fn update(&mut self, bus: &mut EventBus) -> Result<StreamStats, StreamError> {
        let _span = tracing::info_span!("tile_stream_update").entered();
        let start = Instant::now();
        let mut stats = StreamStats::default();

        bus.pump();
        for signal in self.gate.poll() {
            self.transition(signal, bus, &mut stats)?;
        }

        if matches!(self.state, BuilderState::Active(_)) {
            for entry in self.tiles.values_mut() {
                let outcome = entry.watchers.poll(&entry.tile)?;
                stats.camera_changes += outcome.camera_changes;
                stats.edge_views += outcome.edge_views;
            }
            bus.pump();

            let (views, disposals): (Vec<EdgeView>, Vec<DisposeRequest>) = match &self.state {
                BuilderState::Active(active) => {
                    (active.edge_views.drain().collect(), active.disposals.drain().collect())
                }
                _ => (Vec::new(), Vec::new()),
            };
            // A failed spawn still lets this round's disposals through.
            let spawned = self.apply_edge_views(views, bus, &mut stats);
            for request in disposals {
                if self.dispose(request.tile) {
                    stats.tiles_disposed += 1;
                }
            }
            if let Err(err) = spawned {
                self.stats = stats;
                return Err(err);
            }
        }

        stats.live_tiles = self.tiles.len();
        stats.frame_time = start.elapsed();
        tracing::trace!(
            spawned = stats.tiles_spawned,
            disposed = stats.tiles_disposed,
            live = stats.live_tiles,
            "stream update complete"
        );
        self.stats = stats.clone();
        Ok(stats)
    }

    fn apply_edge_views(
        &mut self,
        views: Vec<EdgeView>,
        bus: &mut EventBus,
        stats: &mut StreamStats,
    ) -> Result<(), StreamError> {
        for view in views {
            for edge in &view.edges {
                let target = neighbor_position(*edge, view.origin, view.size);
                match self.spawn_at(target, bus)? {
                    Some(_) => stats.tiles_spawned += 1,
                    None => stats.spawns_skipped += 1,
                }
            }
        }
        Ok(())
    }

    /// Spawn a tile at `position` unless its cell is already live.
    fn spawn_at(&mut self, position: DVec3, bus: &mut EventBus) -> Result<Option<TileId>, StreamError> {
        let BuilderState::Active(active) = &self.state else {
            return Ok(None);
        };
        let key = GridKey::from_position(position, self.config.tile.size());
        let config = &self.config;
        let noise = &self.noise;
        let layout = self.layout.as_ref();
        let spawned = self.tiles.spawn_with(key, || -> Result<_, StreamError> {
            let tile = Tile::generate(position, &config.tile, &active.models, &active.textures, noise, layout)?;
            let watchers = TileWatchers::register(bus)?;
            Ok((tile.id(), StreamedTile { tile, watchers }))
        })?;

        match spawned {
            Some(id) => {
                if let Some(entry) = self.tiles.get(key) {
                    self.renderer.attach(&entry.tile);
                }
                tracing::debug!(tile = %id.short(), x = position.x, z = position.z, "tile spawned");
            }
            None => {
                tracing::trace!(x = position.x, z = position.z, "cell already live");
            }
        }
        Ok(spawned)
    }

    /// Remove a live tile. Unknown ids are a no-op.
    fn dispose(&mut self, id: TileId) -> bool {
        match self.tiles.remove(id) {
            Some((key, entry)) => {
                drop(entry);
                self.renderer.detach(id);
                tracing::debug!(tile = %id.short(), x = key.x, z = key.z, "tile disposed");
                true
            }
            None => {
                tracing::trace!(tile = %id.short(), "dispose of unknown tile ignored");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrthoCamera;
    use crate::events::{CAMERA_CHANGED, CameraChanged};
    use crate::frustum::testing::GroundRect;
    use std::sync::Arc;
    use tilestream_bus::Publisher;
    use tilestream_common::Edge;
    use tilestream_render::SceneRecorder;
    use tilestream_tile::TileConfig;

    struct Harness {
        bus: EventBus,
        streamer: TileStreamer<SceneRecorder>,
        camera: Publisher<CameraChanged>,
        textures: Publisher<FloorTextures>,
        models: Publisher<BuildingModels>,
    }

    /// Tiles of size 20: 4x4 blocks of 3 with margin 1.
    fn small_config() -> StreamConfig {
        StreamConfig {
            tile: TileConfig {
                num_house_blocks: 4,
                house_block_size: 3.0,
                house_margin: 1.0,
                ..TileConfig::default()
            },
            ..StreamConfig::default()
        }
    }

    fn small_models() -> BuildingModels {
        BuildingModels::uniform([0.4, 0.4], 1.0).unwrap()
    }

    fn harness(config: StreamConfig) -> Harness {
        let mut bus = EventBus::new();
        let streamer = TileStreamer::new(config, SceneRecorder::new(), &mut bus).unwrap();
        Harness {
            camera: bus.publisher(CAMERA_CHANGED).unwrap(),
            textures: bus.publisher(TEXTURE_LOAD).unwrap(),
            models: bus.publisher(GLTF_LOAD).unwrap(),
            bus,
            streamer,
        }
    }

    fn active_harness() -> Harness {
        let mut h = harness(small_config());
        h.textures.emit(FloorTextures::default()).unwrap();
        h.models.emit(small_models()).unwrap();
        h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(h.streamer.phase(), BuilderPhase::Active);
        h
    }

    fn look_at(h: &mut Harness, view: GroundRect) -> StreamStats {
        h.camera
            .emit(CameraChanged {
                position: DVec3::ZERO,
                frustum: Arc::new(view),
            })
            .unwrap();
        h.streamer.update(&mut h.bus).unwrap()
    }

    fn interior() -> GroundRect {
        GroundRect::new(-2.0, 2.0, -2.0, 2.0)
    }

    fn north_east_strip() -> GroundRect {
        GroundRect::new(-2.0, 2.0, -8.0, 2.0)
    }

    fn far_away() -> GroundRect {
        GroundRect::new(500.0, 520.0, 500.0, 520.0)
    }

    #[test]
    fn starts_inactive_and_waits_for_assets() {
        let mut h = harness(small_config());
        assert_eq!(h.streamer.phase(), BuilderPhase::Inactive);
        look_at(&mut h, interior());
        assert_eq!(h.streamer.phase(), BuilderPhase::Inactive);
        assert_eq!(h.streamer.tile_count(), 0);
    }

    #[test]
    fn textures_alone_only_reach_loading() {
        let mut h = harness(small_config());
        h.textures.emit(FloorTextures::default()).unwrap();
        h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(h.streamer.phase(), BuilderPhase::Loading);
        assert_eq!(h.streamer.tile_count(), 0);

        // A premature completion signal cannot skip the gate.
        let phase = h.streamer.send(BuilderEvent::LoadAssetsComplete, &mut h.bus).unwrap();
        assert_eq!(phase, BuilderPhase::Loading);

        h.models.emit(small_models()).unwrap();
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(h.streamer.phase(), BuilderPhase::Active);
        assert_eq!(stats.tiles_spawned, 1);
    }

    #[test]
    fn activation_spawns_the_origin_tile() {
        let h = active_harness();
        assert_eq!(h.streamer.tile_count(), 1);
        let origin = h.streamer.tile_at(DVec3::ZERO).unwrap();
        assert_eq!(origin.size(), 20.0);
        assert!(h.streamer.renderer().contains(origin.id()));
    }

    #[test]
    fn out_of_state_events_are_ignored() {
        let mut h = harness(small_config());
        let phase = h.streamer.send(BuilderEvent::LoadAssetsComplete, &mut h.bus).unwrap();
        assert_eq!(phase, BuilderPhase::Inactive);

        let mut h = active_harness();
        let phase = h.streamer.send(BuilderEvent::LoadAssets, &mut h.bus).unwrap();
        assert_eq!(phase, BuilderPhase::Active);
        assert_eq!(h.streamer.tile_count(), 1);
    }

    #[test]
    fn later_asset_payloads_change_nothing() {
        let mut h = active_harness();
        h.models.emit(BuildingModels::builtin()).unwrap();
        h.textures.emit(FloorTextures::default()).unwrap();
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(stats.tiles_spawned, 0);
        assert_eq!(h.streamer.tile_count(), 1);
    }

    #[test]
    fn interior_view_spawns_nothing() {
        let mut h = active_harness();
        let first = look_at(&mut h, interior());
        let second = look_at(&mut h, interior());
        assert_eq!(first.camera_changes, 1);
        assert_eq!(first.edge_views + second.edge_views, 0);
        assert_eq!(h.streamer.tile_count(), 1);
    }

    #[test]
    fn first_evaluation_never_spawns() {
        let mut h = active_harness();
        // Even with edges visible, the first evaluation is only a baseline.
        let stats = look_at(&mut h, north_east_strip());
        assert_eq!(stats.edge_views, 0);
        assert_eq!(h.streamer.tile_count(), 1);
    }

    #[test]
    fn north_east_view_spawns_one_neighbor() {
        let mut h = active_harness();
        look_at(&mut h, interior());
        let stats = look_at(&mut h, north_east_strip());
        assert_eq!(stats.edge_views, 1);
        assert_eq!(stats.tiles_spawned, 1);
        assert_eq!(h.streamer.tile_count(), 2);
        let spawned = h.streamer.tile_at(DVec3::new(0.0, 0.0, -20.0)).unwrap();
        assert_eq!(spawned.position(), DVec3::new(0.0, 0.0, -20.0));
        assert_eq!(h.streamer.renderer().len(), 2);

        // Same view again: nothing new.
        let again = look_at(&mut h, north_east_strip());
        assert_eq!(again.tiles_spawned, 0);
        assert_eq!(h.streamer.tile_count(), 2);
    }

    #[test]
    fn panning_away_disposes_everything() {
        let mut h = active_harness();
        look_at(&mut h, interior());
        look_at(&mut h, north_east_strip());
        assert_eq!(h.streamer.tile_count(), 2);

        let stats = look_at(&mut h, far_away());
        assert_eq!(stats.tiles_disposed, 2);
        assert_eq!(stats.tiles_spawned, 0);
        assert_eq!(h.streamer.tile_count(), 0);
        assert!(h.streamer.renderer().is_empty());

        // Disposed tiles no longer listen.
        look_at(&mut h, interior());
        assert_eq!(h.bus.subscriber_count(CAMERA_CHANGED.name()), 0);
    }

    #[test]
    fn duplicate_targets_in_one_batch_spawn_once() {
        let mut h = active_harness();
        let views = h.bus.publisher(EDGE_VIEW).unwrap();
        let origin = h.streamer.tile_at(DVec3::ZERO).unwrap().id();
        views
            .emit(EdgeView {
                tile: origin,
                origin: DVec3::ZERO,
                size: 20.0,
                edges: vec![Edge::NorthEast, Edge::NorthEast],
            })
            .unwrap();
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(stats.tiles_spawned, 1);
        assert_eq!(stats.spawns_skipped, 1);
        assert_eq!(h.streamer.tile_count(), 2);
    }

    #[test]
    fn different_origins_resolving_to_one_cell_spawn_once() {
        let mut h = active_harness();
        let views = h.bus.publisher(EDGE_VIEW).unwrap();
        // East of the origin and NorthEast of (20, 0, 0) are both (20, 0, -20).
        for (origin, edge) in [(DVec3::ZERO, Edge::East), (DVec3::new(20.0, 0.0, 0.0), Edge::NorthEast)] {
            views
                .emit(EdgeView {
                    tile: TileId::new(),
                    origin,
                    size: 20.0,
                    edges: vec![edge],
                })
                .unwrap();
        }
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(stats.tiles_spawned, 1);
        assert_eq!(stats.spawns_skipped, 1);
        assert!(h.streamer.tile_at(DVec3::new(20.0, 0.0, -20.0)).is_some());
    }

    #[test]
    fn no_two_live_tiles_share_a_position() {
        let mut h = active_harness();
        let views = h.bus.publisher(EDGE_VIEW).unwrap();
        for round in 0..3 {
            let origins: Vec<DVec3> = h.streamer.tiles().map(Tile::position).collect();
            for origin in origins {
                views
                    .emit(EdgeView {
                        tile: TileId::new(),
                        origin,
                        size: 20.0,
                        edges: Edge::ALL.to_vec(),
                    })
                    .unwrap();
            }
            h.streamer.update(&mut h.bus).unwrap();
            let side = 2 * (round + 1) + 1;
            assert_eq!(h.streamer.tile_count(), side * side);
        }
        let mut keys: Vec<GridKey> = h
            .streamer
            .tiles()
            .map(|t| GridKey::from_position(t.position(), 20.0))
            .collect();
        let live = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), live);
    }

    #[test]
    fn disposing_an_unknown_tile_is_a_no_op() {
        let mut h = active_harness();
        let requests = h.bus.publisher(DISPOSE_REQUEST).unwrap();
        requests.emit(DisposeRequest { tile: TileId::new() }).unwrap();
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(stats.tiles_disposed, 0);
        assert_eq!(h.streamer.tile_count(), 1);
    }

    #[test]
    fn double_dispose_removes_once() {
        let mut h = active_harness();
        let requests = h.bus.publisher(DISPOSE_REQUEST).unwrap();
        let origin = h.streamer.tile_at(DVec3::ZERO).unwrap().id();
        requests.emit(DisposeRequest { tile: origin }).unwrap();
        requests.emit(DisposeRequest { tile: origin }).unwrap();
        let stats = h.streamer.update(&mut h.bus).unwrap();
        assert_eq!(stats.tiles_disposed, 1);
        assert_eq!(h.streamer.tile_count(), 0);
        assert_eq!(h.streamer.renderer().history().len(), 2);
    }

    #[test]
    fn revisiting_a_cell_creates_a_fresh_tile() {
        let mut h = active_harness();
        let requests = h.bus.publisher(DISPOSE_REQUEST).unwrap();
        let views = h.bus.publisher(EDGE_VIEW).unwrap();
        let first = h.streamer.tile_at(DVec3::ZERO).unwrap().id();
        // Keep a neighbor alive, drop the origin, then spawn it back.
        views
            .emit(EdgeView {
                tile: first,
                origin: DVec3::ZERO,
                size: 20.0,
                edges: vec![Edge::SouthWest],
            })
            .unwrap();
        h.streamer.update(&mut h.bus).unwrap();
        requests.emit(DisposeRequest { tile: first }).unwrap();
        h.streamer.update(&mut h.bus).unwrap();
        assert!(h.streamer.tile_at(DVec3::ZERO).is_none());

        views
            .emit(EdgeView {
                tile: TileId::new(),
                origin: DVec3::new(0.0, 0.0, 20.0),
                size: 20.0,
                edges: vec![Edge::NorthEast],
            })
            .unwrap();
        h.streamer.update(&mut h.bus).unwrap();
        let second = h.streamer.tile_at(DVec3::ZERO).unwrap().id();
        assert_ne!(first, second);
    }

    #[test]
    fn ortho_camera_drives_streaming() {
        let mut bus = EventBus::new();
        let config = StreamConfig::default();
        let mut camera = OrthoCamera::new(config.camera.clone());
        camera.connect(&mut bus).unwrap();
        let mut streamer = TileStreamer::new(config, SceneRecorder::new(), &mut bus).unwrap();
        bus.publisher(TEXTURE_LOAD).unwrap().emit(FloorTextures::default()).unwrap();
        bus.publisher(GLTF_LOAD).unwrap().emit(BuildingModels::builtin()).unwrap();
        streamer.update(&mut bus).unwrap();
        assert_eq!(streamer.tile_count(), 1);

        camera.broadcast().unwrap();
        streamer.update(&mut bus).unwrap();
        assert_eq!(streamer.tile_count(), 1);

        // Bring the north-east row of blocks into view.
        camera.translate(DVec3::new(0.0, 0.0, -60.0)).unwrap();
        let stats = streamer.update(&mut bus).unwrap();
        assert_eq!(stats.tiles_spawned, 1);
        assert!(streamer.tile_at(DVec3::new(0.0, 0.0, -120.0)).is_some());
        assert_eq!(stats.tiles_disposed, 0);
    }

    #[test]
    fn idle_auto_pan_streams_neighbors() {
        use crate::config::ControlsConfig;
        use crate::controls::TopDownControls;
        use std::time::Duration;

        let mut bus = EventBus::new();
        let config = StreamConfig {
            controls: ControlsConfig {
                auto_pan_rate: 1.0,
                ..ControlsConfig::default()
            },
            ..StreamConfig::default()
        };
        let mut controls = TopDownControls::new(OrthoCamera::new(config.camera.clone()), config.controls.clone());
        controls.connect(&mut bus).unwrap();
        let mut streamer = TileStreamer::new(config, SceneRecorder::new(), &mut bus).unwrap();
        bus.publisher(TEXTURE_LOAD).unwrap().emit(FloorTextures::default()).unwrap();
        bus.publisher(GLTF_LOAD).unwrap().emit(BuildingModels::builtin()).unwrap();
        streamer.update(&mut bus).unwrap();

        controls.tick(Duration::from_secs(2)).unwrap();
        let mut spawned = 0;
        for _ in 0..200 {
            controls.tick(Duration::from_millis(100)).unwrap();
            spawned += streamer.update(&mut bus).unwrap().tiles_spawned;
            if spawned > 0 {
                break;
            }
        }
        assert!(spawned > 0);
        for tile in streamer.tiles() {
            let p = tile.position();
            assert!(p.x >= 0.0 && p.z <= 0.0, "drift is east and north, got {p}");
            assert!(p.x.abs() <= 120.0 && p.z.abs() <= 120.0);
        }
    }

    #[test]
    fn renderer_sees_attach_before_detach() {
        let mut h = active_harness();
        look_at(&mut h, interior());
        look_at(&mut h, north_east_strip());
        look_at(&mut h, far_away());
        let history = h.streamer.renderer().history();
        assert_eq!(history.len(), 4);
        assert!(matches!(history[0], tilestream_render::SceneChange::Attached(..)));
        assert!(matches!(history[3], tilestream_render::SceneChange::Detached(..)));
    }

    #[test]
    fn failed_spawn_keeps_the_rounds_disposals() {
        use std::cell::Cell;
        use std::rc::Rc;
        use tilestream_tile::{ComputedLayout, FlexContainer};

        struct Switchable(Rc<Cell<bool>>);
        impl LayoutSolver for Switchable {
            fn calculate(&self, container: &FlexContainer, width: f64, height: f64) -> Vec<ComputedLayout> {
                if self.0.get() {
                    Vec::new()
                } else {
                    FlexRowWrap.calculate(container, width, height)
                }
            }
        }

        let broken = Rc::new(Cell::new(false));
        let mut bus = EventBus::new();
        let mut streamer = TileStreamer::new(small_config(), SceneRecorder::new(), &mut bus)
            .unwrap()
            .with_layout(Switchable(broken.clone()));
        bus.publisher(TEXTURE_LOAD).unwrap().emit(FloorTextures::default()).unwrap();
        bus.publisher(GLTF_LOAD).unwrap().emit(small_models()).unwrap();
        streamer.update(&mut bus).unwrap();
        let origin = streamer.tile_at(DVec3::ZERO).unwrap().id();

        let views = bus.publisher(EDGE_VIEW).unwrap();
        let disposals = bus.publisher(DISPOSE_REQUEST).unwrap();
        views
            .emit(EdgeView {
                tile: origin,
                origin: DVec3::ZERO,
                size: 20.0,
                edges: vec![Edge::North],
            })
            .unwrap();
        disposals.emit(DisposeRequest { tile: origin }).unwrap();
        broken.set(true);

        let err = streamer.update(&mut bus).unwrap_err();
        assert!(matches!(err, StreamError::Tile(TileError::Layout { .. })));
        assert_eq!(streamer.tile_count(), 0);
        assert_eq!(streamer.stats().tiles_disposed, 1);
        assert!(matches!(
            streamer.renderer().history().last(),
            Some(tilestream_render::SceneChange::Detached(id)) if *id == origin
        ));
    }
}
