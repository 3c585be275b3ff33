//! Fog of War (§4.K): per-tile per-faction vision state with refcounted
//! visibility.
//!
//! Grounded on `original_source/src/game/fog_of_war.h`
//! (`G_Fog_AddVision`/`G_Fog_RemoveVision`/`G_Fog_UpdateVisionState`). The
//! original LOS flood fill skips tiles occluded by a higher neighboring
//! tile, using the map height field -- a collaborator this core does not
//! own (§1 Out of scope: "the navigation/pathfinding grid"). Occlusion is
//! therefore delegated to an injected [`LosProvider`]; the default
//! (`FlatTerrain`) never occludes, matching a height field of zero
//! everywhere.

use serde::{Deserialize, Serialize};

/// Per-tile, per-faction vision state. Two bits would suffice (as in the
/// packed word described by §4.K); each [`TileState`] occupies a byte here
/// because the bit-packed `u32` word is an on-disk/wire optimization that
/// Rust's type system makes unnecessary in memory -- see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    Unexplored,
    InFog,
    Visible,
}

/// Whether a tile can be entered by a LOS flood fill from a given origin.
///
/// Implementors consult map height data this core does not own.
pub trait LosProvider {
    /// Returns `true` if a line of sight from `from` to `to` (adjacent
    /// tiles) is blocked by terrain.
    fn occludes(&self, from: (i32, i32), to: (i32, i32)) -> bool;
}

/// Default provider for a flat map: nothing ever occludes.
pub struct FlatTerrain;

impl LosProvider for FlatTerrain {
    fn occludes(&self, _from: (i32, i32), _to: (i32, i32)) -> bool {
        false
    }
}

/// Per-faction refcounted fog-of-war grid.
///
/// `tile_size` controls how world-space (x, z) coordinates map to tile
/// indices; `width`/`height` are in tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FogGrid {
    width: usize,
    height: usize,
    tile_size: f32,
    /// `state[faction][tile]`.
    state: Vec<Vec<TileState>>,
    /// `refcount[faction][tile]`.
    refcount: Vec<Vec<u32>>,
}

const MAX_FACTIONS: usize = 16;

impl FogGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_tile_size(width, height, 1.0)
    }

    pub fn with_tile_size(width: usize, height: usize, tile_size: f32) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            tile_size,
            state: (0..MAX_FACTIONS).map(|_| vec![TileState::Unexplored; n]).collect(),
            refcount: (0..MAX_FACTIONS).map(|_| vec![0u32; n]).collect(),
        }
    }

    fn tile_of(&self, xz: (f32, f32)) -> (i32, i32) {
        (
            (xz.0 / self.tile_size).floor() as i32,
            (xz.1 / self.tile_size).floor() as i32,
        )
    }

    fn idx(&self, tile: (i32, i32)) -> Option<usize> {
        if tile.0 < 0 || tile.1 < 0 || tile.0 as usize >= self.width || tile.1 as usize >= self.height {
            return None;
        }
        Some(tile.1 as usize * self.width + tile.0 as usize)
    }

    /// Breadth-first flood fill of every in-range, unoccluded tile around
    /// `origin`, radius in tiles.
    fn flood_fill(&self, origin: (i32, i32), radius_tiles: i32, los: &dyn LosProvider) -> Vec<(i32, i32)> {
        use std::collections::VecDeque;
        let mut visited = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(origin);
        visited.insert(origin);

        while let Some(tile) = queue.pop_front() {
            if self.idx(tile).is_none() {
                continue;
            }
            out.push(tile);
            for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let next = (tile.0 + dx, tile.1 + dz);
                if visited.contains(&next) {
                    continue;
                }
                let dist2 = (next.0 - origin.0).pow(2) + (next.1 - origin.1).pow(2);
                if dist2 > radius_tiles * radius_tiles {
                    continue;
                }
                if los.occludes(tile, next) {
                    continue;
                }
                visited.insert(next);
                queue.push_back(next);
            }
        }
        out
    }

    /// Add vision from `xz` for `faction` with the given world-space radius.
    pub fn add_vision(&mut self, faction: u8, xz: (f32, f32), radius: f32) {
        self.add_vision_los(faction, xz, radius, &FlatTerrain)
    }

    pub fn add_vision_los(&mut self, faction: u8, xz: (f32, f32), radius: f32, los: &dyn LosProvider) {
        let origin = self.tile_of(xz);
        let radius_tiles = (radius / self.tile_size).ceil() as i32;
        let tiles = self.flood_fill(origin, radius_tiles, los);
        for tile in tiles {
            if let Some(i) = self.idx(tile) {
                self.refcount[faction as usize][i] += 1;
                self.state[faction as usize][i] = TileState::Visible;
            }
        }
    }

    /// Remove vision previously added with the same `xz`/`radius` pair.
    pub fn remove_vision(&mut self, faction: u8, xz: (f32, f32), radius: f32) {
        self.remove_vision_los(faction, xz, radius, &FlatTerrain)
    }

    pub fn remove_vision_los(&mut self, faction: u8, xz: (f32, f32), radius: f32, los: &dyn LosProvider) {
        let origin = self.tile_of(xz);
        let radius_tiles = (radius / self.tile_size).ceil() as i32;
        let tiles = self.flood_fill(origin, radius_tiles, los);
        for tile in tiles {
            if let Some(i) = self.idx(tile) {
                let rc = &mut self.refcount[faction as usize][i];
                *rc = rc.saturating_sub(1);
                if *rc == 0 {
                    self.state[faction as usize][i] = TileState::InFog;
                }
            }
        }
    }

    pub fn tile_state(&self, faction: u8, xz: (f32, f32)) -> TileState {
        match self.idx(self.tile_of(xz)) {
            Some(i) => self.state[faction as usize][i],
            None => TileState::Unexplored,
        }
    }

    pub fn is_visible(&self, faction: u8, xz: (f32, f32)) -> bool {
        self.tile_state(faction, xz) == TileState::Visible
    }

    /// OR of visibility across every player-controlled faction.
    pub fn player_visible(&self, player_factions: &[u8], xz: (f32, f32)) -> bool {
        player_factions.iter().any(|&f| self.is_visible(f, xz))
    }

    /// Downgrade every VISIBLE tile to IN_FOG. Called before serialization
    /// so a loaded game never starts with stale vision.
    pub fn downgrade_for_save(&mut self) {
        for faction_state in &mut self.state {
            for tile in faction_state.iter_mut() {
                if *tile == TileState::Visible {
                    *tile = TileState::InFog;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_visible() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        assert!(fog.is_visible(0, (5.0, 5.0)));
    }

    #[test]
    fn remove_drops_to_in_fog_not_unexplored() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        fog.remove_vision(0, (5.0, 5.0), 2.0);
        assert_eq!(fog.tile_state(0, (5.0, 5.0)), TileState::InFog);
    }

    #[test]
    fn refcount_keeps_visible_while_any_provider_remains() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        fog.remove_vision(0, (5.0, 5.0), 2.0);
        assert!(fog.is_visible(0, (5.0, 5.0)), "second provider still present");
        fog.remove_vision(0, (5.0, 5.0), 2.0);
        assert_eq!(fog.tile_state(0, (5.0, 5.0)), TileState::InFog);
    }

    #[test]
    fn factions_are_independent() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        assert!(fog.is_visible(0, (5.0, 5.0)));
        assert!(!fog.is_visible(1, (5.0, 5.0)));
    }

    #[test]
    fn player_visible_is_or_across_factions() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(3, (1.0, 1.0), 1.0);
        assert!(fog.player_visible(&[0, 1, 3], (1.0, 1.0)));
        assert!(!fog.player_visible(&[0, 1], (1.0, 1.0)));
    }

    #[test]
    fn downgrade_for_save_clears_visible_to_in_fog() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision(0, (5.0, 5.0), 2.0);
        fog.downgrade_for_save();
        assert_eq!(fog.tile_state(0, (5.0, 5.0)), TileState::InFog);
    }

    struct WallAt(i32);
    impl LosProvider for WallAt {
        fn occludes(&self, _from: (i32, i32), to: (i32, i32)) -> bool {
            to.0 == self.0
        }
    }

    #[test]
    fn occluded_tiles_are_not_lit() {
        let mut fog = FogGrid::new(10, 10);
        fog.add_vision_los(0, (3.0, 3.0), 5.0, &WallAt(5));
        assert!(!fog.is_visible(0, (6.0, 3.0)), "beyond the wall should not be lit");
    }
}
