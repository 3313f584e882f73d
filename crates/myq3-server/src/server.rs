// server.rs — authoritative server state

use crate::sv_world::WorldSectors;
use myq3_common::net_chan::{ReliableRing, SnapshotRing};
use myq3_common::q_shared::{
    EntityShared, EntityState, PlayerState, UserCmd, MAX_CONFIGSTRINGS, MAX_GENTITIES,
};
use myq3_vm::layout::{self, ENTITY_STATE_SIZE};
use myq3_vm::VmMemory;

/// Fixed simulation tick length.
pub const TICK_MSEC: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// no map loaded
    Dead,
    /// spawning level entities
    Loading,
    /// actively running
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConnState {
    Free,
    Connected,
    Active,
}

/// One connected client slot.
pub struct Client {
    pub state: ClientConnState,
    pub name: String,
    pub userinfo: String,
    pub last_usercmd: UserCmd,
    /// set by the drop-client syscall; the frame loop finishes the drop
    pub drop_reason: Option<String>,
    /// server → client reliable commands
    pub commands: ReliableRing,
    /// per-client snapshot storage
    pub snapshots: SnapshotRing,
}

impl Client {
    pub fn new() -> Self {
        Self {
            state: ClientConnState::Free,
            name: String::new(),
            userinfo: String::new(),
            last_usercmd: UserCmd::default(),
            drop_reason: None,
            commands: ReliableRing::new(),
            snapshots: SnapshotRing::new(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-side bookkeeping per shared entity.
#[derive(Debug, Clone, Copy)]
pub struct SvEntity {
    /// index of the world sector whose chain holds this entity; -1 when
    /// unlinked. Exactly one chain at a time.
    pub world_sector: i32,
}

impl Default for SvEntity {
    fn default() -> Self {
        Self { world_sector: -1 }
    }
}

pub struct ServerContext {
    pub state: ServerState,
    /// authoritative time, advanced in whole ticks
    pub time: i32,
    pub time_residual: i32,

    pub map_name: String,
    pub map_checksum: u32,

    pub configstrings: Vec<String>,
    pub clients: Vec<Client>,
    pub sv_entities: Vec<SvEntity>,
    pub world: WorldSectors,

    // located game data: the shared entity and player state arrays live
    // in game VM memory, addressed only through these
    pub entity_base: i32,
    pub entity_size: i32,
    pub num_entities: i32,
    pub player_base: i32,
    pub player_size: i32,
}

impl ServerContext {
    pub fn new() -> Self {
        Self {
            state: ServerState::Dead,
            time: 0,
            time_residual: 0,
            map_name: String::new(),
            map_checksum: 0,
            configstrings: vec![String::new(); MAX_CONFIGSTRINGS],
            clients: Vec::new(),
            sv_entities: vec![SvEntity::default(); MAX_GENTITIES],
            world: WorldSectors::new(),
            entity_base: 0,
            entity_size: 0,
            num_entities: 0,
            player_base: 0,
            player_size: 0,
        }
    }

    pub fn running(&self) -> bool {
        self.state == ServerState::Game
    }

    pub fn game_data_located(&self) -> bool {
        self.entity_size > 0
    }

    /// VM address of shared entity `num`.
    pub fn gentity_addr(&self, num: i32) -> i32 {
        self.entity_base + num * self.entity_size
    }

    /// Slot number of the shared entity at a VM address, or None if the
    /// address does not land on a slot the game has located.
    pub fn gentity_num_for_addr(&self, addr: i32) -> Option<i32> {
        if !self.game_data_located() {
            return None;
        }
        let rel = addr - self.entity_base;
        if rel < 0 || rel % self.entity_size != 0 {
            return None;
        }
        let num = rel / self.entity_size;
        if num < 0 || num >= MAX_GENTITIES as i32 {
            return None;
        }
        Some(num)
    }

    pub fn entity_state(&self, mem: &VmMemory, num: i32) -> EntityState {
        if !self.game_data_located() {
            return EntityState::default();
        }
        layout::read_entity_state(mem, self.gentity_addr(num))
    }

    pub fn entity_shared(&self, mem: &VmMemory, num: i32) -> EntityShared {
        if !self.game_data_located() {
            return EntityShared::default();
        }
        layout::read_entity_shared(mem, self.gentity_addr(num) + ENTITY_STATE_SIZE)
    }

    pub fn player_state(&self, mem: &VmMemory, client: i32) -> PlayerState {
        if self.player_size <= 0 {
            return PlayerState::default();
        }
        layout::read_player_state(mem, self.player_base + client * self.player_size)
    }

    pub fn set_configstring(&mut self, index: usize, value: &str) {
        if index >= MAX_CONFIGSTRINGS {
            return;
        }
        self.configstrings[index] = value.to_string();
    }

    pub fn configstring(&self, index: usize) -> &str {
        self.configstrings
            .get(index)
            .map_or("", |s| s.as_str())
    }

    /// Tear down to the dead state, keeping client slots allocated.
    pub fn clear_level(&mut self) {
        self.state = ServerState::Dead;
        self.time = 0;
        self.time_residual = 0;
        self.map_name.clear();
        self.map_checksum = 0;
        for cs in &mut self.configstrings {
            cs.clear();
        }
        for ent in &mut self.sv_entities {
            *ent = SvEntity::default();
        }
        self.world.clear();
        self.entity_base = 0;
        self.entity_size = 0;
        self.num_entities = 0;
        self.player_base = 0;
        self.player_size = 0;
        for client in &mut self.clients {
            client.commands.clear();
            client.snapshots.clear();
            client.drop_reason = None;
        }
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new()
    }
}
