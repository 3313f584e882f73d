// net_chan.rs — loopback delivery state between the authoritative
// simulation and the presentation side
//
// A real network build would serialize these rings into datagrams; the
// loopback keeps the identical contracts (monotonic sequence numbers,
// fixed-size rings, explicit polling) with in-process storage.

use crate::q_shared::{EntityState, PlayerState};

pub const PACKET_BACKUP: usize = 32;
pub const MAX_PARSE_ENTITIES: usize = 2048;
pub const MAX_SNAPSHOT_ENTITIES: usize = 256;
pub const MAX_RELIABLE_COMMANDS: usize = 64;
pub const MAX_MAP_AREA_BYTES: usize = 32;

// ============================================================
// Reliable command ring — one per direction
// ============================================================

/// Ordered, acknowledged string commands. The sender advances
/// `sequence` and overwrites `commands[sequence & 63]`; readers poll by
/// sequence number and acknowledge what they consumed.
pub struct ReliableRing {
    commands: Vec<String>,
    /// sequence number of the most recently sent command; 0 = none
    pub sequence: i32,
    /// highest sequence the reader has consumed; never exceeds `sequence`
    pub acknowledged: i32,
}

impl ReliableRing {
    pub fn new() -> Self {
        Self {
            commands: vec![String::new(); MAX_RELIABLE_COMMANDS],
            sequence: 0,
            acknowledged: 0,
        }
    }

    /// Queue a command. Returns its sequence number.
    pub fn send(&mut self, command: &str) -> i32 {
        self.sequence += 1;
        let slot = (self.sequence as usize) & (MAX_RELIABLE_COMMANDS - 1);
        self.commands[slot] = command.to_string();
        self.sequence
    }

    /// Fetch the command at `sequence`, if it has been sent and has not
    /// been overwritten by newer traffic.
    pub fn get(&self, sequence: i32) -> Option<&str> {
        if sequence <= 0 || sequence > self.sequence {
            return None;
        }
        if self.sequence - sequence >= MAX_RELIABLE_COMMANDS as i32 {
            return None; // aged out of the ring
        }
        let slot = (sequence as usize) & (MAX_RELIABLE_COMMANDS - 1);
        Some(&self.commands[slot])
    }

    pub fn acknowledge(&mut self, sequence: i32) {
        if sequence > self.acknowledged && sequence <= self.sequence {
            self.acknowledged = sequence;
        }
    }

    pub fn clear(&mut self) {
        for c in &mut self.commands {
            c.clear();
        }
        self.sequence = 0;
        self.acknowledged = 0;
    }
}

impl Default for ReliableRing {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Snapshot ring
// ============================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub valid: bool,
    pub sequence: i32,
    pub snap_flags: i32,
    pub server_time: i32,
    pub ping: i32,
    pub areamask: [u8; MAX_MAP_AREA_BYTES],
    pub ps: PlayerState,
    pub num_entities: i32,
    /// index of the first entity in the parse-entity ring
    pub first_entity: i32,
}

impl Default for SnapshotRecord {
    fn default() -> Self {
        Self {
            valid: false,
            sequence: 0,
            snap_flags: 0,
            server_time: 0,
            ping: 0,
            areamask: [0; MAX_MAP_AREA_BYTES],
            ps: PlayerState::default(),
            num_entities: 0,
            first_entity: 0,
        }
    }
}

/// Per-client snapshot storage: a 32-slot ring of snapshot records over
/// a 2048-slot circular buffer of entity states. Written only by the
/// authoritative tick, read only by presentation queries.
pub struct SnapshotRing {
    snapshots: Vec<SnapshotRecord>,
    parse_entities: Vec<EntityState>,
    /// sequence number of the newest stored snapshot; 0 = none yet
    pub sequence: i32,
    /// monotonically increasing entity write head
    next_entity: i32,
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self {
            snapshots: vec![SnapshotRecord::default(); PACKET_BACKUP],
            parse_entities: vec![EntityState::default(); MAX_PARSE_ENTITIES],
            sequence: 0,
            next_entity: 0,
        }
    }

    /// Store one snapshot. Entities are appended to the parse ring and
    /// referenced by (first, count). Returns the new sequence number.
    pub fn store(
        &mut self,
        server_time: i32,
        ping: i32,
        snap_flags: i32,
        areamask: [u8; MAX_MAP_AREA_BYTES],
        ps: &PlayerState,
        entities: &[EntityState],
    ) -> i32 {
        self.sequence += 1;
        let slot = (self.sequence as usize) & (PACKET_BACKUP - 1);

        let first = self.next_entity;
        for ent in entities.iter().take(MAX_SNAPSHOT_ENTITIES) {
            let idx = (self.next_entity as usize) & (MAX_PARSE_ENTITIES - 1);
            self.parse_entities[idx] = *ent;
            self.next_entity += 1;
        }

        self.snapshots[slot] = SnapshotRecord {
            valid: true,
            sequence: self.sequence,
            snap_flags,
            server_time,
            ping,
            areamask,
            ps: *ps,
            num_entities: entities.len().min(MAX_SNAPSHOT_ENTITIES) as i32,
            first_entity: first,
        };
        self.sequence
    }

    pub fn current(&self) -> i32 {
        self.sequence
    }

    pub fn current_server_time(&self) -> i32 {
        if self.sequence == 0 {
            return 0;
        }
        self.snapshots[(self.sequence as usize) & (PACKET_BACKUP - 1)].server_time
    }

    /// Snapshot by sequence number, or None if never written or aged
    /// out of the 32-slot ring (or its entities have been overwritten).
    pub fn get(&self, sequence: i32) -> Option<&SnapshotRecord> {
        if sequence <= 0 || sequence > self.sequence {
            return None;
        }
        if self.sequence - sequence >= PACKET_BACKUP as i32 {
            return None;
        }
        let snap = &self.snapshots[(sequence as usize) & (PACKET_BACKUP - 1)];
        if !snap.valid || snap.sequence != sequence {
            return None;
        }
        if self.next_entity - snap.first_entity > MAX_PARSE_ENTITIES as i32 {
            return None; // entity views have been recycled
        }
        Some(snap)
    }

    /// Entity view by absolute parse-ring index; wraps modulo 2048.
    pub fn entity(&self, index: i32) -> &EntityState {
        &self.parse_entities[(index as usize) & (MAX_PARSE_ENTITIES - 1)]
    }

    pub fn clear(&mut self) {
        for s in &mut self.snapshots {
            s.valid = false;
            s.sequence = 0;
        }
        self.sequence = 0;
        self.next_entity = 0;
    }
}

impl Default for SnapshotRing {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(number: i32) -> EntityState {
        EntityState {
            number,
            origin: [number as f32, 0.0, 0.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_reliable_ordering() {
        let mut ring = ReliableRing::new();
        assert_eq!(ring.send("print a"), 1);
        assert_eq!(ring.send("print b"), 2);

        // reading out of order: getting 2 first says nothing about 1
        assert_eq!(ring.get(2), Some("print b"));
        assert_eq!(ring.get(1), Some("print a"));
        assert_eq!(ring.get(3), None);
        assert_eq!(ring.get(0), None);
    }

    #[test]
    fn test_reliable_acknowledge_never_exceeds_sender() {
        let mut ring = ReliableRing::new();
        ring.send("one");
        ring.acknowledge(5); // beyond sender sequence, ignored
        assert_eq!(ring.acknowledged, 0);
        ring.acknowledge(1);
        assert_eq!(ring.acknowledged, 1);
        ring.acknowledge(0); // regression ignored
        assert_eq!(ring.acknowledged, 1);
    }

    #[test]
    fn test_reliable_ages_out() {
        let mut ring = ReliableRing::new();
        for i in 0..70 {
            ring.send(&format!("cmd {}", i));
        }
        assert_eq!(ring.get(1), None); // overwritten
        assert_eq!(ring.get(70), Some("cmd 69"));
        assert_eq!(ring.get(7), Some("cmd 6")); // 70-7 < 64, still live
        assert_eq!(ring.get(6), None);
    }

    #[test]
    fn test_snapshot_ring_sequence() {
        let mut ring = SnapshotRing::new();
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.get(0), None);

        let ps = PlayerState::default();
        for k in 1..=40 {
            let seq = ring.store(k * 50, 0, 0, [0; 32], &ps, &[ent(1)]);
            assert_eq!(seq, k);
        }
        assert_eq!(ring.current(), 40);

        // K-32 < N <= K window
        assert!(ring.get(40).is_some());
        assert!(ring.get(9).is_some());
        assert!(ring.get(8).is_none());
        assert!(ring.get(41).is_none());
    }

    #[test]
    fn test_snapshot_entities_round_trip() {
        let mut ring = SnapshotRing::new();
        let ps = PlayerState::default();
        let ents = [ent(3), ent(7), ent(11)];
        let seq = ring.store(50, 10, 0, [0; 32], &ps, &ents);

        let snap = ring.get(seq).unwrap();
        assert_eq!(snap.num_entities, 3);
        assert_eq!(snap.server_time, 50);
        assert_eq!(snap.ping, 10);
        for i in 0..3 {
            let e = ring.entity(snap.first_entity + i);
            assert_eq!(*e, ents[i as usize]);
        }
    }

    #[test]
    fn test_snapshot_entity_ring_wraps() {
        let mut ring = SnapshotRing::new();
        let ps = PlayerState::default();
        // push enough entities to wrap the 2048 ring several times
        let batch: Vec<EntityState> = (0..200).map(ent).collect();
        let mut last = 0;
        for _ in 0..15 {
            last = ring.store(0, 0, 0, [0; 32], &ps, &batch);
        }
        let snap = ring.get(last).unwrap();
        // newest snapshot reads back intact despite the wrap
        for i in 0..snap.num_entities {
            assert_eq!(ring.entity(snap.first_entity + i).number, i);
        }
        // an old snapshot whose entities were recycled is refused
        assert!(ring.get(last - 11).is_none());
    }
}
