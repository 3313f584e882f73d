// sv_snapshot.rs — per-tick capture of the authoritative world
//
// After each game tick the server copies every client's player state
// and the entity states it should see into that client's snapshot
// ring. Presentation polls the ring; nothing here blocks.

use crate::server::{ClientConnState, ServerContext};
use myq3_common::net_chan::MAX_MAP_AREA_BYTES;
use myq3_common::q_shared::{EntityState, SVF_NOCLIENT};
use myq3_vm::VmMemory;

/// Queue a reliable command for one client, or for every active client
/// when `client` is -1.
pub fn sv_send_server_command(sv: &mut ServerContext, client: i32, text: &str) {
    if client >= 0 {
        if let Some(c) = sv.clients.get_mut(client as usize) {
            if c.state != ClientConnState::Free {
                c.commands.send(text);
            }
        }
        return;
    }
    for c in &mut sv.clients {
        if c.state == ClientConnState::Active {
            c.commands.send(text);
        }
    }
}

/// Entities visible to a client this tick. Area-based culling is not
/// applied; every linked, sendable entity is included in slot order.
fn collect_snapshot_entities(sv: &ServerContext, mem: &VmMemory, client_num: i32) -> Vec<EntityState> {
    let mut list = Vec::new();
    if !sv.game_data_located() {
        return list;
    }

    for num in 0..sv.num_entities {
        // the client's own entity is carried by the player state
        if num == client_num {
            continue;
        }
        let r = sv.entity_shared(mem, num);
        if !r.linked {
            continue;
        }
        if r.sv_flags & SVF_NOCLIENT != 0 {
            continue;
        }
        if r.single_client != 0 && r.single_client != client_num {
            continue;
        }

        let mut state = sv.entity_state(mem, num);
        if state.number != num {
            // the slot number is authoritative
            state.number = num;
        }
        list.push(state);
    }
    list
}

/// Build and store one client's snapshot for the just-completed tick.
pub fn sv_build_client_snapshot(sv: &mut ServerContext, mem: &VmMemory, client_num: i32) {
    let client_idx = client_num as usize;
    if client_idx >= sv.clients.len() {
        return;
    }
    if sv.clients[client_idx].state != ClientConnState::Active {
        return;
    }

    let ps = sv.player_state(mem, client_num);
    let entities = collect_snapshot_entities(sv, mem, client_num);

    // the area mask is written but zero: no area culling in this core
    let areamask = [0u8; MAX_MAP_AREA_BYTES];

    let time = sv.time;
    let client = &mut sv.clients[client_idx];
    client
        .snapshots
        .store(time, ps.ping, 0, areamask, &ps, &entities);
}

/// Snapshots for every active client; runs after the tick completes so
/// clients observe each tick atomically.
pub fn sv_build_snapshots(sv: &mut ServerContext, mem: &VmMemory) {
    for i in 0..sv.clients.len() {
        sv_build_client_snapshot(sv, mem, i as i32);
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Client;
    use myq3_common::q_shared::EntityShared;
    use myq3_vm::layout::{self, ENTITY_STATE_SIZE, SHARED_ENTITY_SIZE};

    fn rig() -> (ServerContext, VmMemory) {
        let mut sv = ServerContext::new();
        sv.entity_base = 0x1000;
        sv.entity_size = SHARED_ENTITY_SIZE;
        sv.num_entities = 8;
        sv.player_base = 0x40000;
        sv.player_size = layout::PLAYER_STATE_SIZE;
        let mut client = Client::new();
        client.state = ClientConnState::Active;
        sv.clients.push(client);
        (sv, VmMemory::new(1 << 20))
    }

    fn write_entity(sv: &ServerContext, mem: &mut VmMemory, num: i32, linked: bool, flags: i32) {
        let base = sv.gentity_addr(num);
        let state = EntityState {
            number: num,
            origin: [num as f32 * 10.0, 0.0, 0.0],
            modelindex: num + 1,
            ..Default::default()
        };
        layout::write_entity_state(mem, base, &state);
        let r = EntityShared {
            linked,
            sv_flags: flags,
            ..Default::default()
        };
        layout::write_entity_shared(mem, base + ENTITY_STATE_SIZE, &r);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut sv, mut mem) = rig();
        sv.time = 250;

        // a mock game: three linked entities plus the client itself
        for num in [1, 2, 3] {
            write_entity(&sv, &mut mem, num, true, 0);
        }
        write_entity(&sv, &mut mem, 0, true, 0); // client's own entity
        write_entity(&sv, &mut mem, 4, false, 0); // never linked
        write_entity(&sv, &mut mem, 5, true, SVF_NOCLIENT); // hidden

        let mut ps = myq3_common::q_shared::PlayerState::default();
        ps.origin = [0.0, 0.0, 64.0];
        ps.stats[0] = 100;
        layout::write_player_state(&mut mem, sv.player_base, &ps);

        // five ticks, snapshot after each
        for tick in 1..=5 {
            sv.time = tick * 50;
            sv_build_snapshots(&mut sv, &mem);
        }

        let ring = &sv.clients[0].snapshots;
        assert_eq!(ring.current(), 5);

        let snap = ring.get(5).unwrap();
        assert_eq!(snap.server_time, 250);
        assert_eq!(snap.num_entities, 3);
        assert_eq!(snap.ps.origin, [0.0, 0.0, 64.0]);
        assert_eq!(snap.ps.stats[0], 100);
        assert!(snap.areamask.iter().all(|&b| b == 0));

        // bit-identical entity fields in slot order
        for (i, expected_num) in [1, 2, 3].iter().enumerate() {
            let ent = ring.entity(snap.first_entity + i as i32);
            assert_eq!(ent.number, *expected_num);
            assert_eq!(ent.origin, [*expected_num as f32 * 10.0, 0.0, 0.0]);
            assert_eq!(ent.modelindex, expected_num + 1);
        }

        // every stored tick remains addressable
        assert_eq!(ring.get(1).unwrap().server_time, 50);
        assert!(ring.get(6).is_none());
    }

    #[test]
    fn test_slot_number_is_authoritative() {
        let (mut sv, mut mem) = rig();
        write_entity(&sv, &mut mem, 2, true, 0);
        // corrupt the stored number
        let base = sv.gentity_addr(2);
        mem.write_i32(base, 999);

        sv_build_snapshots(&mut sv, &mem);
        let ring = &sv.clients[0].snapshots;
        let snap = ring.get(1).unwrap();
        assert_eq!(ring.entity(snap.first_entity).number, 2);
    }

    #[test]
    fn test_inactive_clients_get_no_snapshots() {
        let (mut sv, mem) = rig();
        sv.clients[0].state = ClientConnState::Connected;
        sv_build_snapshots(&mut sv, &mem);
        assert_eq!(sv.clients[0].snapshots.current(), 0);
    }

    #[test]
    fn test_broadcast_reaches_active_only() {
        let (mut sv, _mem) = rig();
        let mut idle = Client::new();
        idle.state = ClientConnState::Connected;
        sv.clients.push(idle);

        sv_send_server_command(&mut sv, -1, "print \"round over\"");
        assert_eq!(sv.clients[0].commands.sequence, 1);
        assert_eq!(sv.clients[1].commands.sequence, 0);
    }
}
