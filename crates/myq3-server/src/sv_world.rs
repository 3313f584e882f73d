// sv_world.rs — world query functions
//
// Entity area checking: a fixed-depth kd-tree of world sectors holding
// chains of linked entities, box queries against those chains, and
// traces clipped against both the world and entity clip models. Entity
// records live in game VM memory; everything here reads them through
// the layout table.

use crate::server::ServerContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::q_shared::{
    Trace, Vec3, ENTITYNUM_NONE, ENTITYNUM_WORLD, MAX_GENTITIES,
};
use myq3_vm::layout::{self, ENTITY_STATE_SIZE};
use myq3_vm::VmMemory;

const AREA_DEPTH: i32 = 4;

#[derive(Debug, Clone)]
pub struct WorldSector {
    pub axis: i32, // -1 = leaf
    pub dist: f32,
    pub children: [usize; 2],
    pub entities: Vec<i32>,
}

impl Default for WorldSector {
    fn default() -> Self {
        Self {
            axis: -1,
            dist: 0.0,
            children: [usize::MAX; 2],
            entities: Vec::new(),
        }
    }
}

pub struct WorldSectors {
    pub sectors: Vec<WorldSector>,
}

impl WorldSectors {
    pub fn new() -> Self {
        Self {
            sectors: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.sectors.clear();
    }

    /// Build a uniformly subdivided tree over the world bounds.
    pub fn build(&mut self, mins: &Vec3, maxs: &Vec3) {
        self.sectors.clear();
        self.create_sector(0, mins, maxs);
    }

    fn create_sector(&mut self, depth: i32, mins: &Vec3, maxs: &Vec3) -> usize {
        let idx = self.sectors.len();
        self.sectors.push(WorldSector::default());

        if depth == AREA_DEPTH {
            return idx;
        }

        let size = [maxs[0] - mins[0], maxs[1] - mins[1], maxs[2] - mins[2]];
        let axis = if size[0] > size[1] { 0 } else { 1 };
        let dist = 0.5 * (maxs[axis] + mins[axis]);
        self.sectors[idx].axis = axis as i32;
        self.sectors[idx].dist = dist;

        let mut maxs1 = *maxs;
        let mut mins2 = *mins;
        maxs1[axis] = dist;
        mins2[axis] = dist;

        let child0 = self.create_sector(depth + 1, &mins2, maxs);
        let child1 = self.create_sector(depth + 1, mins, &maxs1);
        self.sectors[idx].children = [child0, child1];
        idx
    }

    /// The lowest sector whose split planes the box does not straddle.
    fn find_sector(&self, absmin: &Vec3, absmax: &Vec3) -> usize {
        let mut idx = 0;
        loop {
            let sector = &self.sectors[idx];
            if sector.axis == -1 {
                return idx;
            }
            let axis = sector.axis as usize;
            if absmin[axis] > sector.dist {
                idx = sector.children[0];
            } else if absmax[axis] < sector.dist {
                idx = sector.children[1];
            } else {
                return idx; // crosses the split plane, stays here
            }
        }
    }
}

impl Default for WorldSectors {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Linking
// ============================================================

/// Compute the absolute box and insert the entity into its world
/// sector chain. Called through the link-entity syscall whenever the
/// game moves an entity.
pub fn sv_link_entity(sv: &mut ServerContext, cm: &CModelContext, mem: &mut VmMemory, num: i32) {
    if num < 0 || num >= MAX_GENTITIES as i32 || sv.world.sectors.is_empty() {
        return;
    }
    if !sv.game_data_located() {
        return;
    }
    if sv.sv_entities[num as usize].world_sector != -1 {
        sv_unlink_entity(sv, mem, num); // unlink from the old position
    }

    let shared_base = sv.gentity_addr(num) + ENTITY_STATE_SIZE;
    let mut r = sv.entity_shared(mem, num);

    let (mut absmin, mut absmax);
    if r.bmodel {
        // brush models use the precompiled submodel bounds
        let state = sv.entity_state(mem, num);
        let (mins, maxs) = cm.model_bounds(cm.inline_model(state.modelindex));
        absmin = [0.0f32; 3];
        absmax = [0.0f32; 3];
        for i in 0..3 {
            absmin[i] = r.current_origin[i] + mins[i];
            absmax[i] = r.current_origin[i] + maxs[i];
        }
    } else {
        absmin = [0.0f32; 3];
        absmax = [0.0f32; 3];
        for i in 0..3 {
            absmin[i] = r.current_origin[i] + r.mins[i];
            absmax[i] = r.current_origin[i] + r.maxs[i];
        }
    }

    // movement is clipped an epsilon away from actual edges, so boxes
    // that do not quite touch must still be found
    for i in 0..3 {
        absmin[i] -= 1.0;
        absmax[i] += 1.0;
    }

    r.linkcount += 1;
    layout::write_entity_link_state(mem, shared_base, true, r.linkcount, &absmin, &absmax);

    let sector = sv.world.find_sector(&absmin, &absmax);
    sv.world.sectors[sector].entities.push(num);
    sv.sv_entities[num as usize].world_sector = sector as i32;
}

/// Remove the entity from its sector chain; a double unlink is a no-op.
pub fn sv_unlink_entity(sv: &mut ServerContext, mem: &mut VmMemory, num: i32) {
    if num < 0 || num >= MAX_GENTITIES as i32 {
        return;
    }
    let sector = sv.sv_entities[num as usize].world_sector;
    if sector < 0 {
        return; // not linked anywhere
    }
    sv.sv_entities[num as usize].world_sector = -1;
    if let Some(s) = sv.world.sectors.get_mut(sector as usize) {
        s.entities.retain(|&e| e != num);
    }

    if sv.game_data_located() {
        let shared_base = sv.gentity_addr(num) + ENTITY_STATE_SIZE;
        let r = sv.entity_shared(mem, num);
        layout::write_entity_link_state(mem, shared_base, false, r.linkcount, &r.absmin, &r.absmax);
    }
}

// ============================================================
// Queries
// ============================================================

/// Linked entities whose absolute boxes touch the query box, up to
/// `max_count`.
pub fn sv_entities_in_box(
    sv: &ServerContext,
    mem: &VmMemory,
    mins: &Vec3,
    maxs: &Vec3,
    max_count: usize,
) -> Vec<i32> {
    let mut list = Vec::new();
    if sv.world.sectors.is_empty() {
        return list;
    }
    area_entities_r(sv, mem, 0, mins, maxs, max_count, &mut list);
    list
}

fn area_entities_r(
    sv: &ServerContext,
    mem: &VmMemory,
    sector_idx: usize,
    mins: &Vec3,
    maxs: &Vec3,
    max_count: usize,
    list: &mut Vec<i32>,
) {
    let sector = &sv.world.sectors[sector_idx];

    for &num in &sector.entities {
        if list.len() >= max_count {
            return;
        }
        let r = sv.entity_shared(mem, num);
        if r.absmin[0] > maxs[0]
            || r.absmin[1] > maxs[1]
            || r.absmin[2] > maxs[2]
            || r.absmax[0] < mins[0]
            || r.absmax[1] < mins[1]
            || r.absmax[2] < mins[2]
        {
            continue;
        }
        list.push(num);
    }

    if sector.axis == -1 {
        return;
    }
    let axis = sector.axis as usize;
    if maxs[axis] > sector.dist {
        area_entities_r(sv, mem, sector.children[0], mins, maxs, max_count, list);
    }
    if mins[axis] < sector.dist {
        area_entities_r(sv, mem, sector.children[1], mins, maxs, max_count, list);
    }
}

/// Overlap test between a world-space box and an entity's absolute box.
pub fn sv_entity_contact(sv: &ServerContext, mem: &VmMemory, mins: &Vec3, maxs: &Vec3, num: i32) -> bool {
    if num < 0 || num >= MAX_GENTITIES as i32 {
        return false;
    }
    let r = sv.entity_shared(mem, num);
    if !r.linked {
        return false;
    }
    (0..3).all(|i| r.absmin[i] <= maxs[i] && r.absmax[i] >= mins[i])
}

// ============================================================
// Combined traces
// ============================================================

/// Moves the query through the world and every linked entity the move
/// could touch, keeping the nearest hit. `pass_entity` and anything it
/// owns (or that owns it) never block.
pub fn sv_trace(
    sv: &ServerContext,
    cm: &mut CModelContext,
    mem: &VmMemory,
    start: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    end: &Vec3,
    pass_entity: i32,
    contentmask: i32,
) -> Trace {
    // clip to the world
    let mut trace = cm.box_trace(start, end, mins, maxs, 0, contentmask);
    trace.entity_num = if trace.fraction != 1.0 {
        ENTITYNUM_WORLD
    } else {
        ENTITYNUM_NONE
    };
    if trace.fraction == 0.0 {
        return trace; // blocked immediately by the world
    }

    // bounds of the whole move, spread for the epsilon clip
    let mut boxmins = [0.0f32; 3];
    let mut boxmaxs = [0.0f32; 3];
    for i in 0..3 {
        if end[i] > start[i] {
            boxmins[i] = start[i] + mins[i] - 1.0;
            boxmaxs[i] = end[i] + maxs[i] + 1.0;
        } else {
            boxmins[i] = end[i] + mins[i] - 1.0;
            boxmaxs[i] = start[i] + maxs[i] + 1.0;
        }
    }

    let touchlist = sv_entities_in_box(sv, mem, &boxmins, &boxmaxs, MAX_GENTITIES);

    let pass_owner = if pass_entity >= 0 && pass_entity < MAX_GENTITIES as i32 {
        sv.entity_shared(mem, pass_entity).owner_num
    } else {
        -1
    };

    for touch in touchlist {
        if trace.allsolid {
            break;
        }
        if pass_entity >= 0 {
            if touch == pass_entity {
                continue;
            }
            let r = sv.entity_shared(mem, touch);
            if r.owner_num == pass_entity {
                continue; // don't clip against own missiles
            }
            if touch == pass_owner {
                continue; // don't clip against the owner
            }
        }
        let r = sv.entity_shared(mem, touch);
        if r.contents & contentmask == 0 {
            continue;
        }

        let (handle, origin, angles) = clip_handle_for_entity(sv, cm, mem, touch, &r);
        let tr = cm.transformed_box_trace(
            start,
            end,
            mins,
            maxs,
            handle,
            contentmask,
            &origin,
            &angles,
        );

        if tr.allsolid {
            trace.allsolid = true;
            trace.entity_num = touch;
        } else if tr.startsolid {
            trace.startsolid = true;
            trace.entity_num = touch;
        }
        if tr.fraction < trace.fraction {
            let old_start = trace.startsolid;
            trace = tr;
            trace.entity_num = touch;
            trace.startsolid |= old_start;
        }
    }

    trace
}

/// World contents ORed with the contents of every linked entity whose
/// clip model contains the point.
pub fn sv_point_contents(
    sv: &ServerContext,
    cm: &mut CModelContext,
    mem: &VmMemory,
    point: &Vec3,
    pass_entity: i32,
) -> i32 {
    let mut contents = cm.point_contents(point, 0);

    let touchlist = sv_entities_in_box(sv, mem, point, point, MAX_GENTITIES);
    for touch in touchlist {
        if touch == pass_entity {
            continue;
        }
        let r = sv.entity_shared(mem, touch);
        let (handle, origin, angles) = clip_handle_for_entity(sv, cm, mem, touch, &r);
        let c = cm.transformed_point_contents(point, handle, &origin, &angles);
        if r.bmodel {
            contents |= c;
        } else if c != 0 {
            // the temp box stands in for the entity; report its
            // declared contents, not the box brush's
            contents |= r.contents;
        }
    }
    contents
}

fn clip_handle_for_entity(
    sv: &ServerContext,
    cm: &mut CModelContext,
    mem: &VmMemory,
    num: i32,
    r: &myq3_common::q_shared::EntityShared,
) -> (myq3_common::cmodel::ClipHandle, Vec3, Vec3) {
    if r.bmodel {
        let state = sv.entity_state(mem, num);
        (
            cm.inline_model(state.modelindex),
            r.current_origin,
            r.current_angles,
        )
    } else {
        // explicit box: never rotated
        (
            cm.temp_box_model(&r.mins, &r.maxs),
            r.current_origin,
            [0.0; 3],
        )
    }
}

/// Wire a brush submodel ("*2") to an entity: model index, bounds, and
/// linkage all follow from the name.
pub fn sv_set_brush_model(
    sv: &mut ServerContext,
    cm: &CModelContext,
    mem: &mut VmMemory,
    num: i32,
    name: &str,
) {
    if !name.starts_with('*') {
        return;
    }
    let index: i32 = match name[1..].parse() {
        Ok(i) => i,
        Err(_) => return,
    };
    if !sv.game_data_located() {
        return;
    }

    let base = sv.gentity_addr(num);
    let (mins, maxs) = cm.model_bounds(cm.inline_model(index));

    let mut state = sv.entity_state(mem, num);
    state.modelindex = index;
    layout::write_entity_state(mem, base, &state);

    let mut r = sv.entity_shared(mem, num);
    r.bmodel = true;
    r.mins = mins;
    r.maxs = maxs;
    r.contents = -1; // clips against everything until the game refines it
    layout::write_entity_shared(mem, base + ENTITY_STATE_SIZE, &r);
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use myq3_common::q_shared::{EntityShared, EntityState, CONTENTS_BODY, MASK_PLAYERSOLID};
    use myq3_vm::layout::SHARED_ENTITY_SIZE;

    struct World {
        sv: ServerContext,
        cm: CModelContext,
        mem: VmMemory,
    }

    fn world() -> World {
        let mut sv = ServerContext::new();
        sv.entity_base = 0;
        sv.entity_size = SHARED_ENTITY_SIZE;
        sv.num_entities = 16;
        sv.world.build(&[-4096.0; 3], &[4096.0; 3]);
        World {
            sv,
            cm: CModelContext::new(),
            mem: VmMemory::new(1 << 20),
        }
    }

    fn place_entity(w: &mut World, num: i32, origin: Vec3, half: f32) {
        let base = w.sv.gentity_addr(num);
        let state = EntityState {
            number: num,
            ..Default::default()
        };
        layout::write_entity_state(&mut w.mem, base, &state);
        let r = EntityShared {
            mins: [-half; 3],
            maxs: [half; 3],
            contents: CONTENTS_BODY,
            current_origin: origin,
            owner_num: ENTITYNUM_NONE,
            ..Default::default()
        };
        layout::write_entity_shared(&mut w.mem, base + ENTITY_STATE_SIZE, &r);
    }

    #[test]
    fn test_link_then_query_then_unlink() {
        let mut w = world();
        place_entity(&mut w, 5, [100.0, 0.0, 0.0], 16.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 5);

        let r = w.sv.entity_shared(&w.mem, 5);
        assert!(r.linked);
        assert_eq!(r.linkcount, 1);
        assert_eq!(r.absmin, [83.0, -17.0, -17.0]); // spread by one unit

        let hits = sv_entities_in_box(
            &w.sv,
            &w.mem,
            &[50.0, -50.0, -50.0],
            &[150.0, 50.0, 50.0],
            64,
        );
        assert_eq!(hits, vec![5]);

        // a disjoint query box misses
        let miss = sv_entities_in_box(
            &w.sv,
            &w.mem,
            &[500.0, 500.0, 500.0],
            &[600.0, 600.0, 600.0],
            64,
        );
        assert!(miss.is_empty());

        sv_unlink_entity(&mut w.sv, &mut w.mem, 5);
        assert!(!w.sv.entity_shared(&w.mem, 5).linked);
        let hits = sv_entities_in_box(
            &w.sv,
            &w.mem,
            &[50.0, -50.0, -50.0],
            &[150.0, 50.0, 50.0],
            64,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_relink_moves_entity() {
        let mut w = world();
        place_entity(&mut w, 3, [0.0, 0.0, 0.0], 8.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 3);

        // move it far away and relink
        place_entity(&mut w, 3, [2000.0, 2000.0, 0.0], 8.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 3);

        let near_origin =
            sv_entities_in_box(&w.sv, &w.mem, &[-32.0; 3], &[32.0; 3], 64);
        assert!(near_origin.is_empty());
        let near_dest = sv_entities_in_box(
            &w.sv,
            &w.mem,
            &[1900.0, 1900.0, -32.0],
            &[2100.0, 2100.0, 32.0],
            64,
        );
        assert_eq!(near_dest, vec![3]);
        // relink bumped the link count
        assert_eq!(w.sv.entity_shared(&w.mem, 3).linkcount, 2);
    }

    #[test]
    fn test_entity_contact_matches_overlap() {
        let mut w = world();
        place_entity(&mut w, 7, [0.0, 0.0, 0.0], 10.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 7);

        // agree with a brute-force AABB overlap against absmin/absmax
        let r = w.sv.entity_shared(&w.mem, 7);
        let cases: [([f32; 3], [f32; 3]); 3] = [
            ([-5.0, -5.0, -5.0], [5.0, 5.0, 5.0]),
            ([10.5, 0.0, 0.0], [20.0, 1.0, 1.0]),
            ([50.0, 50.0, 50.0], [60.0, 60.0, 60.0]),
        ];
        for (mins, maxs) in cases {
            let brute = (0..3)
                .all(|i| r.absmin[i] <= maxs[i] && r.absmax[i] >= mins[i]);
            assert_eq!(
                sv_entity_contact(&w.sv, &w.mem, &mins, &maxs, 7),
                brute,
                "box {:?}..{:?}",
                mins,
                maxs
            );
        }
    }

    #[test]
    fn test_trace_hits_entity() {
        let mut w = world();
        place_entity(&mut w, 9, [100.0, 0.0, 0.0], 16.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 9);

        let tr = sv_trace(
            &w.sv,
            &mut w.cm,
            &w.mem,
            &[0.0, 0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            &[200.0, 0.0, 0.0],
            -1,
            MASK_PLAYERSOLID,
        );
        assert_eq!(tr.entity_num, 9);
        assert!(tr.fraction < 1.0);
        assert!((tr.endpos[0] - 84.0).abs() < 0.5, "endpos {:?}", tr.endpos);
    }

    #[test]
    fn test_trace_skips_pass_entity() {
        let mut w = world();
        place_entity(&mut w, 9, [100.0, 0.0, 0.0], 16.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 9);

        let tr = sv_trace(
            &w.sv,
            &mut w.cm,
            &w.mem,
            &[0.0, 0.0, 0.0],
            &[0.0; 3],
            &[0.0; 3],
            &[200.0, 0.0, 0.0],
            9, // tracing on behalf of the blocking entity itself
            MASK_PLAYERSOLID,
        );
        assert_eq!(tr.fraction, 1.0);
        assert_eq!(tr.entity_num, ENTITYNUM_NONE);
    }

    #[test]
    fn test_trace_with_no_world_is_clean_miss() {
        let mut w = world();
        let tr = sv_trace(
            &w.sv,
            &mut w.cm,
            &w.mem,
            &[0.0; 3],
            &[0.0; 3],
            &[0.0; 3],
            &[100.0, 0.0, 0.0],
            -1,
            MASK_PLAYERSOLID,
        );
        assert_eq!(tr.fraction, 1.0);
        assert_eq!(tr.entity_num, ENTITYNUM_NONE);
        assert!(!tr.startsolid && !tr.allsolid);
    }

    #[test]
    fn test_point_contents_includes_entity() {
        let mut w = world();
        place_entity(&mut w, 4, [0.0, 0.0, 0.0], 32.0);
        sv_link_entity(&mut w.sv, &w.cm, &mut w.mem, 4);

        let c = sv_point_contents(&w.sv, &mut w.cm, &w.mem, &[0.0, 0.0, 0.0], -1);
        assert_eq!(c & CONTENTS_BODY, CONTENTS_BODY);
        let c = sv_point_contents(&w.sv, &mut w.cm, &w.mem, &[500.0, 0.0, 0.0], -1);
        assert_eq!(c, 0);
    }
}
