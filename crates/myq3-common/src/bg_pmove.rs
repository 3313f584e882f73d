// bg_pmove.rs — player movement
//
// Deterministic acceleration / friction / gravity with iterated
// slide-and-clip. Both the authoritative tick and client prediction run
// this code, so every constant here is a simulation contract: changing
// one changes player feel visibly.

use crate::q_shared::{
    angle_vectors, dot_product, short2angle, vector_ma, vector_normalize, PlayerState, Trace,
    UserCmd, Vec3, ENTITYNUM_NONE, PITCH, VEC3_ORIGIN,
};

// movement parameters
const PM_STOPSPEED: f32 = 100.0;
const PM_FRICTION: f32 = 6.0;
const PM_ACCELERATE: f32 = 10.0;
const PM_AIRACCELERATE: f32 = 1.0;
// in the air the wish speed is capped so strafing cannot outrun gravity
const PM_AIR_SPEED_CAP: f32 = 30.0;

pub const JUMP_VELOCITY: f32 = 270.0;
const JUMP_THRESHOLD: i8 = 10;

const OVERCLIP: f32 = 1.001;
const STOP_EPSILON: f32 = 0.1;
const MIN_WALK_NORMAL: f32 = 0.7; // steeper slopes are not ground
const GROUND_PROBE: f32 = 0.25;

const MAX_CLIP_PLANES: usize = 5;
pub const MAX_TOUCH_ENTS: usize = 32;

// default player box
pub const PLAYER_MINS: Vec3 = [-15.0, -15.0, -24.0];
pub const PLAYER_MAXS: Vec3 = [15.0, 15.0, 32.0];

/// Collision queries the movement code needs, supplied by the caller;
/// the server clips against world plus entities, prediction against the
/// locally known world.
pub trait PmoveTraces {
    fn trace(&self, start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> Trace;
    fn point_contents(&self, point: &Vec3) -> i32;
}

/// In/out block for one movement call.
pub struct PlayerMove {
    pub ps: PlayerState,
    pub cmd: UserCmd,
    pub trace_mask: i32,
    pub mins: Vec3,
    pub maxs: Vec3,

    // results
    pub num_touch: usize,
    pub touch_ents: [i32; MAX_TOUCH_ENTS],
    pub ground_plane: bool,
    pub walking: bool,
}

impl PlayerMove {
    pub fn new(ps: PlayerState, cmd: UserCmd, trace_mask: i32) -> Self {
        Self {
            ps,
            cmd,
            trace_mask,
            mins: PLAYER_MINS,
            maxs: PLAYER_MAXS,
            num_touch: 0,
            touch_ents: [ENTITYNUM_NONE; MAX_TOUCH_ENTS],
            ground_plane: false,
            walking: false,
        }
    }
}

// per-move scratch state, zeroed before each move
struct PmLocal {
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    frametime: f32,
    ground_trace: Trace,
}

struct PmoveContext<'a, T: PmoveTraces> {
    pm: &'a mut PlayerMove,
    pml: PmLocal,
    tr: &'a T,
}

/// Slide off of the impacting surface.
fn clip_velocity(inv: &Vec3, normal: &Vec3, overbounce: f32) -> Vec3 {
    let backoff = dot_product(inv, normal) * overbounce;
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        out[i] = inv[i] - normal[i] * backoff;
        if out[i] > -STOP_EPSILON && out[i] < STOP_EPSILON {
            out[i] = 0.0;
        }
    }
    out
}

impl<'a, T: PmoveTraces> PmoveContext<'a, T> {
    fn add_touch_ent(&mut self, entity_num: i32) {
        if entity_num == ENTITYNUM_NONE {
            return;
        }
        if self.pm.num_touch >= MAX_TOUCH_ENTS {
            return;
        }
        if self.pm.touch_ents[..self.pm.num_touch].contains(&entity_num) {
            return;
        }
        self.pm.touch_ents[self.pm.num_touch] = entity_num;
        self.pm.num_touch += 1;
    }

    // --------------------------------------------------------
    // View angles — command angles plus the server-set deltas,
    // pitch held inside the visible range
    // --------------------------------------------------------
    fn update_viewangles(&mut self) {
        for i in 0..3 {
            let v = (self.pm.cmd.angles[i] + self.pm.ps.delta_angles[i]) & 65535;
            let mut a = short2angle(v);
            if a > 180.0 {
                a -= 360.0;
            }
            if i == PITCH {
                a = a.clamp(-89.0, 89.0);
            }
            self.pm.ps.viewangles[i] = a;
        }
    }

    // --------------------------------------------------------
    // Ground test — probe a quarter unit down; only planes flatter
    // than MIN_WALK_NORMAL count as ground
    // --------------------------------------------------------
    fn ground_trace(&mut self) {
        let mut point = self.pm.ps.origin;
        point[2] -= GROUND_PROBE;

        let trace = self
            .tr
            .trace(&self.pm.ps.origin, &self.pm.mins, &self.pm.maxs, &point);

        if trace.fraction == 1.0 {
            self.pm.ps.ground_entity_num = ENTITYNUM_NONE;
            self.pm.ground_plane = false;
            self.pm.walking = false;
            return;
        }

        if trace.plane.normal[2] < MIN_WALK_NORMAL {
            // touching, but too steep to stand on
            self.pm.ps.ground_entity_num = ENTITYNUM_NONE;
            self.pm.ground_plane = true;
            self.pm.walking = false;
            self.pml.ground_trace = trace;
            return;
        }

        self.pm.ps.ground_entity_num = trace.entity_num;
        self.pm.ground_plane = true;
        self.pm.walking = true;
        self.add_touch_ent(trace.entity_num);
        self.pml.ground_trace = trace;
    }

    // --------------------------------------------------------
    // Friction
    // --------------------------------------------------------
    fn friction(&mut self) {
        let vel = &mut self.pm.ps.velocity;
        let speed = dot_product(vel, vel).sqrt();
        if speed < 1.0 {
            vel[0] = 0.0;
            vel[1] = 0.0;
            return;
        }

        let control = if speed < PM_STOPSPEED { PM_STOPSPEED } else { speed };
        let drop = control * PM_FRICTION * self.pml.frametime;

        let mut newspeed = speed - drop;
        if newspeed < 0.0 {
            newspeed = 0.0;
        }
        newspeed /= speed;

        vel[0] *= newspeed;
        vel[1] *= newspeed;
        vel[2] *= newspeed;
    }

    // --------------------------------------------------------
    // Acceleration
    // --------------------------------------------------------
    fn accelerate(&mut self, wishdir: &Vec3, wishspeed: f32, accel: f32) {
        let currentspeed = dot_product(&self.pm.ps.velocity, wishdir);
        let addspeed = wishspeed - currentspeed;
        if addspeed <= 0.0 {
            return;
        }
        let mut accelspeed = accel * self.pml.frametime * wishspeed;
        if accelspeed > addspeed {
            accelspeed = addspeed;
        }
        for i in 0..3 {
            self.pm.ps.velocity[i] += accelspeed * wishdir[i];
        }
    }

    fn air_accelerate(&mut self, wishdir: &Vec3, wishspeed: f32, accel: f32) {
        let wishspd = wishspeed.min(PM_AIR_SPEED_CAP);
        let currentspeed = dot_product(&self.pm.ps.velocity, wishdir);
        let addspeed = wishspd - currentspeed;
        if addspeed <= 0.0 {
            return;
        }
        let mut accelspeed = accel * wishspeed * self.pml.frametime;
        if accelspeed > addspeed {
            accelspeed = addspeed;
        }
        for i in 0..3 {
            self.pm.ps.velocity[i] += accelspeed * wishdir[i];
        }
    }

    /// Scale factor so a full diagonal command still tops out at
    /// ps.speed rather than speed * sqrt(2).
    fn cmd_scale(&self) -> f32 {
        let cmd = &self.pm.cmd;
        let mut max = (cmd.forwardmove as i32).abs();
        if (cmd.rightmove as i32).abs() > max {
            max = (cmd.rightmove as i32).abs();
        }
        if (cmd.upmove as i32).abs() > max {
            max = (cmd.upmove as i32).abs();
        }
        if max == 0 {
            return 0.0;
        }
        let total = ((cmd.forwardmove as f32).powi(2)
            + (cmd.rightmove as f32).powi(2)
            + (cmd.upmove as f32).powi(2))
        .sqrt();
        self.pm.ps.speed as f32 * max as f32 / (127.0 * total)
    }

    /// Wish direction and speed from the command, projected onto the
    /// ground plane (movement keys never tilt the path).
    fn wish_move(&mut self) -> (Vec3, f32) {
        let scale = self.cmd_scale();
        let fmove = self.pm.cmd.forwardmove as f32;
        let smove = self.pm.cmd.rightmove as f32;

        let mut forward = self.pml.forward;
        let mut right = self.pml.right;
        forward[2] = 0.0;
        right[2] = 0.0;
        vector_normalize(&mut forward);
        vector_normalize(&mut right);

        let mut wishvel = [0.0f32; 3];
        for i in 0..3 {
            wishvel[i] = forward[i] * fmove + right[i] * smove;
        }
        wishvel[2] = 0.0;

        let mut wishdir = wishvel;
        let wishspeed = vector_normalize(&mut wishdir) * scale;
        (wishdir, wishspeed)
    }

    // --------------------------------------------------------
    // Slide-and-clip — up to four bumps; velocity is clipped
    // against every plane hit, and zeroed if it ever points back
    // into one of them
    // --------------------------------------------------------
    fn slide_move(&mut self) {
        let primal_velocity = self.pm.ps.velocity;
        let mut planes = [[0.0f32; 3]; MAX_CLIP_PLANES];
        let mut numplanes = 0usize;
        let mut time_left = self.pml.frametime;

        for _bump in 0..4 {
            if self.pm.ps.velocity == VEC3_ORIGIN {
                break;
            }
            let end = vector_ma(&self.pm.ps.origin, time_left, &self.pm.ps.velocity);
            let trace = self
                .tr
                .trace(&self.pm.ps.origin, &self.pm.mins, &self.pm.maxs, &end);

            if trace.allsolid {
                // trapped in a solid; keep horizontal motion for next frame
                self.pm.ps.velocity[2] = 0.0;
                return;
            }

            if trace.fraction > 0.0 {
                self.pm.ps.origin = trace.endpos;
            }
            if trace.fraction == 1.0 {
                break; // moved the entire distance
            }

            self.add_touch_ent(trace.entity_num);

            time_left -= time_left * trace.fraction;

            if numplanes >= MAX_CLIP_PLANES {
                self.pm.ps.velocity = VEC3_ORIGIN;
                break;
            }
            planes[numplanes] = trace.plane.normal;
            numplanes += 1;

            // find a clip that does not re-enter any earlier plane
            let mut found = false;
            for i in 0..numplanes {
                let clipped = clip_velocity(&self.pm.ps.velocity, &planes[i], OVERCLIP);
                let reenters = (0..numplanes)
                    .any(|j| j != i && dot_product(&clipped, &planes[j]) < 0.0);
                if !reenters {
                    self.pm.ps.velocity = clipped;
                    found = true;
                    break;
                }
            }
            if !found {
                self.pm.ps.velocity = VEC3_ORIGIN;
                break;
            }

            // dead stop rather than oscillating into a corner
            if dot_product(&self.pm.ps.velocity, &primal_velocity) <= 0.0 {
                self.pm.ps.velocity = VEC3_ORIGIN;
                break;
            }
        }
    }

    // --------------------------------------------------------
    // Ground movement
    // --------------------------------------------------------
    fn walk_move(&mut self) {
        self.friction();

        let (wishdir, wishspeed) = self.wish_move();
        self.accelerate(&wishdir, wishspeed, PM_ACCELERATE);

        if self.pm.cmd.upmove >= JUMP_THRESHOLD {
            // launch; gravity takes over next frame
            self.pm.ps.velocity[2] = JUMP_VELOCITY;
            self.pm.ps.ground_entity_num = ENTITYNUM_NONE;
            self.pm.walking = false;
            self.pm.ground_plane = false;
        } else {
            self.pm.ps.velocity[2] = 0.0;
        }

        self.slide_move();
    }

    // --------------------------------------------------------
    // Air movement
    // --------------------------------------------------------
    fn air_move(&mut self) {
        self.pm.ps.velocity[2] -= self.pm.ps.gravity as f32 * self.pml.frametime;

        let (wishdir, wishspeed) = self.wish_move();
        self.air_accelerate(&wishdir, wishspeed, PM_AIRACCELERATE);

        self.slide_move();
    }
}

/// Run one movement command against the previous player state. A
/// command whose time delta falls outside (0, 200] ms is refused and
/// the state is returned unchanged.
pub fn pmove<T: PmoveTraces>(pm: &mut PlayerMove, tr: &T) {
    let msec = pm.cmd.server_time - pm.ps.command_time;
    if msec <= 0 || msec > 200 {
        return;
    }
    pm.ps.command_time = pm.cmd.server_time;
    pm.num_touch = 0;

    let mut ctx = PmoveContext {
        pm,
        pml: PmLocal {
            forward: [0.0; 3],
            right: [0.0; 3],
            up: [0.0; 3],
            frametime: msec as f32 * 0.001,
            ground_trace: Trace::default(),
        },
        tr,
    };

    ctx.update_viewangles();
    angle_vectors(
        &ctx.pm.ps.viewangles,
        Some(&mut ctx.pml.forward),
        Some(&mut ctx.pml.right),
        Some(&mut ctx.pml.up),
    );

    ctx.ground_trace();

    if ctx.pm.walking {
        ctx.walk_move();
    } else {
        ctx.air_move();
    }

    // set the final ground state for the next frame's prediction
    ctx.ground_trace();
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::q_shared::{CPlane, MASK_PLAYERSOLID};

    /// Infinite floor: the half space z <= top is solid.
    struct FloorWorld {
        top: f32,
    }

    impl PmoveTraces for FloorWorld {
        fn trace(&self, start: &Vec3, mins: &Vec3, _maxs: &Vec3, end: &Vec3) -> Trace {
            let mut tr = Trace::default();
            let d1 = (start[2] + mins[2]) - self.top;
            let d2 = (end[2] + mins[2]) - self.top;

            if d1 < 0.0 && d2 < 0.0 {
                tr.allsolid = true;
                tr.startsolid = true;
                tr.fraction = 0.0;
                tr.endpos = *start;
                return tr;
            }
            if d2 >= 0.0 {
                tr.endpos = *end;
                return tr; // stays above the floor
            }
            tr.fraction = (d1 / (d1 - d2)).clamp(0.0, 1.0);
            for i in 0..3 {
                tr.endpos[i] = start[i] + tr.fraction * (end[i] - start[i]);
            }
            tr.plane = CPlane {
                normal: [0.0, 0.0, 1.0],
                dist: self.top,
                plane_type: 2,
                signbits: 0,
            };
            tr.entity_num = crate::q_shared::ENTITYNUM_WORLD;
            tr
        }

        fn point_contents(&self, point: &Vec3) -> i32 {
            if point[2] <= self.top {
                crate::q_shared::CONTENTS_SOLID
            } else {
                0
            }
        }
    }

    // player box bottom is at origin.z - 24; floor top 40 puts a
    // standing player's origin at exactly 64
    fn standing_state() -> PlayerState {
        PlayerState {
            origin: [0.0, 0.0, 64.0],
            velocity: [0.0; 3],
            ..Default::default()
        }
    }

    fn cmd_at(time: i32) -> UserCmd {
        UserCmd {
            server_time: time,
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_bad_time_delta() {
        let world = FloorWorld { top: 40.0 };
        let ps = standing_state();

        let mut pm = PlayerMove::new(ps, cmd_at(0), MASK_PLAYERSOLID);
        pmove(&mut pm, &world);
        assert_eq!(pm.ps.command_time, 0); // zero delta refused

        let mut pm = PlayerMove::new(ps, cmd_at(201), MASK_PLAYERSOLID);
        pmove(&mut pm, &world);
        assert_eq!(pm.ps.command_time, 0); // oversize delta refused

        let mut pm = PlayerMove::new(ps, cmd_at(50), MASK_PLAYERSOLID);
        pmove(&mut pm, &world);
        assert_eq!(pm.ps.command_time, 50);
    }

    #[test]
    fn test_standing_still_is_stable() {
        let world = FloorWorld { top: 40.0 };
        let mut pm = PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);

        for tick in 1..=20 {
            pm.cmd = cmd_at(tick * 50);
            pmove(&mut pm, &world);
        }
        assert!((pm.ps.origin[2] - 64.0).abs() < 0.001, "{:?}", pm.ps.origin);
        assert_eq!(pm.ps.velocity, [0.0, 0.0, 0.0]);
        assert_ne!(pm.ps.ground_entity_num, ENTITYNUM_NONE);
    }

    #[test]
    fn test_jump_sets_impulse_and_clears_ground() {
        let world = FloorWorld { top: 40.0 };
        let mut pm = PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);
        pm.cmd = cmd_at(50);
        pm.cmd.upmove = 20;

        pmove(&mut pm, &world);

        assert_eq!(pm.ps.velocity[2], JUMP_VELOCITY);
        assert_eq!(pm.ps.ground_entity_num, ENTITYNUM_NONE);
    }

    #[test]
    fn test_jump_below_threshold_does_nothing() {
        let world = FloorWorld { top: 40.0 };
        let mut pm = PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);
        pm.cmd = cmd_at(50);
        pm.cmd.upmove = 5;

        pmove(&mut pm, &world);
        assert_eq!(pm.ps.velocity[2], 0.0);
        assert_ne!(pm.ps.ground_entity_num, ENTITYNUM_NONE);
    }

    #[test]
    fn test_gravity_pulls_falling_player() {
        let world = FloorWorld { top: -10000.0 };
        let mut ps = standing_state();
        ps.origin = [0.0, 0.0, 1000.0];
        let mut pm = PlayerMove::new(ps, cmd_at(50), MASK_PLAYERSOLID);

        pmove(&mut pm, &world);
        assert_eq!(pm.ps.velocity[2], -800.0 * 0.05);
        assert!(pm.ps.origin[2] < 1000.0);
    }

    #[test]
    fn test_falling_player_lands() {
        let world = FloorWorld { top: 40.0 };
        let mut ps = standing_state();
        ps.origin = [0.0, 0.0, 200.0];
        let mut pm = PlayerMove::new(ps, UserCmd::default(), MASK_PLAYERSOLID);

        for tick in 1..=40 {
            pm.cmd = cmd_at(tick * 50);
            pmove(&mut pm, &world);
        }
        assert!((pm.ps.origin[2] - 64.0).abs() < 0.5, "{:?}", pm.ps.origin);
        assert_eq!(pm.ps.velocity[2], 0.0);
        assert_ne!(pm.ps.ground_entity_num, ENTITYNUM_NONE);
    }

    #[test]
    fn test_ground_friction_decay() {
        let world = FloorWorld { top: 40.0 };
        let mut ps = standing_state();
        ps.velocity = [100.0, 0.0, 0.0];
        let mut pm = PlayerMove::new(ps, cmd_at(50), MASK_PLAYERSOLID);

        pmove(&mut pm, &world);
        // drop = max(speed, stopspeed) * friction * dt = 100*6*0.05 = 30
        assert!((pm.ps.velocity[0] - 70.0).abs() < 0.01, "{:?}", pm.ps.velocity);
    }

    #[test]
    fn test_ground_acceleration() {
        let world = FloorWorld { top: 40.0 };
        let mut pm = PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);
        pm.cmd = cmd_at(50);
        pm.cmd.forwardmove = 127;

        pmove(&mut pm, &world);
        // accel = min(wishspeed - 0, a*dt*wishspeed) = min(320, 160) = 160
        // along +x since all angles are zero
        assert!((pm.ps.velocity[0] - 160.0).abs() < 0.01, "{:?}", pm.ps.velocity);
        assert_eq!(pm.ps.velocity[1], 0.0);
    }

    #[test]
    fn test_air_wishspeed_is_capped() {
        let world = FloorWorld { top: -10000.0 };
        let mut ps = standing_state();
        ps.origin = [0.0, 0.0, 1000.0];
        let mut pm = PlayerMove::new(ps, UserCmd::default(), MASK_PLAYERSOLID);
        pm.cmd = cmd_at(50);
        pm.cmd.forwardmove = 127;

        pmove(&mut pm, &world);
        // air accelspeed = 1.0 * 320 * 0.05 = 16, under the 30 cap
        assert!((pm.ps.velocity[0] - 16.0).abs() < 0.01, "{:?}", pm.ps.velocity);
        // a second frame would be capped at 30 total
        pm.cmd = cmd_at(100);
        pmove(&mut pm, &world);
        assert!(pm.ps.velocity[0] <= PM_AIR_SPEED_CAP + 0.01);
    }

    #[test]
    fn test_pitch_clamped() {
        let world = FloorWorld { top: 40.0 };
        let mut pm = PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);
        pm.cmd = cmd_at(50);
        pm.cmd.angles[PITCH] = crate::q_shared::angle2short(120.0);

        pmove(&mut pm, &world);
        assert_eq!(pm.ps.viewangles[PITCH], 89.0);
    }

    #[test]
    fn test_move_is_deterministic() {
        let run = || {
            let world = FloorWorld { top: 40.0 };
            let mut pm =
                PlayerMove::new(standing_state(), UserCmd::default(), MASK_PLAYERSOLID);
            for tick in 1..=30 {
                pm.cmd = cmd_at(tick * 50);
                pm.cmd.forwardmove = if tick % 3 == 0 { 127 } else { -50 };
                pm.cmd.rightmove = (tick % 7) as i8 * 10;
                pm.cmd.upmove = if tick == 10 { 20 } else { 0 };
                pm.cmd.angles[1] = crate::q_shared::angle2short(tick as f32 * 13.0);
                pmove(&mut pm, &world);
            }
            pm.ps
        };
        let a = run();
        let b = run();
        for i in 0..3 {
            assert_eq!(a.origin[i].to_bits(), b.origin[i].to_bits());
            assert_eq!(a.velocity[i].to_bits(), b.velocity[i].to_bits());
        }
        assert_eq!(a.command_time, b.command_time);
    }
}
