// sv_game.rs — the game module's import table
//
// Every numbered syscall the game VM can make lands here. Pointer
// arguments are VM addresses, dereferenced through the sandboxed
// memory; structured results are written back at the layout offsets.
// Handlers never panic: bad arguments log and return a sentinel.

use crate::server::{ClientConnState, ServerContext};
use crate::sv_snapshot::sv_send_server_command;
use crate::sv_world::{
    sv_entities_in_box, sv_entity_contact, sv_link_entity, sv_point_contents, sv_set_brush_model,
    sv_trace, sv_unlink_entity,
};
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::{CvarContext, CvarFlags};
use myq3_common::engine_api::{ClockRef, ConsoleRef, FileSystemRef};
use myq3_common::q_shared::{
    angle_vectors, matrix_multiply, perpendicular_vector, snap_vector, Vec3, MAX_CONFIGSTRINGS,
};
use myq3_vm::layout;
use myq3_vm::syscalls::*;
use myq3_vm::vm::{Syscalls, VmMemory, MAX_VMSYSCALL_ARGS};
use myq3_vm::Vm;

/// Host side of the game VM boundary, assembled per entry-point call
/// from the engine's subsystems.
pub struct GameHost<'a> {
    pub sv: &'a mut ServerContext,
    pub cm: &'a mut CModelContext,
    pub cvars: &'a mut CvarContext,
    pub cmds: &'a mut CmdContext,
    pub console: ConsoleRef,
    pub fs: FileSystemRef,
    pub clock: ClockRef,
    abort: bool,
}

impl<'a> GameHost<'a> {
    pub fn new(
        sv: &'a mut ServerContext,
        cm: &'a mut CModelContext,
        cvars: &'a mut CvarContext,
        cmds: &'a mut CmdContext,
        console: &ConsoleRef,
        fs: &FileSystemRef,
        clock: &ClockRef,
    ) -> Self {
        Self {
            sv,
            cm,
            cvars,
            cmds,
            console: console.clone(),
            fs: fs.clone(),
            clock: clock.clone(),
            abort: false,
        }
    }
}

/// Invoke a game VM entry point with the full host boundary attached.
pub fn game_call(
    vm: &mut Vm,
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    args: &[i32],
) -> i32 {
    let mut host = GameHost::new(sv, cm, cvars, cmds, console, fs, clock);
    vm.call(&mut host, args)
}

fn read_vec_or_zero(mem: &VmMemory, addr: i32) -> Vec3 {
    if addr == 0 {
        [0.0; 3]
    } else {
        layout::read_vec3(mem, addr)
    }
}

fn f(arg: i32) -> f32 {
    f32::from_bits(arg as u32)
}

fn r(v: f32) -> i32 {
    v.to_bits() as i32
}

impl Syscalls for GameHost<'_> {
    fn abort_requested(&self) -> bool {
        self.abort
    }

    fn syscall(&mut self, mem: &mut VmMemory, args: &[i32; MAX_VMSYSCALL_ARGS]) -> i32 {
        match args[0] {
            G_PRINT => {
                self.console.print(&mem.read_string(args[1]));
                0
            }
            G_ERROR => {
                self.console.error(&mem.read_string(args[1]));
                self.abort = true;
                0
            }
            G_MILLISECONDS => self.clock.milliseconds(),

            G_CVAR_REGISTER => {
                let name = mem.read_string(args[2]);
                let default = mem.read_string(args[3]);
                let flags = CvarFlags::from_bits_truncate(args[4]);
                if let Some(handle) = self.cvars.get(&name, &default, flags) {
                    if args[1] != 0 {
                        let var = &self.cvars.vars[handle];
                        layout::write_vm_cvar(
                            mem,
                            args[1],
                            handle as i32,
                            var.modification_count,
                            var.value,
                            var.integer,
                            &var.string,
                        );
                    }
                }
                0
            }
            G_CVAR_UPDATE => {
                let handle = layout::read_vm_cvar_handle(mem, args[1]);
                if let Some(var) = self.cvars.vars.get(handle as usize) {
                    layout::write_vm_cvar(
                        mem,
                        args[1],
                        handle,
                        var.modification_count,
                        var.value,
                        var.integer,
                        &var.string,
                    );
                }
                0
            }
            G_CVAR_SET => {
                let name = mem.read_string(args[1]);
                let value = mem.read_string(args[2]);
                self.cvars.set(&name, &value);
                0
            }
            G_CVAR_VARIABLE_INTEGER_VALUE => {
                self.cvars.variable_integer(&mem.read_string(args[1]))
            }
            G_CVAR_VARIABLE_STRING_BUFFER => {
                let value = self
                    .cvars
                    .variable_string(&mem.read_string(args[1]))
                    .to_string();
                mem.write_string(args[2], &value, args[3].max(0) as usize);
                0
            }

            G_ARGC => self.cmds.argc() as i32,
            G_ARGV => {
                let arg = self.cmds.argv(args[1].max(0) as usize).to_string();
                mem.write_string(args[2], &arg, args[3].max(0) as usize);
                0
            }

            G_FS_FOPEN_FILE => self.fs_open(mem, args[1], args[2], args[3]),
            G_FS_READ => {
                let data = self.fs.read(args[3], args[2].max(0) as usize);
                mem.write_bytes(args[1], &data);
                data.len() as i32
            }
            G_FS_WRITE => {
                let data = mem.read_bytes(args[1], args[2].max(0) as usize);
                self.fs.write(args[3], &data) as i32
            }
            G_FS_FCLOSE_FILE => {
                self.fs.close(args[1]);
                0
            }
            G_FS_GETFILELIST => self.fs_file_list(mem, args[1], args[2], args[3], args[4]),
            G_FS_SEEK => self.fs.seek(args[1], args[2], args[3]),

            G_SEND_CONSOLE_COMMAND => {
                // exec-when in args[1] is irrelevant on a buffered drain
                self.cmds.add_text(&mem.read_string(args[2]));
                0
            }

            G_LOCATE_GAME_DATA => {
                self.sv.entity_base = args[1];
                self.sv.num_entities = args[2].clamp(0, 1024);
                self.sv.entity_size = args[3].max(0);
                self.sv.player_base = args[4];
                self.sv.player_size = args[5].max(0);
                0
            }

            G_DROP_CLIENT => {
                let n = args[1] as usize;
                let reason = mem.read_string(args[2]);
                if let Some(client) = self.sv.clients.get_mut(n) {
                    if client.state != ClientConnState::Free {
                        client.drop_reason = Some(reason);
                    }
                }
                0
            }
            G_SEND_SERVER_COMMAND => {
                let text = mem.read_string(args[2]);
                sv_send_server_command(self.sv, args[1], &text);
                0
            }

            G_SET_CONFIGSTRING => {
                let index = args[1] as usize;
                let value = mem.read_string(args[2]);
                if index < MAX_CONFIGSTRINGS {
                    if self.sv.configstring(index) != value {
                        self.sv.set_configstring(index, &value);
                        // running clients learn of the change reliably
                        if self.sv.running() {
                            let cmd = format!("cs {} \"{}\"", index, value);
                            sv_send_server_command(self.sv, -1, &cmd);
                        }
                    }
                } else {
                    self.console
                        .warn(&format!("configstring index {} out of range\n", index));
                }
                0
            }
            G_GET_CONFIGSTRING => {
                let value = self.sv.configstring(args[1].max(0) as usize).to_string();
                mem.write_string(args[2], &value, args[3].max(0) as usize);
                0
            }

            G_GET_USERINFO => {
                let info = self
                    .sv
                    .clients
                    .get(args[1].max(0) as usize)
                    .map(|c| c.userinfo.clone())
                    .unwrap_or_default();
                mem.write_string(args[2], &info, args[3].max(0) as usize);
                0
            }
            G_SET_USERINFO => {
                if let Some(client) = self.sv.clients.get_mut(args[1].max(0) as usize) {
                    client.userinfo = mem.read_string(args[2]);
                }
                0
            }
            G_GET_SERVERINFO => {
                let info = self.cvars.info_string(CvarFlags::SERVERINFO);
                mem.write_string(args[1], &info, args[2].max(0) as usize);
                0
            }

            G_SET_BRUSH_MODEL => {
                if let Some(num) = self.sv.gentity_num_for_addr(args[1]) {
                    let name = mem.read_string(args[2]);
                    sv_set_brush_model(self.sv, self.cm, mem, num, &name);
                }
                0
            }

            G_TRACE | G_TRACECAPSULE => {
                // capsule queries share the box path
                let start = read_vec_or_zero(mem, args[2]);
                let mins = read_vec_or_zero(mem, args[3]);
                let maxs = read_vec_or_zero(mem, args[4]);
                let end = read_vec_or_zero(mem, args[5]);
                let trace = sv_trace(
                    self.sv, self.cm, mem, &start, &mins, &maxs, &end, args[6], args[7],
                );
                layout::write_trace(mem, args[1], &trace);
                0
            }
            G_POINT_CONTENTS => {
                let point = read_vec_or_zero(mem, args[1]);
                sv_point_contents(self.sv, self.cm, mem, &point, args[2])
            }

            // area visibility is approximated as fully open
            G_IN_PVS | G_IN_PVS_IGNORE_PORTALS => 1,
            G_ADJUST_AREA_PORTAL_STATE => 0,
            G_AREAS_CONNECTED => 1,

            G_LINKENTITY => {
                if let Some(num) = self.sv.gentity_num_for_addr(args[1]) {
                    sv_link_entity(self.sv, self.cm, mem, num);
                }
                0
            }
            G_UNLINKENTITY => {
                if let Some(num) = self.sv.gentity_num_for_addr(args[1]) {
                    sv_unlink_entity(self.sv, mem, num);
                }
                0
            }
            G_ENTITIES_IN_BOX => {
                let mins = read_vec_or_zero(mem, args[1]);
                let maxs = read_vec_or_zero(mem, args[2]);
                let max_count = args[4].max(0) as usize;
                let list = sv_entities_in_box(self.sv, mem, &mins, &maxs, max_count);
                for (i, num) in list.iter().enumerate() {
                    mem.write_i32(args[3] + i as i32 * 4, *num);
                }
                list.len() as i32
            }
            G_ENTITY_CONTACT | G_ENTITY_CONTACTCAPSULE => {
                let mins = read_vec_or_zero(mem, args[1]);
                let maxs = read_vec_or_zero(mem, args[2]);
                match self.sv.gentity_num_for_addr(args[3]) {
                    Some(num) => sv_entity_contact(self.sv, mem, &mins, &maxs, num) as i32,
                    None => 0,
                }
            }

            // no bot slots in this build
            G_BOT_ALLOCATE_CLIENT => -1,
            G_BOT_FREE_CLIENT => 0,

            G_GET_USERCMD => {
                if let Some(client) = self.sv.clients.get(args[1].max(0) as usize) {
                    layout::write_usercmd(mem, args[2], &client.last_usercmd);
                }
                0
            }
            G_GET_ENTITY_TOKEN => {
                match self.cm.next_entity_token() {
                    Some(token) => {
                        mem.write_string(args[1], &token, args[2].max(0) as usize);
                        1
                    }
                    None => {
                        mem.write_string(args[1], "", args[2].max(0) as usize);
                        0
                    }
                }
            }

            G_DEBUG_POLYGON_CREATE | G_DEBUG_POLYGON_DELETE => 0,

            G_REAL_TIME => {
                if args[1] != 0 {
                    // qtime record: zeroed; only the return value matters
                    mem.fill(args[1], 0, 44);
                }
                self.clock.real_time()
            }
            G_SNAPVECTOR => {
                let mut v = read_vec_or_zero(mem, args[1]);
                snap_vector(&mut v);
                layout::write_vec3(mem, args[1], &v);
                0
            }

            // math / memory traps
            G_MEMSET => {
                mem.fill(args[1], args[2] as u8, args[3].max(0));
                args[1]
            }
            G_MEMCPY => {
                mem.block_copy(args[1], args[2], args[3].max(0));
                args[1]
            }
            G_STRNCPY => {
                let src = mem.read_string(args[2]);
                let max = args[3].max(0) as usize;
                mem.write_string(args[1], &src, max.max(1));
                args[1]
            }
            G_SIN => r(f(args[1]).sin()),
            G_COS => r(f(args[1]).cos()),
            G_ATAN2 => r(f(args[1]).atan2(f(args[2]))),
            G_SQRT => r(f(args[1]).sqrt()),
            G_FLOOR => r(f(args[1]).floor()),
            G_CEIL => r(f(args[1]).ceil()),
            G_MATRIX_MULTIPLY => {
                let read_m = |mem: &VmMemory, addr: i32| {
                    let mut m = [[0.0f32; 3]; 3];
                    for i in 0..3 {
                        for j in 0..3 {
                            m[i][j] = mem.read_f32(addr + (i * 12 + j * 4) as i32);
                        }
                    }
                    m
                };
                let out = matrix_multiply(&read_m(mem, args[1]), &read_m(mem, args[2]));
                for i in 0..3 {
                    for j in 0..3 {
                        mem.write_f32(args[3] + (i * 12 + j * 4) as i32, out[i][j]);
                    }
                }
                0
            }
            G_ANGLE_VECTORS => {
                let angles = read_vec_or_zero(mem, args[1]);
                let mut forward = [0.0f32; 3];
                let mut right = [0.0f32; 3];
                let mut up = [0.0f32; 3];
                angle_vectors(&angles, Some(&mut forward), Some(&mut right), Some(&mut up));
                if args[2] != 0 {
                    layout::write_vec3(mem, args[2], &forward);
                }
                if args[3] != 0 {
                    layout::write_vec3(mem, args[3], &right);
                }
                if args[4] != 0 {
                    layout::write_vec3(mem, args[4], &up);
                }
                0
            }
            G_PERPENDICULAR_VECTOR => {
                let src = read_vec_or_zero(mem, args[2]);
                layout::write_vec3(mem, args[1], &perpendicular_vector(&src));
                0
            }
            G_TEST_PRINT_INT => {
                self.console
                    .print(&format!("{} {}\n", mem.read_string(args[1]), args[2]));
                0
            }
            G_TEST_PRINT_FLOAT => {
                self.console
                    .print(&format!("{} {}\n", mem.read_string(args[1]), f(args[2])));
                0
            }

            selector if selector >= BOTLIB_FIRST => 0, // bot library is stubbed

            selector => {
                self.console
                    .warn(&format!("game vm: bad system trap {}\n", selector));
                0
            }
        }
    }
}

impl GameHost<'_> {
    fn fs_open(&mut self, mem: &mut VmMemory, path_addr: i32, handle_addr: i32, mode: i32) -> i32 {
        let path = mem.read_string(path_addr);
        match mode {
            0 => {
                // read
                match self.fs.open_read(&path) {
                    Some((handle, length)) => {
                        mem.write_i32(handle_addr, handle);
                        length
                    }
                    None => {
                        mem.write_i32(handle_addr, 0);
                        -1
                    }
                }
            }
            _ => {
                // write / append
                match self.fs.open_write(&path) {
                    Some(handle) => {
                        mem.write_i32(handle_addr, handle);
                        0
                    }
                    None => {
                        mem.write_i32(handle_addr, 0);
                        -1
                    }
                }
            }
        }
    }

    fn fs_file_list(
        &mut self,
        mem: &mut VmMemory,
        path_addr: i32,
        ext_addr: i32,
        buf_addr: i32,
        buf_size: i32,
    ) -> i32 {
        let path = mem.read_string(path_addr);
        let ext = mem.read_string(ext_addr);
        let names = self.fs.list_dir(&path, &ext);

        // NUL separated into the caller's buffer
        let mut written = 0i32;
        let mut count = 0i32;
        for name in &names {
            let need = name.len() as i32 + 1;
            if written + need > buf_size {
                break;
            }
            mem.write_bytes(buf_addr + written, name.as_bytes());
            mem.write_u8(buf_addr + written + name.len() as i32, 0);
            written += need;
            count += 1;
        }
        count
    }
}

// ============================================================
// Tests
// ============================================================
