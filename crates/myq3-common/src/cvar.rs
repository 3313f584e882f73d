// cvar.rs — dynamic variable tracking

use crate::engine_api::ConsoleRef;
use crate::q_shared::{info_set_value_for_key, info_validate, MAX_INFO_STRING};

use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvarFlags: i32 {
        /// written to q3config.cfg on exit
        const ARCHIVE      = 0x0001;
        /// sent to the server on connect / change
        const USERINFO     = 0x0002;
        /// included in the serverinfo configstring
        const SERVERINFO   = 0x0004;
        /// duplicated on all clients through the systeminfo configstring
        const SYSTEMINFO   = 0x0008;
        /// only settable from the command line, never from the console
        const INIT         = 0x0010;
        /// changes take effect on the next map load
        const LATCH        = 0x0020;
        /// display only, never writable from outside
        const ROM          = 0x0040;
        /// created by a `set` with no matching registration
        const USER_CREATED = 0x0080;
        /// can only be changed while cheats are enabled
        const CHEAT        = 0x0200;
        /// changing does not require a restart of the owning subsystem
        const NORESTART    = 0x0400;
    }
}

/// A console variable. Values are kept as strings with eagerly reparsed
/// numeric caches; `modification_count` strictly increases across every
/// successful set.
#[derive(Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub reset_string: String,
    pub latched_string: Option<String>,
    pub flags: CvarFlags,
    pub modified: bool,
    pub modification_count: i32,
    pub value: f32,
    pub integer: i32,
}

impl Cvar {
    fn assign(&mut self, value: &str) {
        self.string = value.to_string();
        self.value = value.parse::<f32>().unwrap_or(0.0);
        self.integer = value
            .parse::<i32>()
            .unwrap_or_else(|_| self.value as i32);
        self.modified = true;
        self.modification_count += 1;
    }
}

pub struct CvarContext {
    pub vars: Vec<Cvar>,
    index: HashMap<String, usize>,
    /// OR of the flags of every cvar modified since the last check
    pub modified_flags: CvarFlags,
    /// gates CHEAT cvar writes; wired to sv_cheats
    pub cheats_enabled: bool,
    /// INIT cvars refuse sets once startup is over
    pub startup_done: bool,
    console: ConsoleRef,
}

impl CvarContext {
    pub fn new(console: ConsoleRef) -> Self {
        Self {
            vars: Vec::new(),
            index: HashMap::new(),
            modified_flags: CvarFlags::empty(),
            cheats_enabled: true,
            startup_done: false,
            console,
        }
    }

    pub fn find(&self, name: &str) -> Option<&Cvar> {
        self.index.get(name).map(|&i| &self.vars[i])
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn variable_value(&self, name: &str) -> f32 {
        self.find(name).map_or(0.0, |v| v.value)
    }

    pub fn variable_integer(&self, name: &str) -> i32 {
        self.find(name).map_or(0, |v| v.integer)
    }

    pub fn variable_string(&self, name: &str) -> &str {
        self.find(name).map_or("", |v| v.string.as_str())
    }

    /// Get or create a cvar. An existing cvar keeps its value but ORs in
    /// the new flags; a latched value registered over is resolved first.
    pub fn get(&mut self, name: &str, value: &str, flags: CvarFlags) -> Option<usize> {
        if name.is_empty() || !info_validate(name) {
            self.console.print(&format!("invalid cvar name string: {}\n", name));
            return None;
        }
        if flags.intersects(CvarFlags::USERINFO | CvarFlags::SERVERINFO) && !info_validate(value) {
            self.console.print("invalid info cvar value\n");
            return None;
        }

        if let Some(&idx) = self.index.get(name) {
            let var = &mut self.vars[idx];
            // a registration supplies the authoritative default
            if var.reset_string.is_empty() || var.flags.contains(CvarFlags::USER_CREATED) {
                var.reset_string = value.to_string();
                var.flags.remove(CvarFlags::USER_CREATED);
            }
            var.flags |= flags;
            if let Some(latched) = var.latched_string.take() {
                var.assign(&latched);
            }
            return Some(idx);
        }

        let idx = self.vars.len();
        let mut var = Cvar {
            name: name.to_string(),
            string: String::new(),
            reset_string: value.to_string(),
            latched_string: None,
            flags,
            modified: true,
            modification_count: 0,
            value: 0.0,
            integer: 0,
        };
        var.assign(value);
        self.vars.push(var);
        self.index.insert(name.to_string(), idx);
        self.modified_flags |= flags;
        Some(idx)
    }

    fn set2(&mut self, name: &str, value: &str, force: bool) -> Option<usize> {
        let idx = match self.find_index(name) {
            Some(idx) => idx,
            None => {
                // implicit creation from the console
                return self.get(name, value, CvarFlags::USER_CREATED);
            }
        };

        if self.vars[idx]
            .flags
            .intersects(CvarFlags::USERINFO | CvarFlags::SERVERINFO)
            && !info_validate(value)
        {
            self.console.print("invalid info cvar value\n");
            return Some(idx);
        }

        if !force {
            let flags = self.vars[idx].flags;
            if flags.contains(CvarFlags::ROM) {
                self.console
                    .print(&format!("{} is read only.\n", name));
                return Some(idx);
            }
            if flags.contains(CvarFlags::INIT) && self.startup_done {
                self.console
                    .print(&format!("{} is write protected.\n", name));
                return Some(idx);
            }
            if flags.contains(CvarFlags::CHEAT) && !self.cheats_enabled {
                self.console
                    .print(&format!("{} is cheat protected.\n", name));
                return Some(idx);
            }
            if flags.contains(CvarFlags::LATCH) {
                let var = &mut self.vars[idx];
                if var.string == value {
                    var.latched_string = None;
                    return Some(idx);
                }
                if var.latched_string.as_deref() != Some(value) {
                    self.console
                        .print(&format!("{} will be changed upon restarting.\n", name));
                    var.latched_string = Some(value.to_string());
                }
                return Some(idx);
            }
        } else {
            self.vars[idx].latched_string = None;
        }

        if self.vars[idx].string == value {
            return Some(idx); // not changed
        }

        self.modified_flags |= self.vars[idx].flags;
        self.vars[idx].assign(value);
        Some(idx)
    }

    /// Set a cvar, respecting ROM / INIT / CHEAT / LATCH flags.
    pub fn set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.set2(name, value, false)
    }

    /// Set a cvar, ignoring the write-protection flags.
    pub fn force_set(&mut self, name: &str, value: &str) -> Option<usize> {
        self.set2(name, value, true)
    }

    pub fn set_value(&mut self, name: &str, value: f32) {
        let s = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &s);
    }

    /// Reset a cvar to its registration default.
    pub fn reset(&mut self, name: &str) {
        if let Some(idx) = self.find_index(name) {
            let reset = self.vars[idx].reset_string.clone();
            self.force_set(name, &reset);
        }
    }

    /// Apply all pending latched values. Run during map load, before the
    /// game module reads its cvars.
    pub fn apply_latched(&mut self) {
        for idx in 0..self.vars.len() {
            if let Some(latched) = self.vars[idx].latched_string.take() {
                self.modified_flags |= self.vars[idx].flags;
                self.vars[idx].assign(&latched);
            }
        }
    }

    /// When cheats are switched off, force every CHEAT cvar back to its
    /// default so stale values cannot leak into a pure session.
    pub fn set_cheat_state(&mut self, enabled: bool) {
        self.cheats_enabled = enabled;
        if enabled {
            return;
        }
        for idx in 0..self.vars.len() {
            if self.vars[idx].flags.contains(CvarFlags::CHEAT)
                && self.vars[idx].string != self.vars[idx].reset_string
            {
                let reset = self.vars[idx].reset_string.clone();
                let name = self.vars[idx].name.clone();
                self.force_set(&name, &reset);
            }
        }
    }

    /// Handle variable inspection/assignment typed at the console.
    /// Returns true if argv0 named a cvar.
    pub fn command(&mut self, argv: &[String]) -> bool {
        let name = match argv.first() {
            Some(n) => n.as_str(),
            None => return false,
        };
        let idx = match self.find_index(name) {
            Some(idx) => idx,
            None => return false,
        };

        if argv.len() == 1 {
            let var = &self.vars[idx];
            let mut msg = format!(
                "\"{}\" is:\"{}\" default:\"{}\"\n",
                var.name, var.string, var.reset_string
            );
            if let Some(ref latched) = var.latched_string {
                msg.push_str(&format!("latched: \"{}\"\n", latched));
            }
            self.console.print(&msg);
            return true;
        }

        let name = name.to_string();
        self.set(&name, &argv[1]);
        true
    }

    /// Build an info string from all cvars with the given flag set.
    pub fn info_string(&self, bit: CvarFlags) -> String {
        let mut info = String::with_capacity(MAX_INFO_STRING);
        for var in &self.vars {
            if var.flags.intersects(bit) {
                info_set_value_for_key(&mut info, &var.name, &var.string);
            }
        }
        info
    }

    /// Write all archived cvars as `seta` lines.
    pub fn write_variables(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        for var in &self.vars {
            if var.flags.contains(CvarFlags::ARCHIVE) {
                if let Some(ref latched) = var.latched_string {
                    writeln!(writer, "seta {} \"{}\"", var.name, latched)?;
                } else {
                    writeln!(writer, "seta {} \"{}\"", var.name, var.string)?;
                }
            }
        }
        Ok(())
    }

    /// List cvars with flag letter columns: A U S R I L C.
    pub fn list(&self, prefix: Option<&str>) -> usize {
        let mut matching = 0;
        for var in &self.vars {
            if let Some(p) = prefix {
                if !var.name.starts_with(p) {
                    continue;
                }
            }
            matching += 1;
            let f = var.flags;
            let line = format!(
                "{}{}{}{}{}{}{} {} \"{}\"\n",
                if f.contains(CvarFlags::ARCHIVE) { 'A' } else { ' ' },
                if f.contains(CvarFlags::USERINFO) { 'U' } else { ' ' },
                if f.contains(CvarFlags::SERVERINFO) { 'S' } else { ' ' },
                if f.contains(CvarFlags::ROM) { 'R' } else { ' ' },
                if f.contains(CvarFlags::INIT) { 'I' } else { ' ' },
                if f.contains(CvarFlags::LATCH) { 'L' } else { ' ' },
                if f.contains(CvarFlags::CHEAT) { 'C' } else { ' ' },
                var.name,
                var.string
            );
            self.console.print(&line);
        }
        self.console
            .print(&format!("{} total cvars\n", self.vars.len()));
        matching
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_api::RecordingConsole;
    use std::rc::Rc;

    fn ctx() -> CvarContext {
        CvarContext::new(Rc::new(RecordingConsole::default()))
    }

    #[test]
    fn test_get_and_lookup() {
        let mut c = ctx();
        c.get("sv_fps", "20", CvarFlags::empty());
        assert_eq!(c.variable_integer("sv_fps"), 20);
        assert_eq!(c.variable_value("sv_fps"), 20.0);
        assert_eq!(c.variable_string("sv_fps"), "20");
        assert_eq!(c.variable_string("missing"), "");
    }

    #[test]
    fn test_get_keeps_existing_value() {
        let mut c = ctx();
        c.get("name", "first", CvarFlags::empty());
        c.set("name", "changed");
        c.get("name", "first", CvarFlags::ARCHIVE);
        assert_eq!(c.variable_string("name"), "changed");
        assert!(c.find("name").unwrap().flags.contains(CvarFlags::ARCHIVE));
    }

    #[test]
    fn test_set_increments_modification_count() {
        let mut c = ctx();
        c.get("g_speed", "320", CvarFlags::empty());
        let before = c.find("g_speed").unwrap().modification_count;
        c.set("g_speed", "400");
        let after = c.find("g_speed").unwrap().modification_count;
        assert_eq!(after, before + 1);
        // setting to the same value does not bump the counter
        c.set("g_speed", "400");
        assert_eq!(c.find("g_speed").unwrap().modification_count, after);
    }

    #[test]
    fn test_rom_refused() {
        let mut c = ctx();
        c.get("version", "1.32", CvarFlags::ROM);
        let count = c.find("version").unwrap().modification_count;
        c.set("version", "hacked");
        assert_eq!(c.variable_string("version"), "1.32");
        assert_eq!(c.find("version").unwrap().modification_count, count);
        c.force_set("version", "1.33");
        assert_eq!(c.variable_string("version"), "1.33");
    }

    #[test]
    fn test_init_refused_after_startup() {
        let mut c = ctx();
        c.get("fs_basepath", "/base", CvarFlags::INIT);
        c.startup_done = true;
        c.set("fs_basepath", "/elsewhere");
        assert_eq!(c.variable_string("fs_basepath"), "/base");
    }

    #[test]
    fn test_latch_applies_on_restart() {
        let mut c = ctx();
        c.get("g_gametype", "0", CvarFlags::LATCH);
        let count = c.find("g_gametype").unwrap().modification_count;

        c.set("g_gametype", "4");
        assert_eq!(c.variable_string("g_gametype"), "0"); // live value untouched
        assert_eq!(
            c.find("g_gametype").unwrap().latched_string.as_deref(),
            Some("4")
        );
        assert_eq!(c.find("g_gametype").unwrap().modification_count, count);

        c.apply_latched();
        assert_eq!(c.variable_string("g_gametype"), "4");
        assert_eq!(c.find("g_gametype").unwrap().modification_count, count + 1);
        assert!(c.find("g_gametype").unwrap().latched_string.is_none());
    }

    #[test]
    fn test_latch_back_to_current_clears() {
        let mut c = ctx();
        c.get("g_gametype", "0", CvarFlags::LATCH);
        c.set("g_gametype", "4");
        c.set("g_gametype", "0");
        assert!(c.find("g_gametype").unwrap().latched_string.is_none());
    }

    #[test]
    fn test_cheat_reset_when_cheats_off() {
        let mut c = ctx();
        c.get("timescale", "1", CvarFlags::CHEAT);
        c.set("timescale", "10");
        assert_eq!(c.variable_string("timescale"), "10");

        c.set_cheat_state(false);
        assert_eq!(c.variable_string("timescale"), "1");
        c.set("timescale", "10");
        assert_eq!(c.variable_string("timescale"), "1"); // refused
    }

    #[test]
    fn test_user_created_then_registered() {
        let mut c = ctx();
        c.set("cg_fov", "110");
        assert!(c
            .find("cg_fov")
            .unwrap()
            .flags
            .contains(CvarFlags::USER_CREATED));
        c.get("cg_fov", "90", CvarFlags::ARCHIVE);
        // value survives, default becomes the registration value
        assert_eq!(c.variable_string("cg_fov"), "110");
        assert_eq!(c.find("cg_fov").unwrap().reset_string, "90");
    }

    #[test]
    fn test_info_string_export() {
        let mut c = ctx();
        c.get("sv_hostname", "noname", CvarFlags::SERVERINFO);
        c.get("g_gravity", "800", CvarFlags::SERVERINFO);
        c.get("cl_rate", "25000", CvarFlags::USERINFO);
        let info = c.info_string(CvarFlags::SERVERINFO);
        assert!(info.contains("\\sv_hostname\\noname"));
        assert!(info.contains("\\g_gravity\\800"));
        assert!(!info.contains("cl_rate"));
    }

    #[test]
    fn test_write_variables() {
        let mut c = ctx();
        c.get("com_hunkmegs", "56", CvarFlags::ARCHIVE);
        c.get("sv_fps", "20", CvarFlags::empty());
        let mut buf = Vec::new();
        c.write_variables(&mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("seta com_hunkmegs \"56\""));
        assert!(!out.contains("sv_fps"));
    }

    #[test]
    fn test_reset() {
        let mut c = ctx();
        c.get("cg_drawfps", "0", CvarFlags::empty());
        c.set("cg_drawfps", "1");
        c.reset("cg_drawfps");
        assert_eq!(c.variable_string("cg_drawfps"), "0");
    }
}
