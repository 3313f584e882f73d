// cmd.rs — script command processing: buffered text, tokenizing, registry
//
// The buffer accumulates config text and console input; the engine
// drains it one command at a time, tokenizes, and routes to a builtin,
// the cvar store, or a VM. Registration here only records names — the
// routing decision stays with the engine so no closures capture
// engine state.

use std::collections::HashSet;

pub const MAX_CMD_BUFFER: usize = 16384;
pub const MAX_STRING_TOKENS: usize = 1024;

pub struct CmdContext {
    text: Vec<u8>,
    /// set by the `wait` command; suspends draining until next frame
    pub wait: i32,

    // current tokenized command line
    argv: Vec<String>,
    args: String,

    // names registered by the engine and by the VMs (add-command syscall)
    commands: HashSet<String>,
    vm_commands: HashSet<String>,
}

impl CmdContext {
    pub fn new() -> Self {
        Self {
            text: Vec::with_capacity(MAX_CMD_BUFFER),
            wait: 0,
            argv: Vec::new(),
            args: String::new(),
            commands: HashSet::new(),
            vm_commands: HashSet::new(),
        }
    }

    // ============================================================
    // Command buffer
    // ============================================================

    /// Append text to the end of the buffer.
    pub fn add_text(&mut self, text: &str) {
        if self.text.len() + text.len() > MAX_CMD_BUFFER {
            return; // overflow, drop the text
        }
        self.text.extend_from_slice(text.as_bytes());
    }

    /// Insert text at the beginning of the buffer, ahead of unexecuted
    /// commands. Used by `exec` so file contents run before the rest of
    /// the line that triggered them.
    pub fn insert_text(&mut self, text: &str) {
        if self.text.len() + text.len() + 1 > MAX_CMD_BUFFER {
            return;
        }
        let mut new_text = Vec::with_capacity(text.len() + 1 + self.text.len());
        new_text.extend_from_slice(text.as_bytes());
        new_text.push(b'\n');
        new_text.extend_from_slice(&self.text);
        self.text = new_text;
    }

    /// Extract the next command from the buffer: up to an unquoted `;`
    /// or newline. Returns None when the buffer is empty or a `wait` is
    /// pending.
    pub fn next_command(&mut self) -> Option<String> {
        if self.wait > 0 {
            // process the rest of the buffer on the next frame
            self.wait -= 1;
            return None;
        }
        if self.text.is_empty() {
            return None;
        }

        let mut quotes = 0;
        let mut i = 0;
        while i < self.text.len() {
            let c = self.text[i];
            if c == b'"' {
                quotes += 1;
            }
            if quotes % 2 == 0 && c == b';' {
                break;
            }
            if c == b'\n' || c == b'\r' {
                break;
            }
            i += 1;
        }

        let line = String::from_utf8_lossy(&self.text[..i]).into_owned();
        // remove the command and its terminator from the buffer
        let rest = if i < self.text.len() { i + 1 } else { i };
        self.text.drain(..rest);
        Some(line)
    }

    pub fn buffered_len(&self) -> usize {
        self.text.len()
    }

    // ============================================================
    // Tokenizer
    // ============================================================

    /// Parse a command line into argv. Quoted sections become a single
    /// token, `//` discards the rest of the line, `{` and `}` always
    /// stand alone.
    pub fn tokenize_string(&mut self, text: &str) {
        self.argv.clear();
        self.args.clear();

        let bytes = text.as_bytes();
        let mut i = 0;
        loop {
            // skip whitespace
            while i < bytes.len() && bytes[i] <= b' ' {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            // comment to end of line
            if i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'/' {
                break;
            }
            if self.argv.len() >= MAX_STRING_TOKENS {
                break;
            }

            // everything after the command name, verbatim
            if self.argv.len() == 1 {
                self.args = text[i..].trim_end().to_string();
            }

            let c = bytes[i];
            if c == b'"' {
                i += 1;
                let start = i;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                self.argv
                    .push(String::from_utf8_lossy(&bytes[start..i]).into_owned());
                if i < bytes.len() {
                    i += 1;
                }
                continue;
            }
            if c == b'{' || c == b'}' {
                self.argv.push((c as char).to_string());
                i += 1;
                continue;
            }

            let start = i;
            while i < bytes.len() {
                let c = bytes[i];
                if c <= b' ' || c == b'"' || c == b'{' || c == b'}' {
                    break;
                }
                if c == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    break;
                }
                i += 1;
            }
            self.argv
                .push(String::from_utf8_lossy(&bytes[start..i]).into_owned());
        }
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn argv(&self, i: usize) -> &str {
        self.argv.get(i).map_or("", |s| s.as_str())
    }

    pub fn argv_vec(&self) -> &[String] {
        &self.argv
    }

    /// Everything after argv[0], unmodified.
    pub fn args(&self) -> &str {
        &self.args
    }

    // ============================================================
    // Registry
    // ============================================================

    pub fn add_command(&mut self, name: &str) {
        self.commands.insert(name.to_ascii_lowercase());
    }

    pub fn remove_command(&mut self, name: &str) {
        self.commands.remove(&name.to_ascii_lowercase());
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.commands.contains(&name.to_ascii_lowercase())
    }

    /// Commands registered by a VM through the add-command syscall;
    /// cleared when the owning VM is unloaded.
    pub fn add_vm_command(&mut self, name: &str) {
        self.vm_commands.insert(name.to_ascii_lowercase());
    }

    pub fn remove_vm_command(&mut self, name: &str) {
        self.vm_commands.remove(&name.to_ascii_lowercase());
    }

    pub fn is_vm_command(&self, name: &str) -> bool {
        self.vm_commands.contains(&name.to_ascii_lowercase())
    }

    pub fn clear_vm_commands(&mut self) {
        self.vm_commands.clear();
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .iter()
            .chain(self.vm_commands.iter())
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for CmdContext {
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

    #[test]
    fn test_tokenize_basic() {
        let mut c = CmdContext::new();
        c.tokenize_string("map q3dm17");
        assert_eq!(c.argc(), 2);
        assert_eq!(c.argv(0), "map");
        assert_eq!(c.argv(1), "q3dm17");
        assert_eq!(c.args(), "q3dm17");
    }

    #[test]
    fn test_tokenize_quotes() {
        let mut c = CmdContext::new();
        c.tokenize_string("say \"hello there\" bye");
        assert_eq!(c.argc(), 3);
        assert_eq!(c.argv(1), "hello there");
        assert_eq!(c.argv(2), "bye");
        assert_eq!(c.args(), "\"hello there\" bye");
    }

    #[test]
    fn test_tokenize_comment() {
        let mut c = CmdContext::new();
        c.tokenize_string("seta name value // trailing note");
        assert_eq!(c.argc(), 3);
        assert_eq!(c.argv(2), "value");
    }

    #[test]
    fn test_tokenize_braces_stand_alone() {
        let mut c = CmdContext::new();
        c.tokenize_string("bind x {vstr cycle}");
        assert_eq!(c.argc(), 6);
        assert_eq!(c.argv(2), "{");
        assert_eq!(c.argv(3), "vstr");
        assert_eq!(c.argv(5), "}");
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        let mut c = CmdContext::new();
        c.tokenize_string("   \t  ");
        assert_eq!(c.argc(), 0);
        assert_eq!(c.argv(5), "");
    }

    #[test]
    fn test_buffer_splits_on_semicolon_and_newline() {
        let mut c = CmdContext::new();
        c.add_text("echo a; echo b\necho c");
        assert_eq!(c.next_command().as_deref(), Some("echo a"));
        assert_eq!(c.next_command().as_deref(), Some(" echo b"));
        assert_eq!(c.next_command().as_deref(), Some("echo c"));
        assert_eq!(c.next_command(), None);
    }

    #[test]
    fn test_buffer_semicolon_inside_quotes() {
        let mut c = CmdContext::new();
        c.add_text("say \"a;b\"\n");
        assert_eq!(c.next_command().as_deref(), Some("say \"a;b\""));
    }

    #[test]
    fn test_insert_text_runs_first() {
        let mut c = CmdContext::new();
        c.add_text("echo after\n");
        c.insert_text("echo before");
        assert_eq!(c.next_command().as_deref(), Some("echo before"));
        assert_eq!(c.next_command().as_deref(), Some("echo after"));
    }

    #[test]
    fn test_wait_defers_one_frame() {
        let mut c = CmdContext::new();
        c.add_text("echo later\n");
        c.wait = 1;
        assert_eq!(c.next_command(), None); // frame 1: suspended
        assert_eq!(c.next_command().as_deref(), Some("echo later"));
    }

    #[test]
    fn test_registry() {
        let mut c = CmdContext::new();
        c.add_command("map");
        assert!(c.is_command("MAP"));
        c.add_vm_command("+scores");
        assert!(c.is_vm_command("+scores"));
        c.clear_vm_commands();
        assert!(!c.is_vm_command("+scores"));
        assert!(c.is_command("map"));
    }
}
