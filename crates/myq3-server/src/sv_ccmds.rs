// sv_ccmds.rs — server console commands

use crate::server::{ClientConnState, ServerContext, ServerState};
use myq3_common::engine_api::ConsoleRef;

/// `status` — one line per client plus the map name.
pub fn sv_status(sv: &ServerContext, console: &ConsoleRef) {
    if sv.state == ServerState::Dead {
        console.print("Server is not running.\n");
        return;
    }
    console.print(&format!("map: {}\n", sv.map_name));
    console.print("num state  name\n");
    console.print("--- ------ ----------------\n");
    for (i, client) in sv.clients.iter().enumerate() {
        let state = match client.state {
            ClientConnState::Free => continue,
            ClientConnState::Connected => "CNCT",
            ClientConnState::Active => "ACTV",
        };
        console.print(&format!("{:3} {:6} {}\n", i, state, client.name));
    }
}

/// `serverinfo` — the flagged cvar pairs a query would return.
pub fn sv_serverinfo(info: &str, console: &ConsoleRef) {
    console.print("Server info settings:\n");
    let mut parts = info.split('\\');
    if info.starts_with('\\') {
        parts.next();
    }
    loop {
        let key = match parts.next() {
            Some(k) => k,
            None => break,
        };
        let value = parts.next().unwrap_or("");
        console.print(&format!("{:<20} {}\n", key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Client;
    use myq3_common::engine_api::RecordingConsole;
    use std::rc::Rc;

    #[test]
    fn test_status_lists_active_clients() {
        let console = Rc::new(RecordingConsole::default());
        let console_ref: ConsoleRef = console.clone();
        let mut sv = ServerContext::new();
        sv.state = ServerState::Game;
        sv.map_name = "q3dm17".to_string();
        let mut c = Client::new();
        c.state = ClientConnState::Active;
        c.name = "local".to_string();
        sv.clients.push(c);
        sv.clients.push(Client::new()); // free slot stays silent

        sv_status(&sv, &console_ref);
        let lines = console.lines.borrow();
        assert!(lines.iter().any(|l| l.contains("q3dm17")));
        assert!(lines.iter().any(|l| l.contains("local")));
        assert_eq!(lines.iter().filter(|l| l.contains("ACTV")).count(), 1);
    }
}
