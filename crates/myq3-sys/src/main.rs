// main.rs — the myq3-rust shell
//
// Wires the standard capabilities into the engine and runs the frame
// loop. `+command` arguments are queued into the command buffer the
// way config text is, after the startup configs.

use myq3_sys::caps::{StdConsole, StdFileSystem, SystemClock};
use myq3_sys::engine::{Engine, EngineCaps};

use myq3_common::engine_api::{NullAudio, NullInput, NullRenderer};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

const FRAME_SLEEP_MS: u64 = 4;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // base directory: --path <dir>, defaulting to ./baseq3
    let mut base = PathBuf::from("baseq3");
    let mut i = 0;
    let mut plus_commands = String::new();
    while i < args.len() {
        match args[i].as_str() {
            "--path" if i + 1 < args.len() => {
                base = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            arg if arg.starts_with('+') => {
                // everything until the next +arg is one command
                plus_commands.push_str(&arg[1..]);
                i += 1;
                while i < args.len() && !args[i].starts_with('+') && args[i] != "--path" {
                    plus_commands.push(' ');
                    plus_commands.push_str(&args[i]);
                    i += 1;
                }
                plus_commands.push('\n');
            }
            _ => {
                eprintln!("unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    let console = Rc::new(StdConsole);
    let mut engine = Engine::new(EngineCaps {
        console: console.clone(),
        fs: Rc::new(StdFileSystem::new(&base)),
        clock: Rc::new(SystemClock::new()),
        renderer: Rc::new(NullRenderer::default()),
        audio: Rc::new(NullAudio::default()),
        input: Rc::new(NullInput::default()),
    });

    engine.init_ui();

    if !plus_commands.is_empty() {
        engine.cmds.add_text(&plus_commands);
    }

    while !engine.quit {
        engine.frame();
        std::thread::sleep(Duration::from_millis(FRAME_SLEEP_MS));
    }

    // archive flagged cvars on the way out
    let config = engine.write_config();
    if let Some(handle) = engine.fs.open_write("q3config.cfg") {
        engine.fs.write(handle, &config);
        engine.fs.close(handle);
    }
}
