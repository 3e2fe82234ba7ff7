//! HexiRules terminal shell.
//!
//! Drives a single session through an interactive prompt: world management,
//! cell editing, rule editing, stepping, history navigation and snapshot
//! save/load, with the grid rendered as an ASCII panel.

use clap::Parser;
use hexi_core::{load_snapshot, save_snapshot, Axial, Direction, HexGrid, Session, World};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "hexirules",
    version,
    about = "Hexagonal cellular automaton driven by HexiDirect rules"
)]
struct Args {
    /// Grid radius of the starting world
    #[arg(long, default_value_t = 8)]
    radius: i32,

    /// HexiDirect rules for the starting world (`;` separates rules)
    #[arg(long)]
    rules: Option<String>,

    /// RNG seed for new worlds
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// World snapshot to load on startup
    #[arg(long)]
    load: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new();

    match &args.load {
        Some(path) => {
            let snapshot = load_snapshot(path)?;
            let name = world_name_from_path(path);
            session.insert_world(World::from_snapshot(&name, &snapshot, args.seed))?;
            session.select_world(&name)?;
            println!("loaded world `{}` from {}", name, path.display());
        }
        None => {
            session.create_world("world", args.radius, args.seed)?;
        }
    }

    if let Some(rules) = &args.rules {
        let world = session.current_mut()?;
        match world.replace_rules(&rules.replace(';', "\n")) {
            Ok(count) => println!("rules set: {} concrete", count),
            Err(e) => eprintln!("rule error: {}", e),
        }
    }

    println!("HexiRules shell. Type `help` for commands.");
    let stdin = io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let line = line?;
        if !dispatch(&mut session, &line, args.seed) {
            break;
        }
        prompt();
    }
    Ok(())
}

fn prompt() {
    print!("hex> ");
    let _ = io::stdout().flush();
}

fn world_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("world")
        .to_string()
}

/// Handle one command line. Returns false to exit the shell.
fn dispatch(session: &mut Session, line: &str, seed: u64) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let rest: Vec<&str> = parts.collect();

    let result = match command {
        "exit" | "quit" => return false,
        "help" => {
            print_help();
            Ok(())
        }
        "worlds" => {
            for summary in session.list_worlds() {
                let marker = if session.current_name() == Some(summary.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {} (radius {}, {} alive)",
                    marker, summary.name, summary.radius, summary.active_count
                );
            }
            Ok(())
        }
        "create" => match rest.as_slice() {
            [name] => create_world(session, name, 8, seed),
            [name, radius] => match radius.parse::<i32>() {
                Ok(radius) => create_world(session, name, radius, seed),
                Err(_) => usage("create NAME [RADIUS]"),
            },
            _ => usage("create NAME [RADIUS]"),
        },
        "select" => match rest.as_slice() {
            [name] => session.select_world(name).map(|w| {
                println!("selected `{}`", w.name());
            }),
            _ => usage("select NAME"),
        },
        "rename" => match rest.as_slice() {
            [old, new] => session.rename_world(old, new).map(|_| {
                println!("renamed `{}` to `{}`", old, new);
            }),
            _ => usage("rename OLD NEW"),
        },
        "delete" => match rest.as_slice() {
            [name] => session.delete_world(name).map(|_| {
                println!("deleted `{}`", name);
            }),
            _ => usage("delete NAME"),
        },
        "rule" => {
            let trimmed = line.trim_start();
            let text = trimmed.strip_prefix("rule").unwrap_or(trimmed).trim();
            if text.is_empty() {
                show_rules(session)
            } else {
                let text = text.replace(';', "\n");
                with_world(session, |world| {
                    match world.replace_rules(&text) {
                        Ok(count) => println!("rules set: {} concrete", count),
                        Err(e) => println!("rule error: {}", e),
                    }
                    Ok(())
                })
            }
        }
        "rules" => show_rules(session),
        "set" => match rest.as_slice() {
            [q, r, state] => set_cell(session, q, r, state, None),
            [q, r, state, d] => set_cell(session, q, r, state, Some(d)),
            _ => usage("set Q R STATE [DIR]"),
        },
        "toggle" => match parse_coord(&rest) {
            Some(at) => with_world(session, |world| {
                world.toggle_cell(at)?;
                println!("toggled {}", at);
                Ok(())
            }),
            None => usage("toggle Q R"),
        },
        "query" => match parse_coord(&rest) {
            Some(at) => with_world(session, |world| {
                println!("{}", world.cell(at)?);
                Ok(())
            }),
            None => usage("query Q R"),
        },
        "cells" => with_world(session, |world| {
            for (at, cell) in world.grid().active_cells() {
                println!("{} {} {}", at.q, at.r, cell);
            }
            Ok(())
        }),
        "summary" => with_world(session, |world| {
            println!("alive cells: {}", world.active_count());
            Ok(())
        }),
        "grid" => with_world(session, |world| {
            println!("{}", grid_ascii(world.grid()));
            Ok(())
        }),
        "step" => {
            let count = match rest.as_slice() {
                [] => Some(1usize),
                [n] => n.parse::<usize>().ok(),
                _ => None,
            };
            match count {
                Some(count) => with_world(session, |world| {
                    for _ in 0..count {
                        world.step();
                    }
                    if let Some(summary) =
                        world.last_log().iter().find(|l| l.starts_with("summary"))
                    {
                        println!("{}", summary);
                    }
                    println!("stepped {}", count);
                    Ok(())
                }),
                None => usage("step [N]"),
            }
        }
        "log" => with_world(session, |world| {
            for entry in world.last_log() {
                println!("{}", entry);
            }
            Ok(())
        }),
        "randomize" => {
            let p = match rest.first() {
                Some(p) => p.parse::<f64>().ok(),
                None => Some(0.3),
            };
            match p {
                Some(p) => with_world(session, |world| {
                    let states: Vec<&str> = if rest.len() > 1 {
                        rest[1..].to_vec()
                    } else {
                        vec!["a"]
                    };
                    world.randomize(&states, p);
                    println!("alive cells: {}", world.active_count());
                    Ok(())
                }),
                None => usage("randomize [P] [STATES...]"),
            }
        }
        "clear" => with_world(session, |world| {
            world.clear();
            println!("cleared");
            Ok(())
        }),
        "history" => with_world(session, |world| {
            let cursor = world.history_cursor();
            for (index, active) in world.history_entries() {
                let marker = if cursor == Some(index) { "*" } else { " " };
                println!("{} {}: {} alive", marker, index, active);
            }
            Ok(())
        }),
        "go" => match rest.as_slice() {
            [n] => match n.parse::<usize>() {
                Ok(index) => with_world(session, |world| {
                    if world.go(index) {
                        println!("at generation {}", index);
                    } else {
                        println!("no generation {}", index);
                    }
                    Ok(())
                }),
                Err(_) => usage("go INDEX"),
            },
            _ => usage("go INDEX"),
        },
        "prev" => with_world(session, |world| {
            match world.prev() {
                true => println!("at generation {}", world.history_cursor().unwrap_or(0)),
                false => println!("at the oldest generation"),
            }
            Ok(())
        }),
        "next" => with_world(session, |world| {
            match world.next() {
                true => println!("at generation {}", world.history_cursor().unwrap_or(0)),
                false => println!("at the newest generation"),
            }
            Ok(())
        }),
        "save" => match rest.as_slice() {
            [path] => with_world(session, |world| {
                save_snapshot(&world.snapshot(), path)?;
                println!("saved to {}", path);
                Ok(())
            }),
            _ => usage("save PATH"),
        },
        "load" => match rest.as_slice() {
            [path] => match load_snapshot(path) {
                Ok(snapshot) => {
                    let name = world_name_from_path(Path::new(path));
                    let world = World::from_snapshot(&name, &snapshot, seed);
                    session
                        .insert_world(world)
                        .and_then(|_| session.select_world(&name).map(|_| ()))
                        .map(|_| println!("loaded `{}`", name))
                }
                Err(e) => Err(e.into()),
            },
            _ => usage("load PATH"),
        },
        "seed" => with_world(session, |world| {
            println!("{}", world.seed());
            Ok(())
        }),
        other => {
            println!("unknown command `{}`; try `help`", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("error: {}", e);
    }
    true
}

type CommandResult = Result<(), hexi_core::SessionError>;

fn with_world(
    session: &mut Session,
    f: impl FnOnce(&mut World) -> CommandResult,
) -> CommandResult {
    let world = session.current_mut()?;
    f(world)
}

fn usage(text: &str) -> CommandResult {
    println!("usage: {}", text);
    Ok(())
}

fn create_world(session: &mut Session, name: &str, radius: i32, seed: u64) -> CommandResult {
    session.create_world(name, radius, seed)?;
    session.select_world(name)?;
    println!("created `{}`", name);
    Ok(())
}

fn show_rules(session: &mut Session) -> CommandResult {
    with_world(session, |world| {
        if world.rules_text().is_empty() {
            println!("no rules set");
        } else {
            for line in world.rules_text().lines() {
                println!("{}", line);
            }
            println!("({} concrete rules)", world.rules().len());
        }
        if let Some(e) = world.parse_failure() {
            println!("parse failure: {}", e);
        }
        Ok(())
    })
}

fn set_cell(session: &mut Session, q: &str, r: &str, state: &str, d: Option<&str>) -> CommandResult {
    let (Ok(q), Ok(r)) = (q.parse::<i32>(), r.parse::<i32>()) else {
        return usage("set Q R STATE [DIR]");
    };
    let direction = match d {
        Some(d) => match d.parse::<u8>().ok().and_then(Direction::new) {
            Some(direction) => Some(direction),
            None => return usage("set Q R STATE [DIR in 1..6]"),
        },
        None => None,
    };
    with_world(session, |world| {
        world.set_cell(Axial::new(q, r), state, direction)?;
        println!("set {} to {}", Axial::new(q, r), state);
        Ok(())
    })
}

fn parse_coord(rest: &[&str]) -> Option<Axial> {
    match rest {
        [q, r] => match (q.parse::<i32>(), r.parse::<i32>()) {
            (Ok(q), Ok(r)) => Some(Axial::new(q, r)),
            _ => None,
        },
        _ => None,
    }
}

/// Render the grid as rows of `●`/`○`, shifted per row.
fn grid_ascii(grid: &HexGrid) -> String {
    let radius = grid.radius();
    let mut lines = Vec::new();
    for r in -radius..=radius {
        let mut row = Vec::new();
        for q in -radius..=radius {
            let at = Axial::new(q, r);
            if grid.in_bounds(at) {
                row.push(if grid.cell(at).is_empty() { "○" } else { "●" });
            }
        }
        lines.push(format!(
            "{}{}",
            " ".repeat(r.unsigned_abs() as usize),
            row.join(" ")
        ));
    }
    lines.join("\n")
}

fn print_help() {
    println!(
        "\
commands:
  worlds                     list worlds (selection marked *)
  create NAME [RADIUS]       create and select a world
  select NAME                select a world
  rename OLD NEW             rename a world
  delete NAME                delete a world
  rule RULES                 set HexiDirect rules (`;` separates)
  rules                      show the current rules
  set Q R STATE [DIR]        write a cell
  toggle Q R                 toggle a cell between `_` and `a1`
  query Q R                  print a cell
  cells                      list non-empty cells
  summary                    count non-empty cells
  grid                       print the grid as ASCII
  step [N]                   advance N generations
  log                        print the last step log
  randomize [P] [STATES...]  fill cells with probability P
  clear                      empty the grid
  history                    list recorded generations
  go INDEX | prev | next     move through history
  save PATH | load PATH      snapshot to/from a file
  seed                       print the world's RNG seed
  exit"
    );
}
