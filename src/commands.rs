//! Command vocabulary shared by IPC and key bindings
//!
//! A command is an argument vector whose first word names it. [`dispatch`]
//! runs it against the server and answers with a status code and a reply.

use log::{debug, warn};
use serde_json::json;
use std::str::FromStr;

use crate::events::ServerEvent;
use crate::input::{parse_modifiers, BoundCommand, KeyCombo};
use crate::server::Server;
use crate::view::ViewId;
use crate::workspace::Placement;

/// Status and reply text of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// 0 on success
    pub code: i32,
    pub message: String,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self::ok_with(String::new())
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: 1,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("No focused view")]
    NoFocusedView,
    #[error("{0}")]
    Failed(String),
}

impl From<Result<String, CommandError>> for CommandResult {
    fn from(result: Result<String, CommandError>) -> Self {
        match result {
            Ok(reply) => CommandResult::ok_with(reply),
            Err(e) => CommandResult::error(e.to_string()),
        }
    }
}

type Reply = Result<String, CommandError>;

const QUIT_USAGE: &str = "quit [code]";
const EXEC_USAGE: &str = "exec <program> [args...]";
const BIND_USAGE: &str = "bind <mods+key> <command> [args...]";
const FOCUS_USAGE: &str = "focus left|right|up|down|cycle";
const WORKSPACE_USAGE: &str = "workspace switch|move <n>";
const MOVE_USAGE: &str = "move <dx> <dy>";
const RESIZE_USAGE: &str = "resize <width> <height>";
const CONFIG_USAGE: &str = "config mouse_mod <mods> | config gap <px>";
const QUERY_USAGE: &str = "query focused|workspaces|outputs";

/// Runs `args` against `server`.
///
/// Every command is announced on the event bus once it finished, together
/// with the focus change it caused, if any.
pub fn dispatch(server: &mut Server, args: &[String]) -> CommandResult {
    let Some((name, rest)) = args.split_first() else {
        return CommandError::Empty.into_result();
    };
    debug!("📡 Command: {}", args.join(" "));

    let focused = server.seat.get_focused_view();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let reply = match name.as_str() {
        "quit" => quit(server, &rest),
        "exec" => exec(server, &rest),
        "bind" => bind(server, &rest),
        "focus" => focus(server, &rest),
        "workspace" => workspace(server, &rest),
        "toggle_floating" => toggle_floating(server),
        "fullscreen" => fullscreen(server),
        "move" => move_view(server, &rest),
        "resize" => resize(server, &rest),
        "insert_into_column" => insert_into_column(server),
        "pop_from_column" => pop_from_column(server),
        "close" => close(server),
        "config" => config(server, &rest),
        "query" => query(server, &rest),
        _ => Err(CommandError::Unknown(name.clone())),
    };
    if let Err(e) = &reply {
        warn!("⚠️ Command {} failed: {}", name, e);
    }

    let result = CommandResult::from(reply);
    server.notify_focus_change(focused);
    server.events.emit(ServerEvent::CommandExecuted {
        name: name.clone(),
        code: result.code,
    });
    result
}

impl CommandError {
    fn into_result(self) -> CommandResult {
        CommandResult::error(self.to_string())
    }
}

fn parse<T: FromStr>(arg: &str, usage: &'static str) -> Result<T, CommandError> {
    arg.parse().map_err(|_| CommandError::Usage(usage))
}

fn focused_view(server: &Server) -> Result<ViewId, CommandError> {
    server.seat.get_focused_view().ok_or(CommandError::NoFocusedView)
}

fn quit(server: &mut Server, args: &[&str]) -> Reply {
    let code = match args {
        [] => 0,
        [code] => parse(code, QUIT_USAGE)?,
        _ => return Err(CommandError::Usage(QUIT_USAGE)),
    };
    server.teardown(code);
    Ok(String::new())
}

fn exec(server: &mut Server, args: &[&str]) -> Reply {
    if args.is_empty() {
        return Err(CommandError::Usage(EXEC_USAGE));
    }
    server
        .spawner
        .spawn(args)
        .map_err(|e| CommandError::Failed(e.to_string()))?;
    Ok(String::new())
}

fn bind(server: &mut Server, args: &[&str]) -> Reply {
    let [combo, command @ ..] = args else {
        return Err(CommandError::Usage(BIND_USAGE));
    };
    let combo = KeyCombo::parse(combo).map_err(|e| CommandError::Failed(e.to_string()))?;
    let argv: Vec<String> = command.iter().map(|s| s.to_string()).collect();
    let command = BoundCommand::from_argv(&argv).ok_or(CommandError::Usage(BIND_USAGE))?;

    debug!("Bound {} to {}", combo, argv.join(" "));
    server.keybindings.bind(combo, command);
    Ok(String::new())
}

fn focus(server: &mut Server, args: &[&str]) -> Reply {
    let seat = &mut server.seat;
    let desktop = &mut server.desktop;
    match args {
        ["left"] => seat.focus_by_offset(desktop, -1),
        ["right"] => seat.focus_by_offset(desktop, 1),
        ["up"] => seat.focus_in_column(desktop, -1),
        ["down"] => seat.focus_in_column(desktop, 1),
        ["cycle"] => seat.cycle_focus(desktop),
        _ => return Err(CommandError::Usage(FOCUS_USAGE)),
    }
    Ok(String::new())
}

fn workspace(server: &mut Server, args: &[&str]) -> Reply {
    let (action, n) = match args {
        [action, n] => (*action, parse::<usize>(n, WORKSPACE_USAGE)?),
        _ => return Err(CommandError::Usage(WORKSPACE_USAGE)),
    };

    let outcome = match action {
        "switch" => server.switch_to_workspace(n),
        "move" => {
            let view = focused_view(server)?;
            server.move_view_to_workspace(view, n)
        }
        _ => return Err(CommandError::Usage(WORKSPACE_USAGE)),
    };
    outcome.map_err(|e| CommandError::Failed(e.to_string()))?;
    Ok(String::new())
}

fn toggle_floating(server: &mut Server) -> Reply {
    let view = focused_view(server)?;
    server.toggle_floating(view);
    Ok(String::new())
}

fn fullscreen(server: &mut Server) -> Reply {
    let view = focused_view(server)?;
    server.toggle_fullscreen(view);
    Ok(String::new())
}

fn placement(server: &Server, view: ViewId) -> Placement {
    server
        .desktop
        .view_workspace(view)
        .and_then(|ws| server.desktop.workspaces.get(ws))
        .map(|ws| ws.placement(view))
        .unwrap_or(Placement::Untracked)
}

fn move_view(server: &mut Server, args: &[&str]) -> Reply {
    let (dx, dy) = match args {
        [dx, dy] => (parse::<i32>(dx, MOVE_USAGE)?, parse::<i32>(dy, MOVE_USAGE)?),
        _ => return Err(CommandError::Usage(MOVE_USAGE)),
    };
    let view = focused_view(server)?;
    if placement(server, view) != Placement::Floating {
        return Err(CommandError::Failed("Only floating views can be moved".to_string()));
    }

    let desktop = &mut server.desktop;
    desktop.animation.cancel_tasks(&mut desktop.views, view);
    if let Some(v) = desktop.views.get_mut(view) {
        v.place(v.x + dx, v.y + dy);
    }
    Ok(String::new())
}

fn resize(server: &mut Server, args: &[&str]) -> Reply {
    let (width, height) = match args {
        [w, h] => (parse::<i32>(w, RESIZE_USAGE)?, parse::<i32>(h, RESIZE_USAGE)?),
        _ => return Err(CommandError::Usage(RESIZE_USAGE)),
    };
    if width <= 0 || height <= 0 {
        return Err(CommandError::Usage(RESIZE_USAGE));
    }

    let view = focused_view(server)?;
    let placement = placement(server, view);
    let Some(v) = server.desktop.views.get_mut(view) else {
        return Err(CommandError::NoFocusedView);
    };
    match placement {
        Placement::Floating => v.resize(width, height),
        // The column decides the height of its tiles
        Placement::Tiled { .. } => v.resize(width, v.geometry.height),
        Placement::Fullscreen | Placement::Untracked => {
            return Err(CommandError::Failed("View cannot be resized".to_string()))
        }
    }
    Ok(String::new())
}

/// Stacks the focused view at the bottom of the column on its left.
fn insert_into_column(server: &mut Server) -> Reply {
    let view = focused_view(server)?;
    let Placement::Tiled { column, .. } = placement(server, view) else {
        return Err(CommandError::Failed("View is not tiled".to_string()));
    };
    if column == 0 {
        return Err(CommandError::Failed("No column on the left".to_string()));
    }

    if let Some(ws) = server.desktop.view_workspace(view) {
        if let Some((workspace, mut ctx)) = server.desktop.workspace_ctx(ws) {
            workspace.insert_into_column(&mut ctx, view, column - 1);
        }
    }
    server.seat.focus_view(&mut server.desktop, Some(view));
    Ok(String::new())
}

/// Moves the bottom tile of the focused column into a column of its own.
fn pop_from_column(server: &mut Server) -> Reply {
    let view = focused_view(server)?;
    let Placement::Tiled { column, .. } = placement(server, view) else {
        return Err(CommandError::Failed("View is not tiled".to_string()));
    };

    if let Some(ws) = server.desktop.view_workspace(view) {
        if let Some((workspace, mut ctx)) = server.desktop.workspace_ctx(ws) {
            workspace.pop_from_column(&mut ctx, column);
        }
    }
    server.seat.focus_view(&mut server.desktop, Some(view));
    Ok(String::new())
}

fn close(server: &mut Server) -> Reply {
    let view = focused_view(server)?;
    if let Some(v) = server.desktop.views.get_mut(view) {
        v.close();
    }
    Ok(String::new())
}

fn config(server: &mut Server, args: &[&str]) -> Reply {
    match args {
        ["mouse_mod", mods] => {
            let modifiers = parse_modifiers(mods).map_err(|e| CommandError::Failed(e.to_string()))?;
            server.seat.set_mouse_mods(modifiers);
            server.config.input.mouse_mods = mods.to_string();
        }
        ["gap", px] => {
            let gap: i32 = parse(px, CONFIG_USAGE)?;
            if gap < 0 {
                return Err(CommandError::Usage(CONFIG_USAGE));
            }
            server.desktop.layout.gap = gap;
            server.config.layout.gap = gap;

            let shown: Vec<_> = server
                .desktop
                .workspaces
                .iter()
                .filter(|ws| ws.output.is_some())
                .map(|ws| ws.index)
                .collect();
            for ws in shown {
                server.desktop.arrange_workspace(ws, true);
            }
        }
        _ => return Err(CommandError::Usage(CONFIG_USAGE)),
    }
    Ok(String::new())
}

fn query(server: &Server, args: &[&str]) -> Reply {
    let value = match args {
        ["focused"] => match server.seat.get_focused_view() {
            Some(view) => {
                let v = server.desktop.views.get(view).ok_or(CommandError::NoFocusedView)?;
                json!({
                    "id": view,
                    "kind": v.kind,
                    "workspace": v.workspace_id,
                    "placement": placement(server, view),
                    "rect": v.current_rect(),
                })
            }
            None => serde_json::Value::Null,
        },
        ["workspaces"] => json!(server.desktop.workspaces),
        ["outputs"] => server
            .desktop
            .outputs
            .outputs()
            .map(|o| {
                json!({
                    "id": o.id,
                    "name": o.name,
                    "layout_box": o.layout_box,
                    "usable_area": o.usable_area,
                    "workspace": server.desktop.workspace_on_output(o.id),
                })
            })
            .collect(),
        _ => return Err(CommandError::Usage(QUERY_USAGE)),
    };
    serde_json::to_string(&value).map_err(|e| CommandError::Failed(e.to_string()))
}
