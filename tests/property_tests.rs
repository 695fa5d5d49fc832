//! Property-based tests for cardboard
//!
//! Random byte strings against the wire decoder, and random sequences of
//! window events and commands against the server's focus bookkeeping.

use proptest::prelude::*;
use std::collections::HashSet;

use cardboard::backend::HeadlessBackend;
use cardboard::commands::dispatch;
use cardboard::config::CardboardConfig;
use cardboard::ipc::{encode_command, parse_command, MAX_ARG_LEN};
use cardboard::view::headless::{surface, NativeSurface};
use cardboard::view::{ViewId, ViewKind};
use cardboard::workspace::Placement;
use cardboard::{Rect, Server};

prop_compose! {
    fn wire_word()(word in "[a-z0-9_+-]{1,40}") -> String {
        word
    }
}

proptest! {
    #[test]
    fn test_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = parse_command(&bytes);
    }

    #[test]
    fn test_encoded_commands_are_accepted(words in prop::collection::vec(wire_word(), 0..12)) {
        let bytes = encode_command(words.as_slice()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(parse_command(&bytes).ok(), Some(words));
    }

    #[test]
    fn test_truncated_commands_are_rejected(words in prop::collection::vec(wire_word(), 1..6), cut in 1usize..50) {
        let bytes = encode_command(words.as_slice()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let keep = bytes.len().saturating_sub(cut);
        prop_assert!(parse_command(&bytes[..keep]).is_err());
    }

    #[test]
    fn test_oversized_words_cannot_be_encoded(extra in 1usize..100) {
        let word = "x".repeat(MAX_ARG_LEN + extra);
        prop_assert!(encode_command(&[word]).is_err());
    }
}

#[derive(Debug, Clone)]
enum Op {
    Map { floating: bool },
    Unmap(usize),
    Destroy(usize),
    Command(&'static str),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|floating| Op::Map { floating }),
        1 => (0usize..16).prop_map(Op::Unmap),
        1 => (0usize..16).prop_map(Op::Destroy),
        4 => prop::sample::select(vec![
            "focus left",
            "focus right",
            "focus up",
            "focus down",
            "focus cycle",
            "toggle_floating",
            "fullscreen",
            "insert_into_column",
            "pop_from_column",
            "workspace switch 0",
            "workspace switch 1",
            "workspace move 1",
            "workspace move 0",
        ])
        .prop_map(Op::Command),
    ]
}

struct Session {
    server: Server,
    views: Vec<ViewId>,
    next_surface: u64,
}

impl Session {
    fn new() -> Result<Self, TestCaseError> {
        let mut config = CardboardConfig::default();
        config.animation.enabled = false;
        let mut server = Server::new(config, Box::new(HeadlessBackend::new()))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        server.add_output("HEADLESS-1", Rect::new(0, 0, 1280, 720));
        Ok(Self {
            server,
            views: Vec::new(),
            next_surface: 1,
        })
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Map { floating } => {
                let mut native = NativeSurface::new(surface(self.next_surface, 1), (400, 300));
                if *floating {
                    native = native.with_fixed_size();
                }
                self.next_surface += 1;
                let geometry = native.geometry();
                let view = self.server.new_view(ViewKind::Native, Box::new(native), geometry);
                self.server.map_view(view);
                self.views.push(view);
            }
            Op::Unmap(i) => {
                if let Some(&view) = self.views.get(i % self.views.len().max(1)) {
                    self.server.unmap_view(view);
                }
            }
            Op::Destroy(i) => {
                if self.views.is_empty() {
                    return;
                }
                let view = self.views.remove(i % self.views.len());
                self.server.unmap_view(view);
                self.server.destroy_view(view);
            }
            Op::Command(line) => {
                let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
                dispatch(&mut self.server, &args);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_focus_stack_stays_consistent(ops in prop::collection::vec(op(), 1..60)) {
        let mut session = Session::new()?;
        for op in &ops {
            session.apply(op);

            let server = &session.server;
            let stack = server.seat.focus_stack();
            let unique: HashSet<_> = stack.iter().collect();
            prop_assert_eq!(unique.len(), stack.len(), "duplicate in focus stack after {:?}", op);

            for view in stack {
                prop_assert!(server.desktop.views.get(*view).is_some(), "destroyed {} still stacked", view);
            }
            if let Some(focused) = server.seat.get_focused_view() {
                prop_assert_eq!(stack.first(), Some(&focused));
                prop_assert!(server.desktop.is_view_visible(focused));
            }
        }
    }

    #[test]
    fn test_mapped_views_have_one_home(ops in prop::collection::vec(op(), 1..60)) {
        let mut session = Session::new()?;
        for op in &ops {
            session.apply(op);
        }

        let server = &session.server;
        for view in server.desktop.views.iter() {
            let homes = server
                .desktop
                .workspaces
                .iter()
                .filter(|ws| ws.placement(view.id) != Placement::Untracked)
                .count();
            prop_assert_eq!(homes, usize::from(view.mapped), "{} mapped={}", view.id, view.mapped);
        }
    }
}
