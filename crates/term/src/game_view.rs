//! GameView: maps `core::GameState` into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::{GamePhase, GameState};
use crate::fb::{CellStyle, FrameBuffer};
use crate::types::{PieceKind, Rgb, BOARD_HEIGHT, BOARD_WIDTH};

const PANEL_MIN_WIDTH: u16 = 12;

const BLACK: Rgb = Rgb::new(0, 0, 0);
const WELL_BG: Rgb = Rgb::new(30, 30, 40);

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Ledger-side values shown next to the board.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidePanel<'a> {
    /// Mirrored play-credit balance (None until first fetched)
    pub plays: Option<u32>,
    /// Latest status line from the sync client
    pub status: Option<&'a str>,
    /// Pre-formatted leaderboard rows
    pub leaderboard: &'a [String],
}

/// Renders the well, the active piece and a HUD panel.
pub struct GameView {
    /// Board cell width in terminal columns.
    cell_w: u16,
}

impl Default for GameView {
    fn default() -> Self {
        // Two columns per cell roughly squares the glyph aspect ratio.
        Self { cell_w: 2 }
    }
}

impl GameView {
    pub fn new(cell_w: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
        }
    }

    /// Size of the bordered well in terminal cells.
    pub fn frame_size(&self) -> (u16, u16) {
        (
            (BOARD_WIDTH as u16) * self.cell_w + 2,
            BOARD_HEIGHT as u16 + 2,
        )
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(
        &self,
        state: &GameState,
        panel: &SidePanel<'_>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().cell(' '));

        let (frame_w, frame_h) = self.frame_size();
        let start_y = viewport.height.saturating_sub(frame_h) / 2;
        let start_x = 0;

        self.draw_border(fb, start_x, start_y, frame_w, frame_h);

        let board = state.display_board();
        for (y, row) in board.rows().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let (ch, style) = match cell {
                    Some(kind) => ('█', piece_style(*kind)),
                    None => ('·', CellStyle::plain(Rgb::new(90, 90, 100), WELL_BG).dim()),
                };
                let px = start_x + 1 + (x as u16) * self.cell_w;
                fb.fill_rect(px, start_y + 1 + y as u16, self.cell_w, 1, ch, style);
            }
        }

        self.draw_side_panel(fb, state, panel, viewport, start_x + frame_w + 2, start_y);

        match state.phase() {
            GamePhase::Idle => self.draw_overlay(fb, start_x, start_y, "PRESS N"),
            GamePhase::GameOver => self.draw_overlay(fb, start_x, start_y, "GAME OVER"),
            GamePhase::Active => {}
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, state: &GameState, panel: &SidePanel<'_>, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(state, panel, viewport, &mut fb);
        fb
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16) {
        let style = CellStyle::plain(Rgb::new(200, 200, 200), BLACK);
        let right = x + w - 1;
        let bottom = y + h - 1;

        fb.set(x, y, style.cell('┌'));
        fb.set(right, y, style.cell('┐'));
        fb.set(x, bottom, style.cell('└'));
        fb.set(right, bottom, style.cell('┘'));
        fb.fill_rect(x + 1, y, w - 2, 1, '─', style);
        fb.fill_rect(x + 1, bottom, w - 2, 1, '─', style);
        fb.fill_rect(x, y + 1, 1, h - 2, '│', style);
        fb.fill_rect(right, y + 1, 1, h - 2, '│', style);
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        state: &GameState,
        panel: &SidePanel<'_>,
        viewport: Viewport,
        panel_x: u16,
        start_y: u16,
    ) {
        if viewport.width.saturating_sub(panel_x) < PANEL_MIN_WIDTH {
            return;
        }

        let label = CellStyle::default().bold();
        let value = CellStyle::plain(Rgb::new(200, 200, 200), BLACK);

        let plays = panel
            .plays
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let rows: [(&str, String); 6] = [
            ("SCORE", state.score().to_string()),
            ("LEVEL", state.level().to_string()),
            ("LINES", state.lines().to_string()),
            ("COMBO", state.combo().to_string()),
            ("NEXT", state.next_piece().as_str().to_string()),
            ("PLAYS", plays),
        ];

        let mut y = start_y;
        for (name, text) in rows.iter() {
            fb.put_str(panel_x, y, name, label);
            fb.put_str(panel_x + 7, y, text, value);
            y = y.saturating_add(1);
        }

        if let Some(status) = panel.status {
            y = y.saturating_add(1);
            fb.put_str(panel_x, y, status, value.dim());
            y = y.saturating_add(1);
        }

        if !panel.leaderboard.is_empty() {
            y = y.saturating_add(1);
            fb.put_str(panel_x, y, "LEADERBOARD", label);
            for line in panel.leaderboard {
                y = y.saturating_add(1);
                if y >= viewport.height {
                    break;
                }
                fb.put_str(panel_x, y, line, value);
            }
        }
    }

    fn draw_overlay(&self, fb: &mut FrameBuffer, start_x: u16, start_y: u16, text: &str) {
        let (frame_w, frame_h) = self.frame_size();
        let text_w = text.chars().count() as u16;
        let x = start_x + frame_w.saturating_sub(text_w) / 2;
        fb.put_str(
            x,
            start_y + frame_h / 2,
            text,
            CellStyle::plain(Rgb::new(255, 255, 255), BLACK).bold(),
        );
    }
}

fn piece_style(kind: PieceKind) -> CellStyle {
    CellStyle::plain(kind.color(), WELL_BG).bold()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_border_corners() {
        let state = GameState::new(1);
        let fb = GameView::default().render(&state, &SidePanel::default(), Viewport::new(22, 22));

        assert_eq!(fb.get(0, 0).unwrap().ch, '┌');
        assert_eq!(fb.get(21, 0).unwrap().ch, '┐');
        assert_eq!(fb.get(0, 21).unwrap().ch, '└');
        assert_eq!(fb.get(21, 21).unwrap().ch, '┘');
    }

    #[test]
    fn active_piece_uses_its_color() {
        let mut state = GameState::new(3);
        state.start();
        let kind = state.active().unwrap().kind;

        let fb = GameView::default().render(&state, &SidePanel::default(), Viewport::new(22, 22));
        let colored = fb
            .text()
            .chars()
            .filter(|c| *c == '█')
            .count();
        // 4 cells, 2 columns each
        assert_eq!(colored, 8);

        let style = (0..22)
            .flat_map(|y| (0..22).map(move |x| (x, y)))
            .filter_map(|(x, y)| fb.get(x, y))
            .find(|c| c.ch == '█')
            .unwrap()
            .style;
        assert_eq!(style.fg, kind.color());
    }

    #[test]
    fn panel_shows_plays_and_leaderboard() {
        let mut state = GameState::new(1);
        state.start();
        let rows = vec!["1. Player4a44 120".to_string()];
        let panel = SidePanel {
            plays: Some(7),
            status: Some("Check-in successful"),
            leaderboard: &rows,
        };

        let text = GameView::default()
            .render(&state, &panel, Viewport::new(60, 24))
            .text();
        assert!(text.contains("SCORE"));
        assert!(text.contains("PLAYS  7"));
        assert!(text.contains("Check-in successful"));
        assert!(text.contains("Player4a44 120"));
    }

    #[test]
    fn idle_state_shows_prompt() {
        let state = GameState::new(1);
        let text = GameView::default()
            .render(&state, &SidePanel::default(), Viewport::new(22, 22))
            .text();
        assert!(text.contains("PRESS N"));
    }
}
