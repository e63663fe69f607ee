//! Software-rendered overlay using `minifb`.
//!
//! Layout (coordinates at scale 1, multiplied by the display scale):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  FPS: 30                                                     │
//! │                                                              │
//! │  ┌──┐                     ○ index tip                        │
//! │  │  │                      ╲                                 │
//! │  │██│                       ● pinch centre (green = adjust)  │
//! │  │██│   hand skeleton        ╲                               │
//! │  └──┘                           ○ thumb tip                  │
//! │  45%                                                         │
//! │  status bar                                                  │
//! │  key legend                                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use hand_pose::{CONNECTIONS, Finger, HandPose, ids};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use pinch_volume::{DistanceRange, map_distance_to_bar};
use tracing::debug;

use crate::app::{FrameReport, Gesture};
use crate::gesture::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Colors / layout
// ════════════════════════════════════════════════════════════════════════════

const BG_COLOR:       u32 = 0xFF1A1A2E;
const BONE_COLOR:     u32 = 0xFFEEEEEE;
const JOINT_COLOR:    u32 = 0xFFFF3030;
const PINCH_COLOR:    u32 = 0xFFFF00FF;  // magenta
const ADJUST_COLOR:   u32 = 0xFF00FF00;  // green
const BAR_COLOR:      u32 = 0xFF3060FF;
const FPS_COLOR:      u32 = 0xFF4080FF;
const STATUS_BG:      u32 = 0xFF0F3460;
const STATUS_FG:      u32 = 0xFFEEEEEE;
const LEGEND_FG:      u32 = 0xFF888888;

const BAR_LEFT:       i32 = 50;
const BAR_RIGHT:      i32 = 85;
const BAR_TOP:        i32 = 150;
const BAR_BOTTOM:     i32 = 400;
const LEVEL_TEXT_POS: (i32, i32) = (40, 450);
const FPS_TEXT_POS:   (i32, i32) = (40, 70);
const TIP_RADIUS:     i32 = 15;
const STATUS_H:       i32 = 44;

const LEGEND: &str =
    "Mouse=move  Up/Down=pinch  1-5=finger  V=volume pose  F=fist  O=open  H=hide  Q=quit";

// ════════════════════════════════════════════════════════════════════════════
// Canvas — pixel buffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

/// An ARGB framebuffer with clipped drawing helpers.
pub struct Canvas {
    buf: Vec<u32>,
    w:   usize,
    h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.buf[i])
    }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(color);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return None;
        }
        Some(y as usize * self.w + x as usize)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.buf[i] = color;
        }
    }

    /// Fill the rectangle with corners `(x0, y0)` and `(x1, y1)`, inclusive.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (x0, x1) = (x0.min(x1).max(0), x0.max(x1).min(self.w as i32 - 1));
        let (y0, y1) = (y0.min(y1).max(0), y0.max(y1).min(self.h as i32 - 1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.buf[y as usize * self.w + x as usize] = color;
            }
        }
    }

    /// Rectangle outline `thickness` pixels wide, drawn inwards.
    pub fn draw_border(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: i32, color: u32) {
        let t = thickness.max(1) - 1;
        self.fill_rect(x0, y0, x1, y0 + t, color);
        self.fill_rect(x0, y1 - t, x1, y1, color);
        self.fill_rect(x0, y0, x0 + t, y1, color);
        self.fill_rect(x1 - t, y0, x1, y1, color);
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham line with a square pen `thickness` pixels across.
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), thickness: i32, color: u32) {
        let (mut x, mut y) = from;
        let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
        let (sx, sy) = (if x < to.0 { 1 } else { -1 }, if y < to.1 { 1 } else { -1 });
        let half = thickness.max(1) / 2;
        let mut err = dx + dy;
        loop {
            if half == 0 {
                self.set_pixel(x, y, color);
            } else {
                self.fill_rect(x - half, y - half, x + half, y + half, color);
            }
            if (x, y) == to { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap text; each font pixel is drawn as a `px`×`px` block.
    pub fn draw_label(&mut self, text: &str, x: i32, y: i32, px: i32, color: u32) {
        let px = px.max(1);
        let mut cx = x;
        for ch in text.chars() {
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3 {
                    if bits & (1 << (2 - col)) != 0 {
                        let gx = cx + col * px;
                        let gy = y + row as i32 * px;
                        self.fill_rect(gx, gy, gx + px - 1, gy + px - 1, color);
                    }
                }
            }
            cx += 4 * px; // 3 wide + 1 gap
            if cx >= self.w as i32 { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:       Window,
    canvas:       Canvas,
    sim_tx:       Sender<SimInput>,
    scale:        f64,
    last_pointer: Option<(i32, i32)>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, w: usize, h: usize, scale: f64) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Hand Volume — pinch to set, fist to mute",
            w, h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(w, h),
            sim_tx,
            scale,
            last_pointer: None,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    fn send(&self, input: SimInput) {
        // The source may already be gone (stream mode); nothing to do then.
        let _ = self.sim_tx.send(input);
    }

    /// Poll keyboard and mouse, translating them to [`SimInput`] events.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        // Keys that trigger on first press only
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        // Keys that repeat while held
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            self.send(SimInput::Key(SimKey::Quit));
            return false;
        }

        if held(Key::Up)   { self.send(SimInput::Key(SimKey::PinchWider));    }
        if held(Key::Down) { self.send(SimInput::Key(SimKey::PinchNarrower)); }

        let finger_keys = [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5];
        for (key, finger) in finger_keys.into_iter().zip(Finger::ALL) {
            if one_shot(key) {
                self.send(SimInput::Key(SimKey::ToggleFinger(finger)));
            }
        }

        if one_shot(Key::V) { self.send(SimInput::Key(SimKey::VolumePose)); }
        if one_shot(Key::F) { self.send(SimInput::Key(SimKey::Fist));       }
        if one_shot(Key::O) { self.send(SimInput::Key(SimKey::OpenHand));   }
        if one_shot(Key::H) { self.send(SimInput::Key(SimKey::ToggleHand)); }

        let pointer = self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| (x as i32, y as i32));
        if pointer.is_some() && pointer != self.last_pointer {
            if let Some((x, y)) = pointer {
                self.send(SimInput::PointerMoved { x, y });
            }
            self.last_pointer = pointer;
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, report: &FrameReport, range: DistanceRange, fps: f64, source: &str) {
        let s = self.scale;
        let sc = |v: i32| (v as f64 * s) as i32;
        let text_px = sc(4).max(2);

        self.canvas.clear(BG_COLOR);

        // ── Hand skeleton ─────────────────────────────────────────────────
        if let Some(pose) = &report.pose {
            draw_skeleton(&mut self.canvas, pose, sc(2).max(1), sc(4).max(2));
        }

        // ── Pinch line and markers ────────────────────────────────────────
        if let (Some(pose), Some(center)) = (&report.pose, report.center) {
            let thumb = pose.get(ids::THUMB_TIP);
            let index = pose.get(ids::INDEX_TIP);
            let r = sc(TIP_RADIUS);
            self.canvas.fill_circle(thumb.x, thumb.y, r, PINCH_COLOR);
            self.canvas.fill_circle(index.x, index.y, r, PINCH_COLOR);
            self.canvas.draw_line((thumb.x, thumb.y), (index.x, index.y), sc(3), PINCH_COLOR);
            let center_color = if report.gesture == Gesture::Adjust { ADJUST_COLOR } else { PINCH_COLOR };
            self.canvas.fill_circle(center.0, center.1, r, center_color);
        }

        // ── Volume bar ────────────────────────────────────────────────────
        let (left, right, top, bottom) = (sc(BAR_LEFT), sc(BAR_RIGHT), sc(BAR_TOP), sc(BAR_BOTTOM));
        self.canvas.draw_border(left, top, right, bottom, sc(3).max(1), BAR_COLOR);
        if let Some(d) = report.pinch_distance {
            let fill_top = map_distance_to_bar(d, range, bottom, top);
            self.canvas.fill_rect(left, fill_top, right, bottom, BAR_COLOR);
        }
        if let Some(level) = report.mapped_level {
            let (x, y) = LEVEL_TEXT_POS;
            self.canvas.draw_label(&level.to_string(), sc(x), sc(y), text_px, BAR_COLOR);
        }

        // ── FPS ───────────────────────────────────────────────────────────
        let (x, y) = FPS_TEXT_POS;
        self.canvas.draw_label(&format!("FPS: {}", fps as u32), sc(x), sc(y), text_px, FPS_COLOR);

        // ── Status bar ────────────────────────────────────────────────────
        let (w, h) = (self.canvas.w as i32, self.canvas.h as i32);
        let status_h = sc(STATUS_H);
        self.canvas.fill_rect(0, h - status_h, w - 1, h - 1, STATUS_BG);
        self.canvas.draw_label(&status_line(report, source), 10, h - status_h + 6, 2, STATUS_FG);

        // ── Key legend ────────────────────────────────────────────────────
        self.canvas.draw_label(LEGEND, 10, h - 14, 2, LEGEND_FG);

        if let Err(e) = self.window.update_with_buffer(self.canvas.pixels(), self.canvas.w, self.canvas.h) {
            debug!(error = %e, "window update failed");
        }
    }
}

fn draw_skeleton(canvas: &mut Canvas, pose: &HandPose, bone: i32, joint: i32) {
    for &(a, b) in CONNECTIONS.iter() {
        let (p, q) = (pose.get(a), pose.get(b));
        canvas.draw_line((p.x, p.y), (q.x, q.y), bone, BONE_COLOR);
    }
    for kp in pose.keypoints() {
        canvas.fill_circle(kp.x, kp.y, joint, JOINT_COLOR);
    }
}

/// One-line summary of the frame for the status bar.
fn status_line(report: &FrameReport, source: &str) -> String {
    let mut line = format!("{}  gesture: {}", source, report.gesture.label());
    if let Some(f) = report.fingers {
        line.push_str(&format!("  fingers: {}", f));
    }
    if let Some(d) = report.pinch_distance {
        line.push_str(&format!("  pinch: {}", d));
    }
    if let Some(level) = report.target {
        line.push_str(&format!("  volume: {}", level));
    }
    line
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_pose::FingerState;
    use pinch_volume::quantize;

    #[test]
    fn drawing_is_clipped() {
        let mut c = Canvas::new(20, 10);
        c.fill_rect(-5, -5, 100, 100, 0xFF000001);
        assert!(c.pixels().iter().all(|&p| p == 0xFF000001));
        c.fill_circle(-50, -50, 3, 0xFF000002);
        c.draw_line((-10, 5), (30, 5), 3, 0xFF000003);
        assert_eq!(c.pixel(0, 5), Some(0xFF000003));
        assert_eq!(c.pixel(19, 5), Some(0xFF000003));
        assert_eq!(c.pixel(20, 5), None);
    }

    #[test]
    fn line_reaches_both_ends() {
        let mut c = Canvas::new(50, 50);
        c.draw_line((3, 40), (45, 7), 1, 0xFF00FF00);
        assert_eq!(c.pixel(3, 40), Some(0xFF00FF00));
        assert_eq!(c.pixel(45, 7), Some(0xFF00FF00));
    }

    #[test]
    fn border_leaves_inside_untouched() {
        let mut c = Canvas::new(30, 30);
        c.draw_border(5, 5, 20, 20, 2, 0xFFFFFFFF);
        assert_eq!(c.pixel(5, 12), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(6, 12), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(12, 12), Some(BG_COLOR));
    }

    #[test]
    fn label_scales_glyph_pixels() {
        let mut c = Canvas::new(40, 20);
        c.draw_label("1", 0, 0, 2, 0xFFFFFFFF);
        // Top row of '1' is 0b010: middle column only, doubled.
        assert_eq!(c.pixel(2, 0), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(3, 1), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(0, 0), Some(BG_COLOR));
    }

    #[test]
    fn percent_sign_has_a_glyph() {
        assert_ne!(char_glyph('%'), char_glyph('\u{1}'));
    }

    #[test]
    fn status_line_mentions_gesture_and_volume() {
        let report = FrameReport {
            gesture:        Gesture::Adjust,
            pose:           None,
            pinch_distance: Some(125),
            center:         Some((10, 10)),
            fingers:        Some(FingerState::new([true, true, true, true, false])),
            mapped_level:   Some(quantize(50)),
            target:         Some(quantize(50)),
            outcome:        None,
        };
        let line = status_line(&report, "simulation");
        assert_eq!(line, "simulation  gesture: adjust  fingers: 11110  pinch: 125  volume: 50%");
    }
}
