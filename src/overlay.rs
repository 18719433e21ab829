//! Renderer boundary: turns a frame's draw list into paint operations and
//! paints them with egui.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::engine::EngineState;
use crate::projection::{FrameOutput, Marker};

/// What a shape represents; the style maps it to a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorClass {
    Marker,
    Selected,
    Line,
    Label,
    Error,
}

/// 2D paint operations in screen pixels
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Circle { center: Vec2, radius: f32, color: ColorClass },
    Line { from: Vec2, to: Vec2, color: ColorClass },
    /// Text whose bottom-left corner sits at `anchor`
    Text { anchor: Vec2, text: String, color: ColorClass },
    /// Frame-level status message, painted in the top-left corner
    Status { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub radius: f32,
    pub selected_radius: f32,
    pub line_width: f32,
    pub font_size: f32,
    pub marker_color: [u8; 4],
    pub selected_color: [u8; 4],
    pub line_color: [u8; 4],
    pub label_color: [u8; 4],
    pub error_color: [u8; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 6.0,
            selected_radius: 10.0,
            line_width: 1.5,
            font_size: 14.0,
            marker_color: [255, 64, 64, 200],
            selected_color: [64, 255, 96, 255],
            line_color: [255, 255, 255, 160],
            label_color: [255, 255, 255, 255],
            error_color: [255, 0, 0, 255],
        }
    }
}

impl MarkerStyle {
    /// Unmultiplied RGBA for a color class
    pub fn rgba(&self, color: ColorClass) -> [u8; 4] {
        match color {
            ColorClass::Marker => self.marker_color,
            ColorClass::Selected => self.selected_color,
            ColorClass::Line => self.line_color,
            ColorClass::Label => self.label_color,
            ColorClass::Error => self.error_color,
        }
    }

    pub fn color32(&self, color: ColorClass) -> egui::Color32 {
        let [r, g, b, a] = self.rgba(color);
        egui::Color32::from_rgba_unmultiplied(r, g, b, a)
    }
}

pub const UNAVAILABLE_STATUS: &str = "camera view unavailable";

fn label(marker: &Marker) -> String {
    format!("#{}  {:.1}m", marker.id, marker.world_distance)
}

/// Paint operations for one frame.
///
/// Lines go first so markers cover them; markers keep draw-list order so the
/// selected one ends up on top.
pub fn build_draw_ops(output: &FrameOutput, style: &MarkerStyle) -> Vec<DrawOp> {
    let list = match output {
        FrameOutput::Unavailable(err) => {
            return vec![DrawOp::Status {
                text: format!("{UNAVAILABLE_STATUS}: {err}"),
            }]
        }
        FrameOutput::Ready(list) => list,
    };

    let mut ops = Vec::with_capacity(list.markers.len() * 2);

    ops.extend(list.markers.iter().filter(|m| m.show_line).map(|marker| DrawOp::Line {
        from: list.target,
        to: marker.screen,
        color: ColorClass::Line,
    }));

    for marker in &list.markers {
        let (radius, color) = if marker.selected {
            (style.selected_radius, ColorClass::Selected)
        } else {
            (style.radius, ColorClass::Marker)
        };
        ops.push(DrawOp::Circle {
            center: marker.screen,
            radius,
            color,
        });
        if marker.show_label {
            ops.push(DrawOp::Text {
                anchor: marker.screen + Vec2::new(radius + 2.0, -radius),
                text: label(marker),
                color: ColorClass::Label,
            });
        }
    }

    ops
}

fn pos(v: Vec2) -> egui::Pos2 {
    egui::pos2(v.x, v.y)
}

/// Paint `ops` in order onto an egui layer
pub fn paint(painter: &egui::Painter, ops: &[DrawOp], style: &MarkerStyle) {
    let font = egui::FontId::proportional(style.font_size);

    for op in ops {
        match op {
            DrawOp::Circle { center, radius, color } => {
                painter.circle_filled(pos(*center), *radius, style.color32(*color));
            }
            DrawOp::Line { from, to, color } => {
                painter.line_segment(
                    [pos(*from), pos(*to)],
                    egui::Stroke::new(style.line_width, style.color32(*color)),
                );
            }
            DrawOp::Text { anchor, text, color } => {
                painter.text(
                    pos(*anchor),
                    egui::Align2::LEFT_BOTTOM,
                    text,
                    font.clone(),
                    style.color32(*color),
                );
            }
            DrawOp::Status { text } => {
                painter.text(
                    painter.clip_rect().left_top() + egui::vec2(8.0, 8.0),
                    egui::Align2::LEFT_TOP,
                    text,
                    font.clone(),
                    style.color32(ColorClass::Error),
                );
            }
        }
    }
}

/// Settings window, shown only while the overlay is interactive
pub fn settings_window(ctx: &egui::Context, engine: &EngineState) {
    if !engine.is_interactive() {
        return;
    }

    let current = engine.ui_settings();
    let mut edited = current;
    let tracked = engine.tracked_count();

    egui::Window::new("Overlay")
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.checkbox(&mut edited.always_show_labels, "Show all labels");
            ui.checkbox(&mut edited.always_show_lines, "Show all lines");
            ui.separator();
            ui.label(format!("Tracked objects: {tracked}"));
        });

    if edited != current {
        engine.set_ui_settings(edited);
    }
}
