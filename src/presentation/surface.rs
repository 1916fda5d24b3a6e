// Drawing surfaces - backend-neutral drawing primitives and an SVG writer
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
}

impl Stroke {
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
    pub opacity: f64,
}

impl Fill {
    pub fn new(color: impl Into<String>, opacity: f64) -> Self {
        Self {
            color: color.into(),
            opacity,
        }
    }
}

/// Something a renderer can draw pixel-space geometry onto.
pub trait Surface {
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke);
    /// Fill the closed polygon through `points`.
    fn fill_path(&mut self, points: &[Point], fill: &Fill);
    fn circle(&mut self, center: Point, radius: f64, fill: &Fill);
}

/// `M x,y L x,y ...` with two decimals. Empty for fewer than one point.
pub fn path_data(points: &[Point]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{} {:.2},{:.2}", command, p.x, p.y);
    }
    out
}

/// Surface collecting elements into an SVG document.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    elements: Vec<String>,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn to_svg_string(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = self.width,
            h = self.height
        );
        svg.push('\n');
        for element in &self.elements {
            svg.push_str("  ");
            svg.push_str(element);
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Surface for SvgSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke) {
        if points.is_empty() {
            return;
        }
        self.elements.push(format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-linejoin="round"/>"#,
            path_data(points),
            stroke.color,
            stroke.width,
            stroke.opacity
        ));
    }

    fn fill_path(&mut self, points: &[Point], fill: &Fill) {
        if points.len() < 3 {
            return;
        }
        self.elements.push(format!(
            r#"<path d="{} Z" fill="{}" fill-opacity="{}" stroke="none"/>"#,
            path_data(points),
            fill.color,
            fill.opacity
        ));
    }

    fn circle(&mut self, center: Point, radius: f64, fill: &Fill) {
        self.elements.push(format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" fill-opacity="{}"/>"#,
            center.x, center.y, radius, fill.color, fill.opacity
        ));
    }
}
