// Pointer interactions - brush, pan and hover over a mapped axis
use crate::domain::scale::ScaleMapping;

/// Wheel delta that scales the brushed extent by a factor of e.
const WHEEL_ZOOM_SCALE: f64 = 400.0;

/// Part of the brush a drag started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushHandle {
    Min,
    Max,
    /// The selected band itself; moves the range keeping its width.
    Both,
    /// Empty space; selects a new range from the press point.
    Free,
}

#[derive(Debug, Clone, Copy)]
struct BrushDrag {
    handle: BrushHandle,
    origin: f64,
    min_px: f64,
    max_px: f64,
}

/// Range selection on one axis. Every emitted range lies inside the
/// mapping's domain and is ordered `min <= max`.
#[derive(Debug, Clone)]
pub struct Brush {
    mapping: ScaleMapping,
    value: (f64, f64),
    drag: Option<BrushDrag>,
}

impl Brush {
    pub fn new(mapping: ScaleMapping, value: (f64, f64)) -> Self {
        Self {
            mapping,
            value,
            drag: None,
        }
    }

    pub fn value(&self) -> (f64, f64) {
        self.value
    }

    pub fn set_value(&mut self, value: (f64, f64)) {
        self.value = value;
    }

    pub fn set_mapping(&mut self, mapping: ScaleMapping) {
        self.mapping = mapping;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn press(&mut self, handle: BrushHandle, px: f64) {
        self.drag = Some(BrushDrag {
            handle,
            origin: px,
            min_px: self.mapping.apply(self.value.0),
            max_px: self.mapping.apply(self.value.1),
        });
    }

    /// Pointer moved to `px` with the button held. Returns the new range,
    /// or `None` when no drag is in progress.
    pub fn drag(&mut self, px: f64) -> Option<(f64, f64)> {
        let drag = self.drag?;
        let dx = px - drag.origin;
        let m = &self.mapping;
        let value = match drag.handle {
            BrushHandle::Min => clamp_range(m.domain(), m.invert(drag.min_px + dx), m.invert(drag.max_px), false),
            BrushHandle::Max => clamp_range(m.domain(), m.invert(drag.min_px), m.invert(drag.max_px + dx), false),
            BrushHandle::Both => clamp_range(
                m.domain(),
                m.invert(drag.min_px + dx),
                m.invert(drag.max_px + dx),
                true,
            ),
            BrushHandle::Free => clamp_range(m.domain(), m.invert(drag.origin), m.invert(px), false),
        };
        self.value = value;
        Some(value)
    }

    pub fn release(&mut self) {
        self.drag = None;
    }

    /// Zoom the range about the pointer. Positive `dy` widens it.
    pub fn wheel(&mut self, px: f64, dy: f64) -> (f64, f64) {
        let p1 = self.mapping.apply(self.value.0);
        let p2 = self.mapping.apply(self.value.1);
        let mid = px.clamp(p1.min(p2), p1.max(p2));
        let factor = (dy / WHEEL_ZOOM_SCALE).exp();
        let v1 = self.mapping.invert((p1 - mid) * factor + mid);
        let v2 = self.mapping.invert((p2 - mid) * factor + mid);
        self.value = clamp_range(self.mapping.domain(), v1, v2, false);
        self.value
    }
}

/// Order and clamp `(p1, p2)` into `domain`. With `keep_distance` the pair
/// is shifted back inside instead, preserving its width where possible.
fn clamp_range(domain: (f64, f64), mut p1: f64, mut p2: f64, keep_distance: bool) -> (f64, f64) {
    let (min, max) = domain;
    if p1 > p2 {
        (p1, p2) = (p2, p1);
    }
    if keep_distance {
        let width = p2 - p1;
        if p1 < min {
            (p1, p2) = (min, min + width);
        }
        if p2 > max {
            (p1, p2) = (max - width, max);
        }
        (p1.max(min), p2)
    } else {
        (p1.clamp(min, max), p2.clamp(min, max))
    }
}

/// Drag-to-pan over an axis. The domain slides freely; the final range is
/// committed exactly once, on release.
#[derive(Debug, Clone)]
pub struct Pan {
    mapping: ScaleMapping,
    origin: Option<f64>,
}

impl Pan {
    pub fn new(mapping: ScaleMapping) -> Self {
        Self { mapping, origin: None }
    }

    pub fn set_mapping(&mut self, mapping: ScaleMapping) {
        self.mapping = mapping;
    }

    pub fn press(&mut self, px: f64) {
        self.origin = Some(px);
    }

    /// Live preview of the panned range.
    pub fn drag(&self, px: f64) -> Option<(f64, f64)> {
        self.origin.map(|origin| self.panned(px - origin))
    }

    /// Ends the drag, returning the range to commit. `None` if no drag was
    /// in progress.
    pub fn release(&mut self, px: f64) -> Option<(f64, f64)> {
        let origin = self.origin.take()?;
        Some(self.panned(px - origin))
    }

    fn panned(&self, dx: f64) -> (f64, f64) {
        let (r0, r1) = self.mapping.range();
        let v1 = self.mapping.invert(r0 - dx);
        let v2 = self.mapping.invert(r1 - dx);
        (v1.min(v2), v1.max(v2))
    }
}

/// Domain value under the pointer.
pub fn hover(mapping: &ScaleMapping, px: f64) -> f64 {
    mapping.invert(px)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scale::NumericalScale;

    fn mapping() -> ScaleMapping {
        ScaleMapping::new(NumericalScale::linear(0.0, 100.0), (0.0, 200.0)).unwrap()
    }

    #[test]
    fn test_brush_min_handle_clamps() {
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        brush.press(BrushHandle::Min, 40.0);
        assert_eq!(brush.drag(60.0), Some((30.0, 60.0)));
        assert_eq!(brush.drag(-100.0), Some((0.0, 60.0)));
        // Dragging past the other handle swaps the ends.
        assert_eq!(brush.drag(200.0), Some((60.0, 100.0)));
        brush.release();
        assert!(!brush.is_dragging());
        assert_eq!(brush.drag(10.0), None);
    }

    #[test]
    fn test_brush_both_keeps_width() {
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        brush.press(BrushHandle::Both, 100.0);
        assert_eq!(brush.drag(120.0), Some((30.0, 70.0)));
        assert_eq!(brush.drag(300.0), Some((60.0, 100.0)));
        assert_eq!(brush.drag(0.0), Some((0.0, 40.0)));
    }

    #[test]
    fn test_brush_free_selection() {
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        brush.press(BrushHandle::Free, 180.0);
        assert_eq!(brush.drag(100.0), Some((50.0, 90.0)));
        assert_eq!(brush.drag(250.0), Some((90.0, 100.0)));
        assert_eq!(brush.value(), (90.0, 100.0));
    }

    #[test]
    fn test_brush_wheel_zoom() {
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        let (min, max) = brush.wheel(80.0, 0.0);
        assert!((min - 20.0).abs() < 1e-9 && (max - 60.0).abs() < 1e-9);

        let (min, max) = brush.wheel(80.0, 400.0 * 2f64.ln());
        assert!((min - 0.0).abs() < 1e-9);
        assert!((max - 80.0).abs() < 1e-9);

        // Pointer outside the band zooms about the nearest edge.
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        let (min, max) = brush.wheel(0.0, -400.0 * 2f64.ln());
        assert!((min - 20.0).abs() < 1e-9);
        assert!((max - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_brush_wheel_zoom_out_stays_in_domain() {
        let mut brush = Brush::new(mapping(), (20.0, 60.0));
        assert_eq!(brush.wheel(80.0, 400.0 * 10f64.ln()), (0.0, 100.0));
        assert_eq!(brush.value(), (0.0, 100.0));
    }

    #[test]
    fn test_pan_previews_and_commits_once() {
        let mut pan = Pan::new(mapping());
        assert_eq!(pan.drag(10.0), None);
        pan.press(100.0);
        assert_eq!(pan.drag(120.0), Some((-10.0, 90.0)));
        assert_eq!(pan.drag(60.0), Some((20.0, 120.0)));
        assert_eq!(pan.release(80.0), Some((10.0, 110.0)));
        assert_eq!(pan.release(80.0), None);
    }

    #[test]
    fn test_hover() {
        assert_eq!(hover(&mapping(), 50.0), 25.0);
        let reversed = ScaleMapping::new(NumericalScale::linear(0.0, 10.0), (100.0, 0.0)).unwrap();
        assert_eq!(hover(&reversed, 25.0), 7.5);
    }
}
