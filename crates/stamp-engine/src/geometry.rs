//! Coordinate spaces shared by the canvas and the PDF writer.
//!
//! - Screen space: canvas pixels, origin at the top-left of the rendered page, y down.
//! - Page space: PDF points, origin at the top-left of the page's visible box
//!   as displayed (after `/Rotate`), y down.
//! - User space: native PDF coordinates, origin at the bottom-left, y up.
//!
//! Screen and page space differ only by the display scale. Page and user space
//! differ by the page box offset, the page rotation and a vertical flip.

/// Screen pixels per PDF point used when the caller does not pick one.
pub const DEFAULT_DISPLAY_SCALE: f32 = 1.5;

/// Fallback page size (US Letter) for pages without a usable box.
pub const LETTER: PageBox = PageBox { left: 0.0, bottom: 0.0, right: 612.0, top: 792.0 };

/// A position on the canvas, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A position on the page in points, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Ratio between canvas pixels and PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale(f32);

impl DisplayScale {
    /// Returns `None` for zero, negative or non-finite factors.
    pub fn new(factor: f32) -> Option<Self> {
        (factor.is_finite() && factor > 0.0).then_some(Self(factor))
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    pub fn to_page(self, point: ScreenPoint) -> PagePoint {
        PagePoint { x: point.x / self.0, y: point.y / self.0 }
    }

    pub fn to_screen(self, point: PagePoint) -> ScreenPoint {
        ScreenPoint { x: point.x * self.0, y: point.y * self.0 }
    }

    /// Converts a length in screen pixels to points.
    pub fn to_points(self, pixels: f32) -> f32 {
        pixels / self.0
    }

    /// Pixel dimensions of a page rendered at this scale.
    pub fn pixel_size(self, size: PageSize) -> (u32, u32) {
        let width = (size.width_pt * self.0).round().max(1.0) as u32;
        let height = (size.height_pt * self.0).round().max(1.0) as u32;
        (width, height)
    }
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self(DEFAULT_DISPLAY_SCALE)
    }
}

/// The visible rectangle of a page in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageBox {
    /// Builds a box from two arbitrary corners.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { left: x0.min(x1), bottom: y0.min(y1), right: x0.max(x1), top: y0.max(y1) }
    }

    pub fn size(&self) -> PageSize {
        PageSize { width_pt: self.right - self.left, height_pt: self.top - self.bottom }
    }
}

/// Clockwise quarter turns applied by a page's `/Rotate` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarters,
}

impl Rotation {
    /// Normalizes a `/Rotate` value. Values that are not a multiple of 90 count as none.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            270 => Rotation::ThreeQuarters,
            _ => Rotation::None,
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarters => 270,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarters)
    }
}

/// A page box together with the rotation it is displayed at.
///
/// Page space is measured on the page as displayed, so after rotation. The
/// frame maps it back onto the unrotated user space the content stream uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub page_box: PageBox,
    pub rotation: Rotation,
}

impl PageFrame {
    pub fn new(page_box: PageBox, rotation: Rotation) -> Self {
        Self { page_box, rotation }
    }

    /// Size of the page as displayed.
    pub fn displayed_size(&self) -> PageSize {
        let size = self.page_box.size();
        if self.rotation.swaps_axes() {
            PageSize { width_pt: size.height_pt, height_pt: size.width_pt }
        } else {
            size
        }
    }

    /// User-space origin of the displayed top-left corner, and the user-space
    /// directions of displayed +x and displayed +y.
    fn basis(&self) -> ((f32, f32), (f32, f32), (f32, f32)) {
        let PageBox { left, bottom, right, top } = self.page_box;
        match self.rotation {
            Rotation::None => ((left, top), (1.0, 0.0), (0.0, -1.0)),
            Rotation::Quarter => ((left, bottom), (0.0, 1.0), (1.0, 0.0)),
            Rotation::Half => ((right, bottom), (-1.0, 0.0), (0.0, 1.0)),
            Rotation::ThreeQuarters => ((right, top), (0.0, -1.0), (-1.0, 0.0)),
        }
    }

    /// Maps a displayed top-left page point to user space.
    pub fn to_user(&self, point: PagePoint) -> (f32, f32) {
        let ((ox, oy), (xx, xy), (yx, yy)) = self.basis();
        (ox + point.x * xx + point.y * yx, oy + point.x * xy + point.y * yy)
    }

    /// `cm` matrix drawing the unit image square upright in the displayed
    /// rectangle whose top-left corner is `top_left`.
    pub fn image_matrix(&self, top_left: PagePoint, width: f32, height: f32) -> [f32; 6] {
        let (_, (xx, xy), (yx, yy)) = self.basis();
        let (e, f) = self.to_user(PagePoint::new(top_left.x, top_left.y + height));
        [width * xx, width * xy, -height * yx, -height * yy, e, f]
    }

    /// `Tm` matrix for upright text whose baseline starts at `baseline`.
    pub fn text_matrix(&self, baseline: PagePoint) -> [f32; 6] {
        let (_, (xx, xy), (yx, yy)) = self.basis();
        let (e, f) = self.to_user(baseline);
        [xx, xy, -yx, -yy, e, f]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_scales() {
        assert!(DisplayScale::new(0.0).is_none());
        assert!(DisplayScale::new(-1.5).is_none());
        assert!(DisplayScale::new(f32::NAN).is_none());
        assert!(DisplayScale::new(f32::INFINITY).is_none());
        assert_eq!(DisplayScale::new(2.0).map(DisplayScale::factor), Some(2.0));
    }

    #[test]
    fn screen_to_page_divides_by_scale() {
        let scale = DisplayScale::default();
        let page = scale.to_page(ScreenPoint::new(200.0, 300.0));

        assert!((page.x - 200.0 / 1.5).abs() < 1e-4);
        assert!((page.y - 200.0).abs() < 1e-4);
    }

    #[test]
    fn page_and_screen_round_trip() {
        let scale = DisplayScale::default();
        for &(x, y) in &[(0.0, 0.0), (200.0, 200.0), (917.5, 13.25), (1.0, 1187.0)] {
            let back = scale.to_screen(scale.to_page(ScreenPoint::new(x, y)));
            assert!((back.x - x).abs() < 1e-3, "x drifted: {x} -> {}", back.x);
            assert!((back.y - y).abs() < 1e-3, "y drifted: {y} -> {}", back.y);
        }
    }

    #[test]
    fn pixel_size_rounds_page_dimensions() {
        let scale = DisplayScale::default();
        let size = PageSize { width_pt: 612.0, height_pt: 792.0 };

        assert_eq!(scale.pixel_size(size), (918, 1188));
    }

    #[test]
    fn unrotated_frame_flips_into_user_space() {
        let page_box = PageBox::from_corners(612.0, 792.0, 0.0, 0.0);
        assert_eq!(page_box, LETTER);
        let frame = PageFrame::new(page_box, Rotation::None);

        assert_eq!(frame.to_user(PagePoint::new(10.0, 20.0)), (10.0, 772.0));
        assert_eq!(
            frame.image_matrix(PagePoint::new(10.0, 20.0), 50.0, 100.0),
            [50.0, 0.0, 0.0, 100.0, 10.0, 672.0]
        );
        assert_eq!(frame.text_matrix(PagePoint::new(10.0, 20.0)), [1.0, 0.0, 0.0, 1.0, 10.0, 772.0]);
    }

    #[test]
    fn frame_honours_offset_origin() {
        let page_box = PageBox::from_corners(50.0, 40.0, 650.0, 840.0);
        let frame = PageFrame::new(page_box, Rotation::None);

        assert_eq!(page_box.size(), PageSize { width_pt: 600.0, height_pt: 800.0 });
        assert_eq!(frame.to_user(PagePoint::new(0.0, 0.0)), (50.0, 840.0));
    }

    #[test]
    fn rotation_normalizes_degrees() {
        assert_eq!(Rotation::from_degrees(0), Rotation::None);
        assert_eq!(Rotation::from_degrees(90), Rotation::Quarter);
        assert_eq!(Rotation::from_degrees(-90), Rotation::ThreeQuarters);
        assert_eq!(Rotation::from_degrees(540), Rotation::Half);
        assert_eq!(Rotation::from_degrees(45), Rotation::None);
        assert_eq!(Rotation::ThreeQuarters.degrees(), 270);
    }

    #[test]
    fn quarter_turns_swap_displayed_size() {
        let frame = PageFrame::new(LETTER, Rotation::Quarter);
        assert_eq!(frame.displayed_size(), PageSize { width_pt: 792.0, height_pt: 612.0 });

        let frame = PageFrame::new(LETTER, Rotation::Half);
        assert_eq!(frame.displayed_size(), PageSize { width_pt: 612.0, height_pt: 792.0 });
    }

    #[test]
    fn displayed_corners_map_to_rotated_user_corners() {
        // Displayed corners in order: top-left, top-right, bottom-left.
        let cases = [
            (Rotation::Quarter, [(0.0, 0.0), (0.0, 792.0), (612.0, 0.0)]),
            (Rotation::Half, [(612.0, 0.0), (0.0, 0.0), (612.0, 792.0)]),
            (Rotation::ThreeQuarters, [(612.0, 792.0), (612.0, 0.0), (0.0, 792.0)]),
        ];

        for (rotation, expected) in cases {
            let frame = PageFrame::new(LETTER, rotation);
            let size = frame.displayed_size();
            let corners = [
                frame.to_user(PagePoint::new(0.0, 0.0)),
                frame.to_user(PagePoint::new(size.width_pt, 0.0)),
                frame.to_user(PagePoint::new(0.0, size.height_pt)),
            ];
            assert_eq!(corners, expected, "{rotation:?}");
        }
    }

    #[test]
    fn quarter_turn_image_matrix_keeps_image_upright() {
        let frame = PageFrame::new(LETTER, Rotation::Quarter);
        let matrix = frame.image_matrix(PagePoint::new(100.0, 50.0), 40.0, 20.0);

        // Image bottom-left sits at displayed (100, 70), i.e. user (70, 100).
        // Image +x runs up the user y axis, image +y runs toward user -x.
        assert_eq!(matrix, [0.0, 40.0, -20.0, 0.0, 70.0, 100.0]);
        assert_eq!(frame.text_matrix(PagePoint::new(100.0, 50.0)), [0.0, 1.0, -1.0, 0.0, 50.0, 100.0]);
    }
}
