use geo_types::{Coord, LineString, Polygon as GeoPolygon};
use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{AngleError, Result};

/// Bytes per pixel of every frame handled here: B, G, R.
pub const BGR_CHANNELS: usize = 3;

/// Single-channel 8-bit working image (grayscale, binarized mask or edge map)
pub type Mask = GrayImage;

/// Integer pixel coordinate, `y` grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn to_coord(self) -> Coord<f64> {
        Coord {
            x: f64::from(self.x),
            y: f64::from(self.y),
        }
    }

    pub(crate) fn from_coord(coord: Coord<f64>) -> Self {
        Self {
            x: coord.x.round() as i32,
            y: coord.y.round() as i32,
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Borrowed view of a camera frame: 8-bit BGR rows, each `stride` bytes long.
///
/// The stride may include padding after the last pixel of a row. Nothing is
/// checked on construction; [`RawFrame::validate`] enforces the buffer contract
/// and every pipeline entry point calls it.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> RawFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, stride: usize) -> Self {
        Self {
            data,
            width,
            height,
            stride,
        }
    }

    /// Frame without row padding
    pub fn packed(data: &'a [u8], width: u32, height: u32) -> Self {
        Self::new(data, width, height, width as usize * BGR_CHANNELS)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Check stride and buffer length against the frame dimensions
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AngleError::MalformedFrame(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }

        let overflow = || {
            AngleError::MalformedFrame(format!(
                "{}x{} with stride {} overflows the address space",
                self.width, self.height, self.stride
            ))
        };

        let row_bytes = (self.width as usize)
            .checked_mul(BGR_CHANNELS)
            .ok_or_else(overflow)?;
        if self.stride < row_bytes {
            return Err(AngleError::MalformedFrame(format!(
                "stride {} is shorter than a row of {} pixels ({} bytes)",
                self.stride, self.width, row_bytes
            )));
        }

        let required = self
            .stride
            .checked_mul(self.height as usize)
            .ok_or_else(overflow)?;
        if self.data.len() < required {
            return Err(AngleError::MalformedFrame(format!(
                "buffer holds {} bytes, {}x{} with stride {} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.stride,
                required
            )));
        }

        Ok(())
    }

    /// Pixel bytes of row `y`, padding excluded
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BGR_CHANNELS]
    }

    /// Copy into a tightly packed image; channels stay in B, G, R order
    pub fn to_bgr_image(&self) -> Result<RgbImage> {
        self.validate()?;

        let mut packed = Vec::with_capacity(self.width as usize * self.height as usize * BGR_CHANNELS);
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y));
        }

        RgbImage::from_raw(self.width, self.height, packed).ok_or_else(|| {
            AngleError::ImageProcessing("packed frame does not match its dimensions".to_string())
        })
    }
}

/// Owned BGR frame, e.g. decoded from an image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl FrameBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, stride: usize) -> Self {
        Self {
            data,
            width,
            height,
            stride,
        }
    }

    /// Uniformly filled, tightly packed frame
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr.repeat(width as usize * height as usize);
        Self::new(data, width, height, width as usize * BGR_CHANNELS)
    }

    /// Convert an RGB image into a packed BGR frame
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let data = image
            .pixels()
            .flat_map(|Rgb([r, g, b])| [*b, *g, *r])
            .collect();
        Self::new(data, image.width(), image.height(), image.width() as usize * BGR_CHANNELS)
    }

    pub fn as_frame(&self) -> RawFrame<'_> {
        RawFrame::new(&self.data, self.width, self.height, self.stride)
    }
}

/// Ordered closed boundary traced from an edge map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Convert to geo-types Polygon; the ring is closed implicitly
    pub fn to_geo_polygon(&self) -> GeoPolygon<f64> {
        let coords: Vec<Coord<f64>> = self.points.iter().map(|p| p.to_coord()).collect();
        GeoPolygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area (shoelace over the stored points)
    pub fn area(&self) -> f64 {
        use geo::Area;
        if self.points.len() < 3 {
            return 0.0;
        }
        self.to_geo_polygon().unsigned_area()
    }

    /// Length of the closed loop, including the segment back to the first point
    pub fn perimeter(&self) -> f64 {
        use geo::EuclideanLength;
        if self.points.len() < 2 {
            return 0.0;
        }
        self.to_geo_polygon().exterior().euclidean_length()
    }
}

/// Simplified contour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Apex and the two ray points of a measured angle.
///
/// `angle_degrees` is the absolute difference of the two ray bearings, with
/// no wraparound normalization applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleMeasurement {
    pub apex: Point,
    pub ray1: Point,
    pub ray2: Point,
    pub angle_degrees: f64,
}

/// Outcome of one detection call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AngleResult {
    Found(AngleMeasurement),
    NotFound,
}

impl AngleResult {
    pub fn is_found(&self) -> bool {
        matches!(self, AngleResult::Found(_))
    }

    pub fn angle(&self) -> Option<f64> {
        match self {
            AngleResult::Found(measurement) => Some(measurement.angle_degrees),
            AngleResult::NotFound => None,
        }
    }

    pub fn measurement(&self) -> Option<&AngleMeasurement> {
        match self {
            AngleResult::Found(measurement) => Some(measurement),
            AngleResult::NotFound => None,
        }
    }
}

/// Output frame: same encoding, dimensions and stride as the input, never
/// aliasing it. Row padding bytes are carried over untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl AnnotatedFrame {
    /// Byte-for-byte copy of the input frame
    pub fn copy_of(frame: &RawFrame<'_>) -> Self {
        Self {
            data: frame.data().to_vec(),
            width: frame.width(),
            height: frame.height(),
            stride: frame.stride(),
        }
    }

    /// Copy of `frame` whose pixels are replaced by `image` (B, G, R order)
    pub(crate) fn with_pixels(frame: &RawFrame<'_>, image: &RgbImage) -> Result<Self> {
        let mut annotated = Self::copy_of(frame);
        if image.dimensions() != (frame.width(), frame.height()) {
            return Err(AngleError::ImageProcessing(format!(
                "rendered image is {}x{}, frame is {}x{}",
                image.width(),
                image.height(),
                frame.width(),
                frame.height()
            )));
        }

        let row_bytes = frame.width() as usize * BGR_CHANNELS;
        for (y, src) in image.as_raw().chunks_exact(row_bytes).enumerate() {
            let start = y * annotated.stride;
            annotated.data[start..start + row_bytes].copy_from_slice(src);
        }

        Ok(annotated)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// View the annotated frame with the same layout as the input
    pub fn as_frame(&self) -> RawFrame<'_> {
        RawFrame::new(&self.data, self.width, self.height, self.stride)
    }

    /// BGR bytes of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride + x as usize * BGR_CHANNELS;
        let bytes = self.data.get(idx..idx + BGR_CHANNELS)?;
        Some([bytes[0], bytes[1], bytes[2]])
    }

    /// Re-encode as a display-ready RGB image
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let bgr = self.as_frame().to_bgr_image()?;
        Ok(RgbImage::from_fn(bgr.width(), bgr.height(), |x, y| {
            let Rgb([b, g, r]) = *bgr.get_pixel(x, y);
            Rgb([r, g, b])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_stride() {
        let data = vec![0u8; 30];
        let frame = RawFrame::new(&data, 4, 2, 10);
        assert!(matches!(frame.validate(), Err(AngleError::MalformedFrame(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_layout() {
        let data = [0u8; 3];
        let frame = RawFrame::new(&data, 1, 2, usize::MAX);
        assert!(matches!(frame.validate(), Err(AngleError::MalformedFrame(_))));

        let wide = RawFrame::new(&data, u32::MAX, u32::MAX, usize::MAX / 2);
        assert!(matches!(wide.validate(), Err(AngleError::MalformedFrame(_))));
    }

    #[test]
    fn test_validate_rejects_short_buffer() {
        let data = vec![0u8; 40];
        let frame = RawFrame::new(&data, 4, 4, 12);
        assert!(matches!(frame.validate(), Err(AngleError::MalformedFrame(_))));
    }

    #[test]
    fn test_padded_rows_are_packed() {
        // 2x2 frame, stride 8: two pixels and two padding bytes per row
        let data = vec![
            1, 2, 3, 4, 5, 6, 99, 99, //
            7, 8, 9, 10, 11, 12, 99, 99,
        ];
        let frame = RawFrame::new(&data, 2, 2, 8);
        let image = frame.to_bgr_image().expect("frame is well formed");
        assert_eq!(image.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_annotated_frame_keeps_padding() {
        let data = vec![
            1, 2, 3, 4, 5, 6, 99, 98, //
            7, 8, 9, 10, 11, 12, 97, 96,
        ];
        let frame = RawFrame::new(&data, 2, 2, 8);
        let painted = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        let annotated = AnnotatedFrame::with_pixels(&frame, &painted).expect("same dimensions");

        assert_eq!(annotated.stride(), 8);
        assert_eq!(annotated.pixel(1, 1), Some([0, 0, 255]));
        assert_eq!(&annotated.as_bytes()[6..8], &[99, 98]);
        assert_eq!(&annotated.as_bytes()[14..16], &[97, 96]);
    }

    #[test]
    fn test_rgb_round_trip_swaps_channels() {
        let rgb = RgbImage::from_pixel(3, 1, Rgb([10, 20, 30]));
        let frame = FrameBuffer::from_rgb_image(&rgb);
        assert_eq!(&frame.as_frame().row(0)[..3], &[30, 20, 10]);

        let annotated = AnnotatedFrame::copy_of(&frame.as_frame());
        assert_eq!(annotated.to_rgb_image().expect("valid frame"), rgb);
    }

    #[test]
    fn test_contour_area_and_perimeter() {
        let square = Contour::new(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]);
        assert!((square.area() - 100.0).abs() < 1e-9);
        assert!((square.perimeter() - 40.0).abs() < 1e-9);
        assert_eq!(Contour::default().perimeter(), 0.0);
    }
}
