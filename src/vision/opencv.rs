//! OpenCV camera backend.
//!
//! Blur, HSV threshold, erode then dilate, external contours. The annotated
//! display stacks the original frame, a status bar and the mask vertically.

use opencv::{
    core::{self, Mat, Point, Scalar, Size, Vector},
    imgproc,
    prelude::*,
    videoio::{CAP_ANY, VideoCapture},
};
use tracing::{info, warn};

use super::color::{DetectionConfig, Hsv};
use super::detector::{DisplayFrame, FramePipeline, PipelineFactory, Segmentation};
use super::geometry::{Blob, Detection, Rect};
use super::{Position, VisionError};

const BLUR_KERNEL: i32 = 5;
const STATUS_BAR_HEIGHT: i32 = 60;

impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}

// BGR
fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn blue() -> Scalar {
    Scalar::new(255.0, 0.0, 0.0, 0.0)
}

fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn hsv_scalar(hsv: Hsv) -> Scalar {
    Scalar::new(hsv.h as f64, hsv.s as f64, hsv.v as f64, 0.0)
}

fn to_cv_rect(rect: Rect) -> core::Rect {
    core::Rect::new(rect.x0, rect.y0, rect.width(), rect.height())
}

fn structuring_element(size: i32) -> Result<Mat, VisionError> {
    let size = size.max(1);
    Ok(imgproc::get_structuring_element(
        imgproc::MORPH_RECT,
        Size::new(size, size),
        Point::new(-1, -1),
    )?)
}

/// Intermediate images, reused across frames
#[derive(Default)]
pub struct SegmentBuffers {
    blurred: Mat,
    hsv: Mat,
    raw_mask: Mat,
    eroded: Mat,
    mask: Mat,
}

/// Threshold one BGR frame and collect its external contours as blobs
pub fn segment_frame(
    frame: &Mat,
    kernel: &Mat,
    config: &DetectionConfig,
    buffers: &mut SegmentBuffers,
) -> Result<Segmentation, VisionError> {
    imgproc::gaussian_blur(
        frame,
        &mut buffers.blurred,
        Size::new(BLUR_KERNEL, BLUR_KERNEL),
        0.0,
        0.0,
        core::BORDER_DEFAULT,
    )?;
    imgproc::cvt_color(&buffers.blurred, &mut buffers.hsv, imgproc::COLOR_BGR2HSV, 0)?;
    core::in_range(
        &buffers.hsv,
        &hsv_scalar(config.range.lower),
        &hsv_scalar(config.range.upper),
        &mut buffers.raw_mask,
    )?;

    // Erode away speckles, then dilate to close gaps
    let border = imgproc::morphology_default_border_value()?;
    imgproc::erode(
        &buffers.raw_mask,
        &mut buffers.eroded,
        kernel,
        Point::new(-1, -1),
        1,
        core::BORDER_CONSTANT,
        border,
    )?;
    imgproc::dilate(
        &buffers.eroded,
        &mut buffers.mask,
        kernel,
        Point::new(-1, -1),
        1,
        core::BORDER_CONSTANT,
        border,
    )?;

    let mut contours: Vector<Vector<Point>> = Vector::new();
    imgproc::find_contours(
        &buffers.mask,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    let mut blobs = Vec::with_capacity(contours.len());
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        let r = imgproc::bounding_rect(&contour)?;
        blobs.push(Blob {
            area,
            bounds: Rect::new(r.x, r.y, r.x + r.width, r.y + r.height),
        });
    }

    Ok(Segmentation {
        width: frame.cols(),
        height: frame.rows(),
        blobs,
    })
}

/// One camera plus the scratch buffers reused every frame
pub struct CameraPipeline {
    camera_id: i32,
    capture: VideoCapture,
    kernel: Mat,
    kernel_size: i32,
    frame: Mat,
    buffers: SegmentBuffers,
}

impl CameraPipeline {
    pub fn open(config: &DetectionConfig) -> Result<Self, VisionError> {
        let camera_id = config.camera_id;
        let capture = VideoCapture::new(camera_id, CAP_ANY)
            .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", camera_id, e)))?;

        if !capture.is_opened()? {
            return Err(VisionError::Camera(format!("Camera {} failed to open", camera_id)));
        }

        Ok(Self {
            camera_id,
            capture,
            kernel: structuring_element(config.kernel_size)?,
            kernel_size: config.kernel_size,
            frame: Mat::default(),
            buffers: SegmentBuffers::default(),
        })
    }
}

impl FramePipeline for CameraPipeline {
    fn segment(&mut self, config: &DetectionConfig) -> Result<Option<Segmentation>, VisionError> {
        if !self.capture.read(&mut self.frame)? || self.frame.empty() {
            return Ok(None);
        }

        if config.kernel_size != self.kernel_size {
            self.kernel = structuring_element(config.kernel_size)?;
            self.kernel_size = config.kernel_size;
        }

        segment_frame(&self.frame, &self.kernel, config, &mut self.buffers).map(Some)
    }

    fn annotate(&mut self, detection: &Detection) -> Result<Option<DisplayFrame>, VisionError> {
        if self.frame.empty() || self.buffers.mask.empty() {
            return Ok(None);
        }

        let mut original = self.frame.try_clone()?;
        let mut colored_mask = Mat::default();
        imgproc::cvt_color(&self.buffers.mask, &mut colored_mask, imgproc::COLOR_GRAY2BGR, 0)?;

        let zone = to_cv_rect(detection.zone);
        for view in [&mut original, &mut colored_mask] {
            if let Some(target) = detection.target {
                imgproc::rectangle(view, to_cv_rect(target), green(), 2, imgproc::LINE_8, 0)?;
            }
            imgproc::rectangle(view, zone, blue(), 1, imgproc::LINE_8, 0)?;
        }

        let width = original.cols();
        let height = original.rows();
        let status_bar =
            Mat::new_rows_cols_with_default(STATUS_BAR_HEIGHT, width, core::CV_8UC3, Scalar::all(0.0))?;

        let mut views: Vector<Mat> = Vector::new();
        views.push(original);
        views.push(status_bar);
        views.push(colored_mask);
        let mut combined = Mat::default();
        core::vconcat(&views, &mut combined)?;

        imgproc::put_text(
            &mut combined,
            "Original",
            Point::new(10, 25),
            imgproc::FONT_HERSHEY_PLAIN,
            1.2,
            white(),
            2,
            imgproc::LINE_8,
            false,
        )?;
        imgproc::put_text(
            &mut combined,
            "Color Mask",
            Point::new(10, height + STATUS_BAR_HEIGHT + 25),
            imgproc::FONT_HERSHEY_PLAIN,
            1.2,
            white(),
            2,
            imgproc::LINE_8,
            false,
        )?;

        let status = detection.position.to_string();
        let status_color = if detection.position == Position::Centered {
            green()
        } else {
            red()
        };
        let mut baseline = 0;
        let text_size =
            imgproc::get_text_size(&status, imgproc::FONT_HERSHEY_DUPLEX, 1.5, 2, &mut baseline)?;
        imgproc::put_text(
            &mut combined,
            &status,
            Point::new(
                (width - text_size.width) / 2,
                height + STATUS_BAR_HEIGHT / 2 + 10,
            ),
            imgproc::FONT_HERSHEY_DUPLEX,
            1.5,
            status_color,
            2,
            imgproc::LINE_8,
            false,
        )?;

        Ok(Some(DisplayFrame {
            width: combined.cols() as u32,
            height: combined.rows() as u32,
            bgr: combined.data_bytes()?.to_vec(),
        }))
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {}", self.camera_id, e);
        }
        self.frame = Mat::default();
        self.buffers = SegmentBuffers::default();
        info!("Camera {} closed", self.camera_id);
    }
}

/// Opens `CameraPipeline`s
pub struct CameraFactory;

impl PipelineFactory for CameraFactory {
    fn open(&self, config: &DetectionConfig) -> Result<Box<dyn FramePipeline>, VisionError> {
        Ok(Box::new(CameraPipeline::open(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::color::ColorPreset;
    use crate::vision::geometry::classify;

    // Pure BGR green is hue 60, inside the lime preset
    fn lime_config() -> DetectionConfig {
        DetectionConfig {
            range: ColorPreset::Lime.range(),
            ..DetectionConfig::default()
        }
    }

    fn black_frame() -> Mat {
        Mat::new_rows_cols_with_default(480, 640, core::CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn paint(frame: &mut Mat, rect: core::Rect) {
        imgproc::rectangle(frame, rect, green(), imgproc::FILLED, imgproc::LINE_8, 0).unwrap();
    }

    fn segment(frame: &Mat) -> Segmentation {
        let config = lime_config();
        let kernel = structuring_element(config.kernel_size).unwrap();
        let mut buffers = SegmentBuffers::default();
        segment_frame(frame, &kernel, &config, &mut buffers).unwrap()
    }

    #[test]
    fn test_black_frame_has_no_blobs() {
        let frame = black_frame();
        let segmentation = segment(&frame);
        assert_eq!((segmentation.width, segmentation.height), (640, 480));
        assert!(segmentation.blobs.is_empty());

        let detection = classify(640, 480, &segmentation.blobs, &lime_config());
        assert_eq!(detection.position, Position::NotFound);
    }

    #[test]
    fn test_speck_removed_by_erosion() {
        let mut frame = black_frame();
        paint(&mut frame, core::Rect::new(50, 50, 2, 2));
        assert!(segment(&frame).blobs.is_empty());
    }

    #[test]
    fn test_square_becomes_one_blob() {
        let mut frame = black_frame();
        paint(&mut frame, core::Rect::new(100, 120, 60, 60));

        let segmentation = segment(&frame);
        assert_eq!(segmentation.blobs.len(), 1);

        let blob = segmentation.blobs[0];
        assert!(blob.area > 300.0);
        let bounds = blob.bounds;
        for (got, want) in [(bounds.x0, 100), (bounds.y0, 120), (bounds.x1, 160), (bounds.y1, 180)] {
            assert!((got - want).abs() <= 1, "bounds {:?}", bounds);
        }

        let detection = classify(640, 480, &segmentation.blobs, &lime_config());
        assert_eq!(detection.position, Position::Left);
    }

    #[test]
    fn test_centered_square_and_color_mismatch() {
        let mut frame = black_frame();
        paint(&mut frame, core::Rect::new(290, 200, 60, 60));

        let segmentation = segment(&frame);
        let detection = classify(640, 480, &segmentation.blobs, &lime_config());
        assert_eq!(detection.position, Position::Centered);

        // Same pixels, blue range: nothing in range
        let blue = DetectionConfig {
            range: ColorPreset::Blue.range(),
            ..DetectionConfig::default()
        };
        let kernel = structuring_element(blue.kernel_size).unwrap();
        let mut buffers = SegmentBuffers::default();
        let segmentation = segment_frame(&frame, &kernel, &blue, &mut buffers).unwrap();
        assert!(segmentation.blobs.is_empty());
    }
}
