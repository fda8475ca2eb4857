use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::auth::Principal;
use crate::models::{ExportFormat, Poster, PosterStatus};
use crate::permissions::{Capability, has_capability};

// --- Export Gate ---

/// can_export
///
/// The export-eligibility rule: a poster leaves the system only through
/// people who could have approved or authored it, unless it has been
/// approved for everyone. Owner and `editAllContent` holders may export
/// unconditionally; anyone else only once `status == APPROVED`.
///
/// Pure policy. The counter side effect of a permitted export lives in
/// the repository (`record_export`), as an atomic increment.
pub fn can_export(principal: &Principal, poster: &Poster) -> bool {
    if poster.owner_id == principal.id {
        return true;
    }
    if has_capability(principal.role, Capability::EditAllContent) {
        return true;
    }
    poster.status == PosterStatus::Approved
}

// --- Format Geometry ---

/// Orientation of a format's canonical target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

/// Paper
///
/// The named page formats a PDF export wraps its bitmap in. Dimensions in
/// PostScript points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paper {
    A4,
    A3,
}

impl Paper {
    pub fn points(&self) -> (f64, f64) {
        match self {
            Paper::A4 => (595.28, 841.89),
            Paper::A3 => (841.89, 1190.55),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Paper::A4 => "a4",
            Paper::A3 => "a3",
        }
    }
}

impl ExportFormat {
    /// Canonical target box in pixels (reference 300dpi, A4 = 2480x3508).
    pub fn target_box(&self) -> (u32, u32) {
        match self {
            ExportFormat::PngHq => (2480, 3508),
            ExportFormat::PdfA4 => (2480, 3508),
            ExportFormat::PdfA3 => (3508, 4961),
            ExportFormat::Instagram => (1080, 1080),
            ExportFormat::Whatsapp => (1080, 1920),
            ExportFormat::Facebook => (1200, 630),
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self {
            ExportFormat::Instagram => Orientation::Square,
            ExportFormat::Facebook => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }

    /// Which paper a document-wrapping format targets; `None` for the
    /// bitmap-only formats.
    pub fn paper(&self) -> Option<Paper> {
        match self {
            ExportFormat::PdfA4 => Some(Paper::A4),
            ExportFormat::PdfA3 => Some(Paper::A3),
            _ => None,
        }
    }

    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::PngHq,
        ExportFormat::PdfA4,
        ExportFormat::PdfA3,
        ExportFormat::Instagram,
        ExportFormat::Whatsapp,
        ExportFormat::Facebook,
    ];
}

// --- Surfaces and Artifacts ---

/// Surface
///
/// The source visual surface handed over by the render collaborator:
/// tightly-packed RGBA8 pixels. The engine never looks at poster text;
/// this is the only input it reshapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Surface {
    /// Validates dimensions against the pixel payload. A zero-sized or
    /// short-read surface is rejected before any geometry runs.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Surface, String> {
        if width == 0 || height == 0 {
            return Err("surface has zero dimension".to_string());
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(format!(
                "surface payload is {} bytes, expected {}",
                rgba.len(),
                expected
            ));
        }
        Ok(Surface { width, height, rgba })
    }
}

/// Bitmap
///
/// A composited RGBA8 frame, exactly the size of the requested format's
/// target box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// ExportArtifact
///
/// The output representation handed back to the caller. Raster formats
/// emit the bitmap itself; PDF formats wrap the same bitmap in a
/// single-page document sized to the named paper.
#[derive(Debug, Clone)]
pub enum ExportArtifact {
    Bitmap(Bitmap),
    Document { paper: Paper, bytes: Vec<u8> },
}

impl ExportArtifact {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportArtifact::Bitmap(_) => "application/octet-stream",
            ExportArtifact::Document { .. } => "application/pdf",
        }
    }
}

impl IntoResponse for ExportArtifact {
    fn into_response(self) -> Response {
        match self {
            ExportArtifact::Bitmap(bitmap) => {
                let mut response = bitmap.rgba.into_response();
                let headers = response.headers_mut();
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/octet-stream"),
                );
                headers.insert("x-bitmap-width", HeaderValue::from(bitmap.width));
                headers.insert("x-bitmap-height", HeaderValue::from(bitmap.height));
                response
            }
            ExportArtifact::Document { bytes, .. } => {
                let mut response = bytes.into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/pdf"),
                );
                response
            }
        }
    }
}

// --- Multi-Format Export Engine ---

/// The uniform fit-and-center scale: the source is never cropped and
/// never exceeds the target box.
pub fn scale_for(source: (u32, u32), target: (u32, u32)) -> f64 {
    let sx = target.0 as f64 / source.0 as f64;
    let sy = target.1 as f64 / source.1 as f64;
    sx.min(sy)
}

/// fit_and_center
///
/// Draws the source at the uniform scale, centered in the target box,
/// with the remaining border filled white. Letterboxing when aspect
/// ratios differ is accepted: content completeness wins over
/// frame-filling. Sampling is nearest-neighbor at pixel centers, so the
/// transform is deterministic across runs and platforms.
pub fn fit_and_center(surface: &Surface, target_w: u32, target_h: u32) -> Bitmap {
    let scale = scale_for((surface.width, surface.height), (target_w, target_h));

    let scaled_w = ((surface.width as f64 * scale).round() as u32).clamp(1, target_w);
    let scaled_h = ((surface.height as f64 * scale).round() as u32).clamp(1, target_h);
    let x0 = (target_w - scaled_w) / 2;
    let y0 = (target_h - scaled_h) / 2;

    // White background everywhere the source does not land.
    let mut rgba = vec![0xFFu8; target_w as usize * target_h as usize * 4];

    for y in 0..scaled_h {
        // Map back through the scale to the source row, clamped at the edge.
        let sy = (((y as f64 + 0.5) / scale) as u32).min(surface.height - 1);
        for x in 0..scaled_w {
            let sx = (((x as f64 + 0.5) / scale) as u32).min(surface.width - 1);
            let src = (sy as usize * surface.width as usize + sx as usize) * 4;
            let dst = ((y0 + y) as usize * target_w as usize + (x0 + x) as usize) * 4;
            rgba[dst..dst + 4].copy_from_slice(&surface.rgba[src..src + 4]);
        }
    }

    Bitmap {
        width: target_w,
        height: target_h,
        rgba,
    }
}

/// render
///
/// The full engine: compose the source into the format's target box,
/// then wrap in a one-page PDF when the format is a document. Stateless
/// and side-effect-free; authorization and counters belong to the gate.
pub fn render(surface: &Surface, format: ExportFormat) -> ExportArtifact {
    let (target_w, target_h) = format.target_box();
    let bitmap = fit_and_center(surface, target_w, target_h);

    match format.paper() {
        Some(paper) => ExportArtifact::Document {
            paper,
            bytes: wrap_single_page_pdf(&bitmap, paper),
        },
        None => ExportArtifact::Bitmap(bitmap),
    }
}

/// wrap_single_page_pdf
///
/// Assembles a minimal one-page PDF with the bitmap embedded as an
/// uncompressed DeviceRGB image XObject drawn over the full page. The
/// bitmap is already letterboxed to the paper's aspect ratio, so the
/// full-page placement preserves the fit-and-center geometry.
fn wrap_single_page_pdf(bitmap: &Bitmap, paper: Paper) -> Vec<u8> {
    let (page_w, page_h) = paper.points();

    // The page stream wants DeviceRGB; drop the alpha channel.
    let mut rgb = Vec::with_capacity(bitmap.rgba.len() / 4 * 3);
    for pixel in bitmap.rgba.chunks_exact(4) {
        rgb.extend_from_slice(&pixel[..3]);
    }

    let contents = format!("q\n{page_w:.2} 0 0 {page_h:.2} 0 0 cm\n/Im0 Do\nQ\n");

    let mut out: Vec<u8> = Vec::with_capacity(rgb.len() + 1024);
    let mut offsets = [0usize; 6];

    out.extend_from_slice(b"%PDF-1.4\n");

    offsets[1] = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets[2] = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets[3] = out.len();
    out.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {page_w:.2} {page_h:.2}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n"
        )
        .as_bytes(),
    );

    offsets[4] = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} >>\nstream\n",
            bitmap.width,
            bitmap.height,
            rgb.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rgb);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    offsets[5] = out.len();
    out.extend_from_slice(
        format!(
            "5 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
            contents.len(),
            contents
        )
        .as_bytes(),
    );

    let xref_at = out.len();
    out.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
    for offset in &offsets[1..] {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n").as_bytes(),
    );

    out
}
