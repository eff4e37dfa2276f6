// Phase 7: 画像 → PDF変換
//
// One page per image. Transparent images are flattened onto white and
// encoded as a DCTDecode (JPEG) image XObject. With a named page size the
// image is scaled into the page area inside the margins through the `cm`
// matrix, so pixels are never resampled; without one the page takes the
// image's size at the configured DPI.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{Document, Object, Stream, dictionary};
use serde::Deserialize;
use tracing::debug;

use crate::convert::Converter;
use crate::error::PdfMixError;
use crate::pdf::page::PageStream;

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// 画像を配置する用紙サイズ（ポイント）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A3: PageSize = PageSize {
        width: 841.890,
        height: 1190.551,
    };
    pub const A4: PageSize = PageSize {
        width: 595.276,
        height: 841.890,
    };
    pub const A5: PageSize = PageSize {
        width: 419.528,
        height: 595.276,
    };
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
    pub const LEGAL: PageSize = PageSize {
        width: 612.0,
        height: 1008.0,
    };

    /// 用紙名（大文字小文字を区別しない）から解決する。`-landscape` 接尾辞で横向き。
    pub fn from_name(name: &str) -> Option<PageSize> {
        let name = name.trim().to_ascii_uppercase();
        let (base, landscape) = match name.strip_suffix("-LANDSCAPE") {
            Some(base) => (base, true),
            None => (name.as_str(), false),
        };
        let size = match base {
            "A3" => Self::A3,
            "A4" => Self::A4,
            "A5" => Self::A5,
            "LETTER" => Self::LETTER,
            "LEGAL" => Self::LEGAL,
            _ => return None,
        };
        Some(if landscape {
            PageSize {
                width: size.height,
                height: size.width,
            }
        } else {
            size
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// 用紙名。`None` または `"native"` なら画像サイズのページを作る。
    pub page_size: Option<String>,
    pub margin_mm: f64,
    pub keep_aspect: bool,
    pub center: bool,
    /// 画像サイズのページを作るときの解像度。
    pub dpi: u32,
    pub sort_by_name: bool,
    pub jpeg_quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            page_size: Some("A4".to_string()),
            margin_mm: 10.0,
            keep_aspect: true,
            center: true,
            dpi: 300,
            sort_by_name: true,
            jpeg_quality: 90,
        }
    }
}

impl ImageOptions {
    /// 用紙サイズを解決する。`Ok(None)` は画像サイズのページ。
    pub fn resolved_page_size(&self) -> crate::error::Result<Option<PageSize>> {
        match self.page_size.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) if name.eq_ignore_ascii_case("native") => Ok(None),
            Some(name) => PageSize::from_name(name).map(Some).ok_or_else(|| {
                PdfMixError::validation(format!(
                    "unknown page size '{name}' (expected A3, A4, A5, Letter, Legal or native)"
                ))
            }),
        }
    }

    /// 設定値の整合性を検査する。
    pub fn validate(&self) -> crate::error::Result<()> {
        self.resolved_page_size()?;
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PdfMixError::validation(format!(
                "JPEG quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.dpi == 0 {
            return Err(PdfMixError::validation("image DPI must be positive"));
        }
        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(PdfMixError::validation(format!(
                "margin must be a non-negative number of millimetres, got {}",
                self.margin_mm
            )));
        }
        Ok(())
    }
}

/// ページ上の画像の配置（ポイント、原点は左下）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 画像のピクセルサイズとオプションからページ上の配置を計算する。
pub fn compute_placement(
    pixel_width: u32,
    pixel_height: u32,
    page_size: Option<PageSize>,
    options: &ImageOptions,
) -> Placement {
    let src_w = f64::from(pixel_width.max(1));
    let src_h = f64::from(pixel_height.max(1));

    let Some(page) = page_size else {
        let scale = POINTS_PER_INCH / f64::from(options.dpi.max(1));
        let (width, height) = (src_w * scale, src_h * scale);
        return Placement {
            page_width: width,
            page_height: height,
            x: 0.0,
            y: 0.0,
            width,
            height,
        };
    };

    let margin = options.margin_mm * POINTS_PER_INCH / MM_PER_INCH;
    let avail_w = (page.width - 2.0 * margin).max(1.0);
    let avail_h = (page.height - 2.0 * margin).max(1.0);

    let (width, height) = if options.keep_aspect {
        let scale = (avail_w / src_w).min(avail_h / src_h);
        (src_w * scale, src_h * scale)
    } else {
        (avail_w, avail_h)
    };

    let (x, y) = if options.center {
        ((page.width - width) / 2.0, (page.height - height) / 2.0)
    } else {
        // Anchored to the top-left margin corner.
        (margin, page.height - margin - height)
    };

    Placement {
        page_width: page.width,
        page_height: page.height,
        x,
        y,
        width,
        height,
    }
}

/// アルファ付き画像を白背景に合成してRGBにする。
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

fn format_number(value: f64) -> String {
    let rounded = format!("{value:.3}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// 画像を1枚1ページのPDFにする変換器。
#[derive(Debug, Clone, Default)]
pub struct ImageConverter {
    options: ImageOptions,
}

impl ImageConverter {
    pub fn new(options: ImageOptions) -> crate::error::Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// 複数の画像から1つのPDF文書を作る。`sort_by_name` ならファイル名順に並べる。
    pub fn build_document(&self, inputs: &[PathBuf]) -> crate::error::Result<Document> {
        if inputs.is_empty() {
            return Err(PdfMixError::validation("no images to convert"));
        }

        let mut ordered: Vec<&PathBuf> = inputs.iter().collect();
        if self.options.sort_by_name {
            ordered.sort_by_key(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default()
            });
        }

        let page_size = self.options.resolved_page_size()?;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(ordered.len());

        for path in ordered {
            let image = image::open(path).map_err(|e| {
                PdfMixError::convert(format!("cannot read image {}: {e}", path.display()))
            })?;
            let rgb = flatten_on_white(&image);
            let placement = compute_placement(rgb.width(), rgb.height(), page_size, &self.options);
            let jpeg = encode_jpeg(&rgb, self.options.jpeg_quality)?;
            debug!(
                path = %path.display(),
                width = rgb.width(),
                height = rgb.height(),
                "converted image page"
            );

            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(rgb.width()),
                    "Height" => i64::from(rgb.height()),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            ));

            let content = format!(
                "q {} 0 0 {} {} {} cm /Im0 Do Q",
                format_number(placement.width),
                format_number(placement.height),
                format_number(placement.x),
                format_number(placement.y),
            );
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.page_width as f32),
                    Object::Real(placement.page_height as f32),
                ],
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        "Im0" => image_id,
                    },
                },
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }

    /// 複数の画像を1本のPageStreamにする。
    pub fn convert_all(&self, inputs: &[PathBuf]) -> crate::error::Result<PageStream> {
        let doc = self.build_document(inputs)?;
        Ok(PageStream::from_document("images", doc))
    }
}

impl Converter for ImageConverter {
    fn convert(&self, input: &Path, _output_dir: &Path) -> crate::error::Result<PageStream> {
        let doc = self.build_document(&[input.to_path_buf()])?;
        Ok(PageStream::from_document(input.display().to_string(), doc))
    }
}
