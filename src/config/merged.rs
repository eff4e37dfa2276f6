use crate::convert::ImageOptions;

use super::job::{Job, Operation};
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub sanitize: bool,
    pub compress: bool,
    pub skip_unreadable: bool,
    pub parallel_workers: usize,
    pub images: ImageOptions,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        let mut images = settings.images.clone();
        if let Operation::Images {
            page_size,
            margin_mm,
            keep_aspect,
            center,
            dpi,
            sort_by_name,
            jpeg_quality,
        } = &job.operation
        {
            if page_size.is_some() {
                images.page_size = page_size.clone();
            }
            images.margin_mm = margin_mm.unwrap_or(images.margin_mm);
            images.keep_aspect = keep_aspect.unwrap_or(images.keep_aspect);
            images.center = center.unwrap_or(images.center);
            images.dpi = dpi.unwrap_or(images.dpi);
            images.sort_by_name = sort_by_name.unwrap_or(images.sort_by_name);
            images.jpeg_quality = jpeg_quality.unwrap_or(images.jpeg_quality);
        }

        MergedConfig {
            sanitize: job.sanitize.unwrap_or(settings.sanitize),
            compress: job.compress.unwrap_or(settings.compress),
            skip_unreadable: job.skip_unreadable.unwrap_or(settings.skip_unreadable),
            parallel_workers: settings.parallel_workers,
            images,
        }
    }
}
