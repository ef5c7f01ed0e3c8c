//! Tool catalog
//!
//! Built-in declarative configuration for every supported tool, optionally
//! extended or overridden by a JSON file of [`ToolSpec`] entries.

use std::collections::BTreeMap;
use std::path::Path;

use crate::filename::FilenameRule;
use crate::models::{
    DispatchStrategy, ParamBinding, ParamKey, PayloadEncoding, ResponseKind, ToolCategory,
    ToolSpec,
};
use crate::ConvertError;

const PHOTO_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/tif",
];
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];
const EDITABLE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/avif",
    "image/bmp",
    "image/tiff",
];

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with every built-in tool.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for tool in builtin_tools() {
            catalog.insert(tool);
        }
        catalog
    }

    /// Load tool entries from a JSON array file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path)?;
        let tools: Vec<ToolSpec> = serde_json::from_str(&content)?;

        let mut catalog = Self::empty();
        for tool in tools {
            if !tool.endpoint.starts_with('/') {
                return Err(ConvertError::Config(format!(
                    "Tool {} has an endpoint that does not start with '/': {}",
                    tool.slug, tool.endpoint
                )));
            }
            if tool.max_files == 0 || tool.max_file_size == 0 {
                return Err(ConvertError::Config(format!(
                    "Tool {} must allow at least one file and a non-zero size",
                    tool.slug
                )));
            }
            catalog.insert(tool);
        }
        Ok(catalog)
    }

    /// Add or replace a tool, keyed by slug.
    pub fn insert(&mut self, tool: ToolSpec) -> Option<ToolSpec> {
        self.tools.insert(tool.slug.clone(), tool)
    }

    /// Merge `other` into this catalog; entries in `other` win by slug.
    pub fn merge(&mut self, other: ToolCatalog) {
        for (slug, tool) in other.tools {
            if self.tools.contains_key(&slug) {
                tracing::debug!(tool = %slug, "Overriding built-in tool");
            }
            self.tools.insert(slug, tool);
        }
    }

    pub fn get(&self, slug: &str) -> Option<&ToolSpec> {
        self.tools.get(slug)
    }

    pub fn require(&self, slug: &str) -> Result<&ToolSpec, ConvertError> {
        self.get(slug)
            .ok_or_else(|| ConvertError::UnknownTool(slug.to_string()))
    }

    /// Tools sorted by slug, optionally restricted to one category.
    pub fn list(&self, category: Option<ToolCategory>) -> Vec<&ToolSpec> {
        self.tools
            .values()
            .filter(|t| category.map(|c| t.category == c).unwrap_or(true))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn types(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn quality() -> ParamBinding {
    ParamBinding::new("quality", ParamKey::Quality).with_default(90)
}

/// Multipart format converter with a quality field.
fn multipart_converter(slug: &str, accepted: &[&str], from: &[&str], to: &str) -> ToolSpec {
    ToolSpec {
        slug: slug.to_string(),
        category: ToolCategory::Image,
        endpoint: format!("/api/image/{}", slug),
        accepted_types: types(accepted),
        max_files: 20,
        max_file_size: crate::constants::DEFAULT_MAX_FILE_SIZE_BYTES,
        encoding: PayloadEncoding::multipart(),
        dispatch: DispatchStrategy::PerFile,
        response: ResponseKind::Binary,
        params: vec![quality()],
        filename_rule: FilenameRule::swap_extension(from, to),
        archive_name: crate::constants::DEFAULT_ARCHIVE_NAME.to_string(),
        past_tense: crate::constants::DEFAULT_PAST_TENSE.to_string(),
    }
}

/// JSON/base64 format converter without parameters.
fn json_converter(slug: &str, accepted: &[&str], from: &[&str], to: &str) -> ToolSpec {
    ToolSpec {
        encoding: PayloadEncoding::json_base64(),
        params: Vec::new(),
        ..multipart_converter(slug, accepted, from, to)
    }
}

fn ai_tool(slug: &str, params: Vec<ParamBinding>, replacement: &str, archive: &str) -> ToolSpec {
    ToolSpec {
        slug: slug.to_string(),
        category: ToolCategory::Ai,
        endpoint: format!("/api/ai/{}", slug),
        accepted_types: types(PHOTO_TYPES),
        max_files: 10,
        max_file_size: crate::constants::DEFAULT_MAX_FILE_SIZE_BYTES,
        encoding: PayloadEncoding::multipart(),
        dispatch: DispatchStrategy::PerFile,
        response: ResponseKind::Binary,
        params,
        filename_rule: FilenameRule::swap_extension(PHOTO_EXTENSIONS, replacement),
        archive_name: archive.to_string(),
        past_tense: "processed".to_string(),
    }
}

fn builtin_tools() -> Vec<ToolSpec> {
    let mut tools = vec![
        multipart_converter("avif-to-jpg", &["image/avif", "image/heif"], &["avif", "heif"], ".jpg"),
        multipart_converter("heif-to-jpg", &["image/heif", "image/heic"], &["heif", "heic"], ".jpg"),
        multipart_converter("svg-to-jpg", &["image/svg+xml"], &["svg"], ".jpg"),
        multipart_converter(
            "ico-to-avif",
            &["image/x-icon", "image/vnd.microsoft.icon"],
            &["ico"],
            ".avif",
        ),
        ToolSpec {
            params: Vec::new(),
            ..multipart_converter("webp-to-png", &["image/webp"], &["webp"], ".png")
        },
        json_converter("avif-to-png", &["image/avif"], &["avif"], ".png"),
        json_converter("avif-to-webp", &["image/avif"], &["avif"], ".webp"),
        json_converter("jpg-to-avif", &["image/jpeg", "image/jpg"], &["jpg", "jpeg"], ".avif"),
        json_converter("webp-to-avif", &["image/webp"], &["webp"], ".avif"),
    ];

    tools.push(ToolSpec {
        accepted_types: types(EDITABLE_TYPES),
        params: vec![
            ParamBinding::new("resizeMode", ParamKey::Mode).with_default("percentage"),
            ParamBinding::new("width", ParamKey::Width).when_mode(&["dimensions", "fit", "width"]),
            ParamBinding::new("height", ParamKey::Height).when_mode(&["dimensions", "fit", "height"]),
            ParamBinding::new("percentage", ParamKey::Percentage)
                .when_mode(&["percentage"])
                .with_default(100),
            ParamBinding::new("maintainAspectRatio", ParamKey::MaintainAspectRatio).with_default(true),
        ],
        filename_rule: FilenameRule::replace_any_extension("_resized.jpg"),
        archive_name: "resized_images.zip".to_string(),
        past_tense: "resized".to_string(),
        ..json_converter("image-resizer", &[], &[], "")
    });

    tools.push(ToolSpec {
        accepted_types: types(EDITABLE_TYPES),
        params: vec![
            ParamBinding::new("cropMode", ParamKey::Mode).with_default("free"),
            ParamBinding::new("customWidth", ParamKey::Width).when_mode(&["custom"]),
            ParamBinding::new("customHeight", ParamKey::Height).when_mode(&["custom"]),
            ParamBinding::new("socialTemplate", ParamKey::Extra("socialTemplate".to_string()))
                .when_mode(&["social"]),
            ParamBinding::new("maintainAspectRatio", ParamKey::MaintainAspectRatio).with_default(true),
        ],
        filename_rule: FilenameRule::replace_any_extension("_cropped.jpg"),
        archive_name: "cropped_images.zip".to_string(),
        past_tense: "cropped".to_string(),
        ..json_converter("image-cropper", &[], &[], "")
    });

    tools.push(ai_tool(
        "remove-background",
        vec![
            ParamBinding::new("backgroundType", ParamKey::BackgroundType).with_default("transparent"),
            ParamBinding::new("backgroundColor", ParamKey::BackgroundColor).with_default("#ffffff"),
        ],
        "_no_bg.png",
        "imageoptimizer.ai-background-removed.zip",
    ));
    tools.push(ai_tool(
        "transparent-background",
        vec![ParamBinding::new(
            "transparencyLevel",
            ParamKey::Extra("transparencyLevel".to_string()),
        )
        .with_default(100)],
        "_transparent.png",
        "imageoptimizer.transparent-backgrounds.zip",
    ));
    tools.push(ToolSpec {
        max_files: 5,
        past_tense: "upscaled".to_string(),
        ..ai_tool(
            "ai-upscale",
            vec![ParamBinding::new("upscaleFactor", ParamKey::UpscaleFactor).with_default("2x")],
            "_{factor}x_upscaled.png",
            "imageoptimizer.ai-upscaled.zip",
        )
    });
    tools.push(ToolSpec {
        max_files: 1,
        response: ResponseKind::Report,
        ..ai_tool(
            "transparent-background-preview",
            Vec::new(),
            "_preview.json",
            crate::constants::DEFAULT_ARCHIVE_NAME,
        )
    });

    tools.push(ToolSpec {
        slug: "merge-pdf".to_string(),
        category: ToolCategory::Pdf,
        endpoint: "/api/pdf/merge".to_string(),
        accepted_types: types(&["application/pdf"]),
        max_files: 10,
        max_file_size: crate::constants::DEFAULT_MAX_FILE_SIZE_BYTES,
        encoding: PayloadEncoding::multipart(),
        dispatch: DispatchStrategy::Combined {
            output_prefix: "merged_document".to_string(),
            output_extension: "pdf".to_string(),
            min_files: 2,
        },
        response: ResponseKind::Binary,
        params: Vec::new(),
        filename_rule: FilenameRule::replace_any_extension(".pdf"),
        archive_name: crate::constants::DEFAULT_ARCHIVE_NAME.to_string(),
        past_tense: "merged".to_string(),
    });

    tools
}
