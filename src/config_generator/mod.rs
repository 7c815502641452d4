//! ConfigGenerator - Worker Pipeline Configs from Templates
//!
//! ## Responsibilities
//!
//! - Render yuri2 XML pipeline configurations from handlebars templates
//! - Validate request parameters before rendering
//! - Persist one artifact per role, overwriting the previous generation
//!
//! Generation is deterministic: same parameters, same bytes. A generation
//! failure must abort the requested start; the supervisor is never handed a
//! stale or partial artifact.

use crate::error::{Error, Result};
use handlebars::Handlebars;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Template names registered at construction. Each maps to
/// `<template_dir>/<name>.xml.hbs` and renders to `<output_dir>/<name>.xml`.
const TEMPLATES: &[&str] = &["viewer", "output_v4l2", "output_libcamera"];

/// Parameters for the viewer role config
#[derive(Debug, Clone)]
pub struct ViewerParams {
    /// NDI source name to receive
    pub source: String,
    /// Optional backup source for failover
    pub backup: Option<String>,
    pub audio: bool,
    pub fullscreen: bool,
    /// `WxH`, e.g. `1920x1080`
    pub resolution: String,
}

/// Capture backend for the output role
#[derive(Debug, Clone)]
pub enum CaptureSource {
    V4l2 { device: String },
    Libcamera,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::V4l2 { .. } => "v4l2",
            CaptureSource::Libcamera => "libcamera",
        }
    }
}

/// Parameters for the output role config
#[derive(Debug, Clone)]
pub struct OutputParams {
    pub source: CaptureSource,
    /// NDI output name announced on the network
    pub name: String,
    /// `WxH`, e.g. `1280x720`
    pub resolution: String,
    pub fps: u32,
    /// Expose PTZ control on the NDI output
    pub ptz: bool,
}

/// ConfigGenerator instance
pub struct ConfigGenerator {
    registry: Handlebars<'static>,
    output_dir: PathBuf,
    preview_dir: PathBuf,
}

impl ConfigGenerator {
    /// Create a generator, registering all role templates from
    /// `template_dir`. A missing or unparseable template fails construction.
    pub fn new(template_dir: &Path, output_dir: PathBuf, preview_dir: PathBuf) -> Result<Self> {
        let mut registry = Handlebars::new();
        for name in TEMPLATES {
            let path = template_dir.join(format!("{}.xml.hbs", name));
            registry
                .register_template_file(name, &path)
                .map_err(|e| Error::Config(format!("template {}: {}", path.display(), e)))?;
        }

        Ok(Self {
            registry,
            output_dir,
            preview_dir,
        })
    }

    /// Generate the viewer role config, returning the artifact path.
    pub async fn generate_viewer(&self, params: &ViewerParams) -> Result<PathBuf> {
        if params.source.trim().is_empty() {
            return Err(Error::Config("viewer source must not be empty".into()));
        }
        validate_resolution(&params.resolution)?;

        let data = json!({
            "source": params.source,
            "backup": params.backup.as_deref().unwrap_or(""),
            "audio": bool_str(params.audio),
            "fullscreen": bool_str(params.fullscreen),
            "resolution": params.resolution,
        });

        let path = self.render("viewer", &data).await?;
        tracing::info!(path = %path.display(), source = %params.source, "Generated viewer config");
        Ok(path)
    }

    /// Generate the output role config for the requested capture backend,
    /// returning the artifact path.
    pub async fn generate_output(&self, params: &OutputParams) -> Result<PathBuf> {
        if params.name.trim().is_empty() {
            return Err(Error::Config("output name must not be empty".into()));
        }
        validate_resolution(&params.resolution)?;
        if params.fps == 0 || params.fps > 240 {
            return Err(Error::Config(format!("fps out of range: {}", params.fps)));
        }

        let (template, device) = match &params.source {
            CaptureSource::V4l2 { device } => {
                if device.trim().is_empty() {
                    return Err(Error::Config("v4l2 device path must not be empty".into()));
                }
                ("output_v4l2", device.as_str())
            }
            CaptureSource::Libcamera => ("output_libcamera", ""),
        };

        let data = json!({
            "device": device,
            "name": params.name,
            "resolution": params.resolution,
            "fps": params.fps,
            "ptz": bool_str(params.ptz),
            "preview_dir": self.preview_dir.display().to_string(),
        });

        let path = self.render(template, &data).await?;
        tracing::info!(
            path = %path.display(),
            name = %params.name,
            source_type = params.source.as_str(),
            "Generated output config"
        );
        Ok(path)
    }

    async fn render(&self, template: &str, data: &serde_json::Value) -> Result<PathBuf> {
        let content = self
            .registry
            .render(template, data)
            .map_err(|e| Error::Config(format!("render {}: {}", template, e)))?;

        fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(format!("{}.xml", template));
        fs::write(&path, content).await?;
        Ok(path)
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Validate a `WxH` resolution string.
fn validate_resolution(resolution: &str) -> Result<()> {
    let parts: Vec<&str> = resolution.split('x').collect();
    let valid = parts.len() == 2
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.parse::<u32>().map(|v| v > 0).unwrap_or(false));
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid resolution '{}', expected WxH",
            resolution
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(dir: &tempfile::TempDir) -> ConfigGenerator {
        let template_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
        ConfigGenerator::new(
            &template_dir,
            dir.path().join("generated"),
            PathBuf::from("/dev/shm/ndi_preview"),
        )
        .unwrap()
    }

    fn viewer_params(source: &str) -> ViewerParams {
        ViewerParams {
            source: source.to_string(),
            backup: None,
            audio: false,
            fullscreen: true,
            resolution: "1920x1080".to_string(),
        }
    }

    #[test]
    fn test_missing_template_dir_fails() {
        let result = ConfigGenerator::new(
            Path::new("/nonexistent/templates"),
            PathBuf::from("/tmp/out"),
            PathBuf::from("/tmp/preview"),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_generate_viewer_renders_source() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let path = gen.generate_viewer(&viewer_params("Studio Cam")).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Studio Cam"));
        assert!(content.contains("1920x1080"));
        assert!(content.contains("ndi_input"));
    }

    #[tokio::test]
    async fn test_generation_overwrites_prior_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let first = gen.generate_viewer(&viewer_params("Cam A")).await.unwrap();
        let second = gen.generate_viewer(&viewer_params("Cam B")).await.unwrap();
        assert_eq!(first, second);

        let content = std::fs::read_to_string(&second).unwrap();
        assert!(content.contains("Cam B"));
        assert!(!content.contains("Cam A"));
    }

    #[tokio::test]
    async fn test_invalid_resolution_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let mut params = viewer_params("Cam");
        params.resolution = "1920by1080".to_string();
        assert!(matches!(
            gen.generate_viewer(&params).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_output_fps_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let params = OutputParams {
            source: CaptureSource::Libcamera,
            name: "Pi-NDI".to_string(),
            resolution: "1280x720".to_string(),
            fps: 0,
            ptz: false,
        };
        assert!(matches!(
            gen.generate_output(&params).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_output_v4l2_requires_device() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let params = OutputParams {
            source: CaptureSource::V4l2 {
                device: "  ".to_string(),
            },
            name: "Pi-NDI".to_string(),
            resolution: "1280x720".to_string(),
            fps: 30,
            ptz: false,
        };
        assert!(matches!(
            gen.generate_output(&params).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_output_renders_preview_branch() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(&dir);

        let params = OutputParams {
            source: CaptureSource::V4l2 {
                device: "/dev/video0".to_string(),
            },
            name: "Pi-NDI".to_string(),
            resolution: "1280x720".to_string(),
            fps: 30,
            ptz: true,
        };
        let path = gen.generate_output(&params).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("/dev/video0"));
        assert!(content.contains("/dev/shm/ndi_preview/frame_%04d.jpg"));
    }
}
