use futures::future::BoxFuture;
use tera::{Context as TeraContext, Tera};

use super::{Asset, Transform};
use crate::errors::{Result, SitepipeError};

/// Renders each asset as a standalone Tera template.
///
/// `vars` from the pipeline entry become the template context; `source` and
/// `output` (the asset's paths) are always available as well.
#[derive(Debug, Clone)]
pub struct TemplateTransform {
    context: TeraContext,
    extension: Option<String>,
}

impl TemplateTransform {
    pub fn new(vars: &toml::Table, extension: Option<String>) -> Result<Self> {
        let context = TeraContext::from_serialize(vars).map_err(|e| {
            SitepipeError::ConfigError(format!("template vars are not a valid context: {e}"))
        })?;
        Ok(Self { context, extension })
    }

    fn render(&self, mut asset: Asset) -> Result<Asset> {
        let source = asset.text(self.name())?;

        let mut context = self.context.clone();
        context.insert("source", &asset.source.to_string_lossy());
        context.insert("output", &asset.output.to_string_lossy());

        let rendered = Tera::one_off(source, &context, false).map_err(|e| {
            SitepipeError::Transform {
                unit: "template".to_string(),
                path: asset.source.clone(),
                message: render_error_chain(&e),
            }
        })?;

        asset.contents = rendered.into_bytes();
        Ok(asset.with_extension(self.extension.as_deref()))
    }
}

/// Tera nests the useful message (line, unknown variable) in `source()`.
fn render_error_chain(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut cur: Option<&dyn std::error::Error> = std::error::Error::source(err);
    while let Some(e) = cur {
        parts.push(e.to_string());
        cur = e.source();
    }
    parts.join(": ")
}

impl Transform for TemplateTransform {
    fn name(&self) -> &str {
        "template"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move { self.render(asset) })
    }
}
