use futures::future::BoxFuture;

use super::{Asset, Transform};
use crate::errors::Result;

/// Identity transform; a task with an empty pipeline behaves the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn name(&self) -> &str {
        "copy"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move { Ok(asset) })
    }
}
