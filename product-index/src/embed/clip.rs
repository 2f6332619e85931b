//! CLIP towers served over HTTP through [`LlmServiceProfiles`].

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use futures::future::BoxFuture;

use crate::{
    embed::{EncodedImage, ImageEmbedder, TextEmbedder},
    errors::IndexError,
};

/// Text tower backed by the `text_embedding` profile.
#[derive(Clone)]
pub struct ClipTextEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: Option<usize>,
}

impl ClipTextEmbedder {
    /// `dim`, when set, is enforced on every returned vector.
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl TextEmbedder for ClipTextEmbedder {
    fn embed_texts<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>> {
        Box::pin(async move {
            let out = self.svc.embed_texts(texts).await?;
            check_dims(&out, self.dim)?;
            Ok(out)
        })
    }
}

/// Image tower backed by the `image_embedding` profile.
#[derive(Clone)]
pub struct ClipImageEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: Option<usize>,
}

impl ClipImageEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl ImageEmbedder for ClipImageEmbedder {
    fn embed_images<'a>(
        &'a self,
        images: &'a [EncodedImage],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>> {
        Box::pin(async move {
            let uris: Vec<String> = images.iter().map(EncodedImage::data_uri).collect();
            let out = self.svc.embed_images(&uris).await?;
            check_dims(&out, self.dim)?;
            Ok(out)
        })
    }
}

fn check_dims(vectors: &[Vec<f32>], want: Option<usize>) -> Result<(), IndexError> {
    let Some(want) = want else {
        return Ok(());
    };
    match vectors.iter().find(|v| v.len() != want) {
        Some(v) => Err(IndexError::DimensionMismatch { got: v.len(), want }),
        None => Ok(()),
    }
}
