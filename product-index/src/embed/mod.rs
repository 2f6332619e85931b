//! Embedding abstraction for the text and image towers.
//!
//! Both towers must produce vectors of the same dimension for mixing to be
//! valid. Implementations return one vector per input, in input order.

use futures::future::BoxFuture;

use crate::errors::IndexError;

pub mod clip;

/// Text tower (catalog texts, subcategory labels and query phrases).
pub trait TextEmbedder: Send + Sync {
    fn embed_texts<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>>;
}

/// Image tower.
pub trait ImageEmbedder: Send + Sync {
    fn embed_images<'a>(
        &'a self,
        images: &'a [EncodedImage],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, IndexError>>;
}

/// An image re-encoded for transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// URL or path the image was loaded from.
    pub source: String,
    pub mime: &'static str,
    /// Base64 payload (standard alphabet, padded).
    pub base64: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` form accepted by embedding and vision endpoints.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}
