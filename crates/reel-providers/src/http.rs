//! Shared HTTP helpers.

use std::error::Error as StdError;

use reqwest::Response;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Read a response body, giving up as soon as it grows past `limit` bytes.
///
/// A declared `Content-Length` over the limit is refused before any body
/// bytes are read.
pub async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, BodyError> {
    if response
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(BodyError::TooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Render an error with its sources, e.g. a refused redirect or DNS lookup
/// that reqwest only reports as "error sending request".
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause = cause.to_string();
        if !rendered.contains(&cause) {
            rendered.push_str(": ");
            rendered.push_str(&cause);
        }
        source = source.and_then(|s| s.source());
    }
    rendered
}
