//! Precipitation radar image retrieval.
//!
//! This module polls the remote radar service for its last-updated
//! timestamp and downloads the composite image only when it changed.

pub mod precipitation;

pub use precipitation::{
    HttpTransport, ImageFetchError, ImageTransport, PrecipitationConfig, PrecipitationEvent,
    PrecipitationService, TransportFailure,
};
