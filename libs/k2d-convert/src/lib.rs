pub mod engine;
pub mod scheme;

pub use scheme::{ConversionScheme, Gvk, KubeKind};
