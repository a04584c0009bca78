use thiserror::Error;

use page_host::HostError;

use crate::marks::PatchSurface;

#[derive(Clone, Debug, Error)]
pub enum InterceptError {
    /// The page does not expose this entry point; the patch is skipped.
    #[error("{0} is not available")]
    SurfaceMissing(PatchSurface),
    #[error("{surface} install failed: {source}")]
    Host {
        surface: PatchSurface,
        #[source]
        source: HostError,
    },
}

impl InterceptError {
    pub fn host(surface: PatchSurface, source: HostError) -> Self {
        if source.is_missing() {
            Self::SurfaceMissing(surface)
        } else {
            Self::Host { surface, source }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::SurfaceMissing(_))
    }
}
