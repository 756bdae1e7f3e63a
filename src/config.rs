//! Limits and feature switches for building filters.

/// Hard limit for the number of ops in a WebRender SVGFE graph.
///
/// This is also the limit for the number of primitives in a description that can be
/// translated into a graph.
pub const SVGFE_GRAPH_MAX: usize = 256;

/// Which primitive kinds may be translated into WebRender SVGFE ops.
///
/// A primitive whose kind is disabled makes the whole graph fall back to blob rendering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SvgfeKinds {
    pub blend: bool,
    pub color_matrix: bool,
    pub component_transfer: bool,
    pub composite: bool,
    pub convolve_matrix: bool,
    pub diffuse_lighting: bool,
    pub displacement_map: bool,
    pub drop_shadow: bool,
    pub flood: bool,
    pub gaussian_blur: bool,
    pub image: bool,
    pub merge: bool,
    pub morphology: bool,
    pub offset: bool,
    pub opacity: bool,
    pub specular_lighting: bool,
    pub tile: bool,
    pub turbulence: bool,
    pub to_alpha: bool,
}

impl Default for SvgfeKinds {
    #[rustfmt::skip]
    fn default() -> Self {
        SvgfeKinds {
            blend:              true,
            color_matrix:       true,
            component_transfer: true,
            composite:          true,
            convolve_matrix:    false,
            diffuse_lighting:   false,
            displacement_map:   false,
            drop_shadow:        true,
            flood:              true,
            gaussian_blur:      true,
            image:              false,
            merge:              true,
            morphology:         false,
            offset:             true,
            opacity:            true,
            specular_lighting:  false,
            tile:               false,
            turbulence:         false,
            to_alpha:           true,
        }
    }
}

impl SvgfeKinds {
    /// Every kind enabled.
    pub fn all() -> Self {
        SvgfeKinds {
            blend: true,
            color_matrix: true,
            component_transfer: true,
            composite: true,
            convolve_matrix: true,
            diffuse_lighting: true,
            displacement_map: true,
            drop_shadow: true,
            flood: true,
            gaussian_blur: true,
            image: true,
            merge: true,
            morphology: true,
            offset: true,
            opacity: true,
            specular_lighting: true,
            tile: true,
            turbulence: true,
            to_alpha: true,
        }
    }
}

/// Configuration for the WebRender filter builders.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WebRenderConfig {
    /// Whether SVG filter graphs are translated into SVGFE ops.  When this is off, only
    /// the simpler CHAIN path is attempted.
    pub svgfe_enabled: bool,

    /// Maximum number of chain ops, and of primitives in a description.
    pub max_filter_ops_per_chain: usize,

    pub kinds: SvgfeKinds,
}

impl Default for WebRenderConfig {
    fn default() -> Self {
        WebRenderConfig {
            svgfe_enabled: true,
            max_filter_ops_per_chain: 64,
            kinds: SvgfeKinds::default(),
        }
    }
}

/// Limits used while building and rendering filters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Maximum width and height of an intermediate surface, in filter-space pixels.
    /// Needed regions larger than this are shrunk.
    pub max_surface_size: i32,

    pub webrender: WebRenderConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            max_surface_size: 16384,
            webrender: WebRenderConfig::default(),
        }
    }
}

impl FilterConfig {
    pub fn with_max_surface_size(mut self, size: i32) -> Self {
        self.max_surface_size = size.max(1);
        self
    }

    pub fn with_svgfe_enabled(mut self, enabled: bool) -> Self {
        self.webrender.svgfe_enabled = enabled;
        self
    }

    pub fn with_max_filter_ops_per_chain(mut self, max: usize) -> Self {
        self.webrender.max_filter_ops_per_chain = max;
        self
    }

    pub fn with_svgfe_kinds(mut self, kinds: SvgfeKinds) -> Self {
        self.webrender.kinds = kinds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.max_surface_size, 16384);
        assert_eq!(config.webrender.max_filter_ops_per_chain, 64);
        assert!(config.webrender.kinds.gaussian_blur);
        assert!(!config.webrender.kinds.convolve_matrix);
    }

    #[test]
    fn surface_size_is_at_least_one() {
        assert_eq!(FilterConfig::default().with_max_surface_size(0).max_surface_size, 1);
    }
}
