use crate::{
    algorithms::{AdaptiveThresholdPreprocessor, GaussianBlurPreprocessor, ImageprocBackend},
    config::DetectorConfig,
    error::Result,
    pipeline::Detector,
    render::ResultRenderer,
    traits::{ImagePreprocessor, VisionBackend},
};

/// Builder for creating detectors with a fluent API
pub struct DetectorBuilder {
    config: DetectorConfig,
    backend: Option<Box<dyn VisionBackend>>,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
}

impl DetectorBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
            backend: None,
            preprocessors: Vec::new(),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the vision backend (replaces any existing one)
    pub fn set_backend<B>(mut self, backend: B) -> Self
    where
        B: VisionBackend + 'static,
    {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Add a preprocessor; they run in insertion order on the grayscale frame.
    /// Adding any replaces the configured blur and threshold.
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Validate the configuration and build the detector with default
    /// components where none were given
    pub fn build(self) -> Result<Detector> {
        self.config.validate()?;

        let backend = self.backend.unwrap_or_else(|| Box::new(ImageprocBackend));

        let mut preprocessors = self.preprocessors;
        if preprocessors.is_empty() {
            let pre = &self.config.preprocess;
            preprocessors.push(Box::new(GaussianBlurPreprocessor {
                kernel_size: pre.blur_kernel_size,
                sigma: pre.blur_sigma,
            }));
            preprocessors.push(Box::new(AdaptiveThresholdPreprocessor {
                block_size: pre.threshold_block_size,
                c: pre.threshold_offset,
            }));
        }

        let renderer = ResultRenderer::new(self.config.render.clone());
        Ok(Detector::new_with(self.config, backend, preprocessors, renderer))
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AngleError;

    #[test]
    fn test_default_build_installs_blur_and_threshold() {
        let detector = DetectorBuilder::new().build().expect("defaults build");
        assert_eq!(detector.preprocessor_count(), 2);
    }

    #[test]
    fn test_custom_preprocessors_replace_defaults() {
        let detector = DetectorBuilder::new()
            .add_preprocessor(AdaptiveThresholdPreprocessor::default())
            .build()
            .expect("builds");
        assert_eq!(detector.preprocessor_count(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DetectorConfig::default();
        config.preprocess.threshold_block_size = 20;
        let result = DetectorBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(AngleError::InvalidConfig(_))));
    }
}
