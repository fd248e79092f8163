use super::Processor;
use crate::config::ProcessorConfig;
use crate::types::{FileFormat, SourceFile};
use tracing::warn;

/// Builds processors that share one configuration.
#[derive(Debug, Clone, Default)]
pub struct ProcessorFactory {
    config: ProcessorConfig,
}

impl ProcessorFactory {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Resolve a declared type (`csv`, `excel`, ...) or extension (`xlsx`,
    /// `.parquet`, ...). Unknown values are logged and yield `None`.
    pub fn get_processor(&self, type_or_extension: &str) -> Option<Processor> {
        match FileFormat::from_type_or_extension(type_or_extension) {
            Some(format) => Some(self.processor_for(format)),
            None => {
                warn!("No processor found for file type: {}", type_or_extension);
                None
            }
        }
    }

    pub fn processor_for(&self, format: FileFormat) -> Processor {
        Processor::new(format, self.config.clone())
    }

    /// Processor for the format a source file was declared as.
    pub fn for_source(&self, source: &SourceFile) -> Processor {
        self.processor_for(source.format())
    }
}

/// Resolve a processor with the default configuration.
pub fn get_processor(type_or_extension: &str) -> Option<Processor> {
    ProcessorFactory::default().get_processor(type_or_extension)
}
