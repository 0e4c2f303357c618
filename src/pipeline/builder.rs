use std::path::Path;

use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::pipeline::defaults::{DtwWordAligner, GreedyWordAligner};
use crate::pipeline::runtime::{Assessor, AssessorParts};
use crate::pipeline::traits::{AlignerKind, TipGenerator, WordAligner};

pub struct AssessorBuilder {
    config: AssessmentConfig,
    aligner_kind: AlignerKind,
    word_aligner: Option<Box<dyn WordAligner>>,
    tip_generator: Option<Box<dyn TipGenerator>>,
}

impl AssessorBuilder {
    pub fn new(config: AssessmentConfig) -> Self {
        Self {
            config,
            aligner_kind: AlignerKind::Dtw,
            word_aligner: None,
            tip_generator: None,
        }
    }

    /// Starts from a JSON config file; fields it omits keep their defaults.
    pub fn from_config_file(path: &Path) -> Result<Self, AssessmentError> {
        Ok(Self::new(AssessmentConfig::load(path)?))
    }

    pub fn with_aligner_kind(mut self, aligner_kind: AlignerKind) -> Self {
        self.aligner_kind = aligner_kind;
        self
    }

    /// Overrides `aligner_kind` with a custom strategy.
    pub fn with_word_aligner(mut self, word_aligner: Box<dyn WordAligner>) -> Self {
        self.word_aligner = Some(word_aligner);
        self
    }

    pub fn with_tip_generator(mut self, tip_generator: Box<dyn TipGenerator>) -> Self {
        self.tip_generator = Some(tip_generator);
        self
    }

    pub fn build(self) -> Result<Assessor, AssessmentError> {
        self.config.validate()?;

        let aligner_kind = self.aligner_kind;
        let word_aligner = self
            .word_aligner
            .unwrap_or_else(|| default_word_aligner(aligner_kind));
        tracing::debug!(
            aligner = word_aligner.name(),
            tip_generator = self.tip_generator.is_some(),
            "assessor built"
        );

        Ok(Assessor::from_parts(AssessorParts {
            config: self.config,
            word_aligner,
            tip_generator: self.tip_generator,
        }))
    }
}

fn default_word_aligner(kind: AlignerKind) -> Box<dyn WordAligner> {
    match kind {
        AlignerKind::Dtw => Box::new(DtwWordAligner),
        AlignerKind::Greedy => Box::new(GreedyWordAligner),
    }
}
