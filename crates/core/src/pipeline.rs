use std::fmt;

use serde::Serialize;

use crate::config::{CompiledConfig, ExtractorConfig};
use crate::detect::HeadingDetector;
use crate::error::OutlineError;
use crate::exceptions::CorpusExceptions;
use crate::hierarchy::post_process;
use crate::noise::NoiseClassifier;
use crate::profile::{profile_document, DocumentProfile, Strategy};
use crate::scoring::ConfidenceScorer;
use crate::spans::extract_span_headings;
use crate::stats::{analyze_font_statistics, FontStatistics};
use crate::strategy::{select_outline, CorpusSize};
use crate::title::TitleSelector;
use crate::types::{DocumentInput, DocumentOutline, OutlineEntry};

// ----------------------------------------------------------------------------
// Progress reporting
// ----------------------------------------------------------------------------

/// Pipeline stages, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractingBlocks,
    AnalysingStructure,
    MultiPassDetection,
    TitleExtraction,
    PostProcessing,
    StrategySelection,
    Complete,
}

impl Stage {
    /// Share of the work done once this stage starts, in percent.
    pub fn percent(&self) -> u64 {
        match self {
            Stage::ExtractingBlocks => 10,
            Stage::AnalysingStructure => 30,
            Stage::MultiPassDetection => 50,
            Stage::TitleExtraction => 70,
            Stage::PostProcessing => 80,
            Stage::StrategySelection => 90,
            Stage::Complete => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Stage::ExtractingBlocks => "Extracting text blocks",
            Stage::AnalysingStructure => "Analysing document structure",
            Stage::MultiPassDetection => "Multi-pass heading detection",
            Stage::TitleExtraction => "Extracting title",
            Stage::PostProcessing => "Post-processing hierarchy",
            Stage::StrategySelection => "Selecting outline strategy",
            Stage::Complete => "Complete",
        };
        f.write_str(message)
    }
}

/// Receives stage notifications while a document is processed.
pub trait ProgressObserver: Send + Sync {
    fn on_stage(&self, stage: Stage);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_stage(&self, _stage: Stage) {}
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Everything computed for one document, including the intermediate results
/// callers may want to report as metadata.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub outline: DocumentOutline,
    pub stats: FontStatistics,
    pub profile: DocumentProfile,
}

/// Heading classification engine.
///
/// The engine owns only immutable configuration, so one instance can be
/// shared by any number of concurrent documents.
#[derive(Debug, Clone)]
pub struct OutlineEngine {
    config: CompiledConfig,
    noise: NoiseClassifier,
}

impl OutlineEngine {
    pub fn new(config: &ExtractorConfig) -> Result<Self, OutlineError> {
        let config = config.compile()?;
        let noise = NoiseClassifier::new(
            config.noise_patterns.clone(),
            CorpusExceptions::new(config.corpus_exceptions),
        );
        Ok(OutlineEngine { config, noise })
    }

    pub fn config(&self) -> &CompiledConfig {
        &self.config
    }

    /// Title and outline for one document.
    pub fn extract(&self, input: &DocumentInput, observer: &dyn ProgressObserver) -> DocumentOutline {
        self.analyze(input, observer).outline
    }

    pub fn analyze(&self, input: &DocumentInput, observer: &dyn ProgressObserver) -> Analysis {
        let blocks = &input.blocks;

        observer.on_stage(Stage::AnalysingStructure);
        let stats = analyze_font_statistics(blocks);
        let scorer = ConfidenceScorer::new(&stats, &self.config.structural_words);

        observer.on_stage(Stage::MultiPassDetection);
        let candidates = HeadingDetector::new(&self.config, &self.noise, scorer).detect(blocks);

        observer.on_stage(Stage::TitleExtraction);
        let exceptions = CorpusExceptions::new(self.config.corpus_exceptions);
        let title = TitleSelector::new(&stats, self.config.min_heading_length, exceptions)
            .select(blocks);
        let profile = profile_document(blocks, &title);

        observer.on_stage(Stage::PostProcessing);
        let block_outline = post_process(candidates, &title);

        observer.on_stage(Stage::StrategySelection);
        let span_outline = match profile.strategy {
            Strategy::Minimal => Vec::new(),
            _ => post_process(
                extract_span_headings(&input.spans, &stats, &self.noise, &self.config.filters),
                &title,
            ),
        };
        let corpus = CorpusSize {
            block_count: profile.block_count,
            total_chars: profile.total_chars,
        };
        let headings = select_outline(profile.strategy, block_outline, span_outline, corpus);

        log::info!(
            "classified {} blocks on {} pages: title {:?}, {} headings ({} strategy)",
            blocks.len(),
            input.page_count,
            title,
            headings.len(),
            profile.strategy
        );
        observer.on_stage(Stage::Complete);

        Analysis {
            outline: DocumentOutline {
                title,
                outline: headings.iter().map(OutlineEntry::from).collect(),
            },
            stats,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::profile::DocumentType;
    use crate::types::{BBox, HeadingLevel, TextBlock, FONT_FLAG_BOLD};

    fn make_block(text: &str, size: f32, bold: bool, page: usize, top: f32) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            font_name: "Helvetica".to_string(),
            font_size: size,
            font_flags: if bold { FONT_FLAG_BOLD } else { 0 },
            bbox: BBox::new(72.0, top, 500.0, top + size),
            page,
        }
    }

    fn body(page: usize, top: f32) -> TextBlock {
        make_block(
            "the quick brown fox jumps over the lazy dog again and again",
            12.0,
            false,
            page,
            top,
        )
    }

    fn engine() -> OutlineEngine {
        OutlineEngine::new(&ExtractorConfig::default()).unwrap()
    }

    fn report() -> DocumentInput {
        let mut blocks = vec![make_block("Annual Report", 24.0, true, 0, 50.0)];
        blocks.extend((0..3).map(|i| body(0, 100.0 + i as f32 * 30.0)));
        blocks.push(make_block("Introduction", 18.0, true, 0, 300.0));
        blocks.extend((0..3).map(|i| body(0, 340.0 + i as f32 * 30.0)));
        blocks.push(make_block("Results", 18.0, true, 1, 80.0));
        blocks.extend((0..3).map(|i| body(1, 120.0 + i as f32 * 30.0)));
        DocumentInput {
            blocks,
            spans: Vec::new(),
            page_count: 2,
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        stages: Mutex<Vec<Stage>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            custom_filters: vec!["(".to_string()],
            ..ExtractorConfig::default()
        };
        assert!(matches!(
            OutlineEngine::new(&config),
            Err(OutlineError::Configuration(_))
        ));
    }

    #[test]
    fn test_report_outline() {
        let outline = engine().extract(&report(), &NoopObserver);
        assert_eq!(outline.title, "Annual Report");
        assert!(outline.outline.iter().all(|e| e.text != outline.title));
        assert!(outline
            .outline
            .iter()
            .any(|e| e.text == "Introduction" && e.page == 0));
        assert!(outline.outline.iter().any(|e| e.text == "Results" && e.page == 1));
    }

    #[test]
    fn test_outline_invariants_hold() {
        let outline = engine().extract(&report(), &NoopObserver);
        for pair in outline.outline.windows(2) {
            assert!(pair[0].page <= pair[1].page);
            assert!(pair[1].level.as_u8() <= pair[0].level.as_u8() + 1);
        }
        let mut texts: Vec<String> = outline
            .outline
            .iter()
            .map(|e| e.text.to_lowercase())
            .collect();
        texts.sort();
        texts.dedup();
        assert_eq!(texts.len(), outline.outline.len());
        assert!(outline
            .outline
            .iter()
            .all(|e| e.level >= HeadingLevel::H1 && e.level <= HeadingLevel::H3));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let engine = engine();
        let input = report();
        let first = engine.extract(&input, &NoopObserver);
        let second = engine.extract(&input, &NoopObserver);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_form_document_has_empty_outline() {
        let title = "Application form for grant of LTC advance";
        let blocks = vec![
            make_block(title, 16.0, true, 0, 50.0),
            make_block("Name of the Government Servant", 12.0, false, 0, 200.0),
            make_block("Designation", 12.0, false, 0, 230.0),
            make_block("Date of entering the service", 12.0, false, 0, 260.0),
            make_block("Pay and scale of pay", 12.0, false, 0, 290.0),
            make_block("Whether permanent or temporary", 12.0, false, 0, 320.0),
            make_block("Home town as recorded in the service book", 12.0, false, 0, 350.0),
            make_block("Amount of advance required", 12.0, false, 0, 380.0),
        ];
        let input = DocumentInput {
            blocks,
            page_count: 1,
            ..DocumentInput::default()
        };

        let analysis = engine().analyze(&input, &NoopObserver);
        assert_eq!(analysis.profile.doc_type, DocumentType::Form);
        assert_eq!(analysis.outline.title, title);
        assert!(analysis.outline.outline.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let outline = engine().extract(&DocumentInput::default(), &NoopObserver);
        assert_eq!(outline.title, "Untitled");
        assert!(outline.outline.is_empty());
    }

    #[test]
    fn test_stages_reported_in_order() {
        let observer = RecordingObserver::default();
        engine().extract(&report(), &observer);
        let stages = observer.stages.lock().unwrap().clone();
        assert_eq!(
            stages,
            vec![
                Stage::AnalysingStructure,
                Stage::MultiPassDetection,
                Stage::TitleExtraction,
                Stage::PostProcessing,
                Stage::StrategySelection,
                Stage::Complete,
            ]
        );
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
    }
}
