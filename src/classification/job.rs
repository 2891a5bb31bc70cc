use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::classifier::{ClassLabel, ClassificationMethod, IncrementalClassifier};
use super::schema::ClassificationSchema;
use super::zero_r::ZeroR;
use crate::analysis::{AnalysisError, AnalysisTask, Interruptible, ProgressTracker, TaskContext};
use crate::config::ClassificationSettings;
use crate::data::DataHandle;
use crate::ml::metrics::{ConfusionMatrix, accuracy};

/// Outcome of a [`ClassificationAnalysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    /// Rows in the evaluated handle.
    pub rows: usize,
    /// Rows whose class is in the class map; only these are trained and scored.
    pub labeled: usize,
    pub accuracy: f64,
    /// Accuracy of the majority-class baseline on the same rows.
    pub baseline_accuracy: f64,
    pub classes: Vec<String>,
    pub confusion: ConfusionMatrix,
}

/// Trains a classifier and a [`ZeroR`] baseline on every row of a handle,
/// then scores both on the same rows.
pub struct ClassificationAnalysis {
    schema: Arc<ClassificationSchema>,
    settings: ClassificationSettings,
    input: Arc<dyn DataHandle>,
    output: Arc<dyn DataHandle>,
    tracker: Arc<ProgressTracker>,
}

impl ClassificationAnalysis {
    /// `output` is trained on and scored; `input` backs microaggregated features.
    pub fn new(
        schema: Arc<ClassificationSchema>,
        settings: ClassificationSettings,
        input: Arc<dyn DataHandle>,
        output: Arc<dyn DataHandle>,
    ) -> Self {
        Self {
            schema,
            settings,
            input,
            output,
            tracker: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn into_task(self) -> AnalysisTask<ClassificationSummary> {
        let source: Arc<dyn Interruptible> = self.tracker.clone();
        AnalysisTask::new("classification", source, move |ctx| self.run(ctx))
    }

    pub fn run(&self, ctx: &TaskContext) -> Result<ClassificationSummary, AnalysisError> {
        let output = self.output.as_ref();
        let rows = output.num_rows();
        let work = rows * 2;
        let mut classifier = IncrementalClassifier::new(
            Arc::clone(&self.schema),
            &self.settings,
            Arc::clone(&self.input),
        )?;
        let mut baseline = ZeroR::new(Arc::clone(&self.schema));

        for row in 0..rows {
            self.checkpoint(ctx)?;
            classifier.train(output, output, row)?;
            baseline.train(output, output, row)?;
            self.tracker.report(row + 1, work);
        }
        classifier.train_buffered(|| ctx.is_cancelled() || self.tracker.is_interrupted())?;

        let classes = self.schema.class_map().names().to_vec();
        let mut confusion = ConfusionMatrix::new(classes.len());
        let mut baseline_hits = ConfusionMatrix::new(classes.len());
        for row in 0..rows {
            self.checkpoint(ctx)?;
            if let ClassLabel::Known(actual) = classifier.encode_class(output, row) {
                if let Some(predicted) = classifier.classify(output, row)?.predicted_index() {
                    confusion.add(actual, predicted);
                }
                if let Some(predicted) = baseline.classify(output, row)?.predicted_index() {
                    baseline_hits.add(actual, predicted);
                }
            }
            self.tracker.report(rows + row + 1, work);
        }
        let buffered = classifier.close().len();

        let summary = ClassificationSummary {
            rows,
            labeled: baseline.counts().iter().sum(),
            accuracy: accuracy(&confusion),
            baseline_accuracy: accuracy(&baseline_hits),
            classes,
            confusion,
        };
        info!(
            rows,
            labeled = summary.labeled,
            buffered,
            accuracy = summary.accuracy,
            baseline = summary.baseline_accuracy,
            "Classification finished"
        );
        Ok(summary)
    }

    fn checkpoint(&self, ctx: &TaskContext) -> Result<(), AnalysisError> {
        ctx.checkpoint()?;
        if self.tracker.is_interrupted() {
            return Err(AnalysisError::Interrupted);
        }
        Ok(())
    }
}
