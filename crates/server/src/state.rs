use std::sync::Arc;

use cardwise_categorize::{Categorizer, Classifier, HttpClassifier, MemoryPatternStore};
use cardwise_parse::{MemoryStatusStore, PdfTextExtractor, StatementParser};
use cardwise_storage::DbPool;

/// Shared application state. The in-memory stores are the live copies; the
/// optional database hydrates and flushes them around requests.
pub struct AppState {
    pub parser: StatementParser<PdfTextExtractor>,
    pub categorizer: Categorizer,
    pub patterns: Arc<MemoryPatternStore>,
    pub status: Arc<MemoryStatusStore>,
    pub db: Option<DbPool>,
}

impl AppState {
    pub fn new(classifier_url: Option<String>, db: Option<DbPool>) -> Arc<Self> {
        let patterns = Arc::new(MemoryPatternStore::new());
        let status = Arc::new(MemoryStatusStore::new());

        let classifier: Option<Arc<dyn Classifier>> = classifier_url
            .map(|url| Arc::new(HttpClassifier::new(url)) as Arc<dyn Classifier>);

        let parser = StatementParser::new(
            PdfTextExtractor,
            Arc::clone(&status) as Arc<dyn cardwise_parse::StatusStore>,
        );
        let categorizer = Categorizer::new(
            Arc::clone(&patterns) as Arc<dyn cardwise_categorize::UserPatternStore>,
            classifier,
        );

        Arc::new(AppState {
            parser,
            categorizer,
            patterns,
            status,
            db,
        })
    }
}
