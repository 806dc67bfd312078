#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    Forward,
    Seeding,
    Expanding,
    Interpolating,
    Bisecting,
}

/// Emitted after every solver evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProgressEvent {
    pub stage: SearchStage,
    /// 1-based evaluation index within the query.
    pub evaluation: usize,
    pub flow: f64,
    pub headwater: f64,
}

pub(crate) fn emit(
    progress_cb: &mut Option<&mut dyn FnMut(SearchProgressEvent)>,
    stage: SearchStage,
    evaluation: usize,
    flow: f64,
    headwater: f64,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(SearchProgressEvent {
            stage,
            evaluation,
            flow,
            headwater,
        });
    }
}
