//! Path request builder.

use std::fmt;
use std::sync::Arc;

use crate::core::Int3;
use crate::search::{
    EndpointSnapping, Heuristic, SearchConfig, SearchRequest, TraversalConstraint,
    TraversalProvider,
};

use super::Path;

/// Completion callback, invoked once on the thread draining the return queue
pub type PathCallback = Box<dyn FnOnce(&Path) + Send>;

/// Parameters of one path query.
///
/// Unset options fall back to the processor's [`SearchConfig`].
///
/// ```rust,ignore
/// let request = PathRequest::new(start, end)
///     .heuristic(Heuristic::Manhattan)
///     .calculate_partial(true)
///     .callback(|path| println!("done: {:?}", path.cost()));
/// ```
#[derive(Default)]
pub struct PathRequest {
    pub(crate) start: Int3,
    pub(crate) end: Int3,
    heuristic: Option<Heuristic>,
    heuristic_scale: Option<f32>,
    snapping: Option<EndpointSnapping>,
    constraint: TraversalConstraint,
    provider: Option<Arc<dyn TraversalProvider>>,
    calculate_partial: bool,
    pub(crate) callback: Option<PathCallback>,
}

impl PathRequest {
    pub fn new(start: Int3, end: Int3) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    pub fn heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    pub fn heuristic_scale(mut self, scale: f32) -> Self {
        self.heuristic_scale = Some(scale);
        self
    }

    pub fn endpoint_snapping(mut self, snapping: EndpointSnapping) -> Self {
        self.snapping = Some(snapping);
        self
    }

    pub fn constraint(mut self, constraint: TraversalConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn traversal_provider(mut self, provider: Arc<dyn TraversalProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Complete with a path to the closest reachable node if the target
    /// cannot be reached
    pub fn calculate_partial(mut self, partial: bool) -> Self {
        self.calculate_partial = partial;
        self
    }

    pub fn callback(mut self, callback: impl FnOnce(&Path) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn start(&self) -> Int3 {
        self.start
    }

    pub fn end(&self) -> Int3 {
        self.end
    }

    /// Resolve against worker defaults
    pub(crate) fn to_search_request(&self, config: &SearchConfig) -> SearchRequest {
        let mut request = SearchRequest::new(self.start, self.end, config);
        if let Some(heuristic) = self.heuristic {
            request.heuristic = heuristic;
        }
        if let Some(scale) = self.heuristic_scale {
            request.heuristic_scale = scale;
        }
        if let Some(snapping) = self.snapping {
            request.snapping = snapping;
        }
        if let Some(provider) = &self.provider {
            request.provider = Arc::clone(provider);
        }
        request.constraint = self.constraint.clone();
        request.calculate_partial = self.calculate_partial;
        request
    }
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("heuristic", &self.heuristic)
            .field("calculate_partial", &self.calculate_partial)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
