//! Analyzer returning synthetic measurements

use super::fixtures::synthetic_analysis;
use argoqc::models::WorkItem;
use argoqc::services::{Analysis, OpticalAnalyzer};
use argoqc::{QcError, QcResult};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ScriptedAnalyzer {
    channels: u32,
    failing: HashSet<String>,
    /// Names of the items analyzed, in call order
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedAnalyzer {
    pub fn new(channels: u32) -> Self {
        Self {
            channels,
            failing: HashSet::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Fail the analysis of the image named `name`
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl OpticalAnalyzer for ScriptedAnalyzer {
    fn analyze(&self, item: &WorkItem) -> QcResult<Analysis> {
        self.calls.borrow_mut().push(item.name.clone());
        if self.failing.contains(&item.name) {
            return Err(QcError::Analysis(format!("No rings found in {}", item.name)));
        }
        Ok(synthetic_analysis(self.channels))
    }
}
