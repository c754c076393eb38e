use crate::model::ChartModel;

/// Where the panel draws. The browser shell forwards to the charting
/// library; tests record calls.
pub trait ChartSurface {
    /// Replaces whatever is currently drawn.
    fn draw(&mut self, model: &ChartModel);
    fn show_no_data(&mut self, heading: &str, message: &str);
    fn clear(&mut self);
}

/// Records every call, newest last.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingChart {
    pub calls: Vec<ChartCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartCall {
    Draw(ChartModel),
    NoData { heading: String, message: String },
    Clear,
}

impl RecordingChart {
    pub fn last(&self) -> Option<&ChartCall> {
        self.calls.last()
    }

    pub fn drawn(&self) -> Option<&ChartModel> {
        match self.calls.last() {
            Some(ChartCall::Draw(model)) => Some(model),
            _ => None,
        }
    }
}

impl ChartSurface for RecordingChart {
    fn draw(&mut self, model: &ChartModel) {
        self.calls.push(ChartCall::Draw(model.clone()));
    }

    fn show_no_data(&mut self, heading: &str, message: &str) {
        self.calls.push(ChartCall::NoData {
            heading: heading.to_string(),
            message: message.to_string(),
        });
    }

    fn clear(&mut self) {
        self.calls.push(ChartCall::Clear);
    }
}
