use crate::raster::RasterOverlay;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

pub trait Layer {
    fn id(&self) -> LayerId;
}

/// The slippy map the overlays are attached to.
///
/// The browser shell implements this over the map widget; native code and
/// tests use [`RecordingMap`].
pub trait MapView {
    fn add_overlay(&mut self, overlay: &RasterOverlay);
    fn remove_overlay(&mut self, id: LayerId);
    fn show_notice(&mut self, message: &str);
    fn clear_notice(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    Add(LayerId),
    Remove(LayerId),
    Notice(String),
    ClearNotice,
}

/// Keeps the attached overlay ids and every call in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingMap {
    pub attached: Vec<LayerId>,
    pub notice: Option<String>,
    pub calls: Vec<MapCall>,
}

impl MapView for RecordingMap {
    fn add_overlay(&mut self, overlay: &RasterOverlay) {
        self.attached.push(overlay.id);
        self.calls.push(MapCall::Add(overlay.id));
    }

    fn remove_overlay(&mut self, id: LayerId) {
        self.attached.retain(|a| *a != id);
        self.calls.push(MapCall::Remove(id));
    }

    fn show_notice(&mut self, message: &str) {
        self.notice = Some(message.to_string());
        self.calls.push(MapCall::Notice(message.to_string()));
    }

    fn clear_notice(&mut self) {
        self.notice = None;
        self.calls.push(MapCall::ClearNotice);
    }
}
