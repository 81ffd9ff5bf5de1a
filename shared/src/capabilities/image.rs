use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::image_processing::ImageProcessingError;
use crate::model::{ImageSelection, PreviewRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOperation {
    pub selection: ImageSelection,
}

impl Operation for DecodeOperation {
    type Output = Result<PreviewRef, ImageProcessingError>;
}

/// Preview decoding, served by the shell.
pub struct ImageDecode<Ev> {
    context: CapabilityContext<DecodeOperation, Ev>,
}

impl<Ev> Capability<Ev> for ImageDecode<Ev> {
    type Operation = DecodeOperation;
    type MappedSelf<MappedEv> = ImageDecode<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        ImageDecode::new(self.context.map_event(f))
    }
}

impl<Ev> ImageDecode<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<DecodeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn decode<F>(&self, selection: ImageSelection, callback: F)
    where
        F: FnOnce(Result<PreviewRef, ImageProcessingError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(DecodeOperation { selection }).await;
            ctx.update_app(callback(result));
        });
    }
}
