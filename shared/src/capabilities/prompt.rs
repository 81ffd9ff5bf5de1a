use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Yes/no question shown before a destructive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOperation {
    pub message: String,
}

impl Operation for ConfirmOperation {
    type Output = bool;
}

pub struct Confirm<Ev> {
    context: CapabilityContext<ConfirmOperation, Ev>,
}

impl<Ev> Capability<Ev> for Confirm<Ev> {
    type Operation = ConfirmOperation;
    type MappedSelf<MappedEv> = Confirm<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Confirm::new(self.context.map_event(f))
    }
}

impl<Ev> Confirm<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<ConfirmOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn ask<F>(&self, message: impl Into<String>, callback: F)
    where
        F: FnOnce(bool) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        let message = message.into();
        self.context.spawn(async move {
            let confirmed = ctx.request_from_shell(ConfirmOperation { message }).await;
            ctx.update_app(callback(confirmed));
        });
    }
}
