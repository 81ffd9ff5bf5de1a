use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ProfileSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    /// Validated save of the live profile.
    Publish,
    /// Unvalidated save of work in progress.
    Draft,
}

impl SaveKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SaveKind::Publish => "publish",
            SaveKind::Draft => "draft",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("profile not found")]
    NotFound,

    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unexpected store response: {0}")]
    UnexpectedResponse(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOperation {
    Load,
    Save {
        kind: SaveKind,
        snapshot: Box<ProfileSnapshot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOutput {
    Loaded(Box<ProfileSnapshot>),
    Saved,
}

pub type StoreResult = Result<StoreOutput, StoreError>;

impl Operation for StoreOperation {
    type Output = StoreResult;
}

/// Profile persistence, served by the shell.
pub struct Store<Ev> {
    context: CapabilityContext<StoreOperation, Ev>,
}

impl<Ev> Capability<Ev> for Store<Ev> {
    type Operation = StoreOperation;
    type MappedSelf<MappedEv> = Store<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Store::new(self.context.map_event(f))
    }
}

impl<Ev> Store<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn load<F>(&self, callback: F)
    where
        F: FnOnce(Result<ProfileSnapshot, StoreError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = match ctx.request_from_shell(StoreOperation::Load).await {
                Ok(StoreOutput::Loaded(snapshot)) => Ok(*snapshot),
                Ok(StoreOutput::Saved) => Err(StoreError::UnexpectedResponse("saved for load".into())),
                Err(e) => Err(e),
            };
            ctx.update_app(callback(result));
        });
    }

    pub fn save<F>(&self, kind: SaveKind, snapshot: ProfileSnapshot, callback: F)
    where
        F: FnOnce(Result<(), StoreError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let operation = StoreOperation::Save {
                kind,
                snapshot: Box::new(snapshot),
            };
            let result = match ctx.request_from_shell(operation).await {
                Ok(StoreOutput::Saved) => Ok(()),
                Ok(StoreOutput::Loaded(_)) => Err(StoreError::UnexpectedResponse("loaded for save".into())),
                Err(e) => Err(e),
            };
            ctx.update_app(callback(result));
        });
    }
}
