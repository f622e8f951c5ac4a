use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("MetadataMissing: {0}")]
    MetadataMissing(String),

    #[error("ChildApplyFailed: {0}")]
    ChildApplyFailed(#[source] kube::Error),

    #[error("StatusPersistFailed: {0}")]
    StatusPersistFailed(#[source] kube::Error),
}

impl Error {
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
