use crate::gpu::driver::types::Abstract;

/// Whether an error is a caller bug or a limitation of the active backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller broke a documented contract. Treat as a bug.
    Contract,
    /// The backend cannot express the request. Callers may degrade.
    Capability,
}

#[derive(Debug, thiserror::Error)]
pub enum GPUError {
    #[error("invalid info: {0}")]
    InvalidInfo(String),
    #[error("debug label is {len} bytes, capacity is {max}")]
    LabelTooLong { len: usize, max: usize },
    #[error("stale or released {0} handle")]
    StaleHandle(&'static str),
    #[error("released a {0} reference that was not held")]
    RefCountUnderflow(&'static str),
    #[error("execution context driven from a thread that does not own it")]
    WrongThread,
    #[error("a render pass is already active")]
    RenderPassActive,
    #[error("no render pass is active")]
    NoRenderPass,
    #[error("nothing bound: {0}")]
    NothingBound(&'static str),
    #[error("primitive buffer layout does not match the bound pipeline")]
    LayoutMismatch,
    #[error("intermediate surface is {intermediate:?}, target is {target:?}")]
    SizeMismatch {
        intermediate: [u32; 2],
        target: [u32; 2],
    },
    #[error("malformed command record at byte {offset}")]
    MalformedCommand { offset: usize },
    #[error("ran out of slots")]
    SlotError,
    #[error("no native mapping for {0:?}")]
    Unmapped(Abstract),
    #[error("command 0x{0:08x} is not supported by this backend")]
    UnsupportedCommand(u32),
    #[error("framebuffer incomplete: {0}")]
    IncompleteFramebuffer(String),
    #[error("shader link failed: {0}")]
    ShaderLink(String),
}

impl GPUError {
    pub fn class(&self) -> ErrorClass {
        match self {
            GPUError::Unmapped(_)
            | GPUError::UnsupportedCommand(_)
            | GPUError::IncompleteFramebuffer(_)
            | GPUError::ShaderLink(_) => ErrorClass::Capability,
            _ => ErrorClass::Contract,
        }
    }

    #[inline]
    pub fn is_contract_violation(&self) -> bool {
        self.class() == ErrorClass::Contract
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GPUError::InvalidInfo(msg.into())
    }
}

pub type Result<T, E = GPUError> = std::result::Result<T, E>;

/// Escalates an error into a process-level failure.
///
/// This is the fail-fast policy; callers that want to recover match on the
/// `Result` instead.
pub trait OrFatal<T> {
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for Result<T> {
    #[track_caller]
    fn or_fatal(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                log::error!("fatal {:?} error: {}", e.class(), e);
                panic!("fatal: {e}");
            }
        }
    }
}
