pub mod essay_ctx;
pub mod essay_flow;

pub use essay_ctx::EssayCtx;
pub use essay_flow::{EssayFlow, ProcessResult};
