//! Host extension registry and hook dispatch.
//!
//! The host loop stays ignorant of what extensions do: at fixed points in
//! the frame it calls into the [`HookDispatcher`], which fans out to every
//! registered [`Extension`] in registration order. Skip queries poll every
//! extension and OR the answers, so an extension's bookkeeping runs even
//! when an earlier one already voted to skip.

mod dispatch;
mod extension;

pub use dispatch::{HookDispatcher, SharedExtension, MAX_EXTENSIONS};
pub use extension::Extension;
