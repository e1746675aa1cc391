//! Pipeline stages for resume analysis.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend or model can change without
//! touching the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ inference
//! (bytes)   (pdfium)   (JPEG/b64)  (Gemini)
//! ```
//!
//! 1. [`input`]: hold the uploaded PDF as [`input::DocumentBytes`]; the
//!    CLI also resolves paths and URLs here
//! 2. [`render`]: rasterise the first page; runs in `spawn_blocking`
//!    because pdfium is not async-aware
//! 3. [`encode`]: JPEG-encode and base64-wrap the page
//! 4. [`inference`]: build `[job description, image, instruction]` and call
//!    the model exactly once

pub mod encode;
pub mod inference;
pub mod input;
pub mod render;
